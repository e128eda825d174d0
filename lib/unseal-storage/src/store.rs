use std::{io, pin::Pin};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

use crate::key::Key;

#[derive(Debug, Eq, PartialEq, Error)]
pub enum Error {
    #[error("no such object")]
    NoSuchObject,

    #[error("access denied")]
    AccessDenied,

    #[error("network error")]
    NetworkError,

    #[error("unknown storage error")]
    UnknownError,
}

/**
 * An abstract storage object managed by a storage service.
 */
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: Key,
    pub size: i64,
}

/// Object content, delivered in whatever chunk sizes the backend produces.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Lists every object under `prefix`, recursively.
    async fn list_contents(&self, prefix: &str) -> Result<Vec<ObjectInfo>>;

    async fn get(&self, key: &Key) -> Result<ByteStream>;

    async fn delete(&self, key: &Key) -> Result<()>;
}
