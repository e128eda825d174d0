use std::io;

use thiserror::Error;

use crate::crypto::{CryptoError, IntegrityError, TRAILER_SIZE};
use crate::storage::Error as StorageError;

/// The unencrypted prefix could not be read or the key inside it could not
/// be recovered. Raised before any output exists.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("stream ended after {0} of {1} envelope bytes")]
    Truncated(usize, usize),

    #[error("key recovery failed: {0}")]
    KeyRecovery(CryptoError),
}

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("unknown format tag {0:#04x}")]
    UnknownFormat(u8),

    #[error("stream ended before the header was complete")]
    Truncated,

    #[error("invalid file trailer {0} instead of {}", TRAILER_SIZE)]
    TrailerSize(usize),

    #[error("ciphertext could not be decrypted: {0}")]
    Cipher(CryptoError),
}

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("header is not a JSON object: {0}")]
    Json(serde_json::Error),

    #[error("header has no multipart content type")]
    MissingContentType,

    #[error("multipart decoding failed: {0}")]
    Multipart(multer::Error),

    #[error("{0:?} has no sibling header file")]
    MissingHeaderFile(std::path::PathBuf),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("corrupt envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("corrupt framing: {0}")]
    Framing(#[from] FramingError),

    #[error("file is corrupt: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("bad header: {0}")]
    Header(#[from] HeaderError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),
}

impl DecodeError {
    /// True when the input itself is bad, as opposed to the environment.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            DecodeError::Envelope(_)
                | DecodeError::Framing(_)
                | DecodeError::Integrity(_)
                | DecodeError::Header(_)
        )
    }
}

impl From<CryptoError> for DecodeError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Cipher(_) => DecodeError::Framing(FramingError::Cipher(e)),
            _ => DecodeError::Crypto(e),
        }
    }
}
