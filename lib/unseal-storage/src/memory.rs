//! In-memory store, for tests and dry runs

use std::{collections::BTreeMap, io, sync::RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use crate::{ByteStream, Error, Key, ObjectInfo, Result, Store};

/// Objects held in a map. `get` hands content out in `chunk_size` pieces so
/// callers see the same fragmentation a network body would produce.
pub struct MemoryStore {
    objects: RwLock<BTreeMap<Key, Vec<u8>>>,
    chunk_size: usize,
}

impl MemoryStore {
    pub fn new(chunk_size: usize) -> Self {
        MemoryStore {
            objects: RwLock::new(BTreeMap::new()),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn insert(&self, key: impl Into<Key>, data: Vec<u8>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(key.into(), data);
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.objects
            .read()
            .map(|o| o.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new(64 * 1024)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_contents(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let objects = self.objects.read().map_err(|_| Error::UnknownError)?;
        Ok(objects
            .iter()
            .filter(|(k, _)| k.as_str().starts_with(prefix))
            .map(|(k, v)| ObjectInfo {
                key: k.clone(),
                size: v.len() as i64,
            })
            .collect())
    }

    async fn get(&self, key: &Key) -> Result<ByteStream> {
        let objects = self.objects.read().map_err(|_| Error::UnknownError)?;
        let data = objects.get(key).ok_or(Error::NoSuchObject)?;
        let chunks: Vec<io::Result<Bytes>> = data
            .chunks(self.chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        let mut objects = self.objects.write().map_err(|_| Error::UnknownError)?;
        objects.remove(key).map(|_| ()).ok_or(Error::NoSuchObject)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn get_delivers_content_in_chunks() {
        let store = MemoryStore::new(3);
        store.insert("a", b"abcdefgh".to_vec());

        let chunks: Vec<Bytes> = store.get(&Key::from("a")).await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), b"abcdefgh".to_vec());
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = MemoryStore::default();
        store.insert("in/a", vec![1]);
        store.insert("in/b", vec![1, 2]);
        store.insert("out/c", vec![]);

        let listed = store.list_contents("in/").await.unwrap();
        let keys: Vec<&str> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["in/a", "in/b"]);
        assert_eq!(listed[1].size, 2);
    }

    #[tokio::test]
    async fn delete_removes_object() {
        let store = MemoryStore::default();
        store.insert("a", vec![1]);
        store.delete(&Key::from("a")).await.unwrap();

        assert!(!store.contains(&Key::from("a")));
        assert_eq!(store.delete(&Key::from("a")).await, Err(Error::NoSuchObject));
        assert!(store.get(&Key::from("a")).await.is_err());
    }
}
