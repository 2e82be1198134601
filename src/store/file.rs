use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::{KeyValueStore, Namespace};
use crate::error::StoreError;

/// Store backed by one JSON object file per namespace
pub struct FileStore {
    dir: PathBuf,
    // serializes read-modify-write cycles on the files
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn path(&self, ns: Namespace) -> PathBuf {
        self.dir.join(ns.file_name())
    }

    async fn read(&self, ns: Namespace) -> Result<Map<String, Value>, StoreError> {
        let path = self.path(ns);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => Ok(Map::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, ns: Namespace, map: &Map<String, Value>) -> Result<(), StoreError> {
        let path = self.path(ns);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(map)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("wrote {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read(ns).await?.remove(key))
    }

    async fn set(&self, ns: Namespace, key: &str, value: Value) -> Result<(), StoreError> {
        self.set_many(ns, vec![(key, value)]).await
    }

    async fn set_many(&self, ns: Namespace, items: Vec<(&str, Value)>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read(ns).await?;
        for (key, value) in items {
            map.insert(key.to_string(), value);
        }
        self.write(ns, &map).await
    }

    async fn remove(&self, ns: Namespace, keys: &[&str]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read(ns).await?;
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() == before {
            return Ok(());
        }
        self.write(ns, &map).await
    }

    async fn clear(&self, ns: Namespace) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(self.path(ns)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        store
            .set_many(
                Namespace::Sync,
                vec![("a", json!("x")), ("b", json!(42))],
            )
            .await
            .unwrap();
        store.remove(Namespace::Sync, &["a"]).await.unwrap();
        drop(store);

        let store = FileStore::new(dir.path()).unwrap();
        assert_eq!(store.get(Namespace::Sync, "a").await.unwrap(), None);
        assert_eq!(store.get(Namespace::Sync, "b").await.unwrap(), Some(json!(42)));
    }

    #[tokio::test]
    async fn clear_on_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        store.clear(Namespace::Local).await.unwrap();
        assert_eq!(store.get(Namespace::Local, "x").await.unwrap(), None);
    }
}
