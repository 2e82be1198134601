use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{KeyValueStore, Namespace};
use crate::error::StoreError;

/// In-process store, contents are lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<Namespace, HashMap<String, Value>>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<Value>, StoreError> {
        let data = self.data.lock().await;
        Ok(data.get(&ns).and_then(|m| m.get(key)).cloned())
    }

    async fn set(&self, ns: Namespace, key: &str, value: Value) -> Result<(), StoreError> {
        self.set_many(ns, vec![(key, value)]).await
    }

    async fn set_many(&self, ns: Namespace, items: Vec<(&str, Value)>) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        let map = data.entry(ns).or_default();
        for (key, value) in items {
            map.insert(key.to_string(), value);
        }
        Ok(())
    }

    async fn remove(&self, ns: Namespace, keys: &[&str]) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        if let Some(map) = data.get_mut(&ns) {
            for key in keys {
                map.remove(*key);
            }
        }
        Ok(())
    }

    async fn clear(&self, ns: Namespace) -> Result<(), StoreError> {
        self.data.lock().await.remove(&ns);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = MemoryStore::default();
        store.set(Namespace::Sync, "k", json!(1)).await.unwrap();
        assert_eq!(store.get(Namespace::Local, "k").await.unwrap(), None);

        store.clear(Namespace::Local).await.unwrap();
        assert_eq!(store.get(Namespace::Sync, "k").await.unwrap(), Some(json!(1)));
    }
}
