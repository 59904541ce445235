//! In-process cache storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::storage::{ensure_cacheable, CacheStorage, CacheStore};
use crate::error::CacheResult;
use crate::request::{Request, RequestKey};
use crate::response::Response;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    stores: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    type Store = MemoryStore;

    async fn open(&self, name: &str) -> CacheResult<Arc<MemoryStore>> {
        if let Some(store) = self.stores.read().await.get(name) {
            return Ok(store.clone());
        }
        let mut stores = self.stores.write().await;
        Ok(stores.entry(name.to_string()).or_default().clone())
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(self.stores.read().await.contains_key(name))
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let mut names: Vec<String> = self.stores.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        Ok(self.stores.write().await.remove(name).is_some())
    }
}

/// One in-memory store. A handle that outlives a `delete` of its store keeps
/// working but is detached: reopening the name yields a fresh, empty store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<RequestKey, Response>>,
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn lookup(&self, request: &Request) -> CacheResult<Option<Response>> {
        if !request.is_cacheable() {
            return Ok(None);
        }
        Ok(self.entries.read().await.get(&request.key()).cloned())
    }

    async fn put(&self, request: &Request, response: Response) -> CacheResult<()> {
        ensure_cacheable(request)?;
        self.entries.write().await.insert(request.key(), response);
        Ok(())
    }

    async fn delete(&self, request: &Request) -> CacheResult<bool> {
        Ok(self.entries.write().await.remove(&request.key()).is_some())
    }

    async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
        let mut keys: Vec<RequestKey> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::response::ResponseType;
    use crate::testing::scope;
    use reqwest::Method;

    #[tokio::test]
    async fn test_open_creates_once() {
        let storage = MemoryStorage::new();
        assert!(!storage.has("v1").await.unwrap());

        let first = storage.open("v1").await.unwrap();
        let second = storage.open("v1").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(storage.keys().await.unwrap(), vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_store() {
        let storage = MemoryStorage::new();
        storage.open("v1").await.unwrap();
        storage.open("v2").await.unwrap();

        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["v2".to_string()]);
    }

    #[tokio::test]
    async fn test_put_replaces_entry() {
        let scope = scope();
        let store = MemoryStore::default();
        let request = scope.request("./index.html").unwrap();

        store
            .put(&request, Response::new(200, ResponseType::Basic).with_body("old"))
            .await
            .unwrap();
        store
            .put(&request, Response::new(200, ResponseType::Basic).with_body("new"))
            .await
            .unwrap();

        assert_eq!(store.keys().await.unwrap().len(), 1);
        let cached = store.lookup(&request).await.unwrap().unwrap();
        assert_eq!(cached.body(), b"new");
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let scope = scope();
        let store = MemoryStore::default();
        let request = scope.request("./a.js").unwrap();
        store
            .put(&request, Response::new(200, ResponseType::Basic))
            .await
            .unwrap();

        assert!(store.delete(&request).await.unwrap());
        assert!(store.lookup(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_get_is_never_stored_or_matched() {
        let scope = scope();
        let store = MemoryStore::default();
        let url = scope.resolve("./form").unwrap();
        let post = Request::new(Method::POST, url.clone());

        let err = store
            .put(&post, Response::new(200, ResponseType::Basic))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedMethod(_)));

        store
            .put(&Request::get(url), Response::new(200, ResponseType::Basic))
            .await
            .unwrap();
        assert!(store.lookup(&post).await.unwrap().is_none());
    }
}
