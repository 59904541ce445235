//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheStorage, CacheStore, MemoryStorage, MemoryStore};
use crate::error::{CacheError, CacheResult};
use crate::net::{FetchError, Fetcher};
use crate::request::{Request, RequestKey, Scope};
use crate::response::Response;

pub fn scope() -> Scope {
    Scope::parse("https://app.example/fuel/").unwrap()
}

/// Serves canned responses by URL; anything unknown is unreachable.
#[derive(Default)]
pub struct FakeFetcher {
    routes: HashMap<String, Response>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, scope: &Scope, identifier: &str, response: Response) -> Self {
        let url = scope.resolve(identifier).unwrap();
        self.routes.insert(url.to_string(), response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut url = request.url().clone();
        url.set_fragment(None);
        self.routes
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Unreachable(url.to_string()))
    }
}

/// Memory storage whose store writes take `delay` to land and whose
/// deletes fail for the names in `failing_deletes`.
pub struct QuirkyStorage {
    inner: MemoryStorage,
    delay: Duration,
    failing_deletes: HashSet<String>,
}

impl QuirkyStorage {
    pub fn slow_writes(delay: Duration) -> Self {
        Self {
            inner: MemoryStorage::new(),
            delay,
            failing_deletes: HashSet::new(),
        }
    }

    pub fn failing_deletes(names: &[&str]) -> Self {
        Self {
            inner: MemoryStorage::new(),
            delay: Duration::ZERO,
            failing_deletes: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Direct handle on the underlying store, bypassing the write delay
    pub async fn inner_store(&self, name: &str) -> Arc<MemoryStore> {
        self.inner.open(name).await.unwrap()
    }
}

pub struct QuirkyStore {
    inner: Arc<MemoryStore>,
    delay: Duration,
}

#[async_trait]
impl CacheStore for QuirkyStore {
    async fn lookup(&self, request: &Request) -> CacheResult<Option<Response>> {
        self.inner.lookup(request).await
    }

    async fn put(&self, request: &Request, response: Response) -> CacheResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(request, response).await
    }

    async fn delete(&self, request: &Request) -> CacheResult<bool> {
        self.inner.delete(request).await
    }

    async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
        self.inner.keys().await
    }
}

#[async_trait]
impl CacheStorage for QuirkyStorage {
    type Store = QuirkyStore;

    async fn open(&self, name: &str) -> CacheResult<Arc<QuirkyStore>> {
        Ok(Arc::new(QuirkyStore {
            inner: self.inner.open(name).await?,
            delay: self.delay,
        }))
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        self.inner.has(name).await
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        if self.failing_deletes.contains(name) {
            return Err(CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("cannot delete {name}"),
            )));
        }
        self.inner.delete(name).await
    }
}
