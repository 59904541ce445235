use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::error::{CacheError, CacheResult};
use crate::net::{FetchError, Fetcher};
use crate::request::{Request, RequestKey};
use crate::response::{Response, ResponseType};

/// A single named cache store.
///
/// Implementations must be safe under concurrent lookups, writes, and
/// deletes; callers layer no locking of their own on top.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up the stored response for `request` (the Cache API's `match`).
    /// Non-GET requests never match.
    async fn lookup(&self, request: &Request) -> CacheResult<Option<Response>>;

    /// Store `response` under the identity of `request`, replacing any
    /// previous entry. Fails with `UnsupportedMethod` for non-GET requests.
    async fn put(&self, request: &Request, response: Response) -> CacheResult<()>;

    /// Remove one entry. Returns whether an entry was removed.
    async fn delete(&self, request: &Request) -> CacheResult<bool>;

    /// Identities of every stored entry, sorted
    async fn keys(&self) -> CacheResult<Vec<RequestKey>>;
}

/// The set of named stores owned by this origin.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    type Store: CacheStore + 'static;

    /// Open the store called `name`, creating it when absent
    async fn open(&self, name: &str) -> CacheResult<Arc<Self::Store>>;

    async fn has(&self, name: &str) -> CacheResult<bool>;

    /// Names of every existing store, sorted
    async fn keys(&self) -> CacheResult<Vec<String>>;

    /// Delete a whole store. Returns whether it existed.
    async fn delete(&self, name: &str) -> CacheResult<bool>;
}

pub(crate) fn ensure_cacheable(request: &Request) -> CacheResult<()> {
    if request.is_cacheable() {
        Ok(())
    } else {
        Err(CacheError::UnsupportedMethod(request.method().to_string()))
    }
}

/// Fetch every request and store the responses (the Cache API's `addAll`).
///
/// All fetches run concurrently. If any of them fails, comes back opaque,
/// or has a non-2xx status, the whole call fails and nothing is written. Duplicate
/// identities are rejected up front. Returns the number of entries written.
pub async fn add_all<S, F>(store: &S, fetcher: &F, requests: &[Request]) -> CacheResult<usize>
where
    S: CacheStore + ?Sized,
    F: Fetcher + ?Sized,
{
    let mut seen = HashSet::new();
    for request in requests {
        ensure_cacheable(request)?;
        if !seen.insert(request.key()) {
            return Err(CacheError::DuplicateEntry(request.url().to_string()));
        }
    }

    let responses = try_join_all(requests.iter().map(|request| async move {
        let response = fetcher.fetch(request).await?;
        if !matches!(
            response.response_type(),
            ResponseType::Basic | ResponseType::Cors | ResponseType::Default
        ) {
            return Err(FetchError::Unreadable {
                url: request.url().to_string(),
                response_type: response.response_type(),
            });
        }
        if !response.ok() {
            return Err(FetchError::from_status(
                request.url().as_str(),
                response.status(),
                response.body(),
            ));
        }
        debug!(url = %request.url(), status = response.status(), "Fetched manifest entry");
        Ok::<_, FetchError>(response)
    }))
    .await?;

    try_join_all(
        requests
            .iter()
            .zip(responses)
            .map(|(request, response)| store.put(request, response)),
    )
    .await?;

    Ok(requests.len())
}
