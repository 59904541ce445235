//! Cache-first request interception.
//!
//! For each request: serve the stored response if there is one, otherwise
//! go to the network. Eligible network responses are copied into the current
//! store in the background while the original goes straight back to the
//! consumer. When both cache and network come up empty the consumer gets
//! nothing and the failure is only logged.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{CacheStorage, CacheStore};
use crate::net::Fetcher;
use crate::request::Request;
use crate::response::Response;
use crate::version::VersionToken;

/// How a single intercepted request was answered.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Served from the current store without touching the network
    CacheHit(Response),
    /// Served from the network; a copy is being written to the store.
    /// Awaiting `write` is optional and only tells you when it landed.
    Stored {
        response: Response,
        write: JoinHandle<()>,
    },
    /// Served from the network without caching (ineligible, or not GET)
    Uncached(Response),
    /// Not cached and the network failed
    Offline,
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::CacheHit(response)
            | Self::Stored { response, .. }
            | Self::Uncached(response) => Some(response),
            Self::Offline => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::CacheHit(response)
            | Self::Stored { response, .. }
            | Self::Uncached(response) => Some(response),
            Self::Offline => None,
        }
    }

    /// Short label for diagnostics
    pub fn source(&self) -> &'static str {
        match self {
            Self::CacheHit(_) => "cache",
            Self::Stored { .. } => "network+stored",
            Self::Uncached(_) => "network",
            Self::Offline => "offline",
        }
    }
}

pub struct Interceptor<S, F> {
    storage: Arc<S>,
    fetcher: Arc<F>,
    version: VersionToken,
}

impl<S, F> Interceptor<S, F>
where
    S: CacheStorage + 'static,
    F: Fetcher,
{
    pub fn new(storage: Arc<S>, fetcher: Arc<F>, version: VersionToken) -> Self {
        Self {
            storage,
            fetcher,
            version,
        }
    }

    /// Answer one request. Never fails: every error ends up as a log line
    /// and, at worst, `FetchOutcome::Offline`.
    pub async fn handle(&self, request: &Request) -> FetchOutcome {
        if let Some(cached) = self.lookup(request).await {
            debug!(url = %request.url(), "Cache hit");
            return FetchOutcome::CacheHit(cached);
        }

        let response = match self.fetcher.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %request.url(), error = %e, "Offline and resource not cached");
                return FetchOutcome::Offline;
            }
        };

        if !request.is_cacheable() || !response.is_cache_eligible() {
            debug!(
                url = %request.url(),
                status = response.status(),
                response_type = %response.response_type(),
                "Passing through uncached response"
            );
            return FetchOutcome::Uncached(response);
        }

        let write = self.store_in_background(request.clone(), response.clone());
        FetchOutcome::Stored { response, write }
    }

    /// `handle`, reduced to what the consumer sees
    pub async fn respond(&self, request: &Request) -> Option<Response> {
        self.handle(request).await.into_response()
    }

    /// Store errors count as a miss
    async fn lookup(&self, request: &Request) -> Option<Response> {
        if !request.is_cacheable() {
            return None;
        }
        let result = match self.storage.open(self.version.store_name()).await {
            Ok(store) => store.lookup(request).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(found) => found,
            Err(e) => {
                warn!(url = %request.url(), error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    fn store_in_background(&self, request: Request, response: Response) -> JoinHandle<()> {
        let storage = self.storage.clone();
        let name = self.version.store_name().to_string();
        tokio::spawn(async move {
            let result = match storage.open(&name).await {
                Ok(store) => store.put(&request, response).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => debug!(store = %name, url = %request.url(), "Cached network response"),
                Err(e) => warn!(store = %name, url = %request.url(), error = %e, "Failed to cache response"),
            }
        })
    }
}
