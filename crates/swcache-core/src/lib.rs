//! Core library for swcache.
//!
//! swcache is a cache-first request proxy for a client-side application.
//! It owns one versioned cache store, seeds it with a fixed manifest of
//! required resources at install time, deletes stores left behind by older
//! versions at activation, and then answers every intercepted request from
//! the cache when it can and from the network when it must.
//!
//! The pieces:
//! - [`config`]: the version token, scope, and manifest the worker runs with
//! - [`cache`]: the cache storage capability, with memory and disk backends
//! - [`net`]: the network fetch capability, backed by reqwest
//! - [`lifecycle`]: the install and activate phases
//! - [`interceptor`]: the cache-first policy for intercepted requests
//! - [`worker`]: ties the above together behind a small state machine

pub mod cache;
pub mod config;
pub mod error;
pub mod host;
pub mod interceptor;
pub mod lifecycle;
pub mod net;
pub mod request;
pub mod response;
pub mod version;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheStorage, CacheStore, DiskStorage, MemoryStorage};
pub use config::Config;
pub use error::{CacheError, CacheResult};
pub use host::{HostControl, LocalHost};
pub use interceptor::{FetchOutcome, Interceptor};
pub use lifecycle::{ActivationReport, InstallReport, LifecycleManager};
pub use net::{FetchError, Fetcher, HttpFetcher};
pub use request::{Request, RequestKey, Scope};
pub use response::{Response, ResponseType};
pub use version::VersionToken;
pub use worker::{ServiceWorker, WorkerState};
