//! Network fetch module.
//!
//! This module provides the `Fetcher` capability the lifecycle and the
//! interceptor use to reach the network, and `HttpFetcher`, the reqwest
//! implementation of it.

pub mod error;
pub mod fetcher;

pub use error::FetchError;
pub use fetcher::{Fetcher, HttpFetcher};
