//! Request identity and scope resolution.
//!
//! A `Request` is what the host hands the interceptor. Its `RequestKey`
//! (method plus absolute URL without fragment) is the identity cache stores
//! are keyed by. Manifest identifiers like `./index.html` become requests by
//! resolving them against the worker's `Scope`.

use std::fmt;

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CacheError, CacheResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Only GET requests are matched against or written to a cache store
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    pub fn key(&self) -> RequestKey {
        let mut url = self.url.clone();
        url.set_fragment(None);
        RequestKey {
            method: self.method.as_str().to_string(),
            url: url.to_string(),
        }
    }
}

/// Identity of a request inside a cache store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    /// Stable hex digest, used for on-disk entry names
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Base URL the worker controls. Relative identifiers resolve against it and
/// its origin decides whether a response is same-origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    base: Url,
}

impl Scope {
    pub fn parse(base: &str) -> CacheResult<Self> {
        let base = Url::parse(base).map_err(|e| CacheError::InvalidUrl {
            input: base.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(CacheError::InvalidUrl {
                input: base.to_string(),
                reason: "scope must be a hierarchical URL".to_string(),
            });
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a relative path or absolute URL against the scope
    pub fn resolve(&self, identifier: &str) -> CacheResult<Url> {
        self.base.join(identifier).map_err(|e| CacheError::InvalidUrl {
            input: identifier.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn request(&self, identifier: &str) -> CacheResult<Request> {
        Ok(Request::get(self.resolve(identifier)?))
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        self.base.origin() == url.origin()
    }

    /// Origin as it appears in `Access-Control-Allow-Origin`
    pub fn origin_header_value(&self) -> String {
        self.base.origin().ascii_serialization()
    }
}
