//! The version token that names the current cache generation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque string fixed at deploy time. It doubles as the name of the current
/// cache store, so bumping it is how every previously cached entry gets
/// invalidated at the next activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Name of the cache store this version owns
    pub fn store_name(&self) -> &str {
        &self.0
    }

    /// Whether `store_name` belongs to this version rather than a stale one
    pub fn is_current(&self, store_name: &str) -> bool {
        self.0 == store_name
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_name_is_the_token() {
        let version = VersionToken::new("fuel-lens-v2");
        assert_eq!(version.store_name(), "fuel-lens-v2");
        assert_eq!(version.to_string(), "fuel-lens-v2");
    }

    #[test]
    fn test_is_current() {
        let version = VersionToken::new("v2");
        assert!(version.is_current("v2"));
        assert!(!version.is_current("v1"));
        assert!(!version.is_current("v2 "));
    }

    #[test]
    fn test_deserializes_from_plain_string() {
        let version: VersionToken = serde_json::from_str("\"v7\"").unwrap();
        assert_eq!(version, VersionToken::new("v7"));
        assert!(VersionToken::new("  ").is_empty());
    }
}
