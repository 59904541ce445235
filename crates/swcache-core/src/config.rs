//! Worker configuration.
//!
//! The one value that matters is the version token: it names the current
//! cache store and bumping it retires every older store at the next
//! activation. Alongside it sit the scope the worker controls, the
//! pre-cache manifest, and where on disk the stores live.
//!
//! Configuration is stored at `~/.config/swcache/config.json`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};
use crate::request::{Request, Scope};
use crate::version::VersionToken;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "swcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: VersionToken,
    /// Base URL the worker controls; relative manifest entries resolve here
    pub scope: String,
    /// Resources that must be cached before install succeeds
    pub manifest: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    /// No timeout when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            VersionToken::new("swcache-v1"),
            "http://localhost:8080/",
            vec!["./".to_string(), "./index.html".to_string()],
        )
    }
}

impl Config {
    pub fn new(version: VersionToken, scope: impl Into<String>, manifest: Vec<String>) -> Self {
        Self {
            version,
            scope: scope.into(),
            manifest,
            cache_dir: None,
            request_timeout_secs: None,
        }
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Root directory for the cache stores
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn scope(&self) -> CacheResult<Scope> {
        Scope::parse(&self.scope)
    }

    /// Manifest entries resolved against the scope. Two identifiers that
    /// resolve to the same request are rejected.
    pub fn manifest_requests(&self) -> CacheResult<Vec<Request>> {
        let scope = self.scope()?;
        let mut seen = HashSet::new();
        let mut requests = Vec::with_capacity(self.manifest.len());
        for identifier in &self.manifest {
            let request = scope.request(identifier)?;
            if !seen.insert(request.key()) {
                return Err(CacheError::DuplicateEntry(identifier.clone()));
            }
            requests.push(request);
        }
        Ok(requests)
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.version.is_empty() {
            return Err(CacheError::InvalidConfig(
                "version token must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(CacheError::InvalidConfig(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        self.manifest_requests()?;
        Ok(())
    }
}
