//! Install and activate phases.
//!
//! Install seeds the current store with the pre-cache manifest, all or
//! nothing. Activate deletes every store that belongs to another version
//! and takes control of open consumers.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::cache::{add_all, CacheStorage};
use crate::error::CacheResult;
use crate::host::HostControl;
use crate::net::Fetcher;
use crate::request::Request;
use crate::version::VersionToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub store: String,
    pub cached: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Stale stores removed
    pub deleted: Vec<String>,
    /// Stale stores whose deletion failed, with the error. Not retried.
    pub failed: Vec<(String, String)>,
    pub clients_claimed: usize,
}

pub struct LifecycleManager<S, F> {
    storage: Arc<S>,
    fetcher: Arc<F>,
    version: VersionToken,
    manifest: Vec<Request>,
}

impl<S, F> LifecycleManager<S, F>
where
    S: CacheStorage,
    F: Fetcher,
{
    pub fn new(
        storage: Arc<S>,
        fetcher: Arc<F>,
        version: VersionToken,
        manifest: Vec<Request>,
    ) -> Self {
        Self {
            storage,
            fetcher,
            version,
            manifest,
        }
    }

    pub fn version(&self) -> &VersionToken {
        &self.version
    }

    pub fn manifest(&self) -> &[Request] {
        &self.manifest
    }

    /// Open the current store and fetch every manifest entry into it.
    ///
    /// Any failed fetch fails the whole install. Entries written by an
    /// earlier attempt are left in place.
    pub async fn install(&self, host: &dyn HostControl) -> CacheResult<InstallReport> {
        host.skip_waiting();

        let store = self.storage.open(self.version.store_name()).await?;
        info!(
            store = %self.version,
            entries = self.manifest.len(),
            "Caching core assets"
        );
        let cached = add_all(store.as_ref(), self.fetcher.as_ref(), &self.manifest).await?;

        Ok(InstallReport {
            store: self.version.store_name().to_string(),
            cached,
        })
    }

    /// Delete every store not named by the current version, concurrently,
    /// then claim open consumers. Deletion failures are reported, not fatal.
    pub async fn activate(&self, host: &dyn HostControl) -> CacheResult<ActivationReport> {
        let stale: Vec<String> = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| !self.version.is_current(name))
            .collect();

        let results = join_all(stale.iter().map(|name| async move {
            info!(store = %name, "Removing old cache");
            (name, self.storage.delete(name).await)
        }))
        .await;

        let mut report = ActivationReport::default();
        for (name, result) in results {
            match result {
                Ok(_) => report.deleted.push(name.clone()),
                Err(e) => {
                    warn!(store = %name, error = %e, "Failed to remove old cache");
                    report.failed.push((name.clone(), e.to_string()));
                }
            }
        }

        report.clients_claimed = host.claim_clients().await?;
        Ok(report)
    }
}
