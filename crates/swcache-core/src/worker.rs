//! The worker: lifecycle, interception, and the state between them.
//!
//! The host drives a worker through `install`, then `activate`, and only
//! then routes requests through `fetch`. Each of those is an async task
//! whose `Result` tells the host whether it may proceed.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::cache::CacheStorage;
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::host::HostControl;
use crate::interceptor::{FetchOutcome, Interceptor};
use crate::lifecycle::{ActivationReport, InstallReport, LifecycleManager};
use crate::net::Fetcher;
use crate::request::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; the host keeps using the previous version
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

pub struct ServiceWorker<S, F> {
    lifecycle: LifecycleManager<S, F>,
    interceptor: Interceptor<S, F>,
    host: Arc<dyn HostControl>,
    state: Mutex<WorkerState>,
}

impl<S, F> ServiceWorker<S, F>
where
    S: CacheStorage + 'static,
    F: Fetcher,
{
    /// Build a worker from a validated config
    pub fn new(
        config: &Config,
        storage: Arc<S>,
        fetcher: Arc<F>,
        host: Arc<dyn HostControl>,
    ) -> CacheResult<Self> {
        let manifest = config.manifest_requests()?;
        let version = config.version.clone();
        Ok(Self {
            lifecycle: LifecycleManager::new(
                storage.clone(),
                fetcher.clone(),
                version.clone(),
                manifest,
            ),
            interceptor: Interceptor::new(storage, fetcher, version),
            host,
            state: Mutex::new(WorkerState::Parsed),
        })
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Move to `to` if the current state is one of `from`
    fn transition(
        &self,
        operation: &'static str,
        from: &[WorkerState],
        to: WorkerState,
    ) -> CacheResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !from.contains(&*state) {
            return Err(CacheError::InvalidState {
                operation,
                state: *state,
            });
        }
        *state = to;
        Ok(())
    }

    /// Handle the `install` event. Re-installing an installed worker is
    /// allowed and refreshes the manifest entries.
    pub async fn install(&self) -> CacheResult<InstallReport> {
        self.transition(
            "install",
            &[WorkerState::Parsed, WorkerState::Installed],
            WorkerState::Installing,
        )?;

        match self.lifecycle.install(self.host.as_ref()).await {
            Ok(report) => {
                info!(store = %report.store, cached = report.cached, "Install complete");
                self.set_state(WorkerState::Installed);
                Ok(report)
            }
            Err(e) => {
                warn!(version = %self.lifecycle.version(), error = %e, "Install failed");
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    /// Handle the `activate` event. On failure the worker stays installed
    /// so the host may try again.
    pub async fn activate(&self) -> CacheResult<ActivationReport> {
        self.transition("activate", &[WorkerState::Installed], WorkerState::Activating)?;

        match self.lifecycle.activate(self.host.as_ref()).await {
            Ok(report) => {
                info!(
                    version = %self.lifecycle.version(),
                    deleted = report.deleted.len(),
                    failed = report.failed.len(),
                    "Activation complete"
                );
                self.set_state(WorkerState::Activated);
                Ok(report)
            }
            Err(e) => {
                warn!(version = %self.lifecycle.version(), error = %e, "Activation failed");
                self.set_state(WorkerState::Installed);
                Err(e)
            }
        }
    }

    /// Handle a `fetch` event. Only an activated worker intercepts; any
    /// other state is reported so the host can go to the network itself.
    pub async fn fetch(&self, request: &Request) -> CacheResult<FetchOutcome> {
        let state = self.state();
        if state != WorkerState::Activated {
            return Err(CacheError::InvalidState {
                operation: "intercept fetch",
                state,
            });
        }
        Ok(self.interceptor.handle(request).await)
    }
}
