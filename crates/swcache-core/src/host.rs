//! Consumer control exposed by the host environment.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::error::CacheResult;

/// What the worker may ask of its host: skip the waiting period between
/// install and activate, and take over consumers that are already open.
#[async_trait]
pub trait HostControl: Send + Sync {
    /// Promote this worker as soon as it is installed, preempting any
    /// previous version that still controls consumers
    fn skip_waiting(&self);

    /// Route every open consumer through this worker without a reload.
    /// Returns how many consumers were claimed.
    async fn claim_clients(&self) -> CacheResult<usize>;
}

/// Host used when the worker runs in-process: it simply records what it
/// was asked to do.
#[derive(Debug, Default)]
pub struct LocalHost {
    waiting_skipped: AtomicBool,
    open_clients: AtomicUsize,
    controlled_clients: AtomicUsize,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_open_clients(count: usize) -> Self {
        let host = Self::default();
        host.open_clients.store(count, Ordering::SeqCst);
        host
    }

    /// A consumer opened after activation is controlled from the start
    pub fn open_client(&self) {
        self.open_clients.fetch_add(1, Ordering::SeqCst);
    }

    pub fn waiting_skipped(&self) -> bool {
        self.waiting_skipped.load(Ordering::SeqCst)
    }

    pub fn controlled_clients(&self) -> usize {
        self.controlled_clients.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostControl for LocalHost {
    fn skip_waiting(&self) {
        self.waiting_skipped.store(true, Ordering::SeqCst);
    }

    async fn claim_clients(&self) -> CacheResult<usize> {
        let open = self.open_clients.load(Ordering::SeqCst);
        self.controlled_clients.store(open, Ordering::SeqCst);
        info!(clients = open, "Claimed open clients");
        Ok(open)
    }
}
