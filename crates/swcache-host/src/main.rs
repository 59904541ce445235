//! swcache host - drives a cache worker from the command line.
//!
//! Loads the worker config, runs install and activate against the on-disk
//! cache stores, then routes each URL given on the command line through
//! the cache-first interceptor and prints how it was answered.
//!
//! Usage: `swcache [--config <path>] [url-or-path ...]`

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use swcache_core::{Config, DiskStorage, FetchOutcome, HttpFetcher, LocalHost, ServiceWorker};

/// Set to a directory to also write daily-rolling log files there
const LOG_DIR_ENV: &str = "SWCACHE_LOG_DIR";

/// Log file prefix inside `LOG_DIR_ENV`
const LOG_FILE_PREFIX: &str = "swcache.log";

/// Initialize the tracing subscriber for logging.
/// The returned guard must live until exit so file logs get flushed.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

struct Args {
    config_path: Option<PathBuf>,
    targets: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut config_path = None;
    let mut targets = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args
                .next()
                .ok_or_else(|| anyhow::anyhow!("--config needs a path"))?;
            config_path = Some(PathBuf::from(path));
        } else {
            targets.push(arg);
        }
    }
    Ok(Args {
        config_path,
        targets,
    })
}

/// Wait for background cache writes, logging any that panicked or were
/// cancelled. Returns how many did not complete.
async fn finish_writes(writes: Vec<JoinHandle<()>>) -> usize {
    let mut failed = 0;
    for write in writes {
        if let Err(e) = write.await {
            warn!(error = %e, "Background cache write did not complete");
            failed += 1;
        }
    }
    failed
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    let args = parse_args()?;

    let config = match args.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate().context("Invalid configuration")?;
    info!(version = %config.version, scope = %config.scope, "swcache starting");

    let scope = config.scope()?;
    let storage = Arc::new(DiskStorage::new(config.cache_dir()?)?);
    let fetcher = Arc::new(HttpFetcher::new(scope.clone(), config.request_timeout())?);
    let host = Arc::new(LocalHost::with_open_clients(1));
    let worker = ServiceWorker::new(&config, storage, fetcher, host)?;

    let installed = worker.install().await.context("Install failed")?;
    println!("installed {} ({} entries)", installed.store, installed.cached);

    let activated = worker.activate().await.context("Activation failed")?;
    for name in &activated.deleted {
        println!("removed old cache {}", name);
    }
    for (name, error) in &activated.failed {
        eprintln!("could not remove old cache {}: {}", name, error);
    }

    let mut pending_writes = Vec::new();
    for target in &args.targets {
        let request = scope.request(target)?;
        let outcome = worker.fetch(&request).await?;
        let source = outcome.source();
        let response = match outcome {
            FetchOutcome::Stored { response, write } => {
                pending_writes.push(write);
                Some(response)
            }
            other => other.into_response(),
        };
        match response {
            Some(response) => println!(
                "{} {} {} {} bytes ({})",
                request.url(),
                response.status(),
                response.response_type(),
                response.body().len(),
                source
            ),
            None => println!("{} - no response ({})", request.url(), source),
        }
    }

    // Background cache writes would be dropped with the runtime
    finish_writes(pending_writes).await;

    info!("swcache shutting down");
    Ok(())
}
