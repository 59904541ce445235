//! Cache storage module.
//!
//! A `CacheStorage` holds any number of named `CacheStore`s. Each store
//! maps a request identity to a stored response. Stores are only ever
//! removed whole; nothing here expires or evicts individual entries.
//!
//! Two backends:
//! - `MemoryStorage` for in-process use and tests
//! - `DiskStorage` for persistence across runs

pub mod disk;
pub mod memory;
pub mod storage;

pub use disk::{DiskStorage, DiskStore};
pub use memory::{MemoryStorage, MemoryStore};
pub use storage::{add_all, CacheStorage, CacheStore};
