//! Persistent cache storage on the local filesystem.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<hex(store name)>/<sha256(request identity)>.entry
//! ```
//!
//! Each entry file is a 4-byte big-endian metadata length, the JSON
//! metadata, then the raw body. Writes go to a temporary file that is
//! renamed into place, so readers see either the old entry or the new one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use super::storage::{ensure_cacheable, CacheStorage, CacheStore};
use crate::error::{CacheError, CacheResult};
use crate::request::{Request, RequestKey};
use crate::response::{Response, ResponseType};

const ENTRY_EXTENSION: &str = "entry";

/// Length prefix size for the metadata block
const META_LEN_BYTES: usize = 4;

/// Distinguishes concurrent temp files for the same entry
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Metadata stored alongside each body. `cached_at` is informational only;
/// entries never expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    key: RequestKey,
    status: u16,
    response_type: ResponseType,
    url: Option<String>,
    headers: Vec<(String, String)>,
    cached_at: DateTime<Utc>,
}

impl EntryMeta {
    fn new(key: RequestKey, response: &Response) -> Self {
        Self {
            key,
            status: response.status(),
            response_type: response.response_type(),
            url: response.url().map(str::to_string),
            headers: response.headers().to_vec(),
            cached_at: Utc::now(),
        }
    }

    fn into_response(self, body: Vec<u8>) -> Response {
        let response = Response::new(self.status, self.response_type)
            .with_headers(self.headers)
            .with_body(body);
        match self.url {
            Some(url) => response.with_url(url),
            None => response,
        }
    }
}

fn encode_entry(meta: &EntryMeta, body: &[u8]) -> CacheResult<Vec<u8>> {
    let meta = serde_json::to_vec(meta)?;
    let len = u32::try_from(meta.len())
        .map_err(|_| CacheError::Corrupt("entry metadata too large".to_string()))?;
    let mut bytes = Vec::with_capacity(META_LEN_BYTES + meta.len() + body.len());
    bytes.extend_from_slice(&len.to_be_bytes());
    bytes.extend_from_slice(&meta);
    bytes.extend_from_slice(body);
    Ok(bytes)
}

fn decode_entry(bytes: &[u8]) -> CacheResult<(EntryMeta, Vec<u8>)> {
    if bytes.len() < META_LEN_BYTES {
        return Err(CacheError::Corrupt("entry shorter than header".to_string()));
    }
    let (len, rest) = bytes.split_at(META_LEN_BYTES);
    let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
    if rest.len() < len {
        return Err(CacheError::Corrupt("entry metadata truncated".to_string()));
    }
    let (meta, body) = rest.split_at(len);
    Ok((serde_json::from_slice(meta)?, body.to_vec()))
}

/// Read a file, mapping "not found" to `None`
async fn read_optional(path: &Path) -> CacheResult<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: PathBuf) -> CacheResult<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_path(&self, name: &str) -> PathBuf {
        self.root.join(hex::encode(name.as_bytes()))
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    type Store = DiskStore;

    async fn open(&self, name: &str) -> CacheResult<Arc<DiskStore>> {
        let dir = self.store_path(name);
        fs::create_dir_all(&dir).await?;
        Ok(Arc::new(DiskStore {
            name: name.to_string(),
            dir,
        }))
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(fs::try_exists(self.store_path(name)).await?)
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let decoded = file_name
                .to_str()
                .and_then(|s| hex::decode(s).ok())
                .and_then(|bytes| String::from_utf8(bytes).ok());
            match decoded {
                Some(name) => names.push(name),
                None => debug!(dir = ?file_name, "Skipping foreign directory in cache root"),
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        match fs::remove_dir_all(self.store_path(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct DiskStore {
    name: String,
    dir: PathBuf,
}

impl DiskStore {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn entry_path(&self, key: &RequestKey) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.digest(), ENTRY_EXTENSION))
    }

    fn temp_path(&self, key: &RequestKey) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{}.{}.{}.tmp", key.digest(), std::process::id(), n))
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn lookup(&self, request: &Request) -> CacheResult<Option<Response>> {
        if !request.is_cacheable() {
            return Ok(None);
        }
        let key = request.key();
        let Some(bytes) = read_optional(&self.entry_path(&key)).await? else {
            return Ok(None);
        };
        let (meta, body) = decode_entry(&bytes)?;
        if meta.key != key {
            warn!(store = %self.name, expected = %key, found = %meta.key, "Entry digest collision");
            return Ok(None);
        }
        Ok(Some(meta.into_response(body)))
    }

    async fn put(&self, request: &Request, response: Response) -> CacheResult<()> {
        ensure_cacheable(request)?;
        let key = request.key();
        let bytes = encode_entry(&EntryMeta::new(key.clone(), &response), response.body())?;

        let temp = self.temp_path(&key);
        fs::write(&temp, bytes).await?;
        if let Err(e) = fs::rename(&temp, self.entry_path(&key)).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        debug!(store = %self.name, key = %key, "Stored entry");
        Ok(())
    }

    async fn delete(&self, request: &Request) -> CacheResult<bool> {
        match fs::remove_file(self.entry_path(&request.key())).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
        let mut keys = Vec::new();
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            // Entry may have been deleted since read_dir listed it
            let Some(bytes) = read_optional(&path).await? else {
                continue;
            };
            match decode_entry(&bytes) {
                Ok((meta, _)) => keys.push(meta.key),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable entry"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}
