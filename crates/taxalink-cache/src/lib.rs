//! Durable memoization cache.
//!
//! Expensive lookups (federated queries, reference-table downloads) are
//! memoized across runs in named, memory-mapped key-value stores:
//!
//! ```text
//! <cache_dir>/
//!   mapdb/
//!     wikidata-related-ids     ← one store per name
//!     reference-tables
//! ```
//!
//! Each store is an append-only log of length-prefixed records. Opening a store
//! maps the file and rebuilds the key index; the newest record for a key wins.
//! Writes are not transactional and not fsynced per record: a crash may lose
//! the tail, and a torn trailing record is truncated on the next open.
//!
//! There is no eviction and no TTL. Entries persist until [`DurableCache::clear`].
//! A store is meant to be opened by one process at a time.

mod store;

pub use store::DurableCache;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`CacheConfig::cache_dir`].
pub const TAXALINK_CACHE_DIR_ENV: &str = "TAXALINK_CACHE_DIR";

/// Default cache root, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "target/term-cache";

const STORE_SUBDIR: &str = "mapdb";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cache name [{0}]")]
    InvalidName(String),
    #[error("[{path}] is not a cache store")]
    NotAStore { path: PathBuf },
    #[error("record too large: {0} bytes")]
    RecordTooLarge(usize),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root under which named stores are created.
    pub cache_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

impl CacheConfig {
    /// Default config, with `TAXALINK_CACHE_DIR` taking precedence when set.
    pub fn from_env() -> Self {
        match std::env::var(TAXALINK_CACHE_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => Self {
                cache_dir: PathBuf::from(dir.trim()),
            },
            _ => Self::default(),
        }
    }
}

// ============================================================================
// Cache service
// ============================================================================

/// Opens named stores under a cache root.
#[derive(Debug, Clone)]
pub struct CacheService {
    cache_dir: PathBuf,
}

impl Default for CacheService {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl CacheService {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.cache_dir.clone())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn set_cache_dir(&mut self, cache_dir: impl Into<PathBuf>) {
        self.cache_dir = cache_dir.into();
    }

    /// Directory holding the store files.
    pub fn store_dir(&self) -> PathBuf {
        self.cache_dir.join(STORE_SUBDIR)
    }

    /// Open (or create) the store called `name`, creating the directory tree
    /// first when it does not exist yet.
    pub fn init_db(&self, name: &str) -> Result<DurableCache> {
        validate_name(name)?;
        let dir = self.store_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            tracing::debug!(dir = %dir.display(), "created cache dir");
        }
        DurableCache::open(name, &dir.join(name))
    }
}

fn validate_name(name: &str) -> Result<()> {
    let bad = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(CacheError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_db_creates_nested_dirs() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("a").join("b").join("term-cache");
        let service = CacheService::new(&root);

        let cache = service.init_db("x").unwrap();

        assert!(root.join("mapdb").is_dir());
        assert!(root.join("mapdb").join("x").is_file());
        assert_eq!(cache.name(), "x");
    }

    #[test]
    fn named_stores_coexist() {
        let dir = tempdir().unwrap();
        let service = CacheService::new(dir.path());

        let a = service.init_db("a").unwrap();
        let b = service.init_db("b").unwrap();
        a.put(b"k", b"from-a").unwrap();
        b.put(b"k", b"from-b").unwrap();

        assert_eq!(a.get(b"k").unwrap().as_deref(), Some(&b"from-a"[..]));
        assert_eq!(b.get(b"k").unwrap().as_deref(), Some(&b"from-b"[..]));
    }

    #[test]
    fn rejects_path_like_names() {
        let dir = tempdir().unwrap();
        let service = CacheService::new(dir.path());
        for name in ["", "..", "a/b", "a\\b"] {
            assert!(
                matches!(service.init_db(name), Err(CacheError::InvalidName(_))),
                "{name:?}"
            );
        }
    }

    #[test]
    fn cache_dir_can_be_replaced() {
        let mut service = CacheService::default();
        assert_eq!(service.cache_dir(), Path::new(DEFAULT_CACHE_DIR));
        service.set_cache_dir("/tmp/elsewhere");
        assert_eq!(service.store_dir(), Path::new("/tmp/elsewhere/mapdb"));
    }
}
