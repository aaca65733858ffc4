//! Local name → term lookup tables.
//!
//! Reference tables are delimited text resources with the columns
//!
//! ```text
//! id <delim> sourceName <delim> targetId <delim> targetName [<delim> ...]
//! ```
//!
//! A [`MappingTermLookupService`] retrieves every configured resource through a
//! [`ResourceService`], builds one immutable [`MappingTable`] on first use and
//! answers [`TermLookupService::lookup_term_by_name`] from it. A lookup never
//! returns an empty list: misses come back as a single `NO_MATCH` term.

pub mod mapping;
pub mod resource;

pub use mapping::{
    build_mapping, MappingTable, MappingTableConfig, MappingTermLookupService, TermLookupService,
};
pub use resource::{
    CachingResourceService, HttpResourceService, LocalResourceService, ResourceService,
};

use std::path::PathBuf;

// ============================================================================
// Errors
// ============================================================================

/// Failure to retrieve a resource.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("IO error reading [{path}]: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP error fetching [{locator}]: {source}")]
    Http {
        locator: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP status {status} fetching [{locator}]")]
    Status { locator: String, status: u16 },
    #[error("unsupported resource locator [{0}]")]
    UnsupportedLocator(String),
    #[error("cache error: {0}")]
    Cache(#[from] taxalink_cache::CacheError),
}

/// Failure of a lookup service. Building a mapping is all-or-nothing, so any
/// of these leaves the service without a mapping.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("failed to retrieve mapping from [{locator}]: {source}")]
    Retrieve {
        locator: String,
        #[source]
        source: ResourceError,
    },
    #[error("failed to read mapping from [{locator}]: {source}")]
    Read {
        locator: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse mapping from [{locator}]: {source}")]
    Parse {
        locator: String,
        #[source]
        source: csv::Error,
    },
    #[error("delimiter [{0}] is not a single-byte character")]
    InvalidDelimiter(char),
}
