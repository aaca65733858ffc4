//! Links every taxon in a catalog to the terms a matcher finds for it.
//!
//! ```text
//!   TaxonCatalog::scan ──► [batch of ≤ N records] ──► TermMatcher::match_terms
//!                                                            │
//!                  ┌─────────────────────────────────────────┘
//!                  ▼
//!   TermMatch ──► relation? ──► HomonymFilter ──► TaxonLinkWriter::connect_taxa
//! ```
//!
//! A failed batch is logged and skipped; the run carries on with the next one.
//! Results of a batch are only written once its matcher call has succeeded.

pub mod config;
pub mod driver;
pub mod graph;
pub mod matcher;

pub use config::LinkerConfig;
pub use driver::{BatchStats, LinkReport, LinkerTermMatcher};
pub use graph::{MemoryCatalog, MemoryLinkStore, TaxonCatalog, TaxonLink, TaxonLinkWriter};
pub use matcher::{FederatedTermMatcher, LookupTermMatcher, TermMatcher};

use taxalink_lookup::LookupError;
use taxalink_wikidata::ResolverError;

/// A matcher failed for a whole batch.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("term lookup failed: {0}")]
    Lookup(#[from] LookupError),
    #[error("federated resolution failed: {0}")]
    Resolver(#[from] ResolverError),
    #[error("{0}")]
    Matcher(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("catalog scan failed: {0}")]
    Scan(String),
    #[error("cannot link to a taxon without an external id")]
    UnresolvedTarget,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
    #[error(transparent)]
    Graph(#[from] GraphError),
}
