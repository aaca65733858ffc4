//! Federated taxon identifier resolution against Wikidata.
//!
//! ```text
//! "NCBI:9606" ──► TaxonomyProvider::Ncbi ──► P685 ──► SPARQL ──► results.bindings
//!                                                                    │
//!        ┌───────────────────────────────────────────────────────────┘
//!        ▼
//!   WD:Q15978631 (anchor), NCBI:9606, GBIF:2436436, ITIS:180092, ...
//! ```
//!
//! - [`SparqlEndpoint`] executes a query and returns the raw JSON response;
//!   [`HttpSparqlEndpoint`] is a fail-fast blocking HTTPS client (timeouts, no
//!   retries).
//! - [`WikidataResolver`] enumerates taxon identifier schemes and resolves an
//!   external id into cross-referenced candidates.
//! - [`SparqlQueries`] renders the page-info query templates.
//! - [`CachingResolver`] memoizes resolutions in a durable cache.

pub mod caching;
pub mod config;
pub mod endpoint;
pub mod query;
pub mod resolver;

pub use caching::CachingResolver;
pub use config::ResolverConfig;
pub use endpoint::{HttpSparqlEndpoint, SparqlEndpoint};
pub use query::{Placeholder, QueryBuilder, QueryTemplates, SparqlQueries, SparqlTemplate, TemplateKind};
pub use resolver::{RelatedTaxonIds, WikidataResolver};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("SPARQL endpoint answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid SPARQL endpoint [{0}]")]
    InvalidEndpoint(String),
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read query template [{path}]: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache error: {0}")]
    Cache(#[from] taxalink_cache::CacheError),
    #[error("invalid config value {name}={value:?}")]
    Config { name: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ResolverError>;
