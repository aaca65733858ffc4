//! Taxalink core: taxon identity types shared by every resolution component.
//!
//! ```text
//! ┌───────────────┐     ┌───────────────┐     ┌──────────────────┐
//! │  raw name     │────►│  normalize()  │────►│  lookup key      │
//! └───────────────┘     └───────────────┘     └──────────────────┘
//!
//! ┌───────────────┐     ┌───────────────────────┐     ┌─────────────┐
//! │ "NCBI:9606"   │────►│  TaxonomyProvider     │────►│  P685       │
//! │ (external id) │     │  ProviderIdentifierMap│◄────│ (property)  │
//! └───────────────┘     └───────────────────────┘     └─────────────┘
//! ```
//!
//! ## Contents
//!
//! - [`Term`], [`Taxon`], [`TaxonRecord`]: the data model passed between the
//!   lookup tables, the federated resolver and the batch linker.
//! - [`normalize`]: canonical lookup keys for raw names.
//! - [`TaxonomyProvider`] / [`ProviderIdentifierMap`]: external id prefixes
//!   and their federated knowledge-base properties.
//! - [`HomonymFilter`]: veto for contextually implausible matches.

pub mod homonym;
pub mod normalize;
pub mod provider;
pub mod term;

pub use homonym::{HomonymFilter, LineageHomonymFilter, NeverHomonym};
pub use normalize::normalize;
pub use provider::{
    parse_external_id, ProviderIdentifierMap, TaxonomyProvider, UnknownProvider,
    WORLD_OF_FLORA_ONLINE_PROPERTY,
};
pub use term::{
    RelationType, Taxon, TaxonRecord, Term, TermMatch, TermRequest, NO_MATCH,
};
