//! Data model: terms, taxa, catalog records and match results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel id of a term that did not resolve.
///
/// A lookup miss is always represented by a [`Term`] carrying this id, never by
/// an empty result.
pub const NO_MATCH: &str = "no:match";

// ============================================================================
// Terms
// ============================================================================

/// An `{id, name}` pair produced by a lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    pub name: String,
}

impl Term {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The unresolved term for `name`.
    pub fn no_match(name: impl Into<String>) -> Self {
        Self::new(NO_MATCH, name)
    }

    pub fn is_no_match(&self) -> bool {
        self.id == NO_MATCH
    }
}

// ============================================================================
// Taxa
// ============================================================================

/// A taxon as seen by the resolvers: external id, name and optional lineage.
///
/// `path`, `path_names` and `path_ids` are `" | "`-separated lineages
/// (e.g. `"Animalia | Chordata | Mammalia"` with ranks
/// `"kingdom | phylum | class"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_names: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_ids: Option<String>,
}

impl Taxon {
    pub fn new(external_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            external_id: Some(external_id.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_rank(mut self, rank: impl Into<String>) -> Self {
        self.rank = Some(rank.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>, path_names: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self.path_names = Some(path_names.into());
        self
    }

    /// A taxon is resolved when it carries a non-blank external id and name.
    pub fn is_resolved(&self) -> bool {
        fn present(v: &Option<String>) -> bool {
            v.as_deref().is_some_and(|s| !s.trim().is_empty())
        }
        present(&self.external_id) && present(&self.name)
    }

    /// Pairs of `(rank, name)` zipped from `path_names` and `path`.
    ///
    /// Elements whose rank is blank are skipped; a missing lineage yields an
    /// empty list.
    pub fn lineage(&self) -> Vec<(String, String)> {
        let (Some(path), Some(names)) = (self.path.as_deref(), self.path_names.as_deref()) else {
            return Vec::new();
        };
        names
            .split('|')
            .map(str::trim)
            .zip(path.split('|').map(str::trim))
            .filter(|(rank, _)| !rank.is_empty())
            .map(|(rank, name)| (rank.to_lowercase(), name.to_string()))
            .collect()
    }
}

impl From<&Term> for Taxon {
    fn from(term: &Term) -> Self {
        Taxon::new(term.id.clone(), term.name.clone())
    }
}

/// A taxon node read from the graph catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonRecord {
    /// Catalog (graph node) identifier.
    pub node_id: u64,
    pub taxon: Taxon,
}

impl TaxonRecord {
    pub fn new(node_id: u64, taxon: Taxon) -> Self {
        Self { node_id, taxon }
    }

    /// Display name, empty when the node carries none.
    pub fn name(&self) -> &str {
        self.taxon.name.as_deref().unwrap_or_default()
    }
}

// ============================================================================
// Matching
// ============================================================================

/// Relation between a catalog taxon and a matched candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationType {
    SameAs,
    SimilarTo,
    SynonymOf,
    HasAcceptedName,
    /// The matcher found nothing to relate; never becomes an edge.
    None,
}

impl RelationType {
    /// Edge label written into the graph.
    pub fn edge_label(self) -> Option<&'static str> {
        match self {
            RelationType::SameAs => Some("SAME_AS"),
            RelationType::SimilarTo => Some("SIMILAR_TO"),
            RelationType::SynonymOf => Some("SYNONYM_OF"),
            RelationType::HasAcceptedName => Some("HAS_ACCEPTED_NAME"),
            RelationType::None => None,
        }
    }

    pub fn is_none(self) -> bool {
        matches!(self, RelationType::None)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.edge_label().unwrap_or("NONE"))
    }
}

/// One name handed to a matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRequest {
    /// Position of the record in the catalog scan (1-based).
    pub row: u64,
    /// Catalog id the result must be reported against.
    pub node_id: u64,
    pub name: String,
}

/// A matcher's answer for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatch {
    pub node_id: u64,
    pub name: String,
    pub relation: RelationType,
    pub candidate: Taxon,
}
