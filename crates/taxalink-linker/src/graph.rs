//! The narrow graph surface the linker needs: a full scan of the taxon catalog
//! and relation-typed edge writes.
//!
//! Scanning and writing are separate capabilities so a driver can hold a
//! cursor over the catalog while links are written elsewhere.

use crate::GraphError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use taxalink_core::{RelationType, Taxon, TaxonRecord};

/// Source of the taxa to link.
pub trait TaxonCatalog {
    /// Every taxon record, in catalog order.
    fn scan(&self) -> Result<Box<dyn Iterator<Item = TaxonRecord> + '_>, GraphError>;
}

/// Sink for accepted matches.
pub trait TaxonLinkWriter {
    /// Create `source -[relation]-> target`.
    ///
    /// Returns `false` when the edge already existed.
    fn connect_taxa(
        &mut self,
        source: &TaxonRecord,
        relation: RelationType,
        target: &Taxon,
    ) -> Result<bool, GraphError>;
}

impl<W: TaxonLinkWriter + ?Sized> TaxonLinkWriter for &mut W {
    fn connect_taxa(
        &mut self,
        source: &TaxonRecord,
        relation: RelationType,
        target: &Taxon,
    ) -> Result<bool, GraphError> {
        (**self).connect_taxa(source, relation, target)
    }
}

// ============================================================================
// In-memory implementations
// ============================================================================

/// Catalog backed by a vector of records.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    records: Vec<TaxonRecord>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a taxon under the next free node id.
    pub fn add_taxon(&mut self, taxon: Taxon) -> u64 {
        let node_id = self.records.len() as u64;
        self.records.push(TaxonRecord::new(node_id, taxon));
        node_id
    }

    pub fn get(&self, node_id: u64) -> Option<&TaxonRecord> {
        self.records.iter().find(|r| r.node_id == node_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<TaxonRecord> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = TaxonRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl TaxonCatalog for MemoryCatalog {
    fn scan(&self) -> Result<Box<dyn Iterator<Item = TaxonRecord> + '_>, GraphError> {
        Ok(Box::new(self.records.iter().cloned()))
    }
}

/// One stored edge, `source -[label]-> target`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaxonLink {
    pub source: u64,
    pub label: String,
    pub target: String,
}

/// Link store keyed by external id. Edges are a set, so writing the same link
/// twice keeps one copy.
#[derive(Debug, Clone, Default)]
pub struct MemoryLinkStore {
    targets: HashMap<String, Taxon>,
    edges: BTreeSet<TaxonLink>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_edge(&self, source: u64, relation: RelationType, target: &str) -> bool {
        let Some(label) = relation.edge_label() else {
            return false;
        };
        self.edges.contains(&TaxonLink {
            source,
            label: label.to_string(),
            target: target.to_string(),
        })
    }

    /// Taxon stored for `external_id`, as first written.
    pub fn target(&self, external_id: &str) -> Option<&Taxon> {
        self.targets.get(external_id)
    }

    pub fn links(&self) -> impl Iterator<Item = &TaxonLink> {
        self.edges.iter()
    }

    pub fn links_from(&self, source: u64) -> impl Iterator<Item = &TaxonLink> {
        self.edges.iter().filter(move |l| l.source == source)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl TaxonLinkWriter for MemoryLinkStore {
    fn connect_taxa(
        &mut self,
        source: &TaxonRecord,
        relation: RelationType,
        target: &Taxon,
    ) -> Result<bool, GraphError> {
        let Some(label) = relation.edge_label() else {
            return Ok(false);
        };
        let external_id = target
            .external_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(GraphError::UnresolvedTarget)?;

        self.targets
            .entry(external_id.to_string())
            .or_insert_with(|| target.clone());
        Ok(self.edges.insert(TaxonLink {
            source: source.node_id,
            label: label.to_string(),
            target: external_id.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lion() -> TaxonRecord {
        TaxonRecord::new(7, Taxon::new("ITIS:183803", "Panthera leo"))
    }

    #[test]
    fn scan_yields_records_in_order() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_taxon(Taxon::new("ITIS:183803", "Panthera leo"));
        catalog.add_taxon(Taxon::new("NCBI:9606", "Homo sapiens"));

        let names: Vec<_> = catalog
            .scan()
            .unwrap()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, ["Panthera leo", "Homo sapiens"]);
        assert_eq!(catalog.get(1).map(TaxonRecord::name), Some("Homo sapiens"));
    }

    #[test]
    fn writing_a_link_twice_keeps_one_edge() {
        let mut store = MemoryLinkStore::new();
        let target = Taxon::new("GBIF:5219404", "Panthera leo");

        assert!(store.connect_taxa(&lion(), RelationType::SameAs, &target).unwrap());
        assert!(!store.connect_taxa(&lion(), RelationType::SameAs, &target).unwrap());
        assert!(store.connect_taxa(&lion(), RelationType::SimilarTo, &target).unwrap());

        assert_eq!(store.edge_count(), 2);
        assert!(store.has_edge(7, RelationType::SameAs, "GBIF:5219404"));
        assert!(!store.has_edge(7, RelationType::SynonymOf, "GBIF:5219404"));
        assert_eq!(store.target("GBIF:5219404"), Some(&target));
    }

    #[test]
    fn no_relation_writes_nothing() {
        let mut store = MemoryLinkStore::new();
        let target = Taxon::new("GBIF:5219404", "Panthera leo");
        assert!(!store.connect_taxa(&lion(), RelationType::None, &target).unwrap());
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn target_without_external_id_is_rejected() {
        let mut store = MemoryLinkStore::new();
        let target = Taxon {
            name: Some("Panthera leo".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.connect_taxa(&lion(), RelationType::SameAs, &target),
            Err(GraphError::UnresolvedTarget)
        ));
    }
}
