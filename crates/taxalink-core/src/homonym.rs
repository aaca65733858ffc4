//! Homonym veto.
//!
//! A matcher may pair a catalog taxon with a candidate that merely shares its
//! name (e.g. the plant genus *Morus* and the bird genus *Morus*). A filter
//! returning `true` vetoes the pairing regardless of relation or confidence.

use crate::term::Taxon;

/// Decides whether `candidate` and `target` are likely different organisms
/// sharing a name.
pub trait HomonymFilter {
    fn likely_homonym(&self, candidate: &Taxon, target: &Taxon) -> bool;
}

impl<F> HomonymFilter for F
where
    F: Fn(&Taxon, &Taxon) -> bool,
{
    fn likely_homonym(&self, candidate: &Taxon, target: &Taxon) -> bool {
        self(candidate, target)
    }
}

/// Accepts every pairing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverHomonym;

impl HomonymFilter for NeverHomonym {
    fn likely_homonym(&self, _candidate: &Taxon, _target: &Taxon) -> bool {
        false
    }
}

/// Flags two resolved taxa whose lineages disagree on a higher rank.
///
/// A rank only counts when both lineages carry it; comparison ignores case.
#[derive(Debug, Clone)]
pub struct LineageHomonymFilter {
    ranks: Vec<String>,
}

impl LineageHomonymFilter {
    pub fn new<I, S>(ranks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ranks: ranks.into_iter().map(|r| r.into().to_lowercase()).collect(),
        }
    }
}

impl Default for LineageHomonymFilter {
    fn default() -> Self {
        Self::new(["phylum", "class", "order", "family"])
    }
}

impl HomonymFilter for LineageHomonymFilter {
    fn likely_homonym(&self, candidate: &Taxon, target: &Taxon) -> bool {
        if !candidate.is_resolved() || !target.is_resolved() {
            return false;
        }
        let a = candidate.lineage();
        let b = target.lineage();
        let rank_of = |lineage: &[(String, String)], rank: &str| {
            lineage
                .iter()
                .find(|(r, _)| r == rank)
                .map(|(_, name)| name.to_lowercase())
        };
        self.ranks.iter().any(|rank| {
            matches!(
                (rank_of(&a, rank), rank_of(&b, rank)),
                (Some(x), Some(y)) if !x.is_empty() && !y.is_empty() && x != y
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn morus_plant() -> Taxon {
        Taxon::new("GBIF:3034339", "Morus").with_path(
            "Plantae | Tracheophyta | Magnoliopsida | Rosales | Moraceae | Morus",
            "kingdom | phylum | class | order | family | genus",
        )
    }

    fn morus_bird() -> Taxon {
        Taxon::new("NCBI:37577", "Morus").with_path(
            "Animalia | Chordata | Aves | Suliformes | Sulidae | Morus",
            "kingdom | phylum | class | order | family | genus",
        )
    }

    #[test]
    fn disagreeing_lineages_are_homonyms() {
        let filter = LineageHomonymFilter::default();
        assert!(filter.likely_homonym(&morus_plant(), &morus_bird()));
    }

    #[test]
    fn agreeing_lineages_are_not() {
        let filter = LineageHomonymFilter::default();
        let other = Taxon::new("ITIS:174715", "Morus").with_path(
            "Animalia | chordata | AVES",
            "kingdom | phylum | class",
        );
        assert!(!filter.likely_homonym(&other, &morus_bird()));
    }

    #[test]
    fn missing_lineage_is_not_a_homonym() {
        let filter = LineageHomonymFilter::default();
        let bare = Taxon::new("NCBI:37577", "Morus");
        assert!(!filter.likely_homonym(&bare, &morus_plant()));
    }

    #[test]
    fn unresolved_taxa_are_never_homonyms() {
        let filter = LineageHomonymFilter::default();
        let mut unresolved = morus_bird();
        unresolved.external_id = None;
        assert!(!filter.likely_homonym(&unresolved, &morus_plant()));
    }

    #[test]
    fn closures_are_filters() {
        let always = |_: &Taxon, _: &Taxon| true;
        assert!(always.likely_homonym(&morus_bird(), &morus_bird()));
        assert!(!NeverHomonym.likely_homonym(&morus_bird(), &morus_plant()));
    }
}
