//! Matching strategies.

use crate::MatchError;
use taxalink_core::{parse_external_id, RelationType, Taxon, TermMatch, TermRequest};
use taxalink_lookup::TermLookupService;
use taxalink_wikidata::RelatedTaxonIds;
use tracing::debug;

/// Matches a batch of names.
///
/// Results may come back in any order and need not cover every request. An
/// error fails the whole batch.
pub trait TermMatcher {
    fn match_terms(&self, requests: &[TermRequest]) -> Result<Vec<TermMatch>, MatchError>;
}

impl<T: TermMatcher + ?Sized> TermMatcher for &T {
    fn match_terms(&self, requests: &[TermRequest]) -> Result<Vec<TermMatch>, MatchError> {
        (**self).match_terms(requests)
    }
}

impl<T: TermMatcher + ?Sized> TermMatcher for Box<T> {
    fn match_terms(&self, requests: &[TermRequest]) -> Result<Vec<TermMatch>, MatchError> {
        (**self).match_terms(requests)
    }
}

/// Exact matching against a lookup table.
///
/// Every term found for a name becomes a `SAME_AS` match; a miss is reported
/// with no relation so the driver can count it.
pub struct LookupTermMatcher<L> {
    lookup: L,
}

impl<L: TermLookupService> LookupTermMatcher<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }
}

impl<L: TermLookupService> TermMatcher for LookupTermMatcher<L> {
    fn match_terms(&self, requests: &[TermRequest]) -> Result<Vec<TermMatch>, MatchError> {
        let mut matches = Vec::with_capacity(requests.len());
        for request in requests {
            for term in self.lookup.lookup_term_by_name(&request.name)? {
                let relation = if term.is_no_match() {
                    RelationType::None
                } else {
                    RelationType::SameAs
                };
                matches.push(TermMatch {
                    node_id: request.node_id,
                    name: request.name.clone(),
                    relation,
                    candidate: Taxon::from(&term),
                });
            }
        }
        Ok(matches)
    }
}

/// Matching through the federated resolver.
///
/// Names that are external ids (`PREFIX:localId` with a known prefix) are
/// resolved and linked `SAME_AS` to every cross-referenced id other than
/// themselves. Other names are not matched.
///
/// A resolver error fails the whole batch, so every name in it stays unlinked
/// for this run. Wrap the resolver in one that maps errors to an empty result
/// to lose only the failing name.
pub struct FederatedTermMatcher<R> {
    resolver: R,
}

impl<R: RelatedTaxonIds> FederatedTermMatcher<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

impl<R: RelatedTaxonIds> TermMatcher for FederatedTermMatcher<R> {
    fn match_terms(&self, requests: &[TermRequest]) -> Result<Vec<TermMatch>, MatchError> {
        let mut matches = Vec::new();
        for request in requests {
            let external_id = request.name.trim();
            if parse_external_id(external_id).is_err() {
                debug!(row = request.row, name = %request.name, "not an external id");
                continue;
            }
            let related = self.resolver.related_taxon_ids(external_id)?;
            matches.extend(
                related
                    .into_iter()
                    .filter(|t| t.external_id.as_deref() != Some(external_id))
                    .map(|candidate| TermMatch {
                        node_id: request.node_id,
                        name: request.name.clone(),
                        relation: RelationType::SameAs,
                        candidate,
                    }),
            );
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxalink_core::Term;
    use taxalink_lookup::LookupError;
    use taxalink_wikidata::ResolverError;

    struct Table;

    impl TermLookupService for Table {
        fn lookup_term_by_name(&self, name: &str) -> Result<Vec<Term>, LookupError> {
            Ok(match name {
                "Morus" => vec![
                    Term::new("GBIF:2984544", "Morus"),
                    Term::new("GBIF:2480985", "Morus"),
                ],
                _ => vec![Term::no_match(name)],
            })
        }
    }

    struct Resolver;

    impl RelatedTaxonIds for Resolver {
        fn related_taxon_ids(&self, external_id: &str) -> Result<Vec<Taxon>, ResolverError> {
            match external_id {
                "NCBI:9606" => Ok(vec![
                    Taxon::new("WD:Q15978631", "Homo sapiens"),
                    Taxon::new("NCBI:9606", "Homo sapiens"),
                    Taxon::new("GBIF:2436436", "Homo sapiens"),
                ]),
                _ => Err(ResolverError::Status {
                    status: 500,
                    body: String::new(),
                }),
            }
        }
    }

    fn request(node_id: u64, name: &str) -> TermRequest {
        TermRequest {
            row: node_id + 1,
            node_id,
            name: name.to_string(),
        }
    }

    #[test]
    fn lookup_matcher_reports_every_term_and_misses() {
        let matcher = LookupTermMatcher::new(Table);
        let matches = matcher
            .match_terms(&[request(1, "Morus"), request(2, "Morrus")])
            .unwrap();

        assert_eq!(matches.len(), 3);
        assert!(matches[..2].iter().all(|m| m.relation == RelationType::SameAs));
        assert_eq!(matches[2].relation, RelationType::None);
        assert_eq!(matches[2].node_id, 2);
    }

    #[test]
    fn federated_matcher_skips_plain_names_and_self() {
        let matcher = FederatedTermMatcher::new(Resolver);
        let matches = matcher
            .match_terms(&[request(1, "Homo sapiens"), request(2, "NCBI:9606")])
            .unwrap();

        let ids: Vec<_> = matches
            .iter()
            .filter_map(|m| m.candidate.external_id.as_deref())
            .collect();
        assert_eq!(ids, ["WD:Q15978631", "GBIF:2436436"]);
        assert!(matches.iter().all(|m| m.node_id == 2));
    }

    #[test]
    fn federated_failure_fails_the_batch() {
        let matcher = FederatedTermMatcher::new(Resolver);
        assert!(matches!(
            matcher.match_terms(&[request(1, "ITIS:183803")]),
            Err(MatchError::Resolver(_))
        ));
        // a resolvable name in the same batch is lost with it
        assert!(matches!(
            matcher.match_terms(&[request(1, "NCBI:9606"), request(2, "ITIS:183803")]),
            Err(MatchError::Resolver(_))
        ));
    }
}
