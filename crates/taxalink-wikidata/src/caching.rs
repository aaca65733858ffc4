//! Durable memoization of federated resolutions.

use crate::resolver::RelatedTaxonIds;
use crate::Result;
use std::sync::Arc;
use taxalink_cache::DurableCache;
use taxalink_core::Taxon;
use tracing::debug;

/// Wraps a resolver and stores non-empty resolutions in a [`DurableCache`]
/// keyed by external id.
///
/// Empty resolutions are not stored: an id the knowledge base does not know
/// today may be added upstream later.
pub struct CachingResolver<R> {
    inner: R,
    cache: Arc<DurableCache>,
}

impl<R: RelatedTaxonIds> CachingResolver<R> {
    pub fn new(inner: R, cache: Arc<DurableCache>) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn cache(&self) -> &DurableCache {
        &self.cache
    }
}

impl<R: RelatedTaxonIds> RelatedTaxonIds for CachingResolver<R> {
    fn related_taxon_ids(&self, external_id: &str) -> Result<Vec<Taxon>> {
        if let Some(cached) = self.cache.get_json::<Vec<Taxon>>(external_id)? {
            debug!(external_id, candidates = cached.len(), "resolution cache hit");
            return Ok(cached);
        }
        let taxa = self.inner.related_taxon_ids(external_id)?;
        if !taxa.is_empty() {
            self.cache.put_json(external_id, &taxa)?;
        }
        Ok(taxa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taxalink_cache::CacheService;

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl RelatedTaxonIds for Counting {
        fn related_taxon_ids(&self, external_id: &str) -> Result<Vec<Taxon>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if external_id == "NCBI:9606" {
                Ok(vec![
                    Taxon::new("WD:Q15978631", "Homo sapiens"),
                    Taxon::new("GBIF:2436436", "Homo sapiens"),
                ])
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn cache(dir: &tempfile::TempDir) -> Arc<DurableCache> {
        Arc::new(CacheService::new(dir.path()).init_db("wikidata").unwrap())
    }

    #[test]
    fn second_resolution_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = CachingResolver::new(Counting::default(), cache(&dir));

        let first = resolver.related_taxon_ids("NCBI:9606").unwrap();
        let second = resolver.related_taxon_ids("NCBI:9606").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(resolver.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_resolutions_are_not_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = CachingResolver::new(Counting::default(), cache(&dir));

        assert!(resolver.related_taxon_ids("NCBI:0").unwrap().is_empty());
        assert!(resolver.related_taxon_ids("NCBI:0").unwrap().is_empty());
        assert_eq!(resolver.inner().calls.load(Ordering::SeqCst), 2);
        assert!(resolver.cache().is_empty());
    }

    #[test]
    fn memoized_resolutions_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let resolver = CachingResolver::new(Counting::default(), cache(&dir));
            resolver.related_taxon_ids("NCBI:9606").unwrap();
        }
        let resolver = CachingResolver::new(Counting::default(), cache(&dir));
        let taxa = resolver.related_taxon_ids("NCBI:9606").unwrap();
        assert_eq!(taxa[0].external_id.as_deref(), Some("WD:Q15978631"));
        assert_eq!(resolver.inner().calls.load(Ordering::SeqCst), 0);
    }
}
