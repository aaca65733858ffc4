//! Identifier resolution over SPARQL.
//!
//! Responses follow the SPARQL 1.1 JSON results format:
//!
//! ```text
//! { "results": { "bindings": [ { "<var>": { "type": "...", "value": "..." } } ] } }
//! ```
//!
//! Parsing is defensive: a response without `results.bindings` yields no
//! candidates, and bindings missing a variable are skipped rather than failing
//! the whole resolution.

use crate::endpoint::SparqlEndpoint;
use crate::query::{
    non_wd_taxon_where_clause, related_taxon_ids_query, taxon_id_schemes_query,
    wd_taxon_where_clause, DIRECT_PROPERTY_PREFIX, ENTITY_PREFIX,
};
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use taxalink_core::{
    parse_external_id, ProviderIdentifierMap, Taxon, TaxonomyProvider,
    WORLD_OF_FLORA_ONLINE_PROPERTY,
};
use tracing::{debug, warn};

/// Resolves an external id into cross-referenced candidates.
pub trait RelatedTaxonIds: Send + Sync {
    fn related_taxon_ids(&self, external_id: &str) -> Result<Vec<Taxon>>;
}

impl<T: RelatedTaxonIds + ?Sized> RelatedTaxonIds for Arc<T> {
    fn related_taxon_ids(&self, external_id: &str) -> Result<Vec<Taxon>> {
        (**self).related_taxon_ids(external_id)
    }
}

/// Federated resolver backed by a SPARQL endpoint.
#[derive(Debug, Clone)]
pub struct WikidataResolver<E> {
    endpoint: E,
    providers: Arc<ProviderIdentifierMap>,
}

impl<E: SparqlEndpoint> WikidataResolver<E> {
    pub fn new(endpoint: E) -> Self {
        Self::with_providers(endpoint, Arc::new(ProviderIdentifierMap::wikidata()))
    }

    pub fn with_providers(endpoint: E, providers: Arc<ProviderIdentifierMap>) -> Self {
        Self {
            endpoint,
            providers,
        }
    }

    pub fn providers(&self) -> &ProviderIdentifierMap {
        &self.providers
    }

    /// Execute `sparql` and parse the response body as JSON.
    pub fn execute_query(&self, sparql: &str) -> Result<Value> {
        debug!(query = %sparql, "executing SPARQL query");
        let body = self.endpoint.execute(sparql)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Property ids of every taxon identifier scheme known to the knowledge
    /// base, in response order without duplicates.
    ///
    /// World Flora Online (`P7715`) is not classified as a scheme upstream and
    /// is appended when absent.
    pub fn find_taxon_id_providers(&self) -> Result<Vec<String>> {
        let response = self.execute_query(&taxon_id_schemes_query())?;
        let mut properties: Vec<String> = Vec::new();
        for binding in bindings(&response) {
            let Some(scheme) = value_of(binding, "scheme") else {
                continue;
            };
            let property = scheme.strip_prefix(ENTITY_PREFIX).unwrap_or(scheme);
            if !properties.iter().any(|p| p == property) {
                properties.push(property.to_string());
            }
        }
        if !properties.iter().any(|p| p == WORLD_OF_FLORA_ONLINE_PROPERTY) {
            properties.push(WORLD_OF_FLORA_ONLINE_PROPERTY.to_string());
        }
        Ok(properties)
    }

    /// Candidates cross-referenced with `external_id`, or an error when the
    /// endpoint fails or answers with something other than JSON.
    ///
    /// Ids whose prefix is unknown, or whose provider has no property, resolve
    /// to an empty list.
    pub fn try_find_related_taxon_ids(&self, external_id: &str) -> Result<Vec<Taxon>> {
        let Ok((provider, local_id)) = parse_external_id(external_id) else {
            debug!(external_id, "unknown taxonomy provider");
            return Ok(Vec::new());
        };
        let where_clause = if provider == TaxonomyProvider::Wikidata {
            wd_taxon_where_clause(local_id)
        } else {
            match self.providers.property_for(provider) {
                Some(property) => non_wd_taxon_where_clause(property, local_id),
                None => {
                    debug!(external_id, %provider, "provider has no knowledge base property");
                    return Ok(Vec::new());
                }
            }
        };

        let response = self.execute_query(&related_taxon_ids_query(&where_clause))?;
        Ok(self.candidates(&response))
    }

    /// Like [`try_find_related_taxon_ids`](Self::try_find_related_taxon_ids),
    /// but a failed query is logged and resolves to an empty list.
    pub fn find_related_taxon_ids(&self, external_id: &str) -> Vec<Taxon> {
        self.try_find_related_taxon_ids(external_id)
            .unwrap_or_else(|err| {
                warn!(external_id, error = %err, "failed to resolve related taxon ids");
                Vec::new()
            })
    }

    fn candidates(&self, response: &Value) -> Vec<Taxon> {
        let bindings = bindings(response);
        let mut taxa = Vec::with_capacity(bindings.len() + 1);

        if let Some(first) = bindings.first() {
            taxa.push(anchor_taxon(first));
        }

        for binding in bindings {
            let Some(scheme) = value_of(binding, "taxonScheme") else {
                continue;
            };
            let property = scheme.strip_prefix(DIRECT_PROPERTY_PREFIX).unwrap_or(scheme);
            let Some(provider) = self.providers.provider_for(property) else {
                continue;
            };
            let Some(taxon_id) = value_of(binding, "taxonId") else {
                continue;
            };
            taxa.push(described(
                Taxon {
                    external_id: Some(provider.external_id(taxon_id)),
                    ..Default::default()
                },
                binding,
            ));
        }
        taxa
    }
}

impl<E: SparqlEndpoint> RelatedTaxonIds for WikidataResolver<E> {
    fn related_taxon_ids(&self, external_id: &str) -> Result<Vec<Taxon>> {
        self.try_find_related_taxon_ids(external_id)
    }
}

// ============================================================================
// Response parsing
// ============================================================================

fn bindings(response: &Value) -> &[Value] {
    response
        .pointer("/results/bindings")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn value_of<'a>(binding: &'a Value, var: &str) -> Option<&'a str> {
    binding.get(var)?.get("value")?.as_str()
}

/// The Wikidata item itself. Always present for a non-empty result, without an
/// id when the binding lacks `wdTaxonId`.
fn anchor_taxon(binding: &Value) -> Taxon {
    let external_id = value_of(binding, "wdTaxonId").map(|entity| {
        let item = entity.strip_prefix(ENTITY_PREFIX).unwrap_or(entity);
        TaxonomyProvider::Wikidata.external_id(item)
    });
    described(
        Taxon {
            external_id,
            ..Default::default()
        },
        binding,
    )
}

/// Copy the binding's taxon name and rank onto `taxon`.
fn described(mut taxon: Taxon, binding: &Value) -> Taxon {
    if let Some(name) = value_of(binding, "wdTaxonName") {
        taxon.name = Some(name.to_string());
        taxon.path = Some(name.to_string());
    }
    if let Some(rank) = value_of(binding, "wdTaxonRank") {
        taxon.rank = Some(rank.to_string());
        taxon.path_names = Some(rank.to_string());
    }
    taxon
}
