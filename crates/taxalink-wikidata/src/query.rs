//! SPARQL query construction.
//!
//! Two families of queries are built here:
//!
//! - **resolution queries** (scheme enumeration, related ids), assembled from
//!   fixed clauses;
//! - **page-info queries**, rendered from one of three text templates chosen by
//!   provider class, with `{{ID}}`, `{{LANG}}` and `{{SCHEME}}` substituted
//!   literally. Values are not escaped: callers must pass ids and language tags
//!   that cannot break out of the template.

use crate::{ResolverError, Result};
use std::path::Path;
use std::sync::Arc;
use taxalink_core::{ProviderIdentifierMap, TaxonomyProvider};

/// Wikidata class "taxon identifier scheme".
pub const TAXON_ID_SCHEME_CLASS: &str = "Q42396390";

pub const ENTITY_PREFIX: &str = "http://www.wikidata.org/entity/";
pub const DIRECT_PROPERTY_PREFIX: &str = "http://www.wikidata.org/prop/direct/";

// ============================================================================
// Resolution queries
// ============================================================================

/// Every entity classified as a taxon identifier scheme.
pub fn taxon_id_schemes_query() -> String {
    format!("SELECT ?scheme WHERE {{ ?scheme wdt:P31 wd:{TAXON_ID_SCHEME_CLASS} . }}")
}

/// Where-clause binding a Wikidata item directly.
pub fn wd_taxon_where_clause(taxon_id: &str) -> String {
    format!(
        "bind ( wd:{taxon_id} as ?wdTaxonId )\n\
         wd:{taxon_id} ?taxonScheme ?taxonId .\n"
    )
}

/// Where-clause matching items whose `property` equals `taxon_id`.
pub fn non_wd_taxon_where_clause(property: &str, taxon_id: &str) -> String {
    format!(
        "?wdTaxonId wdt:{property} \"{taxon_id}\" .\n\
         ?wdTaxonId ?taxonScheme ?taxonId .\n"
    )
}

/// Cross-references of the item selected by `where_clause`.
pub fn related_taxon_ids_query(where_clause: &str) -> String {
    format!(
        "SELECT ?wdTaxonId ?taxonScheme ?taxonId ?wdTaxonName ?wdTaxonRank WHERE {{\n\
         {where_clause}\
         \x20 ?taxonSchemeEntity wikibase:directClaim ?taxonScheme .\n\
         \x20 ?taxonSchemeEntity wdt:P31 wd:{TAXON_ID_SCHEME_CLASS} .\n\
         \x20 OPTIONAL {{ ?wdTaxonId wdt:P225 ?wdTaxonName . }}\n\
         \x20 OPTIONAL {{ ?wdTaxonId wdt:P105/rdfs:label ?wdTaxonRank . FILTER(LANG(?wdTaxonRank) = \"en\") }}\n\
         }}"
    )
}

// ============================================================================
// Templates
// ============================================================================

/// A placeholder recognized in page-info templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Id,
    Lang,
    Scheme,
}

impl Placeholder {
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Id => "{{ID}}",
            Placeholder::Lang => "{{LANG}}",
            Placeholder::Scheme => "{{SCHEME}}",
        }
    }
}

/// Query text with literal placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlTemplate {
    text: String,
}

impl SparqlTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        std::fs::read_to_string(path)
            .map(Self::new)
            .map_err(|source| ResolverError::Template {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn builder(&self) -> QueryBuilder<'_> {
        QueryBuilder {
            template: self,
            id: None,
            lang: None,
            scheme: None,
        }
    }
}

/// Fills a [`SparqlTemplate`].
///
/// Substitution order is `{{ID}}`, `{{LANG}}`, then `{{SCHEME}}`; every
/// occurrence is replaced. Placeholders without a value stay in the text.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    template: &'a SparqlTemplate,
    id: Option<&'a str>,
    lang: Option<&'a str>,
    scheme: Option<&'a str>,
}

impl<'a> QueryBuilder<'a> {
    pub fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn lang(mut self, lang: &'a str) -> Self {
        self.lang = Some(lang);
        self
    }

    pub fn scheme(mut self, scheme: Option<&'a str>) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn build(self) -> String {
        [
            (Placeholder::Id, self.id),
            (Placeholder::Lang, self.lang),
            (Placeholder::Scheme, self.scheme),
        ]
        .into_iter()
        .fold(self.template.text.clone(), |text, (placeholder, value)| match value {
            Some(value) => text.replace(placeholder.token(), value),
            None => text,
        })
    }
}

/// Which template a provider uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Ids of the knowledge base itself (`WD:`).
    KnowledgeBase,
    /// Plazi, whose ids need a custom matching clause.
    Plazi,
    /// Every other mapped provider.
    Taxon,
}

const WIKIDATA_TEMPLATE_FILE: &str = "wikidata.sparql.template";
const PLAZI_TEMPLATE_FILE: &str = "plazi.sparql.template";
const TAXON_TEMPLATE_FILE: &str = "taxon.sparql.template";

/// The three page-info templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplates {
    pub wikidata: SparqlTemplate,
    pub plazi: SparqlTemplate,
    pub taxon: SparqlTemplate,
}

impl Default for QueryTemplates {
    fn default() -> Self {
        Self {
            wikidata: SparqlTemplate::new(include_str!("../templates/wikidata.sparql.template")),
            plazi: SparqlTemplate::new(include_str!("../templates/plazi.sparql.template")),
            taxon: SparqlTemplate::new(include_str!("../templates/taxon.sparql.template")),
        }
    }
}

impl QueryTemplates {
    /// Load `wikidata.sparql.template`, `plazi.sparql.template` and
    /// `taxon.sparql.template` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        Ok(Self {
            wikidata: SparqlTemplate::from_file(&dir.join(WIKIDATA_TEMPLATE_FILE))?,
            plazi: SparqlTemplate::from_file(&dir.join(PLAZI_TEMPLATE_FILE))?,
            taxon: SparqlTemplate::from_file(&dir.join(TAXON_TEMPLATE_FILE))?,
        })
    }

    pub fn get(&self, kind: TemplateKind) -> &SparqlTemplate {
        match kind {
            TemplateKind::KnowledgeBase => &self.wikidata,
            TemplateKind::Plazi => &self.plazi,
            TemplateKind::Taxon => &self.taxon,
        }
    }
}

/// Renders page-info queries for external ids.
#[derive(Debug, Clone)]
pub struct SparqlQueries {
    providers: Arc<ProviderIdentifierMap>,
    templates: QueryTemplates,
}

impl SparqlQueries {
    pub fn new(providers: Arc<ProviderIdentifierMap>, templates: QueryTemplates) -> Self {
        Self {
            providers,
            templates,
        }
    }

    pub fn template_kind(&self, provider: TaxonomyProvider) -> Option<TemplateKind> {
        match provider {
            TaxonomyProvider::Wikidata => Some(TemplateKind::KnowledgeBase),
            TaxonomyProvider::Plazi => Some(TemplateKind::Plazi),
            p if self.providers.is_mapped(p) => Some(TemplateKind::Taxon),
            _ => None,
        }
    }

    /// Query for `external_id` in `preferred_language`, or `None` when the
    /// provider is unknown or unmapped.
    pub fn create_sparql_query(&self, external_id: &str, preferred_language: &str) -> Option<String> {
        let provider = TaxonomyProvider::for_external_id(external_id)?;
        let kind = self.template_kind(provider)?;
        let id = provider.strip_prefix(external_id)?;
        let query = self
            .templates
            .get(kind)
            .builder()
            .id(id)
            .lang(preferred_language)
            .scheme(self.providers.property_for(provider))
            .build();
        Some(query)
    }
}

impl Default for SparqlQueries {
    fn default() -> Self {
        Self::new(Arc::new(ProviderIdentifierMap::wikidata()), QueryTemplates::default())
    }
}
