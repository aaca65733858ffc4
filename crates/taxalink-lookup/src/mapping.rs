//! Mapping tables and the lookup service built on them.

use crate::resource::ResourceService;
use crate::LookupError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use taxalink_core::{normalize, Term};

/// Minimum number of columns of a usable reference row.
const MIN_COLUMNS: usize = 4;

// ============================================================================
// Configuration
// ============================================================================

/// Where a lookup table comes from and how its rows are delimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTableConfig {
    /// Resource locators, read in order.
    pub sources: Vec<String>,
    pub delimiter: char,
    /// Skip the first record of every source.
    pub has_header: bool,
}

impl MappingTableConfig {
    pub fn csv<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            delimiter: ',',
            has_header: true,
        }
    }

    pub fn tsv<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            delimiter: '\t',
            ..Self::csv(sources)
        }
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }
}

// ============================================================================
// Mapping table
// ============================================================================

/// Normalized name → terms. Ambiguous names keep every term, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    terms: HashMap<String, Vec<Term>>,
}

impl MappingTable {
    pub fn get(&self, key: &str) -> Option<&[Term]> {
        self.terms
            .get(key)
            .map(Vec::as_slice)
            .filter(|terms| !terms.is_empty())
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn add(&mut self, source_name: &str, term: Term) {
        self.terms
            .entry(normalize(source_name))
            .or_default()
            .push(term);
    }
}

/// Build a table from every source in `config`.
///
/// Short or blank rows are skipped with a log line. Any retrieval or parse
/// failure aborts the whole build.
pub fn build_mapping<R>(resources: &R, config: &MappingTableConfig) -> Result<MappingTable, LookupError>
where
    R: ResourceService + ?Sized,
{
    if !config.delimiter.is_ascii() {
        return Err(LookupError::InvalidDelimiter(config.delimiter));
    }
    let delimiter = config.delimiter as u8;

    let mut table = MappingTable::default();
    for locator in &config.sources {
        let mut bytes = Vec::new();
        resources
            .retrieve(locator)
            .map_err(|source| LookupError::Retrieve {
                locator: locator.clone(),
                source,
            })?
            .read_to_end(&mut bytes)
            .map_err(|source| LookupError::Read {
                locator: locator.clone(),
                source,
            })?;
        let text = String::from_utf8_lossy(&bytes);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(config.has_header)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut accepted = 0usize;
        for record in reader.records() {
            let record = record.map_err(|source| LookupError::Parse {
                locator: locator.clone(),
                source,
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            if record.len() < MIN_COLUMNS {
                tracing::info!(
                    locator = %locator,
                    line,
                    "line contains less than {} columns",
                    MIN_COLUMNS
                );
                continue;
            }
            let (source_name, target_id, target_name) = (&record[1], &record[2], &record[3]);
            if [source_name, target_id, target_name]
                .iter()
                .any(|v| v.trim().is_empty())
            {
                tracing::info!(locator = %locator, line, "line has blank name or id");
                continue;
            }
            table.add(source_name, Term::new(target_id, target_name));
            accepted += 1;
        }
        tracing::debug!(locator = %locator, accepted, "loaded mapping source");
    }
    Ok(table)
}

// ============================================================================
// Lookup service
// ============================================================================

/// Resolves names to terms.
pub trait TermLookupService: Send + Sync {
    /// Every term known for `name`; never empty. A miss yields exactly one
    /// `NO_MATCH` term carrying `name`.
    fn lookup_term_by_name(&self, name: &str) -> Result<Vec<Term>, LookupError>;
}

impl<T: TermLookupService + ?Sized> TermLookupService for Arc<T> {
    fn lookup_term_by_name(&self, name: &str) -> Result<Vec<Term>, LookupError> {
        (**self).lookup_term_by_name(name)
    }
}

/// Lookup service over a lazily built [`MappingTable`].
///
/// Lookups try the normalized name first and the merely trimmed name second,
/// so names differing only in case or quoting may hit different tiers.
pub struct MappingTermLookupService<R> {
    resources: R,
    config: MappingTableConfig,
    mapping: RwLock<Option<Arc<MappingTable>>>,
}

impl<R: ResourceService> MappingTermLookupService<R> {
    pub fn new(resources: R, config: MappingTableConfig) -> Self {
        Self {
            resources,
            config,
            mapping: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &MappingTableConfig {
        &self.config
    }

    /// The table, built on first call. A failed build keeps nothing, so the
    /// next call tries again.
    pub fn mapping(&self) -> Result<Arc<MappingTable>, LookupError> {
        if let Some(mapping) = self.mapping.read().as_ref() {
            return Ok(Arc::clone(mapping));
        }
        let mut slot = self.mapping.write();
        if let Some(mapping) = slot.as_ref() {
            return Ok(Arc::clone(mapping));
        }
        let built = Arc::new(build_mapping(&self.resources, &self.config)?);
        tracing::info!(
            sources = self.config.sources.len(),
            names = built.len(),
            "built term mapping"
        );
        *slot = Some(Arc::clone(&built));
        Ok(built)
    }
}

impl<R: ResourceService> TermLookupService for MappingTermLookupService<R> {
    fn lookup_term_by_name(&self, name: &str) -> Result<Vec<Term>, LookupError> {
        let mapping = self.mapping()?;
        let terms = mapping
            .get(&normalize(name))
            .or_else(|| mapping.get(name.trim()));
        Ok(match terms {
            Some(terms) => terms.to_vec(),
            None => vec![Term::no_match(name)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceError;
    use proptest::prelude::*;
    use std::io::Cursor;

    /// Serves fixed text per locator.
    struct Fixed(HashMap<&'static str, &'static str>);

    impl ResourceService for Fixed {
        fn retrieve(&self, locator: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
            self.0
                .get(locator)
                .map(|text| Box::new(Cursor::new(text.as_bytes().to_vec())) as Box<dyn Read + Send>)
                .ok_or_else(|| ResourceError::UnsupportedLocator(locator.to_string()))
        }
    }

    fn service(sources: &[(&'static str, &'static str)], delimiter: char, header: bool) -> MappingTermLookupService<Fixed> {
        let config = MappingTableConfig {
            sources: sources.iter().map(|(l, _)| l.to_string()).collect(),
            delimiter,
            has_header: header,
        };
        MappingTermLookupService::new(Fixed(sources.iter().copied().collect()), config)
    }

    const TSV: &str = "id\tsourceName\ttargetId\ttargetName\n\
        1\tHomo sapiens\tNCBI:9606\tHomo sapiens\n\
        2\tMorus\tGBIF:3034339\tMorus\n\
        3\tMorus\tNCBI:37577\tMorus\n\
        4\tshort\tGBIF:1\n\
        5\tblank id\t \tBlank\n";

    #[test]
    fn maps_normalized_names() {
        let s = service(&[("names.tsv", TSV)], '\t', true);
        assert_eq!(
            s.lookup_term_by_name("\"HOMO SAPIENS\"").unwrap(),
            vec![Term::new("NCBI:9606", "Homo sapiens")]
        );
    }

    #[test]
    fn keeps_ambiguous_targets_in_order() {
        let s = service(&[("names.tsv", TSV)], '\t', true);
        assert_eq!(
            s.lookup_term_by_name("morus").unwrap(),
            vec![
                Term::new("GBIF:3034339", "Morus"),
                Term::new("NCBI:37577", "Morus"),
            ]
        );
    }

    #[test]
    fn skips_short_and_blank_rows() {
        let s = service(&[("names.tsv", TSV)], '\t', true);
        let mapping = s.mapping().unwrap();
        assert_eq!(mapping.len(), 2);
        assert!(mapping.get("short").is_none());
        assert!(mapping.get("blank id").is_none());
        assert!(s.lookup_term_by_name("short").unwrap()[0].is_no_match());
    }

    #[test]
    fn header_row_is_data_without_header_flag() {
        let s = service(&[("names.tsv", TSV)], '\t', false);
        assert_eq!(
            s.lookup_term_by_name("sourceName").unwrap(),
            vec![Term::new("targetId", "targetName")]
        );
    }

    #[test]
    fn quoted_fields_are_honored() {
        let csv = "id,sourceName,targetId,targetName\n\
            1,\"Ariopsis felis, L.\",FBC:FB:SpecCode:947,Ariopsis felis\n";
        let s = service(&[("names.csv", csv)], ',', true);
        assert_eq!(
            s.lookup_term_by_name("ariopsis felis, l.").unwrap(),
            vec![Term::new("FBC:FB:SpecCode:947", "Ariopsis felis")]
        );
    }

    #[test]
    fn trimmed_name_is_second_tier() {
        let s = service(&[("names.tsv", TSV)], '\t', true);
        // normalized key misses because of the padding, trimmed name hits
        assert_eq!(
            s.lookup_term_by_name("  homo sapiens ").unwrap(),
            vec![Term::new("NCBI:9606", "Homo sapiens")]
        );
        // neither tier matches once case differs as well
        assert!(s.lookup_term_by_name("  Homo sapiens ").unwrap()[0].is_no_match());
    }

    #[test]
    fn miss_returns_single_no_match_with_input_name() {
        let s = service(&[("names.tsv", TSV)], '\t', true);
        let terms = s.lookup_term_by_name(" Pan troglodytes").unwrap();
        assert_eq!(terms, vec![Term::no_match(" Pan troglodytes")]);
    }

    #[test]
    fn terms_accumulate_across_sources() {
        let a = "1\tPanthera leo\tNCBI:9689\tPanthera leo\n";
        let b = "1\tPanthera leo\tGBIF:5219404\tPanthera leo\n";
        let s = service(&[("a.tsv", a), ("b.tsv", b)], '\t', false);
        let ids: Vec<_> = s
            .lookup_term_by_name("Panthera leo")
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["NCBI:9689", "GBIF:5219404"]);
    }

    #[test]
    fn failing_source_fails_the_service() {
        let config = MappingTableConfig::tsv(["names.tsv", "missing.tsv"]);
        let s = MappingTermLookupService::new(Fixed([("names.tsv", TSV)].into_iter().collect()), config);
        let err = s.lookup_term_by_name("Homo sapiens").unwrap_err();
        assert!(matches!(err, LookupError::Retrieve { ref locator, .. } if locator == "missing.tsv"));
        assert!(s.mapping.read().is_none());
        assert!(s.lookup_term_by_name("Homo sapiens").is_err());
    }

    #[test]
    fn rejects_multibyte_delimiter() {
        let s = service(&[("names.tsv", TSV)], '│', true);
        assert!(matches!(
            s.lookup_term_by_name("x"),
            Err(LookupError::InvalidDelimiter('│'))
        ));
    }

    proptest! {
        #[test]
        fn lookup_is_never_empty(name in ".{0,40}") {
            let s = service(&[("names.tsv", TSV)], '\t', true);
            let terms = s.lookup_term_by_name(&name).unwrap();
            prop_assert!(!terms.is_empty());
            if terms.iter().any(Term::is_no_match) {
                prop_assert_eq!(terms.len(), 1);
                prop_assert_eq!(&terms[0].name, &name);
            }
        }
    }
}
