//! Batch term matcher driver.
//!
//! The catalog is scanned once, front to back. Records accumulate in a map
//! keyed by node id; whenever the map holds `batch_size` records it is
//! flushed through the matcher and cleared, and whatever remains once the scan
//! ends is flushed as a final, possibly smaller, batch. A catalog of `L`
//! records therefore costs `ceil(L / batch_size)` matcher calls.
//!
//! Each result is checked before it becomes an edge:
//!
//! 1. its node id must belong to the batch,
//! 2. its relation must not be `NONE`,
//! 3. the homonym filter must not veto the pairing.
//!
//! Anything else is dropped silently. A matcher error drops the batch and the
//! scan continues.

use crate::config::LinkerConfig;
use crate::graph::{TaxonCatalog, TaxonLinkWriter};
use crate::matcher::TermMatcher;
use crate::LinkError;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use taxalink_core::{HomonymFilter, TaxonRecord, TermMatch, TermRequest};
use tracing::{error, info, warn};

/// Timing and outcome of one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStats {
    /// 1-based.
    pub index: usize,
    pub size: usize,
    pub elapsed: Duration,
    pub ms_per_name: f64,
    pub failed: bool,
}

/// Summary of a linking run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkReport {
    pub batches: usize,
    pub failed_batches: usize,
    pub requests: usize,
    pub results: usize,
    pub links_created: usize,
    /// Accepted results whose edge was already present.
    pub links_existing: usize,
    pub vetoed_homonyms: usize,
    /// Results dropped for an unknown node, a `NONE` relation or a failed
    /// edge write.
    pub discarded_results: usize,
    pub batch_stats: Vec<BatchStats>,
}

/// Drives a [`TermMatcher`] over a whole catalog.
pub struct LinkerTermMatcher<M, H> {
    matcher: M,
    homonyms: H,
    config: LinkerConfig,
}

impl<M: TermMatcher, H: HomonymFilter> LinkerTermMatcher<M, H> {
    pub fn new(matcher: M, homonyms: H, config: LinkerConfig) -> Result<Self, LinkError> {
        config.validate()?;
        Ok(Self {
            matcher,
            homonyms,
            config,
        })
    }

    pub fn config(&self) -> &LinkerConfig {
        &self.config
    }

    /// Match every record of `catalog` and write accepted links to `writer`.
    ///
    /// Only a failing catalog scan aborts the run.
    pub fn link<C, W>(&self, catalog: &C, writer: &mut W) -> Result<LinkReport, LinkError>
    where
        C: TaxonCatalog + ?Sized,
        W: TaxonLinkWriter + ?Sized,
    {
        let batch_size = self.config.batch_size;
        let mut report = LinkReport::default();
        let mut batch: HashMap<u64, (u64, TaxonRecord)> = HashMap::with_capacity(batch_size);
        let mut row: u64 = 0;

        for record in catalog.scan()? {
            row += 1;
            batch.insert(record.node_id, (row, record));
            if batch.len() == batch_size {
                self.flush(&mut batch, writer, &mut report);
            }
        }
        if !batch.is_empty() {
            self.flush(&mut batch, writer, &mut report);
        }

        info!(
            batches = report.batches,
            failed_batches = report.failed_batches,
            requests = report.requests,
            links_created = report.links_created,
            vetoed_homonyms = report.vetoed_homonyms,
            "linking complete"
        );
        Ok(report)
    }

    fn flush<W>(
        &self,
        batch: &mut HashMap<u64, (u64, TaxonRecord)>,
        writer: &mut W,
        report: &mut LinkReport,
    ) where
        W: TaxonLinkWriter + ?Sized,
    {
        let index = report.batches + 1;
        info!("batch #{} preparing...", index);
        let start = Instant::now();

        let mut requests: Vec<TermRequest> = batch
            .values()
            .map(|(row, record)| TermRequest {
                row: *row,
                node_id: record.node_id,
                name: record.name().to_string(),
            })
            .collect();
        requests.sort_by_key(|r| r.row);

        let failed = match self.matcher.match_terms(&requests) {
            Ok(matches) => {
                report.results += matches.len();
                for m in matches {
                    self.apply(batch, m, writer, report);
                }
                false
            }
            Err(err) => {
                error!(
                    size = requests.len(),
                    "batch #{} problem matching terms: {}",
                    index,
                    err
                );
                report.failed_batches += 1;
                true
            }
        };

        let elapsed = start.elapsed();
        let ms_per_name = elapsed.as_secs_f64() * 1000.0 / requests.len().max(1) as f64;
        info!(
            "batch #{} completed in [{}] ms ({:.3} ms/name)",
            index,
            elapsed.as_millis(),
            ms_per_name
        );

        report.batches = index;
        report.requests += requests.len();
        report.batch_stats.push(BatchStats {
            index,
            size: requests.len(),
            elapsed,
            ms_per_name,
            failed,
        });
        batch.clear();
    }

    fn apply<W>(
        &self,
        batch: &HashMap<u64, (u64, TaxonRecord)>,
        m: TermMatch,
        writer: &mut W,
        report: &mut LinkReport,
    ) where
        W: TaxonLinkWriter + ?Sized,
    {
        let Some((_, source)) = batch.get(&m.node_id) else {
            report.discarded_results += 1;
            return;
        };
        if m.relation.is_none() {
            report.discarded_results += 1;
            return;
        }
        if self.homonyms.likely_homonym(&m.candidate, &source.taxon) {
            report.vetoed_homonyms += 1;
            return;
        }
        match writer.connect_taxa(source, m.relation, &m.candidate) {
            Ok(true) => report.links_created += 1,
            Ok(false) => report.links_existing += 1,
            Err(err) => {
                warn!(node_id = m.node_id, name = %m.name, error = %err, "failed to link taxon");
                report.discarded_results += 1;
            }
        }
    }
}
