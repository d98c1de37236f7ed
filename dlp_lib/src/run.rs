//! A complete derivation: scan report and attached samples in, aliquots and
//! quadrant pools out.

use crate::aliquot::{DerivedAliquot, SourceSample};
use crate::allocator::ControlCounters;
use crate::assemble_pools::{CreatedPool, PoolAssembler, QuadrantFailure};
use crate::derive_aliquots::{AliquotDeriver, DerivationState, SpotFailure, SpotStats};
use crate::index_assigner::IndexAssigner;
use anyhow::Result;
use dlp_chip::{ChipLayout, Quadrant, ScanReport};
use fxhash::FxHashSet;
use lims_types::EntityStore;
use log::{info, warn};
use serde::Serialize;

/// Everything a run created, plus the aliquots and quadrants that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivationOutcome {
    pub aliquots: Vec<DerivedAliquot>,
    pub pools: Vec<CreatedPool>,
    pub spot_failures: Vec<SpotFailure>,
    pub quadrant_failures: Vec<QuadrantFailure>,
    pub stats: SpotStats,
}

impl DerivationOutcome {
    /// Some pools may have been created, but at least one spot or quadrant failed.
    pub fn is_partial(&self) -> bool {
        !self.spot_failures.is_empty() || !self.quadrant_failures.is_empty()
    }

    pub fn pool_ids(&self) -> Vec<String> {
        self.pools.iter().map(|p| p.pool_id.clone()).collect()
    }

    pub fn summary(&self) -> DerivationSummary {
        DerivationSummary {
            pools: self
                .pools
                .iter()
                .map(|p| PoolSummary {
                    pool_id: p.pool_id.clone(),
                    quadrant: p.quadrant,
                    member_count: p.member_count,
                    request_ids: p.request_ids.clone(),
                    run_type: p.run_type.clone(),
                    requested_reads: p.requested_reads,
                })
                .collect(),
            aliquot_ids: self.aliquots.iter().map(|a| a.sample_id.clone()).collect(),
            stats: self.stats,
            spot_failures: self
                .spot_failures
                .iter()
                .map(|f| format!("line {}: {}", f.line, f.error))
                .collect(),
            quadrant_failures: self
                .quadrant_failures
                .iter()
                .map(|f| f.error.to_string())
                .collect(),
            partial_failure: self.is_partial(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSummary {
    pub pool_id: String,
    pub quadrant: Quadrant,
    pub member_count: usize,
    pub request_ids: Vec<String>,
    pub run_type: String,
    pub requested_reads: f64,
}

/// JSON report of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivationSummary {
    pub pools: Vec<PoolSummary>,
    pub aliquot_ids: Vec<String>,
    pub stats: SpotStats,
    pub spot_failures: Vec<String>,
    pub quadrant_failures: Vec<String>,
    pub partial_failure: bool,
}

/// Derive aliquots for every attached sample, in attachment order, then pool
/// them by quadrant.
///
/// Fails before touching the store if the layout is invalid or an attached
/// sample is missing. Failures of single spots or quadrants are returned in
/// the outcome. Any other error aborts the run and leaves the store partly
/// written, so callers should persist it only on success.
pub fn derive_chip_pools<S: EntityStore>(
    store: &mut S,
    scan: &ScanReport,
    sample_ids: &[String],
    layout: &ChipLayout,
    reads_per_aliquot: f64,
) -> Result<DerivationOutcome> {
    layout.validate()?;
    let samples = sample_ids
        .iter()
        .map(|id| SourceSample::load(&*store, id))
        .collect::<Result<Vec<_>, _>>()?;

    let attached: FxHashSet<&str> = sample_ids.iter().map(String::as_str).collect();
    let mut unattached = 0;
    for sample_id in scan.samples() {
        if !attached.contains(sample_id) {
            let rows = scan.spots_for(sample_id).count();
            warn!("skipping {rows} scan report rows of {sample_id}, which is not attached to the run");
            unattached += rows;
        }
    }

    info!(
        "deriving aliquots for {} samples from {} scanned spots in {}",
        samples.len(),
        scan.len(),
        scan.path().display()
    );
    let indexes = IndexAssigner::load(&*store);
    let deriver = AliquotDeriver::new(layout, &indexes);
    let mut state = DerivationState::new(ControlCounters::load(&*store));
    for sample in &samples {
        state = deriver.derive_sample(store, sample, scan.spots_for(&sample.sample_id), state)?;
    }
    state.stats.unattached = unattached;

    let assembly = PoolAssembler::new(reads_per_aliquot).assemble(
        store,
        &state.aliquots,
        &state.run_types,
    )?;

    let outcome = DerivationOutcome {
        aliquots: state.aliquots,
        pools: assembly.pools,
        spot_failures: state.spot_failures,
        quadrant_failures: assembly.failures,
        stats: state.stats,
    };
    info!(
        "created {} aliquots and {} pools; {} spot and {} quadrant failures",
        outcome.aliquots.len(),
        outcome.pools.len(),
        outcome.spot_failures.len(),
        outcome.quadrant_failures.len()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DeriveErrors;
    use crate::index_assigner::tests::register_all;
    use dlp_chip::testing::dlp_layout;
    use lims_types::constants::{OTHER_SAMPLE_ID, REQUEST_ID, SEQUENCING_RUN_TYPE};
    use lims_types::{fields, DataType, MemoryStore};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    const HEADER: &str = "Sample,Row,Column,Img_Dir,File_Ch1,File_Ch2,Num_Live,Num_Dead,\
                          Rev_Live,Rev_Dead,Rev_Class,Condition,Index_I7,Primer_I7,Index_I5,\
                          Primer_I5,Pick_Met,Spot_Well";

    fn scan(rows: &[(&str, u32, u32, u32, u32)]) -> ScanReport {
        let mut csv = HEADER.to_string();
        for (sample, row, column, live, dead) in rows {
            csv.push_str(&format!("\n{sample},{row},{column},,,,{live},{dead},,,,,,,,,,"));
        }
        ScanReport::parse_str(&csv, Path::new("scan.csv")).unwrap()
    }

    fn lims() -> MemoryStore {
        let mut store = MemoryStore::new();
        register_all(&mut store, 72);
        store.add_sample("SA100", fields([(REQUEST_ID, "100")])).unwrap();
        store.add_sample(
            "SA101",
            fields([(REQUEST_ID, "101"), (SEQUENCING_RUN_TYPE, "PE150")]),
        ).unwrap();
        store.add_sample(
            "DLPNegativeCONTROL-4",
            fields([(OTHER_SAMPLE_ID, "DLPNegativeCONTROL-4")]),
        ).unwrap();
        store
    }

    #[test]
    fn test_full_run() -> Result<()> {
        let mut store = lims();
        let report = scan(&[
            ("SA100", 5, 40, 1, 0),
            ("SA101", 6, 41, 0, 1),
            ("SA100", 7, 42, 1, 0),
            ("SA100", 1, 42, 1, 0),
            ("SA101", 50, 3, 1, 0),
            ("SA101", 50, 10, 2, 0),
            ("SAXXX", 8, 8, 1, 0),
        ]);
        let ids = vec!["SA100".to_string(), "SA101".to_string()];
        let outcome = derive_chip_pools(&mut store, &report, &ids, &dlp_layout(), 2.0)?;

        let aliquots: Vec<_> = outcome.aliquots.iter().map(|a| a.sample_id.as_str()).collect();
        assert_eq!(
            aliquots,
            vec!["SA100_1_1", "SA100_1_2", "SA101_1_1", "DLPNegativeCONTROL-5"]
        );
        assert_eq!(outcome.pool_ids(), vec!["Pool-100_101-Tube2", "Pool-101-Tube3"]);
        assert_eq!(outcome.pools[0].requested_reads, 6.0);
        assert_eq!(outcome.pools[1].run_type, "PE150");
        // quadrant 2 was first reached by SA100, which has no run type
        assert_eq!(outcome.pools[0].run_type, "PE150");
        assert!(!outcome.is_partial());
        assert_eq!(outcome.stats.unattached, 1);
        assert_eq!(outcome.stats.skipped_row, 1);
        assert_eq!(outcome.stats.not_single_cell, 1);

        let summary = outcome.summary();
        assert!(!summary.partial_failure);
        assert_eq!(summary.pools[1].member_count, 1);
        Ok(())
    }

    #[test]
    fn test_unknown_attached_sample_fails_before_writing() {
        let mut store = lims();
        let before = store.len();
        let report = scan(&[("SA100", 5, 40, 1, 0)]);
        let ids = vec!["SA100".to_string(), "SA999".to_string()];
        let err = derive_chip_pools(&mut store, &report, &ids, &dlp_layout(), 2.0).unwrap_err();
        assert_eq!(
            err.downcast::<DeriveErrors>().unwrap(),
            DeriveErrors::SampleNotFound {
                sample_id: "SA999".to_string()
            }
        );
        assert_eq!(store.len(), before);
    }

    #[test]
    fn test_partial_outcome() -> Result<()> {
        let mut store = MemoryStore::new();
        register_all(&mut store, 40);
        store.add_sample("SA100", fields([(REQUEST_ID, "100")]))?;
        store.add_sample("SA200", Default::default())?;
        let report = scan(&[
            ("SA100", 5, 10, 1, 0),
            ("SA100", 5, 60, 1, 0),
            ("SA200", 40, 10, 1, 0),
        ]);
        let ids = vec!["SA100".to_string(), "SA200".to_string()];
        let outcome = derive_chip_pools(&mut store, &report, &ids, &dlp_layout(), 2.0)?;

        assert_eq!(outcome.pool_ids(), vec!["Pool-100-Tube1"]);
        assert_eq!(outcome.spot_failures.len(), 1);
        assert_eq!(outcome.quadrant_failures.len(), 1);
        assert!(outcome.is_partial());
        let summary = outcome.summary();
        assert!(summary.partial_failure);
        assert_eq!(summary.spot_failures.len(), 1);
        assert!(summary.spot_failures[0].starts_with("line 3: "));

        let pools = store.query(DataType::Sample, &|r| {
            r.sample_id().is_some_and(|id| id.starts_with("Pool-"))
        });
        assert_eq!(pools.len(), 1);
        Ok(())
    }
}
