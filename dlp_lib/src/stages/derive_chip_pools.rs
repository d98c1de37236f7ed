//! Martian stage DERIVE_CHIP_POOLS
//! Derive one aliquot per single-cell chip spot and pool the aliquots by
//! chip quadrant.

use crate::run::{derive_chip_pools, DerivationSummary};
use anyhow::Result;
use dlp_chip::{ChipLayout, ScanReport};
use lims_types::MemoryStore;
use martian::prelude::*;
use martian_derive::{make_mro, MartianStruct};
use martian_filetypes::json_file::JsonFile;
use martian_filetypes::tabular_file::CsvFile;
use martian_filetypes::{FileTypeRead, FileTypeWrite};
use serde::{Deserialize, Serialize};

#[derive(Clone, Deserialize, MartianStruct)]
pub struct DeriveChipPoolsStageInputs {
    pub scan_report: CsvFile<()>,
    pub lims_snapshot: JsonFile<MemoryStore>,
    /// Samples attached to the run, in attachment order.
    pub sample_ids: Vec<String>,
    /// Defaults to the layout in parameters.toml.
    pub chip_layout: Option<ChipLayout>,
}

#[derive(Clone, Serialize, Deserialize, MartianStruct)]
pub struct DeriveChipPoolsStageOutputs {
    pub lims_snapshot: JsonFile<MemoryStore>,
    pub summary: JsonFile<DerivationSummary>,
    pub pool_ids: Vec<String>,
    pub partial_failure: bool,
}

/// Martian stage DERIVE_CHIP_POOLS
pub struct DeriveChipPools;

#[make_mro(mem_gb = 2)]
impl MartianMain for DeriveChipPools {
    type StageInputs = DeriveChipPoolsStageInputs;
    type StageOutputs = DeriveChipPoolsStageOutputs;

    fn main(&self, args: Self::StageInputs, rover: MartianRover) -> Result<Self::StageOutputs> {
        let layout = match args.chip_layout {
            Some(layout) => layout,
            None => ChipLayout::from_parameters()?,
        };
        let scan = ScanReport::read(args.scan_report.as_ref())?;
        let mut store = args.lims_snapshot.read()?;

        let outcome = derive_chip_pools(
            &mut store,
            &scan,
            &args.sample_ids,
            &layout,
            *parameters_toml::requested_reads_per_aliquot()?,
        )?;

        let lims_snapshot: JsonFile<_> = rover.make_path("lims_snapshot");
        lims_snapshot.write(&store)?;
        let summary: JsonFile<_> = rover.make_path("summary");
        summary.write(&outcome.summary())?;

        Ok(DeriveChipPoolsStageOutputs {
            lims_snapshot,
            summary,
            pool_ids: outcome.pool_ids(),
            partial_failure: outcome.is_partial(),
        })
    }
}
