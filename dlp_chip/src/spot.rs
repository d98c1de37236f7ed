use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Live/dead cell counts for one spot as reported by the imaging software.
/// Counts may be missing from the report.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub struct CellCounts {
    pub live: Option<f64>,
    pub dead: Option<f64>,
}

impl CellCounts {
    pub fn new(live: Option<f64>, dead: Option<f64>) -> Self {
        CellCounts { live, dead }
    }

    /// Exactly one cell: one live and no dead, or one dead and no live.
    /// A missing count reads as zero.
    pub fn is_single_cell(&self) -> bool {
        let live = self.live.unwrap_or(0.0);
        let dead = self.dead.unwrap_or(0.0);
        (live == 1.0 && dead == 0.0) || (live == 0.0 && dead == 1.0)
    }
}

/// Which set of counts qualified a spot as holding a single cell.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum CountSource {
    Raw,
    Revised,
}

/// One scored position of the chip, as read from the scan report.
/// Imaging and primer columns are carried through untouched.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ChipSpot {
    pub sample_id: String,
    pub row: u32,
    pub column: u32,
    pub image_dir: String,
    pub channel_1_file: String,
    pub channel_2_file: String,
    pub raw: CellCounts,
    pub revised: CellCounts,
    pub revised_class: String,
    pub condition: String,
    pub index_i7: String,
    pub primer_i7: String,
    pub index_i5: String,
    pub primer_i5: String,
    pub pick_method: String,
    pub spot_well: String,
    /// 1-based line of the spot in the report, header included.
    pub line: usize,
}

impl ChipSpot {
    /// Raw counts are checked first; the revised counts are only consulted
    /// when the raw counts do not show a single cell. When the two sets
    /// disagree the raw counts win.
    pub fn single_cell_source(&self) -> Option<CountSource> {
        if self.raw.is_single_cell() {
            Some(CountSource::Raw)
        } else if self.revised.is_single_cell() {
            Some(CountSource::Revised)
        } else {
            None
        }
    }

    /// A spot at the given address with no metadata, for tests and tools.
    pub fn at(sample_id: &str, row: u32, column: u32, raw: CellCounts) -> Self {
        ChipSpot {
            sample_id: sample_id.to_string(),
            row,
            column,
            image_dir: String::new(),
            channel_1_file: String::new(),
            channel_2_file: String::new(),
            raw,
            revised: CellCounts::default(),
            revised_class: String::new(),
            condition: String::new(),
            index_i7: String::new(),
            primer_i7: String::new(),
            index_i5: String::new(),
            primer_i5: String::new(),
            pick_method: String::new(),
            spot_well: String::new(),
            line: 0,
        }
    }
}
