//! Chip geometry: which positions are processed, which columns hold
//! controls, and how positions map to quadrants and index keys.

use crate::index_key::IndexKey;
use crate::quadrant::Quadrant;
use crate::spot::{ChipSpot, CountSource};
use anyhow::{ensure, Result};
use itertools::Itertools;
use martian_derive::MartianType;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Synthetic control sample types. Each family has its own identifier sequence.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Debug,
    Display,
    EnumIter,
    EnumString,
    MartianType,
)]
pub enum ControlFamily {
    Negative,
    Salt,
    Germline,
}

impl ControlFamily {
    /// Identifier stem of the family's control samples, e.g. `DLPNegativeCONTROL-12`.
    pub fn sample_name(self) -> &'static str {
        match self {
            ControlFamily::Negative => "DLPNegativeCONTROL",
            ControlFamily::Salt => "DLPSaltCONTROL",
            ControlFamily::Germline => "DLPGermlineCONTROL",
        }
    }
}

/// A chip column whose spots are control samples of one family.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, MartianType)]
pub struct ControlLane {
    pub column: u32,
    pub family: ControlFamily,
}

/// Why a spot was or was not processed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpotDecision {
    Accept(CountSource),
    SkippedRow,
    SkippedColumn,
    NotSingleCell,
}

impl SpotDecision {
    pub fn is_accepted(self) -> bool {
        matches!(self, SpotDecision::Accept(_))
    }
}

/// Per-chip-model configuration of the derivation.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, MartianType)]
pub struct ChipLayout {
    /// The chip is `2 * half_width` positions on each side.
    pub half_width: u32,
    pub skip_rows: Vec<u32>,
    pub skip_columns: Vec<u32>,
    pub control_lanes: Vec<ControlLane>,
    pub index_key_prefix: String,
}

impl ChipLayout {
    /// Build the layout from `parameters.toml`, or its defaults.
    pub fn from_parameters() -> Result<Self> {
        let layout = ChipLayout {
            half_width: *parameters_toml::chip_half_width()?,
            skip_rows: parameters_toml::skip_rows()?.clone(),
            skip_columns: parameters_toml::skip_columns()?.clone(),
            control_lanes: vec![
                ControlLane {
                    column: *parameters_toml::negative_control_column()?,
                    family: ControlFamily::Negative,
                },
                ControlLane {
                    column: *parameters_toml::salt_control_column()?,
                    family: ControlFamily::Salt,
                },
                ControlLane {
                    column: *parameters_toml::germline_control_column()?,
                    family: ControlFamily::Germline,
                },
            ],
            index_key_prefix: parameters_toml::index_key_prefix()?.clone(),
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Reject layouts where a control column is ambiguous or unreachable.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.half_width > 0, "The chip half width must be positive.");
        if let Some(column) = self
            .control_lanes
            .iter()
            .map(|lane| lane.column)
            .duplicates()
            .next()
        {
            anyhow::bail!("Chip column {column} is assigned to more than one control family.");
        }
        for lane in &self.control_lanes {
            ensure!(
                !self.skip_columns.contains(&lane.column),
                "The {} control column {} is also listed as a skipped column.",
                lane.family,
                lane.column
            );
            ensure!(
                lane.column >= 1 && lane.column <= self.dimension(),
                "The {} control column {} is outside the {}x{} chip.",
                lane.family,
                lane.column,
                self.dimension(),
                self.dimension()
            );
        }
        Ok(())
    }

    /// Number of rows (and columns) on the chip.
    pub fn dimension(&self) -> u32 {
        self.half_width.saturating_mul(2)
    }

    pub fn quadrant(&self, row: u32, column: u32) -> Quadrant {
        Quadrant::from_position(row, column, self.half_width)
    }

    /// The control family assigned to a chip column, None for ordinary columns.
    pub fn control_family(&self, column: u32) -> Option<ControlFamily> {
        self.control_lanes
            .iter()
            .find(|lane| lane.column == column)
            .map(|lane| lane.family)
    }

    /// Decide whether a spot is processed. Skip lists are checked before occupancy.
    pub fn classify(&self, spot: &ChipSpot) -> SpotDecision {
        if self.skip_rows.contains(&spot.row) {
            SpotDecision::SkippedRow
        } else if self.skip_columns.contains(&spot.column) {
            SpotDecision::SkippedColumn
        } else {
            spot.single_cell_source()
                .map_or(SpotDecision::NotSingleCell, SpotDecision::Accept)
        }
    }

    pub fn accepts(&self, spot: &ChipSpot) -> bool {
        self.classify(spot).is_accepted()
    }

    pub fn index_key(&self, row: u32, column: u32) -> IndexKey {
        IndexKey::new(&self.index_key_prefix, row, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spot::CellCounts;
    use crate::testing::dlp_layout;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    fn live(row: u32, column: u32) -> ChipSpot {
        ChipSpot::at("S", row, column, CellCounts::new(Some(1.0), Some(0.0)))
    }

    #[test]
    fn test_accepted_spot() {
        let layout = dlp_layout();
        let spot = live(5, 10);
        assert_eq!(layout.classify(&spot), SpotDecision::Accept(CountSource::Raw));
        assert_eq!(layout.quadrant(spot.row, spot.column), Quadrant::First);
        assert_eq!(layout.index_key(spot.row, spot.column).as_str(), "i7_10-i5_05");
    }

    #[test]
    fn test_skip_lists_win_over_occupancy() {
        let layout = dlp_layout();
        assert_eq!(layout.classify(&live(1, 5)), SpotDecision::SkippedRow);
        assert_eq!(layout.classify(&live(37, 5)), SpotDecision::SkippedRow);
        assert_eq!(layout.classify(&live(5, 72)), SpotDecision::SkippedColumn);
        let empty = ChipSpot::at("S", 5, 10, CellCounts::default());
        assert_eq!(layout.classify(&empty), SpotDecision::NotSingleCell);
        assert!(!layout.accepts(&empty));
    }

    #[test]
    fn test_control_lanes() {
        let layout = dlp_layout();
        assert_eq!(layout.control_family(3), Some(ControlFamily::Negative));
        assert_eq!(layout.control_family(4), Some(ControlFamily::Salt));
        assert_eq!(layout.control_family(5), Some(ControlFamily::Germline));
        assert_eq!(layout.control_family(6), None);
        for family in ControlFamily::iter() {
            assert!(family.sample_name().ends_with("CONTROL"));
        }
    }

    #[test]
    fn test_validate() {
        assert!(dlp_layout().validate().is_ok());

        let mut layout = dlp_layout();
        layout.control_lanes[1].column = 3;
        assert!(layout.validate().is_err());

        let mut layout = dlp_layout();
        layout.skip_columns.push(4);
        assert!(layout.validate().is_err());

        let mut layout = dlp_layout();
        layout.control_lanes[2].column = 80;
        assert!(layout.validate().is_err());

        let mut layout = dlp_layout();
        layout.half_width = 0;
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_from_parameters_defaults() -> Result<()> {
        // No parameters.toml sits next to the test binary.
        assert_eq!(ChipLayout::from_parameters()?, dlp_layout());
        Ok(())
    }

    #[test]
    fn test_layout_json() -> Result<()> {
        let json = r#"{
            "half_width": 18,
            "skip_rows": [1, 36],
            "skip_columns": [],
            "control_lanes": [{"column": 2, "family": "Salt"}],
            "index_key_prefix": "DLP_"
        }"#;
        let layout: ChipLayout = serde_json::from_str(json)?;
        layout.validate()?;
        assert_eq!(layout.control_family(2), Some(ControlFamily::Salt));
        assert_eq!(layout.quadrant(20, 2), Quadrant::Third);
        assert_eq!(layout.index_key(20, 2).as_str(), "DLP_i7_02-i5_20");
        Ok(())
    }
}
