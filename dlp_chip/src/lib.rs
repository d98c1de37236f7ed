//! Decoding of DLP chip scans: which spots hold a single cell, where they sit
//! on the chip, and which index barcode pair belongs to each position.

pub mod index_key;
pub mod layout;
pub mod quadrant;
pub mod report;
pub mod spot;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use index_key::IndexKey;
pub use layout::{ChipLayout, ControlFamily, ControlLane, SpotDecision};
pub use quadrant::Quadrant;
pub use report::{ScanReport, ScanReportErrors};
pub use spot::{CellCounts, ChipSpot, CountSource};
