//! Testing utilities

use crate::layout::{ChipLayout, ControlFamily, ControlLane};

/// The 72x72 DLP chip with controls in columns 3, 4 and 5.
pub fn dlp_layout() -> ChipLayout {
    let edges = vec![1, 2, 36, 37, 71, 72];
    ChipLayout {
        half_width: 36,
        skip_rows: edges.clone(),
        skip_columns: edges,
        control_lanes: [
            ControlFamily::Negative,
            ControlFamily::Salt,
            ControlFamily::Germline,
        ]
        .into_iter()
        .zip(3..)
        .map(|(family, column)| ControlLane { column, family })
        .collect(),
        index_key_prefix: String::new(),
    }
}
