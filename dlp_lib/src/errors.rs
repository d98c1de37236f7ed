use dlp_chip::{ControlFamily, Quadrant};
use serde::Serialize;

/// Failures scoped to one source sample or one chip spot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum DeriveErrors {
    #[error(
        "No index barcode pair is registered under '{key}' for the spot of sample \
         '{sample_id}' at row {row}, column {column}."
    )]
    IndexNotRegistered {
        key: String,
        sample_id: String,
        row: u32,
        column: u32,
    },

    #[error("Sample '{sample_id}' was attached to the run but does not exist in the LIMS.")]
    SampleNotFound { sample_id: String },

    #[error(
        "No {family} control identifier is left after {stem}-{max}.",
        stem = .family.sample_name(),
        max = u32::MAX
    )]
    ControlIdsExhausted { family: ControlFamily },
}

/// Failures scoped to one chip quadrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum PoolErrors {
    #[error(
        "None of the samples in chip quadrant {quadrant} has a request id. The quadrant was \
         not pooled."
    )]
    NoRequestIds { quadrant: Quadrant },

    #[error(
        "{count} aliquot(s) lie outside the chip and could not be assigned to a quadrant: {}",
        .sample_ids.join(", ")
    )]
    UnmappedAliquots {
        count: usize,
        sample_ids: Vec<String>,
    },
}
