//! Attribute names used on LIMS records.

/// Primary sample identifier.
pub const SAMPLE_ID: &str = "SampleId";

/// Secondary (investigator) sample label.
pub const OTHER_SAMPLE_ID: &str = "OtherSampleId";

pub const SPECIES: &str = "Species";
pub const RECIPE: &str = "Recipe";
pub const REQUEST_ID: &str = "RequestId";
pub const EXEMPLAR_SAMPLE_TYPE: &str = "ExemplarSampleType";

/// Set on every derived aliquot, true for synthetic control samples.
pub const IS_CONTROL: &str = "IsControl";

/// Set on pooled library records.
pub const IS_POOL: &str = "IsPool";

pub const SEQUENCING_RUN_TYPE: &str = "SequencingRunType";
pub const REQUESTED_READS: &str = "RequestedReads";

pub const CHIP_ROW: &str = "ChipRow";
pub const CHIP_COLUMN: &str = "ChipColumn";
pub const CHIP_QUADRANT: &str = "ChipQuadrant";

/// Identifier of a registered index barcode pair, e.g. `i7_10-i5_05`.
pub const INDEX_ID: &str = "IndexId";

/// Barcode sequences of a registered index pair.
pub const INDEX_TAG: &str = "IndexTag";

// Protocol record attributes, one per scan report column.
pub const IMAGE_DIR: &str = "ImageDirectory";
pub const CHANNEL_1_FILE: &str = "Channel1File";
pub const CHANNEL_2_FILE: &str = "Channel2File";
pub const NUM_LIVE: &str = "NumLive";
pub const NUM_DEAD: &str = "NumDead";
pub const REVISED_LIVE: &str = "RevisedLive";
pub const REVISED_DEAD: &str = "RevisedDead";
pub const REVISED_CLASS: &str = "RevisedClass";
pub const CONDITION: &str = "Condition";
pub const INDEX_I7: &str = "IndexI7";
pub const PRIMER_I7: &str = "PrimerI7";
pub const INDEX_I5: &str = "IndexI5";
pub const PRIMER_I5: &str = "PrimerI5";
pub const PICK_METHOD: &str = "PickMethod";
pub const SPOT_WELL: &str = "SpotWell";

/// Which count set (raw or revised) qualified the spot as a single cell.
pub const OCCUPANCY_SOURCE: &str = "OccupancySource";

/// Sample type of every derived aliquot.
pub const DNA_LIBRARY: &str = "DNA Library";

/// Sample type of pool records.
pub const POOLED_LIBRARY: &str = "Pooled Library";
