//! One derived aliquot per accepted chip spot of every attached sample.

use crate::aliquot::{AliquotKind, DerivedAliquot, SourceSample};
use crate::allocator::{next_aliquot_base, ControlCounters};
use crate::errors::DeriveErrors;
use crate::index_assigner::{IndexAssigner, RegisteredIndex};
use anyhow::Result;
use dlp_chip::{ChipLayout, ChipSpot, CountSource, Quadrant, SpotDecision};
use lims_types::constants::{
    CHANNEL_1_FILE, CHANNEL_2_FILE, CHIP_COLUMN, CHIP_QUADRANT, CHIP_ROW, CONDITION, DNA_LIBRARY,
    EXEMPLAR_SAMPLE_TYPE, IMAGE_DIR, INDEX_I5, INDEX_I7, INDEX_ID, INDEX_TAG, IS_CONTROL,
    NUM_DEAD, NUM_LIVE, OCCUPANCY_SOURCE, OTHER_SAMPLE_ID, PICK_METHOD, PRIMER_I5, PRIMER_I7,
    RECIPE, REQUEST_ID, REVISED_CLASS, REVISED_DEAD, REVISED_LIVE, SAMPLE_ID, SPECIES,
    SPOT_WELL,
};
use lims_types::{fields, DataType, EntityStore, FieldValue, Fields};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// Tally of what happened to the scanned spots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpotStats {
    pub scanned: usize,
    pub accepted: usize,
    /// Accepted on the revised counts because the raw counts did not show a single cell.
    pub accepted_on_revised: usize,
    pub skipped_row: usize,
    pub skipped_column: usize,
    pub not_single_cell: usize,
    pub failed: usize,
    /// Rows of samples that were not attached to the run.
    pub unattached: usize,
}

/// An accepted spot for which no aliquot could be derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpotFailure {
    /// Line of the spot in the scan report.
    pub line: usize,
    pub error: DeriveErrors,
}

/// State carried from one sample to the next.
#[derive(Debug, Clone)]
pub struct DerivationState {
    pub counters: ControlCounters,
    /// Sequencing run type of each quadrant, from the first sample that had one.
    pub run_types: BTreeMap<Quadrant, String>,
    pub aliquots: Vec<DerivedAliquot>,
    pub spot_failures: Vec<SpotFailure>,
    pub stats: SpotStats,
}

impl DerivationState {
    pub fn new(counters: ControlCounters) -> Self {
        DerivationState {
            counters,
            run_types: BTreeMap::new(),
            aliquots: Vec::new(),
            spot_failures: Vec::new(),
            stats: SpotStats::default(),
        }
    }
}

pub struct AliquotDeriver<'a> {
    layout: &'a ChipLayout,
    indexes: &'a IndexAssigner,
}

impl<'a> AliquotDeriver<'a> {
    pub fn new(layout: &'a ChipLayout, indexes: &'a IndexAssigner) -> Self {
        AliquotDeriver { layout, indexes }
    }

    /// Derive the aliquots of one sample from its spots, in file order.
    /// Rejected spots are skipped; a spot without a registered index is
    /// recorded as a failure and its siblings continue, as is a control spot
    /// whose family has run out of identifiers. Store errors abort.
    pub fn derive_sample<'s, S: EntityStore>(
        &self,
        store: &mut S,
        sample: &SourceSample,
        spots: impl IntoIterator<Item = &'s ChipSpot>,
        mut state: DerivationState,
    ) -> Result<DerivationState> {
        let base = next_aliquot_base(&*store, &sample.sample_id);
        let mut local = 0u32;

        for spot in spots {
            state.stats.scanned += 1;
            let source = match self.layout.classify(spot) {
                SpotDecision::Accept(source) => source,
                SpotDecision::SkippedRow => {
                    state.stats.skipped_row += 1;
                    continue;
                }
                SpotDecision::SkippedColumn => {
                    state.stats.skipped_column += 1;
                    continue;
                }
                SpotDecision::NotSingleCell => {
                    state.stats.not_single_cell += 1;
                    continue;
                }
            };

            // The index is resolved first so a miss consumes no identifier.
            let key = self.layout.index_key(spot.row, spot.column);
            let index = match self.indexes.assign(&key, spot) {
                Ok(index) => index,
                Err(error) => {
                    warn!("{error}");
                    state.stats.failed += 1;
                    state.spot_failures.push(SpotFailure {
                        line: spot.line,
                        error,
                    });
                    continue;
                }
            };

            if source == CountSource::Revised {
                state.stats.accepted_on_revised += 1;
                info!(
                    "spot of {} at row {}, column {} (line {}) accepted on revised counts \
                     live={:?} dead={:?} (raw live={:?} dead={:?}, class '{}')",
                    sample.sample_id,
                    spot.row,
                    spot.column,
                    spot.line,
                    spot.revised.live,
                    spot.revised.dead,
                    spot.raw.live,
                    spot.raw.dead,
                    spot.revised_class,
                );
            }

            let (sample_id, kind) = match self.layout.control_family(spot.column) {
                Some(family) => match state.counters.allocate(&*store, family) {
                    Ok(id) => (id, AliquotKind::Control { family }),
                    Err(error) => {
                        warn!("{error}");
                        state.stats.failed += 1;
                        state.spot_failures.push(SpotFailure {
                            line: spot.line,
                            error,
                        });
                        continue;
                    }
                },
                None => {
                    local += 1;
                    (
                        format!("{base}_{local}"),
                        AliquotKind::Ordinary {
                            parent: sample.handle,
                        },
                    )
                }
            };

            let quadrant = self.layout.quadrant(spot.row, spot.column);
            if quadrant.is_mapped() && !state.run_types.contains_key(&quadrant) {
                if let Some(run_type) = &sample.run_type {
                    state.run_types.insert(quadrant, run_type.clone());
                }
            }

            let aliquot =
                create_aliquot(store, sample, spot, source, sample_id, kind, quadrant, index)?;
            debug!(
                "created {} from row {}, column {} in quadrant {}",
                aliquot.sample_id, spot.row, spot.column, quadrant
            );
            state.stats.accepted += 1;
            state.aliquots.push(aliquot);
        }
        Ok(state)
    }
}

fn insert_opt(fields: &mut Fields, name: &str, value: Option<impl Into<FieldValue>>) {
    if let Some(value) = value {
        fields.insert(name.to_string(), value.into());
    }
}

#[allow(clippy::too_many_arguments)]
fn create_aliquot<S: EntityStore>(
    store: &mut S,
    sample: &SourceSample,
    spot: &ChipSpot,
    source: CountSource,
    sample_id: String,
    kind: AliquotKind,
    quadrant: Quadrant,
    index: &RegisteredIndex,
) -> Result<DerivedAliquot> {
    let mut attrs = fields([
        (SAMPLE_ID, FieldValue::from(sample_id.as_str())),
        (EXEMPLAR_SAMPLE_TYPE, DNA_LIBRARY.into()),
        (IS_CONTROL, matches!(kind, AliquotKind::Control { .. }).into()),
        (CHIP_ROW, spot.row.into()),
        (CHIP_COLUMN, spot.column.into()),
        (CHIP_QUADRANT, u32::from(quadrant.number()).into()),
    ]);
    insert_opt(&mut attrs, SPECIES, sample.species.as_deref());
    insert_opt(&mut attrs, RECIPE, sample.recipe.as_deref());
    match kind {
        AliquotKind::Ordinary { .. } => {
            insert_opt(&mut attrs, OTHER_SAMPLE_ID, sample.other_sample_id.as_deref());
            insert_opt(&mut attrs, REQUEST_ID, sample.request_id.as_deref());
        }
        AliquotKind::Control { .. } => {
            attrs.insert(OTHER_SAMPLE_ID.to_string(), sample_id.as_str().into());
        }
    }

    let handle = store.create(DataType::Sample, attrs)?;
    if let AliquotKind::Ordinary { parent } = kind {
        store.add_child(parent, handle)?;
    }

    let protocol = store.create(DataType::DLPLibraryPrepProtocol, protocol_fields(spot, source))?;
    store.add_child(handle, protocol)?;

    let barcode = store.create(
        DataType::IndexBarcode,
        fields([
            (INDEX_ID, index.index_id.as_str()),
            (INDEX_TAG, index.index_tag.as_str()),
        ]),
    )?;
    store.add_child(handle, barcode)?;

    Ok(DerivedAliquot {
        handle,
        sample_id,
        kind,
        quadrant,
        row: spot.row,
        column: spot.column,
        index_id: index.index_id.clone(),
        request_id: sample.request_id.clone(),
    })
}

/// The spot's scan report columns, carried onto the protocol record.
fn protocol_fields(spot: &ChipSpot, source: CountSource) -> Fields {
    let mut attrs = fields([
        (CHIP_ROW, FieldValue::from(spot.row)),
        (CHIP_COLUMN, spot.column.into()),
        (IMAGE_DIR, spot.image_dir.as_str().into()),
        (CHANNEL_1_FILE, spot.channel_1_file.as_str().into()),
        (CHANNEL_2_FILE, spot.channel_2_file.as_str().into()),
        (REVISED_CLASS, spot.revised_class.as_str().into()),
        (CONDITION, spot.condition.as_str().into()),
        (INDEX_I7, spot.index_i7.as_str().into()),
        (PRIMER_I7, spot.primer_i7.as_str().into()),
        (INDEX_I5, spot.index_i5.as_str().into()),
        (PRIMER_I5, spot.primer_i5.as_str().into()),
        (PICK_METHOD, spot.pick_method.as_str().into()),
        (SPOT_WELL, spot.spot_well.as_str().into()),
        (OCCUPANCY_SOURCE, source.to_string().into()),
    ]);
    insert_opt(&mut attrs, NUM_LIVE, spot.raw.live);
    insert_opt(&mut attrs, NUM_DEAD, spot.raw.dead);
    insert_opt(&mut attrs, REVISED_LIVE, spot.revised.live);
    insert_opt(&mut attrs, REVISED_DEAD, spot.revised.dead);
    attrs
}
