use crate::errors::DeriveErrors;
use dlp_chip::{ControlFamily, Quadrant};
use lims_types::constants::{OTHER_SAMPLE_ID, RECIPE, REQUEST_ID, SEQUENCING_RUN_TYPE, SPECIES};
use lims_types::{DataType, EntityStore, RecordHandle};
use serde::Serialize;

/// An existing sample attached to the run. Read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSample {
    pub handle: RecordHandle,
    pub sample_id: String,
    pub other_sample_id: Option<String>,
    pub species: Option<String>,
    pub recipe: Option<String>,
    /// The sample's own request id, else the nearest ancestor's.
    pub request_id: Option<String>,
    /// First sequencing run type found on the sample or its ancestors.
    pub run_type: Option<String>,
}

impl SourceSample {
    pub fn load(store: &impl EntityStore, sample_id: &str) -> Result<Self, DeriveErrors> {
        let handle = store
            .find_sample(sample_id)
            .ok_or_else(|| DeriveErrors::SampleNotFound {
                sample_id: sample_id.to_string(),
            })?;
        let own = |name: &str| store.text(handle, name).map(str::to_string);
        Ok(SourceSample {
            handle,
            sample_id: sample_id.to_string(),
            other_sample_id: own(OTHER_SAMPLE_ID),
            species: own(SPECIES),
            recipe: own(RECIPE),
            request_id: store
                .nearest_ancestor_with_field(handle, REQUEST_ID)
                .and_then(|h| store.text(h, REQUEST_ID))
                .map(str::to_string),
            run_type: sequencing_run_type(store, handle),
        })
    }
}

/// Walk the sample and then its ancestors, nearest first, for a non-empty
/// run type set either on the record itself or on one of its sequencing
/// requirement children.
pub fn sequencing_run_type(store: &impl EntityStore, sample: RecordHandle) -> Option<String> {
    std::iter::once(sample)
        .chain(store.ancestors(sample))
        .find_map(|h| {
            store.text(h, SEQUENCING_RUN_TYPE).or_else(|| {
                store
                    .children_of_type(h, DataType::SeqRequirement)
                    .into_iter()
                    .find_map(|req| store.text(req, SEQUENCING_RUN_TYPE))
            })
        })
        .map(str::to_string)
}

/// Ordinary library aliquots hang under their source sample; controls stand alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AliquotKind {
    Ordinary { parent: RecordHandle },
    Control { family: ControlFamily },
}

/// A sample record created for one accepted chip spot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedAliquot {
    pub handle: RecordHandle,
    pub sample_id: String,
    pub kind: AliquotKind,
    pub quadrant: Quadrant,
    pub row: u32,
    pub column: u32,
    pub index_id: String,
    /// Request id of the source sample the spot was scanned for.
    pub request_id: Option<String>,
}

impl DerivedAliquot {
    pub fn is_control(&self) -> bool {
        matches!(self.kind, AliquotKind::Control { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lims_types::{fields, Fields, MemoryStore};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_resolves_from_ancestors() -> anyhow::Result<()> {
        let mut store = MemoryStore::new();
        let project = store.add_sample("P", fields([(REQUEST_ID, "100")]))?;
        let req = store.create(
            DataType::SeqRequirement,
            fields([(SEQUENCING_RUN_TYPE, "PE150")]),
        )?;
        store.add_child(project, req)?;
        let tissue = store.add_sample("T", fields([(SEQUENCING_RUN_TYPE, " ")]))?;
        store.add_child(project, tissue)?;
        let cells = store.add_sample(
            "C",
            fields([(OTHER_SAMPLE_ID, "cells"), (SPECIES, "Human"), (RECIPE, "DLP")]),
        )?;
        store.add_child(tissue, cells)?;

        let sample = SourceSample::load(&store, "C")?;
        assert_eq!(sample.handle, cells);
        assert_eq!(sample.other_sample_id.as_deref(), Some("cells"));
        assert_eq!(sample.species.as_deref(), Some("Human"));
        assert_eq!(sample.request_id.as_deref(), Some("100"));
        assert_eq!(sample.run_type.as_deref(), Some("PE150"));
        Ok(())
    }

    #[test]
    fn test_nearest_run_type_wins() -> anyhow::Result<()> {
        let mut store = MemoryStore::new();
        let root = store.add_sample("R", fields([(SEQUENCING_RUN_TYPE, "PE100")]))?;
        let mid = store.add_sample("M", Fields::new())?;
        let req = store.create(
            DataType::SeqRequirement,
            fields([(SEQUENCING_RUN_TYPE, "PE150")]),
        )?;
        store.add_child(root, mid)?;
        store.add_child(mid, req)?;
        let leaf = store.add_sample("L", fields([(REQUEST_ID, "7")]))?;
        store.add_child(mid, leaf)?;

        assert_eq!(sequencing_run_type(&store, leaf).as_deref(), Some("PE150"));
        assert_eq!(sequencing_run_type(&store, root).as_deref(), Some("PE100"));
        assert_eq!(SourceSample::load(&store, "L")?.request_id.as_deref(), Some("7"));
        Ok(())
    }

    #[test]
    fn test_unknown_sample() {
        let store = MemoryStore::new();
        assert_eq!(
            SourceSample::load(&store, "nope"),
            Err(DeriveErrors::SampleNotFound {
                sample_id: "nope".to_string()
            })
        );
    }
}
