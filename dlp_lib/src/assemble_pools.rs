//! Quadrant pools: one pooled library per populated chip quadrant.

use crate::aliquot::DerivedAliquot;
use crate::allocator::allocate_pool_id;
use crate::errors::PoolErrors;
use anyhow::Result;
use dlp_chip::Quadrant;
use itertools::Itertools;
use lims_types::constants::{
    CHIP_QUADRANT, EXEMPLAR_SAMPLE_TYPE, IS_POOL, OTHER_SAMPLE_ID, POOLED_LIBRARY, RECIPE,
    REQUESTED_READS, REQUEST_ID, SAMPLE_ID, SEQUENCING_RUN_TYPE, SPECIES,
};
use lims_types::{fields, DataType, EntityStore, FieldValue, RecordHandle};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// A pool record created for one quadrant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedPool {
    pub handle: RecordHandle,
    pub pool_id: String,
    pub quadrant: Quadrant,
    pub member_count: usize,
    pub request_ids: Vec<String>,
    /// Empty when no member sample had a sequencing run type.
    pub run_type: String,
    pub requested_reads: f64,
}

/// A quadrant, or the unmapped aliquots, that could not be pooled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuadrantFailure {
    pub quadrant: Quadrant,
    pub error: PoolErrors,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolAssembly {
    pub pools: Vec<CreatedPool>,
    pub failures: Vec<QuadrantFailure>,
}

pub struct PoolAssembler {
    reads_per_aliquot: f64,
}

impl PoolAssembler {
    pub fn new(reads_per_aliquot: f64) -> Self {
        PoolAssembler { reads_per_aliquot }
    }

    /// Pool the aliquots of each populated quadrant, in ascending quadrant
    /// order. A quadrant whose members carry no request id is reported and
    /// skipped; the other quadrants are still pooled.
    pub fn assemble<S: EntityStore>(
        &self,
        store: &mut S,
        aliquots: &[DerivedAliquot],
        run_types: &BTreeMap<Quadrant, String>,
    ) -> Result<PoolAssembly> {
        let mut by_quadrant = aliquots.iter().into_group_map_by(|a| a.quadrant);
        let mut assembly = PoolAssembly::default();

        if let Some(unmapped) = by_quadrant.remove(&Quadrant::Unmapped) {
            let error = PoolErrors::UnmappedAliquots {
                count: unmapped.len(),
                sample_ids: unmapped.iter().map(|a| a.sample_id.clone()).collect(),
            };
            warn!("{error}");
            assembly.failures.push(QuadrantFailure {
                quadrant: Quadrant::Unmapped,
                error,
            });
        }

        for quadrant in Quadrant::MAPPED {
            let Some(members) = by_quadrant.get(&quadrant) else {
                continue;
            };
            let request_ids: Vec<String> = members
                .iter()
                .filter_map(|a| a.request_id.as_deref())
                .unique()
                .map(String::from)
                .collect();
            if request_ids.is_empty() {
                let error = PoolErrors::NoRequestIds { quadrant };
                warn!("{error}");
                assembly.failures.push(QuadrantFailure { quadrant, error });
                continue;
            }
            let run_type = run_types.get(&quadrant).cloned().unwrap_or_default();
            let pool = self.create_pool(store, quadrant, members, request_ids, run_type)?;
            info!(
                "created pool {} with {} aliquots from quadrant {}",
                pool.pool_id, pool.member_count, quadrant
            );
            assembly.pools.push(pool);
        }
        Ok(assembly)
    }

    fn create_pool<S: EntityStore>(
        &self,
        store: &mut S,
        quadrant: Quadrant,
        members: &[&DerivedAliquot],
        request_ids: Vec<String>,
        run_type: String,
    ) -> Result<CreatedPool> {
        let joined = request_ids.join("_");
        let pool_id = allocate_pool_id(&*store, &joined, quadrant);

        let mut attrs = fields([
            (SAMPLE_ID, FieldValue::from(pool_id.as_str())),
            (OTHER_SAMPLE_ID, pool_id.as_str().into()),
            (REQUEST_ID, joined.as_str().into()),
            (IS_POOL, true.into()),
            (EXEMPLAR_SAMPLE_TYPE, POOLED_LIBRARY.into()),
            (CHIP_QUADRANT, u32::from(quadrant.number()).into()),
        ]);
        // Recipe and species describe the library, so controls are not consulted.
        if let Some(first) = members.iter().find(|a| !a.is_control()) {
            for name in [RECIPE, SPECIES] {
                if let Some(value) = store.text(first.handle, name) {
                    attrs.insert(name.to_string(), value.into());
                }
            }
        }

        let handle = store.create(DataType::Sample, attrs)?;
        for member in members {
            store.add_child(handle, member.handle)?;
        }

        let requested_reads = members.len() as f64 * self.reads_per_aliquot;
        let requirement = store.create(
            DataType::SeqRequirement,
            fields([
                (SEQUENCING_RUN_TYPE, FieldValue::from(run_type.as_str())),
                (REQUESTED_READS, requested_reads.into()),
            ]),
        )?;
        store.add_child(handle, requirement)?;

        Ok(CreatedPool {
            handle,
            pool_id,
            quadrant,
            member_count: members.len(),
            request_ids,
            run_type,
            requested_reads,
        })
    }
}
