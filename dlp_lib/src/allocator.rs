//! Collision-free identifiers for aliquots, control samples and pools.
//!
//! Every allocation checks the live store, so identifiers created earlier in
//! the same run are never handed out again.

use crate::errors::DeriveErrors;
use dlp_chip::{ControlFamily, Quadrant};
use lims_types::constants::OTHER_SAMPLE_ID;
use lims_types::natural_order::natural_cmp;
use lims_types::{DataType, EntityStore};
use log::debug;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// True if `candidate` is taken, either as an identifier or as the stem of one.
fn base_is_taken(store: &impl EntityStore, candidate: &str) -> bool {
    let stem = format!("{candidate}_");
    store.exists(DataType::Sample, &|r| {
        r.sample_id()
            .is_some_and(|id| id == candidate || id.starts_with(&stem))
    })
}

/// The first `<sample_id>_<n>`, n from 1, that is neither an existing sample
/// id nor the stem of one. Aliquots of the sample are then numbered
/// `<base>_1`, `<base>_2`, ...
pub fn next_aliquot_base(store: &impl EntityStore, sample_id: &str) -> String {
    let base = (1u32..)
        .map(|n| format!("{sample_id}_{n}"))
        .find(|candidate| !base_is_taken(store, candidate))
        .unwrap_or_default();
    debug!("aliquots of {sample_id} will be numbered under {base}");
    base
}

/// Numeric suffix of a control identifier of the form `<stem>-<digits>`,
/// such as `DLPSaltCONTROL-12`.
fn control_suffix(stem: &str, sample_id: &str) -> Option<u32> {
    let digits = sample_id.strip_prefix(stem)?.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Per-family sequence of control sample identifiers, seeded from the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlCounters {
    counters: BTreeMap<ControlFamily, u32>,
}

impl ControlCounters {
    /// Seed each family with the highest suffix in use. Only samples whose
    /// identifier and secondary label both carry the family name count.
    pub fn load(store: &impl EntityStore) -> Self {
        let counters = ControlFamily::iter()
            .map(|family| {
                let name = family.sample_name();
                let existing = store.query(DataType::Sample, &|r| {
                    r.sample_id().is_some_and(|id| id.starts_with(name))
                        && r.text(OTHER_SAMPLE_ID).is_some_and(|alt| alt.starts_with(name))
                });
                let highest = existing
                    .into_iter()
                    .filter_map(|h| store.record(h).and_then(|r| r.sample_id()))
                    .filter(|id| control_suffix(name, id).is_some())
                    .max_by(|a, b| natural_cmp(a, b))
                    .and_then(|id| control_suffix(name, id))
                    .unwrap_or(0);
                debug!("{family} controls start after {highest}");
                (family, highest)
            })
            .collect();
        ControlCounters { counters }
    }

    /// Last number handed out (or seeded) for `family`.
    pub fn current(&self, family: ControlFamily) -> u32 {
        self.counters.get(&family).copied().unwrap_or(0)
    }

    /// Next free identifier of `family`.
    pub fn allocate(
        &mut self,
        store: &impl EntityStore,
        family: ControlFamily,
    ) -> Result<String, DeriveErrors> {
        let counter = self.counters.entry(family).or_insert(0);
        loop {
            *counter = counter
                .checked_add(1)
                .ok_or(DeriveErrors::ControlIdsExhausted { family })?;
            let id = format!("{}-{}", family.sample_name(), counter);
            if !store.sample_id_exists(&id) {
                debug!("allocated control {id}");
                return Ok(id);
            }
        }
    }
}

/// `Pool-<request ids>-Tube<quadrant>`, suffixed `_1`, `_2`, ... while taken.
pub fn allocate_pool_id(store: &impl EntityStore, request_ids: &str, quadrant: Quadrant) -> String {
    let base = format!("Pool-{request_ids}-Tube{quadrant}");
    let id = std::iter::once(base.clone())
        .chain((1u32..).map(|n| format!("{base}_{n}")))
        .find(|candidate| !store.sample_id_exists(candidate))
        .unwrap_or(base);
    debug!("allocated pool {id}");
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use lims_types::constants::SAMPLE_ID;
    use lims_types::{fields, Fields, MemoryStore};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn control(store: &mut MemoryStore, id: &str) {
        store
            .add_sample(id, fields([(OTHER_SAMPLE_ID, id)]))
            .unwrap();
    }

    fn sample(store: &mut MemoryStore, id: &str) {
        store.add_sample(id, Fields::new()).unwrap();
    }

    #[test]
    fn test_next_aliquot_base() {
        let mut store = MemoryStore::new();
        sample(&mut store, "SAMPLE");
        assert_eq!(next_aliquot_base(&store, "SAMPLE"), "SAMPLE_1");

        sample(&mut store, "SAMPLE_1");
        assert_eq!(next_aliquot_base(&store, "SAMPLE"), "SAMPLE_2");

        // SAMPLE_2 is only present as the stem of an aliquot
        sample(&mut store, "SAMPLE_2_1");
        assert_eq!(next_aliquot_base(&store, "SAMPLE"), "SAMPLE_3");

        // not a stem: SAMPLE_30 does not start with SAMPLE_3_
        sample(&mut store, "SAMPLE_30");
        assert_eq!(next_aliquot_base(&store, "SAMPLE"), "SAMPLE_3");
    }

    #[test]
    fn test_control_counters_use_natural_order() -> Result<(), DeriveErrors> {
        let mut store = MemoryStore::new();
        control(&mut store, "DLPNegativeCONTROL-9");
        control(&mut store, "DLPNegativeCONTROL-10");
        control(&mut store, "DLPNegativeCONTROL-2");
        // secondary label does not match the family: ignored
        store
            .add_sample("DLPSaltCONTROL-40", fields([(OTHER_SAMPLE_ID, "salt")]))
            .unwrap();
        control(&mut store, "DLPSaltCONTROL-3");

        let mut counters = ControlCounters::load(&store);
        assert_eq!(counters.current(ControlFamily::Negative), 10);
        assert_eq!(counters.current(ControlFamily::Salt), 3);
        assert_eq!(counters.current(ControlFamily::Germline), 0);

        assert_eq!(
            counters.allocate(&store, ControlFamily::Negative)?,
            "DLPNegativeCONTROL-11"
        );
        assert_eq!(
            counters.allocate(&store, ControlFamily::Germline)?,
            "DLPGermlineCONTROL-1"
        );
        assert_eq!(counters.current(ControlFamily::Germline), 1);
        Ok(())
    }

    #[test]
    fn test_control_seed_ignores_malformed_suffixes() -> Result<(), DeriveErrors> {
        let mut store = MemoryStore::new();
        control(&mut store, "DLPNegativeCONTROL-10");
        // `_` sorts above `-`, but neither id is <stem>-<digits>
        control(&mut store, "DLPNegativeCONTROL_old-3");
        control(&mut store, "DLPNegativeCONTROL-12b");
        control(&mut store, "DLPNegativeCONTROL-");

        let mut counters = ControlCounters::load(&store);
        assert_eq!(counters.current(ControlFamily::Negative), 10);
        assert_eq!(
            counters.allocate(&store, ControlFamily::Negative)?,
            "DLPNegativeCONTROL-11"
        );
        Ok(())
    }

    #[test]
    fn test_control_counter_exhaustion_is_an_error() {
        let mut store = MemoryStore::new();
        control(&mut store, &format!("DLPNegativeCONTROL-{}", u32::MAX));

        let mut counters = ControlCounters::load(&store);
        assert_eq!(counters.current(ControlFamily::Negative), u32::MAX);
        assert_eq!(
            counters.allocate(&store, ControlFamily::Negative),
            Err(DeriveErrors::ControlIdsExhausted {
                family: ControlFamily::Negative
            })
        );
        // the other families are unaffected
        assert_eq!(
            counters.allocate(&store, ControlFamily::Salt),
            Ok("DLPSaltCONTROL-1".to_string())
        );
    }

    #[test]
    fn test_control_allocation_skips_taken_ids() -> Result<(), DeriveErrors> {
        let mut store = MemoryStore::new();
        control(&mut store, "DLPSaltCONTROL-1");
        // taken, but invisible to the counter seed
        sample(&mut store, "DLPSaltCONTROL-2");
        let mut counters = ControlCounters::load(&store);
        assert_eq!(
            counters.allocate(&store, ControlFamily::Salt)?,
            "DLPSaltCONTROL-3"
        );
        Ok(())
    }

    #[test]
    fn test_allocate_pool_id() {
        let mut store = MemoryStore::new();
        assert_eq!(
            allocate_pool_id(&store, "100_101", Quadrant::Second),
            "Pool-100_101-Tube2"
        );
        sample(&mut store, "Pool-100_101-Tube2");
        sample(&mut store, "Pool-100_101-Tube2_1");
        assert_eq!(
            allocate_pool_id(&store, "100_101", Quadrant::Second),
            "Pool-100_101-Tube2_2"
        );
    }

    proptest! {
        #[test]
        fn prop_allocated_ids_are_fresh(
            taken in proptest::collection::vec(1u32..30, 0..20),
            seeded in proptest::collection::vec(1u32..30, 0..5),
        ) {
            let mut store = MemoryStore::new();
            for n in &taken {
                sample(&mut store, &format!("DLPGermlineCONTROL-{n}"));
                sample(&mut store, &format!("S_{n}"));
            }
            for n in &seeded {
                control(&mut store, &format!("DLPGermlineCONTROL-{n}"));
            }
            let mut counters = ControlCounters::load(&store);
            for _ in 0..5 {
                let id = counters.allocate(&store, ControlFamily::Germline).unwrap();
                prop_assert!(!store.sample_id_exists(&id));
                sample(&mut store, &id);
            }
            let base = next_aliquot_base(&store, "S");
            prop_assert!(!store.exists(DataType::Sample, &|r| {
                r.text(SAMPLE_ID).is_some_and(|id| id == base || id.starts_with(&format!("{base}_")))
            }));
        }
    }
}
