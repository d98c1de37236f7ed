use crate::errors::DeriveErrors;
use dlp_chip::{ChipSpot, IndexKey};
use fxhash::FxHashMap;
use lims_types::constants::{INDEX_ID, INDEX_TAG};
use lims_types::{DataType, EntityStore};
use log::{info, warn};

/// An index barcode pair registered for one chip position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredIndex {
    pub index_id: String,
    pub index_tag: String,
}

/// Table of registered index barcode pairs, keyed by position-derived index key.
#[derive(Debug, Clone, Default)]
pub struct IndexAssigner {
    by_key: FxHashMap<String, RegisteredIndex>,
}

impl IndexAssigner {
    /// Read every `IndexAssignment` record of the store. When a key is
    /// registered twice the first registration is kept.
    pub fn load(store: &impl EntityStore) -> Self {
        let mut by_key = FxHashMap::default();
        for handle in store.query(DataType::IndexAssignment, &|_| true) {
            let Some(index_id) = store.text(handle, INDEX_ID) else {
                warn!("index assignment {handle} has no {INDEX_ID}, ignoring it");
                continue;
            };
            let registered = RegisteredIndex {
                index_id: index_id.to_string(),
                index_tag: store.text(handle, INDEX_TAG).unwrap_or_default().to_string(),
            };
            if by_key.contains_key(index_id) {
                warn!("index {index_id} is registered more than once, keeping the first");
            } else {
                by_key.insert(index_id.to_string(), registered);
            }
        }
        info!("loaded {} registered index barcode pairs", by_key.len());
        IndexAssigner { by_key }
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn get(&self, key: &IndexKey) -> Option<&RegisteredIndex> {
        self.by_key.get(key.as_str())
    }

    /// The pair registered for a spot. A miss fails only that spot.
    pub fn assign(&self, key: &IndexKey, spot: &ChipSpot) -> Result<&RegisteredIndex, DeriveErrors> {
        self.get(key).ok_or_else(|| DeriveErrors::IndexNotRegistered {
            key: key.to_string(),
            sample_id: spot.sample_id.clone(),
            row: spot.row,
            column: spot.column,
        })
    }
}
