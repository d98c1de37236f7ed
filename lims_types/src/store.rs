//! The entity store collaborator: record creation, attribute access and the
//! parent/child graph, plus an in-memory implementation that round-trips
//! through a JSON snapshot.

use crate::constants::SAMPLE_ID;
use crate::record::{DataType, FieldValue, Fields, Record, RecordHandle};
use fxhash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreErrors {
    #[error("Record {handle} does not exist in the LIMS store.")]
    UnknownRecord { handle: RecordHandle },

    #[error("Record {handle} appears more than once in the LIMS snapshot.")]
    DuplicateRecord { handle: RecordHandle },

    #[error("Cannot link record {handle} to itself.")]
    SelfLink { handle: RecordHandle },

    #[error("Record {handle} is past the last handle the LIMS store can assign.")]
    HandlesExhausted { handle: RecordHandle },
}

/// Synchronous key/attribute store with parent/child links between records.
///
/// Implementors provide the primitive operations; the graph traversals are
/// derived from `parents` and `children`.
pub trait EntityStore {
    fn record(&self, handle: RecordHandle) -> Option<&Record>;

    /// Create a record and return its handle.
    fn create(&mut self, data_type: DataType, fields: Fields) -> Result<RecordHandle, StoreErrors>;

    fn set_field(
        &mut self,
        handle: RecordHandle,
        name: &str,
        value: FieldValue,
    ) -> Result<(), StoreErrors>;

    /// Link `child` under `parent`. Linking an existing pair again is a no-op.
    fn add_child(&mut self, parent: RecordHandle, child: RecordHandle) -> Result<(), StoreErrors>;

    fn parents(&self, handle: RecordHandle) -> &[RecordHandle];

    fn children(&self, handle: RecordHandle) -> &[RecordHandle];

    /// Handles of every record of `data_type` matching `predicate`, in creation order.
    fn query(&self, data_type: DataType, predicate: &dyn Fn(&Record) -> bool)
        -> Vec<RecordHandle>;

    fn exists(&self, data_type: DataType, predicate: &dyn Fn(&Record) -> bool) -> bool {
        !self.query(data_type, predicate).is_empty()
    }

    /// Trimmed, non-empty text attribute of a record.
    fn text(&self, handle: RecordHandle, name: &str) -> Option<&str> {
        self.record(handle).and_then(|r| r.text(name))
    }

    fn children_of_type(&self, handle: RecordHandle, data_type: DataType) -> Vec<RecordHandle> {
        self.children(handle)
            .iter()
            .copied()
            .filter(|&c| self.record(c).is_some_and(|r| r.data_type == data_type))
            .collect()
    }

    fn parents_of_type(&self, handle: RecordHandle, data_type: DataType) -> Vec<RecordHandle> {
        self.parents(handle)
            .iter()
            .copied()
            .filter(|&p| self.record(p).is_some_and(|r| r.data_type == data_type))
            .collect()
    }

    /// All ancestors of `start`, nearest first. Each record is visited once,
    /// so graphs where a record is reachable along several paths are fine.
    fn ancestors(&self, start: RecordHandle) -> Vec<RecordHandle> {
        walk(start, |h| self.parents(h))
    }

    /// All descendants of `start`, nearest first.
    fn descendants(&self, start: RecordHandle) -> Vec<RecordHandle> {
        walk(start, |h| self.children(h))
    }

    /// The nearest of `start` and its ancestors that carries a non-empty `name` attribute.
    fn nearest_ancestor_with_field(&self, start: RecordHandle, name: &str) -> Option<RecordHandle> {
        std::iter::once(start)
            .chain(self.ancestors(start))
            .find(|&h| self.text(h, name).is_some())
    }

    /// The sample record with the given identifier, if any.
    fn find_sample(&self, sample_id: &str) -> Option<RecordHandle> {
        self.query(DataType::Sample, &|r| r.sample_id() == Some(sample_id))
            .into_iter()
            .next()
    }

    fn sample_id_exists(&self, sample_id: &str) -> bool {
        self.find_sample(sample_id).is_some()
    }
}

/// Breadth-first worklist over `next`, excluding `start`.
fn walk<'a, F>(start: RecordHandle, next: F) -> Vec<RecordHandle>
where
    F: Fn(RecordHandle) -> &'a [RecordHandle],
{
    let mut visited = FxHashSet::default();
    visited.insert(start);
    let mut queue: VecDeque<_> = next(start).iter().copied().collect();
    let mut order = Vec::new();
    while let Some(h) = queue.pop_front() {
        if !visited.insert(h) {
            continue;
        }
        order.push(h);
        queue.extend(next(h).iter().copied().filter(|n| !visited.contains(n)));
    }
    order
}

/// Parent/child link as stored in a snapshot.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct Link {
    pub parent: RecordHandle,
    pub child: RecordHandle,
}

/// Serialized form of a `MemoryStore`.
#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// An entity store held in memory, loaded from and saved to a JSON snapshot.
#[derive(Serialize, Deserialize, Clone, Default, Debug)]
#[serde(try_from = "StoreSnapshot", into = "StoreSnapshot")]
pub struct MemoryStore {
    records: Vec<Record>,
    positions: FxHashMap<RecordHandle, usize>,
    parents: FxHashMap<RecordHandle, Vec<RecordHandle>>,
    children: FxHashMap<RecordHandle, Vec<RecordHandle>>,
    links: Vec<Link>,
    next_handle: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in creation order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Convenience for seeding: create a sample with the given id and attributes.
    pub fn add_sample(
        &mut self,
        sample_id: &str,
        mut fields: Fields,
    ) -> Result<RecordHandle, StoreErrors> {
        fields.insert(SAMPLE_ID.to_string(), FieldValue::from(sample_id));
        self.create(DataType::Sample, fields)
    }

    fn check(&self, handle: RecordHandle) -> Result<(), StoreErrors> {
        if self.positions.contains_key(&handle) {
            Ok(())
        } else {
            Err(StoreErrors::UnknownRecord { handle })
        }
    }
}

impl TryFrom<StoreSnapshot> for MemoryStore {
    type Error = StoreErrors;

    fn try_from(snapshot: StoreSnapshot) -> Result<Self, Self::Error> {
        let mut store = MemoryStore::new();
        for record in snapshot.records {
            let handle = record.handle;
            if store.positions.insert(handle, store.records.len()).is_some() {
                return Err(StoreErrors::DuplicateRecord { handle });
            }
            let next = handle
                .0
                .checked_add(1)
                .ok_or(StoreErrors::HandlesExhausted { handle })?;
            store.next_handle = store.next_handle.max(next);
            store.records.push(record);
        }
        for link in snapshot.links {
            store.add_child(link.parent, link.child)?;
        }
        Ok(store)
    }
}

impl From<MemoryStore> for StoreSnapshot {
    fn from(store: MemoryStore) -> Self {
        StoreSnapshot {
            records: store.records,
            links: store.links,
        }
    }
}

impl EntityStore for MemoryStore {
    fn record(&self, handle: RecordHandle) -> Option<&Record> {
        self.positions.get(&handle).map(|&i| &self.records[i])
    }

    fn create(&mut self, data_type: DataType, fields: Fields) -> Result<RecordHandle, StoreErrors> {
        let handle = RecordHandle(self.next_handle);
        // u64::MAX is never assigned, so the successor always exists
        self.next_handle = self
            .next_handle
            .checked_add(1)
            .ok_or(StoreErrors::HandlesExhausted { handle })?;
        self.positions.insert(handle, self.records.len());
        self.records.push(Record {
            handle,
            data_type,
            fields,
        });
        Ok(handle)
    }

    fn set_field(
        &mut self,
        handle: RecordHandle,
        name: &str,
        value: FieldValue,
    ) -> Result<(), StoreErrors> {
        let &i = self
            .positions
            .get(&handle)
            .ok_or(StoreErrors::UnknownRecord { handle })?;
        self.records[i].fields.insert(name.to_string(), value);
        Ok(())
    }

    fn add_child(&mut self, parent: RecordHandle, child: RecordHandle) -> Result<(), StoreErrors> {
        self.check(parent)?;
        self.check(child)?;
        if parent == child {
            return Err(StoreErrors::SelfLink { handle: parent });
        }
        let siblings = self.children.entry(parent).or_default();
        if siblings.contains(&child) {
            return Ok(());
        }
        siblings.push(child);
        self.parents.entry(child).or_default().push(parent);
        self.links.push(Link { parent, child });
        Ok(())
    }

    fn parents(&self, handle: RecordHandle) -> &[RecordHandle] {
        self.parents
            .get(&handle)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn children(&self, handle: RecordHandle) -> &[RecordHandle] {
        self.children
            .get(&handle)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn query(
        &self,
        data_type: DataType,
        predicate: &dyn Fn(&Record) -> bool,
    ) -> Vec<RecordHandle> {
        self.records
            .iter()
            .filter(|r| r.data_type == data_type && predicate(r))
            .map(|r| r.handle)
            .collect()
    }
}
