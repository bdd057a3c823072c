// Multi-index in-memory task store

use crate::ordering::{Attribute, IndexKey};
use crate::query::QueryEngine;
use crate::record::{Flag, IdAllocator, Priority, TaskId, TaskRecord};
use eyre::{Result, eyre};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Task records kept in one sorted index per `Attribute`.
///
/// Every index holds exactly one key per live record. All mutation goes
/// through `add`, `remove`, `replace`, `load` and `renumber`, which update
/// the record table and every index together.
#[derive(Debug)]
pub struct TaskIndex {
    records: BTreeMap<TaskId, TaskRecord>,
    indexes: Vec<BTreeSet<IndexKey>>,
    len: usize,
    ids: IdAllocator,
}

impl Default for TaskIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskIndex {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_allocator(IdAllocator::new())
    }

    /// Create an empty store that mints ids from `ids`
    pub fn with_allocator(ids: IdAllocator) -> Self {
        Self {
            records: BTreeMap::new(),
            indexes: Attribute::ALL.iter().map(|_| BTreeSet::new()).collect(),
            len: 0,
            ids,
        }
    }

    /// Number of live records
    pub fn size(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.records.contains_key(&id)
    }

    /// Copy of the live record with this id
    pub fn get(&self, id: TaskId) -> Option<TaskRecord> {
        self.records.get(&id).cloned()
    }

    /// Id the next created record will receive
    pub fn next_id(&self) -> TaskId {
        self.ids.peek()
    }

    /// Read access to the orderings
    pub fn query(&self) -> QueryEngine<'_> {
        QueryEngine::new(self)
    }

    pub(crate) fn index(&self, attribute: Attribute) -> &BTreeSet<IndexKey> {
        &self.indexes[attribute.slot()]
    }

    pub(crate) fn record(&self, id: TaskId) -> Option<&TaskRecord> {
        self.records.get(&id)
    }

    pub(crate) fn records(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.values()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Mint a new record with the next id and add it
    pub fn create(
        &mut self,
        name: impl Into<String>,
        start_time: i64,
        end_time: i64,
        flag: Flag,
        priority: Priority,
    ) -> Result<TaskRecord> {
        let id = self.ids.allocate()?;
        let record = TaskRecord::new(id, name, start_time, end_time, flag, priority);
        self.insert_unchecked(record.clone());
        Ok(record)
    }

    /// Add a fully formed record to every index.
    ///
    /// The allocator is moved past the record's id so it is never minted again.
    /// Fails, leaving the store untouched, if a live record already has that id
    /// or the id is the reserved `TaskId::MAX`.
    pub fn add(&mut self, record: TaskRecord) -> Result<()> {
        Self::validate_id(record.id())?;
        if self.records.contains_key(&record.id()) {
            return Err(eyre!("Task id {} is already in use", record.id()));
        }
        self.insert_unchecked(record);
        Ok(())
    }

    /// Remove the record matching `record` exactly (id and attributes).
    ///
    /// A record that is not live, or whose attributes differ from the live
    /// record with the same id, is left alone and `false` is returned.
    pub fn remove(&mut self, record: &TaskRecord) -> bool {
        match self.records.get(&record.id()) {
            Some(live) if live == record => {}
            _ => {
                warn!(id = %record.id(), "remove: no live record matches, nothing removed");
                return false;
            }
        }

        for attribute in Attribute::ALL {
            let removed = self.indexes[attribute.slot()].remove(&attribute.key(record));
            debug_assert!(removed, "{} index out of sync for id {}", attribute, record.id());
        }
        self.records.remove(&record.id());
        self.len -= 1;

        debug!(id = %record.id(), size = self.len, "remove: record removed");
        true
    }

    /// Remove `old`, then add `new`.
    ///
    /// `new` is positioned by its own attributes and keeps whatever id it
    /// carries. Returns whether `old` was removed; if `old` was not live, `new`
    /// is still added.
    ///
    /// Fails, leaving the store untouched, if `new` carries the id of a live
    /// record other than `old`.
    pub fn replace(&mut self, old: &TaskRecord, new: TaskRecord) -> Result<bool> {
        Self::validate_id(new.id())?;
        if let Some(live) = self.records.get(&new.id()) {
            if new.id() != old.id() || live != old {
                return Err(eyre!(
                    "Cannot replace task {} with task {}: id {} is already in use",
                    old.id(),
                    new.id(),
                    new.id()
                ));
            }
        }

        let removed = self.remove(old);
        self.insert_unchecked(new);
        Ok(removed)
    }

    /// Add a batch of records, e.g. everything read from disk.
    ///
    /// Ids must be unique within the batch and against live records; on any
    /// duplicate the whole batch is rejected and the store is unchanged.
    pub fn load<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = TaskRecord>,
    {
        let records: Vec<TaskRecord> = records.into_iter().collect();

        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            Self::validate_id(record.id())?;
            if !seen.insert(record.id()) {
                return Err(eyre!("Duplicate task id {} in loaded records", record.id()));
            }
            if self.records.contains_key(&record.id()) {
                return Err(eyre!(
                    "Loaded task id {} collides with a live task",
                    record.id()
                ));
            }
        }

        let count = records.len();
        for record in records {
            self.insert_unchecked(record);
        }

        info!(count, size = self.len, next_id = %self.ids.peek(), "Loaded tasks");
        Ok(count)
    }

    /// Reassign compact ids 0..n in current id order and reinsert every record.
    ///
    /// Returns the `(old, new)` id pairs. The allocator continues at n.
    pub fn renumber(&mut self) -> Vec<(TaskId, TaskId)> {
        let records = std::mem::take(&mut self.records);
        for index in &mut self.indexes {
            index.clear();
        }
        self.len = 0;
        self.ids.reset(0);

        let mut mapping = Vec::with_capacity(records.len());
        for (position, (old_id, record)) in records.into_iter().enumerate() {
            let new_id = TaskId(position as u64);
            mapping.push((old_id, new_id));
            self.insert_unchecked(record.with_id(new_id));
        }

        info!(count = mapping.len(), "Renumbered tasks");
        mapping
    }

    /// Drop every record. The allocator keeps counting.
    pub fn clear(&mut self) {
        self.records.clear();
        for index in &mut self.indexes {
            index.clear();
        }
        self.len = 0;
    }

    /// `TaskId::MAX` is the upper range sentinel and never names a record
    fn validate_id(id: TaskId) -> Result<()> {
        if id == TaskId::MAX {
            return Err(eyre!("Task id {} is reserved", id));
        }
        Ok(())
    }

    fn insert_unchecked(&mut self, record: TaskRecord) {
        for attribute in Attribute::ALL {
            self.indexes[attribute.slot()].insert(attribute.key(&record));
        }
        self.ids.fast_forward_past(record.id());
        debug!(id = %record.id(), name = record.name(), "add: record indexed");
        self.records.insert(record.id(), record);
        self.len += 1;
    }

    // ========================================================================
    // Invariant checks
    // ========================================================================

    /// Verify every index holds exactly the live id set and the counter agrees
    pub fn check_consistency(&self) -> Result<()> {
        if self.len != self.records.len() {
            return Err(eyre!(
                "Size counter {} does not match record count {}",
                self.len,
                self.records.len()
            ));
        }

        for attribute in Attribute::ALL {
            let index = self.index(attribute);
            if index.len() != self.len {
                return Err(eyre!(
                    "{} index holds {} keys, expected {}",
                    attribute,
                    index.len(),
                    self.len
                ));
            }
            for key in index {
                match self.records.get(&key.id) {
                    Some(record) if attribute.key(record) == *key => {}
                    Some(_) => return Err(eyre!("{} index has a stale key for id {}", attribute, key.id)),
                    None => return Err(eyre!("{} index references missing id {}", attribute, key.id)),
                }
            }
        }

        if let Some(max) = self.records.keys().next_back() {
            if self.ids.peek() <= *max {
                return Err(eyre!("Allocator at {} would reissue id {}", self.ids.peek(), max));
            }
        }

        Ok(())
    }
}
