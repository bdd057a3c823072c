// Read-side queries over the store's orderings

use crate::ordering::{Attribute, IndexKey, KeyValue};
use crate::record::{Flag, Priority, TaskRecord};
use crate::store::TaskIndex;
use std::collections::btree_set;
use std::ops::Bound;

/// Queries against a `TaskIndex`.
///
/// Every result is a copy; the borrow on the store keeps it from being
/// mutated while a query or dump is in progress.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    store: &'a TaskIndex,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a TaskIndex) -> Self {
        Self { store }
    }

    /// Records whose name contains `term`, in name order.
    ///
    /// A term without uppercase ASCII letters matches case-insensitively;
    /// any uppercase letter makes the match case-sensitive.
    pub fn search_name(&self, term: &str) -> Vec<TaskRecord> {
        let case_insensitive = !term.chars().any(|c| c.is_ascii_uppercase());

        self.sorted_dump(Attribute::Name)
            .filter(|task| {
                if case_insensitive {
                    task.name().to_lowercase().contains(term)
                } else {
                    task.name().contains(term)
                }
            })
            .collect()
    }

    /// Records whose `attribute` value lies in `[lower, upper)`, in that ordering.
    ///
    /// `lower > upper` yields nothing, as do bounds of different kinds (one
    /// integer, one text) or of the wrong kind for the ordering.
    pub fn range(
        &self,
        attribute: Attribute,
        lower: impl Into<KeyValue>,
        upper: impl Into<KeyValue>,
    ) -> Vec<TaskRecord> {
        let lower = lower.into();
        let upper = upper.into();
        if std::mem::discriminant(&lower) != std::mem::discriminant(&upper) || lower > upper {
            return Vec::new();
        }

        let bounds = (
            Bound::Included(IndexKey::lower_sentinel(lower)),
            Bound::Excluded(IndexKey::lower_sentinel(upper)),
        );
        self.collect(self.store.index(attribute).range(bounds))
    }

    /// Records whose `attribute` value equals `value`, in id order
    pub fn exact(&self, attribute: Attribute, value: impl Into<KeyValue>) -> Vec<TaskRecord> {
        let value = value.into();
        let bounds = (
            Bound::Included(IndexKey::lower_sentinel(value.clone())),
            Bound::Included(IndexKey::upper_sentinel(value)),
        );
        self.collect(self.store.index(attribute).range(bounds))
    }

    /// Records with `start_time` in `[lower, upper)`
    pub fn query_start_time(&self, lower: i64, upper: i64) -> Vec<TaskRecord> {
        self.range(Attribute::StartTime, lower, upper)
    }

    /// Records with `end_time` in `[lower, upper)`
    pub fn query_end_time(&self, lower: i64, upper: i64) -> Vec<TaskRecord> {
        self.range(Attribute::EndTime, lower, upper)
    }

    /// Records whose start (or end, when no start is set) lies in `[lower, upper)`
    pub fn query_time(&self, lower: i64, upper: i64) -> Vec<TaskRecord> {
        self.range(Attribute::Time, lower, upper)
    }

    pub fn search_flag(&self, flag: Flag) -> Vec<TaskRecord> {
        self.exact(Attribute::Flag, flag)
    }

    pub fn search_priority(&self, priority: Priority) -> Vec<TaskRecord> {
        self.exact(Attribute::Priority, priority)
    }

    /// Every record, lazily, in the order of `attribute`
    pub fn sorted_dump(&self, attribute: Attribute) -> SortedDump<'a> {
        SortedDump {
            store: self.store,
            keys: self.store.index(attribute).iter(),
        }
    }

    /// Every record in id (creation) order
    pub fn all(&self) -> Vec<TaskRecord> {
        self.store.records().cloned().collect()
    }

    fn collect<'k>(&self, keys: impl Iterator<Item = &'k IndexKey>) -> Vec<TaskRecord> {
        keys.filter_map(|key| self.store.record(key.id).cloned()).collect()
    }
}

/// Iterator over every record in one ordering, yielding copies
#[derive(Debug, Clone)]
pub struct SortedDump<'a> {
    store: &'a TaskIndex,
    keys: btree_set::Iter<'a, IndexKey>,
}

impl Iterator for SortedDump<'_> {
    type Item = TaskRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.keys.next()?;
        self.store.record(key.id).cloned()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl DoubleEndedIterator for SortedDump<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let key = self.keys.next_back()?;
        self.store.record(key.id).cloned()
    }
}

impl ExactSizeIterator for SortedDump<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TaskId;

    fn ids(records: &[TaskRecord]) -> Vec<u64> {
        records.iter().map(|r| r.id().0).collect()
    }

    fn store_with_starts(starts: &[i64]) -> TaskIndex {
        let mut store = TaskIndex::new();
        for (i, start) in starts.iter().enumerate() {
            store.create(format!("task {}", i), *start, 0, Flag::Pending, Priority::Normal).unwrap();
        }
        store
    }

    #[test]
    fn test_range_is_upper_exclusive() {
        let store = store_with_starts(&[10, 20, 20, 30]);
        let result = store.query().query_start_time(20, 30);

        assert_eq!(ids(&result), vec![1, 2]);
        assert!(result.iter().all(|r| r.start_time() == 20));
    }

    #[test]
    fn test_range_includes_lower_bound_with_id_zero() {
        let store = store_with_starts(&[10, 20]);
        assert_eq!(ids(&store.query().query_start_time(10, 11)), vec![0]);
    }

    #[test]
    fn test_range_malformed_bounds_is_empty() {
        let store = store_with_starts(&[10, 20, 30]);
        assert!(store.query().query_start_time(30, 10).is_empty());
        assert!(store.query().query_start_time(20, 20).is_empty());
    }

    #[test]
    fn test_range_wrong_kind_is_empty() {
        let store = store_with_starts(&[10, 20]);
        assert!(store.query().range(Attribute::StartTime, "a", "z").is_empty());
        assert!(store.query().range(Attribute::Name, 0i64, 100i64).is_empty());

        // Mixed bounds would otherwise span every integer key
        assert!(store.query().range(Attribute::StartTime, 10i64, "z").is_empty());
        assert!(store.query().range(Attribute::StartTime, i64::MIN, "").is_empty());
        assert!(store.query().range(Attribute::Name, 0i64, "zzz").is_empty());
    }

    #[test]
    fn test_range_over_names() {
        let mut store = TaskIndex::new();
        for name in ["apple", "banana", "blueberry", "cherry"] {
            store.create(name, 0, 0, Flag::Pending, Priority::Normal).unwrap();
        }

        let names: Vec<String> = store
            .query()
            .range(Attribute::Name, "b", "c")
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["banana", "blueberry"]);
    }

    #[test]
    fn test_query_end_time_and_time() {
        let mut store = TaskIndex::new();
        store.create("event", 100, 200, Flag::Pending, Priority::Normal).unwrap();
        store.create("deadline", 0, 150, Flag::Pending, Priority::Normal).unwrap();
        store.create("floating", 0, 0, Flag::Pending, Priority::Normal).unwrap();

        assert_eq!(ids(&store.query().query_end_time(150, 201)), vec![1, 0]);
        assert_eq!(ids(&store.query().query_time(100, 151)), vec![0, 1]);
        assert_eq!(ids(&store.query().query_end_time(0, 1)), vec![2]);
    }

    #[test]
    fn test_exact_match_on_flag() {
        let mut store = TaskIndex::new();
        store.create("a", 10, 0, Flag::Done, Priority::High).unwrap();
        store.create("b", 0, 5, Flag::Pending, Priority::Low).unwrap();
        store.create("c", 30, 40, Flag::Done, Priority::Low).unwrap();
        store.create("d", 0, 0, Flag::Pending, Priority::Normal).unwrap();

        let done = store.query().search_flag(Flag::Done);
        assert_eq!(ids(&done), vec![0, 2]);
        assert!(done.iter().all(|r| r.is_done()));

        assert_eq!(ids(&store.query().search_flag(Flag::Pending)), vec![1, 3]);
    }

    #[test]
    fn test_exact_match_on_priority() {
        let mut store = TaskIndex::new();
        store.create("a", 0, 0, Flag::Pending, Priority::Low).unwrap();
        store.create("b", 0, 0, Flag::Pending, Priority::High).unwrap();
        store.create("c", 0, 0, Flag::Done, Priority::Low).unwrap();

        assert_eq!(ids(&store.query().search_priority(Priority::Low)), vec![0, 2]);
        assert!(store.query().search_priority(Priority::Normal).is_empty());
    }

    #[test]
    fn test_exact_match_on_name() {
        let mut store = TaskIndex::new();
        store.create("dup", 0, 0, Flag::Pending, Priority::Normal).unwrap();
        store.create("other", 0, 0, Flag::Pending, Priority::Normal).unwrap();
        store.create("dup", 0, 0, Flag::Pending, Priority::Normal).unwrap();

        assert_eq!(ids(&store.query().exact(Attribute::Name, "dup")), vec![0, 2]);
    }

    #[test]
    fn test_search_name_case_policy() {
        let mut store = TaskIndex::new();
        store.create("ABCdef", 0, 0, Flag::Pending, Priority::Normal).unwrap();
        store.create("abcdef", 0, 0, Flag::Pending, Priority::Normal).unwrap();
        store.create("xyz", 0, 0, Flag::Pending, Priority::Normal).unwrap();

        let lower = store.query().search_name("abc");
        assert_eq!(ids(&lower), vec![0, 1]);

        let upper = store.query().search_name("ABC");
        assert_eq!(ids(&upper), vec![0]);
        assert!(upper.iter().all(|r| r.name() != "abcdef"));
    }

    #[test]
    fn test_search_name_results_in_name_order() {
        let mut store = TaskIndex::new();
        store.create("write tests", 0, 0, Flag::Pending, Priority::Normal).unwrap();
        store.create("review tests", 0, 0, Flag::Pending, Priority::Normal).unwrap();
        store.create("deploy", 0, 0, Flag::Pending, Priority::Normal).unwrap();

        let names: Vec<String> = store
            .query()
            .search_name("tests")
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["review tests", "write tests"]);
    }

    #[test]
    fn test_sorted_dump_breaks_ties_by_id() {
        let mut store = TaskIndex::new();
        store.add(TaskRecord::new(TaskId(5), "b", 0, 0, Flag::Pending, Priority::Normal)).unwrap();
        store.add(TaskRecord::new(TaskId(2), "b", 0, 0, Flag::Pending, Priority::Normal)).unwrap();
        store.add(TaskRecord::new(TaskId(9), "a", 0, 0, Flag::Pending, Priority::Normal)).unwrap();

        let dump: Vec<TaskRecord> = store.query().sorted_dump(Attribute::Name).collect();
        assert_eq!(ids(&dump), vec![9, 2, 5]);
    }

    #[test]
    fn test_sorted_dump_per_attribute() {
        let mut store = TaskIndex::new();
        store.create("c", 30, 5, Flag::Done, Priority::Low).unwrap();
        store.create("a", 10, 15, Flag::Pending, Priority::High).unwrap();
        store.create("b", 20, 10, Flag::Pending, Priority::Normal).unwrap();

        let q = store.query();
        let order = |attribute| ids(&q.sorted_dump(attribute).collect::<Vec<_>>());
        assert_eq!(order(Attribute::Name), vec![1, 2, 0]);
        assert_eq!(order(Attribute::StartTime), vec![1, 2, 0]);
        assert_eq!(order(Attribute::EndTime), vec![0, 2, 1]);
        assert_eq!(order(Attribute::Flag), vec![1, 2, 0]);
        assert_eq!(order(Attribute::Priority), vec![1, 2, 0]);
        assert_eq!(q.sorted_dump(Attribute::Name).len(), 3);
    }

    #[test]
    fn test_sorted_dump_is_a_fresh_snapshot_per_call() {
        let mut store = store_with_starts(&[3, 1, 2]);

        let first: Vec<TaskRecord> = store.query().sorted_dump(Attribute::StartTime).collect();
        let victim = first[0].clone();
        store.remove(&victim);
        let second: Vec<TaskRecord> = store.query().sorted_dump(Attribute::StartTime).collect();

        assert_eq!(first.len(), 3);
        assert_eq!(ids(&second), vec![2, 0]);
        let reversed: Vec<TaskRecord> = store.query().sorted_dump(Attribute::StartTime).rev().collect();
        assert_eq!(ids(&reversed), vec![0, 2]);
    }

    #[test]
    fn test_all_in_id_order() {
        let store = store_with_starts(&[30, 10, 20]);
        assert_eq!(ids(&store.query().all()), vec![0, 1, 2]);
    }

    #[test]
    fn test_queries_follow_replace() {
        let mut store = TaskIndex::new();
        let old = store.create("draft", 10, 0, Flag::Pending, Priority::Normal).unwrap();
        store.replace(&old, old.clone().with_flag(Flag::Done).with_start_time(50)).unwrap();

        assert!(store.query().search_flag(Flag::Pending).is_empty());
        assert_eq!(ids(&store.query().search_flag(Flag::Done)), vec![0]);
        assert!(store.query().query_start_time(0, 20).is_empty());
        assert_eq!(ids(&store.query().query_start_time(50, 51)), vec![0]);
    }
}
