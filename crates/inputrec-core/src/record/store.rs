//! [`RecordStore`]: the ordered collection of records produced by capture.
//!
//! # Lifecycle
//!
//! ```text
//! clear (session start) ──► push… (arrival order) ──► validate + sort_by_time ──► persist
//!                                                                │
//!                                        load replaces the store wholesale
//! ```
//!
//! During capture the store is in *arrival* order, not time order. Sorting
//! is a precondition of persistence and replay, never of capture.

use std::cmp::Ordering;

use super::model::Record;

/// An ordered sequence of [`Record`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from already-materialized records (e.g. after a load).
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Appends a record in arrival order.
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Drops every record with `valid == false`.
    ///
    /// Not reversible. Call once, immediately before persistence, never while
    /// capture is still appending.
    pub fn validate(&mut self) {
        self.records.retain(|r| r.valid);
    }

    /// Stable ascending sort by `time`.
    ///
    /// Uses `f64::total_cmp`, so a `NaN` time cannot break the sort; it
    /// simply sorts after every finite time.
    pub fn sort_by_time(&mut self) {
        self.records.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Returns the valid records in their current order without mutating the store.
    pub fn valid_records(&self) -> Vec<Record> {
        self.records.iter().filter(|r| r.valid).cloned().collect()
    }

    /// Returns a validated, time-sorted copy of the store.
    ///
    /// This is the form handed to persistence and to the replay engine.
    pub fn snapshot(&self) -> RecordStore {
        let mut copy = RecordStore::from_records(self.valid_records());
        copy.sort_by_time();
        copy
    }

    /// `true` when `time` is non-decreasing across the store.
    pub fn is_time_sorted(&self) -> bool {
        self.records
            .windows(2)
            .all(|w| w[0].time.total_cmp(&w[1].time) != Ordering::Greater)
    }
}

impl FromIterator<Record> for RecordStore {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::from_records(iter.into_iter().collect())
    }
}

impl IntoIterator for RecordStore {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
