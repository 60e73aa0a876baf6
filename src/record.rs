//! Records and record arrays: the batch unit flowing through
//! Cursor -> Expression -> Sorter -> Merger.

use std::ops::{Deref, DerefMut};

/// Row-ID type: a stable, non-negative integer identifying a row within
/// one table for its lifetime. Negative values never denote a real row.
pub type RowId = i64;

/// The pipeline unit: a row-ID paired with a score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub row_id: RowId,
    pub score: f64,
}

impl Record {
    pub fn new(row_id: RowId, score: f64) -> Self {
        Self { row_id, score }
    }
}

/// A batch of records, the unit all pipeline stages read and write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordArray(Vec<Record>);

impl RecordArray {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self(Vec::with_capacity(cap))
    }

    pub fn from_vec(records: Vec<Record>) -> Self {
        Self(records)
    }

    pub fn into_vec(self) -> Vec<Record> {
        self.0
    }

    pub fn push(&mut self, record: Record) {
        self.0.push(record);
    }

    pub fn row_ids(&self) -> impl Iterator<Item = RowId> + '_ {
        self.0.iter().map(|r| r.row_id)
    }

    /// Split the batch into fixed-size chunks, the unit the expression
    /// engine evaluates in to bound scratch-buffer size.
    pub fn chunks(&self, block_size: usize) -> impl Iterator<Item = &[Record]> {
        self.0.chunks(block_size.max(1))
    }
}

impl Deref for RecordArray {
    type Target = [Record];
    fn deref(&self) -> &[Record] {
        &self.0
    }
}

impl DerefMut for RecordArray {
    fn deref_mut(&mut self) -> &mut [Record] {
        &mut self.0
    }
}

impl FromIterator<Record> for RecordArray {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for RecordArray {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordArray {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
