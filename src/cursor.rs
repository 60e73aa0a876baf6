//! Cursors: bounded, forward-only iterators producing record batches.
//!
//! A `Cursor` captures a read position against a `Table` or `Index` at
//! construction time; structurally mutating that source during the
//! cursor's lifetime is a borrow-checker error here rather than a runtime
//! contract, which is the Rust-native rendering of "concurrent structural
//! mutation ... is not permitted".

use crate::bitmap::RowBitmap;
use crate::error::{Error, Result};
use crate::record::{Record, RecordArray, RowId};

/// Default batch size requested by `read` when the caller passes an
/// empty-capacity output array.
const DEFAULT_BATCH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Regular,
    Reverse,
}

#[derive(Debug, Clone, Copy)]
pub struct CursorOptions {
    pub offset: usize,
    pub limit: usize,
    pub order_type: OrderType,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: usize::MAX,
            order_type: OrderType::Regular,
        }
    }
}

impl CursorOptions {
    pub fn new(offset: usize, limit: usize, order_type: OrderType) -> Self {
        Self { offset, limit, order_type }
    }
}

/// Shared cursor behavior. `read` appends up to [`DEFAULT_BATCH`] records
/// to `out` and returns the count produced; `0` means exhausted, and
/// every later call keeps returning `0`.
pub trait Cursor {
    fn read(&mut self, out: &mut RecordArray) -> usize;

    fn read_all(&mut self, out: &mut RecordArray) {
        loop {
            let mut batch = RecordArray::with_capacity(DEFAULT_BATCH);
            let n = self.read(&mut batch);
            if n == 0 {
                break;
            }
            for record in batch.into_vec() {
                out.push(record);
            }
        }
    }
}

/// Table-scan cursor: emits `(row_id, 0.0)` in row-ID order (or reverse),
/// honoring offset/limit. Uses the dense fast path when the bitmap has no
/// invalidation gaps, emitting consecutive IDs without bit tests.
pub struct TableCursor<'a> {
    bitmap: &'a RowBitmap,
    options: CursorOptions,
    skipped: usize,
    emitted: usize,
    // Ascending: next candidate row-ID to examine.
    // Descending: next candidate row-ID to examine, counting down.
    cursor: Option<RowId>,
}

impl<'a> TableCursor<'a> {
    pub fn new(bitmap: &'a RowBitmap, options: CursorOptions) -> Self {
        let cursor = match options.order_type {
            OrderType::Regular => Some(0),
            OrderType::Reverse => bitmap.max_row_id(),
        };
        Self {
            bitmap,
            options,
            skipped: 0,
            emitted: 0,
            cursor,
        }
    }

    fn advance(&mut self) -> Option<RowId> {
        let dense = self.bitmap.is_dense_from_zero();
        loop {
            let candidate = self.cursor?;
            let max = self.bitmap.max_row_id()?;
            match self.options.order_type {
                OrderType::Regular => {
                    if candidate > max {
                        self.cursor = None;
                        return None;
                    }
                    self.cursor = Some(candidate + 1);
                }
                OrderType::Reverse => {
                    if candidate < 0 {
                        self.cursor = None;
                        return None;
                    }
                    self.cursor = candidate.checked_sub(1);
                }
            }
            if dense || self.bitmap.test(candidate) {
                return Some(candidate);
            }
        }
    }
}

impl<'a> Cursor for TableCursor<'a> {
    fn read(&mut self, out: &mut RecordArray) -> usize {
        let mut produced = 0;
        while produced < DEFAULT_BATCH && self.emitted < self.options.limit {
            let Some(row_id) = self.advance() else { break };
            if self.skipped < self.options.offset {
                self.skipped += 1;
                continue;
            }
            out.push(Record::new(row_id, 0.0));
            produced += 1;
            self.emitted += 1;
        }
        produced
    }
}

/// A materialized list of row-IDs (from an index lookup) wrapped as a
/// cursor, scores fixed at `0.0`. `offset`/`limit` apply after the
/// direction is resolved.
pub struct IdsCursor {
    row_ids: Vec<RowId>,
    pos: usize,
    options: CursorOptions,
    skipped: usize,
    emitted: usize,
}

impl IdsCursor {
    /// `row_ids` is assumed already in the source's natural ascending
    /// order; `OrderType::Reverse` walks it back to front.
    pub fn new(row_ids: Vec<RowId>, options: CursorOptions) -> Self {
        Self { row_ids, pos: 0, options, skipped: 0, emitted: 0 }
    }

    fn next_id(&mut self) -> Option<RowId> {
        if self.pos >= self.row_ids.len() {
            return None;
        }
        let idx = match self.options.order_type {
            OrderType::Regular => self.pos,
            OrderType::Reverse => self.row_ids.len() - 1 - self.pos,
        };
        self.pos += 1;
        Some(self.row_ids[idx])
    }
}

impl Cursor for IdsCursor {
    fn read(&mut self, out: &mut RecordArray) -> usize {
        let mut produced = 0;
        while produced < DEFAULT_BATCH && self.emitted < self.options.limit {
            let Some(row_id) = self.next_id() else { break };
            if self.skipped < self.options.offset {
                self.skipped += 1;
                continue;
            }
            out.push(Record::new(row_id, 0.0));
            produced += 1;
            self.emitted += 1;
        }
        produced
    }
}

/// `REVERSE_ORDER` has no meaningful semantics against an unordered hash
/// index; rejected rather than silently accepted (an open design choice
/// the original left to the implementer).
pub fn hash_cursor(row_ids: Vec<RowId>, options: CursorOptions) -> Result<IdsCursor> {
    if options.order_type == OrderType::Reverse {
        return Err(Error::InvalidOperation(
            "reverse order is not meaningful over an unordered hash index".to_string(),
        ));
    }
    Ok(IdsCursor::new(row_ids, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_cursor_dense_fast_path() {
        let mut bm = RowBitmap::new();
        for id in 0..5 {
            bm.validate(id).unwrap();
        }
        let mut cursor = TableCursor::new(&bm, CursorOptions::default());
        let mut out = RecordArray::new();
        cursor.read_all(&mut out);
        let ids: Vec<RowId> = out.row_ids().collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn table_cursor_skips_gaps() {
        let mut bm = RowBitmap::new();
        for id in 0..5 {
            bm.validate(id).unwrap();
        }
        bm.invalidate(2);
        let mut cursor = TableCursor::new(&bm, CursorOptions::default());
        let mut out = RecordArray::new();
        cursor.read_all(&mut out);
        let ids: Vec<RowId> = out.row_ids().collect();
        assert_eq!(ids, vec![0, 1, 3, 4]);
    }

    #[test]
    fn table_cursor_reverse_order() {
        let mut bm = RowBitmap::new();
        for id in 0..3 {
            bm.validate(id).unwrap();
        }
        let options = CursorOptions::new(0, usize::MAX, OrderType::Reverse);
        let mut cursor = TableCursor::new(&bm, options);
        let mut out = RecordArray::new();
        cursor.read_all(&mut out);
        let ids: Vec<RowId> = out.row_ids().collect();
        assert_eq!(ids, vec![2, 1, 0]);
    }

    #[test]
    fn table_cursor_offset_and_limit() {
        let mut bm = RowBitmap::new();
        for id in 0..10 {
            bm.validate(id).unwrap();
        }
        let options = CursorOptions::new(2, 3, OrderType::Regular);
        let mut cursor = TableCursor::new(&bm, options);
        let mut out = RecordArray::new();
        cursor.read_all(&mut out);
        let ids: Vec<RowId> = out.row_ids().collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn read_returns_zero_once_exhausted() {
        let bm = RowBitmap::new();
        let mut cursor = TableCursor::new(&bm, CursorOptions::default());
        let mut out = RecordArray::new();
        assert_eq!(cursor.read(&mut out), 0);
        assert_eq!(cursor.read(&mut out), 0);
    }

    #[test]
    fn hash_cursor_rejects_reverse() {
        let options = CursorOptions::new(0, usize::MAX, OrderType::Reverse);
        assert!(hash_cursor(vec![1, 2, 3], options).is_err());
    }

    #[test]
    fn ids_cursor_reverses_materialized_list() {
        let options = CursorOptions::new(0, usize::MAX, OrderType::Reverse);
        let mut cursor = IdsCursor::new(vec![1, 2, 3], options);
        let mut out = RecordArray::new();
        cursor.read_all(&mut out);
        let ids: Vec<RowId> = out.row_ids().collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
