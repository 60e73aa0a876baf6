//! Row/Bitmap manager.
//!
//! Allocates the smallest non-negative row-ID not in use, tracks validity,
//! and answers `max_valid`/`is_empty`/`is_full` in O(log N) via a
//! hierarchical "word fully full" summary, one level per 64x step.
//!
//! Level 0 is the occupancy bitmap itself (one bit per row-ID). Level k+1
//! has one bit per level-k *word*, set iff that word equals `!0u64`
//! (fully occupied). Height grows on demand when a new top-level word
//! becomes fully occupied.

use crate::error::{Error, Result};
use crate::record::RowId;

const WORD_BITS: u64 = 64;

/// Hierarchical bitmap tracking row validity and the lowest free row-ID.
#[derive(Clone, Debug, Default)]
pub struct RowBitmap {
    /// `levels[0]` is occupancy; `levels[k]` for `k > 0` is the
    /// "word fully full" summary one level below.
    levels: Vec<Vec<u64>>,
    num_rows: usize,
    max_row_id: Option<RowId>,
}

impl RowBitmap {
    pub fn new() -> Self {
        Self {
            levels: vec![Vec::new()],
            num_rows: 0,
            max_row_id: None,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn max_row_id(&self) -> Option<RowId> {
        self.max_row_id
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// True iff the row-ID space is exhausted: every ID in `0..=RowId::MAX`
    /// is valid, so no further row can ever be allocated.
    pub fn is_full(&self) -> bool {
        self.max_row_id == Some(RowId::MAX) && self.is_dense_from_zero()
    }

    /// True iff every row-ID in `0..=max_row_id` is valid (no gaps from
    /// past invalidations). Used by the table-scan cursor's fast path.
    pub fn is_dense_from_zero(&self) -> bool {
        match self.max_row_id {
            None => true,
            Some(max) => self.num_rows as u64 == (max as u64) + 1,
        }
    }

    pub fn test(&self, row_id: RowId) -> bool {
        if row_id < 0 {
            return false;
        }
        let idx = row_id as u64;
        let word_idx = (idx / WORD_BITS) as usize;
        let Some(level0) = self.levels.first() else {
            return false;
        };
        match level0.get(word_idx) {
            Some(word) => (word & (1u64 << (idx % WORD_BITS))) != 0,
            None => false,
        }
    }

    /// Smallest non-negative row-ID not currently valid. O(log N).
    pub fn find_next_row_id(&self) -> RowId {
        let Some(max) = self.max_row_id else {
            return 0;
        };
        if self.is_dense_from_zero() {
            return max + 1;
        }
        // Descend from the top level: at each level take the
        // least-significant zero bit of the word at the current position,
        // narrowing toward level 0.
        let top = self.levels.len() - 1;
        let mut word_idx = 0usize;
        for level in (0..=top).rev() {
            let word = self.levels[level].get(word_idx).copied().unwrap_or(0);
            let bit = lowest_zero_bit(word);
            word_idx = word_idx * WORD_BITS as usize + bit as usize;
            if level == 0 {
                return word_idx as RowId;
            }
        }
        unreachable!()
    }

    /// Grow the bitmap (adding levels as needed) so that `row_id` is
    /// addressable. Sets no bits.
    pub fn reserve(&mut self, row_id: RowId) -> Result<()> {
        if row_id < 0 {
            return Err(Error::OutOfRange(format!("negative row id {row_id}")));
        }
        let idx = row_id as u64;
        let word_idx = (idx / WORD_BITS) as usize;
        self.ensure_level_capacity(0, word_idx);
        Ok(())
    }

    /// Set the bit for `row_id`, growing the bitmap as needed, and
    /// propagate "word fully full" upward, stopping at the first level
    /// whose word is not fully full after the set.
    pub fn validate(&mut self, row_id: RowId) -> Result<()> {
        if row_id < 0 {
            return Err(Error::OutOfRange(format!("negative row id {row_id}")));
        }
        self.reserve(row_id)?;
        let idx = row_id as u64;
        let mut word_idx = (idx / WORD_BITS) as usize;
        let mut bit = idx % WORD_BITS;

        let already_set = (self.levels[0][word_idx] & (1u64 << bit)) != 0;
        self.levels[0][word_idx] |= 1u64 << bit;
        if !already_set {
            self.num_rows += 1;
        }
        self.max_row_id = Some(self.max_row_id.map_or(row_id, |m| m.max(row_id)));

        let mut level = 0usize;
        loop {
            let full = self.levels[level][word_idx] == !0u64;
            if !full {
                break;
            }
            level += 1;
            let parent_word_idx = word_idx / WORD_BITS as usize;
            let parent_bit = (word_idx % WORD_BITS as usize) as u64;
            self.ensure_level_capacity(level, parent_word_idx);
            self.levels[level][parent_word_idx] |= 1u64 << parent_bit;
            word_idx = parent_word_idx;
            bit = parent_bit;
            let _ = bit;
        }
        Ok(())
    }

    /// Clear the bit for `row_id`. Propagates "word was fully full, now
    /// isn't" upward, stopping once the parent word was already not full.
    /// If `row_id` was `max_row_id`, rescans downward to find the new max.
    pub fn invalidate(&mut self, row_id: RowId) {
        if row_id < 0 {
            return;
        }
        let idx = row_id as u64;
        let mut word_idx = (idx / WORD_BITS) as usize;
        let bit = idx % WORD_BITS;

        if word_idx >= self.levels[0].len() {
            return;
        }
        let was_set = (self.levels[0][word_idx] & (1u64 << bit)) != 0;
        if !was_set {
            return;
        }
        let was_full = self.levels[0][word_idx] == !0u64;
        self.levels[0][word_idx] &= !(1u64 << bit);
        self.num_rows -= 1;

        if was_full {
            let mut level = 0usize;
            let mut child_word_idx = word_idx;
            loop {
                level += 1;
                if level >= self.levels.len() {
                    break;
                }
                let parent_word_idx = child_word_idx / WORD_BITS as usize;
                let parent_bit = (child_word_idx % WORD_BITS as usize) as u64;
                let parent_word = self.levels[level][parent_word_idx];
                let parent_was_full = parent_word == !0u64;
                self.levels[level][parent_word_idx] = parent_word & !(1u64 << parent_bit);
                if !parent_was_full {
                    break;
                }
                child_word_idx = parent_word_idx;
            }
        }
        word_idx = (idx / WORD_BITS) as usize;
        let _ = word_idx;

        if self.max_row_id == Some(row_id) {
            self.rescan_max_row_id();
        }
    }

    fn rescan_max_row_id(&mut self) {
        if self.num_rows == 0 {
            self.max_row_id = None;
            return;
        }
        for (word_idx, &word) in self.levels[0].iter().enumerate().rev() {
            if word != 0 {
                let bit = 63 - word.leading_zeros() as u64;
                self.max_row_id = Some((word_idx as u64 * WORD_BITS + bit) as RowId);
                return;
            }
        }
        self.max_row_id = None;
    }

    fn ensure_level_capacity(&mut self, level: usize, word_idx: usize) {
        while self.levels.len() <= level {
            self.levels.push(Vec::new());
        }
        let words = &mut self.levels[level];
        if words.len() <= word_idx {
            words.resize(word_idx + 1, 0);
        }
    }
}

fn lowest_zero_bit(word: u64) -> u32 {
    (!word).trailing_zeros()
}
