//! Merger: combines two record streams by row-ID set algebra plus a score
//! combination rule, per spec §4.K.
//!
//! Time is `O(|A| + |B|)` and space `O(min(|A|, |B|))`: whichever input is
//! shorter is hashed into a `row_id -> score` map, then the longer input is
//! walked once, probing the hash for each row. Which side got hashed (an
//! implementation detail chosen purely for performance) is tracked
//! independently of which side is logically "A" versus "B", so e.g. MINUS
//! always computes `A.score - B.score` no matter which side was hashed.

use std::collections::HashMap;

use crate::record::{Record, RecordArray, RowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Xor,
    Minus,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOp {
    Plus,
    Minus,
    Multiplication,
    Left,
    Right,
    Zero,
}

#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    pub logical_op: LogicalOp,
    pub score_op: ScoreOp,
    /// Stands in for the absent side's score in `OR`/`XOR`/`MINUS`/
    /// `LEFT`/`RIGHT` when a row appears in only one input.
    pub missing_score: f64,
    pub offset: usize,
    pub limit: usize,
}

impl MergeOptions {
    pub fn new(logical_op: LogicalOp, score_op: ScoreOp) -> Self {
        Self {
            logical_op,
            score_op,
            missing_score: 0.0,
            offset: 0,
            limit: usize::MAX,
        }
    }

    pub fn with_missing_score(mut self, missing_score: f64) -> Self {
        self.missing_score = missing_score;
        self
    }

    pub fn with_offset_limit(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

fn combine_score(op: ScoreOp, a: f64, b: f64) -> f64 {
    match op {
        ScoreOp::Plus => a + b,
        ScoreOp::Minus => a - b,
        ScoreOp::Multiplication => a * b,
        ScoreOp::Left => a,
        ScoreOp::Right => b,
        ScoreOp::Zero => 0.0,
    }
}

/// Whether a `(in_a, in_b)` membership pair survives a given logical op.
/// When one side is absent its score is `missing_score`, not a literal
/// zero (see [`MergeOptions::missing_score`]).
fn emits(op: LogicalOp, in_a: bool, in_b: bool) -> bool {
    match op {
        LogicalOp::And => in_a && in_b,
        LogicalOp::Or => in_a || in_b,
        LogicalOp::Xor => in_a != in_b,
        LogicalOp::Minus => in_a && !in_b,
        LogicalOp::Left => in_a,
        LogicalOp::Right => in_b,
    }
}

pub struct Merger {
    options: MergeOptions,
}

impl Merger {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    /// Merge `a` and `b` in row-ID order (both inputs are assumed already
    /// sorted ascending by `row_id`, the natural order a cursor or sorter
    /// produces), per the configured logical and score operators.
    pub fn merge(&self, a: &RecordArray, b: &RecordArray) -> RecordArray {
        let op = self.options.logical_op;

        // Hash whichever side is smaller; `a_is_hashed` records which one,
        // independent of the logical A/B orientation.
        let a_is_hashed = a.len() <= b.len();
        let (hashed, scanned) = if a_is_hashed { (a, b) } else { (b, a) };

        let mut hash: HashMap<RowId, f64> = HashMap::with_capacity(hashed.len());
        for record in hashed.iter() {
            hash.insert(record.row_id, record.score);
        }

        let mut matched: std::collections::HashSet<RowId> =
            std::collections::HashSet::with_capacity(hashed.len());
        let mut out = Vec::new();

        let missing = self.options.missing_score;

        for scanned_record in scanned.iter() {
            let hashed_score = hash.get(&scanned_record.row_id).copied();
            let in_hashed = hashed_score.is_some();
            if in_hashed {
                matched.insert(scanned_record.row_id);
            }
            let (in_a, in_b, a_score, b_score) = if a_is_hashed {
                (in_hashed, true, hashed_score.unwrap_or(missing), scanned_record.score)
            } else {
                (true, in_hashed, scanned_record.score, hashed_score.unwrap_or(missing))
            };
            if emits(op, in_a, in_b) {
                let score = combine_score(self.options.score_op, a_score, b_score);
                out.push(Record::new(scanned_record.row_id, score));
            }
        }

        // Rows present only in the hashed side, in the hashed side's
        // original order (to keep output deterministic and row-ID
        // ascending, since both inputs are pre-sorted).
        for record in hashed.iter() {
            if matched.contains(&record.row_id) {
                continue;
            }
            let (in_a, in_b, a_score, b_score) = if a_is_hashed {
                (true, false, record.score, missing)
            } else {
                (false, true, missing, record.score)
            };
            if emits(op, in_a, in_b) {
                let score = combine_score(self.options.score_op, a_score, b_score);
                out.push(Record::new(record.row_id, score));
            }
        }

        out.sort_by_key(|r| r.row_id);
        self.apply_offset_limit(out.into_iter())
    }

    fn apply_offset_limit(&self, records: impl Iterator<Item = Record>) -> RecordArray {
        records
            .skip(self.options.offset)
            .take(self.options.limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(pairs: &[(i64, f64)]) -> RecordArray {
        pairs.iter().map(|&(id, score)| Record::new(id, score)).collect()
    }

    #[test]
    fn literal_scenario_5() {
        // A = {(1, 0.5), (2, 0.25)}; B = {(2, 1.0), (3, 0.75)}.
        let a = records(&[(1, 0.5), (2, 0.25)]);
        let b = records(&[(2, 1.0), (3, 0.75)]);

        let and_plus = Merger::new(MergeOptions::new(LogicalOp::And, ScoreOp::Plus));
        assert_eq!(and_plus.merge(&a, &b).into_vec(), vec![Record::new(2, 1.25)]);

        let or_plus = Merger::new(
            MergeOptions::new(LogicalOp::Or, ScoreOp::Plus).with_missing_score(0.0),
        );
        assert_eq!(
            or_plus.merge(&a, &b).into_vec(),
            vec![Record::new(1, 0.5), Record::new(2, 1.25), Record::new(3, 0.75)]
        );

        let minus = Merger::new(MergeOptions::new(LogicalOp::Minus, ScoreOp::Left));
        assert_eq!(minus.merge(&a, &b).into_vec(), vec![Record::new(1, 0.5)]);
    }

    #[test]
    fn literal_scenario_and_plus() {
        // A = {(1, 1.0), (2, 2.0), (3, 3.0)}, B = {(2, 10.0), (3, 20.0), (4, 40.0)}.
        let a = records(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        let b = records(&[(2, 10.0), (3, 20.0), (4, 40.0)]);

        let merger = Merger::new(MergeOptions::new(LogicalOp::And, ScoreOp::Plus));
        let result = merger.merge(&a, &b);
        assert_eq!(
            result.into_vec(),
            vec![Record::new(2, 12.0), Record::new(3, 23.0)]
        );
    }

    #[test]
    fn literal_scenario_minus_orientation_independent_of_hash_side() {
        let a = records(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        let b = records(&[(2, 10.0), (3, 20.0), (4, 40.0)]);

        let merger = Merger::new(MergeOptions::new(LogicalOp::Minus, ScoreOp::Minus));
        let result = merger.merge(&a, &b);
        // A MINUS B keeps rows only in A: {1}. Score is A.score - B.score
        // with B absent treated as 0.0.
        assert_eq!(result.into_vec(), vec![Record::new(1, 1.0)]);

        // Swap which side is physically smaller (B is now smaller) to
        // confirm the hash-the-smaller-side optimization never flips which
        // side is semantically "A".
        let big_a = records(&[(1, 1.0), (2, 2.0), (3, 3.0), (5, 5.0), (6, 6.0)]);
        let small_b = records(&[(2, 10.0)]);
        let merger2 = Merger::new(MergeOptions::new(LogicalOp::Minus, ScoreOp::Minus));
        let result2 = merger2.merge(&big_a, &small_b);
        assert_eq!(
            result2.into_vec(),
            vec![
                Record::new(1, 1.0),
                Record::new(3, 3.0),
                Record::new(5, 5.0),
                Record::new(6, 6.0),
            ]
        );
    }

    #[test]
    fn or_is_commutative_as_a_multiset() {
        let a = records(&[(1, 1.0), (2, 2.0)]);
        let b = records(&[(2, 10.0), (3, 30.0)]);
        let merger_ab = Merger::new(MergeOptions::new(LogicalOp::Or, ScoreOp::Plus));
        let merger_ba = Merger::new(MergeOptions::new(LogicalOp::Or, ScoreOp::Plus));
        let mut ab = merger_ab.merge(&a, &b).into_vec();
        let mut ba = merger_ba.merge(&b, &a).into_vec();
        ab.sort_by_key(|r| r.row_id);
        ba.sort_by_key(|r| r.row_id);
        assert_eq!(ab, ba);
    }

    #[test]
    fn and_is_subset_of_a() {
        let a = records(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        let b = records(&[(2, 10.0), (4, 40.0)]);
        let merger = Merger::new(MergeOptions::new(LogicalOp::And, ScoreOp::Left));
        let result = merger.merge(&a, &b);
        let a_ids: std::collections::HashSet<_> = a.row_ids().collect();
        for record in result.iter() {
            assert!(a_ids.contains(&record.row_id));
        }
    }

    #[test]
    fn minus_and_and_partition_a() {
        let a = records(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]);
        let b = records(&[(2, 0.0), (4, 0.0)]);
        let minus = Merger::new(MergeOptions::new(LogicalOp::Minus, ScoreOp::Left)).merge(&a, &b);
        let and = Merger::new(MergeOptions::new(LogicalOp::And, ScoreOp::Left)).merge(&a, &b);
        let mut union: Vec<RowId> = minus.row_ids().chain(and.row_ids()).collect();
        union.sort();
        assert_eq!(union, a.row_ids().collect::<Vec<_>>());
    }

    #[test]
    fn xor_excludes_matched_rows() {
        let a = records(&[(1, 1.0), (2, 2.0)]);
        let b = records(&[(2, 20.0), (3, 30.0)]);
        let merger = Merger::new(MergeOptions::new(LogicalOp::Xor, ScoreOp::Left));
        let result = merger.merge(&a, &b);
        let ids: Vec<_> = result.row_ids().collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn left_with_empty_right_keeps_all_rows() {
        let a = records(&[(1, 1.0), (2, 2.0)]);
        let b = RecordArray::new();
        let merger = Merger::new(MergeOptions::new(LogicalOp::Left, ScoreOp::Left));
        let result = merger.merge(&a, &b);
        assert_eq!(result.row_ids().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn left_with_empty_right_applies_score_op_against_missing_score() {
        // Same A/score_op, with and without an (unrelated) row on B: both
        // must score identically, since an absent B-side row always scores
        // as `missing_score`, whether B is empty or merely has no match.
        let a = records(&[(1, 1.0), (2, 2.0)]);

        let zero = Merger::new(MergeOptions::new(LogicalOp::Left, ScoreOp::Zero));
        assert_eq!(
            zero.merge(&a, &RecordArray::new()).into_vec(),
            vec![Record::new(1, 0.0), Record::new(2, 0.0)]
        );
        assert_eq!(
            zero.merge(&a, &records(&[(99, 7.0)])).into_vec(),
            vec![Record::new(1, 0.0), Record::new(2, 0.0)]
        );

        let right_missing = Merger::new(
            MergeOptions::new(LogicalOp::Left, ScoreOp::Right).with_missing_score(-1.0),
        );
        assert_eq!(
            right_missing.merge(&a, &RecordArray::new()).into_vec(),
            vec![Record::new(1, -1.0), Record::new(2, -1.0)]
        );
        assert_eq!(
            right_missing.merge(&a, &records(&[(99, 7.0)])).into_vec(),
            vec![Record::new(1, -1.0), Record::new(2, -1.0)]
        );
    }

    #[test]
    fn offset_and_limit_apply_after_merge() {
        let a = records(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]);
        let b = records(&[(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)]);
        let merger = Merger::new(
            MergeOptions::new(LogicalOp::And, ScoreOp::Plus).with_offset_limit(1, 2),
        );
        let result = merger.merge(&a, &b);
        assert_eq!(result.row_ids().collect::<Vec<_>>(), vec![2, 3]);
    }
}
