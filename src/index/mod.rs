//! Secondary indexes over a single scalar column: an ordered `TreeIndex`
//! and an unordered `HashIndex`, both multimaps from [`Value`] to the
//! set of row-IDs holding that value.

mod hash;
mod tree;

pub use hash::HashIndex;
pub use tree::TreeIndex;

use crate::error::Result;
use crate::record::RowId;
use crate::value::Value;

/// Inclusive/exclusive bound on a range endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Inclusive,
    Exclusive,
}

/// One side of a range query.
#[derive(Debug, Clone, PartialEq)]
pub struct EndPoint {
    pub value: Value,
    pub bound: Bound,
}

impl EndPoint {
    pub fn new(value: Value, bound: Bound) -> Self {
        Self { value, bound }
    }

    pub fn inclusive(value: Value) -> Self {
        Self::new(value, Bound::Inclusive)
    }

    pub fn exclusive(value: Value) -> Self {
        Self::new(value, Bound::Exclusive)
    }
}

/// Shared behavior of the two index kinds. Row-ID sets are always kept in
/// row-ID order, independent of whether the keys themselves are ordered.
pub trait Index {
    fn insert(&mut self, row_id: RowId, value: &Value) -> Result<()>;
    fn remove(&mut self, row_id: RowId, value: &Value);
    fn test_uniqueness(&self) -> bool;
    fn contains(&self, value: &Value) -> bool;
    fn find_one(&self, value: &Value) -> Option<RowId>;
    fn find(&self, value: &Value) -> Vec<RowId>;
    fn num_entries(&self) -> usize;
}

/// Converts an exclusive endpoint into an equivalent inclusive one for the
/// value kind at hand, per spec §4.G. Returns `None` when the conversion
/// makes the range provably empty (e.g. exclusive lower bound at
/// `i64::MAX`).
pub(crate) fn exclusive_to_inclusive_lower(value: &Value) -> Option<Value> {
    step_toward_increasing(value)
}

pub(crate) fn exclusive_to_inclusive_upper(value: &Value) -> Option<Value> {
    step_toward_decreasing(value)
}

fn step_toward_increasing(value: &Value) -> Option<Value> {
    match value {
        Value::Int(i) => i.checked_add(1).map(Value::Int),
        Value::Float(f) => {
            if f.is_nan() {
                None
            } else {
                Some(Value::Float(next_after(*f, f64::INFINITY)))
            }
        }
        Value::Text(Some(s)) => {
            let mut bytes = s.as_bytes().to_vec();
            bytes.push(0);
            Some(Value::Text(Some(
                String::from_utf8_lossy(&bytes).into_owned().into_boxed_str(),
            )))
        }
        _ => Some(value.clone()),
    }
}

fn step_toward_decreasing(value: &Value) -> Option<Value> {
    match value {
        Value::Int(i) => i.checked_sub(1).map(Value::Int),
        Value::Float(f) => {
            if f.is_nan() {
                None
            } else {
                Some(Value::Float(next_after(*f, f64::NEG_INFINITY)))
            }
        }
        Value::Text(Some(_)) => {
            // There is no "previous string" representable in general, so
            // text exclusive-upper bounds are not converted to an inclusive
            // equivalent here; `TreeIndex::find_in_range` carries them
            // through to the underlying `BTreeMap::range` as an excluded
            // bound directly instead of calling this function.
            None
        }
        _ => Some(value.clone()),
    }
}

/// Minimal `nextafter`: the next representable `f64` toward `target`.
/// Handles `±∞` by returning the input unchanged (no closer value exists).
fn next_after(x: f64, target: f64) -> f64 {
    if x == target || x.is_nan() || target.is_nan() {
        return x;
    }
    if x.is_infinite() {
        return x;
    }
    if x == 0.0 {
        return if target > 0.0 {
            f64::from_bits(1)
        } else {
            f64::from_bits(1 | (1u64 << 63))
        };
    }
    let bits = x.to_bits();
    let next_bits = if (x < target) == (x > 0.0) {
        bits + 1
    } else {
        bits - 1
    };
    f64::from_bits(next_bits)
}
