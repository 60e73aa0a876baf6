//! Sorter: multi-key, partial-or-full sort of a record batch, per spec
//! §4.J.
//!
//! The general path is a ternary (3-way, Dutch-flag) quicksort specialized
//! per evaluated key kind, with ties on one order cascading into the next
//! order in the list — the classic multi-key quicksort shape. A bounded
//! max-heap fast path handles the common "first few rows by row_id" case
//! without sorting the whole batch.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::cursor::OrderType;
use crate::error::{Error, Result};
use crate::expr::{Expression, Node};
use crate::record::{Record, RecordArray};
use crate::value::{Bool3, Value, ValueKind};

/// Runs of this length or shorter use insertion sort instead of
/// partitioning.
const INSERTION_SORT_THRESHOLD: usize = 16;

/// Below this combined `offset + limit`, a first order of `row_id` uses
/// the bounded-heap fast path instead of a full sort.
const HEAP_FAST_PATH_LIMIT: usize = 1000;

/// One entry in a `Sorter`'s key list: an expression to evaluate plus the
/// direction it sorts in.
pub struct SorterOrder<'e> {
    pub expression: Expression<'e>,
    pub order: OrderType,
}

impl<'e> SorterOrder<'e> {
    pub fn new(expression: Expression<'e>, order: OrderType) -> Self {
        Self { expression, order }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SorterOptions {
    pub offset: usize,
    pub limit: usize,
}

impl Default for SorterOptions {
    fn default() -> Self {
        Self { offset: 0, limit: usize::MAX }
    }
}

impl SorterOptions {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

/// A sort key evaluated from one order's expression, in a representation
/// whose natural `Ord` already places N/A last.
#[derive(Clone)]
enum SortKey {
    /// `Bool`: 0/1/2 for false/true/N/A.
    Bool(u8),
    /// `Int`/`Float`: order-preserving unsigned mapping, N/A -> `u64::MAX`.
    U64(u64),
    /// `Text`: `None` is N/A and sorts last.
    Text(Option<Box<str>>),
}

const NA_BOOL: u8 = 2;
const NA_U64: u64 = u64::MAX;

fn bool_sort_key(b: Bool3) -> u8 {
    match b {
        Bool3::False => 0,
        Bool3::True => 1,
        Bool3::Na => NA_BOOL,
    }
}

/// Maps `i64` to an unsigned key preserving numeric order. `i64::MIN` is
/// the N/A sentinel and is special-cased to `u64::MAX` rather than the
/// bias mapping's natural image (which would otherwise collide with
/// `i64::MAX`'s image); every real value is shifted down by one to make
/// room.
fn int_sort_key(v: i64) -> u64 {
    if v == i64::MIN {
        return NA_U64;
    }
    let biased = (v as u64) ^ 0x8000_0000_0000_0000;
    biased - 1
}

/// Maps `f64` to an unsigned key preserving numeric order: flip every bit
/// of negative values, set the sign bit of non-negative ones. The single
/// reserved N/A bit pattern is special-cased to `u64::MAX`; no ordinary
/// float reaches that image (the largest ordinary image is `+inf`'s).
fn float_sort_key(f: f64) -> u64 {
    if crate::value::is_float_na(f) {
        return NA_U64;
    }
    let bits = f.to_bits();
    if bits & 0x8000_0000_0000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000_0000_0000
    }
}

fn to_sort_key(v: &Value) -> Result<SortKey> {
    match v {
        Value::Bool(b) => Ok(SortKey::Bool(bool_sort_key(*b))),
        Value::Int(i) => Ok(SortKey::U64(int_sort_key(*i))),
        Value::Float(f) => Ok(SortKey::U64(float_sort_key(*f))),
        Value::Text(t) => Ok(SortKey::Text(t.clone())),
        other => Err(Error::TypeError(format!(
            "{:?} is not a sortable key kind",
            other.kind()
        ))),
    }
}

/// Compares two keys with N/A always sorting last, applying `reverse`
/// only to the non-N/A ordering (per spec: reverse still places N/A
/// after both `false`/`true`, not before).
fn cmp_keys(a: &SortKey, b: &SortKey, reverse: bool) -> Ordering {
    match (a, b) {
        (SortKey::Bool(x), SortKey::Bool(y)) => cmp_with_na(*x as u64, *y as u64, NA_BOOL as u64, reverse),
        (SortKey::U64(x), SortKey::U64(y)) => cmp_with_na(*x, *y, NA_U64, reverse),
        (SortKey::Text(x), SortKey::Text(y)) => cmp_text_with_na(x, y, reverse),
        _ => unreachable!("sorter keys are homogeneous per order"),
    }
}

fn cmp_with_na(a: u64, b: u64, na: u64, reverse: bool) -> Ordering {
    match (a == na, b == na) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            if reverse {
                b.cmp(&a)
            } else {
                a.cmp(&b)
            }
        }
    }
}

fn cmp_text_with_na(a: &Option<Box<str>>, b: &Option<Box<str>>, reverse: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = x.as_bytes().cmp(y.as_bytes());
            if reverse {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

/// Built from an ordered list of `(expression, direction)` pairs plus
/// `{offset, limit}`. All expressions must share one table.
pub struct Sorter<'e> {
    orders: Vec<SorterOrder<'e>>,
    options: SorterOptions,
}

impl<'e> Sorter<'e> {
    pub fn new(orders: Vec<SorterOrder<'e>>, options: SorterOptions) -> Result<Self> {
        if orders.is_empty() {
            return Err(Error::InvalidOperation(
                "sorter requires at least one order".to_string(),
            ));
        }
        let table = orders[0].expression.table();
        for order in &orders[1..] {
            if !std::ptr::eq(order.expression.table(), table) {
                return Err(Error::InvalidOperation(
                    "all sorter orders must share the same table".to_string(),
                ));
            }
        }
        for order in &orders {
            match order.expression.kind() {
                ValueKind::Bool | ValueKind::Int | ValueKind::Float | ValueKind::Text => {}
                other => {
                    return Err(Error::TypeError(format!(
                        "{other:?} is not a sortable key kind"
                    )))
                }
            }
        }
        Ok(Self { orders, options })
    }

    /// Evaluate and sort `records`, returning exactly
    /// `min(limit, max(0, count - offset))` records.
    pub fn sort(&self, records: &RecordArray) -> Result<RecordArray> {
        if records.is_empty() {
            return Ok(RecordArray::new());
        }
        if self.wants_heap_fast_path() {
            return Ok(self.heap_sort(records));
        }

        let reverses: Vec<bool> = self
            .orders
            .iter()
            .map(|o| o.order == OrderType::Reverse)
            .collect();
        let mut keys_per_order = Vec::with_capacity(self.orders.len());
        for order in &self.orders {
            let values = eval_order_values(order, records)?;
            let keys = values.iter().map(to_sort_key).collect::<Result<Vec<_>>>()?;
            keys_per_order.push(keys);
        }

        let mut idx: Vec<usize> = (0..records.len()).collect();
        quicksort(&mut idx, &keys_per_order, &reverses, 0);

        let start = self.options.offset.min(idx.len());
        let end = start
            .saturating_add(self.options.limit)
            .min(idx.len())
            .max(start);
        Ok(idx[start..end].iter().map(|&i| records[i]).collect())
    }

    fn wants_heap_fast_path(&self) -> bool {
        matches!(self.orders[0].expression.root(), Node::RowId)
            && self.options.offset.saturating_add(self.options.limit) < HEAP_FAST_PATH_LIMIT
    }

    /// Bounded max-heap maintaining the top-K `(offset + limit)` records by
    /// `row_id` in a single pass, then a final heap-sort emits
    /// `[offset, offset + limit)` in order.
    fn heap_sort(&self, records: &RecordArray) -> RecordArray {
        let reverse = self.orders[0].order == OrderType::Reverse;
        let k = self
            .options
            .offset
            .saturating_add(self.options.limit)
            .min(records.len());
        if k == 0 {
            return RecordArray::new();
        }

        let mut heap: BinaryHeap<HeapItem> = BinaryHeap::with_capacity(k + 1);
        for &record in records.iter() {
            let item = HeapItem { record, reverse };
            if heap.len() < k {
                heap.push(item);
            } else if let Some(top) = heap.peek() {
                if item < *top {
                    heap.pop();
                    heap.push(item);
                }
            }
        }

        let mut collected: Vec<Record> = heap.into_iter().map(|h| h.record).collect();
        if reverse {
            collected.sort_by(|a, b| b.row_id.cmp(&a.row_id));
        } else {
            collected.sort_by(|a, b| a.row_id.cmp(&b.row_id));
        }

        let start = self.options.offset.min(collected.len());
        let end = start
            .saturating_add(self.options.limit)
            .min(collected.len())
            .max(start);
        RecordArray::from_vec(collected[start..end].to_vec())
    }
}

/// Directly reads `row_id`/`score` off the record rather than walking the
/// general tree evaluator, per spec §4.J's fast-path note.
fn eval_order_values(order: &SorterOrder, records: &RecordArray) -> Result<Vec<Value>> {
    match order.expression.root() {
        Node::RowId => Ok(records.iter().map(|r| Value::Int(r.row_id)).collect()),
        Node::Score => Ok(records.iter().map(|r| Value::float(r.score)).collect()),
        _ => {
            let mut out = Vec::new();
            order.expression.evaluate(records, &mut out)?;
            Ok(out)
        }
    }
}

/// Ordering wrapper for the bounded-heap fast path. For ascending
/// (`reverse == false`) the heap keeps the K smallest row-IDs, so "worse"
/// (and thus what `BinaryHeap::pop` evicts) is the larger row-ID; for
/// descending it is the smaller one.
struct HeapItem {
    record: Record,
    reverse: bool,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.record.row_id == other.record.row_id
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.reverse {
            other.record.row_id.cmp(&self.record.row_id)
        } else {
            self.record.row_id.cmp(&other.record.row_id)
        }
    }
}

/// Ternary (Dutch-flag) quicksort over `indices` (permutation of record
/// positions), comparing by `keys[order_idx]`; the equal-to-pivot range
/// recurses into `order_idx + 1` since those records tie on every key
/// examined so far.
fn quicksort(indices: &mut [usize], keys: &[Vec<SortKey>], reverses: &[bool], order_idx: usize) {
    if order_idx >= keys.len() || indices.len() <= 1 {
        return;
    }
    if indices.len() <= INSERTION_SORT_THRESHOLD {
        insertion_sort(indices, keys, reverses, order_idx);
        recurse_equal_runs(indices, keys, reverses, order_idx);
        return;
    }

    let len = indices.len();
    let pivot_pos = median_of_three(indices, keys, reverses, order_idx, 1, len / 2, len - 2);
    indices.swap(0, pivot_pos);
    let pivot_key_idx = indices[0];

    let rev = reverses[order_idx];
    let mut lt = 0usize;
    let mut i = 1usize;
    let mut gt = len;
    while i < gt {
        match cmp_keys(&keys[order_idx][indices[i]], &keys[order_idx][pivot_key_idx], rev) {
            Ordering::Less => {
                indices.swap(lt, i);
                lt += 1;
                i += 1;
            }
            Ordering::Greater => {
                gt -= 1;
                indices.swap(i, gt);
            }
            Ordering::Equal => {
                i += 1;
            }
        }
    }

    let (left, rest) = indices.split_at_mut(lt);
    let (mid, right) = rest.split_at_mut(gt - lt);
    quicksort(left, keys, reverses, order_idx);
    quicksort(right, keys, reverses, order_idx);
    quicksort(mid, keys, reverses, order_idx + 1);
}

/// 3-of-5-median pivot selection (positions `1`, `len/2`, `len-2`) to
/// defeat the reverse-sorted worst case, per spec §4.J.
fn median_of_three(
    indices: &[usize],
    keys: &[Vec<SortKey>],
    reverses: &[bool],
    order_idx: usize,
    a: usize,
    b: usize,
    c: usize,
) -> usize {
    let rev = reverses[order_idx];
    let ka = &keys[order_idx][indices[a]];
    let kb = &keys[order_idx][indices[b]];
    let kc = &keys[order_idx][indices[c]];
    let ab = cmp_keys(ka, kb, rev);
    let bc = cmp_keys(kb, kc, rev);
    let ac = cmp_keys(ka, kc, rev);
    if ab == Ordering::Less {
        if bc == Ordering::Less {
            b
        } else if ac == Ordering::Less {
            c
        } else {
            a
        }
    } else if bc == Ordering::Greater {
        b
    } else if ac == Ordering::Greater {
        c
    } else {
        a
    }
}

fn insertion_sort(indices: &mut [usize], keys: &[Vec<SortKey>], reverses: &[bool], order_idx: usize) {
    let rev = reverses[order_idx];
    for i in 1..indices.len() {
        let mut j = i;
        while j > 0
            && cmp_keys(&keys[order_idx][indices[j]], &keys[order_idx][indices[j - 1]], rev)
                == Ordering::Less
        {
            indices.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// After insertion-sorting by `order_idx`, find consecutive equal-key runs
/// and recurse each into the next order, mirroring the ternary
/// quicksort's equal-partition recursion.
fn recurse_equal_runs(indices: &mut [usize], keys: &[Vec<SortKey>], reverses: &[bool], order_idx: usize) {
    if order_idx + 1 >= keys.len() {
        return;
    }
    let rev = reverses[order_idx];
    let mut start = 0;
    while start < indices.len() {
        let mut end = start + 1;
        while end < indices.len()
            && cmp_keys(&keys[order_idx][indices[end]], &keys[order_idx][indices[start]], rev)
                == Ordering::Equal
        {
            end += 1;
        }
        if end - start > 1 {
            quicksort(&mut indices[start..end], keys, reverses, order_idx + 1);
        }
        start = end;
    }
}
