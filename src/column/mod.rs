//! The column family: eleven concrete storage kinds behind one
//! `ColumnImpl` enum, dispatched by `match` rather than a `Box<dyn Column>`
//! per cell, per spec §9's guidance against runtime type reflection in
//! the hot path.

mod scalar;
mod vector;

use crate::error::{Error, Result};
use crate::index::{HashIndex, Index, TreeIndex};
use crate::record::{RecordArray, RowId};
use crate::value::{Bool3, GeoPoint, Value, ValueKind};
use scalar::ScalarStore;
use vector::{TextColumn, TextVectorColumn, VectorColumn};

/// A named secondary index maintained by a column, dispatched the same
/// way as `ColumnImpl` — one `match` per operation, no trait object.
#[derive(Debug, Clone)]
pub enum IndexImpl {
    Tree(TreeIndex),
    Hash(HashIndex),
}

impl IndexImpl {
    fn insert(&mut self, row_id: RowId, value: &Value) -> Result<()> {
        match self {
            IndexImpl::Tree(t) => t.insert(row_id, value),
            IndexImpl::Hash(h) => h.insert(row_id, value),
        }
    }

    fn remove(&mut self, row_id: RowId, value: &Value) {
        match self {
            IndexImpl::Tree(t) => t.remove(row_id, value),
            IndexImpl::Hash(h) => h.remove(row_id, value),
        }
    }

    fn contains(&self, value: &Value) -> bool {
        match self {
            IndexImpl::Tree(t) => t.contains(value),
            IndexImpl::Hash(h) => h.contains(value),
        }
    }

    fn find_one(&self, value: &Value) -> Option<RowId> {
        match self {
            IndexImpl::Tree(t) => t.find_one(value),
            IndexImpl::Hash(h) => h.find_one(value),
        }
    }

    fn test_uniqueness(&self) -> bool {
        match self {
            IndexImpl::Tree(t) => t.test_uniqueness(),
            IndexImpl::Hash(h) => h.test_uniqueness(),
        }
    }

    fn find(&self, value: &Value) -> Vec<RowId> {
        match self {
            IndexImpl::Tree(t) => Index::find(t, value),
            IndexImpl::Hash(h) => Index::find(h, value),
        }
    }
}

/// The per-kind storage, one variant per spec's eleven column kinds.
#[derive(Debug, Clone)]
enum ColumnImpl {
    Bool(ScalarStore<Bool3>),
    Int(ScalarStore<i64>),
    Float(ScalarStore<f64>),
    GeoPoint(ScalarStore<GeoPoint>),
    Text(TextColumn),
    BoolVector(VectorColumn<Bool3>),
    IntVector(VectorColumn<i64>),
    FloatVector(VectorColumn<f64>),
    GeoPointVector(VectorColumn<GeoPoint>),
    TextVector(TextVectorColumn),
}

impl ColumnImpl {
    fn new(kind: ValueKind) -> Result<Self> {
        Ok(match kind {
            ValueKind::Bool => ColumnImpl::Bool(ScalarStore::new()),
            ValueKind::Int => ColumnImpl::Int(ScalarStore::new()),
            ValueKind::Float => ColumnImpl::Float(ScalarStore::new()),
            ValueKind::GeoPoint => ColumnImpl::GeoPoint(ScalarStore::new()),
            ValueKind::Text => ColumnImpl::Text(TextColumn::new()),
            ValueKind::BoolVector => ColumnImpl::BoolVector(VectorColumn::new()),
            ValueKind::IntVector => ColumnImpl::IntVector(VectorColumn::new()),
            ValueKind::FloatVector => ColumnImpl::FloatVector(VectorColumn::new()),
            ValueKind::GeoPointVector => ColumnImpl::GeoPointVector(VectorColumn::new()),
            ValueKind::TextVector => ColumnImpl::TextVector(TextVectorColumn::new()),
            ValueKind::Na => {
                return Err(Error::TypeError("cannot create a column of kind Na".into()))
            }
        })
    }

    fn kind(&self) -> ValueKind {
        match self {
            ColumnImpl::Bool(_) => ValueKind::Bool,
            ColumnImpl::Int(_) => ValueKind::Int,
            ColumnImpl::Float(_) => ValueKind::Float,
            ColumnImpl::GeoPoint(_) => ValueKind::GeoPoint,
            ColumnImpl::Text(_) => ValueKind::Text,
            ColumnImpl::BoolVector(_) => ValueKind::BoolVector,
            ColumnImpl::IntVector(_) => ValueKind::IntVector,
            ColumnImpl::FloatVector(_) => ValueKind::FloatVector,
            ColumnImpl::GeoPointVector(_) => ValueKind::GeoPointVector,
            ColumnImpl::TextVector(_) => ValueKind::TextVector,
        }
    }

    fn get(&self, row_id: usize) -> Value {
        match self {
            ColumnImpl::Bool(s) => s.get(row_id),
            ColumnImpl::Int(s) => s.get(row_id),
            ColumnImpl::Float(s) => s.get(row_id),
            ColumnImpl::GeoPoint(s) => s.get(row_id),
            ColumnImpl::Text(s) => s.get(row_id),
            ColumnImpl::BoolVector(s) => {
                Value::BoolVector(s.get_slice(row_id).map(|sl| sl.to_vec()))
            }
            ColumnImpl::IntVector(s) => Value::IntVector(s.get_slice(row_id).map(|sl| sl.to_vec())),
            ColumnImpl::FloatVector(s) => {
                Value::FloatVector(s.get_slice(row_id).map(|sl| sl.to_vec()))
            }
            ColumnImpl::GeoPointVector(s) => {
                Value::GeoPointVector(s.get_slice(row_id).map(|sl| sl.to_vec()))
            }
            ColumnImpl::TextVector(s) => s.get(row_id),
        }
    }

    fn set(&mut self, row_id: usize, value: &Value) -> Result<()> {
        match self {
            ColumnImpl::Bool(s) => s.set(row_id, value),
            ColumnImpl::Int(s) => s.set(row_id, value),
            ColumnImpl::Float(s) => s.set(row_id, value),
            ColumnImpl::GeoPoint(s) => s.set(row_id, value),
            ColumnImpl::Text(s) => s.set(row_id, value),
            ColumnImpl::BoolVector(s) => match value {
                Value::BoolVector(items) => s.set_slice(row_id, items.as_deref()),
                other => Err(type_error(ValueKind::BoolVector, other)),
            },
            ColumnImpl::IntVector(s) => match value {
                Value::IntVector(items) => s.set_slice(row_id, items.as_deref()),
                other => Err(type_error(ValueKind::IntVector, other)),
            },
            ColumnImpl::FloatVector(s) => match value {
                Value::FloatVector(items) => s.set_slice(row_id, items.as_deref()),
                other => Err(type_error(ValueKind::FloatVector, other)),
            },
            ColumnImpl::GeoPointVector(s) => match value {
                Value::GeoPointVector(items) => s.set_slice(row_id, items.as_deref()),
                other => Err(type_error(ValueKind::GeoPointVector, other)),
            },
            ColumnImpl::TextVector(s) => s.set(row_id, value),
        }
    }

    fn unset(&mut self, row_id: usize) {
        match self {
            ColumnImpl::Bool(s) => s.unset(row_id),
            ColumnImpl::Int(s) => s.unset(row_id),
            ColumnImpl::Float(s) => s.unset(row_id),
            ColumnImpl::GeoPoint(s) => s.unset(row_id),
            ColumnImpl::Text(s) => s.unset(row_id),
            ColumnImpl::BoolVector(s) => s.unset(row_id),
            ColumnImpl::IntVector(s) => s.unset(row_id),
            ColumnImpl::FloatVector(s) => s.unset(row_id),
            ColumnImpl::GeoPointVector(s) => s.unset(row_id),
            ColumnImpl::TextVector(s) => s.unset(row_id),
        }
    }

    /// Every `(row_id, value)` with a non-N/A value, for index construction
    /// and `set_key_attribute`'s uniqueness scan.
    fn scan_non_na(&self) -> Vec<(RowId, Value)> {
        match self {
            ColumnImpl::Bool(s) => s.iter_non_na().map(|(r, v)| (r as RowId, v)).collect(),
            ColumnImpl::Int(s) => s.iter_non_na().map(|(r, v)| (r as RowId, v)).collect(),
            ColumnImpl::Float(s) => s.iter_non_na().map(|(r, v)| (r as RowId, v)).collect(),
            ColumnImpl::GeoPoint(s) => s.iter_non_na().map(|(r, v)| (r as RowId, v)).collect(),
            ColumnImpl::Text(s) => s.iter_non_na().map(|(r, v)| (r as RowId, v)).collect(),
            ColumnImpl::BoolVector(s) => (0..s.len())
                .filter_map(|r| s.get_slice(r).map(|sl| (r as RowId, Value::BoolVector(Some(sl.to_vec())))))
                .collect(),
            ColumnImpl::IntVector(s) => (0..s.len())
                .filter_map(|r| s.get_slice(r).map(|sl| (r as RowId, Value::IntVector(Some(sl.to_vec())))))
                .collect(),
            ColumnImpl::FloatVector(s) => (0..s.len())
                .filter_map(|r| s.get_slice(r).map(|sl| (r as RowId, Value::FloatVector(Some(sl.to_vec())))))
                .collect(),
            ColumnImpl::GeoPointVector(s) => (0..s.len())
                .filter_map(|r| {
                    s.get_slice(r)
                        .map(|sl| (r as RowId, Value::GeoPointVector(Some(sl.to_vec()))))
                })
                .collect(),
            ColumnImpl::TextVector(s) => (0..s.len())
                .filter_map(|r| {
                    let v = s.get(r);
                    if v.is_na() {
                        None
                    } else {
                        Some((r as RowId, v))
                    }
                })
                .collect(),
        }
    }
}

fn type_error(expected: ValueKind, got: &Value) -> Error {
    Error::TypeError(format!("expected {:?}, got {:?}", expected, got.kind()))
}

/// A back-edge recorded on the *target* table of a reference column, used
/// to bulk-clear referrer cells when a target row is removed.
#[derive(Debug, Clone)]
pub struct ReferrerEdge {
    pub referrer_table: String,
    pub referrer_column: String,
}

/// One column of a table: typed storage, its maintained indexes, and the
/// key/reference flags spec §4.E describes.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    storage: ColumnImpl,
    indexes: Vec<(String, IndexImpl)>,
    is_key: bool,
    reference_table: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Result<Self> {
        let name = name.into();
        crate::util::name::validate(&name)?;
        Ok(Self {
            name,
            storage: ColumnImpl::new(kind)?,
            indexes: Vec::new(),
            is_key: false,
            reference_table: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        crate::util::name::validate(new_name)?;
        self.name = new_name.to_string();
        Ok(())
    }

    pub fn kind(&self) -> ValueKind {
        self.storage.kind()
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    pub fn reference_table(&self) -> Option<&str> {
        self.reference_table.as_deref()
    }

    pub fn set_reference_table(&mut self, table: Option<String>) {
        self.reference_table = table;
    }

    /// `get(row_id, out datum)`: out-of-range or unset reads as N/A.
    pub fn get(&self, row_id: RowId) -> Value {
        if row_id < 0 {
            return Value::na(self.kind());
        }
        self.storage.get(row_id as usize)
    }

    /// `set(row_id, datum)`: type-checks against the column's kind,
    /// maintains every index (remove old, insert new, rollback on
    /// failure), then persists. N/A is always acceptable unless this is
    /// the key column (use `set_key` there instead).
    pub fn set(&mut self, row_id: RowId, value: &Value) -> Result<()> {
        if row_id < 0 {
            return Err(Error::OutOfRange(format!("negative row id {row_id}")));
        }
        if self.is_key && value.is_na() {
            return Err(Error::TypeError("key column cannot hold N/A".into()));
        }
        if !value.is_na() && value.kind() != self.kind() {
            return Err(type_error(self.kind(), value));
        }
        let row = row_id as usize;
        let old = self.storage.get(row);

        if !self.indexes.is_empty() && !old.is_na() && !old.matches(value) {
            for i in 0..self.indexes.len() {
                self.indexes[i].1.remove(row_id, &old);
            }
        }
        if !value.is_na() && !old.matches(value) {
            for applied in 0..self.indexes.len() {
                if let Err(e) = self.indexes[applied].1.insert(row_id, value) {
                    for i in 0..applied {
                        self.indexes[i].1.remove(row_id, value);
                    }
                    if !old.is_na() {
                        for i in 0..self.indexes.len() {
                            let _ = self.indexes[i].1.insert(row_id, &old);
                        }
                    }
                    return Err(e);
                }
            }
        }
        self.storage.set(row, value)
    }

    /// `set_key(row_id, datum)`: rejects N/A and duplicates, writes the
    /// value, and inserts into every maintained index, rolling back
    /// earlier inserts on first failure.
    pub fn set_key(&mut self, row_id: RowId, value: &Value) -> Result<()> {
        if value.is_na() {
            return Err(Error::TypeError("key value cannot be N/A".into()));
        }
        if value.kind() != self.kind() {
            return Err(type_error(self.kind(), value));
        }
        if self.contains(value) {
            return Err(Error::KeyDuplicate(format!("{value:?}")));
        }
        self.is_key = true;
        let row = row_id as usize;
        for applied in 0..self.indexes.len() {
            if let Err(e) = self.indexes[applied].1.insert(row_id, value) {
                for i in 0..applied {
                    self.indexes[i].1.remove(row_id, value);
                }
                self.is_key = false;
                return Err(e);
            }
        }
        self.storage.set(row, value)
    }

    pub fn unset(&mut self, row_id: RowId) {
        if row_id < 0 {
            return;
        }
        let row = row_id as usize;
        let old = self.storage.get(row);
        if !old.is_na() {
            for (_, idx) in self.indexes.iter_mut() {
                idx.remove(row_id, &old);
            }
        }
        self.storage.unset(row);
    }

    pub fn contains(&self, value: &Value) -> bool {
        if let Some((_, idx)) = self.indexes.first() {
            return idx.contains(value);
        }
        self.storage.scan_non_na().iter().any(|(_, v)| v.matches(value))
    }

    /// Smallest row-ID whose value `match`es `value`.
    pub fn find_one(&self, value: &Value) -> Option<RowId> {
        if let Some((_, idx)) = self.indexes.first() {
            return idx.find_one(value);
        }
        self.storage
            .scan_non_na()
            .into_iter()
            .filter(|(_, v)| v.matches(value))
            .map(|(r, _)| r)
            .min()
    }

    /// Zero-overhead batch read aligned to the record array.
    pub fn read(&self, records: &RecordArray, out: &mut Vec<Value>) {
        out.clear();
        out.reserve(records.len());
        for record in records.iter() {
            out.push(self.get(record.row_id));
        }
    }

    /// Allowed only when current values form a set (no duplicates).
    pub fn set_key_attribute(&mut self) -> Result<()> {
        let values = self.storage.scan_non_na();
        let mut seen: std::collections::HashSet<Value> = std::collections::HashSet::new();
        for (_, v) in &values {
            if !seen.insert(v.clone()) {
                return Err(Error::KeyDuplicate(format!("{v:?}")));
            }
        }
        self.is_key = true;
        Ok(())
    }

    pub fn unset_key_attribute(&mut self) {
        self.is_key = false;
    }

    pub fn create_index(&mut self, name: impl Into<String>, hash: bool) -> Result<()> {
        let name = name.into();
        crate::util::name::validate(&name)?;
        if self.indexes.iter().any(|(n, _)| n == &name) {
            return Err(Error::AlreadyExists(name));
        }
        let entries = self.storage.scan_non_na();
        let idx = if hash {
            IndexImpl::Hash(HashIndex::build(entries.iter().map(|(r, v)| (*r, v)))?)
        } else {
            IndexImpl::Tree(TreeIndex::build(entries.iter().map(|(r, v)| (*r, v)))?)
        };
        self.indexes.push((name, idx));
        Ok(())
    }

    pub fn remove_index(&mut self, name: &str) -> Result<()> {
        let before = self.indexes.len();
        self.indexes.retain(|(n, _)| n != name);
        if self.indexes.len() == before {
            return Err(Error::NotFound(name.to_string()));
        }
        Ok(())
    }

    pub fn rename_index(&mut self, old: &str, new: &str) -> Result<()> {
        crate::util::name::validate(new)?;
        if self.indexes.iter().any(|(n, _)| n == new) {
            return Err(Error::AlreadyExists(new.to_string()));
        }
        let entry = self
            .indexes
            .iter_mut()
            .find(|(n, _)| n == old)
            .ok_or_else(|| Error::NotFound(old.to_string()))?;
        entry.0 = new.to_string();
        Ok(())
    }

    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.indexes.iter().position(|(n, _)| n == name)
    }

    pub fn num_indexes(&self) -> usize {
        self.indexes.len()
    }

    pub(crate) fn index_at(&self, i: usize) -> Option<&IndexImpl> {
        self.indexes.get(i).map(|(_, idx)| idx)
    }

    pub fn test_index_uniqueness(&self, i: usize) -> Option<bool> {
        self.indexes.get(i).map(|(_, idx)| idx.test_uniqueness())
    }

    /// Every row-ID whose stored value `match`es `value`, via the first
    /// index if one exists, otherwise a linear scan. Used by reference
    /// columns to find back-edge cells pointing at a removed row.
    pub fn scan_row_ids_matching(&self, value: &Value) -> Vec<RowId> {
        if let Some((_, idx)) = self.indexes.first() {
            return idx.find(value);
        }
        self.storage
            .scan_non_na()
            .into_iter()
            .filter(|(_, v)| v.matches(value))
            .map(|(r, _)| r)
            .collect()
    }
}
