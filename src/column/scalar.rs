//! Fixed-width scalar storage: a contiguous `Vec<Cell>` per column, no
//! `Option<T>` wrapper — N/A is the kind's own reserved bit pattern, per
//! spec §4.E/§9's "avoid a second is-present bit per cell".

use crate::error::Result;
use crate::value::{Bool3, GeoPoint, Value, ValueKind};

/// A fixed-width cell type that can represent its own kind's N/A sentinel.
pub trait ScalarCell: Copy {
    const KIND: ValueKind;
    fn na() -> Self;
    fn is_na(&self) -> bool;
    fn to_value(&self) -> Value;
    fn from_value(v: &Value) -> Result<Self>;
}

impl ScalarCell for Bool3 {
    const KIND: ValueKind = ValueKind::Bool;
    fn na() -> Self {
        Bool3::Na
    }
    fn is_na(&self) -> bool {
        Bool3::is_na(*self)
    }
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
    fn from_value(v: &Value) -> Result<Self> {
        match v {
            Value::Bool(b) => Ok(*b),
            _ => Err(type_error(Self::KIND, v)),
        }
    }
}

impl ScalarCell for i64 {
    const KIND: ValueKind = ValueKind::Int;
    fn na() -> Self {
        i64::MIN
    }
    fn is_na(&self) -> bool {
        *self == i64::MIN
    }
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }
    fn from_value(v: &Value) -> Result<Self> {
        match v {
            Value::Int(i) => Ok(*i),
            _ => Err(type_error(Self::KIND, v)),
        }
    }
}

impl ScalarCell for f64 {
    const KIND: ValueKind = ValueKind::Float;
    fn na() -> Self {
        crate::value::float_na()
    }
    fn is_na(&self) -> bool {
        crate::value::is_float_na(*self)
    }
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
    fn from_value(v: &Value) -> Result<Self> {
        match v {
            Value::Float(f) => Ok(*f),
            _ => Err(type_error(Self::KIND, v)),
        }
    }
}

impl ScalarCell for GeoPoint {
    const KIND: ValueKind = ValueKind::GeoPoint;
    fn na() -> Self {
        GeoPoint::na()
    }
    fn is_na(&self) -> bool {
        GeoPoint::is_na(*self)
    }
    fn to_value(&self) -> Value {
        Value::GeoPoint(*self)
    }
    fn from_value(v: &Value) -> Result<Self> {
        match v {
            Value::GeoPoint(g) => Ok(*g),
            _ => Err(type_error(Self::KIND, v)),
        }
    }
}

fn type_error(expected: ValueKind, got: &Value) -> crate::error::Error {
    crate::error::Error::TypeError(format!("expected {:?}, got {:?}", expected, got.kind()))
}

/// Contiguous cell storage shared by the four fixed-width scalar kinds.
#[derive(Debug, Clone, Default)]
pub struct ScalarStore<T: ScalarCell> {
    cells: Vec<T>,
}

impl<T: ScalarCell> ScalarStore<T> {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    fn ensure_len(&mut self, row_id: usize) {
        if self.cells.len() <= row_id {
            self.cells.resize(row_id + 1, T::na());
        }
    }

    pub fn get(&self, row_id: usize) -> Value {
        self.cells
            .get(row_id)
            .map(|c| c.to_value())
            .unwrap_or_else(|| Value::na(T::KIND))
    }

    pub fn set(&mut self, row_id: usize, value: &Value) -> Result<()> {
        self.ensure_len(row_id);
        self.cells[row_id] = if value.is_na() {
            T::na()
        } else {
            T::from_value(value)?
        };
        Ok(())
    }

    pub fn unset(&mut self, row_id: usize) {
        if let Some(cell) = self.cells.get_mut(row_id) {
            *cell = T::na();
        }
    }

    pub fn iter_non_na(&self) -> impl Iterator<Item = (usize, Value)> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, c)| {
            if c.is_na() {
                None
            } else {
                Some((i, c.to_value()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_cells_read_as_na() {
        let store: ScalarStore<i64> = ScalarStore::new();
        assert!(store.get(100).is_na());
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut store: ScalarStore<i64> = ScalarStore::new();
        store.set(3, &Value::Int(42)).unwrap();
        assert_eq!(store.get(3), Value::Int(42));
        assert!(store.get(0).is_na());
    }

    #[test]
    fn unset_restores_na() {
        let mut store: ScalarStore<i64> = ScalarStore::new();
        store.set(0, &Value::Int(7)).unwrap();
        store.unset(0);
        assert!(store.get(0).is_na());
    }
}
