//! Unordered multimap index, backed by a `HashMap` keyed on [`Value`]'s
//! `match`-based `Eq`/`Hash`. Only point lookups are supported — no range
//! or prefix queries, per spec §4.G.

use std::collections::BTreeSet;

use ahash::AHashMap;

use super::Index;
use crate::error::Result;
use crate::record::RowId;
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct HashIndex {
    map: AHashMap<Value, BTreeSet<RowId>>,
    len: usize,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<'a>(entries: impl IntoIterator<Item = (RowId, &'a Value)>) -> Result<Self> {
        let mut idx = Self::new();
        for (row_id, value) in entries {
            idx.insert(row_id, value)?;
        }
        Ok(idx)
    }
}

impl Index for HashIndex {
    fn insert(&mut self, row_id: RowId, value: &Value) -> Result<()> {
        if value.is_na() {
            return Ok(());
        }
        self.map.entry(value.clone()).or_default().insert(row_id);
        self.len += 1;
        Ok(())
    }

    fn remove(&mut self, row_id: RowId, value: &Value) {
        if value.is_na() {
            return;
        }
        if let Some(rows) = self.map.get_mut(value) {
            if rows.remove(&row_id) {
                self.len = self.len.saturating_sub(1);
            }
            if rows.is_empty() {
                self.map.remove(value);
            }
        }
    }

    fn test_uniqueness(&self) -> bool {
        self.map.values().all(|rows| rows.len() <= 1)
    }

    fn contains(&self, value: &Value) -> bool {
        self.map
            .get(value)
            .map(|rows| !rows.is_empty())
            .unwrap_or(false)
    }

    fn find_one(&self, value: &Value) -> Option<RowId> {
        self.map.get(value).and_then(|rows| rows.iter().next().copied())
    }

    fn find(&self, value: &Value) -> Vec<RowId> {
        self.map
            .get(value)
            .map(|rows| rows.iter().copied().collect())
            .unwrap_or_default()
    }

    fn num_entries(&self) -> usize {
        self.len
    }
}
