//! Ordered multimap index, backed by a `BTreeMap` keyed on [`Value`]'s
//! sort-key `Ord` (N/A sorts last), with each bucket's row-IDs kept in a
//! `BTreeSet` (row-ID order).

use std::collections::{BTreeMap, BTreeSet};

use super::{exclusive_to_inclusive_lower, exclusive_to_inclusive_upper, Bound, EndPoint, Index};
use crate::error::{Error, Result};
use crate::record::RowId;
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    map: BTreeMap<Value, BTreeSet<RowId>>,
    len: usize,
}

impl TreeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full scan + bulk insert, per spec §4.G "Index construction".
    pub fn build<'a>(entries: impl IntoIterator<Item = (RowId, &'a Value)>) -> Result<Self> {
        let mut idx = Self::new();
        for (row_id, value) in entries {
            idx.insert(row_id, value)?;
        }
        Ok(idx)
    }

    pub fn find_in_range(&self, lower: Option<&EndPoint>, upper: Option<&EndPoint>) -> Vec<RowId> {
        use std::ops::Bound as RangeBound;

        let start = match lower {
            None => RangeBound::Unbounded,
            Some(e) => match e.bound {
                Bound::Inclusive => RangeBound::Included(e.value.clone()),
                Bound::Exclusive => match exclusive_to_inclusive_lower(&e.value) {
                    Some(v) => RangeBound::Included(v),
                    None => return Vec::new(),
                },
            },
        };
        let end = match upper {
            None => RangeBound::Unbounded,
            // Text has no "previous string", so an exclusive upper bound is
            // carried straight through as `Excluded` rather than converted
            // to an inclusive equivalent (spec §4.G: excludes the exact
            // string, keeps everything strictly less than it).
            Some(e) if e.bound == Bound::Exclusive && matches!(e.value, Value::Text(Some(_))) => {
                RangeBound::Excluded(e.value.clone())
            }
            Some(e) => match e.bound {
                Bound::Inclusive => RangeBound::Included(e.value.clone()),
                Bound::Exclusive => match exclusive_to_inclusive_upper(&e.value) {
                    Some(v) => RangeBound::Included(v),
                    None => return Vec::new(),
                },
            },
        };
        self.map
            .range((start, end))
            .flat_map(|(_, rows)| rows.iter().copied())
            .collect()
    }

    /// Text-only: rows whose key starts with `prefix`. `Bound::Exclusive`
    /// excludes a key exactly equal to `prefix` itself, keeping only keys
    /// strictly longer than the prefix.
    pub fn find_starts_with(&self, prefix: &Value, bound: Bound) -> Result<Vec<RowId>> {
        let Value::Text(Some(prefix)) = prefix else {
            return Err(Error::InvalidOperation(
                "find_starts_with is only defined for Text keys".to_string(),
            ));
        };
        let mut out = Vec::new();
        for (key, rows) in self.map.iter() {
            let Value::Text(Some(s)) = key else { continue };
            if !s.as_bytes().starts_with(prefix.as_bytes()) {
                continue;
            }
            if bound == Bound::Exclusive && s.as_bytes() == prefix.as_bytes() {
                continue;
            }
            out.extend(rows.iter().copied());
        }
        Ok(out)
    }

    /// Text-only: rows whose key is a prefix of `value` (every stored
    /// string that `value` starts with).
    pub fn find_prefixes(&self, value: &Value) -> Result<Vec<RowId>> {
        let Value::Text(Some(full)) = value else {
            return Err(Error::InvalidOperation(
                "find_prefixes is only defined for Text keys".to_string(),
            ));
        };
        let mut out = Vec::new();
        for (key, rows) in self.map.iter() {
            let Value::Text(Some(s)) = key else { continue };
            if full.as_bytes().starts_with(s.as_bytes()) {
                out.extend(rows.iter().copied());
            }
        }
        Ok(out)
    }
}

impl Index for TreeIndex {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_find_remove_roundtrip() {
        let mut idx = TreeIndex::new();
        idx.insert(1, &Value::Int(10)).unwrap();
        idx.insert(2, &Value::Int(10)).unwrap();
        idx.insert(3, &Value::Int(20)).unwrap();
        assert_eq!(idx.find(&Value::Int(10)), vec![1, 2]);
        assert_eq!(idx.find_one(&Value::Int(10)), Some(1));
        assert!(!idx.test_uniqueness());
        idx.remove(1, &Value::Int(10));
        assert_eq!(idx.find(&Value::Int(10)), vec![2]);
        assert_eq!(idx.num_entries(), 2);
    }

    #[test]
    fn na_values_are_never_indexed() {
        let mut idx = TreeIndex::new();
        idx.insert(1, &Value::na(crate::value::ValueKind::Int)).unwrap();
        assert_eq!(idx.num_entries(), 0);
        assert!(!idx.contains(&Value::na(crate::value::ValueKind::Int)));
    }

    #[test]
    fn range_query_respects_exclusive_bounds() {
        let mut idx = TreeIndex::new();
        for v in [1, 2, 3, 4, 5] {
            idx.insert(v, &Value::Int(v)).unwrap();
        }
        let lo = EndPoint::exclusive(Value::Int(1));
        let hi = EndPoint::inclusive(Value::Int(4));
        let rows = idx.find_in_range(Some(&lo), Some(&hi));
        assert_eq!(rows, vec![2, 3, 4]);
    }

    #[test]
    fn exclusive_upper_text_excludes_exact_match_but_keeps_lesser_keys() {
        let mut idx = TreeIndex::new();
        idx.insert(1, &Value::Text(Some("app".into()))).unwrap();
        idx.insert(2, &Value::Text(Some("apple".into()))).unwrap();
        idx.insert(3, &Value::Text(Some("banana".into()))).unwrap();
        let hi = EndPoint::exclusive(Value::Text(Some("banana".into())));
        let mut rows = idx.find_in_range(None, Some(&hi));
        rows.sort();
        assert_eq!(rows, vec![1, 2]);
    }

    #[test]
    fn prefix_queries_on_text() {
        let mut idx = TreeIndex::new();
        idx.insert(1, &Value::Text(Some("app".into()))).unwrap();
        idx.insert(2, &Value::Text(Some("apple".into()))).unwrap();
        idx.insert(3, &Value::Text(Some("banana".into()))).unwrap();
        let mut starts = idx
            .find_starts_with(&Value::Text(Some("app".into())), Bound::Inclusive)
            .unwrap();
        starts.sort();
        assert_eq!(starts, vec![1, 2]);
        let prefixes = idx.find_prefixes(&Value::Text(Some("apple".into()))).unwrap();
        assert_eq!(prefixes, vec![1, 2]);
    }

    #[test]
    fn exclusive_starts_with_excludes_exact_match() {
        let mut idx = TreeIndex::new();
        idx.insert(1, &Value::Text(Some("app".into()))).unwrap();
        idx.insert(2, &Value::Text(Some("apple".into()))).unwrap();
        let mut starts = idx
            .find_starts_with(&Value::Text(Some("app".into())), Bound::Exclusive)
            .unwrap();
        starts.sort();
        assert_eq!(starts, vec![2]);
    }
}
