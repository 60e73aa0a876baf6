//! Table and Database: the row-owning catalog entities.
//!
//! A `Table` owns an insertion-ordered list of `Column`s plus a `RowBitmap`
//! for row-ID lifecycle; a `Database` owns an insertion-ordered list of
//! `Table`s. Both preserve insertion order in a `Vec` rather than a
//! `HashMap`, matching the teacher's catalog style where iteration order
//! is an observable part of the API (`num_columns`/`get_column(index)`).

use crate::bitmap::RowBitmap;
use crate::column::{Column, ReferrerEdge};
use crate::cursor::{CursorOptions, TableCursor};
use crate::error::{Error, Result};
use crate::record::RowId;
use crate::util::name;
use crate::value::{Value, ValueKind};

/// A named container of columns plus a row manager; optional single key
/// column.
///
/// `remove_row` here is the *local* primitive: it unsets every column's
/// cell and invalidates the row-ID, but it cannot see sibling tables, so
/// it cannot enforce the "don't unresolve a key-column reference" rule or
/// bulk-clear referrer cells elsewhere — those require the referrer's
/// `Table`, which only `Database` can reach (it alone owns every table).
/// Use [`Database::remove_row`] when the table participates in a schema
/// with reference columns; call this directly only for a standalone table
/// with no referrers, or as the primitive `Database::remove_row` itself
/// builds on.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<(String, Column)>,
    key_column: Option<usize>,
    bitmap: RowBitmap,
    referrers: Vec<ReferrerEdge>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        name::validate(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
            key_column: None,
            bitmap: RowBitmap::new(),
            referrers: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_rows(&self) -> usize {
        self.bitmap.num_rows()
    }

    pub fn max_row_id(&self) -> Option<RowId> {
        self.bitmap.max_row_id()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.bitmap.is_full()
    }

    pub fn test_row(&self, row_id: RowId) -> bool {
        self.bitmap.test(row_id)
    }

    pub(crate) fn bitmap(&self) -> &RowBitmap {
        &self.bitmap
    }

    // ---- column catalog ----

    pub fn create_column(&mut self, col_name: &str, kind: ValueKind) -> Result<()> {
        if self.find_column(col_name).is_some() {
            return Err(Error::AlreadyExists(col_name.to_string()));
        }
        let column = Column::new(col_name, kind)?;
        self.columns.push((col_name.to_string(), column));
        Ok(())
    }

    /// Fails if the column is the key column, or is itself a reference
    /// column (removing it would silently drop a still-recorded back-edge
    /// on the target table, which only `Database` can clean up).
    pub fn remove_column(&mut self, col_name: &str) -> Result<()> {
        let idx = self
            .find_column(col_name)
            .ok_or_else(|| Error::NotFound(col_name.to_string()))?;
        let col = &self.columns[idx].1;
        if col.is_key() || col.reference_table().is_some() {
            return Err(Error::NotRemovable(col_name.to_string()));
        }
        self.columns.remove(idx);
        if let Some(key_idx) = self.key_column {
            self.key_column = match key_idx.cmp(&idx) {
                std::cmp::Ordering::Less => Some(key_idx),
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Greater => Some(key_idx - 1),
            };
        }
        Ok(())
    }

    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<()> {
        if self.find_column(new).is_some() {
            return Err(Error::AlreadyExists(new.to_string()));
        }
        let idx = self
            .find_column(old)
            .ok_or_else(|| Error::NotFound(old.to_string()))?;
        self.columns[idx].1.rename(new)?;
        self.columns[idx].0 = new.to_string();
        Ok(())
    }

    /// Rotate the ordered column list: move the named column to `new_index`.
    pub fn reorder_column(&mut self, col_name: &str, new_index: usize) -> Result<()> {
        let idx = self
            .find_column(col_name)
            .ok_or_else(|| Error::NotFound(col_name.to_string()))?;
        if new_index >= self.columns.len() {
            return Err(Error::OutOfRange(format!(
                "index {new_index} out of range for {} columns",
                self.columns.len()
            )));
        }
        let entry = self.columns.remove(idx);
        self.columns.insert(new_index, entry);
        self.key_column = self
            .key_column
            .map(|k| reindex_after_move(k, idx, new_index));
        Ok(())
    }

    pub fn find_column(&self, col_name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == col_name)
    }

    pub fn get_column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx).map(|(_, c)| c)
    }

    pub fn get_column_mut(&mut self, idx: usize) -> Option<&mut Column> {
        self.columns.get_mut(idx).map(|(_, c)| c)
    }

    pub fn column_named(&self, col_name: &str) -> Option<&Column> {
        self.find_column(col_name).and_then(|i| self.get_column(i))
    }

    pub fn column_named_mut(&mut self, col_name: &str) -> Option<&mut Column> {
        let idx = self.find_column(col_name)?;
        self.get_column_mut(idx)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn set_key_column(&mut self, col_name: &str) -> Result<()> {
        if self.key_column.is_some() {
            return Err(Error::InvalidOperation("table already has a key column".into()));
        }
        let idx = self
            .find_column(col_name)
            .ok_or_else(|| Error::NotFound(col_name.to_string()))?;
        self.columns[idx].1.set_key_attribute()?;
        self.key_column = Some(idx);
        Ok(())
    }

    pub fn unset_key_column(&mut self) {
        if let Some(idx) = self.key_column.take() {
            self.columns[idx].1.unset_key_attribute();
        }
    }

    pub fn key_column_index(&self) -> Option<usize> {
        self.key_column
    }

    /// Register a back-edge: `referrer_column` in `referrer_table` holds
    /// row-IDs of rows in `self`. Called by `Database` when it wires up a
    /// reference column; not reachable from `Table` alone since a single
    /// table has no name for the referrer it doesn't own.
    pub(crate) fn add_referrer(&mut self, edge: ReferrerEdge) {
        self.referrers.push(edge);
    }

    pub(crate) fn remove_referrer(&mut self, referrer_table: &str, referrer_column: &str) {
        self.referrers
            .retain(|e| !(e.referrer_table == referrer_table && e.referrer_column == referrer_column));
    }

    pub(crate) fn referrers(&self) -> &[ReferrerEdge] {
        &self.referrers
    }

    // ---- row lifecycle ----

    /// `key` must be non-N/A and absent when the table has a key column;
    /// N/A (unused) otherwise.
    fn check_key_precondition(&self, key: Option<&Value>) -> Result<()> {
        match self.key_column {
            Some(_) => {
                let key = key.ok_or(Error::NoKeyColumn)?;
                if key.is_na() {
                    return Err(Error::TypeError("key must be non-N/A".into()));
                }
                if self.find_row(key).is_some() {
                    return Err(Error::KeyDuplicate(format!("{key:?}")));
                }
                Ok(())
            }
            None => {
                if key.is_some_and(|k| !k.is_na()) {
                    return Err(Error::InvalidOperation(
                        "table has no key column but a key was supplied".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    pub fn insert_row(&mut self, key: Option<&Value>) -> Result<RowId> {
        self.check_key_precondition(key)?;
        let row_id = self.bitmap.find_next_row_id();
        self.reserve_and_validate(row_id, key)?;
        Ok(row_id)
    }

    pub fn insert_row_at(&mut self, row_id: RowId, key: Option<&Value>) -> Result<()> {
        self.check_key_precondition(key)?;
        if self.bitmap.test(row_id) {
            return Err(Error::AlreadyExists(format!("row {row_id}")));
        }
        self.reserve_and_validate(row_id, key)
    }

    fn reserve_and_validate(&mut self, row_id: RowId, key: Option<&Value>) -> Result<()> {
        self.bitmap.reserve(row_id)?;
        if let (Some(idx), Some(key)) = (self.key_column, key) {
            self.columns[idx].1.set_key(row_id, key)?;
        }
        self.bitmap.validate(row_id)
    }

    /// Insert a row with `key` if absent, or return the existing row.
    /// Returns `(row_id, inserted)`.
    pub fn find_or_insert_row(&mut self, key: &Value) -> Result<(RowId, bool)> {
        if let Some(row_id) = self.find_row(key) {
            return Ok((row_id, false));
        }
        let row_id = self.insert_row(Some(key))?;
        Ok((row_id, true))
    }

    /// Local removal primitive: unsets every column's cell and invalidates
    /// the row-ID. Does not check or clear referrer back-edges — see the
    /// struct docs and [`Database::remove_row`].
    pub fn remove_row(&mut self, row_id: RowId) -> Result<()> {
        if !self.bitmap.test(row_id) {
            return Err(Error::NotFound(format!("row {row_id}")));
        }
        for (_, col) in self.columns.iter_mut() {
            col.unset(row_id);
        }
        self.bitmap.invalidate(row_id);
        Ok(())
    }

    pub fn find_row(&self, key: &Value) -> Option<RowId> {
        let idx = self.key_column?;
        self.columns[idx].1.find_one(key)
    }

    /// Stop-at-first-failure bulk insert; returns the number of rows
    /// successfully inserted and the error that stopped it, if any.
    pub fn insert_rows<I>(&mut self, keys: I) -> (usize, Option<Error>)
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        let mut count = 0;
        for key in keys {
            match self.insert_row(key.as_ref()) {
                Ok(_) => count += 1,
                Err(e) => return (count, Some(e)),
            }
        }
        (count, None)
    }

    pub fn create_cursor(&self, options: CursorOptions) -> TableCursor<'_> {
        TableCursor::new(&self.bitmap, options)
    }
}

fn reindex_after_move(key_idx: usize, from: usize, to: usize) -> usize {
    if key_idx == from {
        return to;
    }
    if from < to {
        if key_idx > from && key_idx <= to {
            return key_idx - 1;
        }
    } else if key_idx >= to && key_idx < from {
        return key_idx + 1;
    }
    key_idx
}

/// An ordered, insertion-sensitive mapping from name to `Table`. Owns
/// every table exclusively; reference columns are non-owning back-edges
/// recorded on the target table, so cross-table coordination (reference
/// wiring, referrer-aware row removal) lives here rather than on `Table`.
#[derive(Debug, Clone, Default)]
pub struct Database {
    tables: Vec<(String, Table)>,
    path: Option<String>,
}

impl Database {
    /// An empty string means in-memory; a non-empty path is recorded but
    /// otherwise unused — persistent storage is an external collaborator.
    pub fn open_db(path: &str) -> Self {
        Self {
            tables: Vec::new(),
            path: if path.is_empty() { None } else { Some(path.to_string()) },
        }
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn create_table(&mut self, table_name: &str) -> Result<()> {
        if self.find_table(table_name).is_some() {
            return Err(Error::AlreadyExists(table_name.to_string()));
        }
        let table = Table::new(table_name)?;
        self.tables.push((table_name.to_string(), table));
        Ok(())
    }

    /// Fails while any non-self referrer back-edge is still registered on
    /// this table.
    pub fn remove_table(&mut self, table_name: &str) -> Result<()> {
        let idx = self
            .tables
            .iter()
            .position(|(n, _)| n == table_name)
            .ok_or_else(|| Error::NotFound(table_name.to_string()))?;
        let has_foreign_referrer = self.tables[idx]
            .1
            .referrers()
            .iter()
            .any(|e| e.referrer_table != table_name);
        if has_foreign_referrer {
            return Err(Error::NotRemovable(table_name.to_string()));
        }
        self.tables.remove(idx);
        Ok(())
    }

    pub fn rename_table(&mut self, old: &str, new: &str) -> Result<()> {
        name::validate(new)?;
        if self.find_table(new).is_some() {
            return Err(Error::AlreadyExists(new.to_string()));
        }
        let idx = self
            .tables
            .iter()
            .position(|(n, _)| n == old)
            .ok_or_else(|| Error::NotFound(old.to_string()))?;
        for (_, table) in self.tables.iter_mut() {
            for edge in table_referrers_mut(table) {
                if edge.referrer_table == old {
                    edge.referrer_table = new.to_string();
                }
            }
        }
        self.tables[idx].0 = new.to_string();
        self.tables[idx].1.name = new.to_string();
        Ok(())
    }

    pub fn reorder_table(&mut self, table_name: &str, new_index: usize) -> Result<()> {
        let idx = self
            .tables
            .iter()
            .position(|(n, _)| n == table_name)
            .ok_or_else(|| Error::NotFound(table_name.to_string()))?;
        if new_index >= self.tables.len() {
            return Err(Error::OutOfRange(format!(
                "index {new_index} out of range for {} tables",
                self.tables.len()
            )));
        }
        let entry = self.tables.remove(idx);
        self.tables.insert(new_index, entry);
        Ok(())
    }

    pub fn find_table(&self, table_name: &str) -> Option<&Table> {
        self.tables.iter().find(|(n, _)| n == table_name).map(|(_, t)| t)
    }

    pub fn find_table_mut(&mut self, table_name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|(n, _)| n == table_name).map(|(_, t)| t)
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    /// Create an `Int` reference column on `table` pointing at
    /// `target_table`, registering the back-edge on the target.
    pub fn create_reference_column(
        &mut self,
        table: &str,
        column: &str,
        target_table: &str,
    ) -> Result<()> {
        if self.find_table(target_table).is_none() {
            return Err(Error::NotFound(target_table.to_string()));
        }
        {
            let t = self
                .find_table_mut(table)
                .ok_or_else(|| Error::NotFound(table.to_string()))?;
            t.create_column(column, ValueKind::Int)?;
            let col = t.column_named_mut(column).unwrap();
            col.set_reference_table(Some(target_table.to_string()));
        }
        let target = self.find_table_mut(target_table).unwrap();
        target.add_referrer(ReferrerEdge {
            referrer_table: table.to_string(),
            referrer_column: column.to_string(),
        });
        Ok(())
    }

    /// Full-schema row removal: fails if a non-self referrer column is the
    /// key of its own table (clearing it would unresolve that key); on
    /// success, unsets the row locally and bulk-rewrites every referrer
    /// cell holding `row_id` to N/A.
    pub fn remove_row(&mut self, table_name: &str, row_id: RowId) -> Result<()> {
        let referrers = self
            .find_table(table_name)
            .ok_or_else(|| Error::NotFound(table_name.to_string()))?
            .referrers()
            .to_vec();

        for edge in &referrers {
            if edge.referrer_table == table_name {
                continue;
            }
            let referrer = self
                .find_table(&edge.referrer_table)
                .ok_or_else(|| Error::NotFound(edge.referrer_table.clone()))?;
            if let Some(col) = referrer.column_named(&edge.referrer_column) {
                if col.is_key() {
                    return Err(Error::NotRemovable(format!(
                        "{} references {} via key column {}",
                        edge.referrer_table, table_name, edge.referrer_column
                    )));
                }
            }
        }

        self.find_table_mut(table_name)
            .ok_or_else(|| Error::NotFound(table_name.to_string()))?
            .remove_row(row_id)?;

        for edge in &referrers {
            if let Some(referrer) = self.find_table_mut(&edge.referrer_table) {
                if let Some(col) = referrer.column_named_mut(&edge.referrer_column) {
                    clear_matching_cells(col, row_id);
                }
            }
        }
        Ok(())
    }
}

fn table_referrers_mut(table: &mut Table) -> &mut [ReferrerEdge] {
    &mut table.referrers
}

fn clear_matching_cells(col: &mut Column, row_id: RowId) {
    // A reference column is always `Int`-kind; scan its non-N/A cells and
    // null out any that point at the removed row.
    let target = Value::Int(row_id);
    for r in col.scan_row_ids_matching(&target) {
        col.unset(r);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lifecycle_scenario() {
        let mut t = Table::new("t").unwrap();
        t.create_column("v", ValueKind::Int).unwrap();
        let r0 = t.insert_row(None).unwrap();
        let r1 = t.insert_row(None).unwrap();
        let r2 = t.insert_row(None).unwrap();
        assert_eq!((r0, r1, r2), (0, 1, 2));
        t.remove_row(1).unwrap();
        assert!(!t.test_row(1));
        assert_eq!(t.num_rows(), 2);
        assert_eq!(t.max_row_id(), Some(2));
        let r = t.insert_row(None).unwrap();
        assert_eq!(r, 1);
    }

    #[test]
    fn key_round_trip() {
        let mut t = Table::new("t").unwrap();
        t.create_column("id", ValueKind::Int).unwrap();
        t.set_key_column("id").unwrap();
        let key = Value::Int(42);
        let row = t.insert_row(Some(&key)).unwrap();
        assert_eq!(t.find_row(&key), Some(row));
        t.remove_row(row).unwrap();
        assert_eq!(t.find_row(&key), None);
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut t = Table::new("t").unwrap();
        t.create_column("id", ValueKind::Int).unwrap();
        t.set_key_column("id").unwrap();
        t.insert_row(Some(&Value::Int(1))).unwrap();
        assert!(t.insert_row(Some(&Value::Int(1))).is_err());
    }

    #[test]
    fn remove_column_protects_key() {
        let mut t = Table::new("t").unwrap();
        t.create_column("id", ValueKind::Int).unwrap();
        t.set_key_column("id").unwrap();
        assert!(t.remove_column("id").is_err());
    }

    #[test]
    fn database_reference_back_edge_blocks_removal() {
        let mut db = Database::open_db("");
        db.create_table("parents").unwrap();
        db.create_table("children").unwrap();
        db.create_reference_column("children", "parent_id", "parents")
            .unwrap();
        assert!(db.remove_table("parents").is_err());
    }

    #[test]
    fn database_remove_row_clears_referrer_cells() {
        let mut db = Database::open_db("");
        db.create_table("parents").unwrap();
        db.create_table("children").unwrap();
        db.create_reference_column("children", "parent_id", "parents")
            .unwrap();
        let parent_row = db.find_table_mut("parents").unwrap().insert_row(None).unwrap();
        let child_row = db.find_table_mut("children").unwrap().insert_row(None).unwrap();
        db.find_table_mut("children")
            .unwrap()
            .column_named_mut("parent_id")
            .unwrap()
            .set(child_row, &Value::Int(parent_row))
            .unwrap();

        db.remove_row("parents", parent_row).unwrap();

        let cell = db
            .find_table("children")
            .unwrap()
            .column_named("parent_id")
            .unwrap()
            .get(child_row);
        assert!(cell.is_na());
    }
}
