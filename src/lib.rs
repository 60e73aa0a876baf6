//! grnrs - a columnar in-memory relational core.
//!
//! Rows are identified by a dense, reusable `row_id` managed by a
//! hierarchical bitmap; columns are typed, dispatch-by-variant storage with
//! a dedicated N/A sentinel per kind rather than `Option<T>` wrappers
//! (`Text`/vector kinds are the exception, where N/A already has no
//! compact in-band encoding to reclaim). `Database`/`Table`/`Column` form
//! the catalog; `Expression`, `Sorter`, and `Merger` are the three record
//! pipeline stages a caller composes to filter, score, order, and combine
//! row batches.

#![allow(dead_code)]

pub mod bitmap;
pub mod column;
pub mod cursor;
pub mod datum;
pub mod error;
pub mod expr;
pub mod index;
pub mod merge;
pub mod record;
pub mod sort;
pub mod table;
pub mod util;
pub mod value;

pub use column::Column;
pub use cursor::{Cursor, CursorOptions, IdsCursor, OrderType, TableCursor};
pub use datum::Datum;
pub use error::{Error, Result};
pub use expr::{BinaryOp, Expression, ExpressionBuilder, UnaryOp};
pub use index::{Bound, EndPoint, HashIndex, Index, TreeIndex};
pub use merge::{LogicalOp, MergeOptions, Merger, ScoreOp};
pub use record::{Record, RecordArray, RowId};
pub use sort::{Sorter, SorterOptions, SorterOrder};
pub use table::{Database, Table};
pub use value::{Bool3, GeoPoint, Value, ValueKind};
