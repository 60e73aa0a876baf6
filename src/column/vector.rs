//! Variable-length storage: a `Vec<CellHeader>` plus an append-only bodies
//! arena, per spec §4.E. Growth never compacts — dropped bodies are dead
//! weight until the column itself is dropped, matching the append-only
//! contract.

use crate::error::{Error, Result};
use crate::value::{Value, ValueKind};

/// `size == INLINE_LIMIT` marks "N/A"; otherwise `size` is the body length
/// in elements (bytes for `Text`, items for `Vector<T>`) and `offset`
/// indexes into the arena. The spec's further "size == 0xFFFF means an
/// 8-byte length precedes the body" indirection only matters once a body
/// would overflow a `u16`; we still honor it for `Text`, the one kind
/// whose bodies are routinely long.
const NA_SIZE: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, Default)]
struct CellHeader {
    offset: u32,
    size: u16,
}

impl CellHeader {
    const NA: CellHeader = CellHeader { offset: 0, size: NA_SIZE };

    fn is_na(&self) -> bool {
        self.size == NA_SIZE
    }
}

/// `Text` column: UTF-8 bodies arena with the overflow-length indirection.
#[derive(Debug, Clone, Default)]
pub struct TextColumn {
    headers: Vec<CellHeader>,
    bodies: Vec<u8>,
}

impl TextColumn {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_len(&mut self, row_id: usize) {
        if self.headers.len() <= row_id {
            self.headers.resize(row_id + 1, CellHeader::NA);
        }
    }

    pub fn get(&self, row_id: usize) -> Value {
        let Some(header) = self.headers.get(row_id) else {
            return Value::na(ValueKind::Text);
        };
        if header.is_na() {
            return Value::na(ValueKind::Text);
        }
        let len = self.body_len(*header);
        let start = self.body_start(*header);
        let bytes = &self.bodies[start..start + len];
        let s = String::from_utf8_lossy(bytes).into_owned();
        Value::Text(Some(s.into_boxed_str()))
    }

    pub fn set(&mut self, row_id: usize, value: &Value) -> Result<()> {
        self.ensure_len(row_id);
        match value {
            Value::Text(None) => {
                self.headers[row_id] = CellHeader::NA;
                Ok(())
            }
            Value::Text(Some(s)) => {
                let header = self.append(s.as_bytes());
                self.headers[row_id] = header;
                Ok(())
            }
            other => Err(Error::TypeError(format!(
                "expected Text, got {:?}",
                other.kind()
            ))),
        }
    }

    pub fn unset(&mut self, row_id: usize) {
        if let Some(h) = self.headers.get_mut(row_id) {
            *h = CellHeader::NA;
        }
    }

    pub fn iter_non_na(&self) -> impl Iterator<Item = (usize, Value)> + '_ {
        (0..self.headers.len()).filter_map(move |i| {
            let v = self.get(i);
            if v.is_na() {
                None
            } else {
                Some((i, v))
            }
        })
    }

    /// Append a body, choosing the inline or length-prefixed header form.
    fn append(&mut self, bytes: &[u8]) -> CellHeader {
        if bytes.len() < NA_SIZE as usize {
            let offset = self.bodies.len() as u32;
            self.bodies.extend_from_slice(bytes);
            CellHeader {
                offset,
                size: bytes.len() as u16,
            }
        } else {
            // size == u16::MAX - 1 is reserved to mean "8-byte length
            // precedes the body"; NA_SIZE itself stays exclusively N/A.
            let prefix_marker = NA_SIZE - 1;
            let offset = self.bodies.len() as u32;
            self.bodies.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
            self.bodies.extend_from_slice(bytes);
            CellHeader {
                offset,
                size: prefix_marker,
            }
        }
    }

    fn body_len(&self, header: CellHeader) -> usize {
        if header.size == NA_SIZE - 1 {
            let off = header.offset as usize;
            let len_bytes: [u8; 8] = self.bodies[off..off + 8].try_into().unwrap();
            u64::from_le_bytes(len_bytes) as usize
        } else {
            header.size as usize
        }
    }

    fn body_start(&self, header: CellHeader) -> usize {
        if header.size == NA_SIZE - 1 {
            header.offset as usize + 8
        } else {
            header.offset as usize
        }
    }
}

/// Generic fixed-width vector column: header-indexed spans into a flat
/// arena of `T`. Shared by `BoolVector`, `IntVector`, `FloatVector` and
/// `GeoPointVector`.
#[derive(Debug, Clone, Default)]
pub struct VectorColumn<T: Copy> {
    headers: Vec<CellHeader>,
    bodies: Vec<T>,
}

impl<T: Copy> VectorColumn<T> {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
            bodies: Vec::new(),
        }
    }

    fn ensure_len(&mut self, row_id: usize) {
        if self.headers.len() <= row_id {
            self.headers.resize(row_id + 1, CellHeader::NA);
        }
    }

    pub fn get_slice(&self, row_id: usize) -> Option<&[T]> {
        let header = self.headers.get(row_id)?;
        if header.is_na() {
            return None;
        }
        let start = header.offset as usize;
        let len = header.size as usize;
        Some(&self.bodies[start..start + len])
    }

    pub fn set_slice(&mut self, row_id: usize, items: Option<&[T]>) -> Result<()> {
        self.ensure_len(row_id);
        match items {
            None => {
                self.headers[row_id] = CellHeader::NA;
            }
            Some(items) => {
                if items.len() >= NA_SIZE as usize {
                    return Err(Error::OutOfRange(
                        "vector column element count exceeds representable span".to_string(),
                    ));
                }
                let offset = self.bodies.len() as u32;
                self.bodies.extend_from_slice(items);
                self.headers[row_id] = CellHeader {
                    offset,
                    size: items.len() as u16,
                };
            }
        }
        Ok(())
    }

    pub fn unset(&mut self, row_id: usize) {
        if let Some(h) = self.headers.get_mut(row_id) {
            *h = CellHeader::NA;
        }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }
}

/// `TextVector` column: each cell is a span of strings; strings are
/// themselves stored in a flat arena (no nested byte-packing — one level
/// of indirection is enough once each element is already heap-allocated).
#[derive(Debug, Clone, Default)]
pub struct TextVectorColumn {
    headers: Vec<CellHeader>,
    bodies: Vec<Box<str>>,
}

impl TextVectorColumn {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_len(&mut self, row_id: usize) {
        if self.headers.len() <= row_id {
            self.headers.resize(row_id + 1, CellHeader::NA);
        }
    }

    pub fn get(&self, row_id: usize) -> Value {
        let Some(header) = self.headers.get(row_id) else {
            return Value::na(ValueKind::TextVector);
        };
        if header.is_na() {
            return Value::na(ValueKind::TextVector);
        }
        let start = header.offset as usize;
        let len = header.size as usize;
        Value::TextVector(Some(self.bodies[start..start + len].to_vec()))
    }

    pub fn set(&mut self, row_id: usize, value: &Value) -> Result<()> {
        self.ensure_len(row_id);
        match value {
            Value::TextVector(None) => {
                self.headers[row_id] = CellHeader::NA;
                Ok(())
            }
            Value::TextVector(Some(items)) => {
                if items.len() >= NA_SIZE as usize {
                    return Err(Error::OutOfRange(
                        "text vector exceeds representable span".to_string(),
                    ));
                }
                let offset = self.bodies.len() as u32;
                self.bodies.extend_from_slice(items);
                self.headers[row_id] = CellHeader {
                    offset,
                    size: items.len() as u16,
                };
                Ok(())
            }
            other => Err(Error::TypeError(format!(
                "expected TextVector, got {:?}",
                other.kind()
            ))),
        }
    }

    pub fn unset(&mut self, row_id: usize) {
        if let Some(h) = self.headers.get_mut(row_id) {
            *h = CellHeader::NA;
        }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_roundtrip_small() {
        let mut col = TextColumn::new();
        col.set(0, &Value::Text(Some("hello".into()))).unwrap();
        assert_eq!(col.get(0), Value::Text(Some("hello".into())));
        assert!(col.get(1).is_na());
    }

    #[test]
    fn text_unset_then_get_na() {
        let mut col = TextColumn::new();
        col.set(0, &Value::Text(Some("a".into()))).unwrap();
        col.unset(0);
        assert!(col.get(0).is_na());
    }

    #[test]
    fn vector_column_roundtrip() {
        let mut col: VectorColumn<i64> = VectorColumn::new();
        col.set_slice(0, Some(&[1, 2, 3])).unwrap();
        assert_eq!(col.get_slice(0), Some(&[1i64, 2, 3][..]));
        col.unset(0);
        assert_eq!(col.get_slice(0), None);
    }

    #[test]
    fn text_vector_roundtrip() {
        let mut col = TextVectorColumn::new();
        let items: Vec<Box<str>> = vec!["a".into(), "b".into()];
        col.set(0, &Value::TextVector(Some(items.clone()))).unwrap();
        assert_eq!(col.get(0), Value::TextVector(Some(items)));
    }
}
