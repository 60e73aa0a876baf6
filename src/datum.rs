//! Dynamic datum: the tagged-union currency of `Column::set`/`get` and
//! expression constants.
//!
//! `Value` is what operators compute over; `Datum` is the same
//! representation wearing the boundary hat — it is what crosses the
//! Column/Table/Expression API and carries the discriminator tag used by
//! `Column::set`'s type check.

use crate::value::{Value, ValueKind};

#[derive(Debug, Clone, PartialEq)]
pub struct Datum(Value);

impl Datum {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn na(kind: ValueKind) -> Self {
        Self(Value::na(kind))
    }

    pub fn kind(&self) -> ValueKind {
        self.0.kind()
    }

    pub fn is_na(&self) -> bool {
        self.0.is_na()
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Datum {
    fn from(v: Value) -> Self {
        Datum(v)
    }
}

impl From<Datum> for Value {
    fn from(d: Datum) -> Self {
        d.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Bool3;

    #[test]
    fn round_trips_kind() {
        let d = Datum::new(Value::Bool(Bool3::True));
        assert_eq!(d.kind(), ValueKind::Bool);
        assert!(!d.is_na());
    }

    #[test]
    fn na_datum_reports_kind_and_na() {
        let d = Datum::na(ValueKind::Text);
        assert_eq!(d.kind(), ValueKind::Text);
        assert!(d.is_na());
    }
}
