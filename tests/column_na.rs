//! N/A round-trip properties across column kinds (spec §8).

use grnrs::{Bool3, GeoPoint, Table, Value, ValueKind};

fn round_trip(kind: ValueKind, value: Value) {
    let mut t = Table::new("t").unwrap();
    t.create_column("c", kind).unwrap();
    let row = t.insert_row(None).unwrap();

    assert!(t.get_column(0).unwrap().get(row).is_na());

    t.get_column_mut(0).unwrap().set(row, &value).unwrap();
    assert!(!t.get_column(0).unwrap().get(row).is_na());

    t.get_column_mut(0).unwrap().unset(row);
    assert!(t.get_column(0).unwrap().get(row).is_na());
}

#[test]
fn bool_round_trips_through_na() {
    round_trip(ValueKind::Bool, Value::Bool(Bool3::True));
}

#[test]
fn int_round_trips_through_na() {
    round_trip(ValueKind::Int, Value::int(7).unwrap());
}

#[test]
fn float_round_trips_through_na() {
    round_trip(ValueKind::Float, Value::float(1.5));
}

#[test]
fn geo_point_round_trips_through_na() {
    round_trip(ValueKind::GeoPoint, Value::GeoPoint(GeoPoint::new(1, 2)));
}

#[test]
fn text_round_trips_through_na() {
    round_trip(ValueKind::Text, Value::Text(Some("hi".into())));
}

#[test]
fn int_vector_round_trips_through_na() {
    round_trip(ValueKind::IntVector, Value::IntVector(Some(vec![1, 2, 3])));
}

#[test]
fn unset_row_on_fresh_column_is_na() {
    let mut t = Table::new("t").unwrap();
    t.create_column("c", ValueKind::Int).unwrap();
    let row = t.insert_row(None).unwrap();
    assert!(t.get_column(0).unwrap().get(row).is_na());
}
