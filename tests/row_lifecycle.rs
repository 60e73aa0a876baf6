//! Row/bitmap lifecycle scenarios (spec §8, scenarios 1-2).

use grnrs::{Table, Value};

#[test]
fn scenario_1_row_lifecycle() {
    let mut t = Table::new("t").unwrap();
    let r0 = t.insert_row(None).unwrap();
    let r1 = t.insert_row(None).unwrap();
    let r2 = t.insert_row(None).unwrap();
    assert_eq!((r0, r1, r2), (0, 1, 2));

    t.remove_row(1).unwrap();
    assert!(!t.test_row(1));
    assert_eq!(t.num_rows(), 2);
    assert_eq!(t.max_row_id(), Some(2));

    let reused = t.insert_row(None).unwrap();
    assert_eq!(reused, 1);
}

#[test]
fn scenario_2_mass_churn() {
    let mut t = Table::new("t").unwrap();
    let mut ids = Vec::new();
    for _ in 0..16384 {
        ids.push(t.insert_row(None).unwrap());
    }
    assert_eq!(ids, (0..16384).collect::<Vec<_>>());

    for &id in &ids {
        t.remove_row(id).unwrap();
    }
    assert_eq!(t.num_rows(), 0);

    let mut ids2 = Vec::new();
    for _ in 0..16384 {
        ids2.push(t.insert_row(None).unwrap());
    }
    assert_eq!(ids2, (0..16384).collect::<Vec<_>>());
    assert_eq!(t.num_rows(), 16384);
    assert_eq!(t.max_row_id(), Some(16383));
}

#[test]
fn key_round_trip_via_find_row() {
    let mut t = Table::new("t").unwrap();
    t.create_column("k", grnrs::ValueKind::Int).unwrap();
    t.set_key_column("k").unwrap();

    let key = Value::int(42).unwrap();
    let row = t.insert_row(Some(&key)).unwrap();
    assert_eq!(t.find_row(&key), Some(row));

    t.remove_row(row).unwrap();
    assert_eq!(t.find_row(&key), None);
}
