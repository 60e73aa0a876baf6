//! Sorter/Merger properties and literal scenarios (spec §8, scenarios 4-5).

use grnrs::{
    ExpressionBuilder, LogicalOp, MergeOptions, Merger, OrderType, Record, RecordArray, ScoreOp,
    Sorter, SorterOptions, SorterOrder, Table, Value, ValueKind,
};

fn order_by_column<'t>(t: &'t Table, name: &str, order: OrderType) -> SorterOrder<'t> {
    let mut b = ExpressionBuilder::new(t);
    b.column(name).unwrap();
    SorterOrder::new(b.release().unwrap(), order)
}

fn order_by_row_id(t: &Table, order: OrderType) -> SorterOrder<'_> {
    let mut b = ExpressionBuilder::new(t);
    b.row_id();
    SorterOrder::new(b.release().unwrap(), order)
}

#[test]
fn scenario_4_sort_with_tie_break() {
    let mut t = Table::new("t").unwrap();
    t.create_column("v", ValueKind::Int).unwrap();
    for i in 0..1024i64 {
        let row = t.insert_row(None).unwrap();
        t.get_column_mut(0).unwrap().set(row, &Value::Int(i % 64)).unwrap();
    }

    let orders = vec![
        order_by_column(&t, "v", OrderType::Regular),
        order_by_row_id(&t, OrderType::Regular),
    ];
    let sorter = Sorter::new(orders, SorterOptions::new(0, usize::MAX)).unwrap();
    let records: RecordArray = (0..1024i64).map(|i| Record::new(i, 0.0)).collect();
    let sorted = sorter.sort(&records).unwrap();

    let col = t.get_column(0).unwrap();
    for w in sorted.windows(2) {
        let a = col.get(w[0].row_id);
        let b = col.get(w[1].row_id);
        assert!(a <= b);
        if a == b {
            assert!(w[0].row_id < w[1].row_id);
        }
    }
}

#[test]
fn sort_idempotence_property() {
    let mut t = Table::new("t").unwrap();
    t.create_column("v", ValueKind::Int).unwrap();
    for v in [5, 1, 9, 1, 3, 3, 0] {
        let row = t.insert_row(None).unwrap();
        t.get_column_mut(0).unwrap().set(row, &Value::Int(v)).unwrap();
    }
    let records: RecordArray = (0..7i64).map(|i| Record::new(i, 0.0)).collect();

    let orders = vec![
        order_by_column(&t, "v", OrderType::Regular),
        order_by_row_id(&t, OrderType::Regular),
    ];
    let sorter = Sorter::new(orders, SorterOptions::new(0, usize::MAX)).unwrap();
    let once = sorter.sort(&records).unwrap();

    let orders2 = vec![
        order_by_column(&t, "v", OrderType::Regular),
        order_by_row_id(&t, OrderType::Regular),
    ];
    let sorter2 = Sorter::new(orders2, SorterOptions::new(0, usize::MAX)).unwrap();
    let twice = sorter2.sort(&once).unwrap();
    assert_eq!(once, twice);
}

fn records(pairs: &[(i64, f64)]) -> RecordArray {
    pairs.iter().map(|&(id, score)| Record::new(id, score)).collect()
}

#[test]
fn scenario_5_merger_and_with_plus() {
    let a = records(&[(1, 0.5), (2, 0.25)]);
    let b = records(&[(2, 1.0), (3, 0.75)]);

    let and_plus = Merger::new(MergeOptions::new(LogicalOp::And, ScoreOp::Plus));
    assert_eq!(and_plus.merge(&a, &b).into_vec(), vec![Record::new(2, 1.25)]);

    let or_plus = Merger::new(
        MergeOptions::new(LogicalOp::Or, ScoreOp::Plus).with_missing_score(0.0),
    );
    let mut or_result = or_plus.merge(&a, &b).into_vec();
    or_result.sort_by_key(|r| r.row_id);
    assert_eq!(
        or_result,
        vec![Record::new(1, 0.5), Record::new(2, 1.25), Record::new(3, 0.75)]
    );

    let minus = Merger::new(MergeOptions::new(LogicalOp::Minus, ScoreOp::Left));
    assert_eq!(minus.merge(&a, &b).into_vec(), vec![Record::new(1, 0.5)]);
}

#[test]
fn merger_set_laws() {
    let a = records(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]);
    let b = records(&[(2, 20.0), (3, 30.0), (5, 50.0)]);

    let or_ab = Merger::new(MergeOptions::new(LogicalOp::Or, ScoreOp::Plus)).merge(&a, &b);
    let or_ba = Merger::new(MergeOptions::new(LogicalOp::Or, ScoreOp::Plus)).merge(&b, &a);
    let mut ids_ab: Vec<_> = or_ab.row_ids().collect();
    let mut ids_ba: Vec<_> = or_ba.row_ids().collect();
    ids_ab.sort();
    ids_ba.sort();
    assert_eq!(ids_ab, ids_ba);

    let and = Merger::new(MergeOptions::new(LogicalOp::And, ScoreOp::Left)).merge(&a, &b);
    let a_ids: std::collections::HashSet<_> = a.row_ids().collect();
    for r in and.iter() {
        assert!(a_ids.contains(&r.row_id));
    }

    let minus = Merger::new(MergeOptions::new(LogicalOp::Minus, ScoreOp::Left)).merge(&a, &b);
    let mut union: Vec<_> = minus.row_ids().chain(and.row_ids()).collect();
    union.sort();
    assert_eq!(union, a.row_ids().collect::<Vec<_>>());
}
