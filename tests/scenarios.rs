//! The six literal concrete scenarios in spec §8, run end-to-end against
//! the public API in one place.

use grnrs::{
    Bool3, Expression, ExpressionBuilder, LogicalOp, MergeOptions, Merger, OrderType, Record,
    RecordArray, ScoreOp, Sorter, SorterOptions, SorterOrder, Table, Value, ValueKind,
};

#[test]
fn scenario_1_row_lifecycle() {
    let mut t = Table::new("t").unwrap();
    assert_eq!(t.insert_row(None).unwrap(), 0);
    assert_eq!(t.insert_row(None).unwrap(), 1);
    assert_eq!(t.insert_row(None).unwrap(), 2);

    t.remove_row(1).unwrap();
    assert!(!t.test_row(1));
    assert_eq!(t.num_rows(), 2);
    assert_eq!(t.max_row_id(), Some(2));

    assert_eq!(t.insert_row(None).unwrap(), 1);
}

#[test]
fn scenario_2_mass_churn() {
    let mut t = Table::new("t").unwrap();
    let first: Vec<_> = (0..16384).map(|_| t.insert_row(None).unwrap()).collect();
    for id in &first {
        t.remove_row(*id).unwrap();
    }
    let second: Vec<_> = (0..16384).map(|_| t.insert_row(None).unwrap()).collect();
    assert_eq!(first, second);
    assert_eq!(t.num_rows(), 16384);
    assert_eq!(t.max_row_id(), Some(16383));
}

#[test]
fn scenario_3_expression_filter() {
    let mut t = Table::new("t").unwrap();
    t.create_column("IntColumn", ValueKind::Int).unwrap();
    let r0 = t.insert_row(None).unwrap();
    let r1 = t.insert_row(None).unwrap();
    t.get_column_mut(0).unwrap().set(r0, &Value::int(123).unwrap()).unwrap();
    t.get_column_mut(0).unwrap().set(r1, &Value::int(456).unwrap()).unwrap();

    let mut b = ExpressionBuilder::new(&t);
    b.column("IntColumn").unwrap();
    b.constant(Value::int(123).unwrap());
    b.push_eq().unwrap();
    let expr: Expression<'_> = b.release().unwrap();

    let records = RecordArray::from_vec(vec![Record::new(r0, 0.0), Record::new(r1, 0.0)]);
    let result = expr.filter(&records, 0, usize::MAX).unwrap();
    assert_eq!(result.row_ids().collect::<Vec<_>>(), vec![r0]);
}

#[test]
fn scenario_4_sort_with_tie_break() {
    let mut t = Table::new("t").unwrap();
    t.create_column("Int", ValueKind::Int).unwrap();
    for i in 0..1024i64 {
        let row = t.insert_row(None).unwrap();
        t.get_column_mut(0).unwrap().set(row, &Value::Int(i % 64)).unwrap();
    }

    let mut asc = ExpressionBuilder::new(&t);
    asc.column("Int").unwrap();
    let int_order = SorterOrder::new(asc.release().unwrap(), OrderType::Regular);

    let mut rid = ExpressionBuilder::new(&t);
    rid.row_id();
    let row_id_order = SorterOrder::new(rid.release().unwrap(), OrderType::Regular);

    let sorter = Sorter::new(vec![int_order, row_id_order], SorterOptions::new(0, usize::MAX)).unwrap();
    let records: RecordArray = (0..1024i64).map(|i| Record::new(i, 0.0)).collect();
    let sorted = sorter.sort(&records).unwrap();

    let col = t.get_column(0).unwrap();
    for w in sorted.windows(2) {
        let (va, vb) = (col.get(w[0].row_id), col.get(w[1].row_id));
        assert!(va <= vb);
        if va == vb {
            assert!(w[0].row_id < w[1].row_id);
        }
    }
}

#[test]
fn scenario_5_merger_and_with_plus() {
    let a: RecordArray = vec![Record::new(1, 0.5), Record::new(2, 0.25)].into_iter().collect();
    let b: RecordArray = vec![Record::new(2, 1.0), Record::new(3, 0.75)].into_iter().collect();

    let and_plus = Merger::new(MergeOptions::new(LogicalOp::And, ScoreOp::Plus)).merge(&a, &b);
    assert_eq!(and_plus.into_vec(), vec![Record::new(2, 1.25)]);

    let mut or_plus = Merger::new(
        MergeOptions::new(LogicalOp::Or, ScoreOp::Plus).with_missing_score(0.0),
    )
    .merge(&a, &b)
    .into_vec();
    or_plus.sort_by_key(|r| r.row_id);
    assert_eq!(
        or_plus,
        vec![Record::new(1, 0.5), Record::new(2, 1.25), Record::new(3, 0.75)]
    );

    let minus = Merger::new(MergeOptions::new(LogicalOp::Minus, ScoreOp::Left)).merge(&a, &b);
    assert_eq!(minus.into_vec(), vec![Record::new(1, 0.5)]);
}

#[test]
fn scenario_6_bool_three_value_logic() {
    assert_eq!(Bool3::True.and(Bool3::Na), Bool3::Na);
    assert_eq!(Bool3::False.and(Bool3::Na), Bool3::False);
    assert_eq!(Bool3::True.or(Bool3::Na), Bool3::True);
    assert_eq!(Bool3::False.or(Bool3::Na), Bool3::Na);
    assert_eq!(Bool3::Na.xor(Bool3::Na), Bool3::Na);
}
