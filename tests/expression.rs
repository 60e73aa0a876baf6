//! Expression filter/evaluate properties (spec §8, scenario 3).

use grnrs::{Expression, ExpressionBuilder, Record, RecordArray, Table, Value, ValueKind};

fn eq_123(t: &Table) -> Expression<'_> {
    let mut b = ExpressionBuilder::new(t);
    b.column("v").unwrap();
    b.constant(Value::int(123).unwrap());
    b.push_eq().unwrap();
    b.release().unwrap()
}

#[test]
fn scenario_3_expression_filter() {
    let mut t = Table::new("t").unwrap();
    t.create_column("v", ValueKind::Int).unwrap();
    let r0 = t.insert_row(None).unwrap();
    let r1 = t.insert_row(None).unwrap();
    t.get_column_mut(0).unwrap().set(r0, &Value::int(123).unwrap()).unwrap();
    t.get_column_mut(0).unwrap().set(r1, &Value::int(456).unwrap()).unwrap();

    let expr = eq_123(&t);
    let records = RecordArray::from_vec(vec![Record::new(r0, 0.0), Record::new(r1, 0.0)]);
    let filtered = expr.filter(&records, 0, usize::MAX).unwrap();
    assert_eq!(filtered.row_ids().collect::<Vec<_>>(), vec![r0]);
}

#[test]
fn filter_idempotence_property() {
    let mut t = Table::new("t").unwrap();
    t.create_column("v", ValueKind::Int).unwrap();
    for i in 0..10i64 {
        let row = t.insert_row(None).unwrap();
        t.get_column_mut(0).unwrap().set(row, &Value::Int(i)).unwrap();
    }
    let mut b = ExpressionBuilder::new(&t);
    b.column("v").unwrap();
    b.constant(Value::Int(5));
    b.push_ge().unwrap();
    let expr = b.release().unwrap();

    let records: RecordArray = (0..10i64).map(|i| Record::new(i, 0.0)).collect();
    let once = expr.filter(&records, 0, usize::MAX).unwrap();
    let twice = expr.filter(&once, 0, usize::MAX).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn adjust_assigns_float_expression_to_score() {
    let mut t = Table::new("t").unwrap();
    t.create_column("weight", ValueKind::Float).unwrap();
    let row = t.insert_row(None).unwrap();
    t.get_column_mut(0).unwrap().set(row, &Value::float(2.5)).unwrap();

    let mut b = ExpressionBuilder::new(&t);
    b.column("weight").unwrap();
    b.constant(Value::float(1.0));
    b.push_add().unwrap();
    let expr = b.release().unwrap();
    assert_eq!(expr.kind(), ValueKind::Float);

    let mut records = RecordArray::from_vec(vec![Record::new(row, 0.0)]);
    expr.adjust(&mut records).unwrap();
    assert_eq!(records[0].score, 3.5);
}
