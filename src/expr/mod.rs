//! Expression + Builder: a postfix-built, typed tree that filters,
//! scores, and projects batches of records, per spec §4.I.
//!
//! `ExpressionBuilder` is the compiler; `Expression` is the compiled,
//! immutable program. This is the direct structural analog of the
//! teacher's `ExprCompiler` — a postfix accumulator that type-checks at
//! push time — generalized from "emit VDBE opcodes with register
//! allocation" to "build a tree evaluated directly over column batches",
//! since this engine has no bytecode VM to target.

use crate::error::{Error, Result};
use crate::record::{Record, RecordArray};
use crate::table::Table;
use crate::value::{Value, ValueKind};

/// Sub-batch size the engine evaluates in, bounding scratch-buffer size
/// regardless of total batch length.
pub const BLOCK_SIZE: usize = 1024;

pub fn block_size() -> usize {
    BLOCK_SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    BitNot,
    Pos,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
}

/// One node of the compiled tree. Column references are resolved to an
/// index at build time, so evaluation never repeats a name lookup.
#[derive(Debug, Clone)]
pub enum Node {
    Constant(Value),
    RowId,
    Score,
    Column(usize),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
}

/// Accumulates postfix nodes against one table, type-checking each push.
pub struct ExpressionBuilder<'t> {
    table: &'t Table,
    stack: Vec<(Node, ValueKind)>,
    open_brackets: usize,
}

impl<'t> ExpressionBuilder<'t> {
    pub fn new(table: &'t Table) -> Self {
        Self {
            table,
            stack: Vec::new(),
            open_brackets: 0,
        }
    }

    pub fn constant(&mut self, value: Value) {
        let kind = value.kind();
        self.stack.push((Node::Constant(value), kind));
    }

    pub fn row_id(&mut self) {
        self.stack.push((Node::RowId, ValueKind::Int));
    }

    pub fn score(&mut self) {
        self.stack.push((Node::Score, ValueKind::Float));
    }

    pub fn column(&mut self, name: &str) -> Result<()> {
        let idx = self
            .table
            .find_column(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let kind = self.table.get_column(idx).unwrap().kind();
        self.stack.push((Node::Column(idx), kind));
        Ok(())
    }

    /// Bracket markers for grouped, N-ary argument lists. The closed
    /// operator set in this spec has no variadic operator yet; kept for
    /// forward compatibility, since `release()` validates bracket
    /// balance regardless of whether anything currently opens one.
    pub fn begin_subexpression(&mut self) {
        self.open_brackets += 1;
    }

    pub fn end_subexpression(&mut self) -> Result<()> {
        if self.open_brackets == 0 {
            return Err(Error::MalformedExpression(
                "end_subexpression with no matching begin_subexpression".into(),
            ));
        }
        self.open_brackets -= 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<(Node, ValueKind)> {
        self.stack
            .pop()
            .ok_or_else(|| Error::MalformedExpression("operator with no operand".into()))
    }

    fn push_unary(&mut self, op: UnaryOp, result_kind: ValueKind, node: Node) {
        self.stack.push((Node::Unary(op, Box::new(node)), result_kind));
    }

    fn push_binary(&mut self, op: BinaryOp, result_kind: ValueKind, a: Node, b: Node) {
        self.stack
            .push((Node::Binary(op, Box::new(a), Box::new(b)), result_kind));
    }

    pub fn push_not(&mut self) -> Result<()> {
        let (node, kind) = self.pop()?;
        if kind != ValueKind::Bool {
            return Err(type_error("NOT", kind));
        }
        self.push_unary(UnaryOp::Not, ValueKind::Bool, node);
        Ok(())
    }

    pub fn push_bitnot(&mut self) -> Result<()> {
        let (node, kind) = self.pop()?;
        match kind {
            ValueKind::Bool | ValueKind::Int => {
                self.push_unary(UnaryOp::BitNot, kind, node);
                Ok(())
            }
            _ => Err(type_error("BITNOT", kind)),
        }
    }

    pub fn push_pos(&mut self) -> Result<()> {
        let (node, kind) = self.pop()?;
        match kind {
            ValueKind::Int | ValueKind::Float => {
                self.push_unary(UnaryOp::Pos, kind, node);
                Ok(())
            }
            _ => Err(type_error("unary +", kind)),
        }
    }

    pub fn push_neg(&mut self) -> Result<()> {
        let (node, kind) = self.pop()?;
        match kind {
            ValueKind::Int | ValueKind::Float => {
                self.push_unary(UnaryOp::Neg, kind, node);
                Ok(())
            }
            _ => Err(type_error("unary -", kind)),
        }
    }

    fn pop_pair(&mut self) -> Result<((Node, ValueKind), (Node, ValueKind))> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    /// AND/OR/XOR: Kleene logic on `Bool`, bitwise on `Int`; same kind
    /// both sides (`Value::and`/`or`/`xor` already dispatch on payload).
    fn push_logical(&mut self, op: BinaryOp, name: &str) -> Result<()> {
        let ((a, ak), (b, bk)) = self.pop_pair()?;
        if ak != bk || !matches!(ak, ValueKind::Bool | ValueKind::Int) {
            return Err(binary_type_error(name, ak, bk));
        }
        self.push_binary(op, ak, a, b);
        Ok(())
    }

    pub fn push_and(&mut self) -> Result<()> {
        self.push_logical(BinaryOp::And, "AND")
    }

    pub fn push_or(&mut self) -> Result<()> {
        self.push_logical(BinaryOp::Or, "OR")
    }

    pub fn push_xor(&mut self) -> Result<()> {
        self.push_logical(BinaryOp::Xor, "XOR")
    }

    /// Comparisons: same kind both sides, over any kind `Value::matches`'
    /// ordering supports (`Bool`, `Int`, `Float`, `GeoPoint`, `Text`).
    fn push_comparison(&mut self, op: BinaryOp, name: &str) -> Result<()> {
        let ((a, ak), (b, bk)) = self.pop_pair()?;
        if ak != bk
            || matches!(
                ak,
                ValueKind::BoolVector
                    | ValueKind::IntVector
                    | ValueKind::FloatVector
                    | ValueKind::GeoPointVector
                    | ValueKind::TextVector
            )
        {
            return Err(binary_type_error(name, ak, bk));
        }
        self.push_binary(op, ValueKind::Bool, a, b);
        Ok(())
    }

    pub fn push_eq(&mut self) -> Result<()> {
        self.push_comparison(BinaryOp::Eq, "==")
    }

    pub fn push_ne(&mut self) -> Result<()> {
        self.push_comparison(BinaryOp::Ne, "!=")
    }

    pub fn push_lt(&mut self) -> Result<()> {
        self.push_comparison(BinaryOp::Lt, "<")
    }

    pub fn push_le(&mut self) -> Result<()> {
        self.push_comparison(BinaryOp::Le, "<=")
    }

    pub fn push_gt(&mut self) -> Result<()> {
        self.push_comparison(BinaryOp::Gt, ">")
    }

    pub fn push_ge(&mut self) -> Result<()> {
        self.push_comparison(BinaryOp::Ge, ">=")
    }

    /// Arithmetic: `Int` or `Float`, same kind both sides.
    fn push_arith(&mut self, op: BinaryOp, name: &str) -> Result<()> {
        let ((a, ak), (b, bk)) = self.pop_pair()?;
        if ak != bk || !matches!(ak, ValueKind::Int | ValueKind::Float) {
            return Err(binary_type_error(name, ak, bk));
        }
        self.push_binary(op, ak, a, b);
        Ok(())
    }

    pub fn push_add(&mut self) -> Result<()> {
        self.push_arith(BinaryOp::Add, "+")
    }

    pub fn push_sub(&mut self) -> Result<()> {
        self.push_arith(BinaryOp::Sub, "-")
    }

    pub fn push_mul(&mut self) -> Result<()> {
        self.push_arith(BinaryOp::Mul, "*")
    }

    pub fn push_div(&mut self) -> Result<()> {
        self.push_arith(BinaryOp::Div, "/")
    }

    pub fn push_rem(&mut self) -> Result<()> {
        self.push_arith(BinaryOp::Rem, "%")
    }

    /// Shifts: `Int` shifted by `Int`.
    fn push_shift(&mut self, op: BinaryOp, name: &str) -> Result<()> {
        let ((a, ak), (b, bk)) = self.pop_pair()?;
        if ak != ValueKind::Int || bk != ValueKind::Int {
            return Err(binary_type_error(name, ak, bk));
        }
        self.push_binary(op, ValueKind::Int, a, b);
        Ok(())
    }

    pub fn push_shl(&mut self) -> Result<()> {
        self.push_shift(BinaryOp::Shl, "<<")
    }

    pub fn push_shr(&mut self) -> Result<()> {
        self.push_shift(BinaryOp::Shr, ">>")
    }

    pub fn push_ushr(&mut self) -> Result<()> {
        self.push_shift(BinaryOp::Ushr, ">>>")
    }

    /// Validates exactly one node remains and every bracket closed, then
    /// hands over the accumulated tree as an immutable `Expression`.
    pub fn release(mut self) -> Result<Expression<'t>> {
        if self.open_brackets != 0 {
            return Err(Error::MalformedExpression(
                "unbalanced begin_subexpression/end_subexpression".into(),
            ));
        }
        if self.stack.len() != 1 {
            return Err(Error::MalformedExpression(format!(
                "expected exactly one node at release, found {}",
                self.stack.len()
            )));
        }
        let (root, kind) = self.stack.pop().unwrap();
        Ok(Expression {
            table: self.table,
            root,
            kind,
        })
    }
}

fn type_error(op: &str, kind: ValueKind) -> Error {
    Error::TypeError(format!("{op} not defined on {kind:?}"))
}

fn binary_type_error(op: &str, a: ValueKind, b: ValueKind) -> Error {
    Error::TypeError(format!("{op} not defined on ({a:?}, {b:?})"))
}

/// A compiled, immutable expression tree bound to one table.
pub struct Expression<'t> {
    table: &'t Table,
    root: Node,
    kind: ValueKind,
}

impl<'t> Expression<'t> {
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The table this expression was built against. Used by `Sorter` to
    /// check that every order shares one table.
    pub(crate) fn table(&self) -> &'t Table {
        self.table
    }

    /// The root node, exposed so `Sorter` can special-case the `row_id`/
    /// `score` fast paths without re-evaluating the general tree walker.
    pub(crate) fn root(&self) -> &Node {
        &self.root
    }

    /// Evaluate the top node as `Bool` over `records`, keeping rows where
    /// it is true; `offset` skips that many initial keeps, `limit` caps
    /// the total kept.
    pub fn filter(&self, records: &RecordArray, offset: usize, limit: usize) -> Result<RecordArray> {
        if self.kind != ValueKind::Bool {
            return Err(Error::TypeError(format!(
                "filter requires a Bool expression, got {:?}",
                self.kind
            )));
        }
        let mut kept = Vec::new();
        let mut skipped = 0usize;
        'blocks: for block in records.chunks(BLOCK_SIZE) {
            let values = eval_block(&self.root, self.table, block)?;
            for (record, value) in block.iter().zip(values.iter()) {
                let Value::Bool(b) = value else {
                    unreachable!("filter expression type-checked as Bool at build time")
                };
                if !b.is_true() {
                    continue;
                }
                if skipped < offset {
                    skipped += 1;
                    continue;
                }
                if kept.len() >= limit {
                    break 'blocks;
                }
                kept.push(*record);
            }
        }
        Ok(RecordArray::from_vec(kept))
    }

    /// Evaluate the top node as `Float` over `records`, assigning each
    /// result to the corresponding record's score.
    pub fn adjust(&self, records: &mut RecordArray) -> Result<()> {
        if self.kind != ValueKind::Float {
            return Err(Error::TypeError(format!(
                "adjust requires a Float expression, got {:?}",
                self.kind
            )));
        }
        let mut scores = Vec::with_capacity(records.len());
        for block in records.chunks(BLOCK_SIZE) {
            let values = eval_block(&self.root, self.table, block)?;
            for value in values {
                let Value::Float(score) = value else {
                    unreachable!("adjust expression type-checked as Float at build time")
                };
                scores.push(score);
            }
        }
        for (record, score) in records.iter_mut().zip(scores) {
            record.score = score;
        }
        Ok(())
    }

    /// Evaluate the top node over `records`, writing one value per record
    /// into `out` (cleared first).
    pub fn evaluate(&self, records: &RecordArray, out: &mut Vec<Value>) -> Result<()> {
        out.clear();
        out.reserve(records.len());
        for block in records.chunks(BLOCK_SIZE) {
            let values = eval_block(&self.root, self.table, block)?;
            out.extend(values);
        }
        Ok(())
    }
}

fn eval_block(node: &Node, table: &Table, block: &[Record]) -> Result<Vec<Value>> {
    match node {
        Node::Constant(v) => Ok(std::iter::repeat(v.clone()).take(block.len()).collect()),
        Node::RowId => Ok(block.iter().map(|r| Value::Int(r.row_id)).collect()),
        Node::Score => Ok(block.iter().map(|r| Value::float(r.score)).collect()),
        Node::Column(idx) => {
            let col = table
                .get_column(*idx)
                .expect("column index resolved at build time against the same table");
            Ok(block.iter().map(|r| col.get(r.row_id)).collect())
        }
        Node::Unary(op, child) => {
            let values = eval_block(child, table, block)?;
            values.iter().map(|v| apply_unary(*op, v)).collect()
        }
        Node::Binary(op, a, b) => {
            let av = eval_block(a, table, block)?;
            let bv = eval_block(b, table, block)?;
            av.iter()
                .zip(bv.iter())
                .map(|(a, b)| apply_binary(*op, a, b))
                .collect()
        }
    }
}

fn apply_unary(op: UnaryOp, v: &Value) -> Result<Value> {
    match op {
        UnaryOp::Not => v.not(),
        UnaryOp::BitNot => v.bitnot(),
        UnaryOp::Pos => v.pos(),
        UnaryOp::Neg => v.neg(),
    }
}

fn apply_binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    match op {
        BinaryOp::And => a.and(b),
        BinaryOp::Or => a.or(b),
        BinaryOp::Xor => a.xor(b),
        BinaryOp::Eq => a.eq_op(b),
        BinaryOp::Ne => a.ne_op(b),
        BinaryOp::Lt => a.lt(b),
        BinaryOp::Le => a.le(b),
        BinaryOp::Gt => a.gt(b),
        BinaryOp::Ge => a.ge(b),
        BinaryOp::Add => a.add(b),
        BinaryOp::Sub => a.sub(b),
        BinaryOp::Mul => a.mul(b),
        BinaryOp::Div => a.div(b),
        BinaryOp::Rem => a.rem(b),
        BinaryOp::Shl => a.shl(b),
        BinaryOp::Shr => a.shr(b),
        BinaryOp::Ushr => a.ushr(b),
    }
}
