//! The closed set of scalar/vector values, their N/A semantics, and the
//! operator algebra defined over them (spec section "Value types").
//!
//! N/A propagates through nearly every operator; the two exceptions are
//! logical AND/OR, which use Kleene three-valued logic. Arithmetic domain
//! errors (overflow, division by zero, out-of-range shifts) are never
//! `Err` — they fold to the N/A value of the result kind.

use crate::error::{Error, Result};

/// Three-valued boolean: `false` (bits 0), `true` (bits 3), `N/A` (bits 1).
/// No other bit pattern is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bool3 {
    False,
    True,
    Na,
}

impl Bool3 {
    pub fn is_na(self) -> bool {
        matches!(self, Bool3::Na)
    }

    pub fn is_true(self) -> bool {
        matches!(self, Bool3::True)
    }

    pub fn bits(self) -> u8 {
        match self {
            Bool3::False => 0,
            Bool3::Na => 1,
            Bool3::True => 3,
        }
    }

    pub fn from_bits(bits: u8) -> Option<Bool3> {
        match bits {
            0 => Some(Bool3::False),
            3 => Some(Bool3::True),
            1 => Some(Bool3::Na),
            _ => None,
        }
    }

    pub fn not(self) -> Bool3 {
        match self {
            Bool3::False => Bool3::True,
            Bool3::True => Bool3::False,
            Bool3::Na => Bool3::Na,
        }
    }

    /// Kleene AND: `false AND N/A = false`.
    pub fn and(self, other: Bool3) -> Bool3 {
        match (self, other) {
            (Bool3::False, _) | (_, Bool3::False) => Bool3::False,
            (Bool3::Na, _) | (_, Bool3::Na) => Bool3::Na,
            (Bool3::True, Bool3::True) => Bool3::True,
        }
    }

    /// Kleene OR: `true OR N/A = true`.
    pub fn or(self, other: Bool3) -> Bool3 {
        match (self, other) {
            (Bool3::True, _) | (_, Bool3::True) => Bool3::True,
            (Bool3::Na, _) | (_, Bool3::Na) => Bool3::Na,
            (Bool3::False, Bool3::False) => Bool3::False,
        }
    }

    /// XOR propagates N/A like every other non-Kleene operator.
    pub fn xor(self, other: Bool3) -> Bool3 {
        match (self, other) {
            (Bool3::Na, _) | (_, Bool3::Na) => Bool3::Na,
            (a, b) => {
                if a.is_true() != b.is_true() {
                    Bool3::True
                } else {
                    Bool3::False
                }
            }
        }
    }

    /// Reflexive `match` semantics: N/A matches N/A.
    pub fn matches(self, other: Bool3) -> bool {
        self == other
    }

    /// Ordering for sort keys: false < true < N/A.
    fn order_key(self) -> u8 {
        match self {
            Bool3::False => 0,
            Bool3::True => 1,
            Bool3::Na => 2,
        }
    }
}

/// A geographic point in micro-degrees. N/A iff `lat == i32::MIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeoPoint {
    pub lat: i32,
    pub lng: i32,
}

impl GeoPoint {
    pub fn new(lat: i32, lng: i32) -> Self {
        Self { lat, lng }
    }

    pub fn na() -> Self {
        Self {
            lat: i32::MIN,
            lng: 0,
        }
    }

    pub fn is_na(self) -> bool {
        self.lat == i32::MIN
    }
}

/// The 64-bit IEEE-754 bit pattern reserved for N/A: a quiet NaN with an
/// all-zero mantissa beyond the quiet bit and a clear sign bit, chosen so
/// it is distinguishable from any NaN arithmetic would otherwise produce.
const FLOAT_NA_BITS: u64 = 0x7FF8_0000_0000_0001;

pub(crate) fn float_na() -> f64 {
    f64::from_bits(FLOAT_NA_BITS)
}

pub(crate) fn is_float_na(v: f64) -> bool {
    v.to_bits() == FLOAT_NA_BITS
}

/// Fold a computed float result to the canonical N/A representation if
/// the computation produced any NaN (e.g. `0.0 / 0.0`).
fn float_result(v: f64) -> f64 {
    if v.is_nan() {
        float_na()
    } else {
        v
    }
}

/// Discriminator tag for the closed value set, matching the boundary
/// discriminator in spec section "External interfaces".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Na,
    Bool,
    Int,
    Float,
    GeoPoint,
    Text,
    BoolVector,
    IntVector,
    FloatVector,
    GeoPointVector,
    TextVector,
}

/// The closed set of scalar/vector values.
///
/// Fixed-width scalar kinds (`Bool`, `Int`, `Float`, `GeoPoint`) encode
/// N/A as a distinguished bit pattern within their own payload, per spec.
/// `Text` and the vector kinds have no such compact encoding at this
/// logical layer (that trick lives one layer down, in the column cell
/// header format); here N/A is simply the absence of a payload.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(Bool3),
    Int(i64),
    Float(f64),
    GeoPoint(GeoPoint),
    Text(Option<Box<str>>),
    BoolVector(Option<Vec<Bool3>>),
    IntVector(Option<Vec<i64>>),
    FloatVector(Option<Vec<f64>>),
    GeoPointVector(Option<Vec<GeoPoint>>),
    TextVector(Option<Vec<Box<str>>>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::GeoPoint(_) => ValueKind::GeoPoint,
            Value::Text(_) => ValueKind::Text,
            Value::BoolVector(_) => ValueKind::BoolVector,
            Value::IntVector(_) => ValueKind::IntVector,
            Value::FloatVector(_) => ValueKind::FloatVector,
            Value::GeoPointVector(_) => ValueKind::GeoPointVector,
            Value::TextVector(_) => ValueKind::TextVector,
        }
    }

    pub fn is_na(&self) -> bool {
        match self {
            Value::Bool(b) => b.is_na(),
            Value::Int(i) => *i == i64::MIN,
            Value::Float(f) => is_float_na(*f),
            Value::GeoPoint(g) => g.is_na(),
            Value::Text(t) => t.is_none(),
            Value::BoolVector(v) => v.is_none(),
            Value::IntVector(v) => v.is_none(),
            Value::FloatVector(v) => v.is_none(),
            Value::GeoPointVector(v) => v.is_none(),
            Value::TextVector(v) => v.is_none(),
        }
    }

    /// The N/A value of the same kind as `self`.
    pub fn na_like(&self) -> Value {
        Value::na(self.kind())
    }

    pub fn na(kind: ValueKind) -> Value {
        match kind {
            ValueKind::Na => Value::Int(i64::MIN),
            ValueKind::Bool => Value::Bool(Bool3::Na),
            ValueKind::Int => Value::Int(i64::MIN),
            ValueKind::Float => Value::Float(float_na()),
            ValueKind::GeoPoint => Value::GeoPoint(GeoPoint::na()),
            ValueKind::Text => Value::Text(None),
            ValueKind::BoolVector => Value::BoolVector(None),
            ValueKind::IntVector => Value::IntVector(None),
            ValueKind::FloatVector => Value::FloatVector(None),
            ValueKind::GeoPointVector => Value::GeoPointVector(None),
            ValueKind::TextVector => Value::TextVector(None),
        }
    }

    /// Construct a non-N/A integer; `i64::MIN` is reserved and rejected.
    pub fn int(v: i64) -> Result<Value> {
        if v == i64::MIN {
            return Err(Error::OutOfRange(
                "i64::MIN is reserved for N/A".to_string(),
            ));
        }
        Ok(Value::Int(v))
    }

    pub fn float(v: f64) -> Value {
        Value::Float(float_result(v))
    }

    /// `match`: reflexive across N/A, identifies +0.0 with -0.0. Distinct
    /// from `==`, which follows standard (non-reflexive-on-NaN) rules.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.matches(*b),
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                match (is_float_na(*a), is_float_na(*b)) {
                    (true, true) => true,
                    (true, false) | (false, true) => false,
                    (false, false) => a == b, // +0.0 == -0.0 already under IEEE ==
                }
            }
            (Value::GeoPoint(a), Value::GeoPoint(b)) => match (a.is_na(), b.is_na()) {
                (true, true) => true,
                (true, false) | (false, true) => false,
                (false, false) => a == b,
            },
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::BoolVector(a), Value::BoolVector(b)) => a == b,
            (Value::IntVector(a), Value::IntVector(b)) => a == b,
            (Value::FloatVector(a), Value::FloatVector(b)) => a == b,
            (Value::GeoPointVector(a), Value::GeoPointVector(b)) => a == b,
            (Value::TextVector(a), Value::TextVector(b)) => a == b,
            _ => false,
        }
    }

    fn type_error(op: &str, a: &Value, b: &Value) -> Error {
        Error::TypeError(format!(
            "cannot apply {op} to {:?} and {:?}",
            a.kind(),
            b.kind()
        ))
    }

    // ---- unary ----

    pub fn not(&self) -> Result<Value> {
        match self {
            Value::Bool(b) => Ok(Value::Bool(b.not())),
            _ => Err(Error::TypeError(format!("NOT on {:?}", self.kind()))),
        }
    }

    pub fn bitnot(&self) -> Result<Value> {
        match self {
            Value::Bool(b) => Ok(Value::Bool(b.not())),
            Value::Int(i) => {
                if *i == i64::MIN {
                    Ok(Value::Int(i64::MIN))
                } else {
                    Ok(Value::Int(!*i))
                }
            }
            _ => Err(Error::TypeError(format!("BITNOT on {:?}", self.kind()))),
        }
    }

    pub fn pos(&self) -> Result<Value> {
        match self {
            Value::Int(_) | Value::Float(_) => Ok(self.clone()),
            _ => Err(Error::TypeError(format!("unary + on {:?}", self.kind()))),
        }
    }

    pub fn neg(&self) -> Result<Value> {
        match self {
            Value::Int(i) => {
                if *i == i64::MIN {
                    Ok(Value::Int(i64::MIN))
                } else {
                    match i.checked_neg() {
                        Some(v) if v != i64::MIN => Ok(Value::Int(v)),
                        _ => Ok(Value::Int(i64::MIN)),
                    }
                }
            }
            Value::Float(f) => {
                if is_float_na(*f) {
                    Ok(Value::Float(float_na()))
                } else {
                    Ok(Value::float(-*f))
                }
            }
            _ => Err(Error::TypeError(format!("unary - on {:?}", self.kind()))),
        }
    }

    // ---- logical (Bool only, Kleene AND/OR, propagating XOR) ----

    pub fn and(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a.and(*b))),
            (Value::Int(a), Value::Int(b)) => Self::int_bitwise(*a, *b, |x, y| x & y),
            _ => Err(Self::type_error("AND", self, other)),
        }
    }

    pub fn or(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a.or(*b))),
            (Value::Int(a), Value::Int(b)) => Self::int_bitwise(*a, *b, |x, y| x | y),
            _ => Err(Self::type_error("OR", self, other)),
        }
    }

    pub fn xor(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a.xor(*b))),
            (Value::Int(a), Value::Int(b)) => Self::int_bitwise(*a, *b, |x, y| x ^ y),
            _ => Err(Self::type_error("XOR", self, other)),
        }
    }

    fn int_bitwise(a: i64, b: i64, f: impl Fn(i64, i64) -> i64) -> Result<Value> {
        if a == i64::MIN || b == i64::MIN {
            return Ok(Value::Int(i64::MIN));
        }
        Ok(Value::Int(f(a, b)))
    }

    // ---- comparisons: return Bool, N/A propagates ----

    pub fn eq_op(&self, other: &Value) -> Result<Value> {
        if let Some(eq) = self.float_eq(other)? {
            return Ok(Value::Bool(if eq { Bool3::True } else { Bool3::False }));
        }
        self.compare(other, "==", |ord| ord == std::cmp::Ordering::Equal)
    }

    pub fn ne_op(&self, other: &Value) -> Result<Value> {
        if let Some(eq) = self.float_eq(other)? {
            return Ok(Value::Bool(if eq { Bool3::False } else { Bool3::True }));
        }
        self.compare(other, "!=", |ord| ord != std::cmp::Ordering::Equal)
    }

    /// `==`/`!=` on `Float` follow IEEE 754 equality (`+0.0 == -0.0`)
    /// rather than `total_cmp`'s bit-level ordering, which treats the two
    /// zeros as distinct and would otherwise make `eq_op` disagree with
    /// the standard `==` the spec calls for. Ordering ops (`<`, `<=`, `>`,
    /// `>=`) keep using `total_cmp` via [`Value::compare`] — only equality
    /// is special-cased here. Returns `None` for non-`Float` kinds, or when
    /// either side is N/A (N/A propagation stays in `compare`'s hands).
    fn float_eq(&self, other: &Value) -> Result<Option<bool>> {
        let (Value::Float(a), Value::Float(b)) = (self, other) else {
            return Ok(None);
        };
        if self.is_na() || other.is_na() {
            return Ok(None);
        }
        Ok(Some(a == b))
    }

    pub fn lt(&self, other: &Value) -> Result<Value> {
        self.compare(other, "<", |ord| ord == std::cmp::Ordering::Less)
    }

    pub fn le(&self, other: &Value) -> Result<Value> {
        self.compare(other, "<=", |ord| ord != std::cmp::Ordering::Greater)
    }

    pub fn gt(&self, other: &Value) -> Result<Value> {
        self.compare(other, ">", |ord| ord == std::cmp::Ordering::Greater)
    }

    pub fn ge(&self, other: &Value) -> Result<Value> {
        self.compare(other, ">=", |ord| ord != std::cmp::Ordering::Less)
    }

    fn compare(
        &self,
        other: &Value,
        op: &str,
        pred: impl Fn(std::cmp::Ordering) -> bool,
    ) -> Result<Value> {
        if self.kind() != other.kind() {
            return Err(Self::type_error(op, self, other));
        }
        if self.is_na() || other.is_na() {
            return Ok(Value::Bool(Bool3::Na));
        }
        let ord = match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.order_key().cmp(&b.order_key()),
            (Value::GeoPoint(a), Value::GeoPoint(b)) => (a.lat, a.lng).cmp(&(b.lat, b.lng)),
            (Value::Text(Some(a)), Value::Text(Some(b))) => a.as_bytes().cmp(b.as_bytes()),
            _ => return Err(Self::type_error(op, self, other)),
        };
        Ok(Value::Bool(if pred(ord) {
            Bool3::True
        } else {
            Bool3::False
        }))
    }

    // ---- arithmetic: Int and Float, overflow/div-by-zero -> N/A ----

    pub fn add(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Self::int_checked(*a, *b, i64::checked_add)),
            (Value::Float(a), Value::Float(b)) => Ok(Self::float_checked(*a, *b, |x, y| x + y)),
            _ => Err(Self::type_error("+", self, other)),
        }
    }

    pub fn sub(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Self::int_checked(*a, *b, i64::checked_sub)),
            (Value::Float(a), Value::Float(b)) => Ok(Self::float_checked(*a, *b, |x, y| x - y)),
            _ => Err(Self::type_error("-", self, other)),
        }
    }

    pub fn mul(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Self::int_checked(*a, *b, i64::checked_mul)),
            (Value::Float(a), Value::Float(b)) => Ok(Self::float_checked(*a, *b, |x, y| x * y)),
            _ => Err(Self::type_error("*", self, other)),
        }
    }

    pub fn div(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Self::int_checked(*a, *b, i64::checked_div)),
            (Value::Float(a), Value::Float(b)) => Ok(Self::float_checked(*a, *b, |x, y| x / y)),
            _ => Err(Self::type_error("/", self, other)),
        }
    }

    pub fn rem(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Self::int_checked(*a, *b, i64::checked_rem)),
            (Value::Float(a), Value::Float(b)) => Ok(Self::float_checked(*a, *b, |x, y| x % y)),
            _ => Err(Self::type_error("%", self, other)),
        }
    }

    fn int_checked(a: i64, b: i64, f: impl Fn(i64, i64) -> Option<i64>) -> Value {
        if a == i64::MIN || b == i64::MIN {
            return Value::Int(i64::MIN);
        }
        match f(a, b) {
            Some(v) if v != i64::MIN => Value::Int(v),
            _ => Value::Int(i64::MIN),
        }
    }

    fn float_checked(a: f64, b: f64, f: impl Fn(f64, f64) -> f64) -> Value {
        if is_float_na(a) || is_float_na(b) {
            return Value::Float(float_na());
        }
        Value::float(f(a, b))
    }

    // ---- bit shifts: Int only, shift by >=64 or negative -> N/A ----

    pub fn shl(&self, amount: &Value) -> Result<Value> {
        self.shift(amount, "<<", |v, n| v.checked_shl(n as u32))
    }

    pub fn shr(&self, amount: &Value) -> Result<Value> {
        self.shift(amount, ">>", |v, n| v.checked_shr(n as u32))
    }

    /// Logical right shift: the sign bit is not extended.
    pub fn ushr(&self, amount: &Value) -> Result<Value> {
        self.shift(amount, ">>>", |v, n| {
            (v as u64).checked_shr(n as u32).map(|r| r as i64)
        })
    }

    fn shift(
        &self,
        amount: &Value,
        op: &str,
        f: impl Fn(i64, i64) -> Option<i64>,
    ) -> Result<Value> {
        let (Value::Int(v), Value::Int(n)) = (self, amount) else {
            return Err(Self::type_error(op, self, amount));
        };
        if *v == i64::MIN || *n == i64::MIN || *n < 0 || *n >= 64 {
            return Ok(Value::Int(i64::MIN));
        }
        match f(*v, *n) {
            Some(r) => Ok(Value::Int(r)),
            None => Ok(Value::Int(i64::MIN)),
        }
    }
}

/// Rust-level equality is defined as `matches`: reflexive across N/A,
/// identifies +0.0/-0.0. This is deliberately *not* the spec's `==`
/// operator (see [`Value::eq_op`]), which propagates N/A instead of
/// treating it as equal to itself; `eq_op` never consults this impl.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.matches(other)
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(b) => b.bits().hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => {
                if is_float_na(*f) {
                    FLOAT_NA_BITS.hash(state)
                } else if *f == 0.0 {
                    0.0f64.to_bits().hash(state) // canonicalize -0.0 == 0.0
                } else {
                    f.to_bits().hash(state)
                }
            }
            Value::GeoPoint(g) => {
                if g.is_na() {
                    i32::MIN.hash(state);
                } else {
                    g.lat.hash(state);
                    g.lng.hash(state);
                }
            }
            Value::Text(t) => t.hash(state),
            Value::BoolVector(v) => v.hash(state),
            Value::IntVector(v) => v.hash(state),
            Value::FloatVector(v) => {
                // f64 has no Hash impl (NaN); hash bit patterns instead,
                // canonicalizing -0.0 and any NaN like the scalar case.
                match v {
                    None => 0u8.hash(state),
                    Some(items) => {
                        1u8.hash(state);
                        items.len().hash(state);
                        for f in items {
                            let bits = if f.is_nan() {
                                FLOAT_NA_BITS
                            } else if *f == 0.0 {
                                0.0f64.to_bits()
                            } else {
                                f.to_bits()
                            };
                            bits.hash(state);
                        }
                    }
                }
            }
            Value::GeoPointVector(v) => v.hash(state),
            Value::TextVector(v) => v.hash(state),
        }
    }
}

impl Ord for Value {
    /// Total order used only for sort keys / tree-index ordering:
    /// "numbers < +infinity < ... < N/A". Differing kinds compare by
    /// discriminant first; in practice a `TreeIndex<Value>` only ever
    /// compares same-kind values.
    fn cmp(&self, other: &Value) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        if self.kind() != other.kind() {
            return (self.kind() as u8 as i32).cmp(&(other.kind() as u8 as i32));
        }
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.order_key().cmp(&b.order_key()),
            (Value::Int(a), Value::Int(b)) => match (*a == i64::MIN, *b == i64::MIN) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.cmp(b),
            },
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::GeoPoint(a), Value::GeoPoint(b)) => match (a.is_na(), b.is_na()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => (a.lat, a.lng).cmp(&(b.lat, b.lng)),
            },
            (Value::Text(a), Value::Text(b)) => match (a, b) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => x.as_bytes().cmp(y.as_bytes()),
            },
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
