//! Literal values.
//!
//! `Value` is what a constant leaf of an expression holds, and what a bound
//! host parameter carries between executions.

use crate::types::{DataType, TypeDescr};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::hash::{Hash, Hasher};

/// Object identifier of a stored instance or class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Oid {
    pub volume: i16,
    pub page: i32,
    pub slot: i16,
}

impl Oid {
    /// Creates a new object identifier.
    pub const fn new(volume: i16, page: i32, slot: i16) -> Self {
        Self { volume, page, slot }
    }
}

/// Fixed-point decimal stored as an unscaled integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Numeric {
    pub unscaled: i128,
    pub scale: u8,
}

impl Numeric {
    /// Creates a decimal from its unscaled digits and scale.
    pub fn new(unscaled: i128, scale: u8) -> Self {
        Self { unscaled, scale }
    }

    /// Number of significant decimal digits.
    pub fn precision(&self) -> u32 {
        let mut n = self.unscaled.unsigned_abs();
        let mut digits = 1;
        while n >= 10 {
            n /= 10;
            digits += 1;
        }
        digits.max(self.scale as u32)
    }

    fn rescaled(&self, scale: u8) -> Option<i128> {
        let diff = scale.checked_sub(self.scale)?;
        10i128
            .checked_pow(diff as u32)
            .and_then(|f| self.unscaled.checked_mul(f))
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Numeric {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        match (self.rescaled(scale), other.rescaled(scale)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.scale.cmp(&other.scale),
        }
    }
}

/// Collection flavour of a collection literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    Set,
    MultiSet,
    Sequence,
}

impl CollectionKind {
    /// Returns the static type of this collection flavour.
    pub fn data_type(&self) -> DataType {
        match self {
            CollectionKind::Set => DataType::Set,
            CollectionKind::MultiSet => DataType::MultiSet,
            CollectionKind::Sequence => DataType::Sequence,
        }
    }
}

/// A literal value.
#[derive(Clone, Debug)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 16-bit signed integer
    SmallInt(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// Fixed-point decimal
    Numeric(Numeric),
    /// Character string
    String(String),
    /// National character string
    NString(String),
    /// Bit string
    Bytes(Vec<u8>),
    /// Days since the epoch
    Date(i32),
    /// Seconds since midnight
    Time(i32),
    /// Seconds since the epoch
    Timestamp(i64),
    /// Milliseconds since the epoch
    DateTime(i64),
    /// Collection literal
    Collection(CollectionKind, Vec<Value>),
    /// Object reference
    Object(Oid),
}

impl Value {
    /// Returns the static kind of this value, or None if it's Null.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Logical),
            Value::SmallInt(_) => Some(DataType::SmallInt),
            Value::Int32(_) => Some(DataType::Integer),
            Value::Int64(_) => Some(DataType::BigInt),
            Value::Float64(_) => Some(DataType::Double),
            Value::Numeric(_) => Some(DataType::Numeric),
            Value::String(_) => Some(DataType::VarChar),
            Value::NString(_) => Some(DataType::VarNChar),
            Value::Bytes(_) => Some(DataType::VarBit),
            Value::Date(_) => Some(DataType::Date),
            Value::Time(_) => Some(DataType::Time),
            Value::Timestamp(_) => Some(DataType::Timestamp),
            Value::DateTime(_) => Some(DataType::DateTime),
            Value::Collection(kind, _) => Some(kind.data_type()),
            Value::Object(_) => Some(DataType::Object),
        }
    }

    /// Returns a type descriptor describing this value.
    ///
    /// Null yields the `Null` kind. Collections describe their first
    /// non-null element, which is enough for domain resolution.
    pub fn descr(&self) -> TypeDescr {
        match self {
            Value::Null => TypeDescr::new(DataType::Null),
            Value::Numeric(n) => TypeDescr::numeric(n.precision(), n.scale as u16),
            Value::String(s) | Value::NString(s) => {
                let kind = self.data_type().unwrap_or(DataType::VarChar);
                TypeDescr::new(kind).precision(s.chars().count().max(1) as u32)
            }
            Value::Bytes(b) => {
                TypeDescr::new(DataType::VarBit).precision((b.len() * 8).max(1) as u32)
            }
            Value::Collection(kind, items) => {
                let elements = items
                    .iter()
                    .find(|v| !v.is_null())
                    .map(|v| alloc::vec![v.descr()])
                    .unwrap_or_default();
                TypeDescr::collection(kind.data_type(), elements)
            }
            other => TypeDescr::new(other.data_type().unwrap_or(DataType::Null)),
        }
    }

    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value if this is a Boolean, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as i64 if it is an integer of any width.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::SmallInt(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a character string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) | Value::NString(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the elements if this is a collection.
    pub fn as_collection(&self) -> Option<&[Value]> {
        match self {
            Value::Collection(_, items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Returns the empty string of the given string kind.
    pub fn empty_string(kind: DataType) -> Self {
        if kind.is_national() {
            Value::NString(String::new())
        } else {
            Value::String(String::new())
        }
    }

    /// Returns a type ordering value for comparing different types.
    fn type_order(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::SmallInt(_) | Value::Int32(_) | Value::Int64(_) => 2,
            Value::Float64(_) => 3,
            Value::Numeric(_) => 4,
            Value::String(_) | Value::NString(_) => 5,
            Value::Bytes(_) => 6,
            Value::Date(_) => 7,
            Value::Time(_) => 8,
            Value::Timestamp(_) => 9,
            Value::DateTime(_) => 10,
            Value::Collection(..) => 11,
            Value::Object(_) => 12,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_order().hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::SmallInt(_) | Value::Int32(_) | Value::Int64(_) => self.as_i64().hash(state),
            Value::Float64(f) => f.to_bits().hash(state),
            Value::Numeric(n) => {
                // Equal decimals of different scale must hash alike.
                let mut unscaled = n.unscaled;
                let mut scale = n.scale;
                while scale > 0 && unscaled % 10 == 0 {
                    unscaled /= 10;
                    scale -= 1;
                }
                (unscaled, scale).hash(state)
            }
            Value::String(s) | Value::NString(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Date(d) | Value::Time(d) => d.hash(state),
            Value::Timestamp(t) | Value::DateTime(t) => t.hash(state),
            Value::Collection(kind, items) => {
                kind.hash(state);
                items.hash(state)
            }
            Value::Object(oid) => oid.hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Float64(a), Value::Float64(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (Value::Numeric(a), Value::Numeric(b)) => a.cmp(b),
            (Value::String(a), Value::String(b))
            | (Value::NString(a), Value::NString(b))
            | (Value::String(a), Value::NString(b))
            | (Value::NString(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) | (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b))
            | (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Collection(ka, a), Value::Collection(kb, b)) => {
                ka.cmp(kb).then_with(|| a.cmp(b))
            }
            (Value::Object(a), Value::Object(b)) => a.cmp(b),
            _ => match (self.as_i64(), other.as_i64()) {
                (Some(a), Some(b)) => a.cmp(&b),
                // Cross-kind numbers and everything else: order by type discriminant
                _ => self.type_order().cmp(&other.type_order()),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Numeric> for Value {
    fn from(v: Numeric) -> Self {
        Value::Numeric(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
