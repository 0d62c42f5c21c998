use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::canonical::{self, CborValue};
use crate::capability::{Aggregate, EqualTo};
use crate::deep_equal::{DeepEqual, Visited};
use crate::key::ValueKey;
use crate::kind::{FloatType, IntType, Kind};

/// A shared, mutable node. The only place where cycles can form.
pub type Shared<T> = Rc<RefCell<T>>;

/// A dynamically-typed value.
///
/// The common concrete types are variants of their own and are compared
/// without any type erasure. User-defined types enter through
/// [`Value::Aggregate`] (structural, usually derived) or [`Value::Custom`]
/// (declared equality).
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent value. Equal only to itself.
    #[default]
    Nil,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(ByteString),
    Strings(Vec<String>),
    U32s(Vec<u32>),
    U64s(Vec<u64>),
    List(Vec<Value>),
    Dict(HashMap<String, Value>),
    U32Dict(HashMap<u32, Value>),
    U64Dict(HashMap<u64, Value>),
    /// Mapping whose keys are values themselves, including composite ones.
    Map(IndexMap<ValueKey, Value>),
    Pointer(Pointer),
    Aggregate(Rc<dyn Aggregate>),
    Custom(Rc<dyn EqualTo>),
}

impl Value {
    /// Returns the concrete type of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::U8(_) => Kind::Int(IntType::U8),
            Value::U16(_) => Kind::Int(IntType::U16),
            Value::U32(_) => Kind::Int(IntType::U32),
            Value::U64(_) => Kind::Int(IntType::U64),
            Value::I8(_) => Kind::Int(IntType::I8),
            Value::I16(_) => Kind::Int(IntType::I16),
            Value::I32(_) => Kind::Int(IntType::I32),
            Value::I64(_) => Kind::Int(IntType::I64),
            Value::F32(_) => Kind::Float(FloatType::F32),
            Value::F64(_) => Kind::Float(FloatType::F64),
            Value::Str(_) => Kind::Str,
            Value::Bytes(_) => Kind::Bytes,
            Value::Strings(_) => Kind::Strings,
            Value::U32s(_) => Kind::U32s,
            Value::U64s(_) => Kind::U64s,
            Value::List(_) => Kind::List,
            Value::Dict(_) => Kind::Dict,
            Value::U32Dict(_) => Kind::U32Dict,
            Value::U64Dict(_) => Kind::U64Dict,
            Value::Map(_) => Kind::Map,
            Value::Pointer(_) => Kind::Pointer,
            Value::Aggregate(_) => Kind::Aggregate,
            Value::Custom(_) => Kind::Custom,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Builds a string-keyed mapping.
    pub fn dict<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Builds a mapping keyed by arbitrary values.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (ValueKey::new(k), v.into()))
                .collect(),
        )
    }

    /// Builds a list of values.
    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Places `value` behind a fresh shared pointer.
    pub fn pointer(value: Value) -> Self {
        Value::Pointer(Pointer::new(value))
    }

    pub fn null_pointer() -> Self {
        Value::Pointer(Pointer::null())
    }

    /// Wraps a user-defined aggregate.
    pub fn aggregate<T: DeepEqual + fmt::Debug + 'static>(value: T) -> Self {
        Value::Aggregate(Rc::new(value))
    }

    /// Wraps a value with declared equality.
    pub fn custom<T: EqualTo + 'static>(value: T) -> Self {
        Value::Custom(Rc::new(value))
    }

    /// Returns the aggregate of type `T`, if this value holds one.
    pub fn downcast_aggregate<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Aggregate(a) => (**a).as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

/// Fast dispatch on the concrete type of the left-hand side.
///
/// Arms are ordered roughly by how often each type shows up. Anything not
/// matched here has mismatched kinds and compares unequal.
impl DeepEqual for Value {
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        match (self, other) {
            (Value::Nil, b) => b.is_nil(),
            (_, Value::Nil) => false,

            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a.deep_equal_in(b, visited),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::Pointer(a), Value::Pointer(b)) => a.deep_equal_in(b, visited),
            (Value::Map(a), Value::Map(b)) => a.deep_equal_in(b, visited),
            (Value::F32(a), Value::F32(b)) => a.deep_equal_in(b, visited),
            (Value::F64(a), Value::F64(b)) => a.deep_equal_in(b, visited),
            (Value::Strings(a), Value::Strings(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::U32Dict(a), Value::U32Dict(b)) => a.deep_equal_in(b, visited),
            (Value::U64Dict(a), Value::U64Dict(b)) => a.deep_equal_in(b, visited),
            (Value::Custom(a), b) => a.equal_to(b),
            (Value::U32s(a), Value::U32s(b)) => a == b,
            (Value::U64s(a), Value::U64s(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.deep_equal_in(b, visited),
            (Value::Aggregate(a), Value::Aggregate(b)) => (**a).equal_aggregate(&**b, visited),

            _ => false,
        }
    }

    fn canonical(&self) -> Option<CborValue> {
        let payload = match self {
            Value::Nil => CborValue::Null,
            Value::Bool(b) => b.canonical()?,
            Value::U8(n) => n.canonical()?,
            Value::U16(n) => n.canonical()?,
            Value::U32(n) => n.canonical()?,
            Value::U64(n) => n.canonical()?,
            Value::I8(n) => n.canonical()?,
            Value::I16(n) => n.canonical()?,
            Value::I32(n) => n.canonical()?,
            Value::I64(n) => n.canonical()?,
            Value::F32(x) => x.canonical()?,
            Value::F64(x) => x.canonical()?,
            Value::Str(s) => s.canonical()?,
            Value::Bytes(b) => b.canonical()?,
            Value::Strings(v) => v.canonical()?,
            Value::U32s(v) => v.canonical()?,
            Value::U64s(v) => v.canonical()?,
            Value::List(v) => v.canonical()?,
            Value::Dict(m) => m.canonical()?,
            Value::U32Dict(m) => m.canonical()?,
            Value::U64Dict(m) => m.canonical()?,
            Value::Map(m) => m.canonical()?,
            Value::Aggregate(a) => (**a).canonical_aggregate()?,
            Value::Pointer(_) | Value::Custom(_) => return None,
        };
        Some(canonical::tagged(self.kind(), payload))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_equal(other)
    }
}

/// A possibly null pointer to a shared value.
///
/// Pointers are compared by what they point to. Two null pointers are equal,
/// a null pointer equals no other pointer.
#[derive(Clone, Default)]
pub struct Pointer(Option<Shared<Value>>);

impl Pointer {
    pub fn new(value: Value) -> Self {
        Pointer(Some(Rc::new(RefCell::new(value))))
    }

    pub fn null() -> Self {
        Pointer(None)
    }

    /// Points at an existing shared node. Used to close cycles.
    pub fn to(node: &Shared<Value>) -> Self {
        Pointer(Some(Rc::clone(node)))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the shared node, unless the pointer is null.
    pub fn target(&self) -> Option<&Shared<Value>> {
        self.0.as_ref()
    }
}

impl DeepEqual for Pointer {
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        self.0.deep_equal_in(&other.0, visited)
    }

    fn requires_scan(&self) -> bool {
        true
    }
}

// Printing the target could recurse forever on a cycle.
impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => write!(f, "Pointer(null)"),
            Some(node) => write!(f, "Pointer({:p})", Rc::as_ptr(node)),
        }
    }
}

/// A wrapper for byte sequences to distinguish from `Vec<u8>` lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ByteString(pub Vec<u8>);

impl ByteString {
    pub fn new(data: Vec<u8>) -> Self {
        ByteString(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(v: Vec<u8>) -> Self {
        ByteString(v)
    }
}

impl From<&[u8]> for ByteString {
    fn from(v: &[u8]) -> Self {
        ByteString(v.to_vec())
    }
}

impl DeepEqual for ByteString {
    fn deep_equal_in(&self, other: &Self, _visited: &mut Visited) -> bool {
        self.0 == other.0
    }

    fn canonical(&self) -> Option<CborValue> {
        Some(CborValue::Bytes(self.0.clone()))
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => Str,
    ByteString => Bytes,
    Vec<String> => Strings,
    Vec<u32> => U32s,
    Vec<u64> => U64s,
    Vec<Value> => List,
    HashMap<String, Value> => Dict,
    HashMap<u32, Value> => U32Dict,
    HashMap<u64, Value> => U64Dict,
    IndexMap<ValueKey, Value> => Map,
    Pointer => Pointer,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(ByteString(v))
    }
}

impl From<ValueKey> for Value {
    fn from(key: ValueKey) -> Self {
        key.into_payload()
    }
}
