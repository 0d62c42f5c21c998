use std::fmt;

/// Integer width and signedness of a [`Value`](crate::Value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
}

impl IntType {
    /// Returns all variant names in order.
    pub fn variant_names() -> &'static [&'static str] {
        &["U8", "U16", "U32", "U64", "I8", "I16", "I32", "I64"]
    }

    pub fn is_signed(self) -> bool {
        matches!(self, IntType::I8 | IntType::I16 | IntType::I32 | IntType::I64)
    }
}

/// Floating-point width of a [`Value`](crate::Value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatType {
    F32,
    F64,
}

impl FloatType {
    /// Returns all variant names in order.
    pub fn variant_names() -> &'static [&'static str] {
        &["F32", "F64"]
    }
}

/// The concrete type of a dynamic value.
///
/// Two values whose kinds differ are never equal, unless the left-hand side
/// declares its own equality through [`EqualTo`](crate::EqualTo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    // Primitives
    /// Absent value.
    Nil,
    Bool,
    Int(IntType),
    Float(FloatType),
    /// UTF-8 text string.
    Str,
    /// Opaque byte sequence.
    Bytes,

    // Sequences
    Strings,
    U32s,
    U64s,
    /// Heterogeneous list of values.
    List,

    // Mappings
    /// String-keyed mapping.
    Dict,
    U32Dict,
    U64Dict,
    /// Mapping with arbitrary value keys.
    Map,

    // Escape hatches
    /// Shared, possibly null, indirection to another value.
    Pointer,
    /// User-defined aggregate compared member by member.
    Aggregate,
    /// User-defined value with its own equality.
    Custom,
}

impl Kind {
    /// Returns true for kinds with a native key identity.
    pub fn is_hashable(self) -> bool {
        matches!(
            self,
            Kind::Bool | Kind::Int(_) | Kind::Float(_) | Kind::Str
        )
    }

    /// Stable tag used in the canonical encoding.
    pub(crate) fn tag(self) -> u8 {
        match self {
            Kind::Nil => 0,
            Kind::Bool => 1,
            Kind::Int(IntType::U8) => 2,
            Kind::Int(IntType::U16) => 3,
            Kind::Int(IntType::U32) => 4,
            Kind::Int(IntType::U64) => 5,
            Kind::Int(IntType::I8) => 6,
            Kind::Int(IntType::I16) => 7,
            Kind::Int(IntType::I32) => 8,
            Kind::Int(IntType::I64) => 9,
            Kind::Float(FloatType::F32) => 10,
            Kind::Float(FloatType::F64) => 11,
            Kind::Str => 12,
            Kind::Bytes => 13,
            Kind::Strings => 14,
            Kind::U32s => 15,
            Kind::U64s => 16,
            Kind::List => 17,
            Kind::Dict => 18,
            Kind::U32Dict => 19,
            Kind::U64Dict => 20,
            Kind::Map => 21,
            Kind::Pointer => 22,
            Kind::Aggregate => 23,
            Kind::Custom => 24,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Int(t) => write!(f, "{}", IntType::variant_names()[*t as usize]),
            Kind::Float(t) => write!(f, "{}", FloatType::variant_names()[*t as usize]),
            other => write!(f, "{:?}", other),
        }
    }
}
