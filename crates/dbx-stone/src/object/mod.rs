//! # Object Model
//!
//! [`Object`] is the dynamic, in-memory representation of any Stone value.
//! Decoding produces objects; encoding consumes them. Struct instances are
//! [`StructValue`]s that track, per field, whether a value was ever set, and
//! union instances are [`UnionValue`]s holding one tag and at most one
//! payload.

mod struct_value;
mod union_value;

use chrono::NaiveDateTime;

pub use struct_value::StructValue;
pub use union_value::UnionValue;

/// Shared null used wherever a borrowed null must be returned.
pub(crate) static NULL: Object = Object::Null;

/// A dynamically typed Stone value.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Bool(bool),
    /// Wide enough for every signed and unsigned 64-bit value.
    Integer(i128),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    List(Vec<Object>),
    Struct(StructValue),
    Union(UnionValue),
}

impl Object {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the variant, or the qualified type name for composites.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
            Self::List(_) => "list",
            Self::Struct(s) => s.type_name(),
            Self::Union(u) => u.type_name(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_integer().and_then(|i| u64::try_from(i).ok())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_integer().and_then(|i| i64::try_from(i).ok())
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_integer().and_then(|i| u32::try_from(i).ok())
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&NaiveDateTime> {
        match self {
            Self::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Object]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionValue> {
        match self {
            Self::Union(u) => Some(u),
            _ => None,
        }
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! object_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Object {
            fn from(i: $t) -> Self {
                Self::Integer(i128::from(i))
            }
        })*
    };
}

object_from_int!(i32, u32, i64, u64);

impl From<f64> for Object {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<NaiveDateTime> for Object {
    fn from(t: NaiveDateTime) -> Self {
        Self::Timestamp(t)
    }
}

impl From<Vec<Object>> for Object {
    fn from(items: Vec<Object>) -> Self {
        Self::List(items)
    }
}

impl From<StructValue> for Object {
    fn from(s: StructValue) -> Self {
        Self::Struct(s)
    }
}

impl From<UnionValue> for Object {
    fn from(u: UnionValue) -> Self {
        Self::Union(u)
    }
}

impl<T: Into<Object>> From<Option<T>> for Object {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_accessors_respect_width() {
        let big = Object::from(u64::MAX);
        assert_eq!(big.as_u64(), Some(u64::MAX));
        assert_eq!(big.as_i64(), None);
        assert_eq!(Object::from(-1i64).as_u64(), None);
        assert_eq!(Object::from(7u32).as_f64(), Some(7.0));
    }

    #[test]
    fn option_converts_to_null() {
        assert!(Object::from(None::<String>).is_null());
        assert_eq!(Object::from(Some("x")), Object::String("x".into()));
    }

    #[test]
    fn type_names() {
        assert_eq!(Object::Null.type_name(), "null");
        assert_eq!(Object::bytes(vec![1u8]).type_name(), "bytes");
        assert_eq!(Object::List(vec![]).type_name(), "list");
    }
}
