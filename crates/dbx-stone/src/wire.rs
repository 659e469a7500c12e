//! # Wire Values
//!
//! The encoder and decoder are generic over the concrete document model of
//! the output format. [`Wire`] is the small set of constructors and the
//! read-only [`WireView`] they need, implemented for [`serde_json::Value`]
//! and, with the `binary` feature, for MessagePack's [`rmpv::Value`].
//!
//! The two formats differ only in how bytes travel: JSON carries them as
//! padded standard base64 strings, the binary format carries them raw.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::ValidationError;

/// Key naming the discriminator of unions and struct trees in new-style
/// documents.
pub const TAG_KEY: &str = ".tag";

/// Borrowed view of a map in the order the document model yields it.
#[derive(Debug)]
pub struct WireMap<'a, W> {
    entries: Vec<(&'a str, &'a W)>,
}

impl<'a, W> WireMap<'a, W> {
    pub fn new(entries: Vec<(&'a str, &'a W)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&'a W> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a W)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only classification of a wire value.
#[derive(Debug)]
pub enum WireView<'a, W> {
    Null,
    Bool(bool),
    Integer(i128),
    Float(f64),
    String(&'a str),
    Bytes(&'a [u8]),
    Array(&'a [W]),
    Map(WireMap<'a, W>),
    /// A value the engine has no mapping for (e.g. a MessagePack map
    /// with non-string keys).
    Unsupported(&'static str),
}

impl<W> WireView<'_, W> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "list",
            Self::Map(_) => "object",
            Self::Unsupported(what) => what,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// A document model the engine can build and inspect.
pub trait Wire: Sized + Clone + fmt::Debug {
    /// Short format name used in logs.
    const FORMAT: &'static str;

    fn null() -> Self;
    fn from_bool(b: bool) -> Self;
    /// Fails when the value does not fit the format's integer range.
    fn from_integer(i: i128) -> Result<Self, ValidationError>;
    /// Fails for non-finite values.
    fn from_float(f: f64) -> Result<Self, ValidationError>;
    fn from_string(s: String) -> Self;
    fn from_bytes(bytes: &[u8]) -> Self;
    fn from_array(items: Vec<Self>) -> Self;
    fn from_entries(entries: Vec<(String, Self)>) -> Self;

    fn view(&self) -> WireView<'_, Self>;
    /// Interpret this value as a bytes field.
    fn decode_bytes(&self) -> Result<Vec<u8>, ValidationError>;
}

impl Wire for serde_json::Value {
    const FORMAT: &'static str = "json";

    fn null() -> Self {
        Self::Null
    }

    fn from_bool(b: bool) -> Self {
        Self::Bool(b)
    }

    fn from_integer(i: i128) -> Result<Self, ValidationError> {
        if let Ok(v) = i64::try_from(i) {
            Ok(Self::from(v))
        } else if let Ok(v) = u64::try_from(i) {
            Ok(Self::from(v))
        } else {
            Err(ValidationError::new(format!("{i} does not fit in a JSON integer")))
        }
    }

    fn from_float(f: f64) -> Result<Self, ValidationError> {
        serde_json::Number::from_f64(f)
            .map(Self::Number)
            .ok_or_else(|| ValidationError::new(format!("{f} values are not supported")))
    }

    fn from_string(s: String) -> Self {
        Self::String(s)
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self::String(STANDARD.encode(bytes))
    }

    fn from_array(items: Vec<Self>) -> Self {
        Self::Array(items)
    }

    fn from_entries(entries: Vec<(String, Self)>) -> Self {
        Self::Object(entries.into_iter().collect())
    }

    fn view(&self) -> WireView<'_, Self> {
        match self {
            Self::Null => WireView::Null,
            Self::Bool(b) => WireView::Bool(*b),
            Self::Number(n) => {
                if let Some(i) = n.as_i64() {
                    WireView::Integer(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    WireView::Integer(i128::from(u))
                } else {
                    n.as_f64().map_or(WireView::Unsupported("number"), WireView::Float)
                }
            }
            Self::String(s) => WireView::String(s),
            Self::Array(items) => WireView::Array(items),
            Self::Object(map) => {
                WireView::Map(WireMap::new(map.iter().map(|(k, v)| (k.as_str(), v)).collect()))
            }
        }
    }

    fn decode_bytes(&self) -> Result<Vec<u8>, ValidationError> {
        match self {
            Self::String(s) => STANDARD
                .decode(s)
                .map_err(|_| ValidationError::new("invalid base64-encoded bytes")),
            other => Err(ValidationError::new(format!(
                "expected string, got {}",
                other.view().type_name()
            ))),
        }
    }
}

#[cfg(feature = "binary")]
impl Wire for rmpv::Value {
    const FORMAT: &'static str = "msgpack";

    fn null() -> Self {
        Self::Nil
    }

    fn from_bool(b: bool) -> Self {
        Self::Boolean(b)
    }

    fn from_integer(i: i128) -> Result<Self, ValidationError> {
        if let Ok(v) = i64::try_from(i) {
            Ok(Self::from(v))
        } else if let Ok(v) = u64::try_from(i) {
            Ok(Self::from(v))
        } else {
            Err(ValidationError::new(format!("{i} does not fit in a binary integer")))
        }
    }

    fn from_float(f: f64) -> Result<Self, ValidationError> {
        if f.is_finite() {
            Ok(Self::F64(f))
        } else {
            Err(ValidationError::new(format!("{f} values are not supported")))
        }
    }

    fn from_string(s: String) -> Self {
        Self::String(s.into())
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }

    fn from_array(items: Vec<Self>) -> Self {
        Self::Array(items)
    }

    fn from_entries(entries: Vec<(String, Self)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (Self::String(k.into()), v)).collect())
    }

    fn view(&self) -> WireView<'_, Self> {
        match self {
            Self::Nil => WireView::Null,
            Self::Boolean(b) => WireView::Bool(*b),
            Self::Integer(i) => {
                if let Some(v) = i.as_i64() {
                    WireView::Integer(i128::from(v))
                } else {
                    i.as_u64()
                        .map_or(WireView::Unsupported("integer"), |v| WireView::Integer(i128::from(v)))
                }
            }
            Self::F32(f) => WireView::Float(f64::from(*f)),
            Self::F64(f) => WireView::Float(*f),
            Self::String(s) => s
                .as_str()
                .map_or(WireView::Unsupported("invalid UTF-8 string"), WireView::String),
            Self::Binary(b) => WireView::Bytes(b),
            Self::Array(items) => WireView::Array(items),
            Self::Map(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    match k.as_str() {
                        Some(key) => out.push((key, v)),
                        None => return WireView::Unsupported("map with non-string keys"),
                    }
                }
                WireView::Map(WireMap::new(out))
            }
            Self::Ext(..) => WireView::Unsupported("extension value"),
        }
    }

    /// Raw bytes pass through; text is taken as its UTF-8 encoding.
    fn decode_bytes(&self) -> Result<Vec<u8>, ValidationError> {
        match self {
            Self::Binary(b) => Ok(b.clone()),
            Self::String(s) => Ok(s.as_bytes().to_vec()),
            other => Err(ValidationError::new(format!(
                "expected bytes, got {}",
                other.view().type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_bytes_are_padded_base64() {
        let v = serde_json::Value::from_bytes(b"hi");
        assert_eq!(v, json!("aGk="));
        assert_eq!(v.decode_bytes().unwrap(), b"hi");
        assert!(json!("not base64!").decode_bytes().is_err());
        assert!(json!(5).decode_bytes().is_err());
    }

    #[test]
    fn json_integer_range() {
        assert_eq!(serde_json::Value::from_integer(-5).unwrap(), json!(-5));
        assert_eq!(
            serde_json::Value::from_integer(i128::from(u64::MAX)).unwrap(),
            json!(u64::MAX)
        );
        assert!(serde_json::Value::from_integer(i128::from(u64::MAX) + 1).is_err());
        assert!(serde_json::Value::from_float(f64::NAN).is_err());
    }

    #[test]
    fn json_view_classifies_numbers() {
        assert!(matches!(json!(3).view(), WireView::Integer(3)));
        assert!(matches!(json!(3.5).view(), WireView::Float(_)));
        assert!(matches!(json!(u64::MAX).view(), WireView::Integer(_)));
    }

    #[test]
    fn json_map_view_lookup() {
        let doc = json!({".tag": "dog", "name": "Rex"});
        let WireView::Map(map) = doc.view() else {
            panic!("expected map");
        };
        assert_eq!(map.len(), 2);
        assert!(map.contains_key(TAG_KEY));
        assert_eq!(map.get("name"), Some(&json!("Rex")));
    }

    #[cfg(feature = "binary")]
    #[test]
    fn binary_bytes_pass_through() {
        let v = rmpv::Value::from_bytes(&[0, 159, 146, 150]);
        assert_eq!(v, rmpv::Value::Binary(vec![0, 159, 146, 150]));
        assert_eq!(v.decode_bytes().unwrap(), vec![0, 159, 146, 150]);
        let text = rmpv::Value::from_string("ab".into());
        assert_eq!(text.decode_bytes().unwrap(), b"ab");
    }

    #[cfg(feature = "binary")]
    #[test]
    fn binary_integer_range() {
        let max = rmpv::Value::from_integer(i128::from(u64::MAX)).unwrap();
        assert!(matches!(max.view(), WireView::Integer(i) if i == i128::from(u64::MAX)));
        assert!(matches!(rmpv::Value::from_integer(-7).unwrap().view(), WireView::Integer(-7)));
        assert!(rmpv::Value::from_integer(i128::from(i64::MIN) - 1).is_err());
    }

    #[cfg(feature = "binary")]
    #[test]
    fn binary_non_string_keys_are_unsupported() {
        let v = rmpv::Value::Map(vec![(rmpv::Value::from(1), rmpv::Value::Nil)]);
        assert!(matches!(v.view(), WireView::Unsupported(_)));
    }
}
