//! JSON entry points.
//!
//! `*_compat_*` functions work on [`serde_json::Value`] documents; the plain
//! variants work on serialized text.

use tracing::trace;

use crate::decode::{decode, DecodeOptions};
use crate::encode::{encode, EncodeOptions};
use crate::error::{StoneError, ValidationError};
use crate::object::Object;
use crate::typed::StoneType;
use crate::validators::Validator;

/// Encode to a JSON document.
pub fn json_compat_encode(
    validator: &Validator,
    obj: &Object,
    options: &EncodeOptions,
) -> Result<serde_json::Value, StoneError> {
    encode(validator, obj, options)
}

/// Encode to JSON text.
pub fn json_encode(
    validator: &Validator,
    obj: &Object,
    options: &EncodeOptions,
) -> Result<String, StoneError> {
    let doc = json_compat_encode(validator, obj, options)?;
    let text = doc.to_string();
    trace!(validator = validator.kind_name(), bytes = text.len(), "encoded json");
    Ok(text)
}

/// Decode a JSON document.
pub fn json_compat_decode(
    validator: &Validator,
    doc: &serde_json::Value,
    options: &DecodeOptions,
) -> Result<Object, ValidationError> {
    decode(validator, doc, options)
}

/// Decode JSON text.
pub fn json_decode(
    validator: &Validator,
    text: &str,
    options: &DecodeOptions,
) -> Result<Object, ValidationError> {
    let doc: serde_json::Value = serde_json::from_str(text)
        .map_err(|_| ValidationError::new("could not decode input as JSON"))?;
    json_compat_decode(validator, &doc, options)
}

/// Encode a typed value to JSON text.
pub fn to_json<T: StoneType>(value: &T, options: &EncodeOptions) -> Result<String, StoneError> {
    json_encode(T::validator(), &value.to_object()?, options)
}

/// Decode JSON text into a typed value.
pub fn from_json<T: StoneType>(text: &str, options: &DecodeOptions) -> Result<T, ValidationError> {
    T::from_object(json_decode(T::validator(), text, options)?)
}
