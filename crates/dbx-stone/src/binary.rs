//! Binary (MessagePack) entry points.
//!
//! The document shape is identical to JSON except that bytes fields carry
//! raw binary values instead of base64 text. A text value is also accepted
//! for a bytes field and read as its UTF-8 encoding.

use rmpv::Value;
use tracing::trace;

use crate::decode::{decode, DecodeOptions};
use crate::encode::{encode, EncodeOptions};
use crate::error::{StoneError, ValidationError};
use crate::object::Object;
use crate::validators::Validator;

/// Encode to a MessagePack value tree.
pub fn binary_compat_encode(
    validator: &Validator,
    obj: &Object,
    options: &EncodeOptions,
) -> Result<Value, StoneError> {
    encode(validator, obj, options)
}

/// Encode to MessagePack bytes.
pub fn binary_encode(
    validator: &Validator,
    obj: &Object,
    options: &EncodeOptions,
) -> Result<Vec<u8>, StoneError> {
    let doc = binary_compat_encode(validator, obj, options)?;
    let mut out = Vec::new();
    rmpv::encode::write_value(&mut out, &doc).map_err(|e| {
        StoneError::Validation(ValidationError::new(format!("could not write binary output: {e}")))
    })?;
    trace!(validator = validator.kind_name(), bytes = out.len(), "encoded binary");
    Ok(out)
}

/// Decode a MessagePack value tree.
pub fn binary_compat_decode(
    validator: &Validator,
    doc: &Value,
    options: &DecodeOptions,
) -> Result<Object, ValidationError> {
    decode(validator, doc, options)
}

/// Decode MessagePack bytes. The input must hold exactly one value.
pub fn binary_decode(
    validator: &Validator,
    bytes: &[u8],
    options: &DecodeOptions,
) -> Result<Object, ValidationError> {
    let mut input = bytes;
    let doc = rmpv::decode::read_value(&mut input)
        .map_err(|_| ValidationError::new("could not decode input as binary"))?;
    if !input.is_empty() {
        return Err(ValidationError::new(format!(
            "{} trailing bytes after binary value",
            input.len()
        )));
    }
    binary_compat_decode(validator, &doc, options)
}
