//! # Decoder
//!
//! Turns a wire document into an [`Object`], validating as it goes.
//!
//! ## Strict versus lenient
//!
//! Strict decoding (the default) rejects unknown struct fields, unknown
//! union tags and unknown struct-tree subtypes. Lenient decoding is what a
//! client uses on server responses: unknown fields are ignored, an unknown
//! union tag becomes the union's catch-all tag when it has one, and an
//! unknown struct-tree subtype decodes as the base type when the tree is
//! declared catch-all. An explicit use of a catch-all tag on the wire is
//! always an error, since the catch-all only exists for the receiver.

use std::sync::Arc;

use tracing::debug;

use crate::alias::AliasValidators;
use crate::error::ValidationError;
use crate::object::{Object, StructValue, UnionValue};
use crate::validators::{ListValidator, Primitive, StructDef, UnionDef, Validator};
use crate::wire::{Wire, WireMap, WireView, TAG_KEY};

/// Decoding switches.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    pub strict: bool,
    pub old_style: bool,
    /// Extra checks for alias-labelled primitives.
    pub aliases: Option<&'static AliasValidators>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict: true,
            old_style: false,
            aliases: None,
        }
    }
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    /// Forward-compatible decoding for responses.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }

    pub fn with_old_style(mut self, old_style: bool) -> Self {
        self.old_style = old_style;
        self
    }

    pub fn with_aliases(mut self, aliases: &'static AliasValidators) -> Self {
        self.aliases = Some(aliases);
        self
    }
}

/// Decode `wire` as validated by `validator`.
pub fn decode<W: Wire>(
    validator: &Validator,
    wire: &W,
    options: &DecodeOptions,
) -> Result<Object, ValidationError> {
    Decoder {
        strict: options.strict,
        aliases: options.aliases,
    }
    .decode_sub(validator, wire, options.old_style)
}

fn expected<W>(what: &str, got: &WireView<'_, W>) -> ValidationError {
    ValidationError::new(format!("expected {what}, got {}", got.type_name()))
}

struct Decoder {
    strict: bool,
    aliases: Option<&'static AliasValidators>,
}

impl Decoder {
    fn decode_sub<W: Wire>(
        &self,
        validator: &Validator,
        wire: &W,
        old_style: bool,
    ) -> Result<Object, ValidationError> {
        match validator {
            Validator::StructTree(def) => {
                let subtype = self.determine_subtype(def, wire)?;
                self.decode_struct(&subtype, wire, false)
            }
            Validator::Struct(def) => self.decode_struct(def, wire, old_style),
            Validator::Union(def) if old_style => self.decode_union_old(def, wire),
            Validator::Union(def) => self.decode_union(def, wire),
            Validator::List(list) => self.decode_list(list, wire, old_style),
            Validator::Nullable(inner) => {
                if wire.view().is_null() {
                    Ok(Object::Null)
                } else {
                    self.decode_sub(inner, wire, old_style)
                }
            }
            Validator::Primitive(p) => self.decode_primitive(p, wire),
        }
    }

    fn decode_primitive<W: Wire>(&self, p: &Primitive, wire: &W) -> Result<Object, ValidationError> {
        let view = wire.view();
        let obj = match (p, view) {
            (Primitive::Void, view) => {
                if self.strict && !view.is_null() {
                    return Err(ValidationError::new("expected null, got value"));
                }
                return Ok(Object::Null);
            }
            (Primitive::Bytes(_), _) => Object::Bytes(wire.decode_bytes()?),
            (Primitive::Timestamp(tv), WireView::String(s)) => Object::Timestamp(tv.parse(s)?),
            (Primitive::Timestamp(_), other) => return Err(expected("string", &other)),
            (Primitive::Boolean, WireView::Bool(b)) => Object::Bool(b),
            (Primitive::Boolean, other) => return Err(expected("boolean", &other)),
            (Primitive::Integer(_), WireView::Integer(i)) => Object::Integer(i),
            (Primitive::Integer(_), other) => return Err(expected("integer", &other)),
            (Primitive::Float(_), WireView::Float(f)) => Object::Float(f),
            (Primitive::Float(_), WireView::Integer(i)) => Object::Float(i as f64),
            (Primitive::Float(_), other) => return Err(expected("float", &other)),
            (Primitive::String(_), WireView::String(s)) => Object::String(s.to_string()),
            (Primitive::String(_), other) => return Err(expected("string", &other)),
        };
        p.validate(&obj)?;
        if let Some(aliases) = self.aliases {
            aliases.check(p, &obj)?;
        }
        Ok(obj)
    }

    fn decode_struct<W: Wire>(
        &self,
        def: &Arc<StructDef>,
        wire: &W,
        old_style: bool,
    ) -> Result<Object, ValidationError> {
        let map = match wire.view() {
            WireView::Null if !def.has_required_fields() => {
                return Ok(Object::Struct(StructValue::new(def)));
            }
            WireView::Map(map) => map,
            other => return Err(expected("object", &other)),
        };

        if self.strict {
            if let Some(key) = map
                .keys()
                .find(|k| !def.has_field(k) && !k.starts_with(TAG_KEY))
            {
                return Err(ValidationError::new(format!("unknown field '{key}'")));
            }
        }

        let mut ins = StructValue::new(def);
        for field in def.fields() {
            if let Some(raw) = map.get(field.name()) {
                let value = self
                    .decode_sub(field.validator(), raw, old_style)
                    .map_err(|e| e.under(field.name()))?;
                ins.set(field.name(), value)?;
            } else if let Some(default) = field.validator().default_value() {
                ins.set(field.name(), default)?;
            }
        }
        ins.validate_fields_only()?;
        Ok(Object::Struct(ins))
    }

    /// Map an unrecognised tag to the catch-all when lenient.
    fn catch_all_for(&self, def: &UnionDef, tag: &str) -> Result<String, ValidationError> {
        match def.catch_all() {
            Some(catch_all) if !self.strict => {
                debug!(union_type = def.name(), tag, catch_all, "unknown union tag mapped to catch-all");
                Ok(catch_all.to_string())
            }
            _ => Err(ValidationError::new(format!("unknown tag '{tag}'"))),
        }
    }

    /// Resolve a union given in its bare-string form.
    fn resolve_symbol(&self, def: &UnionDef, tag: &str) -> Result<String, ValidationError> {
        let Some(member) = def.lookup(tag) else {
            return self.catch_all_for(def, tag);
        };
        if !(member.is_void() || member.is_nullable()) {
            return Err(ValidationError::new(format!(
                "expected object for '{tag}', got symbol"
            )));
        }
        if def.catch_all() == Some(tag) {
            return Err(ValidationError::new(format!(
                "unexpected use of the catch-all tag '{tag}'"
            )));
        }
        Ok(tag.to_string())
    }

    fn decode_union<W: Wire>(&self, def: &Arc<UnionDef>, wire: &W) -> Result<Object, ValidationError> {
        let (tag, value) = match wire.view() {
            WireView::String(s) => (self.resolve_symbol(def, s)?, None),
            WireView::Map(map) => self.decode_union_dict(def, wire, &map)?,
            other => return Err(expected("string or object", &other)),
        };
        Ok(Object::Union(UnionValue::new(def, tag, value)?))
    }

    fn decode_union_dict<W: Wire>(
        &self,
        def: &UnionDef,
        wire: &W,
        map: &WireMap<'_, W>,
    ) -> Result<(String, Option<Object>), ValidationError> {
        let raw_tag = map
            .get(TAG_KEY)
            .ok_or_else(|| ValidationError::new("missing '.tag' key"))?;
        let tag = match raw_tag.view() {
            WireView::String(s) => s,
            other => {
                return Err(ValidationError::new(format!(
                    "tag must be string, got {}",
                    other.type_name()
                )))
            }
        };

        let Some(member) = def.lookup(tag) else {
            return Ok((self.catch_all_for(def, tag)?, None));
        };
        if def.catch_all() == Some(tag) {
            return Err(ValidationError::new(format!(
                "unexpected use of the catch-all tag '{tag}'"
            )));
        }

        let nullable = member.is_nullable();
        let value = match member.unwrap_nullable() {
            Validator::Primitive(Primitive::Void) => {
                // Lenient decoding tolerates a void member that gained a payload.
                if self.strict {
                    if let Some(raw) = map.get(tag) {
                        let view = raw.view();
                        if !view.is_null() {
                            return Err(expected("null", &view));
                        }
                    }
                    reject_extra_keys(map, tag)?;
                }
                None
            }
            Validator::Primitive(_)
            | Validator::List(_)
            | Validator::StructTree(_)
            | Validator::Union(_) => {
                let value = match map.get(tag) {
                    Some(raw) => Some(
                        self.decode_sub(member, raw, false)
                            .map_err(|e| e.under(tag))?,
                    ),
                    None if nullable => None,
                    None => return Err(ValidationError::new(format!("missing '{tag}' key"))),
                };
                reject_extra_keys(map, tag)?;
                value
            }
            Validator::Struct(_) => {
                if nullable && map.len() == 1 {
                    None
                } else {
                    Some(
                        self.decode_sub(member.unwrap_nullable(), wire, false)
                            .map_err(|e| e.under(tag))?,
                    )
                }
            }
            Validator::Nullable(_) => {
                return Err(ValidationError::new(format!(
                    "tag '{tag}' has a doubly nullable validator"
                )))
            }
        };
        Ok((tag.to_string(), value))
    }

    fn decode_union_old<W: Wire>(
        &self,
        def: &Arc<UnionDef>,
        wire: &W,
    ) -> Result<Object, ValidationError> {
        let (tag, value) = match wire.view() {
            WireView::String(s) => (self.resolve_symbol(def, s)?, None),
            WireView::Map(map) => {
                let mut entries = map.iter();
                let (Some((tag, raw)), None) = (entries.next(), entries.next()) else {
                    return Err(ValidationError::new(format!("expected 1 key, got {}", map.len())));
                };
                match def.lookup(tag) {
                    Some(_) if def.catch_all() == Some(tag) => {
                        return Err(ValidationError::new(format!(
                            "unexpected use of the catch-all tag '{tag}'"
                        )));
                    }
                    Some(member) => {
                        let raw_view = raw.view();
                        let value = if member.is_nullable() && raw_view.is_null() {
                            None
                        } else if member.is_void() {
                            if raw_view.is_null() || !self.strict {
                                None
                            } else {
                                return Err(expected("null", &raw_view));
                            }
                        } else {
                            Some(self.decode_sub(member, raw, true).map_err(|e| e.under(tag))?)
                        };
                        (tag.to_string(), value)
                    }
                    None => (self.catch_all_for(def, tag)?, None),
                }
            }
            other => return Err(expected("string or object", &other)),
        };
        Ok(Object::Union(UnionValue::new(def, tag, value)?))
    }

    /// Pick the concrete struct a struct-tree document describes.
    fn determine_subtype<W: Wire>(
        &self,
        def: &Arc<StructDef>,
        wire: &W,
    ) -> Result<Arc<StructDef>, ValidationError> {
        let map = match wire.view() {
            WireView::Map(map) => map,
            other => return Err(expected("object", &other)),
        };
        let raw_tag = map
            .get(TAG_KEY)
            .ok_or_else(|| ValidationError::new("missing '.tag' key"))?;
        let tag = match raw_tag.view() {
            WireView::String(s) => s,
            other => return Err(expected("string", &other).under(TAG_KEY)),
        };
        let tree = def.subtypes().ok_or_else(|| {
            ValidationError::new(format!("{} does not enumerate subtypes", def.name()))
        })?;

        match tree.lookup_tags(&[tag]) {
            Some(Validator::Struct(leaf)) => Ok(Arc::clone(leaf)),
            Some(_) => Err(ValidationError::new(format!(
                "tag '{tag}' refers to non-leaf subtype"
            ))),
            None if self.strict => Err(ValidationError::new(format!("unknown subtype '{tag}'"))),
            None if tree.is_catch_all() => {
                debug!(base = def.name(), tag, "unknown subtype decoded as base type");
                Ok(Arc::clone(def))
            }
            None => Err(ValidationError::new(format!(
                "unknown subtype '{tag}' and '{}' is not a catch-all",
                def.name()
            ))),
        }
    }

    fn decode_list<W: Wire>(
        &self,
        list: &ListValidator,
        wire: &W,
        old_style: bool,
    ) -> Result<Object, ValidationError> {
        let items = match wire.view() {
            WireView::Array(items) => items,
            other => return Err(expected("list", &other)),
        };
        let decoded = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.decode_sub(list.item(), item, old_style)
                    .map_err(|e| e.under(i))
            })
            .collect::<Result<Vec<_>, _>>()?;
        list.check_length(decoded.len())?;
        Ok(Object::List(decoded))
    }
}

fn reject_extra_keys<W>(map: &WireMap<'_, W>, tag: &str) -> Result<(), ValidationError> {
    match map.keys().find(|k| *k != tag && *k != TAG_KEY) {
        Some(key) => Err(ValidationError::new(format!("unexpected key '{key}'"))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::{IntegerValidator, StringValidator};
    use serde_json::json;

    fn dec(v: &Validator, doc: serde_json::Value) -> Result<Object, ValidationError> {
        decode(v, &doc, &DecodeOptions::default())
    }

    #[test]
    fn integer_rejects_float_and_bool() {
        let v = Validator::from(IntegerValidator::int64());
        assert_eq!(dec(&v, json!(5)).unwrap(), Object::Integer(5));
        assert_eq!(
            dec(&v, json!(true)).unwrap_err().message(),
            "expected integer, got boolean"
        );
        assert!(dec(&v, json!(5.5)).is_err());
    }

    #[test]
    fn void_strictness() {
        let v = Validator::void();
        assert!(dec(&v, json!(null)).is_ok());
        assert_eq!(
            dec(&v, json!(1)).unwrap_err().message(),
            "expected null, got value"
        );
        assert!(decode(&v, &json!(1), &DecodeOptions::lenient()).is_ok());
    }

    #[test]
    fn list_bounds_checked_after_elements() {
        let v = Validator::List(ListValidator::new(StringValidator::new()).min_items(2));
        assert!(dec(&v, json!(["a", "b"])).is_ok());
        assert!(dec(&v, json!(["a"])).is_err());
        assert_eq!(dec(&v, json!(["a", 1])).unwrap_err().path(), "[1]");
    }

    #[test]
    fn non_object_struct_input_is_rejected() {
        let def = StructDef::builder("t.S")
            .field("a", StringValidator::new())
            .build();
        let err = dec(&Validator::structure(&def), json!([1])).unwrap_err();
        assert_eq!(err.message(), "expected object, got list");
    }

    #[test]
    fn null_struct_with_no_required_fields_is_empty_instance() {
        let def = StructDef::builder("t.Opts")
            .field("a", Validator::nullable(StringValidator::new()))
            .build();
        let obj = dec(&Validator::structure(&def), json!(null)).unwrap();
        assert!(obj.as_struct().is_some());
    }
}
