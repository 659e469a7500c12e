//! # Encoder
//!
//! Turns an [`Object`] into a wire document under the guidance of a
//! [`Validator`]. The walk is the same for every output format; only the
//! [`Wire`] constructors differ.
//!
//! ## Styles
//!
//! New style (the default) represents a union as `{".tag": t, ...}`, merging
//! struct payload fields into the same map, and a struct-tree instance as
//! its fields plus `.tag`. Old style represents a union as a bare string for
//! payload-less tags or `{t: payload}`, and a struct-tree instance as
//! `{t: {fields}}`.
//!
//! ## Permissions
//!
//! Union tags behind a permission scope are only encodable when the caller
//! holds the matching grant in [`EncodeOptions::permissions`].

use crate::alias::AliasValidators;
use crate::error::{PathSegment, StoneError, ValidationError};
use crate::object::{Object, StructValue, UnionValue, NULL};
use crate::validators::{
    CallerPermissions, ListValidator, Primitive, StructDef, UnionDef, Validator,
};
use crate::wire::{Wire, TAG_KEY};

/// Encoding switches.
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub old_style: bool,
    pub permissions: CallerPermissions,
    /// Extra checks for alias-labelled primitives.
    pub aliases: Option<&'static AliasValidators>,
}

impl EncodeOptions {
    pub fn old_style() -> Self {
        Self {
            old_style: true,
            ..Self::default()
        }
    }

    pub fn with_permissions(mut self, permissions: CallerPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_aliases(mut self, aliases: &'static AliasValidators) -> Self {
        self.aliases = Some(aliases);
        self
    }
}

/// Encode `obj` as validated by `validator`.
pub fn encode<W: Wire>(
    validator: &Validator,
    obj: &Object,
    options: &EncodeOptions,
) -> Result<W, StoneError> {
    Encoder { options }.encode_sub(validator, obj)
}

fn within(err: StoneError, segment: impl Into<PathSegment>) -> StoneError {
    match err {
        StoneError::Validation(e) => StoneError::Validation(e.under(segment)),
        other => other,
    }
}

fn as_struct<'a>(obj: &'a Object, def: &StructDef) -> Result<&'a StructValue, ValidationError> {
    obj.as_struct().ok_or_else(|| {
        ValidationError::new(format!("expected type {}, got {}", def.name(), obj.type_name()))
    })
}

fn as_union<'a>(obj: &'a Object, def: &UnionDef) -> Result<&'a UnionValue, ValidationError> {
    obj.as_union().ok_or_else(|| {
        ValidationError::new(format!("expected type {}, got {}", def.name(), obj.type_name()))
    })
}

struct Encoder<'o> {
    options: &'o EncodeOptions,
}

impl Encoder<'_> {
    fn encode_sub<W: Wire>(&self, validator: &Validator, obj: &Object) -> Result<W, StoneError> {
        match validator {
            Validator::List(list) => {
                validator.validate(obj)?;
                self.encode_list(list, obj)
            }
            Validator::Nullable(inner) => {
                validator.validate(obj)?;
                if obj.is_null() {
                    Ok(W::null())
                } else {
                    self.encode_sub(inner, obj)
                }
            }
            Validator::Primitive(p) => self.encode_primitive(p, obj),
            Validator::StructTree(def) => {
                validator.validate(obj)?;
                self.encode_struct_tree(def, obj)
            }
            Validator::Struct(def) => {
                validator.validate_type_only(obj)?;
                Ok(W::from_entries(self.encode_struct_fields(def, obj)?))
            }
            Validator::Union(def) => {
                validator.validate_type_only(obj)?;
                self.encode_union(def, obj)
            }
        }
    }

    fn encode_list<W: Wire>(&self, list: &ListValidator, obj: &Object) -> Result<W, StoneError> {
        let items = obj.as_list().unwrap_or_default();
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            out.push(self.encode_sub(list.item(), item).map_err(|e| within(e, i))?);
        }
        Ok(W::from_array(out))
    }

    fn check_alias(&self, p: &Primitive, obj: &Object) -> Result<(), ValidationError> {
        match self.options.aliases {
            Some(aliases) => aliases.check(p, obj),
            None => Ok(()),
        }
    }

    fn encode_primitive<W: Wire>(&self, p: &Primitive, obj: &Object) -> Result<W, StoneError> {
        // Booleans given to integer fields are emitted as 0/1.
        if let (Primitive::Integer(iv), Object::Bool(b)) = (p, obj) {
            let i = i128::from(*b);
            iv.check(i)?;
            self.check_alias(p, &Object::Integer(i))?;
            return Ok(W::from_integer(i)?);
        }
        p.validate(obj)?;
        self.check_alias(p, obj)?;
        let encoded = match (p, obj) {
            (Primitive::Void, _) => W::null(),
            (Primitive::Boolean, Object::Bool(b)) => W::from_bool(*b),
            (Primitive::Integer(_), Object::Integer(i)) => W::from_integer(*i)?,
            (Primitive::Float(_), Object::Float(f)) => W::from_float(*f)?,
            (Primitive::Float(_), Object::Integer(i)) => W::from_float(*i as f64)?,
            (Primitive::String(_), Object::String(s)) => W::from_string(s.clone()),
            (Primitive::Bytes(_), Object::Bytes(b)) => W::from_bytes(b),
            (Primitive::Timestamp(tv), Object::Timestamp(dt)) => W::from_string(tv.render(dt)?),
            (_, other) => {
                return Err(ValidationError::new(format!(
                    "cannot encode {} as {}",
                    other.type_name(),
                    p.kind_name()
                ))
                .into())
            }
        };
        Ok(encoded)
    }

    /// Fields of `def`, looked up by name in the instance. Unset optional
    /// fields and explicit nulls are omitted.
    fn encode_struct_fields<W: Wire>(
        &self,
        def: &StructDef,
        obj: &Object,
    ) -> Result<Vec<(String, W)>, StoneError> {
        let value = as_struct(obj, def)?;
        let mut out = Vec::with_capacity(def.fields().len());
        for field in def.fields() {
            match value.slot(field.name()).flatten() {
                Some(v) if v.is_null() => {}
                Some(v) => {
                    let encoded = self
                        .encode_sub(field.validator(), v)
                        .map_err(|e| within(e, field.name()))?;
                    out.push((field.name().to_string(), encoded));
                }
                None if field.is_required() => {
                    return Err(
                        ValidationError::with_parent("missing required field", field.name()).into(),
                    );
                }
                None => {}
            }
        }
        Ok(out)
    }

    fn encode_struct_tree<W: Wire>(&self, def: &StructDef, obj: &Object) -> Result<W, StoneError> {
        let value = as_struct(obj, def)?;
        let tree = def.subtypes().ok_or_else(|| {
            StoneError::Consistency(format!("{} does not enumerate subtypes", def.name()))
        })?;
        let (tags, subtype) = tree.lookup_type(value.type_name()).ok_or_else(|| {
            StoneError::Consistency(format!(
                "{} is not a registered subtype of {}",
                value.type_name(),
                def.name()
            ))
        })?;
        let [tag] = tags else {
            return Err(StoneError::Consistency(format!(
                "{} is registered under tag path '{}'; only single-segment paths can be encoded",
                value.type_name(),
                tags.join(".")
            )));
        };
        let Validator::Struct(leaf) = subtype else {
            return Err(StoneError::Consistency(format!(
                "cannot encode {} because it enumerates subtypes",
                value.type_name()
            )));
        };

        let fields = self.encode_struct_fields(leaf, obj)?;
        if self.options.old_style {
            return Ok(W::from_entries(vec![(tag.clone(), W::from_entries(fields))]));
        }
        let mut entries = Vec::with_capacity(fields.len() + 1);
        entries.push((TAG_KEY.to_string(), W::from_string(tag.clone())));
        entries.extend(fields);
        Ok(W::from_entries(entries))
    }

    fn encode_union<W: Wire>(&self, def: &UnionDef, obj: &Object) -> Result<W, StoneError> {
        let value = as_union(obj, def)?;
        let tag = value.tag();
        let member = def.resolve(tag, &self.options.permissions).ok_or_else(|| {
            ValidationError::new(format!(
                "tag '{tag}' of {} is not visible to the caller",
                def.name()
            ))
        })?;
        let payload = value.value();
        let is_none = member.is_void() || (member.is_nullable() && payload.is_none());

        if self.options.old_style {
            if is_none {
                return Ok(W::from_string(tag.to_string()));
            }
            let encoded = self
                .encode_sub(member, payload.unwrap_or(&NULL))
                .map_err(|e| within(e, tag))?;
            return Ok(W::from_entries(vec![(tag.to_string(), encoded)]));
        }

        let mut entries = vec![(TAG_KEY.to_string(), W::from_string(tag.to_string()))];
        if is_none {
            return Ok(W::from_entries(entries));
        }
        let payload = payload.unwrap_or(&NULL);
        match member.unwrap_nullable() {
            Validator::Struct(member_def) => {
                let checked = if member.is_nullable() {
                    member.validate(payload)
                } else {
                    member.validate_type_only(payload)
                };
                checked.map_err(|e| e.under(tag))?;
                let fields = self
                    .encode_struct_fields(member_def, payload)
                    .map_err(|e| within(e, tag))?;
                entries.extend(fields);
            }
            _ => {
                let encoded = self.encode_sub(member, payload).map_err(|e| within(e, tag))?;
                entries.push((tag.to_string(), encoded));
            }
        }
        Ok(W::from_entries(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::{IntegerValidator, StringValidator, UnionDef};
    use serde_json::{json, Value};

    fn enc(v: &Validator, obj: &Object) -> Result<Value, StoneError> {
        encode(v, obj, &EncodeOptions::default())
    }

    #[test]
    fn bool_into_integer_field_emits_number() {
        let v = Validator::from(IntegerValidator::uint32());
        assert_eq!(enc(&v, &Object::Bool(true)).unwrap(), json!(1));
        assert_eq!(enc(&v, &Object::Bool(false)).unwrap(), json!(0));
    }

    #[test]
    fn float_field_accepts_integer() {
        let v = Validator::from(crate::validators::FloatValidator::float64());
        assert_eq!(enc(&v, &Object::Integer(2)).unwrap(), json!(2.0));
    }

    #[test]
    fn list_element_errors_carry_index() {
        let v = Validator::list(StringValidator::new().max_length(1));
        let obj = Object::List(vec!["a".into(), "bb".into()]);
        let err = enc(&v, &obj).unwrap_err();
        assert_eq!(err.as_validation().unwrap().path(), "[1]");
    }

    #[test]
    fn union_void_and_payload_shapes() {
        let def = UnionDef::builder("t.U")
            .void("a")
            .tag("b", IntegerValidator::int32())
            .build();
        let v = Validator::union(&def);
        let a = Object::Union(UnionValue::void(&def, "a").unwrap());
        let b = Object::Union(UnionValue::new(&def, "b", Some(Object::Integer(-3))).unwrap());
        assert_eq!(enc(&v, &a).unwrap(), json!({".tag": "a"}));
        assert_eq!(enc(&v, &b).unwrap(), json!({".tag": "b", "b": -3}));

        let old = EncodeOptions::old_style();
        assert_eq!(encode::<Value>(&v, &a, &old).unwrap(), json!("a"));
        assert_eq!(encode::<Value>(&v, &b, &old).unwrap(), json!({"b": -3}));
    }

    #[test]
    fn wrong_object_kind_is_rejected() {
        let v = Validator::from(StringValidator::new());
        let err = enc(&v, &Object::Integer(1)).unwrap_err();
        assert_eq!(err.to_string(), "expected string, got integer");
    }
}
