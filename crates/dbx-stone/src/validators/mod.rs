//! # Validators
//!
//! A [`Validator`] describes the shape a value must have: a primitive with
//! constraints, a list of some element validator, a nullable wrapper, a
//! struct, a struct that enumerates subtypes, or a tagged union. Validators
//! compose recursively and drive both checking ([`Validator::validate`]) and
//! the encode/decode engine.
//!
//! ## Full versus type-only checks
//!
//! Struct and union instances are validated as they are built (every field
//! setter and union constructor checks its input), so the encoder only
//! confirms the *type* of a composite value with
//! [`Validator::validate_type_only`] and recurses into fields itself. Full
//! validation additionally walks every field and reports unset required
//! ones.

mod primitive;
mod struct_def;
mod union_def;

use std::sync::Arc;

pub use primitive::{
    BytesValidator, FloatValidator, FloatWidth, IntegerValidator, IntegerWidth, Primitive,
    StringValidator, TimestampValidator,
};
pub use struct_def::{Field, StructDef, StructDefBuilder, SubtypeTree};
pub use union_def::{CallerPermissions, Permission, UnionDef, UnionDefBuilder};

use crate::error::ValidationError;
use crate::object::{Object, StructValue};
use primitive::expected;

/// A composable value validator.
#[derive(Debug, Clone)]
pub enum Validator {
    Primitive(Primitive),
    List(ListValidator),
    /// Accepts null in addition to whatever the inner validator accepts.
    Nullable(Box<Validator>),
    Struct(Arc<StructDef>),
    /// A struct that enumerates subtypes; instances may be any registered
    /// subtype.
    StructTree(Arc<StructDef>),
    Union(Arc<UnionDef>),
}

impl Validator {
    pub fn boolean() -> Self {
        Self::Primitive(Primitive::Boolean)
    }

    pub fn void() -> Self {
        Self::Primitive(Primitive::Void)
    }

    /// Wrap in [`Validator::Nullable`]. Wrapping an already nullable
    /// validator is a no-op.
    pub fn nullable(inner: impl Into<Validator>) -> Self {
        match inner.into() {
            v @ Self::Nullable(_) => v,
            v => Self::Nullable(Box::new(v)),
        }
    }

    pub fn list(item: impl Into<Validator>) -> Self {
        Self::List(ListValidator::new(item))
    }

    /// A struct validator, or a struct-tree validator when `def` enumerates
    /// subtypes.
    pub fn structure(def: &Arc<StructDef>) -> Self {
        if def.subtypes().is_some() {
            Self::StructTree(Arc::clone(def))
        } else {
            Self::Struct(Arc::clone(def))
        }
    }

    pub fn union(def: &Arc<UnionDef>) -> Self {
        Self::Union(Arc::clone(def))
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Primitive(Primitive::Void))
    }

    /// The validator inside a nullable wrapper, or `self`.
    pub fn unwrap_nullable(&self) -> &Validator {
        match self {
            Self::Nullable(inner) => inner,
            other => other,
        }
    }

    /// Short description used in error messages.
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Primitive(p) => p.kind_name(),
            Self::List(_) => "list",
            Self::Nullable(inner) => inner.kind_name(),
            Self::Struct(def) | Self::StructTree(def) => def.name(),
            Self::Union(def) => def.name(),
        }
    }

    /// Full validation: type, constraints and, for structs, required fields.
    pub fn validate(&self, obj: &Object) -> Result<(), ValidationError> {
        match self {
            Self::Primitive(p) => p.validate(obj),
            Self::List(list) => list.validate(obj),
            Self::Nullable(inner) => match obj {
                Object::Null => Ok(()),
                other => inner.validate(other),
            },
            Self::Struct(_) | Self::StructTree(_) => {
                self.validate_type_only(obj)?;
                match obj {
                    Object::Struct(value) => value.validate_fields_only(),
                    other => Err(expected(self.kind_name(), other)),
                }
            }
            Self::Union(_) => self.validate_type_only(obj),
        }
    }

    /// Confirm only that a composite value is of the expected type (or a
    /// subtype). Non-composite validators fall back to full validation.
    pub fn validate_type_only(&self, obj: &Object) -> Result<(), ValidationError> {
        match self {
            Self::Struct(def) | Self::StructTree(def) => match obj {
                Object::Struct(value) if value.def().is_a(def.name()) => Ok(()),
                other => Err(ValidationError::new(format!(
                    "expected type {} or subtype, got {}",
                    def.name(),
                    other.type_name()
                ))),
            },
            Self::Union(def) => match obj {
                Object::Union(value) if value.def().name() == def.name() => Ok(()),
                other => Err(ValidationError::new(format!(
                    "expected type {}, got {}",
                    def.name(),
                    other.type_name()
                ))),
            },
            Self::Nullable(inner) => match obj {
                Object::Null => Ok(()),
                other => inner.validate_type_only(other),
            },
            Self::Primitive(_) | Self::List(_) => self.validate(obj),
        }
    }

    /// Whether an absent value can be filled in without input.
    pub fn has_default(&self) -> bool {
        match self {
            Self::Nullable(_) => true,
            Self::Struct(def) => !def.has_required_fields(),
            _ => false,
        }
    }

    /// The value substituted for an absent field: null for nullables, an
    /// empty instance for structs with no required fields.
    pub fn default_value(&self) -> Option<Object> {
        match self {
            Self::Nullable(_) => Some(Object::Null),
            Self::Struct(def) if !def.has_required_fields() => {
                Some(Object::Struct(StructValue::new(def)))
            }
            _ => None,
        }
    }
}

/// Validates lists element-wise with optional length bounds.
#[derive(Debug, Clone)]
pub struct ListValidator {
    item: Box<Validator>,
    min_items: Option<usize>,
    max_items: Option<usize>,
}

impl ListValidator {
    pub fn new(item: impl Into<Validator>) -> Self {
        Self {
            item: Box::new(item.into()),
            min_items: None,
            max_items: None,
        }
    }

    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn item(&self) -> &Validator {
        &self.item
    }

    pub fn check_length(&self, len: usize) -> Result<(), ValidationError> {
        if let Some(min) = self.min_items {
            if len < min {
                return Err(ValidationError::new(format!(
                    "expected at least {min} items, got {len}"
                )));
            }
        }
        if let Some(max) = self.max_items {
            if len > max {
                return Err(ValidationError::new(format!(
                    "expected at most {max} items, got {len}"
                )));
            }
        }
        Ok(())
    }

    pub fn validate(&self, obj: &Object) -> Result<(), ValidationError> {
        let items = match obj {
            Object::List(items) => items,
            other => return Err(expected("list", other)),
        };
        self.check_length(items.len())?;
        for (i, item) in items.iter().enumerate() {
            self.item.validate(item).map_err(|e| e.under(i))?;
        }
        Ok(())
    }
}

// -- Conversions ----------------------------------------------------------------

impl From<Primitive> for Validator {
    fn from(p: Primitive) -> Self {
        Self::Primitive(p)
    }
}

impl From<IntegerValidator> for Validator {
    fn from(v: IntegerValidator) -> Self {
        Self::Primitive(Primitive::Integer(v))
    }
}

impl From<FloatValidator> for Validator {
    fn from(v: FloatValidator) -> Self {
        Self::Primitive(Primitive::Float(v))
    }
}

impl From<StringValidator> for Validator {
    fn from(v: StringValidator) -> Self {
        Self::Primitive(Primitive::String(v))
    }
}

impl From<BytesValidator> for Validator {
    fn from(v: BytesValidator) -> Self {
        Self::Primitive(Primitive::Bytes(v))
    }
}

impl From<TimestampValidator> for Validator {
    fn from(v: TimestampValidator) -> Self {
        Self::Primitive(Primitive::Timestamp(v))
    }
}

impl From<ListValidator> for Validator {
    fn from(v: ListValidator) -> Self {
        Self::List(v)
    }
}

impl From<&Arc<StructDef>> for Validator {
    fn from(def: &Arc<StructDef>) -> Self {
        Self::structure(def)
    }
}

impl From<&Arc<UnionDef>> for Validator {
    fn from(def: &Arc<UnionDef>) -> Self {
        Self::union(def)
    }
}

impl From<&Validator> for Validator {
    fn from(v: &Validator) -> Self {
        v.clone()
    }
}
