use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::error::ValidationError;
use crate::object::{Object, UnionValue, NULL};
use crate::validators::{StructDef, Validator};

/// An instance of a struct type.
///
/// Each field slot is either unset or holds a value that passed the field's
/// validator when it was assigned. Reading an unset field yields its
/// declared default, null for nullable fields, or a "missing required
/// field" error.
#[derive(Debug, Clone)]
pub struct StructValue {
    def: Arc<StructDef>,
    slots: Vec<Option<Object>>,
}

impl StructValue {
    /// An instance with every field unset.
    pub fn new(def: &Arc<StructDef>) -> Self {
        Self {
            def: Arc::clone(def),
            slots: vec![None; def.fields().len()],
        }
    }

    pub fn def(&self) -> &Arc<StructDef> {
        &self.def
    }

    pub fn type_name(&self) -> &str {
        self.def.name()
    }

    fn index(&self, name: &str) -> Result<usize, ValidationError> {
        self.def.field_index(name).ok_or_else(|| {
            ValidationError::new(format!("unknown field '{name}' for {}", self.def.name()))
        })
    }

    /// Assign a field after validating the value. Composite values are
    /// checked by type only since they were validated when built.
    pub fn set(&mut self, name: &str, value: impl Into<Object>) -> Result<(), ValidationError> {
        let idx = self.index(name)?;
        let value = value.into();
        check_assignment(self.def.fields()[idx].validator(), &value).map_err(|e| e.under(name))?;
        self.slots[idx] = Some(value);
        Ok(())
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: &str, value: impl Into<Object>) -> Result<Self, ValidationError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Return a field to the unset state.
    pub fn clear(&mut self, name: &str) -> Result<(), ValidationError> {
        let idx = self.index(name)?;
        self.slots[idx] = None;
        Ok(())
    }

    /// True when the field was explicitly assigned, even to null.
    pub fn is_present(&self, name: &str) -> bool {
        self.def
            .field_index(name)
            .is_some_and(|idx| self.slots[idx].is_some())
    }

    /// The raw slot: `None` if the type has no such field, `Some(None)` if
    /// the field is unset.
    pub fn slot(&self, name: &str) -> Option<Option<&Object>> {
        self.def
            .field_index(name)
            .map(|idx| self.slots[idx].as_ref())
    }

    /// Read a field, falling back to its default or null when unset.
    pub fn get(&self, name: &str) -> Result<&Object, ValidationError> {
        let idx = self.index(name)?;
        if let Some(value) = &self.slots[idx] {
            return Ok(value);
        }
        let field = &self.def.fields()[idx];
        if let Some(default) = field.default() {
            Ok(default)
        } else if field.validator().is_nullable() {
            Ok(&NULL)
        } else {
            Err(ValidationError::with_parent("missing required field", name))
        }
    }

    /// Like [`get`](Self::get) but maps null to `None`.
    pub fn get_opt(&self, name: &str) -> Result<Option<&Object>, ValidationError> {
        self.get(name).map(|v| if v.is_null() { None } else { Some(v) })
    }

    /// Assigned fields, in declaration order.
    pub fn present_fields(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.def
            .fields()
            .iter()
            .zip(&self.slots)
            .filter_map(|(f, slot)| slot.as_ref().map(|v| (f.name(), v)))
    }

    /// Report the first required field that is unset.
    pub fn validate_fields_only(&self) -> Result<(), ValidationError> {
        for (field, slot) in self.def.fields().iter().zip(&self.slots) {
            if slot.is_none() && field.is_required() {
                return Err(ValidationError::with_parent("missing required field", field.name()));
            }
        }
        Ok(())
    }

    // -- Typed accessors ------------------------------------------------------

    fn typed<'a, T>(
        &'a self,
        name: &str,
        what: &str,
        pick: impl FnOnce(&'a Object) -> Option<T>,
    ) -> Result<T, ValidationError> {
        let value = self.get(name)?;
        pick(value).ok_or_else(|| {
            ValidationError::with_parent(
                format!("expected {what}, got {}", value.type_name()),
                name,
            )
        })
    }

    pub fn get_str(&self, name: &str) -> Result<&str, ValidationError> {
        self.typed(name, "string", Object::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, ValidationError> {
        self.typed(name, "boolean", Object::as_bool)
    }

    pub fn get_u32(&self, name: &str) -> Result<u32, ValidationError> {
        self.typed(name, "uint32", Object::as_u32)
    }

    pub fn get_u64(&self, name: &str) -> Result<u64, ValidationError> {
        self.typed(name, "uint64", Object::as_u64)
    }

    pub fn get_i64(&self, name: &str) -> Result<i64, ValidationError> {
        self.typed(name, "int64", Object::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Result<f64, ValidationError> {
        self.typed(name, "float", Object::as_f64)
    }

    pub fn get_bytes(&self, name: &str) -> Result<&[u8], ValidationError> {
        self.typed(name, "bytes", Object::as_bytes)
    }

    pub fn get_timestamp(&self, name: &str) -> Result<NaiveDateTime, ValidationError> {
        self.typed(name, "timestamp", |o| o.as_timestamp().copied())
    }

    pub fn get_list(&self, name: &str) -> Result<&[Object], ValidationError> {
        self.typed(name, "list", Object::as_list)
    }

    pub fn get_struct(&self, name: &str) -> Result<&StructValue, ValidationError> {
        self.typed(name, "struct", Object::as_struct)
    }

    pub fn get_union(&self, name: &str) -> Result<&UnionValue, ValidationError> {
        self.typed(name, "union", Object::as_union)
    }
}

fn check_assignment(validator: &Validator, value: &Object) -> Result<(), ValidationError> {
    match validator {
        Validator::Nullable(_) if value.is_null() => Ok(()),
        Validator::Nullable(inner) => check_assignment(inner, value),
        Validator::Struct(_) | Validator::StructTree(_) | Validator::Union(_) => {
            validator.validate_type_only(value)
        }
        Validator::Primitive(_) | Validator::List(_) => validator.validate(value),
    }
}

/// Equal when the types are related by inheritance, declare the same field
/// names, and every field reads back equal (defaults included).
impl PartialEq for StructValue {
    fn eq(&self, other: &Self) -> bool {
        let related = self.def.is_a(other.def.name()) || other.def.is_a(self.def.name());
        related
            && self.def.fields().len() == other.def.fields().len()
            && self.def.fields().iter().all(|f| {
                other.def.has_field(f.name())
                    && self.get(f.name()).ok() == other.get(f.name()).ok()
            })
    }
}
