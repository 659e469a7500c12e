use std::sync::Arc;

use crate::error::ValidationError;
use crate::object::{Object, NULL};
use crate::validators::{UnionDef, Validator};

/// An instance of a union type: one tag and, for non-void tags, a payload.
#[derive(Debug, Clone)]
pub struct UnionValue {
    def: Arc<UnionDef>,
    tag: String,
    value: Option<Box<Object>>,
}

impl UnionValue {
    /// Construct and validate a union value.
    ///
    /// The tag may come from the base table or any permission-scoped table.
    /// A null payload is treated as no payload.
    pub fn new(
        def: &Arc<UnionDef>,
        tag: impl Into<String>,
        value: Option<Object>,
    ) -> Result<Self, ValidationError> {
        let tag = tag.into();
        let validator = def.lookup_any(&tag).ok_or_else(|| {
            ValidationError::new(format!("invalid tag '{tag}' for {}", def.name()))
        })?;
        let value = value.filter(|v| !v.is_null());

        match (validator, &value) {
            (Validator::Primitive(_), Some(_)) if validator.is_void() => {
                return Err(ValidationError::with_parent(
                    "void union member must not carry a value",
                    tag,
                ));
            }
            (Validator::Struct(_) | Validator::StructTree(_) | Validator::Union(_), Some(v)) => {
                validator.validate_type_only(v).map_err(|e| e.under(tag.as_str()))?;
            }
            (_, v) => {
                validator
                    .validate(v.as_ref().unwrap_or(&NULL))
                    .map_err(|e| e.under(tag.as_str()))?;
            }
        }

        Ok(Self {
            def: Arc::clone(def),
            tag,
            value: value.map(Box::new),
        })
    }

    /// A value for a void tag.
    pub fn void(def: &Arc<UnionDef>, tag: &str) -> Result<Self, ValidationError> {
        Self::new(def, tag, None)
    }

    pub fn def(&self) -> &Arc<UnionDef> {
        &self.def
    }

    pub fn type_name(&self) -> &str {
        self.def.name()
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn value(&self) -> Option<&Object> {
        self.value.as_deref()
    }

    pub fn into_parts(self) -> (String, Option<Object>) {
        (self.tag, self.value.map(|v| *v))
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// The payload, provided the value currently holds `tag`.
    pub fn get(&self, tag: &str) -> Result<&Object, ValidationError> {
        if self.tag != tag {
            return Err(ValidationError::new(format!(
                "tag '{tag}' not set, value holds '{}'",
                self.tag
            )));
        }
        Ok(self.value().unwrap_or(&NULL))
    }
}

impl PartialEq for UnionValue {
    fn eq(&self, other: &Self) -> bool {
        self.def.name() == other.def.name() && self.tag == other.tag && self.value == other.value
    }
}
