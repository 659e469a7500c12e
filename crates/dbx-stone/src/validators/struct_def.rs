//! # Struct Definitions
//!
//! A [`StructDef`] is the runtime descriptor of a Stone struct: its qualified
//! name, every field it carries (inherited ones first), the names of its
//! ancestors and, for a struct that enumerates subtypes, the
//! [`SubtypeTree`] mapping wire tag paths to concrete subtypes and concrete
//! type names back to tag paths.
//!
//! Definitions are immutable once built and shared behind `Arc` so that
//! subtype tables and object instances can point at them without copying.
//!
//! ## Building a hierarchy
//!
//! Subtypes extend their parent, so the parent's field list must exist before
//! the subtypes, and the parent's subtype tree must be populated after them.
//! Build the parent fields first, derive each subtype from that, then build
//! the final parent with its subtype registrations:
//!
//! ```
//! use dbx_stone::validators::{StructDef, StringValidator};
//!
//! let base = StructDef::builder("zoo.Animal")
//!     .field("name", StringValidator::new())
//!     .build();
//! let dog = StructDef::builder("zoo.Dog")
//!     .extends(&base)
//!     .field("breed", StringValidator::new())
//!     .build();
//! let animal = StructDef::builder("zoo.Animal")
//!     .field("name", StringValidator::new())
//!     .enumerated_subtypes(false)
//!     .subtype("dog", &dog)
//!     .build();
//! assert!(animal.check_consistency().is_ok());
//! assert!(dog.is_a("zoo.Animal"));
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::StoneError;
use crate::object::Object;
use crate::validators::Validator;

/// A named field together with its validator and declared default.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    validator: Validator,
    default: Option<Object>,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// The default declared in the schema, if any.
    pub fn default(&self) -> Option<&Object> {
        self.default.as_ref()
    }

    /// Neither nullable nor defaulted.
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.validator.is_nullable()
    }
}

/// Tag-path and type-name tables of a struct that enumerates subtypes.
#[derive(Debug, Clone, Default)]
pub struct SubtypeTree {
    by_tag: Vec<(Vec<String>, Validator)>,
    by_type: Vec<(String, Vec<String>, Validator)>,
    catch_all: bool,
}

impl SubtypeTree {
    /// Subtype validator registered under `tags`.
    pub fn lookup_tags(&self, tags: &[&str]) -> Option<&Validator> {
        self.by_tag
            .iter()
            .find(|(path, _)| path.iter().map(String::as_str).eq(tags.iter().copied()))
            .map(|(_, v)| v)
    }

    /// Tag path and validator for a concrete type name.
    pub fn lookup_type(&self, type_name: &str) -> Option<(&[String], &Validator)> {
        self.by_type
            .iter()
            .find(|(name, _, _)| name == type_name)
            .map(|(_, path, v)| (path.as_slice(), v))
    }

    /// Whether unknown subtype tags may fall back to the base struct.
    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    /// Registered tag paths, in registration order.
    pub fn tag_paths(&self) -> impl Iterator<Item = &[String]> {
        self.by_tag.iter().map(|(path, _)| path.as_slice())
    }
}

/// Runtime descriptor of a struct type.
#[derive(Debug)]
pub struct StructDef {
    name: String,
    fields: Vec<Field>,
    ancestors: Vec<String>,
    subtypes: Option<SubtypeTree>,
}

impl StructDef {
    pub fn builder(name: &str) -> StructDefBuilder {
        StructDefBuilder {
            name: name.to_string(),
            fields: Vec::new(),
            ancestors: Vec::new(),
            subtypes: None,
        }
    }

    /// Qualified name, e.g. `users.FullAccount`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields, inherited ones first.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_index(name).is_some()
    }

    /// Ancestor names, nearest first.
    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// True when this type is `type_name` or descends from it.
    pub fn is_a(&self, type_name: &str) -> bool {
        self.name == type_name || self.ancestors.iter().any(|a| a == type_name)
    }

    pub fn subtypes(&self) -> Option<&SubtypeTree> {
        self.subtypes.as_ref()
    }

    pub fn has_required_fields(&self) -> bool {
        self.fields.iter().any(Field::is_required)
    }

    /// Verify the registration invariants of this definition.
    ///
    /// Field names must be unique and must not use the reserved `.tag`
    /// prefix. For a subtype tree every tag path is non-empty and unique, no
    /// leaf path is a prefix of another path, and no concrete type is
    /// registered twice.
    pub fn check_consistency(&self) -> Result<(), StoneError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.starts_with(crate::wire::TAG_KEY) {
                return Err(StoneError::Consistency(format!(
                    "{}: field name '{}' uses the reserved tag prefix",
                    self.name, field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(StoneError::Consistency(format!(
                    "{}: duplicate field '{}'",
                    self.name, field.name
                )));
            }
        }

        let Some(tree) = &self.subtypes else {
            return Ok(());
        };

        let mut paths: HashSet<&[String]> = HashSet::new();
        for (path, validator) in &tree.by_tag {
            if path.is_empty() {
                return Err(StoneError::Consistency(format!(
                    "{}: subtype registered with an empty tag path",
                    self.name
                )));
            }
            if !paths.insert(path.as_slice()) {
                return Err(StoneError::Consistency(format!(
                    "{}: tag path '{}' registered twice",
                    self.name,
                    path.join(".")
                )));
            }
            let is_leaf = matches!(validator, Validator::Struct(_));
            if is_leaf {
                let shadowed = tree
                    .by_tag
                    .iter()
                    .any(|(other, _)| other.len() > path.len() && other.starts_with(path));
                if shadowed {
                    return Err(StoneError::Consistency(format!(
                        "{}: tag path '{}' is both a leaf and an internal node",
                        self.name,
                        path.join(".")
                    )));
                }
            }
        }

        let mut types = HashSet::new();
        for (type_name, _, _) in &tree.by_type {
            if !types.insert(type_name.as_str()) {
                return Err(StoneError::Consistency(format!(
                    "{}: subtype {type_name} registered twice",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`StructDef`].
#[derive(Debug)]
pub struct StructDefBuilder {
    name: String,
    fields: Vec<Field>,
    ancestors: Vec<String>,
    subtypes: Option<SubtypeTree>,
}

impl StructDefBuilder {
    /// Inherit `parent`'s fields (placed before this type's own) and
    /// record it as the nearest ancestor.
    pub fn extends(mut self, parent: &StructDef) -> Self {
        self.fields.splice(0..0, parent.fields.iter().cloned());
        self.ancestors = std::iter::once(parent.name.clone())
            .chain(parent.ancestors.iter().cloned())
            .collect();
        self
    }

    pub fn field(mut self, name: &str, validator: impl Into<Validator>) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            validator: validator.into(),
            default: None,
        });
        self
    }

    pub fn field_with_default(
        mut self,
        name: &str,
        validator: impl Into<Validator>,
        default: impl Into<Object>,
    ) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            validator: validator.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Mark this struct as enumerating subtypes.
    pub fn enumerated_subtypes(mut self, catch_all: bool) -> Self {
        self.subtypes.get_or_insert_with(SubtypeTree::default).catch_all = catch_all;
        self
    }

    /// Register a direct subtype under a single-segment tag.
    pub fn subtype(self, tag: &str, def: &Arc<StructDef>) -> Self {
        self.subtype_path(&[tag], def)
    }

    /// Register a subtype under a multi-segment tag path. Subtypes that
    /// enumerate their own subtypes are registered as internal nodes.
    pub fn subtype_path(mut self, tags: &[&str], def: &Arc<StructDef>) -> Self {
        let validator = if def.subtypes.is_some() {
            Validator::StructTree(Arc::clone(def))
        } else {
            Validator::Struct(Arc::clone(def))
        };
        let path: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        let tree = self.subtypes.get_or_insert_with(SubtypeTree::default);
        tree.by_tag.push((path.clone(), validator.clone()));
        tree.by_type.push((def.name.clone(), path, validator));
        self
    }

    pub fn build(self) -> Arc<StructDef> {
        Arc::new(StructDef {
            name: self.name,
            fields: self.fields,
            ancestors: self.ancestors,
            subtypes: self.subtypes,
        })
    }
}
