//! # dbx-types -- Generated API Namespaces
//!
//! Data types, validator registries and route tables for the `common`,
//! `check`, `users_common`, `users` and `auth` namespaces.
//!
//! Each namespace module follows the same layout:
//!
//! - **Registry functions** (`*_def()`) build every `StructDef` / `UnionDef`
//!   once on first use and hand out `&'static` references. Struct trees are
//!   built bottom-up: the base fields, then each leaf extending them, then the
//!   base again with its subtype table.
//! - **Typed values**: structs as plain Rust structs (required fields as `T`,
//!   defaulted and nullable fields as `Option<T>`), unions as enums, struct
//!   trees as an enum over their leaves plus the base record.
//! - **`StoneType` impls** bridging each typed value to the dynamic object
//!   model so that `dbx-client` can encode arguments and decode results.
//! - **Routes** as `&'static Route` accessors.
//!
//! ## Crate Policy
//!
//! - Depends on `dbx-stone` only.
//! - No `panic!()` or `.unwrap()` outside tests. Registry construction is
//!   infallible; [`check_registries`] reports malformed registrations.

pub mod auth;
pub mod check;
pub mod common;
pub mod users;
pub mod users_common;

use dbx_stone::validators::{Primitive, Validator};
use dbx_stone::{Object, Route, StoneError, StoneType, StructValue, UnionValue, ValidationError};

/// Verify every registered definition: subtype tables and field lists are
/// consistent and every string pattern compiles.
pub fn check_registries() -> Result<(), StoneError> {
    for def in all_struct_defs() {
        def.check_consistency()?;
        for field in def.fields() {
            check_patterns(field.validator())
                .map_err(|e| StoneError::Validation(e.under(field.name()).under(def.name())))?;
        }
    }
    for def in all_union_defs() {
        for (tag, validator) in def.tags() {
            check_patterns(validator)
                .map_err(|e| StoneError::Validation(e.under(tag).under(def.name())))?;
        }
    }
    Ok(())
}

fn check_patterns(validator: &Validator) -> Result<(), ValidationError> {
    match validator {
        Validator::Primitive(Primitive::String(s)) => s.check_pattern(),
        Validator::Primitive(Primitive::Timestamp(t)) => t.check_format(),
        Validator::Primitive(_) => Ok(()),
        Validator::List(list) => check_patterns(list.item()),
        Validator::Nullable(inner) => check_patterns(inner),
        Validator::Struct(_) | Validator::StructTree(_) | Validator::Union(_) => Ok(()),
    }
}

fn all_struct_defs() -> Vec<&'static std::sync::Arc<dbx_stone::StructDef>> {
    let mut defs = Vec::new();
    defs.extend(common::struct_defs());
    defs.extend(check::struct_defs());
    defs.extend(users::struct_defs());
    defs.extend(auth::struct_defs());
    defs
}

fn all_union_defs() -> Vec<&'static std::sync::Arc<dbx_stone::UnionDef>> {
    let mut defs = Vec::new();
    defs.extend(common::union_defs());
    defs.extend(users_common::union_defs());
    defs.extend(users::union_defs());
    defs.extend(auth::union_defs());
    defs
}

/// Every route across all namespaces.
pub fn all_routes() -> Vec<&'static Route> {
    let mut routes = Vec::new();
    routes.extend(check::routes());
    routes.extend(users::routes());
    routes
}

// -- Conversion helpers shared by the generated modules --------------------------

pub(crate) fn expect_struct(obj: Object, type_name: &str) -> Result<StructValue, ValidationError> {
    match obj {
        Object::Struct(s) if s.def().is_a(type_name) => Ok(s),
        other => Err(ValidationError::new(format!(
            "expected type {type_name}, got {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn expect_union(obj: Object, type_name: &str) -> Result<UnionValue, ValidationError> {
    match obj {
        Object::Union(u) if u.type_name() == type_name => Ok(u),
        other => Err(ValidationError::new(format!(
            "expected type {type_name}, got {}",
            other.type_name()
        ))),
    }
}

/// Read a composite field into its typed form.
pub(crate) fn nested<T: StoneType>(s: &StructValue, name: &str) -> Result<T, ValidationError> {
    T::from_object(s.get(name)?.clone()).map_err(|e| e.under(name))
}

/// Read a nullable composite field into its typed form.
pub(crate) fn nested_opt<T: StoneType>(
    s: &StructValue,
    name: &str,
) -> Result<Option<T>, ValidationError> {
    s.get_opt(name)?
        .map(|v| T::from_object(v.clone()).map_err(|e| e.under(name)))
        .transpose()
}

/// Read a nullable string field.
pub(crate) fn opt_string(s: &StructValue, name: &str) -> Result<Option<String>, ValidationError> {
    match s.get_opt(name)? {
        Some(_) => s.get_str(name).map(|v| Some(v.to_string())),
        None => Ok(None),
    }
}

/// Read a defaulted field only when it was explicitly assigned.
pub(crate) fn if_present<T>(
    s: &StructValue,
    name: &str,
    read: impl FnOnce(&StructValue, &str) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    if s.is_present(name) {
        read(s, name).map(Some)
    } else {
        Ok(None)
    }
}

/// The payload of a union member as its typed form.
pub(crate) fn payload<T: StoneType>(u: &UnionValue) -> Result<T, ValidationError> {
    T::from_object(u.get(u.tag())?.clone()).map_err(|e| e.under(u.tag()))
}

/// The payload of a string-valued union member.
pub(crate) fn payload_string(u: &UnionValue) -> Result<String, ValidationError> {
    u.get(u.tag())?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ValidationError::with_parent("expected string", u.tag()))
}

pub(crate) fn unknown_tag(u: &UnionValue) -> ValidationError {
    ValidationError::new(format!("unknown tag '{}' for {}", u.tag(), u.type_name()))
}
