//! Bridge between strongly typed Rust values and the dynamic object model.

use crate::error::ValidationError;
use crate::object::Object;
use crate::validators::{Primitive, Validator};

static VOID: Validator = Validator::Primitive(Primitive::Void);

/// A Rust type with a registered Stone validator.
///
/// Implemented by every generated struct, union and struct tree so that
/// route invocation can encode arguments and decode results without the
/// caller touching [`Object`] directly.
pub trait StoneType: Sized {
    /// The validator describing this type.
    fn validator() -> &'static Validator;

    /// Build the dynamic representation. Setters validate, so constraint
    /// violations surface here.
    fn to_object(&self) -> Result<Object, ValidationError>;

    fn from_object(obj: Object) -> Result<Self, ValidationError>;
}

impl StoneType for () {
    fn validator() -> &'static Validator {
        &VOID
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(Object::Null)
    }

    fn from_object(_obj: Object) -> Result<Self, ValidationError> {
        Ok(())
    }
}

/// Convert an optional typed value, mapping `None` to null.
pub fn option_to_object<T: StoneType>(value: &Option<T>) -> Result<Object, ValidationError> {
    match value {
        Some(v) => v.to_object(),
        None => Ok(Object::Null),
    }
}

/// Convert every element of a list.
pub fn list_to_object<T: StoneType>(items: &[T]) -> Result<Object, ValidationError> {
    items
        .iter()
        .map(StoneType::to_object)
        .collect::<Result<Vec<_>, _>>()
        .map(Object::List)
}

/// Convert a list object back to typed elements, annotating failures with
/// the element index.
pub fn list_from_object<T: StoneType>(obj: Object) -> Result<Vec<T>, ValidationError> {
    match obj {
        Object::List(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| T::from_object(item).map_err(|e| e.under(i)))
            .collect(),
        other => Err(ValidationError::new(format!(
            "expected list, got {}",
            other.type_name()
        ))),
    }
}
