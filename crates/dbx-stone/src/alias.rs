//! Caller-supplied checks for alias types.
//!
//! An alias is a named primitive (`common.EmailAddress` is a string with a
//! pattern). Applications sometimes need stricter rules for an alias than
//! the schema declares, for example restricting email domains. Label the
//! primitive with [`StringValidator::alias`](crate::StringValidator::alias)
//! and register a check here; the encoder runs it on every value it writes
//! for that alias and the decoder on every value it reads.
//!
//! Checks see the value after the primitive's own validation passed. Their
//! errors propagate like any other validation error, so they pick up the
//! field path of the failing value.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ValidationError;
use crate::object::Object;
use crate::validators::Primitive;

type AliasCheck = Arc<dyn Fn(&Object) -> Result<(), ValidationError> + Send + Sync>;

/// Extra checks keyed by alias name.
#[derive(Clone, Default)]
pub struct AliasValidators {
    checks: HashMap<String, AliasCheck>,
}

impl AliasValidators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `check` for the alias `name`, replacing an earlier one.
    pub fn with(
        mut self,
        name: &str,
        check: impl Fn(&Object) -> Result<(), ValidationError> + Send + Sync + 'static,
    ) -> Self {
        self.checks.insert(name.to_string(), Arc::new(check));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run the check registered for `primitive`'s alias, if any.
    pub fn check(&self, primitive: &Primitive, obj: &Object) -> Result<(), ValidationError> {
        match primitive.alias_name().and_then(|name| self.checks.get(name)) {
            Some(check) => check(obj),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for AliasValidators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.checks.keys().collect();
        names.sort();
        f.debug_struct("AliasValidators").field("aliases", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::{IntegerValidator, StringValidator};

    fn no_spaces(obj: &Object) -> Result<(), ValidationError> {
        match obj {
            Object::String(s) if s.contains(' ') => Err(ValidationError::new("no spaces allowed")),
            _ => Ok(()),
        }
    }

    #[test]
    fn check_applies_only_to_labelled_primitive() {
        let checks = AliasValidators::new().with("team.Handle", no_spaces);
        let labelled = Primitive::String(StringValidator::new().alias("team.Handle"));
        let plain = Primitive::String(StringValidator::new());

        let err = checks.check(&labelled, &Object::from("a b")).unwrap_err();
        assert_eq!(err.message(), "no spaces allowed");
        assert!(checks.check(&labelled, &Object::from("ab")).is_ok());
        assert!(checks.check(&plain, &Object::from("a b")).is_ok());
    }

    #[test]
    fn unregistered_alias_passes() {
        let checks = AliasValidators::new().with("team.Handle", no_spaces);
        let other = Primitive::Integer(IntegerValidator::uint32().alias("team.Size"));
        assert!(checks.check(&other, &Object::Integer(3)).is_ok());
        assert!(checks.contains("team.Handle"));
        assert!(!checks.contains("team.Size"));
        assert_eq!(format!("{checks:?}"), r#"AliasValidators { aliases: ["team.Handle"] }"#);
    }
}
