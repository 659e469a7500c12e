//! # Error Types
//!
//! Every schema-shape problem found while validating, encoding or decoding
//! surfaces as a single [`ValidationError`]. The error carries a human
//! readable message and a breadcrumb of [`PathSegment`]s that enclosing
//! structs, unions and lists push onto it as it unwinds, so a failure deep in
//! a payload renders as `team.members[3].email: 'x' did not match pattern`.
//!
//! Encoding can additionally fail with [`StoneError::Consistency`]. That
//! variant marks a programming error in the schema registration (for example
//! encoding a struct-tree instance whose concrete type was never registered)
//! rather than bad data, and callers should treat it as unrecoverable.

use thiserror::Error;

/// One step of the path from the root value to the failing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A struct field name or a union tag.
    Field(String),
    /// A list element index.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A value did not conform to its validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", render(.message, .parents))]
pub struct ValidationError {
    message: String,
    /// Innermost segment first; reversed when rendered.
    parents: Vec<PathSegment>,
}

impl ValidationError {
    /// Create an error with no path.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            parents: Vec::new(),
        }
    }

    /// Create an error already located under `parent`.
    pub fn with_parent(message: impl Into<String>, parent: impl Into<PathSegment>) -> Self {
        let mut err = Self::new(message);
        err.add_parent(parent);
        err
    }

    /// Record the enclosing field, tag or index as the error propagates outward.
    pub fn add_parent(&mut self, parent: impl Into<PathSegment>) {
        self.parents.push(parent.into());
    }

    /// Consuming variant of [`add_parent`](Self::add_parent), convenient in `map_err`.
    pub fn under(mut self, parent: impl Into<PathSegment>) -> Self {
        self.add_parent(parent);
        self
    }

    /// The bare message without the path prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Path segments from the outermost value inward.
    pub fn path_segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.parents.iter().rev()
    }

    /// Dotted/bracketed rendering of the path, empty at the root.
    pub fn path(&self) -> String {
        render_path(&self.parents)
    }
}

/// `path: message`, or the bare message at the root.
fn render(message: &str, parents: &[PathSegment]) -> String {
    if parents.is_empty() {
        message.to_string()
    } else {
        format!("{}: {message}", render_path(parents))
    }
}

/// `parents` is innermost first.
fn render_path(parents: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in parents.iter().rev() {
        match segment {
            PathSegment::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            PathSegment::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Errors raised while encoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoneError {
    /// The object does not satisfy its validator.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The schema registration itself is inconsistent with the value being
    /// encoded. Never caused by remote input.
    #[error("internal consistency violation: {0}")]
    Consistency(String),
}

impl StoneError {
    /// Returns the validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            Self::Consistency(_) => None,
        }
    }

    /// True for registration defects rather than data defects.
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_error_renders_message_only() {
        let err = ValidationError::new("expected string, got integer");
        assert_eq!(err.to_string(), "expected string, got integer");
        assert_eq!(err.path(), "");
    }

    #[test]
    fn parents_render_outermost_first() {
        let mut err = ValidationError::new("missing required field");
        err.add_parent("email");
        err.add_parent(3usize);
        err.add_parent("members");
        err.add_parent("team");
        assert_eq!(err.path(), "team.members[3].email");
        assert_eq!(err.to_string(), "team.members[3].email: missing required field");
    }

    #[test]
    fn usable_as_std_error() {
        let err = ValidationError::with_parent("expected list, got string", "tags").under(0usize);
        let boxed: Box<dyn std::error::Error> = Box::new(err.clone());
        assert_eq!(boxed.to_string(), "[0].tags: expected list, got string");
        assert_eq!(StoneError::from(err).to_string(), boxed.to_string());
    }

    #[test]
    fn consistency_is_distinct_from_validation() {
        let v: StoneError = ValidationError::new("bad").into();
        assert!(!v.is_consistency());
        assert!(v.as_validation().is_some());

        let c = StoneError::Consistency("unregistered subtype".into());
        assert!(c.is_consistency());
        assert!(c.as_validation().is_none());
    }
}
