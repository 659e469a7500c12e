//! Atomic validators: booleans, integers, floats, strings, bytes,
//! timestamps and void.

use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::error::ValidationError;
use crate::object::Object;

/// Leaf validator kinds.
#[derive(Debug, Clone)]
pub enum Primitive {
    Boolean,
    Integer(IntegerValidator),
    Float(FloatValidator),
    String(StringValidator),
    Bytes(BytesValidator),
    Timestamp(TimestampValidator),
    /// Absence of a value.
    Void,
}

impl Primitive {
    /// Check type and constraints of `obj`.
    pub fn validate(&self, obj: &Object) -> Result<(), ValidationError> {
        match self {
            Self::Boolean => match obj {
                Object::Bool(_) => Ok(()),
                other => Err(expected("boolean", other)),
            },
            Self::Integer(v) => v.validate(obj),
            Self::Float(v) => v.validate(obj),
            Self::String(v) => v.validate(obj),
            Self::Bytes(v) => v.validate(obj),
            Self::Timestamp(_) => match obj {
                Object::Timestamp(_) => Ok(()),
                other => Err(expected("timestamp", other)),
            },
            Self::Void => match obj {
                Object::Null => Ok(()),
                other => Err(expected("null", other)),
            },
        }
    }

    /// Short name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer(v) => v.width().name(),
            Self::Float(v) => v.width().name(),
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
            Self::Void => "void",
        }
    }

    /// Name of the alias type this validator stands for, if labelled.
    pub fn alias_name(&self) -> Option<&str> {
        match self {
            Self::Integer(v) => v.alias_name(),
            Self::Float(v) => v.alias_name(),
            Self::String(v) => v.alias_name(),
            Self::Bytes(v) => v.alias_name(),
            Self::Timestamp(v) => v.alias_name(),
            Self::Boolean | Self::Void => None,
        }
    }
}

macro_rules! alias_label {
    ($($t:ty),*) => {
        $(impl $t {
            /// Label this validator as the alias type `name` (e.g.
            /// `common.EmailAddress`) so checks registered for that alias in
            /// [`AliasValidators`](crate::alias::AliasValidators) apply to it.
            pub fn alias(mut self, name: &str) -> Self {
                self.alias = Some(Arc::from(name));
                self
            }

            pub fn alias_name(&self) -> Option<&str> {
                self.alias.as_deref()
            }
        })*
    };
}

alias_label!(
    IntegerValidator,
    FloatValidator,
    StringValidator,
    BytesValidator,
    TimestampValidator
);

pub(crate) fn expected(what: &str, got: &Object) -> ValidationError {
    ValidationError::new(format!("expected {what}, got {}", got.type_name()))
}

// -- Integers -----------------------------------------------------------------

/// Bit width and signedness of an integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerWidth {
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl IntegerWidth {
    /// Inclusive bounds representable by this width.
    pub fn bounds(self) -> (i128, i128) {
        match self {
            Self::Int32 => (i128::from(i32::MIN), i128::from(i32::MAX)),
            Self::UInt32 => (0, i128::from(u32::MAX)),
            Self::Int64 => (i128::from(i64::MIN), i128::from(i64::MAX)),
            Self::UInt64 => (0, i128::from(u64::MAX)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
        }
    }
}

/// Integer validator with a width and optional narrower bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerValidator {
    width: IntegerWidth,
    min_value: i128,
    max_value: i128,
    alias: Option<Arc<str>>,
}

impl IntegerValidator {
    pub fn new(width: IntegerWidth) -> Self {
        let (min_value, max_value) = width.bounds();
        Self {
            width,
            min_value,
            max_value,
            alias: None,
        }
    }

    pub fn int32() -> Self {
        Self::new(IntegerWidth::Int32)
    }

    pub fn uint32() -> Self {
        Self::new(IntegerWidth::UInt32)
    }

    pub fn int64() -> Self {
        Self::new(IntegerWidth::Int64)
    }

    pub fn uint64() -> Self {
        Self::new(IntegerWidth::UInt64)
    }

    /// Narrow the lower bound. Never widens past the width's own range.
    pub fn min_value(mut self, min: i128) -> Self {
        self.min_value = min.max(self.width.bounds().0);
        self
    }

    /// Narrow the upper bound. Never widens past the width's own range.
    pub fn max_value(mut self, max: i128) -> Self {
        self.max_value = max.min(self.width.bounds().1);
        self
    }

    pub fn width(&self) -> IntegerWidth {
        self.width
    }

    /// Booleans are rejected: a true integer is required.
    pub fn validate(&self, obj: &Object) -> Result<(), ValidationError> {
        match obj {
            Object::Integer(i) => self.check(*i),
            other => Err(expected("integer", other)),
        }
    }

    /// Range check on a raw integer.
    pub fn check(&self, value: i128) -> Result<(), ValidationError> {
        if value < self.min_value || value > self.max_value {
            return Err(ValidationError::new(format!(
                "{value} is not within range [{}, {}]",
                self.min_value, self.max_value
            )));
        }
        Ok(())
    }
}

// -- Floats -------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    Float32,
    Float64,
}

impl FloatWidth {
    pub fn name(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

/// Floating point validator. Integers are accepted and widened.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatValidator {
    width: FloatWidth,
    min_value: Option<f64>,
    max_value: Option<f64>,
    alias: Option<Arc<str>>,
}

impl FloatValidator {
    pub fn new(width: FloatWidth) -> Self {
        Self {
            width,
            min_value: None,
            max_value: None,
            alias: None,
        }
    }

    pub fn float32() -> Self {
        Self::new(FloatWidth::Float32)
    }

    pub fn float64() -> Self {
        Self::new(FloatWidth::Float64)
    }

    pub fn min_value(mut self, min: f64) -> Self {
        self.min_value = Some(min);
        self
    }

    pub fn max_value(mut self, max: f64) -> Self {
        self.max_value = Some(max);
        self
    }

    pub fn width(&self) -> FloatWidth {
        self.width
    }

    pub fn validate(&self, obj: &Object) -> Result<(), ValidationError> {
        match obj {
            Object::Float(f) => self.check(*f),
            Object::Integer(i) => self.check(*i as f64),
            other => Err(expected("float", other)),
        }
    }

    pub fn check(&self, value: f64) -> Result<(), ValidationError> {
        if value.is_nan() || value.is_infinite() {
            return Err(ValidationError::new(format!("{value} values are not supported")));
        }
        if self.width == FloatWidth::Float32 && value.abs() > f64::from(f32::MAX) {
            return Err(ValidationError::new(format!(
                "{value} is not within range of a 32-bit float"
            )));
        }
        if let Some(min) = self.min_value {
            if value < min {
                return Err(ValidationError::new(format!("{value} is not greater than {min}")));
            }
        }
        if let Some(max) = self.max_value {
            if value > max {
                return Err(ValidationError::new(format!("{value} is not less than {max}")));
            }
        }
        Ok(())
    }
}

// -- Strings ------------------------------------------------------------------

/// A regular expression matched against the whole string.
///
/// Compiled on first use so that validator tables can be built infallibly;
/// a malformed pattern surfaces as a validation error on every check.
#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    compiled: OnceLock<Result<Regex, String>>,
}

impl Pattern {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            compiled: OnceLock::new(),
        }
    }

    fn regex(&self) -> Result<&Regex, ValidationError> {
        self.compiled
            .get_or_init(|| {
                Regex::new(&format!(r"\A(?:{})\z", self.source)).map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|reason| {
                ValidationError::new(format!("invalid pattern '{}': {reason}", self.source))
            })
    }
}

/// String validator with optional length bounds and pattern.
#[derive(Debug, Clone, Default)]
pub struct StringValidator {
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Pattern>,
    alias: Option<Arc<str>>,
}

impl StringValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(Pattern::new(pattern));
        self
    }

    pub fn pattern_source(&self) -> Option<&str> {
        self.pattern.as_ref().map(|p| p.source.as_str())
    }

    /// Compile the pattern eagerly, reporting a malformed one.
    pub fn check_pattern(&self) -> Result<(), ValidationError> {
        match &self.pattern {
            Some(p) => p.regex().map(|_| ()),
            None => Ok(()),
        }
    }

    pub fn validate(&self, obj: &Object) -> Result<(), ValidationError> {
        match obj {
            Object::String(s) => self.check(s),
            other => Err(expected("string", other)),
        }
    }

    /// Lengths are counted in Unicode scalar values.
    pub fn check(&self, s: &str) -> Result<(), ValidationError> {
        let len = s.chars().count();
        if let Some(min) = self.min_length {
            if len < min {
                return Err(ValidationError::new(format!(
                    "'{s}' must be at least {min} characters, got {len}"
                )));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(ValidationError::new(format!(
                    "'{s}' must be at most {max} characters, got {len}"
                )));
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.regex()?.is_match(s) {
                return Err(ValidationError::new(format!(
                    "'{s}' did not match pattern '{}'",
                    pattern.source
                )));
            }
        }
        Ok(())
    }
}

// -- Bytes --------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BytesValidator {
    min_length: Option<usize>,
    max_length: Option<usize>,
    alias: Option<Arc<str>>,
}

impl BytesValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn validate(&self, obj: &Object) -> Result<(), ValidationError> {
        let bytes = match obj {
            Object::Bytes(b) => b,
            other => return Err(expected("bytes", other)),
        };
        if let Some(min) = self.min_length {
            if bytes.len() < min {
                return Err(ValidationError::new(format!(
                    "expected at least {min} bytes, got {}",
                    bytes.len()
                )));
            }
        }
        if let Some(max) = self.max_length {
            if bytes.len() > max {
                return Err(ValidationError::new(format!(
                    "expected at most {max} bytes, got {}",
                    bytes.len()
                )));
            }
        }
        Ok(())
    }
}

// -- Timestamps ---------------------------------------------------------------

/// Timestamp validator holding a strftime-compatible pattern, used
/// identically to render and to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampValidator {
    format: String,
    alias: Option<Arc<str>>,
}

impl TimestampValidator {
    pub fn new(format: &str) -> Self {
        Self {
            format: format.to_string(),
            alias: None,
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Reject patterns chrono cannot interpret.
    pub fn check_format(&self) -> Result<(), ValidationError> {
        if StrftimeItems::new(&self.format).any(|item| matches!(item, Item::Error)) {
            return Err(ValidationError::new(format!(
                "invalid timestamp format '{}'",
                self.format
            )));
        }
        Ok(())
    }

    pub fn render(&self, dt: &NaiveDateTime) -> Result<String, ValidationError> {
        self.check_format()?;
        let mut out = String::new();
        write!(out, "{}", dt.format(&self.format)).map_err(|_| {
            ValidationError::new(format!("cannot render timestamp with format '{}'", self.format))
        })?;
        Ok(out)
    }

    /// Date-only patterns yield midnight.
    pub fn parse(&self, s: &str) -> Result<NaiveDateTime, ValidationError> {
        self.check_format()?;
        match NaiveDateTime::parse_from_str(s, &self.format) {
            Ok(dt) => Ok(dt),
            Err(err) => NaiveDate::parse_from_str(s, &self.format)
                .map(|d| d.and_time(NaiveTime::MIN))
                .map_err(|_| {
                    ValidationError::new(format!(
                        "'{s}' does not match format '{}': {err}",
                        self.format
                    ))
                }),
        }
    }
}
