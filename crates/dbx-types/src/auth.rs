//! # Namespace `auth`
//!
//! Errors returned by the HTTP layer itself rather than by a route: invalid
//! credentials (401) and rate limiting (429).

use std::sync::{Arc, OnceLock};

use dbx_stone::validators::{IntegerValidator, StringValidator, StructDef, UnionDef, Validator};
use dbx_stone::{Object, StoneType, StructValue, UnionValue, ValidationError};

use crate::{expect_struct, expect_union, if_present, nested, payload};

pub fn token_scope_error_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("auth.TokenScopeError")
            .field("required_scope", StringValidator::new())
            .build()
    })
}

pub fn auth_error_def() -> &'static Arc<UnionDef> {
    static DEF: OnceLock<Arc<UnionDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        UnionDef::builder("auth.AuthError")
            .void("invalid_access_token")
            .void("invalid_select_user")
            .void("invalid_select_admin")
            .void("user_suspended")
            .void("expired_access_token")
            .tag("missing_scope", token_scope_error_def())
            .void("route_access_denied")
            .catch_all("other")
            .build()
    })
}

pub fn rate_limit_reason_def() -> &'static Arc<UnionDef> {
    static DEF: OnceLock<Arc<UnionDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        UnionDef::builder("auth.RateLimitReason")
            .void("too_many_requests")
            .void("too_many_write_operations")
            .catch_all("other")
            .build()
    })
}

pub fn rate_limit_error_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("auth.RateLimitError")
            .field("reason", rate_limit_reason_def())
            .field_with_default("retry_after", IntegerValidator::uint64(), 1u64)
            .build()
    })
}

pub(crate) fn struct_defs() -> Vec<&'static Arc<StructDef>> {
    vec![token_scope_error_def(), rate_limit_error_def()]
}

pub(crate) fn union_defs() -> Vec<&'static Arc<UnionDef>> {
    vec![auth_error_def(), rate_limit_reason_def()]
}

/// The access token lacks a scope the route requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenScopeError {
    pub required_scope: String,
}

impl StoneType for TokenScopeError {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(token_scope_error_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(StructValue::new(token_scope_error_def())
            .with("required_scope", self.required_scope.as_str())?
            .into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "auth.TokenScopeError")?;
        Ok(Self {
            required_scope: s.get_str("required_scope")?.to_string(),
        })
    }
}

/// Errors occurring during authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidAccessToken,
    /// The team member id in `Dropbox-API-Select-User` is not valid.
    InvalidSelectUser,
    InvalidSelectAdmin,
    UserSuspended,
    ExpiredAccessToken,
    MissingScope(TokenScopeError),
    RouteAccessDenied,
    Other,
}

impl AuthError {
    fn tag(&self) -> &'static str {
        match self {
            Self::InvalidAccessToken => "invalid_access_token",
            Self::InvalidSelectUser => "invalid_select_user",
            Self::InvalidSelectAdmin => "invalid_select_admin",
            Self::UserSuspended => "user_suspended",
            Self::ExpiredAccessToken => "expired_access_token",
            Self::MissingScope(_) => "missing_scope",
            Self::RouteAccessDenied => "route_access_denied",
            Self::Other => "other",
        }
    }
}

impl StoneType for AuthError {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::union(auth_error_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        let value = match self {
            Self::MissingScope(e) => Some(e.to_object()?),
            _ => None,
        };
        Ok(UnionValue::new(auth_error_def(), self.tag(), value)?.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let u = expect_union(obj, "auth.AuthError")?;
        Ok(match u.tag() {
            "invalid_access_token" => Self::InvalidAccessToken,
            "invalid_select_user" => Self::InvalidSelectUser,
            "invalid_select_admin" => Self::InvalidSelectAdmin,
            "user_suspended" => Self::UserSuspended,
            "expired_access_token" => Self::ExpiredAccessToken,
            "missing_scope" => Self::MissingScope(payload(&u)?),
            "route_access_denied" => Self::RouteAccessDenied,
            _ => Self::Other,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    TooManyRequests,
    /// Too many write operations contending for the same namespace.
    TooManyWriteOperations,
    Other,
}

impl StoneType for RateLimitReason {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::union(rate_limit_reason_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        let tag = match self {
            Self::TooManyRequests => "too_many_requests",
            Self::TooManyWriteOperations => "too_many_write_operations",
            Self::Other => "other",
        };
        Ok(UnionValue::void(rate_limit_reason_def(), tag)?.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let u = expect_union(obj, "auth.RateLimitReason")?;
        Ok(match u.tag() {
            "too_many_requests" => Self::TooManyRequests,
            "too_many_write_operations" => Self::TooManyWriteOperations,
            _ => Self::Other,
        })
    }
}

/// Error body of a 429 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitError {
    pub reason: RateLimitReason,
    /// Seconds to wait before retrying; 1 when the server omits it.
    pub retry_after: Option<u64>,
}

impl RateLimitError {
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after.unwrap_or(1)
    }
}

impl StoneType for RateLimitError {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(rate_limit_error_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        let mut s = StructValue::new(rate_limit_error_def()).with("reason", self.reason.to_object()?)?;
        if let Some(secs) = self.retry_after {
            s.set("retry_after", secs)?;
        }
        Ok(s.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "auth.RateLimitError")?;
        Ok(Self {
            reason: nested(&s, "reason")?,
            retry_after: if_present(&s, "retry_after", StructValue::get_u64)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbx_stone::{json_compat_decode, DecodeOptions};
    use serde_json::json;

    #[test]
    fn missing_scope_carries_required_scope() {
        let doc = json!({".tag": "missing_scope", "required_scope": "files.content.read"});
        let obj = json_compat_decode(AuthError::validator(), &doc, &DecodeOptions::strict()).unwrap();
        assert_eq!(
            AuthError::from_object(obj).unwrap(),
            AuthError::MissingScope(TokenScopeError {
                required_scope: "files.content.read".into()
            })
        );
    }

    #[test]
    fn retry_after_defaults_to_one_second() {
        let doc = json!({"reason": {".tag": "too_many_requests"}});
        let obj = json_compat_decode(RateLimitError::validator(), &doc, &DecodeOptions::strict())
            .unwrap();
        let err = RateLimitError::from_object(obj).unwrap();
        assert_eq!(err.retry_after, None);
        assert_eq!(err.retry_after_secs(), 1);
    }

    #[test]
    fn unknown_auth_error_is_other_when_lenient() {
        let doc = json!({".tag": "app_suspended"});
        assert!(json_compat_decode(AuthError::validator(), &doc, &DecodeOptions::strict()).is_err());
        let obj = json_compat_decode(AuthError::validator(), &doc, &DecodeOptions::lenient()).unwrap();
        assert_eq!(AuthError::from_object(obj).unwrap(), AuthError::Other);
    }
}
