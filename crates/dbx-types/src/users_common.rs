//! # Namespace `users_common`

use std::sync::{Arc, OnceLock};

use dbx_stone::validators::{StringValidator, UnionDef, Validator};
use dbx_stone::{Object, StoneType, UnionValue, ValidationError};

use crate::{expect_union, unknown_tag};

/// The user's unique account id; always 40 characters.
pub type AccountId = String;

pub fn account_id_validator() -> StringValidator {
    StringValidator::new()
        .min_length(40)
        .max_length(40)
        .alias("users_common.AccountId")
}

pub fn account_type_def() -> &'static Arc<UnionDef> {
    static DEF: OnceLock<Arc<UnionDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        UnionDef::builder("users_common.AccountType")
            .void("basic")
            .void("pro")
            .void("business")
            .build()
    })
}

pub(crate) fn union_defs() -> Vec<&'static Arc<UnionDef>> {
    vec![account_type_def()]
}

/// What type of account this user has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountType {
    Basic,
    Pro,
    Business,
}

impl AccountType {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Business => "business",
        }
    }
}

impl StoneType for AccountType {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::union(account_type_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(UnionValue::void(account_type_def(), self.tag())?.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let u = expect_union(obj, "users_common.AccountType")?;
        match u.tag() {
            "basic" => Ok(Self::Basic),
            "pro" => Ok(Self::Pro),
            "business" => Ok(Self::Business),
            _ => Err(unknown_tag(&u)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbx_stone::{json_decode, DecodeOptions};

    #[test]
    fn account_type_has_no_catch_all() {
        let v = AccountType::validator();
        let obj = json_decode(v, r#""pro""#, &DecodeOptions::strict()).unwrap();
        assert_eq!(AccountType::from_object(obj).unwrap(), AccountType::Pro);
        assert!(json_decode(v, r#"{".tag": "enterprise"}"#, &DecodeOptions::lenient()).is_err());
    }

    #[test]
    fn account_id_is_exactly_forty_chars() {
        assert!(account_id_validator().check(&"a".repeat(40)).is_ok());
        assert!(account_id_validator().check(&"a".repeat(39)).is_err());
    }
}
