//! # Namespace `check`
//!
//! Echo routes for checking that app and user credentials reach the API.

use std::sync::{Arc, OnceLock};

use dbx_stone::validators::{StringValidator, StructDef, Validator};
use dbx_stone::{
    Object, Route, RouteAttrs, RouteAuth, StoneType, StructValue, ValidationError,
};

use crate::{expect_struct, if_present};

pub fn echo_arg_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("check.EchoArg")
            .field_with_default("query", StringValidator::new().max_length(500), "")
            .build()
    })
}

pub fn echo_result_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("check.EchoResult")
            .field_with_default("result", StringValidator::new(), "")
            .build()
    })
}

pub(crate) fn struct_defs() -> Vec<&'static Arc<StructDef>> {
    vec![echo_arg_def(), echo_result_def()]
}

/// Argument of the echo routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoArg {
    /// String echoed back by the server; at most 500 characters.
    pub query: Option<String>,
}

impl EchoArg {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
        }
    }
}

impl StoneType for EchoArg {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(echo_arg_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        let mut s = StructValue::new(echo_arg_def());
        if let Some(query) = &self.query {
            s.set("query", query.as_str())?;
        }
        Ok(s.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "check.EchoArg")?;
        Ok(Self {
            query: if_present(&s, "query", |s, n| s.get_str(n).map(str::to_string))?,
        })
    }
}

/// Result of the echo routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoResult {
    pub result: String,
}

impl StoneType for EchoResult {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(echo_result_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(StructValue::new(echo_result_def())
            .with("result", self.result.as_str())?
            .into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "check.EchoResult")?;
        Ok(Self {
            result: s.get_str("result")?.to_string(),
        })
    }
}

fn echo_route(name: &'static str, auth: RouteAuth) -> Route {
    Route {
        namespace: "check",
        name,
        version: 1,
        deprecated: false,
        arg: EchoArg::validator().clone(),
        result: EchoResult::validator().clone(),
        error: Validator::void(),
        attrs: RouteAttrs {
            auth,
            ..RouteAttrs::default()
        },
    }
}

/// `check/app`: echo with app key and secret.
pub fn app() -> &'static Route {
    static ROUTE: OnceLock<Route> = OnceLock::new();
    ROUTE.get_or_init(|| echo_route("app", RouteAuth::App))
}

/// `check/user`: echo with a user access token.
pub fn user() -> &'static Route {
    static ROUTE: OnceLock<Route> = OnceLock::new();
    ROUTE.get_or_init(|| echo_route("user", RouteAuth::User))
}

pub(crate) fn routes() -> Vec<&'static Route> {
    vec![app(), user()]
}
