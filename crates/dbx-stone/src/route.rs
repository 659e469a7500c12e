//! Route descriptors.
//!
//! A [`Route`] names one API endpoint and carries the validators for its
//! argument, result and error, plus the attributes that decide how the
//! request layer reaches it.

use std::fmt;

use crate::validators::Validator;

/// How a route is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteAuth {
    User,
    Team,
    App,
    NoAuth,
}

/// Which host serves a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteHost {
    Api,
    Content,
    Notify,
}

/// Where the argument, result and payload travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteStyle {
    /// Argument in the body, result in the body.
    Rpc,
    /// Argument in a header, payload in the body, result in the body.
    Upload,
    /// Argument in a header, result in a header, payload in the body.
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteAttrs {
    pub auth: RouteAuth,
    pub host: RouteHost,
    pub style: RouteStyle,
}

impl Default for RouteAttrs {
    fn default() -> Self {
        Self {
            auth: RouteAuth::User,
            host: RouteHost::Api,
            style: RouteStyle::Rpc,
        }
    }
}

/// One API endpoint.
#[derive(Debug, Clone)]
pub struct Route {
    pub namespace: &'static str,
    pub name: &'static str,
    pub version: u32,
    pub deprecated: bool,
    pub arg: Validator,
    pub result: Validator,
    pub error: Validator,
    pub attrs: RouteAttrs,
}

impl Route {
    /// URL path relative to the API version prefix, e.g. `users/get_account`
    /// or `files/list_folder_v2`.
    pub fn path(&self) -> String {
        if self.version > 1 {
            format!("{}/{}_v{}", self.namespace, self.name, self.version)
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(version: u32) -> Route {
        Route {
            namespace: "users",
            name: "get_account",
            version,
            deprecated: false,
            arg: Validator::void(),
            result: Validator::void(),
            error: Validator::void(),
            attrs: RouteAttrs::default(),
        }
    }

    #[test]
    fn version_suffix_only_above_one() {
        assert_eq!(route(1).path(), "users/get_account");
        assert_eq!(route(2).path(), "users/get_account_v2");
        assert_eq!(route(3).to_string(), "users/get_account_v3");
    }
}
