//! Client error types.
//!
//! Every variant produced from an HTTP response carries the
//! `x-dropbox-request-id` header, when the server sent one, so failures can
//! be traced server-side.

use dbx_stone::{Object, RouteStyle, StoneError, StoneType, ValidationError};
use dbx_types::auth::{AuthError, RateLimitError};
use serde::Deserialize;

use crate::config::ConfigError;

/// Human-readable message the API attaches to some route errors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserMessage {
    pub text: String,
    pub locale: String,
}

/// Errors from a route invocation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The route returned its declared error type.
    #[error("route {route} returned {}", .error.type_name())]
    Api {
        request_id: Option<String>,
        route: String,
        /// Decoded leniently against the route's error validator.
        error: Object,
        user_message: Option<UserMessage>,
    },
    /// 400: the server rejected the request as malformed.
    #[error("bad input: {message}")]
    BadInput {
        request_id: Option<String>,
        message: String,
    },
    /// 401: the credentials were rejected.
    #[error("authentication failed: {error:?}")]
    Auth {
        request_id: Option<String>,
        error: AuthError,
    },
    /// 429: too many requests. `retry_after` is in seconds.
    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimit {
        request_id: Option<String>,
        error: Option<RateLimitError>,
        retry_after: Option<u64>,
    },
    /// 5xx.
    #[error("server error {status}: {body}")]
    InternalServer {
        request_id: Option<String>,
        status: u16,
        body: String,
    },
    /// Any other unexpected status.
    #[error("unexpected HTTP status {status}: {body}")]
    Http {
        request_id: Option<String>,
        status: u16,
        body: String,
    },
    /// The request never produced a response.
    #[error("HTTP transport error calling {route}: {source}")]
    Transport {
        route: String,
        source: reqwest::Error,
    },
    /// A response body or header that does not match the protocol.
    #[error("malformed response from {route}: {reason}")]
    MalformedResponse {
        request_id: Option<String>,
        route: String,
        reason: String,
    },
    /// The response parsed but failed validation.
    #[error("could not decode {what} of {route}: {source}")]
    Decode {
        route: String,
        what: &'static str,
        source: ValidationError,
    },
    /// The argument could not be encoded.
    #[error("could not encode argument: {0}")]
    Encode(#[from] StoneError),
    /// The argument failed validation while being built.
    #[error("invalid argument: {0}")]
    Validation(#[from] ValidationError),
    /// The typed entry point used does not match the route's style.
    #[error("route {route} has style {style:?}")]
    WrongStyle { route: String, style: RouteStyle },
    /// A header value contains bytes HTTP cannot carry.
    #[error("invalid value for header {name}")]
    InvalidHeader { name: String },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// The server's request id, for errors that came from a response.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Api { request_id, .. }
            | Self::BadInput { request_id, .. }
            | Self::Auth { request_id, .. }
            | Self::RateLimit { request_id, .. }
            | Self::InternalServer { request_id, .. }
            | Self::Http { request_id, .. }
            | Self::MalformedResponse { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// The route error converted to its generated type, if this is one.
    pub fn route_error<E: StoneType>(&self) -> Option<Result<E, ValidationError>> {
        match self {
            Self::Api { error, .. } => Some(E::from_object(error.clone())),
            _ => None,
        }
    }

    pub(crate) fn is_retryable_server_error(&self) -> bool {
        matches!(self, Self::InternalServer { .. } | Self::Transport { .. })
    }
}
