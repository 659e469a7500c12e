//! Route invocation.
//!
//! One attempt is: encode the argument, POST `{host}/2/{route path}`,
//! classify the response by status. [`Client::request`] wraps attempts in
//! the retry loop and decodes the result or route error; the typed entry
//! points convert to and from the generated types.
//!
//! | Style    | Argument              | Result                         | Payload        |
//! |----------|-----------------------|--------------------------------|----------------|
//! | rpc      | JSON body             | JSON body                      | none           |
//! | upload   | `Dropbox-API-Arg`     | JSON body                      | request body   |
//! | download | `Dropbox-API-Arg`     | `Dropbox-API-Result` header    | response body  |

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use dbx_stone::{
    json_compat_decode, json_decode, json_encode, DecodeOptions, EncodeOptions, Object, Route,
    RouteHost, RouteStyle, StoneType,
};
use dbx_types::auth::{AuthError, RateLimitError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, UserMessage};
use crate::retry::{with_retries, RetryPolicy};

const API_VERSION: &str = "2";
const ARG_HEADER: &str = "dropbox-api-arg";
const RESULT_HEADER: &str = "dropbox-api-result";
const SELECT_USER_HEADER: &str = "dropbox-api-select-user";
const REQUEST_ID_HEADER: &str = "x-dropbox-request-id";

/// The decoded result of a route, plus the response body for download
/// routes.
#[derive(Debug, Clone)]
pub struct RouteResponse {
    pub result: Object,
    pub payload: Option<Vec<u8>>,
}

/// A successful attempt before decoding.
struct RawSuccess {
    result: String,
    payload: Option<Vec<u8>>,
}

/// A 403/404/409 response body.
#[derive(Deserialize)]
struct RouteErrorEnvelope {
    error: serde_json::Value,
    #[serde(default)]
    user_message: Option<UserMessage>,
}

/// A 401/429 response body.
#[derive(Deserialize)]
struct HttpErrorEnvelope {
    error: serde_json::Value,
}

enum Attempt {
    Success(RawSuccess),
    RouteError {
        request_id: Option<String>,
        body: String,
    },
}

/// API client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    select_user: Option<String>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Transport {
                route: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            config: Arc::new(config),
            select_user: None,
        })
    }

    /// A client that acts as the given team member. Requires a team token.
    pub fn as_user(&self, team_member_id: impl Into<String>) -> Self {
        Self {
            select_user: Some(team_member_id.into()),
            ..self.clone()
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Invoke an rpc-style route.
    pub async fn rpc<A: StoneType, R: StoneType>(
        &self,
        route: &Route,
        arg: &A,
    ) -> Result<R, ClientError> {
        expect_style(route, RouteStyle::Rpc)?;
        let response = self.request(route, &arg.to_object()?, None).await?;
        decode_typed(route, response.result)
    }

    /// Invoke an upload-style route with `body` as the payload.
    pub async fn upload<A: StoneType, R: StoneType>(
        &self,
        route: &Route,
        arg: &A,
        body: Vec<u8>,
    ) -> Result<R, ClientError> {
        expect_style(route, RouteStyle::Upload)?;
        let response = self.request(route, &arg.to_object()?, Some(body)).await?;
        decode_typed(route, response.result)
    }

    /// Invoke a download-style route; returns the result and the payload.
    pub async fn download<A: StoneType, R: StoneType>(
        &self,
        route: &Route,
        arg: &A,
    ) -> Result<(R, Vec<u8>), ClientError> {
        expect_style(route, RouteStyle::Download)?;
        let response = self.request(route, &arg.to_object()?, None).await?;
        let result = decode_typed(route, response.result)?;
        Ok((result, response.payload.unwrap_or_default()))
    }

    /// Invoke any route with an already-built argument object.
    ///
    /// The argument is encoded strictly against the route's argument
    /// validator. Results and route errors are decoded leniently so that a
    /// server running a newer schema does not break this client.
    pub async fn request(
        &self,
        route: &Route,
        arg: &Object,
        body: Option<Vec<u8>>,
    ) -> Result<RouteResponse, ClientError> {
        let arg_json = json_encode(&route.arg, arg, &EncodeOptions::default())?;
        let policy = RetryPolicy::from_config(&self.config);
        let path = route.path();
        let payload = body.as_deref();

        let attempt = with_retries(&policy, &path, || self.attempt(route, &arg_json, payload)).await?;

        match attempt {
            Attempt::Success(raw) => {
                let text = if raw.result.trim().is_empty() {
                    "null"
                } else {
                    raw.result.as_str()
                };
                let result = json_decode(&route.result, text, &DecodeOptions::lenient())
                    .map_err(|source| ClientError::Decode {
                        route: path.clone(),
                        what: "result",
                        source,
                    })?;
                Ok(RouteResponse {
                    result,
                    payload: raw.payload,
                })
            }
            Attempt::RouteError { request_id, body } => {
                let envelope: RouteErrorEnvelope = serde_json::from_str(&body).map_err(|e| {
                    ClientError::MalformedResponse {
                        request_id: request_id.clone(),
                        route: path.clone(),
                        reason: e.to_string(),
                    }
                })?;
                let error =
                    json_compat_decode(&route.error, &envelope.error, &DecodeOptions::lenient())
                        .map_err(|source| ClientError::Decode {
                            route: path.clone(),
                            what: "error",
                            source,
                        })?;
                Err(ClientError::Api {
                    request_id,
                    route: path,
                    error,
                    user_message: envelope.user_message,
                })
            }
        }
    }

    fn host_url(&self, host: RouteHost) -> &url::Url {
        match host {
            RouteHost::Api => &self.config.api_url,
            RouteHost::Content => &self.config.content_url,
            RouteHost::Notify => &self.config.notify_url,
        }
    }

    fn route_url(&self, route: &Route) -> String {
        let base = self.host_url(route.attrs.host).as_str().trim_end_matches('/');
        format!("{base}/{API_VERSION}/{}", route.path())
    }

    fn headers(&self, route: &Route, arg_json: &str) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("User-Agent", &self.config.full_user_agent())?);

        if route.attrs.host != RouteHost::Notify {
            let bearer = format!("Bearer {}", self.config.access_token.as_str());
            let mut value = header_value("Authorization", &bearer)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
            for (name, value) in &self.config.headers {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| ClientError::InvalidHeader { name: name.clone() })?;
                let value = header_value(name.as_str(), value)?;
                headers.insert(name, value);
            }
        }
        if let Some(member) = &self.select_user {
            headers.insert(SELECT_USER_HEADER, header_value(SELECT_USER_HEADER, member)?);
        }

        match route.attrs.style {
            RouteStyle::Rpc => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            RouteStyle::Upload => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
                headers.insert(ARG_HEADER, header_value(ARG_HEADER, &escape_header_json(arg_json))?);
            }
            RouteStyle::Download => {
                headers.insert(ARG_HEADER, header_value(ARG_HEADER, &escape_header_json(arg_json))?);
            }
        }
        Ok(headers)
    }

    /// One HTTP exchange, classified.
    async fn attempt(
        &self,
        route: &Route,
        arg_json: &str,
        payload: Option<&[u8]>,
    ) -> Result<Attempt, ClientError> {
        let url = self.route_url(route);
        info!(route = %route, "request to {url}");

        let body = match route.attrs.style {
            RouteStyle::Rpc => arg_json.as_bytes().to_vec(),
            RouteStyle::Upload => payload.map(<[u8]>::to_vec).unwrap_or_default(),
            RouteStyle::Download => Vec::new(),
        };
        let resp = self
            .http
            .post(&url)
            .headers(self.headers(route, arg_json)?)
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::Transport {
                route: route.path(),
                source: e,
            })?;

        let status = resp.status();
        let request_id = header_str(resp.headers(), REQUEST_ID_HEADER);
        debug!(route = %route, status = status.as_u16(), request_id = ?request_id, "response");

        if status.is_server_error() {
            return Err(ClientError::InternalServer {
                request_id,
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        match status {
            StatusCode::BAD_REQUEST => Err(ClientError::BadInput {
                request_id,
                message: resp.text().await.unwrap_or_default(),
            }),
            StatusCode::UNAUTHORIZED => {
                let body = resp.text().await.unwrap_or_default();
                let envelope = parse_envelope(route, &request_id, &body)?;
                let error = json_compat_decode(
                    AuthError::validator(),
                    &envelope.error,
                    &DecodeOptions::lenient(),
                )
                .and_then(AuthError::from_object)
                .map_err(|source| ClientError::Decode {
                    route: route.path(),
                    what: "auth error",
                    source,
                })?;
                Err(ClientError::Auth { request_id, error })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let is_json = header_str(resp.headers(), "content-type")
                    .is_some_and(|ct| ct.starts_with("application/json"));
                if is_json {
                    let body = resp.text().await.unwrap_or_default();
                    let envelope = parse_envelope(route, &request_id, &body)?;
                    let error = json_compat_decode(
                        RateLimitError::validator(),
                        &envelope.error,
                        &DecodeOptions::lenient(),
                    )
                    .and_then(RateLimitError::from_object)
                    .map_err(|source| ClientError::Decode {
                        route: route.path(),
                        what: "rate limit error",
                        source,
                    })?;
                    Err(ClientError::RateLimit {
                        request_id,
                        retry_after: Some(error.retry_after_secs()),
                        error: Some(error),
                    })
                } else {
                    let retry_after = header_str(resp.headers(), "retry-after")
                        .and_then(|s| s.trim().parse().ok());
                    Err(ClientError::RateLimit {
                        request_id,
                        error: None,
                        retry_after,
                    })
                }
            }
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::CONFLICT => {
                Ok(Attempt::RouteError {
                    request_id,
                    body: resp.text().await.unwrap_or_default(),
                })
            }
            s if s.is_success() => {
                if route.attrs.style == RouteStyle::Download {
                    let result = header_str(resp.headers(), RESULT_HEADER).ok_or_else(|| {
                        ClientError::MalformedResponse {
                            request_id: request_id.clone(),
                            route: route.path(),
                            reason: format!("missing {RESULT_HEADER} header"),
                        }
                    })?;
                    let payload = resp.bytes().await.map_err(|e| ClientError::Transport {
                        route: route.path(),
                        source: e,
                    })?;
                    Ok(Attempt::Success(RawSuccess {
                        result,
                        payload: Some(payload.to_vec()),
                    }))
                } else {
                    let result = resp.text().await.map_err(|e| ClientError::Transport {
                        route: route.path(),
                        source: e,
                    })?;
                    Ok(Attempt::Success(RawSuccess {
                        result,
                        payload: None,
                    }))
                }
            }
            s => Err(ClientError::Http {
                request_id,
                status: s.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }),
        }
    }
}

fn expect_style(route: &Route, style: RouteStyle) -> Result<(), ClientError> {
    if route.attrs.style == style {
        Ok(())
    } else {
        Err(ClientError::WrongStyle {
            route: route.path(),
            style: route.attrs.style,
        })
    }
}

fn decode_typed<R: StoneType>(route: &Route, result: Object) -> Result<R, ClientError> {
    R::from_object(result).map_err(|source| ClientError::Decode {
        route: route.path(),
        what: "result",
        source,
    })
}

fn parse_envelope(
    route: &Route,
    request_id: &Option<String>,
    body: &str,
) -> Result<HttpErrorEnvelope, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::MalformedResponse {
        request_id: request_id.clone(),
        route: route.path(),
        reason: e.to_string(),
    })
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|_| ClientError::InvalidHeader {
        name: name.to_string(),
    })
}

/// HTTP headers carry ASCII only: escape everything from DEL upward as
/// JSON `\uXXXX` sequences, using surrogate pairs outside the BMP.
pub(crate) fn escape_header_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if (c as u32) < 0x7f {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out
}
