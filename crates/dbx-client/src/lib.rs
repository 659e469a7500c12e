//! # dbx-client -- HTTP Request Layer
//!
//! Invokes routes described by [`dbx_stone::Route`] against the API hosts.
//! Arguments are encoded with the `dbx-stone` engine; results and route
//! errors are decoded leniently against the route's validators, so unknown
//! union tags fall back to their catch-all and newer fields are ignored.
//!
//! ## Architecture
//!
//! - [`ClientConfig`] holds the token, host URLs and retry limits.
//! - [`Client`] performs one POST per attempt and classifies the status:
//!   2xx success, 400 bad input, 401 auth, 403/404/409 route error, 429 rate
//!   limit, 5xx server error.
//! - The retry loop re-sends after server errors, transport failures and
//!   rate limits within the configured limits.
//!
//! OAuth2 flows and per-route method wrappers are not part of this crate;
//! callers pass a route accessor from `dbx-types`:
//!
//! ```no_run
//! # async fn demo() -> Result<(), dbx_client::ClientError> {
//! use dbx_client::{Client, ClientConfig};
//! use dbx_types::users::{get_current_account, FullAccount};
//!
//! let client = Client::new(ClientConfig::from_env()?)?;
//! let me: FullAccount = client.rpc(get_current_account(), &()).await?;
//! println!("{}", me.account.name.display_name);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub(crate) mod retry;

pub use client::{Client, RouteResponse};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, UserMessage};
