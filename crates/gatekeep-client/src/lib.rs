//! # gatekeep-client
//!
//! Authenticated HTTP client plumbing for JSON APIs.
//!
//! - [`AuthenticationMiddleware`] attaches `Authorization: Bearer <token>` to
//!   outgoing requests and refuses protected requests when no token is
//!   available. Declarative [`AnonymousRules`](gatekeep_common::AnonymousRules)
//!   decide which paths may go out without one.
//! - [`HealthCheckController`] keeps a cached, debounced view of the API's
//!   `/health` endpoint and broadcasts availability changes.
//! - [`ControllerSection`] wraps the common "send, check status, decode JSON"
//!   sequence and reports successful calls back to the health state.
//! - [`ApiClient`] wires all of the above onto a single connection pool.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gatekeep_client::{ApiClient, StaticTokenProvider};
//! use gatekeep_common::{AnonymousRules, HttpClientOptions};
//!
//! # async fn run() -> Result<(), gatekeep_client::ClientError> {
//! let client = ApiClient::new(&HttpClientOptions::new("https://api.example.com"))?
//!     .with_token_provider(Arc::new(StaticTokenProvider::new("secret")));
//!
//! if client.health().ensure_fresh().await.available {
//!     let section = client.authenticated_section(AnonymousRules::new().with_path("/catalog"))?;
//!     let items: Vec<serde_json::Value> = section.request_many(section.get("catalog")?).await?;
//!     println!("{} items", items.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod health;
mod json_array;
pub mod policy;
pub mod response;
pub mod section;
pub mod token;

pub use auth::{AuthError, AuthOutcome, AuthenticationMiddleware, Authenticator};
pub use client::{ApiClient, build_http_client};
pub use error::ClientError;
pub use health::{DEFAULT_FRESHNESS_WINDOW, HealthCheckController};
pub use policy::{AnonymousPolicy, is_anonymous};
pub use response::ResponseExt;
pub use section::{ControllerSection, ItemStream};
pub use token::{EnvTokenProvider, StaticTokenProvider, TokenProvider};
