//! Bearer-token injection for outgoing requests.
//!
//! The [`Authenticator`] makes one decision per request:
//!
//! 1. `HEAD` requests are never authenticated.
//! 2. A request that already carries `Authorization` is left alone.
//! 3. A request without a resolvable path is refused.
//! 4. When the token provider has a non-blank token it is attached, even on an
//!    anonymous path.
//! 5. Without a token, the request proceeds only if its path is anonymous.
//!
//! [`AuthenticationMiddleware`] runs that decision inside a
//! `reqwest_middleware` stack, so a refused request never reaches the
//! network.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gatekeep_client::{AuthenticationMiddleware, StaticTokenProvider};
//! use gatekeep_common::AnonymousRules;
//!
//! # async fn example() -> Result<(), gatekeep_client::ClientError> {
//! let middleware = AuthenticationMiddleware::new(
//!     Arc::new(StaticTokenProvider::new("token")),
//!     AnonymousRules::new().with_path("/public"),
//! );
//!
//! let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new())
//!     .with(middleware)
//!     .build();
//!
//! let response = client.get("https://api.example.com/orders").send().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use http::Extensions;
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, Request, Response};
use reqwest_middleware::{Middleware, Next};
use secrecy::ExposeSecret;
use thiserror::Error;

use gatekeep_common::path::request_path;
use gatekeep_common::{AnonymousRules, HEALTH_PATH, NormalizedPath};

use crate::policy::AnonymousPolicy;
use crate::token::{self, TokenProvider};

/// Reasons a request is refused before it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The request has no path the anonymous-path rules could match.
    #[error("request target has no resolvable path")]
    InvalidRequestTarget,

    /// No token is available and the path is not anonymous.
    #[error("access token not available at this time")]
    Unauthenticated {
        /// Method of the refused request.
        method: String,
        /// Normalized path of the refused request.
        path: String,
    },

    /// The token contains bytes that cannot appear in a header value.
    #[error("access token cannot be sent as a header value")]
    MalformedToken,
}

/// What the authenticator did with a request it let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// `HEAD` request; authentication skipped.
    SkippedHead,
    /// The request already had an `Authorization` header.
    AlreadyAuthorized,
    /// A bearer token was attached.
    Attached,
    /// No token, but the path is anonymous.
    Anonymous,
}

/// Combines a token provider with an anonymous-path policy.
#[derive(Clone)]
pub struct Authenticator {
    tokens: Arc<dyn TokenProvider>,
    policy: Arc<dyn AnonymousPolicy>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Creates an authenticator using declarative rules.
    pub fn new(tokens: Arc<dyn TokenProvider>, rules: AnonymousRules) -> Self {
        Self::with_policy(tokens, Arc::new(rules))
    }

    /// Creates an authenticator using a custom policy.
    pub fn with_policy(tokens: Arc<dyn TokenProvider>, policy: Arc<dyn AnonymousPolicy>) -> Self {
        Self { tokens, policy }
    }

    /// Returns `true` when `method` on `path` may be sent without a token.
    #[must_use]
    pub fn is_anonymous(&self, method: &Method, path: &NormalizedPath) -> bool {
        *path == HEALTH_PATH || self.policy.is_anonymous(method.as_str(), path)
    }

    /// Authenticates a request described by its parts.
    ///
    /// `target` is the request URL or relative reference; `headers` receives
    /// the `Authorization` header when a token is attached.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRequestTarget`] when the target has no
    /// resolvable path, [`AuthError::Unauthenticated`] when no token is
    /// available for a protected path, and [`AuthError::MalformedToken`] when
    /// the token cannot be encoded as a header value.
    pub async fn authenticate(
        &self,
        method: &Method,
        target: Option<&str>,
        headers: &mut HeaderMap,
    ) -> Result<AuthOutcome, AuthError> {
        if *method == Method::HEAD {
            return Ok(AuthOutcome::SkippedHead);
        }

        if headers.contains_key(AUTHORIZATION) {
            debug!("Request already carries an Authorization header, leaving it untouched");
            return Ok(AuthOutcome::AlreadyAuthorized);
        }

        let path = request_path(target).ok_or(AuthError::InvalidRequestTarget)?;

        let current = self.tokens.token().await;
        if let Some(token) = current.filter(|t| !token::is_blank(Some(t))) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|_| AuthError::MalformedToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
            debug!("Attached bearer token to {method} {path}");
            return Ok(AuthOutcome::Attached);
        }

        if self.is_anonymous(method, &path) {
            debug!("No token available, sending anonymous request {method} {path}");
            return Ok(AuthOutcome::Anonymous);
        }

        warn!("Refusing {method} {path}: access token not available");
        Err(AuthError::Unauthenticated {
            method: method.to_string(),
            path: path.into_inner(),
        })
    }

    /// Authenticates a `reqwest` request in place.
    ///
    /// # Errors
    ///
    /// See [`Authenticator::authenticate`].
    pub async fn authenticate_request(
        &self,
        request: &mut Request,
    ) -> Result<AuthOutcome, AuthError> {
        let method = request.method().clone();
        let target = request.url().to_string();
        self.authenticate(&method, Some(&target), request.headers_mut())
            .await
    }
}

/// `reqwest_middleware` adapter around an [`Authenticator`].
#[derive(Debug, Clone)]
pub struct AuthenticationMiddleware {
    authenticator: Authenticator,
}

impl AuthenticationMiddleware {
    /// Creates the middleware from a token provider and declarative rules.
    pub fn new(tokens: Arc<dyn TokenProvider>, rules: AnonymousRules) -> Self {
        Self::from(Authenticator::new(tokens, rules))
    }

    /// The wrapped authenticator.
    #[must_use]
    pub const fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }
}

impl From<Authenticator> for AuthenticationMiddleware {
    fn from(authenticator: Authenticator) -> Self {
        Self { authenticator }
    }
}

#[async_trait]
impl Middleware for AuthenticationMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.authenticator
            .authenticate_request(&mut req)
            .await
            .map_err(reqwest_middleware::Error::middleware)?;

        next.run(req, extensions).await
    }
}
