//! Pre-configured HTTP client and the composition root tying sections,
//! authentication and health together.

use std::sync::Arc;
use std::time::Duration;

use gatekeep_common::{AnonymousRules, GatekeepConfig, HttpClientOptions};
use log::debug;
use reqwest_middleware::ClientBuilder;
use url::Url;

use crate::auth::{Authenticator, AuthenticationMiddleware};
use crate::error::ClientError;
use crate::health::{DEFAULT_FRESHNESS_WINDOW, HealthCheckController};
use crate::policy::AnonymousPolicy;
use crate::section::ControllerSection;
use crate::token::TokenProvider;

/// Builds a [`reqwest::Client`] from transport options.
///
/// The timeout applies only when configured. The user agent is sent in
/// product-comment form, see [`HttpClientOptions::user_agent_header`].
///
/// # Errors
///
/// Returns [`ClientError::NetworkError`] if the TLS backend cannot be
/// initialized.
pub fn build_http_client(options: &HttpClientOptions) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = options.timeout() {
        builder = builder.timeout(timeout);
    }
    if let Some(user_agent) = options.user_agent_header() {
        builder = builder.user_agent(user_agent);
    }

    Ok(builder.build()?)
}

/// Entry point for talking to one API.
///
/// Owns a single connection pool and a single health state. Every section
/// created from it shares both.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use gatekeep_client::{ApiClient, EnvTokenProvider};
/// use gatekeep_common::{AnonymousRules, HttpClientOptions};
///
/// # fn main() -> Result<(), gatekeep_client::ClientError> {
/// let client = ApiClient::new(&HttpClientOptions::new("https://api.example.com"))?
///     .with_token_provider(Arc::new(EnvTokenProvider::new("API_TOKEN")));
///
/// let orders = client.authenticated_section(AnonymousRules::new().with_path("/catalog"))?;
/// # let _ = orders;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Option<Arc<dyn TokenProvider>>,
    health: Arc<HealthCheckController>,
}

impl ApiClient {
    /// Creates a client from transport options.
    ///
    /// # Errors
    ///
    /// Returns an error if the base address is not an absolute URL or the
    /// HTTP client cannot be built.
    pub fn new(options: &HttpClientOptions) -> Result<Self, ClientError> {
        Self::build(options, DEFAULT_FRESHNESS_WINDOW)
    }

    /// Creates a client from a loaded configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigurationError`] if the configuration does
    /// not validate, and otherwise the errors of [`ApiClient::new`].
    pub fn from_config(config: &GatekeepConfig) -> Result<Self, ClientError> {
        config
            .validate()
            .map_err(|e| ClientError::ConfigurationError(e.to_string()))?;

        Self::build(&config.client, config.health.freshness_window())
    }

    fn build(options: &HttpClientOptions, freshness: Duration) -> Result<Self, ClientError> {
        let base_url = options.base_url()?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::ConfigurationError(format!(
                "base address '{base_url}' cannot have paths joined onto it"
            )));
        }

        let http = build_http_client(options)?;
        let health = HealthCheckController::new(http.clone(), &base_url)?
            .with_freshness_window(freshness);
        debug!("API client ready for {base_url}");

        Ok(Self {
            http,
            base_url,
            tokens: None,
            health: Arc::new(health),
        })
    }

    /// Sets the source of bearer tokens for authenticated sections.
    #[must_use]
    pub fn with_token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// The parsed base address.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The shared health state.
    #[must_use]
    pub const fn health(&self) -> &Arc<HealthCheckController> {
        &self.health
    }

    /// A section whose requests carry no credentials.
    #[must_use]
    pub fn section(&self) -> ControllerSection {
        ControllerSection::new(self.http.clone(), self.base_url.clone())
            .with_health(Arc::clone(&self.health))
    }

    /// A section that attaches bearer tokens, exempting paths per `rules`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigurationError`] if no token provider was
    /// set.
    pub fn authenticated_section(
        &self,
        rules: AnonymousRules,
    ) -> Result<ControllerSection, ClientError> {
        self.authenticated_section_with_policy(Arc::new(rules))
    }

    /// A section that attaches bearer tokens, exempting paths per a custom
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigurationError`] if no token provider was
    /// set.
    pub fn authenticated_section_with_policy(
        &self,
        policy: Arc<dyn AnonymousPolicy>,
    ) -> Result<ControllerSection, ClientError> {
        let tokens = self.tokens.clone().ok_or_else(|| {
            ClientError::ConfigurationError(
                "a token provider is required for authenticated sections".to_string(),
            )
        })?;

        let middleware = AuthenticationMiddleware::from(Authenticator::with_policy(tokens, policy));
        let client = ClientBuilder::new(self.http.clone())
            .with(middleware)
            .build();

        Ok(ControllerSection::new(client, self.base_url.clone())
            .with_health(Arc::clone(&self.health)))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_token_provider", &self.tokens.is_some())
            .field("health", &self.health)
            .finish_non_exhaustive()
    }
}
