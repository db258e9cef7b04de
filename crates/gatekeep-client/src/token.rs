//! Access-token sources.
//!
//! How a token is obtained or refreshed is up to the implementation; the
//! interceptor only asks for "the current token, if any". A blank token is
//! treated exactly like a missing one.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// Supplies bearer tokens for outgoing requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the current access token, or `None` when none is available.
    async fn token(&self) -> Option<SecretString>;
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    async fn token(&self) -> Option<SecretString> {
        (**self).token().await
    }
}

/// Returns `true` when `token` is absent or contains only whitespace.
pub fn is_blank(token: Option<&SecretString>) -> bool {
    token.is_none_or(|t| t.expose_secret().trim().is_empty())
}

/// A provider that always returns the same token.
#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<SecretString>,
}

impl StaticTokenProvider {
    /// Creates a provider for a fixed token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::new(token.into().into())),
        }
    }

    /// Creates a provider that never has a token.
    #[must_use]
    pub const fn none() -> Self {
        Self { token: None }
    }
}

impl From<SecretString> for StaticTokenProvider {
    fn from(token: SecretString) -> Self {
        Self { token: Some(token) }
    }
}

// Custom Debug implementation to avoid exposing the token
impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Option<SecretString> {
        self.token.clone()
    }
}

/// A provider that reads an environment variable on every call.
///
/// Picks up rotated tokens without rebuilding the client.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    variable: String,
}

impl EnvTokenProvider {
    /// Creates a provider reading `variable`.
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }

    /// Name of the variable being read.
    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn token(&self) -> Option<SecretString> {
        std::env::var(&self.variable)
            .ok()
            .map(|value| SecretString::new(value.into()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn test_static_provider_returns_token() {
        let provider = StaticTokenProvider::new("abc");
        let token = provider.token().await.unwrap();
        assert_eq!(token.expose_secret(), "abc");
    }

    #[tokio::test]
    async fn test_none_provider() {
        assert!(StaticTokenProvider::none().token().await.is_none());
    }

    #[tokio::test]
    async fn test_arc_delegates() {
        let provider: Arc<dyn TokenProvider> = Arc::new(StaticTokenProvider::new("shared"));
        let token = provider.token().await.unwrap();
        assert_eq!(token.expose_secret(), "shared");
    }

    #[tokio::test]
    async fn test_env_provider_unset_variable() {
        let provider = EnvTokenProvider::new("GATEKEEP_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert!(provider.token().await.is_none());
    }

    #[test]
    fn test_blank_detection() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&SecretString::from("   "))));
        assert!(is_blank(Some(&SecretString::from(""))));
        assert!(!is_blank(Some(&SecretString::from("token"))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", StaticTokenProvider::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
