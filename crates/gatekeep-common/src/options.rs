use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use url::Url;

/// Inputs used to construct the underlying HTTP client.
///
/// # Examples
///
/// ```
/// use gatekeep_common::HttpClientOptions;
///
/// let options = HttpClientOptions::builder()
///     .base_address("https://api.example.com")
///     .timeout_seconds(10)
///     .user_agent("billing-sync")
///     .build();
///
/// assert_eq!(options.user_agent_header().as_deref(), Some("(billing-sync)"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct HttpClientOptions {
    /// Absolute base address every relative request path is joined onto.
    #[builder(setter(into))]
    pub base_address: String,

    /// Request timeout in seconds. `None` leaves the client without a timeout.
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub timeout_seconds: Option<u64>,

    /// Product comment added to the `User-Agent` header.
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub user_agent: Option<String>,
}

impl HttpClientOptions {
    /// Creates options with only a base address.
    pub fn new(base_address: impl Into<String>) -> Self {
        Self {
            base_address: base_address.into(),
            timeout_seconds: None,
            user_agent: None,
        }
    }

    /// Parses the base address.
    ///
    /// # Errors
    ///
    /// Returns an error if the base address is not an absolute URL.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.base_address.trim())
    }

    /// Timeout as a [`Duration`], when configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// The `User-Agent` value, in product-comment form: `(<agent>)`.
    ///
    /// Blank agents are ignored.
    #[must_use]
    pub fn user_agent_header(&self) -> Option<String> {
        self.user_agent
            .as_deref()
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .map(|ua| format!("({ua})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let options = HttpClientOptions::builder()
            .base_address("https://api.example.com")
            .build();
        assert_eq!(options, HttpClientOptions::new("https://api.example.com"));
        assert!(options.timeout().is_none());
        assert!(options.user_agent_header().is_none());
    }

    #[test]
    fn test_blank_user_agent_is_ignored() {
        let options = HttpClientOptions::builder()
            .base_address("https://api.example.com")
            .user_agent("   ")
            .build();
        assert!(options.user_agent_header().is_none());
    }

    #[test]
    fn test_timeout_conversion() {
        let options = HttpClientOptions::builder()
            .base_address("https://api.example.com")
            .timeout_seconds(30)
            .build();
        assert_eq!(options.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_base_url_must_be_absolute() {
        assert!(HttpClientOptions::new("/relative").base_url().is_err());
        assert!(HttpClientOptions::new(" https://api.example.com ").base_url().is_ok());
    }
}
