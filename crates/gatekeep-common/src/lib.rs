//! # gatekeep-common
//!
//! Shared types for the gatekeep HTTP client toolkit.
//!
//! This crate has no I/O and no async code:
//! - Request path normalization and comparison
//! - Anonymous-path rule sets
//! - HTTP client options and TOML configuration
//! - Health endpoint wire types and state snapshots
//!
//! ## Example
//!
//! ```
//! use gatekeep_common::{AnonymousRules, GatekeepConfig, path};
//!
//! let config = GatekeepConfig::from_toml_str(r#"
//!     base_address = "https://api.example.com"
//!
//!     [anonymous]
//!     paths = ["/public"]
//! "#)?;
//!
//! assert!(config.anonymous.is_blanketed(&path::normalize("/Public?page=1")));
//! # Ok::<(), gatekeep_common::ConfigError>(())
//! ```

/// Configuration loading and validation.
pub mod config;
/// Health endpoint wire types and state snapshots.
pub mod health;
/// Construction inputs for the underlying HTTP client.
pub mod options;
pub mod path;
pub mod rules;

pub use config::{ConfigError, GatekeepConfig, HealthSettings};
pub use health::{
    HEALTH_PATH, HEALTHY_STATUS, HealthChange, HealthPhase, HealthResponse, HealthStatus,
    UNHEALTHY_PREFIX,
};
pub use options::HttpClientOptions;
pub use path::NormalizedPath;
pub use rules::{ANY_METHOD, AnonymousRules};
