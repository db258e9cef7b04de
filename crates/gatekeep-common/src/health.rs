//! Health wire types and state snapshots.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness endpoint every API exposes. Always anonymous.
pub const HEALTH_PATH: &str = "/health";

/// Status value that marks a remote API as healthy. Compared exactly.
pub const HEALTHY_STATUS: &str = "Healthy";

/// Prefix of the status string recorded for a failed probe.
pub const UNHEALTHY_PREFIX: &str = "UnHealthy";

/// Body returned by the liveness endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Remote status, `"Healthy"` when the API is up.
    pub status: String,

    /// Anything else the endpoint reports (durations, per-check entries).
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl HealthResponse {
    /// Creates a response carrying only a status.
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            extra: HashMap::new(),
        }
    }

    /// Creates the response recorded for a probe that failed.
    pub fn unhealthy(reason: impl fmt::Display) -> Self {
        Self::new(format!("{UNHEALTHY_PREFIX}: {reason}"))
    }

    /// Returns `true` when the status equals [`HEALTHY_STATUS`].
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY_STATUS
    }
}

/// Coarse lifecycle of a health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthPhase {
    /// Never checked.
    Unknown,
    /// Last check found the API available.
    Healthy,
    /// Last check found the API unavailable.
    Unhealthy,
}

impl fmt::Display for HealthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Point-in-time view of a health state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Whether the API is considered available.
    pub available: bool,
    /// When the state was last updated. `None` until the first check.
    pub checked_at: Option<DateTime<Utc>>,
    /// Remote status string, or the failure reason of the last probe.
    pub status: String,
}

impl HealthStatus {
    /// Derives the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> HealthPhase {
        match self.checked_at {
            None => HealthPhase::Unknown,
            Some(_) if self.available => HealthPhase::Healthy,
            Some(_) => HealthPhase::Unhealthy,
        }
    }
}

/// Published when `available` flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthChange {
    /// The new availability.
    pub available: bool,
    /// When the transition was recorded.
    pub checked_at: DateTime<Utc>,
}
