//! Cached, debounced liveness probing.
//!
//! # States
//! - Unknown: never checked
//! - Healthy: last update found the API available
//! - Unhealthy: last update found the API unavailable
//!
//! # Transitions
//! ```text
//! Unknown   → Healthy:   probe returned {"status": "Healthy"}
//! Unknown   → Unhealthy: probe failed (no event, `available` was already false)
//! Healthy   → Unhealthy: probe failed            (event)
//! Unhealthy → Healthy:   probe succeeded         (event)
//! ```
//!
//! Probes are serialized by a single-slot async mutex. Callers of
//! [`HealthCheckController::ensure_fresh`] that arrive while a probe is in
//! flight wait for it and then see its result instead of probing again.
//! Reads go through an `ArcSwap` and never wait on the probe.

use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use log::{debug, info, warn};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use tokio::sync::{Mutex, broadcast};
use url::Url;

use gatekeep_common::{HEALTH_PATH, HealthChange, HealthResponse, HealthStatus};

use crate::error::ClientError;
use crate::response::ResponseExt;

/// Maximum age of a cached result before `ensure_fresh` probes again.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(30 * 60);

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Tracks the availability of one remote API.
pub struct HealthCheckController {
    client: ClientWithMiddleware,
    endpoint: Url,
    freshness: Duration,
    probe_lock: Mutex<()>,
    state: ArcSwap<HealthStatus>,
    changes: broadcast::Sender<HealthChange>,
}

impl std::fmt::Debug for HealthCheckController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthCheckController")
            .field("endpoint", &self.endpoint.as_str())
            .field("freshness", &self.freshness)
            .field("state", &*self.state.load())
            .finish_non_exhaustive()
    }
}

impl HealthCheckController {
    /// Creates a controller probing `<base_url>/health`.
    ///
    /// # Errors
    ///
    /// Returns an error if the health path cannot be joined onto `base_url`.
    pub fn new(client: impl Into<ClientWithMiddleware>, base_url: &Url) -> Result<Self, ClientError> {
        let endpoint = base_url.join(HEALTH_PATH)?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(Self {
            client: client.into(),
            endpoint,
            freshness: DEFAULT_FRESHNESS_WINDOW,
            probe_lock: Mutex::new(()),
            state: ArcSwap::from_pointee(HealthStatus::default()),
            changes,
        })
    }

    /// Sets the freshness window.
    #[must_use]
    pub const fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness = window;
        self
    }

    /// The URL being probed.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The configured freshness window.
    #[must_use]
    pub const fn freshness_window(&self) -> Duration {
        self.freshness
    }

    /// Snapshot of the current state. Never probes, never waits on a probe.
    #[must_use]
    pub fn current_status(&self) -> HealthStatus {
        self.state.load().as_ref().clone()
    }

    /// Shorthand for `current_status().available`.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state.load().available
    }

    /// Subscribes to availability transitions.
    ///
    /// Only transitions recorded after the call are received.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HealthChange> {
        self.changes.subscribe()
    }

    /// Returns `true` when the state was never checked or is older than the
    /// freshness window.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.state.load().checked_at.is_none_or(|checked_at| {
            // A negative age means the clock moved backwards; probe again.
            Utc::now()
                .signed_duration_since(checked_at)
                .to_std()
                .map_or(true, |age| age > self.freshness)
        })
    }

    /// Probes when the cached result is missing or stale.
    ///
    /// Returns the status after any probe completed.
    pub async fn ensure_fresh(&self) -> HealthStatus {
        let _guard = self.probe_lock.lock().await;

        if self.is_stale() {
            self.probe_locked().await;
        } else {
            debug!("Health of {} is fresh, skipping probe", self.endpoint);
        }

        self.current_status()
    }

    /// Probes the health endpoint now.
    ///
    /// Waits for any probe already in flight. Failures never surface as
    /// errors: they are recorded as an unhealthy state whose status string
    /// carries the reason.
    pub async fn probe(&self) -> HealthResponse {
        let _guard = self.probe_lock.lock().await;
        self.probe_locked().await
    }

    async fn probe_locked(&self) -> HealthResponse {
        let response = match self.fetch().await {
            Ok(Some(response)) => response,
            Ok(None) => HealthResponse::unhealthy("null response"),
            Err(e) => {
                warn!("Health probe of {} failed: {e}", self.endpoint);
                HealthResponse::unhealthy(e)
            }
        };

        self.record(response.is_healthy(), Some(response.status.as_str()));
        response
    }

    async fn fetch(&self) -> Result<Option<HealthResponse>, ClientError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await?
            .ensure_success()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Overrides availability.
    ///
    /// Stamps the check time and publishes a [`HealthChange`] only when the
    /// value differs from the current one. Returns `true` on a transition.
    pub fn set_health(&self, available: bool) -> bool {
        self.record(available, None)
    }

    fn record(&self, available: bool, status: Option<&str>) -> bool {
        let now = Utc::now();
        let previous = self.state.rcu(|current| HealthStatus {
            available,
            checked_at: Some(now),
            status: status.map_or_else(|| current.status.clone(), str::to_owned),
        });

        if previous.available == available {
            return false;
        }

        info!(
            "Health of {} changed: {}",
            self.endpoint,
            if available { "available" } else { "unavailable" }
        );
        // No subscribers is fine
        let _ = self.changes.send(HealthChange {
            available,
            checked_at: now,
        });
        true
    }
}
