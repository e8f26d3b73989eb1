//! Deadlines and transport settings passed to every network-bound call.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::warn;

use crate::error::FetchError;

/// Default per-call budget.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Transport Settings
// ============================================================================

/// Settings shared by the HTTP and native transports.
///
/// Passed explicitly at construction; nothing is read from the process
/// environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Budget for one report call, including token refresh.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Whether plain-text `http://` endpoints are accepted.
    pub allow_insecure_http: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            allow_insecure_http: false,
        }
    }
}

impl TransportSettings {
    /// Creates settings with a custom timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Accepts `http://` endpoints. Only meant for local stubs.
    #[must_use]
    pub fn with_insecure_http(mut self, allow: bool) -> Self {
        self.allow_insecure_http = allow;
        self
    }

    /// A deadline `timeout` from now.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

// ============================================================================
// Deadline
// ============================================================================

/// A point in time after which a call is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// The budget the deadline was created with.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time left before expiry.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Returns true once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Runs a future, failing with [`FetchError::DeadlineExceeded`] if it
    /// does not finish in time. An already expired deadline never starts it.
    ///
    /// # Errors
    ///
    /// Returns the future's own error, or `DeadlineExceeded` on expiry.
    pub async fn run<F, T>(&self, future: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        if self.is_expired() {
            return Err(FetchError::DeadlineExceeded(self.budget));
        }
        if let Ok(result) = tokio::time::timeout_at(self.at, future).await {
            result
        } else {
            warn!(budget = ?self.budget, "Deadline exceeded");
            Err(FetchError::DeadlineExceeded(self.budget))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_within_deadline() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let value = deadline.run(async { Ok::<_, FetchError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_past_deadline() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let result = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, FetchError>(())
            })
            .await;
        assert!(matches!(result, Err(FetchError::DeadlineExceeded(d)) if d == deadline.budget()));
        assert!(deadline.is_expired());
        assert_eq!(deadline.budget(), Duration::from_millis(10));
    }

    #[test]
    fn test_settings_deserialize() {
        let settings: TransportSettings =
            serde_json::from_str(r#"{"timeout": 5, "allow_insecure_http": true}"#).unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert!(settings.allow_insecure_http);

        let defaults: TransportSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, TransportSettings::default());
    }
}
