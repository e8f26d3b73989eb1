//! Two-tier routing with sticky fallback.
//!
//! The pipeline starts on the primary adapter. The first primary failure of
//! any kind moves it to the fallback adapter for the rest of its lifetime,
//! and the failing call is retried there exactly once.

use std::time::{Duration, Instant};

use adpulse_core::{Credential, ErrorKind, ReportError, ReportQuery};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::classify::ErrorClassifier;
use crate::context::Deadline;
use crate::transport::{AdapterKind, TransportAdapter};

/// A boxed adapter producing `O`.
pub type BoxedAdapter<O> = Box<dyn TransportAdapter<Output = O>>;

// ============================================================================
// Routing State
// ============================================================================

/// Which adapter new calls are routed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingState {
    /// Calls try the primary adapter first.
    #[default]
    Primary,
    /// Calls go straight to the fallback adapter. Terminal.
    Fallback,
}

/// Per-instance routing state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredClientState {
    routing: RoutingState,
    failure_count: u32,
}

impl TieredClientState {
    /// Current routing state.
    pub fn routing(&self) -> RoutingState {
        self.routing
    }

    /// Returns true once the fallback adapter has taken over.
    pub fn fallback_active(&self) -> bool {
        self.routing == RoutingState::Fallback
    }

    /// Number of failed adapter attempts over the instance's lifetime.
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    fn enter_fallback(&mut self) {
        self.routing = RoutingState::Fallback;
    }

    fn record_failure(&mut self) {
        self.failure_count = self.failure_count.saturating_add(1);
    }
}

// ============================================================================
// Fetch Attempt
// ============================================================================

/// Record of a single adapter attempt.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    /// The adapter that was attempted.
    pub adapter_id: String,
    /// The tier of that adapter.
    pub kind: AdapterKind,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Error message if the attempt failed.
    pub error: Option<String>,
    /// Classified category if the attempt failed.
    pub error_kind: Option<ErrorKind>,
    /// How long the attempt took.
    pub duration: Duration,
}

impl FetchAttempt {
    /// Creates a successful attempt record.
    pub fn success(adapter_id: impl Into<String>, kind: AdapterKind, duration: Duration) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            kind,
            success: true,
            error: None,
            error_kind: None,
            duration,
        }
    }

    /// Creates a failed attempt record.
    pub fn failure(
        adapter_id: impl Into<String>,
        kind: AdapterKind,
        error: &ReportError,
        duration: Duration,
    ) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            kind,
            success: false,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            duration,
        }
    }
}

// ============================================================================
// Fetch Result / Outcome
// ============================================================================

/// A successful adapter result.
#[derive(Debug, Clone)]
pub struct FetchResult<O> {
    /// Raw provider output.
    pub output: O,
    /// The adapter that produced it.
    pub adapter_id: String,
    /// Its tier.
    pub kind: AdapterKind,
}

/// The outcome of one pipeline call.
#[derive(Debug)]
pub struct FetchOutcome<O> {
    /// The result, or the last attempt's classified error.
    pub result: Result<FetchResult<O>, ReportError>,
    /// All attempts made.
    pub attempts: Vec<FetchAttempt>,
    /// Total duration of all attempts.
    pub duration: Duration,
}

impl<O> FetchOutcome<O> {
    /// Returns true if the call succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns the number of adapters that were tried.
    pub fn attempts_count(&self) -> usize {
        self.attempts.len()
    }

    /// Returns the successful adapter ID, if any.
    pub fn successful_adapter(&self) -> Option<&str> {
        self.result.as_ref().ok().map(|r| r.adapter_id.as_str())
    }

    /// Returns all errors that occurred.
    pub fn errors(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter_map(|a| a.error.as_deref())
            .collect()
    }
}

// ============================================================================
// Tiered Pipeline
// ============================================================================

/// Primary/fallback router for one client instance.
pub struct TieredPipeline<O> {
    primary: Option<BoxedAdapter<O>>,
    fallback: BoxedAdapter<O>,
    state: TieredClientState,
}

impl<O: Send> TieredPipeline<O> {
    /// Creates a pipeline.
    ///
    /// Without a primary adapter (its bootstrap failed) the pipeline starts
    /// in [`RoutingState::Fallback`] with that failure counted.
    pub fn new(primary: Option<BoxedAdapter<O>>, fallback: BoxedAdapter<O>) -> Self {
        let mut state = TieredClientState::default();
        if primary.is_none() {
            state.enter_fallback();
            state.record_failure();
        }
        Self {
            primary,
            fallback,
            state,
        }
    }

    /// Current state.
    pub fn state(&self) -> TieredClientState {
        self.state
    }

    /// Runs one query.
    ///
    /// In `Primary` the primary adapter runs first; any failure switches the
    /// pipeline to `Fallback` and the same call is retried once there. In
    /// `Fallback` the primary adapter is never touched.
    #[instrument(skip(self, credential, query, deadline), fields(account = %query.account_id, routing = ?self.state.routing))]
    pub async fn execute(
        &mut self,
        credential: &Credential,
        query: &ReportQuery,
        deadline: Deadline,
    ) -> FetchOutcome<O> {
        let start = Instant::now();
        let mut attempts = Vec::new();

        if self.state.routing == RoutingState::Primary {
            if let Some(primary) = self.primary.as_deref() {
                let attempt_start = Instant::now();
                debug!(adapter = %primary.id(), "Executing primary adapter");

                match deadline
                    .run(primary.execute(credential, query, deadline))
                    .await
                {
                    Ok(output) => {
                        let duration = attempt_start.elapsed();
                        info!(adapter = %primary.id(), duration = ?duration, "Primary adapter succeeded");
                        attempts.push(FetchAttempt::success(primary.id(), primary.kind(), duration));
                        return FetchOutcome {
                            result: Ok(FetchResult {
                                output,
                                adapter_id: primary.id().to_string(),
                                kind: primary.kind(),
                            }),
                            attempts,
                            duration: start.elapsed(),
                        };
                    }
                    Err(error) => {
                        let duration = attempt_start.elapsed();
                        let classified = ErrorClassifier::classify(&error);
                        warn!(
                            adapter = %primary.id(),
                            error = %error,
                            kind = ?classified.kind(),
                            "Primary adapter failed, switching to fallback"
                        );
                        attempts.push(FetchAttempt::failure(
                            primary.id(),
                            primary.kind(),
                            &classified,
                            duration,
                        ));
                        self.state.record_failure();
                        self.state.enter_fallback();
                    }
                }
            } else {
                self.state.enter_fallback();
            }
        } else {
            debug!("Fallback active, skipping primary adapter");
        }

        let fallback = self.fallback.as_ref();
        let attempt_start = Instant::now();
        debug!(adapter = %fallback.id(), "Executing fallback adapter");

        let result = match deadline
            .run(fallback.execute(credential, query, deadline))
            .await
        {
            Ok(output) => {
                let duration = attempt_start.elapsed();
                info!(adapter = %fallback.id(), duration = ?duration, "Fallback adapter succeeded");
                attempts.push(FetchAttempt::success(fallback.id(), fallback.kind(), duration));
                Ok(FetchResult {
                    output,
                    adapter_id: fallback.id().to_string(),
                    kind: fallback.kind(),
                })
            }
            Err(error) => {
                let duration = attempt_start.elapsed();
                let classified = ErrorClassifier::classify(&error);
                warn!(
                    adapter = %fallback.id(),
                    error = %error,
                    kind = ?classified.kind(),
                    "Fallback adapter failed"
                );
                attempts.push(FetchAttempt::failure(
                    fallback.id(),
                    fallback.kind(),
                    &classified,
                    duration,
                ));
                self.state.record_failure();
                Err(classified)
            }
        };

        FetchOutcome {
            result,
            attempts,
            duration: start.elapsed(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use adpulse_core::{DateRange, FailureKind};
    use async_trait::async_trait;

    use super::*;
    use crate::error::{FetchError, TransportFailure};

    struct MockAdapter {
        id: &'static str,
        kind: AdapterKind,
        fail_with: Option<TransportFailure>,
        delay: Option<Duration>,
        calls: Arc<AtomicUsize>,
    }

    impl MockAdapter {
        fn ok(id: &'static str, kind: AdapterKind) -> Self {
            Self {
                id,
                kind,
                fail_with: None,
                delay: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(id: &'static str, kind: AdapterKind, failure: TransportFailure) -> Self {
            Self {
                fail_with: Some(failure),
                ..Self::ok(id, kind)
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.calls)
        }
    }

    #[async_trait]
    impl TransportAdapter for MockAdapter {
        type Output = String;

        fn id(&self) -> &str {
            self.id
        }

        fn kind(&self) -> AdapterKind {
            self.kind
        }

        async fn execute(
            &self,
            _credential: &Credential,
            query: &ReportQuery,
            _deadline: Deadline,
        ) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.fail_with {
                Some(ref failure) => Err(failure.clone().into()),
                None => Ok(format!("{}:{}", self.id, query.account_id)),
            }
        }
    }

    fn credential() -> Credential {
        Credential::builder()
            .access_token("token")
            .token_endpoint("https://oauth2.example.com/token")
            .client("id", "secret")
            .scope("scope")
            .build()
            .unwrap()
    }

    fn query(account: &str) -> ReportQuery {
        ReportQuery::campaign_performance(account, DateRange::last_days(30)).unwrap()
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_primary_success_stays_primary() {
        let primary = MockAdapter::ok("primary", AdapterKind::Primary);
        let fallback = MockAdapter::ok("fallback", AdapterKind::Fallback);
        let fallback_calls = fallback.counter();
        let mut pipeline = TieredPipeline::new(Some(Box::new(primary)), Box::new(fallback));

        let outcome = pipeline.execute(&credential(), &query("1"), deadline()).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.successful_adapter(), Some("primary"));
        assert_eq!(pipeline.state().routing(), RoutingState::Primary);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_retries_on_fallback() {
        let primary = MockAdapter::failing(
            "primary",
            AdapterKind::Primary,
            TransportFailure::unreachable("connection reset"),
        );
        let fallback = MockAdapter::ok("fallback", AdapterKind::Fallback);
        let mut pipeline = TieredPipeline::new(Some(Box::new(primary)), Box::new(fallback));

        let outcome = pipeline.execute(&credential(), &query("1"), deadline()).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts_count(), 2);
        assert_eq!(outcome.successful_adapter(), Some("fallback"));
        assert_eq!(outcome.attempts[0].error_kind, Some(ErrorKind::TransportError));
        assert!(pipeline.state().fallback_active());
        assert_eq!(pipeline.state().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_is_sticky() {
        let primary = MockAdapter::failing(
            "primary",
            AdapterKind::Primary,
            TransportFailure::config_invalid("bridge missing"),
        );
        let primary_calls = primary.counter();
        let fallback = MockAdapter::ok("fallback", AdapterKind::Fallback);
        let fallback_calls = fallback.counter();
        let mut pipeline = TieredPipeline::new(Some(Box::new(primary)), Box::new(fallback));

        pipeline.execute(&credential(), &query("1"), deadline()).await;
        for account in ["2", "3", "4"] {
            let outcome = pipeline.execute(&credential(), &query(account), deadline()).await;
            assert_eq!(outcome.attempts_count(), 1);
        }

        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 4);
        assert_eq!(pipeline.state().routing(), RoutingState::Fallback);
    }

    #[tokio::test]
    async fn test_both_fail_returns_fallback_error() {
        let primary = MockAdapter::failing(
            "primary",
            AdapterKind::Primary,
            TransportFailure::unreachable("down"),
        );
        let fallback = MockAdapter::failing(
            "fallback",
            AdapterKind::Fallback,
            TransportFailure::auth_rejected("HTTP 401"),
        );
        let fallback_calls = fallback.counter();
        let mut pipeline = TieredPipeline::new(Some(Box::new(primary)), Box::new(fallback));

        let outcome = pipeline.execute(&credential(), &query("1"), deadline()).await;

        let err = outcome.result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthError);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert!(pipeline.state().fallback_active());
        assert_eq!(pipeline.state().failure_count(), 2);
    }

    #[tokio::test]
    async fn test_without_primary_starts_in_fallback() {
        let fallback = MockAdapter::ok("fallback", AdapterKind::Fallback);
        let mut pipeline: TieredPipeline<String> = TieredPipeline::new(None, Box::new(fallback));
        assert!(pipeline.state().fallback_active());
        assert_eq!(pipeline.state().failure_count(), 1);

        let outcome = pipeline.execute(&credential(), &query("1"), deadline()).await;
        assert_eq!(outcome.result.unwrap().output, "fallback:1");
        assert_eq!(pipeline.state().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_primary_deadline_falls_back() {
        let primary =
            MockAdapter::ok("primary", AdapterKind::Primary).slow(Duration::from_secs(10));
        let fallback = MockAdapter::ok("fallback", AdapterKind::Fallback);
        let mut pipeline = TieredPipeline::new(Some(Box::new(primary)), Box::new(fallback));

        let short = Deadline::after(Duration::from_millis(50));
        let outcome = pipeline.execute(&credential(), &query("1"), short).await;

        // The shared deadline has already expired by the time fallback runs.
        let err = outcome.result.unwrap_err();
        assert_eq!(
            err,
            ReportError::Transport {
                kind: FailureKind::Unreachable,
                detail: "deadline exceeded after 50ms".to_string(),
            }
        );
        assert_eq!(outcome.attempts[0].error_kind, Some(ErrorKind::TransportError));
        assert!(pipeline.state().fallback_active());
    }
}
