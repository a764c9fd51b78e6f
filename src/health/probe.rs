// src/health/probe.rs
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::status::HealthDisplay;
use crate::client::HealthApi;
use crate::metrics::MetricsCollector;

/// Contents of the result slot.
#[derive(Debug, Clone, Default)]
pub struct HealthSnapshot {
    /// Sequence number of the request that produced `display`, 0 before any.
    pub seq: u64,
    pub display: HealthDisplay,
    pub checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub enum CheckOutcome {
    Applied(HealthSnapshot),
    /// A newer request was dispatched while this one was in flight.
    Stale { seq: u64, latest: u64 },
}

/// Issues health checks and keeps the latest result for display.
///
/// Every check takes the next sequence number when it is dispatched. A
/// response is written to the slot only if its number is still the highest
/// dispatched, so a slow early response never overwrites a later one.
pub struct HealthProbe {
    api: Arc<dyn HealthApi>,
    dispatched: AtomicU64,
    slot: RwLock<HealthSnapshot>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthProbe {
    pub fn new(api: Arc<dyn HealthApi>) -> Self {
        Self {
            api,
            dispatched: AtomicU64::new(0),
            slot: RwLock::new(HealthSnapshot::default()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn check(&self) -> CheckOutcome {
        let seq = self.dispatched.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(seq, "dispatching health check");

        let (display, outcome) = match self.api.fetch_health().await {
            Ok(health) => {
                info!(seq, status = %health.status, "health check succeeded");
                (HealthDisplay::Status(health), "ok")
            }
            Err(e) => {
                warn!(seq, error = %e, "health check failed");
                (HealthDisplay::Error(e.user_message()), "error")
            }
        };

        let mut slot = self.slot.write().await;
        let latest = self.dispatched.load(Ordering::SeqCst);
        if seq < latest || seq < slot.seq {
            debug!(seq, latest, "discarding stale health check response");
            self.record(&format!("{}_stale", outcome));
            return CheckOutcome::Stale { seq, latest };
        }

        self.record(outcome);
        *slot = HealthSnapshot {
            seq,
            display,
            checked_at: Some(Utc::now()),
        };
        CheckOutcome::Applied(slot.clone())
    }

    pub async fn snapshot(&self) -> HealthSnapshot {
        self.slot.read().await.clone()
    }

    pub async fn render(&self) -> String {
        self.slot.read().await.display.render()
    }

    /// Number of checks dispatched so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::SeqCst)
    }

    fn record(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_health_check(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{HealthCheckError, HealthResponse};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    type Scripted = (Duration, Result<HealthResponse, HealthCheckError>);

    /// Answers each call with the next scripted result after its delay.
    struct ScriptedApi {
        script: Mutex<VecDeque<Scripted>>,
    }

    impl ScriptedApi {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl HealthApi for ScriptedApi {
        async fn fetch_health(&self) -> Result<HealthResponse, HealthCheckError> {
            let (delay, result) = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted");
            tokio::time::sleep(delay).await;
            result
        }
    }

    fn ok(status: &str) -> Result<HealthResponse, HealthCheckError> {
        Ok(HealthResponse::new(status))
    }

    #[tokio::test]
    async fn test_success_is_displayed_as_json() {
        let probe = HealthProbe::new(ScriptedApi::new(vec![(Duration::ZERO, ok("ok"))]));
        assert_eq!(probe.render().await, "");

        let outcome = probe.check().await;
        assert!(matches!(outcome, CheckOutcome::Applied(_)));

        let snapshot = probe.snapshot().await;
        assert_eq!(snapshot.seq, 1);
        assert!(snapshot.checked_at.is_some());
        assert_eq!(
            snapshot.display,
            HealthDisplay::Status(HealthResponse::new("ok"))
        );
        assert_eq!(probe.render().await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_error_replaces_status() {
        let api = ScriptedApi::new(vec![
            (Duration::ZERO, ok("ok")),
            (
                Duration::ZERO,
                Err(HealthCheckError::Status {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    reason: Some("database unavailable".into()),
                }),
            ),
        ]);
        let probe = HealthProbe::new(api);

        probe.check().await;
        probe.check().await;

        let snapshot = probe.snapshot().await;
        assert!(snapshot.display.is_error());
        assert!(probe.render().await.contains("database unavailable"));
    }

    #[tokio::test]
    async fn test_slow_early_response_is_discarded() {
        let api = ScriptedApi::new(vec![
            (Duration::from_millis(200), ok("first")),
            (Duration::ZERO, ok("second")),
        ]);
        let probe = HealthProbe::new(api);

        let (first, second) = tokio::join!(probe.check(), probe.check());

        assert!(matches!(first, CheckOutcome::Stale { seq: 1, latest: 2 }));
        assert!(matches!(second, CheckOutcome::Applied(_)));
        assert_eq!(probe.dispatched(), 2);

        let snapshot = probe.snapshot().await;
        assert_eq!(snapshot.seq, 2);
        assert_eq!(
            snapshot.display,
            HealthDisplay::Status(HealthResponse::new("second"))
        );
    }

    #[tokio::test]
    async fn test_outcomes_are_counted() {
        let registry = crate::metrics::MetricsRegistry::new().unwrap();
        let probe = HealthProbe::new(ScriptedApi::new(vec![
            (Duration::ZERO, ok("ok")),
            (Duration::ZERO, Err(HealthCheckError::Timeout(Duration::from_millis(15_000)))),
        ]))
        .with_metrics(registry.collector());

        probe.check().await;
        probe.check().await;

        assert!(probe.render().await.contains("timeout of 15000ms exceeded"));
        let text = String::from_utf8(registry.gather().unwrap()).unwrap();
        assert!(text.contains(r#"devproxy_health_checks_total{outcome="ok"} 1"#));
        assert!(text.contains(r#"devproxy_health_checks_total{outcome="error"} 1"#));
    }
}
