use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::decision::{ConfirmationRequest, ConfirmationResponse, Severity};
use crate::engine::DecisionEngine;
use crate::metrics::Metrics;

/// Source tag stamped on requests built by [`ConfirmationGate::should_auto_confirm`].
pub const EXTERNAL_CALLER_SOURCE: &str = "external-caller";

/// Read-only view of the gate for status endpoints and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStatus {
    pub initialized: bool,
    pub enabled: bool,
    pub metrics: Metrics,
}

/// Entry point for callers that must never see a fault.
///
/// Wraps a [`DecisionEngine`] and converts every error or panic raised while
/// deciding into a denial that requires no further handling by the caller.
#[derive(Debug)]
pub struct ConfirmationGate {
    engine: Arc<DecisionEngine>,
    initialized: AtomicBool,
}

impl ConfirmationGate {
    pub fn new(engine: Arc<DecisionEngine>) -> Self {
        Self {
            engine,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn engine(&self) -> &Arc<DecisionEngine> {
        &self.engine
    }

    /// Mark the gate ready and log the active policy. Only the first call has
    /// any effect; state is never reset here.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return;
        }

        let policy = self.engine.policy();
        info!(
            enabled = policy.enabled,
            always_confirm = policy.always_confirm_patterns.len(),
            never_confirm = policy.never_confirm_patterns.len(),
            max_per_minute = policy.max_confirmations_per_minute,
            "confirmation gate initialized"
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Decide `request`, initializing first if needed.
    ///
    /// Never fails: engine errors and panics both come back as
    /// `approved = false, auto_confirmed = false` with the fault message in
    /// the reason.
    pub fn handle_confirmation(&self, request: &ConfirmationRequest) -> ConfirmationResponse {
        self.initialize();

        debug!(
            id = %request.id,
            source = %request.source,
            severity = ?request.severity,
            "received confirmation request"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.engine.decide(request)));

        match outcome {
            Ok(Ok(response)) => {
                info!(
                    id = %response.id,
                    approved = response.approved,
                    auto_confirmed = response.auto_confirmed,
                    reason = response.reason.as_deref().unwrap_or(""),
                    "confirmation processed"
                );
                response
            }
            Ok(Err(err)) => {
                error!(id = %request.id, %err, "failed to process confirmation");
                ConfirmationResponse::fault(&request.id, err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(id = %request.id, panic = %message, "panic while processing confirmation");
                ConfirmationResponse::fault(&request.id, message)
            }
        }
    }

    /// Decide a request described only by its text and report whether it was
    /// approved.
    pub fn should_auto_confirm(&self, message: &str, action: &str) -> bool {
        let request = ConfirmationRequest::new(
            synthesize_id(),
            message,
            action,
            EXTERNAL_CALLER_SOURCE,
        )
        .with_severity(Severity::Medium)
        .with_metadata(caller_metadata());

        self.handle_confirmation(&request).approved
    }

    pub fn status(&self) -> GateStatus {
        GateStatus {
            initialized: self.is_initialized(),
            enabled: self.engine.policy().enabled,
            metrics: self.engine.metrics(),
        }
    }

    pub fn reset_metrics(&self) {
        self.engine.reset();
    }
}

fn synthesize_id() -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{EXTERNAL_CALLER_SOURCE}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &nonce[..9]
    )
}

fn caller_metadata() -> serde_json::Map<String, serde_json::Value> {
    let mut metadata = serde_json::Map::new();
    for (key, var) in [("userAgent", "USER_AGENT"), ("sessionId", "SESSION_ID")] {
        let value = std::env::var(var).unwrap_or_else(|_| "unknown".to_string());
        metadata.insert(key.to_string(), serde_json::Value::String(value));
    }
    metadata
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::RollingMetrics;
    use crate::provider::StaticConfig;
    use crate::rate_limit::RateLimiter;
    use crate::schema::{PolicyConfig, PolicyUpdate};

    fn gate_with(config: PolicyConfig) -> (Arc<StaticConfig>, ConfirmationGate) {
        let provider = Arc::new(StaticConfig::new(config));
        let engine = Arc::new(DecisionEngine::with_provider(provider.clone()));
        (provider, ConfirmationGate::new(engine))
    }

    fn request(id: &str, message: &str, action: &str) -> ConfirmationRequest {
        ConfirmationRequest::new(id, message, action, "test").with_severity(Severity::Low)
    }

    #[test]
    fn initialize_is_idempotent() {
        let (_, gate) = gate_with(PolicyConfig::default());
        assert!(!gate.status().initialized);

        gate.initialize();
        gate.handle_confirmation(&request("1", "a", "b"));
        gate.initialize();

        let status = gate.status();
        assert!(status.initialized);
        // A repeated initialize does not wipe state.
        assert_eq!(status.metrics.total_requests, 1);
    }

    #[test]
    fn handle_initializes_implicitly() {
        let (_, gate) = gate_with(PolicyConfig::default());
        let resp = gate.handle_confirmation(&request("test-subagent-1", "Test message", "test action"));
        assert!(gate.is_initialized());
        assert_eq!(resp.id, "test-subagent-1");
        assert!(resp.approved);
        assert!(resp.timestamp > 0);
    }

    #[test]
    fn empty_request_is_decided_not_faulted() {
        let (_, gate) = gate_with(PolicyConfig::default());
        let resp = gate.handle_confirmation(&request("test-error", "", ""));
        assert_eq!(resp.id, "test-error");
        assert!(resp.approved);
    }

    #[test]
    fn malformed_pattern_becomes_a_denial() {
        let (provider, gate) = gate_with(PolicyConfig::default());
        provider.update(&PolicyUpdate {
            never_confirm_patterns: Some(vec!["[invalid".into()]),
            ..Default::default()
        });

        let resp = gate.handle_confirmation(&request("bad", "anything", ""));
        assert_eq!(resp.id, "bad");
        assert!(!resp.approved);
        assert!(!resp.auto_confirmed);
        let reason = resp.reason.unwrap();
        assert!(reason.starts_with("Error processing request: "), "{reason}");
        assert!(reason.contains("[invalid"), "{reason}");
    }

    struct ExplodingLimiter;

    impl RateLimiter for ExplodingLimiter {
        fn has_capacity(&mut self, _max_per_minute: u32) -> bool {
            panic!("limiter exploded");
        }
        fn consume(&mut self) {}
        fn reset(&mut self) {}
    }

    #[test]
    fn panics_are_contained() {
        let provider = Arc::new(StaticConfig::new(PolicyConfig::default()));
        let engine = Arc::new(DecisionEngine::new(
            provider,
            Box::new(ExplodingLimiter),
            Box::new(RollingMetrics::new()),
        ));
        let gate = ConfirmationGate::new(engine);

        let resp = gate.handle_confirmation(&request("p", "m", "a"));
        assert!(!resp.approved);
        assert!(!resp.auto_confirmed);
        assert_eq!(
            resp.reason.as_deref(),
            Some("Error processing request: limiter exploded")
        );

        // The engine lock is not left poisoned; status still works.
        assert_eq!(gate.status().metrics.total_requests, 1);
    }

    #[test]
    fn should_auto_confirm_follows_policy() {
        let (_, gate) = gate_with(PolicyConfig::default());
        assert!(gate.should_auto_confirm("Building project", "build operations"));
        assert!(!gate.should_auto_confirm("please", "format drive"));
    }

    #[test]
    fn synthesized_ids_are_unique_and_tagged() {
        let a = synthesize_id();
        let b = synthesize_id();
        assert_ne!(a, b);
        assert!(a.starts_with("external-caller-"));
    }

    #[test]
    fn caller_metadata_has_both_keys() {
        let metadata = caller_metadata();
        assert!(metadata.contains_key("userAgent"));
        assert!(metadata.contains_key("sessionId"));
    }

    #[test]
    fn status_reflects_policy_and_metrics() {
        let (provider, gate) = gate_with(PolicyConfig::default());
        gate.handle_confirmation(&request("1", "x", "y"));
        provider.update(&PolicyUpdate {
            enabled: Some(false),
            ..Default::default()
        });

        let status = gate.status();
        assert!(!status.enabled);
        assert_eq!(status.metrics.auto_confirmed, 1);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["initialized"], true);
        assert_eq!(json["metrics"]["totalRequests"], 1);
    }

    #[test]
    fn reset_metrics_clears_counters() {
        let (_, gate) = gate_with(PolicyConfig::default());
        gate.handle_confirmation(&request("1", "x", "y"));
        gate.reset_metrics();
        assert_eq!(gate.status().metrics, Metrics::default());
    }
}
