use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::decision::{
    ConfirmationRequest, ConfirmationResponse, REASON_ALWAYS_CONFIRM, REASON_DEFAULT,
    REASON_DISABLED, REASON_NEVER_CONFIRM, REASON_RATE_LIMITED,
};
use crate::error::PolicyError;
use crate::matcher::{CompiledPatterns, Verdict};
use crate::metrics::{Metrics, MetricsRecorder, Outcome, RollingMetrics};
use crate::provider::ConfigProvider;
use crate::rate_limit::{RateLimiter, SlidingWindowLimiter};
use crate::schema::PolicyConfig;

// ---------------------------------------------------------------------------
// Mutable state
// ---------------------------------------------------------------------------

/// Compiled patterns together with the snapshot they were built from.
struct PatternCache {
    source: Arc<PolicyConfig>,
    compiled: Arc<CompiledPatterns>,
}

impl PatternCache {
    fn is_valid_for(&self, policy: &Arc<PolicyConfig>) -> bool {
        Arc::ptr_eq(&self.source, policy)
            || (self.source.never_confirm_patterns == policy.never_confirm_patterns
                && self.source.always_confirm_patterns == policy.always_confirm_patterns)
    }
}

/// Everything a decision mutates. Guarded by a single lock so that the
/// capacity check and the matching `consume` are one atomic step.
struct EngineState {
    limiter: Box<dyn RateLimiter>,
    metrics: Box<dyn MetricsRecorder>,
    patterns: Option<PatternCache>,
}

impl EngineState {
    /// Compiled patterns for `policy`, recompiling only when the pattern
    /// lists changed since the last decision.
    fn patterns_for(&mut self, policy: &Arc<PolicyConfig>) -> Result<Arc<CompiledPatterns>, PolicyError> {
        if let Some(cache) = self.patterns.as_mut() {
            if cache.is_valid_for(policy) {
                cache.source = Arc::clone(policy);
                return Ok(Arc::clone(&cache.compiled));
            }
        }

        trace!("compiling confirmation patterns");
        let compiled = Arc::new(CompiledPatterns::compile(
            &policy.never_confirm_patterns,
            &policy.always_confirm_patterns,
        )?);
        self.patterns = Some(PatternCache {
            source: Arc::clone(policy),
            compiled: Arc::clone(&compiled),
        });
        Ok(compiled)
    }

    fn finish(
        &mut self,
        started: Instant,
        outcome: Outcome,
        response: ConfirmationResponse,
    ) -> ConfirmationResponse {
        self.metrics.record_outcome(outcome);
        self.metrics
            .record_duration(started.elapsed().as_secs_f64() * 1000.0);
        response
    }
}

// ---------------------------------------------------------------------------
// DecisionEngine
// ---------------------------------------------------------------------------

/// Decides whether a confirmation request is auto-approved, auto-denied, or
/// left to a human.
///
/// The engine reads a fresh policy snapshot from its [`ConfigProvider`] at the
/// start of every call to [`decide`](Self::decide). Rate limiting, metrics and
/// the compiled-pattern cache sit behind one mutex held for the whole
/// decision, so concurrent callers are serialized and can never both take the
/// last unit of rate-limit capacity.
pub struct DecisionEngine {
    provider: Arc<dyn ConfigProvider>,
    state: Mutex<EngineState>,
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let policy = self.provider.snapshot();
        f.debug_struct("DecisionEngine")
            .field("enabled", &policy.enabled)
            .field("never_confirm", &policy.never_confirm_patterns.len())
            .field("always_confirm", &policy.always_confirm_patterns.len())
            .field("max_per_minute", &policy.max_confirmations_per_minute)
            .finish()
    }
}

impl DecisionEngine {
    /// Build an engine from explicit collaborators.
    pub fn new(
        provider: Arc<dyn ConfigProvider>,
        limiter: Box<dyn RateLimiter>,
        metrics: Box<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            provider,
            state: Mutex::new(EngineState {
                limiter,
                metrics,
                patterns: None,
            }),
        }
    }

    /// Build an engine with a [`SlidingWindowLimiter`] and [`RollingMetrics`].
    pub fn with_provider(provider: Arc<dyn ConfigProvider>) -> Self {
        Self::new(
            provider,
            Box::new(SlidingWindowLimiter::new()),
            Box::new(RollingMetrics::new()),
        )
    }

    /// The policy a decision started now would see.
    pub fn policy(&self) -> Arc<PolicyConfig> {
        self.provider.snapshot()
    }

    /// Decide a single request.
    ///
    /// Branches, first match wins: disabled → manual; no rate-limit capacity
    /// → denied; never-confirm match → denied; always-confirm match →
    /// approved; otherwise → approved. Only approvals consume capacity.
    ///
    /// Returns an error only for faults such as a pattern that does not
    /// compile. A denial is an `Ok` response.
    pub fn decide(&self, request: &ConfirmationRequest) -> Result<ConfirmationResponse, PolicyError> {
        let started = Instant::now();
        let policy = self.provider.snapshot();

        debug!(id = %request.id, source = %request.source, "processing confirmation request");

        let mut state = self.state.lock();
        state.metrics.record_request();

        if !policy.enabled {
            debug!(id = %request.id, "auto-confirmation disabled; manual confirmation required");
            return Ok(state.finish(
                started,
                Outcome::ManualRequired,
                ConfirmationResponse::needs_manual(&request.id, REASON_DISABLED),
            ));
        }

        if !state.limiter.has_capacity(policy.max_confirmations_per_minute) {
            debug!(
                id = %request.id,
                max_per_minute = policy.max_confirmations_per_minute,
                "rate limit exceeded"
            );
            return Ok(state.finish(
                started,
                Outcome::Denied,
                ConfirmationResponse::needs_manual(&request.id, REASON_RATE_LIMITED),
            ));
        }

        let patterns = state.patterns_for(&policy)?;
        let verdict = patterns.evaluate(&request.match_text());
        debug!(id = %request.id, ?verdict, "pattern evaluation complete");

        let response = match verdict {
            Verdict::Deny => state.finish(
                started,
                Outcome::Denied,
                ConfirmationResponse::auto_denied(&request.id, REASON_NEVER_CONFIRM),
            ),
            Verdict::Allow => {
                state.limiter.consume();
                state.finish(
                    started,
                    Outcome::AutoConfirmed,
                    ConfirmationResponse::auto_approved(&request.id, REASON_ALWAYS_CONFIRM),
                )
            }
            Verdict::NoMatch => {
                state.limiter.consume();
                state.finish(
                    started,
                    Outcome::AutoConfirmed,
                    ConfirmationResponse::auto_approved(&request.id, REASON_DEFAULT),
                )
            }
        };
        Ok(response)
    }

    pub fn metrics(&self) -> Metrics {
        self.state.lock().metrics.snapshot()
    }

    /// Zero all counters, drop latency samples and forget rate-limit history.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.metrics.reset();
        state.limiter.reset();
        debug!("decision engine state reset");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
