//! # confirm-engine
//!
//! Policy core of the auto-confirm gate. For every confirmation request it
//! decides whether the action is approved by policy, denied by policy, or has
//! to go to a human.
//!
//! A decision runs three checks in order: the global `enabled` switch, a
//! sliding one-minute rate limit on approvals, and the never/always-confirm
//! regex lists (never-confirm always wins). Requests matching nothing are
//! approved.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use confirm_engine::{
//!     ConfirmationGate, ConfirmationRequest, DecisionEngine, PolicyConfig, StaticConfig,
//! };
//!
//! let provider = Arc::new(StaticConfig::new(PolicyConfig::default()));
//! let gate = ConfirmationGate::new(Arc::new(DecisionEngine::with_provider(provider)));
//!
//! let request = ConfirmationRequest::new("req-1", "Building the project", "build operations", "cli");
//! let response = gate.handle_confirmation(&request);
//! assert!(response.approved);
//! ```

mod decision;
mod engine;
mod error;
mod gate;
pub mod loader;
pub mod matcher;
pub mod metrics;
mod provider;
pub mod rate_limit;
mod schema;

// Re-export primary public API at crate root.
pub use decision::{
    ConfirmationRequest, ConfirmationResponse, Severity, REASON_ALWAYS_CONFIRM, REASON_DEFAULT,
    REASON_DISABLED, REASON_NEVER_CONFIRM, REASON_RATE_LIMITED,
};
pub use engine::DecisionEngine;
pub use error::{PatternList, PolicyError};
pub use gate::{ConfirmationGate, GateStatus, EXTERNAL_CALLER_SOURCE};
pub use matcher::{CompiledPatterns, Verdict};
pub use metrics::{Metrics, MetricsRecorder, Outcome, RollingMetrics};
pub use provider::{ConfigProvider, StaticConfig};
pub use rate_limit::{RateLimiter, SlidingWindowLimiter};
pub use schema::{
    default_always_confirm_patterns, default_never_confirm_patterns, LogLevel, PolicyConfig,
    PolicyUpdate,
};
