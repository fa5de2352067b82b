use serde::{Deserialize, Serialize};

pub const REASON_DISABLED: &str = "Auto-confirmation disabled";
pub const REASON_RATE_LIMITED: &str = "Rate limit exceeded";
pub const REASON_NEVER_CONFIRM: &str = "Matched never-confirm pattern";
pub const REASON_ALWAYS_CONFIRM: &str = "Matched always-confirm pattern";
pub const REASON_DEFAULT: &str = "Default auto-confirmation";

/// How consequential the gated action is. Carried through but not yet used
/// when deciding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A single request to pass a confirmation gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    /// Caller-supplied identifier, echoed back in the response.
    pub id: String,
    pub message: String,
    pub action: String,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
    /// Origin tag such as `"cli"` or `"daemon"`.
    pub source: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ConfirmationRequest {
    /// Build a request stamped with the current time and `medium` severity.
    pub fn new(
        id: impl Into<String>,
        message: impl Into<String>,
        action: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            action: action.into(),
            timestamp: now_millis(),
            source: source.into(),
            severity: Severity::default(),
            metadata: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The text patterns are matched against: message and action joined by a
    /// single space, lower-cased.
    pub fn match_text(&self) -> String {
        format!("{} {}", self.message, self.action).to_lowercase()
    }
}

/// The outcome handed back to the caller of a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResponse {
    pub id: String,
    pub approved: bool,
    /// True when policy made the call, false when a human must decide.
    pub auto_confirmed: bool,
    /// Completion time in epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ConfirmationResponse {
    fn build(id: &str, approved: bool, auto_confirmed: bool, reason: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            approved,
            auto_confirmed,
            timestamp: now_millis(),
            reason: Some(reason.into()),
        }
    }

    /// Approved by policy.
    pub fn auto_approved(id: &str, reason: impl Into<String>) -> Self {
        Self::build(id, true, true, reason)
    }

    /// Denied by policy.
    pub fn auto_denied(id: &str, reason: impl Into<String>) -> Self {
        Self::build(id, false, true, reason)
    }

    /// Not approved, and policy did not decide: a human has to.
    pub fn needs_manual(id: &str, reason: impl Into<String>) -> Self {
        Self::build(id, false, false, reason)
    }

    /// Synthesized denial for a request that faulted while being decided.
    pub fn fault(id: &str, message: impl std::fmt::Display) -> Self {
        Self::build(id, false, false, format!("Error processing request: {message}"))
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
