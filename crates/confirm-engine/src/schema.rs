use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Active auto-confirmation policy, as persisted in the JSON config file.
///
/// Every field has a default, so a partial file is merged over
/// [`PolicyConfig::default`] at deserialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyConfig {
    /// Master switch. When false every request needs a human.
    pub enabled: bool,
    /// Case-insensitive regexes that force an approval.
    pub always_confirm_patterns: Vec<String>,
    /// Case-insensitive regexes that force a denial. Checked first.
    pub never_confirm_patterns: Vec<String>,
    /// Ceiling on auto-approvals within any trailing 60 seconds.
    pub max_confirmations_per_minute: u32,
    /// Carried for compatibility with existing config files; not enforced.
    pub timeout_ms: u64,
    pub log_level: LogLevel,
    pub metrics_enabled: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            always_confirm_patterns: default_always_confirm_patterns(),
            never_confirm_patterns: default_never_confirm_patterns(),
            max_confirmations_per_minute: 60,
            timeout_ms: 1000,
            log_level: LogLevel::Info,
            metrics_enabled: true,
        }
    }
}

impl PolicyConfig {
    /// Return a new config with every `Some` field of `update` applied.
    ///
    /// The receiver is left untouched; callers swap the result in wholesale.
    pub fn apply(&self, update: &PolicyUpdate) -> PolicyConfig {
        let mut next = self.clone();
        if let Some(enabled) = update.enabled {
            next.enabled = enabled;
        }
        if let Some(ref patterns) = update.always_confirm_patterns {
            next.always_confirm_patterns = patterns.clone();
        }
        if let Some(ref patterns) = update.never_confirm_patterns {
            next.never_confirm_patterns = patterns.clone();
        }
        if let Some(max) = update.max_confirmations_per_minute {
            next.max_confirmations_per_minute = max;
        }
        if let Some(timeout) = update.timeout_ms {
            next.timeout_ms = timeout;
        }
        if let Some(level) = update.log_level {
            next.log_level = level;
        }
        if let Some(metrics) = update.metrics_enabled {
            next.metrics_enabled = metrics;
        }
        next
    }
}

/// Patterns auto-approved out of the box.
pub fn default_always_confirm_patterns() -> Vec<String> {
    [
        "file operations",
        "code changes",
        "build operations",
        "test execution",
        "package installation",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Patterns auto-denied out of the box.
pub fn default_never_confirm_patterns() -> Vec<String> {
    [
        "delete system files",
        "format drive",
        "rm -rf /",
        "destroy database",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// A partial [`PolicyConfig`]. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_confirm_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub never_confirm_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_confirmations_per_minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_enabled: Option<bool>,
}

impl PolicyUpdate {
    pub fn is_empty(&self) -> bool {
        *self == PolicyUpdate::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!(
                "unknown log level '{other}'; expected one of debug, info, warn, error"
            )),
        }
    }
}
