use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use confirm_engine::{loader, ConfigProvider, LogLevel, PolicyConfig, PolicyUpdate};
use parking_lot::RwLock;

/// File name used when no path is given explicitly.
const DEFAULT_FILE_NAME: &str = ".auto-confirm.json";

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

/// Explicit path (flag or `CONFIG_FILE_PATH`) if given, otherwise
/// `~/.auto-confirm.json`, falling back to the working directory when no home
/// directory is known.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_FILE_NAME),
    }
}

// ---------------------------------------------------------------------------
// ConfigStore
// ---------------------------------------------------------------------------

/// File-backed [`ConfigProvider`].
///
/// Every update is validated, written to disk, and only then swapped in, so
/// the in-memory snapshot never runs ahead of the file.
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<PolicyConfig>>,
    warnings: Vec<String>,
}

impl ConfigStore {
    /// Load from `path` and apply overrides from the process environment.
    ///
    /// Never fails. A missing file means defaults; an unreadable or invalid
    /// file means defaults plus a recorded warning.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::open_with_env(path, |key| std::env::var(key).ok())
    }

    /// Like [`open`](Self::open) with an explicit environment lookup.
    pub fn open_with_env(path: impl Into<PathBuf>, env: impl Fn(&str) -> Option<String>) -> Self {
        let path = path.into();
        let mut warnings = Vec::new();

        let from_file = if path.exists() {
            match loader::load_policy(&path) {
                Ok(config) => config,
                Err(err) => {
                    warnings.push(format!("{err:#}; using defaults"));
                    PolicyConfig::default()
                }
            }
        } else {
            PolicyConfig::default()
        };

        let update = env_overrides(&env, &mut warnings);
        let config = if update.is_empty() {
            from_file
        } else {
            let merged = from_file.apply(&update);
            match loader::validate(&merged) {
                Ok(()) => merged,
                Err(err) => {
                    warnings.push(format!("ignoring environment overrides: {err:#}"));
                    from_file
                }
            }
        };

        Self {
            path,
            current: RwLock::new(Arc::new(config)),
            warnings,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Problems encountered while loading, for the caller to log once a
    /// subscriber is installed.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Merge `update` over the current policy, persist it, then swap it in.
    pub fn update(&self, update: &PolicyUpdate) -> Result<Arc<PolicyConfig>> {
        let mut guard = self.current.write();
        let next = guard.apply(update);
        loader::validate(&next).context("rejected configuration update")?;
        loader::save_policy(&self.path, &next)?;

        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        tracing::debug!(path = %self.path.display(), "configuration updated");
        Ok(next)
    }

    /// Restore and persist the default policy.
    pub fn reset(&self) -> Result<()> {
        let mut guard = self.current.write();
        let defaults = PolicyConfig::default();
        loader::save_policy(&self.path, &defaults)?;
        *guard = Arc::new(defaults);
        tracing::debug!(path = %self.path.display(), "configuration reset to defaults");
        Ok(())
    }
}

impl ConfigProvider for ConfigStore {
    fn snapshot(&self) -> Arc<PolicyConfig> {
        self.current.read().clone()
    }
}

// ---------------------------------------------------------------------------
// Environment overrides
// ---------------------------------------------------------------------------

fn env_overrides(env: &impl Fn(&str) -> Option<String>, warnings: &mut Vec<String>) -> PolicyUpdate {
    let mut update = PolicyUpdate::default();

    if let Some(raw) = env("AUTO_CONFIRM_ENABLED") {
        update.enabled = parse_env(&raw, "AUTO_CONFIRM_ENABLED", parse_bool, warnings);
    }
    if let Some(raw) = env("MAX_CONFIRMATIONS_PER_MINUTE") {
        update.max_confirmations_per_minute =
            parse_env(&raw, "MAX_CONFIRMATIONS_PER_MINUTE", |s| s.parse().ok(), warnings);
    }
    if let Some(raw) = env("CONFIRMATION_TIMEOUT_MS") {
        update.timeout_ms =
            parse_env(&raw, "CONFIRMATION_TIMEOUT_MS", |s| s.parse().ok(), warnings);
    }
    if let Some(raw) = env("LOG_LEVEL") {
        update.log_level = parse_env(&raw, "LOG_LEVEL", |s| s.parse::<LogLevel>().ok(), warnings);
    }
    if let Some(raw) = env("METRICS_ENABLED") {
        update.metrics_enabled = parse_env(&raw, "METRICS_ENABLED", parse_bool, warnings);
    }
    if let Some(raw) = env("ALWAYS_CONFIRM_PATTERNS") {
        update.always_confirm_patterns = Some(split_patterns(&raw));
    }
    if let Some(raw) = env("NEVER_CONFIRM_PATTERNS") {
        update.never_confirm_patterns = Some(split_patterns(&raw));
    }

    update
}

fn parse_env<T>(
    raw: &str,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
    warnings: &mut Vec<String>,
) -> Option<T> {
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warnings.push(format!("ignoring {key}={raw:?}: not a valid value"));
    }
    parsed
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open_with_env(dir.path().join("absent.json"), no_env);

        let config = store.snapshot();
        assert!(config.enabled);
        assert!(config
            .always_confirm_patterns
            .contains(&"file operations".to_string()));
        assert!(config
            .never_confirm_patterns
            .contains(&"delete system files".to_string()));
        assert_eq!(config.max_confirmations_per_minute, 60);
        assert_eq!(config.timeout_ms, 1000);
        assert!(store.warnings().is_empty());
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::open_with_env(&path, no_env);

        store
            .update(&PolicyUpdate {
                enabled: Some(false),
                max_confirmations_per_minute: Some(30),
                ..Default::default()
            })
            .unwrap();
        assert!(!store.snapshot().enabled);
        assert_eq!(store.snapshot().max_confirmations_per_minute, 30);

        let reopened = ConfigStore::open_with_env(&path, no_env);
        assert!(!reopened.snapshot().enabled);
        assert_eq!(reopened.snapshot().max_confirmations_per_minute, 30);
    }

    #[test]
    fn invalid_file_falls_back_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "invalid json").unwrap();

        let store = ConfigStore::open_with_env(&path, no_env);
        assert!(store.snapshot().enabled);
        assert_eq!(store.warnings().len(), 1);
        assert!(store.warnings()[0].contains("failed to parse policy file"));
    }

    #[test]
    fn invalid_update_is_rejected_and_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::open_with_env(&path, no_env);

        let err = store
            .update(&PolicyUpdate {
                never_confirm_patterns: Some(vec!["(broken".into()]),
                ..Default::default()
            })
            .unwrap_err();
        assert!(format!("{err:#}").contains("never-confirm"), "{err:#}");
        assert_eq!(store.snapshot().never_confirm_patterns.len(), 4);
        assert!(!path.exists());
    }

    #[test]
    fn reset_restores_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::open_with_env(&path, no_env);

        store
            .update(&PolicyUpdate {
                enabled: Some(false),
                ..Default::default()
            })
            .unwrap();
        store.reset().unwrap();

        assert_eq!(*store.snapshot(), PolicyConfig::default());
        assert_eq!(
            *ConfigStore::open_with_env(&path, no_env).snapshot(),
            PolicyConfig::default()
        );
    }

    #[test]
    fn environment_overrides_apply() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_from(&[
            ("AUTO_CONFIRM_ENABLED", "false"),
            ("MAX_CONFIRMATIONS_PER_MINUTE", "120"),
            ("LOG_LEVEL", "debug"),
            ("NEVER_CONFIRM_PATTERNS", "drop table, shutdown ,"),
        ]);
        let store = ConfigStore::open_with_env(dir.path().join("c.json"), env);

        let config = store.snapshot();
        assert!(!config.enabled);
        assert_eq!(config.max_confirmations_per_minute, 120);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.never_confirm_patterns, vec!["drop table", "shutdown"]);
        // Untouched fields keep their defaults.
        assert!(config.metrics_enabled);
        assert!(store.warnings().is_empty());
    }

    #[test]
    fn environment_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        std::fs::write(&path, r#"{ "enabled": false, "timeoutMs": 50 }"#).unwrap();

        let store =
            ConfigStore::open_with_env(&path, env_from(&[("AUTO_CONFIRM_ENABLED", "true")]));
        assert!(store.snapshot().enabled);
        assert_eq!(store.snapshot().timeout_ms, 50);
    }

    #[test]
    fn unparsable_environment_values_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_from(&[
            ("MAX_CONFIRMATIONS_PER_MINUTE", "lots"),
            ("METRICS_ENABLED", "maybe"),
        ]);
        let store = ConfigStore::open_with_env(dir.path().join("c.json"), env);

        assert_eq!(store.snapshot().max_confirmations_per_minute, 60);
        assert!(store.snapshot().metrics_enabled);
        assert_eq!(store.warnings().len(), 2);
    }

    #[test]
    fn invalid_environment_patterns_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_from(&[("ALWAYS_CONFIRM_PATTERNS", "[oops")]);
        let store = ConfigStore::open_with_env(dir.path().join("c.json"), env);

        assert_eq!(store.snapshot().always_confirm_patterns.len(), 5);
        assert!(store.warnings()[0].contains("ignoring environment overrides"));
    }

    #[test]
    fn explicit_path_wins() {
        let explicit = PathBuf::from("/tmp/custom.json");
        assert_eq!(resolve_path(Some(explicit.as_path())), explicit);
        assert!(resolve_path(None).ends_with(DEFAULT_FILE_NAME));
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
