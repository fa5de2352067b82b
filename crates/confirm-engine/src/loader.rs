use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::matcher::CompiledPatterns;
use crate::schema::PolicyConfig;

/// Load a [`PolicyConfig`] from a JSON file on disk.
///
/// Fields missing from the file take their default values. The result is
/// validated before it is returned.
pub fn load_policy(path: impl AsRef<Path>) -> Result<PolicyConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read policy file: {}", path.display()))?;
    load_policy_from_str(&contents)
        .with_context(|| format!("failed to parse policy file: {}", path.display()))
}

/// Parse and validate a [`PolicyConfig`] from a JSON string.
pub fn load_policy_from_str(json: &str) -> Result<PolicyConfig> {
    let config: PolicyConfig =
        serde_json::from_str(json).context("JSON deserialization failed")?;
    validate(&config)?;
    Ok(config)
}

/// Write `config` as pretty-printed JSON, creating parent directories.
pub fn save_policy(path: impl AsRef<Path>, config: &PolicyConfig) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let mut json = serde_json::to_string_pretty(config).context("failed to serialize policy")?;
    json.push('\n');
    std::fs::write(path, json)
        .with_context(|| format!("failed to write policy file: {}", path.display()))
}

/// Reject configs the engine could not run with.
pub fn validate(config: &PolicyConfig) -> Result<()> {
    if config.max_confirmations_per_minute == 0 {
        bail!("maxConfirmationsPerMinute must be greater than 0");
    }
    if config.timeout_ms == 0 {
        bail!("timeoutMs must be greater than 0");
    }

    let all = config
        .never_confirm_patterns
        .iter()
        .chain(&config.always_confirm_patterns);
    for pattern in all {
        if pattern.trim().is_empty() {
            bail!("patterns must not be empty");
        }
    }

    CompiledPatterns::compile(
        &config.never_confirm_patterns,
        &config.always_confirm_patterns,
    )?;

    Ok(())
}
