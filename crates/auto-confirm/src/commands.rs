//! Handlers for the one-shot subcommands. The daemon lives in `main.rs`.

use std::time::Instant;

use anyhow::{Context, Result};
use confirm_engine::{
    default_always_confirm_patterns, default_never_confirm_patterns, ConfigProvider,
    ConfirmationGate, ConfirmationRequest, Metrics, PolicyConfig, PolicyUpdate, Severity,
};

use crate::cli::{ConfigCommand, PatternsCommand, SetArgs};
use crate::config::ConfigStore;
use crate::theme::Theme;

/// Source tag for requests issued by `auto-confirm test`.
const CLI_TEST_SOURCE: &str = "cli-test";

pub fn status(store: &ConfigStore, gate: &ConfirmationGate) {
    let config = store.snapshot();

    println!("{}", Theme::header("Auto-confirm status"));
    println!("{}", Theme::separator());
    print_policy(&config);
    println!("{}", Theme::field("Config file", store.path().display()));
    println!();
    print_metrics(&gate.status().metrics);
}

pub fn set_enabled(store: &ConfigStore, enabled: bool) -> Result<()> {
    store.update(&PolicyUpdate {
        enabled: Some(enabled),
        ..Default::default()
    })?;

    if enabled {
        println!("{}", Theme::success("Auto-confirmation enabled"));
    } else {
        println!("{}", Theme::warning("Auto-confirmation disabled"));
    }
    Ok(())
}

pub fn metrics(gate: &ConfirmationGate, reset: bool) {
    print_metrics(&gate.status().metrics);
    if reset {
        gate.reset_metrics();
        println!();
        println!("{}", Theme::success("Metrics reset"));
    }
}

/// Run one request through the gate and print what it decided.
pub fn test(gate: &ConfirmationGate, message: &str, action: &str) {
    let request = ConfirmationRequest::new(
        format!("test-{}", chrono::Utc::now().timestamp_millis()),
        message,
        action,
        CLI_TEST_SOURCE,
    )
    .with_severity(Severity::Medium);

    let started = Instant::now();
    let response = gate.handle_confirmation(&request);
    let elapsed = started.elapsed();

    println!("{}", Theme::header("Decision"));
    println!("{}", Theme::separator());
    println!("{}", Theme::field("Message", message));
    if !action.is_empty() {
        println!("{}", Theme::field("Action", action));
    }
    let verdict = if response.approved {
        Theme::success("approved")
    } else if response.auto_confirmed {
        Theme::failure("denied")
    } else {
        Theme::warning("manual confirmation required")
    };
    println!("{}", Theme::field("Result", verdict));
    println!("{}", Theme::field("Decided by policy", Theme::flag(response.auto_confirmed)));
    println!(
        "{}",
        Theme::field("Reason", response.reason.as_deref().unwrap_or("-"))
    );
    println!(
        "{}",
        Theme::field("Response time", format!("{:.2}ms", elapsed.as_secs_f64() * 1000.0))
    );
}

pub fn init(gate: &ConfirmationGate) {
    let already = gate.is_initialized();
    gate.initialize();

    if already {
        println!("{}", Theme::dimmed("Gate was already initialized"));
    } else {
        println!("{}", Theme::success("Auto-confirm gate initialized"));
    }
    println!();
    print_policy(&gate.engine().policy());
}

pub fn patterns(store: &ConfigStore, command: PatternsCommand) -> Result<()> {
    let config = store.snapshot();

    match command {
        PatternsCommand::List => {
            print_pattern_list("Always confirm", &config.always_confirm_patterns);
            println!();
            print_pattern_list("Never confirm", &config.never_confirm_patterns);
        }
        PatternsCommand::AddAlways { pattern } => {
            match with_pattern(&config.always_confirm_patterns, &pattern) {
                Some(list) => {
                    store.update(&PolicyUpdate {
                        always_confirm_patterns: Some(list),
                        ..Default::default()
                    })?;
                    println!(
                        "{}",
                        Theme::success(&format!("Added always-confirm pattern '{pattern}'"))
                    );
                }
                None => println!(
                    "{}",
                    Theme::warning(&format!("'{pattern}' is already an always-confirm pattern"))
                ),
            }
        }
        PatternsCommand::AddNever { pattern } => {
            match with_pattern(&config.never_confirm_patterns, &pattern) {
                Some(list) => {
                    store.update(&PolicyUpdate {
                        never_confirm_patterns: Some(list),
                        ..Default::default()
                    })?;
                    println!(
                        "{}",
                        Theme::success(&format!("Added never-confirm pattern '{pattern}'"))
                    );
                }
                None => println!(
                    "{}",
                    Theme::warning(&format!("'{pattern}' is already a never-confirm pattern"))
                ),
            }
        }
        PatternsCommand::Remove { pattern } => {
            let always = without_pattern(&config.always_confirm_patterns, &pattern);
            let never = without_pattern(&config.never_confirm_patterns, &pattern);
            if always.is_none() && never.is_none() {
                println!(
                    "{}",
                    Theme::warning(&format!("'{pattern}' is not in either list"))
                );
                return Ok(());
            }
            store.update(&PolicyUpdate {
                always_confirm_patterns: always,
                never_confirm_patterns: never,
                ..Default::default()
            })?;
            println!("{}", Theme::success(&format!("Removed pattern '{pattern}'")));
        }
        PatternsCommand::Reset => {
            store.update(&PolicyUpdate {
                always_confirm_patterns: Some(default_always_confirm_patterns()),
                never_confirm_patterns: Some(default_never_confirm_patterns()),
                ..Default::default()
            })?;
            println!("{}", Theme::success("Pattern lists restored to defaults"));
        }
    }
    Ok(())
}

pub fn config(store: &ConfigStore, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let json = serde_json::to_string_pretty(store.snapshot().as_ref())
                .context("failed to serialize configuration")?;
            println!("{json}");
        }
        ConfigCommand::Set(args) => {
            if args.is_empty() {
                println!(
                    "{}",
                    Theme::warning("Nothing to change; pass at least one option")
                );
                return Ok(());
            }
            let updated = store.update(&set_update(&args))?;
            println!("{}", Theme::success("Configuration updated"));
            print_policy(&updated);
        }
        ConfigCommand::Reset => {
            store.reset()?;
            println!("{}", Theme::success("Configuration restored to defaults"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `list` plus `pattern`, or `None` if it is already there.
fn with_pattern(list: &[String], pattern: &str) -> Option<Vec<String>> {
    if list.iter().any(|p| p == pattern) {
        return None;
    }
    let mut next = list.to_vec();
    next.push(pattern.to_string());
    Some(next)
}

/// `list` without `pattern`, or `None` if it was not there.
fn without_pattern(list: &[String], pattern: &str) -> Option<Vec<String>> {
    let next: Vec<String> = list.iter().filter(|p| *p != pattern).cloned().collect();
    (next.len() != list.len()).then_some(next)
}

fn set_update(args: &SetArgs) -> PolicyUpdate {
    PolicyUpdate {
        max_confirmations_per_minute: args.max_per_minute,
        timeout_ms: args.timeout_ms,
        log_level: args.log_level,
        metrics_enabled: args.metrics_enabled,
        ..Default::default()
    }
}

fn print_policy(config: &PolicyConfig) {
    println!("{}", Theme::field("Enabled", Theme::flag(config.enabled)));
    println!(
        "{}",
        Theme::field("Max per minute", config.max_confirmations_per_minute)
    );
    println!("{}", Theme::field("Timeout", format!("{}ms", config.timeout_ms)));
    println!("{}", Theme::field("Log level", config.log_level));
    println!(
        "{}",
        Theme::field("Metrics enabled", Theme::flag(config.metrics_enabled))
    );
    println!(
        "{}",
        Theme::field("Always-confirm patterns", config.always_confirm_patterns.len())
    );
    println!(
        "{}",
        Theme::field("Never-confirm patterns", config.never_confirm_patterns.len())
    );
}

fn print_metrics(metrics: &Metrics) {
    println!("{}", Theme::header("Metrics"));
    println!("{}", Theme::separator());
    println!("{}", Theme::field("Total requests", metrics.total_requests));
    println!(
        "{}",
        Theme::field(
            "Auto-confirmed",
            format!(
                "{} ({:.1}%)",
                metrics.auto_confirmed,
                metrics.percent(metrics.auto_confirmed)
            )
        )
    );
    println!(
        "{}",
        Theme::field("Manual confirmation", metrics.manual_confirmed)
    );
    println!("{}", Theme::field("Denied", metrics.denied));
    println!("{}", Theme::field("Timeouts", metrics.timeouts));
    println!(
        "{}",
        Theme::field(
            "Avg response time",
            format!("{:.2}ms", metrics.average_response_time)
        )
    );
}

fn print_pattern_list(title: &str, patterns: &[String]) {
    println!("{}", Theme::header(title));
    if patterns.is_empty() {
        println!("  {}", Theme::dimmed("(none)"));
    }
    for pattern in patterns {
        println!("  - {pattern}");
    }
}
