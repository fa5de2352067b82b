//! Terminal styling for command output.

use colored::Colorize;

pub(crate) struct Theme;

impl Theme {
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    pub(crate) fn failure(text: &str) -> String {
        format!("{} {}", "✗".red(), text)
    }

    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// `label: value`, label padded so values line up.
    pub(crate) fn field(label: &str, value: impl std::fmt::Display) -> String {
        let label = format!("{:<24}", format!("{label}:"));
        format!("  {}{}", label.as_str().dimmed(), value)
    }

    /// Green "yes" or red "no".
    pub(crate) fn flag(on: bool) -> String {
        if on {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        }
    }

    pub(crate) fn separator() -> String {
        "━".repeat(40).dimmed().to_string()
    }
}
