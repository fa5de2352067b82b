use std::fmt;

use thiserror::Error;

/// Which pattern list a pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternList {
    NeverConfirm,
    AlwaysConfirm,
}

impl fmt::Display for PatternList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternList::NeverConfirm => f.write_str("never-confirm"),
            PatternList::AlwaysConfirm => f.write_str("always-confirm"),
        }
    }
}

/// Faults raised while deciding. A denial is not one of these.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid {list} pattern '{pattern}': {source}")]
    InvalidPattern {
        list: PatternList,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid policy: {0}")]
    InvalidConfig(String),
}
