use regex::{Regex, RegexBuilder};
use tracing::trace;

use crate::error::{PatternList, PolicyError};

/// Tri-state result of matching request text against the pattern lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A never-confirm pattern matched.
    Deny,
    /// No never-confirm pattern matched, but an always-confirm one did.
    Allow,
    NoMatch,
}

#[derive(Debug)]
struct CompiledPattern {
    source: String,
    regex: Regex,
}

/// Both pattern lists, compiled once and kept in their configured order.
#[derive(Debug)]
pub struct CompiledPatterns {
    never: Vec<CompiledPattern>,
    always: Vec<CompiledPattern>,
}

impl CompiledPatterns {
    /// Compile every pattern case-insensitively. Fails on the first pattern
    /// that is not a valid regular expression.
    pub fn compile(never: &[String], always: &[String]) -> Result<Self, PolicyError> {
        Ok(Self {
            never: compile_list(never, PatternList::NeverConfirm)?,
            always: compile_list(always, PatternList::AlwaysConfirm)?,
        })
    }

    /// Match `text` against the never-confirm list, then the always-confirm
    /// list. The first hit wins; deny always outranks allow.
    pub fn evaluate(&self, text: &str) -> Verdict {
        let text = text.to_lowercase();

        if let Some(p) = self.never.iter().find(|p| p.regex.is_match(&text)) {
            trace!(pattern = %p.source, "matched never-confirm pattern");
            return Verdict::Deny;
        }
        if let Some(p) = self.always.iter().find(|p| p.regex.is_match(&text)) {
            trace!(pattern = %p.source, "matched always-confirm pattern");
            return Verdict::Allow;
        }
        Verdict::NoMatch
    }

    pub fn len(&self) -> usize {
        self.never.len() + self.always.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One-shot evaluation that compiles both lists on the spot.
///
/// Prefer [`CompiledPatterns`] when the same lists are used repeatedly.
pub fn evaluate(text: &str, never: &[String], always: &[String]) -> Result<Verdict, PolicyError> {
    Ok(CompiledPatterns::compile(never, always)?.evaluate(text))
}

fn compile_list(patterns: &[String], list: PatternList) -> Result<Vec<CompiledPattern>, PolicyError> {
    patterns
        .iter()
        .map(|pattern| {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| PolicyError::InvalidPattern {
                    list,
                    pattern: pattern.clone(),
                    source,
                })?;
            Ok(CompiledPattern {
                source: pattern.clone(),
                regex,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn deny_wins_over_allow() {
        let never = list(&["delete"]);
        let always = list(&["file operations"]);
        let verdict = evaluate("file operations: delete everything", &never, &always).unwrap();
        assert_eq!(verdict, Verdict::Deny);
    }

    #[test]
    fn deny_wins_even_when_allow_listed_first_in_text() {
        // Position in either list or in the text does not matter.
        let never = list(&["zzz", "format drive"]);
        let always = list(&["format"]);
        assert_eq!(
            evaluate("format drive c:", &never, &always).unwrap(),
            Verdict::Deny
        );
    }

    #[test]
    fn allow_when_only_allow_matches() {
        let never = list(&["rm -rf /"]);
        let always = list(&["build operations"]);
        assert_eq!(
            evaluate("building the project build operations", &never, &always).unwrap(),
            Verdict::Allow
        );
    }

    #[test]
    fn no_match_falls_through() {
        let never = list(&["rm -rf /"]);
        let always = list(&["build operations"]);
        assert_eq!(
            evaluate("hello world", &never, &always).unwrap(),
            Verdict::NoMatch
        );
    }

    #[test]
    fn empty_lists_never_match() {
        assert_eq!(evaluate("anything at all", &[], &[]).unwrap(), Verdict::NoMatch);
        let compiled = CompiledPatterns::compile(&[], &[]).unwrap();
        assert!(compiled.is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let never = list(&["Destroy Database"]);
        assert_eq!(
            evaluate("about to DESTROY DATABASE prod", &never, &[]).unwrap(),
            Verdict::Deny
        );
        // Uppercase regex classes still match lower-cased text.
        let always = list(&[r"[A-Z]+ operations"]);
        assert_eq!(
            evaluate("FILE OPERATIONS", &[], &always).unwrap(),
            Verdict::Allow
        );
    }

    #[test]
    fn regex_syntax_is_honoured() {
        let never = list(&[r"drop\s+table"]);
        assert_eq!(
            evaluate("please drop    table users", &never, &[]).unwrap(),
            Verdict::Deny
        );
        assert_eq!(
            evaluate("dropped a table", &never, &[]).unwrap(),
            Verdict::NoMatch
        );
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let never = list(&["[unclosed"]);
        let err = evaluate("text", &never, &[]).unwrap_err();
        match err {
            PolicyError::InvalidPattern { list, ref pattern, .. } => {
                assert_eq!(list, PatternList::NeverConfirm);
                assert_eq!(pattern, "[unclosed");
            }
            other => panic!("expected InvalidPattern, got {other:?}"),
        }
        assert!(err.to_string().contains("never-confirm"));
    }

    #[test]
    fn invalid_allow_pattern_names_its_list() {
        let err = CompiledPatterns::compile(&[], &list(&["(open"])).unwrap_err();
        assert!(err.to_string().contains("always-confirm"), "{err}");
    }

    #[test]
    fn compiled_len_counts_both_lists() {
        let compiled =
            CompiledPatterns::compile(&list(&["a", "b"]), &list(&["c"])).unwrap();
        assert_eq!(compiled.len(), 3);
    }
}
