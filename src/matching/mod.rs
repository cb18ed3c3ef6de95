//! Anchored-regex matching of transient names against exposure patterns
//!
//! Patterns are implicitly wrapped with start/end anchors so that `/foo`
//! does not match `/foo/bar` (a bare regex would match at any position).
//! Malformed patterns are warned about and skipped, never fatal: the
//! remaining patterns still apply.

use crate::error::TransixError;
use regex::Regex;
use std::collections::HashSet;

/// A single exposure pattern: the raw string as requested by the caller,
/// and its anchored compilation (`None` when the raw string is malformed).
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    regex: Option<Regex>,
}

impl Pattern {
    /// Compile a raw pattern with implied `^(?:...)$` anchors.
    ///
    /// A malformed pattern is kept (so registry diffs still see it) but
    /// never matches anything; the compile error is logged once here.
    pub fn compile(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let regex = match Regex::new(&format!("^(?:{})$", raw)) {
            Ok(re) => Some(re),
            Err(source) => {
                let err = TransixError::InvalidPattern {
                    pattern: raw.clone(),
                    source,
                };
                tracing::warn!("Ignoring invalid pattern: {}", err);
                None
            }
        };
        Self { raw, regex }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    /// Whether this pattern anchor-matches the whole candidate name.
    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(name))
    }
}

/// Ordered, de-duplicated set of compiled exposure patterns
///
/// Order matters for [`PatternSet::match_first`]; duplicates collapse to
/// their first occurrence. An empty set means "expose nothing".
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile a list of raw patterns, preserving first-occurrence order.
    pub fn compile<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut patterns: Vec<Pattern> = Vec::new();
        for r in raw {
            let r = r.into();
            if patterns.iter().any(|p| p.raw == r) {
                continue;
            }
            patterns.push(Pattern::compile(r));
        }
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Raw pattern strings in registry order.
    pub fn raw_patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.raw.as_str())
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.patterns.iter().any(|p| p.raw == raw)
    }

    /// First pattern (in registry order) that anchor-matches `name`.
    pub fn match_first(&self, name: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.matches(name))
            .map(|p| p.raw.as_str())
    }

    /// Subset of `names` matched by any pattern; duplicates collapse.
    pub fn match_all<'a, I>(&self, names: I) -> HashSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|n| self.match_first(n).is_some())
            .map(|n| n.to_string())
            .collect()
    }
}
