//! Rule compilation
//!
//! Turns a declarative `Rule` into something executable: a compiled
//! condition, a content matcher, and the per-group bookkeeping the
//! collector needs. A content pattern that is not a valid regex falls
//! back to literal matching; an invalid condition fails the whole
//! rule (the engine logs it and skips the rule for the pass).

use log::{debug, warn};
use regex::{Captures, Regex, RegexBuilder};

use crate::config::Rule;
use crate::error::{HiliteError, Result};

/// Regex flag letters decoded into builder toggles
///
/// Follows the original schema's letters: `i`, `m`, `s`, `x`, `U`.
/// `g` and `u` are accepted and ignored (matching is always global
/// and always Unicode here); anything else is logged and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_matches_new_line: bool,
    pub ignore_whitespace: bool,
    pub swap_greed: bool,
}

impl Flags {
    /// Parse a flag string like "im"
    pub fn parse(letters: &str) -> Self {
        let mut flags = Self::default();
        for c in letters.chars() {
            match c {
                'i' => flags.case_insensitive = true,
                'm' => flags.multi_line = true,
                's' => flags.dot_matches_new_line = true,
                'x' => flags.ignore_whitespace = true,
                'U' => flags.swap_greed = true,
                'g' | 'u' => {}
                _ => warn!("ignoring unsupported regex flag {:?}", c),
            }
        }
        flags
    }

    /// Flags for a condition: specified letters, or case-insensitive
    /// when absent or empty
    pub fn for_condition(letters: Option<&str>) -> Self {
        match letters {
            Some(s) if !s.is_empty() => Self::parse(s),
            _ => Self {
                case_insensitive: true,
                ..Self::default()
            },
        }
    }

    /// Compile a pattern with these flags
    pub fn build(&self, pattern: &str) -> std::result::Result<Regex, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(self.case_insensitive)
            .multi_line(self.multi_line)
            .dot_matches_new_line(self.dot_matches_new_line)
            .ignore_whitespace(self.ignore_whitespace)
            .swap_greed(self.swap_greed)
            .build()
    }
}

/// Executable content matcher
///
/// Either the user's pattern compiled as a regex, or the literal
/// fallback: the pattern text with metacharacters escaped plus a
/// trailing word boundary, so "log" does not match inside "logger".
/// The boundary applies only to the fallback, never to regex mode.
pub enum ContentMatcher {
    Regex(Regex),
    Literal(Regex),
}

impl ContentMatcher {
    /// Compile a content pattern, falling back to literal mode when
    /// it is not a valid regex
    pub fn compile(pattern: &str, flags: Flags) -> Result<Self> {
        match flags.build(pattern) {
            Ok(regex) => Ok(Self::Regex(regex)),
            Err(e) => {
                debug!("pattern {:?} is not a valid regex ({}), matching literally", pattern, e);
                Self::literal(pattern, flags)
            }
        }
    }

    /// Build the literal-fallback matcher for a pattern
    pub fn literal(pattern: &str, flags: Flags) -> Result<Self> {
        let escaped = format!(r"{}\b", regex::escape(pattern));
        flags
            .build(&escaped)
            .map(Self::Literal)
            .map_err(HiliteError::Pattern)
    }

    fn regex(&self) -> &Regex {
        match self {
            Self::Regex(regex) | Self::Literal(regex) => regex,
        }
    }

    /// Number of capture groups in the pattern, counting the implicit
    /// whole-match group 0
    pub fn capture_count(&self) -> usize {
        self.regex().captures_len()
    }

    /// Find the leftmost match starting at or after a byte offset
    ///
    /// `start` must lie on a character boundary and be at most
    /// `text.len()`.
    pub fn find_from<'t>(&self, text: &'t str, start: usize) -> Option<Captures<'t>> {
        self.regex().captures_at(text, start)
    }
}

/// A rule ready for span collection
pub struct CompiledRule {
    /// Compiled gating pattern; `None` means always active
    pub condition: Option<Regex>,
    /// Content matcher, regex or literal fallback
    pub matcher: ContentMatcher,
    /// Number of configured per-group styles (group_colors length)
    pub group_count: usize,
    /// Suppress matches inside string literals
    pub ignore_in_string: bool,
    /// Suppress matches inside comments
    pub ignore_in_comment: bool,
    /// Tooltip text: description or raw pattern
    pub label: String,
}

impl CompiledRule {
    /// Compile an enabled rule
    ///
    /// Fails only when the condition pattern is invalid; a broken
    /// content pattern silently becomes a literal matcher.
    pub fn compile(rule: &Rule) -> Result<Self> {
        let condition = match rule.condition.as_deref() {
            Some(c) if !c.trim().is_empty() => {
                let flags = Flags::for_condition(rule.condition_flags.as_deref());
                Some(flags.build(c).map_err(HiliteError::Condition)?)
            }
            _ => None,
        };

        let flags = Flags::parse(rule.flags.as_deref().unwrap_or(""));
        let matcher = ContentMatcher::compile(&rule.pattern, flags)?;

        Ok(Self {
            condition,
            matcher,
            group_count: rule.group_colors.len(),
            ignore_in_string: rule.ignore_in_string,
            ignore_in_comment: rule.ignore_in_comment,
            label: rule.label().to_string(),
        })
    }
}
