//! Styles, spans, and the host boundary
//!
//! This module provides the types exchanged with the host editor:
//! visual style descriptors, stable style keys, highlight spans, and
//! the `Document`/`StyleHost` traits the engine reads from and writes
//! to. The engine never talks to an editor directly.

use std::fmt;

use crate::config::Rule;

/// Visual style descriptor requested from the host
///
/// Mirrors the renderer-facing fields only; how they are realized
/// (terminal attributes, CSS, decoration types) is the host's concern.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleSpec {
    /// Foreground color
    pub color: Option<String>,
    /// Background color
    pub background_color: Option<String>,
    /// Border shorthand (e.g. "1px solid #ff0000")
    pub border: Option<String>,
    /// Text decoration (underline, line-through, ...)
    pub text_decoration: Option<String>,
}

/// Treat empty and whitespace-only settings as absent
fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

impl StyleSpec {
    /// Build the whole-match style for a rule
    ///
    /// Foreground defaults to `#0066ff`. A border is only synthesized
    /// when the rule gives a real border color; "transparent" counts
    /// as none.
    pub fn whole_match(rule: &Rule) -> Self {
        let border = non_blank(rule.border_color.as_ref())
            .filter(|c| c != "transparent")
            .map(|c| format!("1px solid {}", c));
        Self {
            color: Some(
                non_blank(rule.color.as_ref()).unwrap_or_else(|| "#0066ff".to_string()),
            ),
            background_color: non_blank(rule.background_color.as_ref()),
            border,
            text_decoration: non_blank(rule.text_decoration.as_ref()),
        }
    }

    /// Build the style for capture group `group` (0-based array index)
    pub fn group(rule: &Rule, group: usize) -> Self {
        Self {
            color: rule.group_colors.get(group).cloned(),
            background_color: non_blank(rule.group_backgrounds.get(group)),
            border: None,
            text_decoration: non_blank(rule.group_text_decorations.get(group)),
        }
    }
}

/// Stable identity binding a rule (or rule+group) to its style
///
/// Keys render as `rule-<i>` and `rule-<i>-group-<g>` and stay stable
/// across passes for the same rule set, so the host can diff span
/// lists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StyleKey {
    /// Whole-match style for rule `i`
    Rule(usize),
    /// Style for capture group `group` (0-based) of rule `rule`
    Group { rule: usize, group: usize },
}

impl fmt::Display for StyleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleKey::Rule(i) => write!(f, "rule-{}", i),
            StyleKey::Group { rule, group } => write!(f, "rule-{}-group-{}", rule, group),
        }
    }
}

/// A line/column position in a document (both 0-based)
///
/// Columns count bytes from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Create a new position
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A highlighted range with its tooltip text
///
/// Spans are created fresh on every evaluation pass and never
/// mutated; the full list for a style key replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Start position (inclusive)
    pub start: Position,
    /// End position (exclusive)
    pub end: Position,
    /// Hover text for this span
    pub tooltip: String,
}

/// Read-only view of the document being highlighted
pub trait Document {
    /// Full document text snapshot
    fn text(&self) -> &str;

    /// Convert a byte offset into a line/column position
    fn position_at(&self, offset: usize) -> Position;
}

/// Plain-string `Document` with precomputed line starts
pub struct TextSnapshot {
    text: String,
    line_starts: Vec<usize>,
}

impl TextSnapshot {
    /// Create a snapshot from document text
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { text, line_starts }
    }
}

impl Document for TextSnapshot {
    fn text(&self) -> &str {
        &self.text
    }

    fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Position::new(line, offset - self.line_starts[line])
    }
}

/// Sink for style lifecycle and span application
///
/// Implemented by the host renderer. Applying spans to a key that was
/// never created (or already disposed) must be a no-op, not an error.
pub trait StyleHost {
    /// Register a visual style for a key
    fn create_style(&mut self, key: StyleKey, style: &StyleSpec);

    /// Release the style for a key
    fn dispose_style(&mut self, key: StyleKey);

    /// Replace the full span list shown for a key; an empty list
    /// clears all highlights for the key
    fn apply_spans(&mut self, key: StyleKey, spans: Vec<Span>);
}
