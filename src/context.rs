//! Lexical context heuristics
//!
//! Decides whether a match position falls inside a string literal or
//! a comment, using prefix scans over the document text. This is a
//! deliberate approximation, not a lexer: unbalanced quotes elsewhere
//! in the file can mis-classify a position, and that behavior is kept
//! as-is. Cost is O(document length) per queried position.

/// Quote characters recognized by the string heuristic
const QUOTES: [char; 3] = ['"', '\'', '`'];

/// Single-line comment marker
const LINE_COMMENT: &str = "//";

/// Block comment delimiters
const BLOCK_OPEN: &str = "/*";
const BLOCK_CLOSE: &str = "*/";

/// Check whether a byte offset lies inside a string literal
///
/// For each quote kind, counts unescaped occurrences strictly before
/// `offset`; an odd count for any one kind means the position is
/// inside a string of that kind. Quote kinds are counted
/// independently, without tracking nesting across kinds.
pub fn inside_string(text: &str, offset: usize) -> bool {
    let prefix = &text[..offset];
    for quote in QUOTES {
        let mut count = 0usize;
        let mut prev = None;
        for c in prefix.chars() {
            if c == quote && prev != Some('\\') {
                count += 1;
            }
            prev = Some(c);
        }
        if count % 2 == 1 {
            return true;
        }
    }
    false
}

/// Check whether a byte offset lies inside a comment
///
/// Single-line: a `//` anywhere between the start of the line and the
/// offset. Block: the nearest `/*` before the offset with no `*/`
/// between it and the offset.
pub fn inside_comment(text: &str, offset: usize) -> bool {
    let prefix = &text[..offset];

    let line_start = prefix.rfind('\n').map_or(0, |i| i + 1);
    if prefix[line_start..].contains(LINE_COMMENT) {
        return true;
    }

    if let Some(open) = prefix.rfind(BLOCK_OPEN) {
        if !prefix[open + BLOCK_OPEN.len()..].contains(BLOCK_CLOSE) {
            return true;
        }
    }

    false
}
