//! Error types for the highlight engine

use thiserror::Error;

/// Result type alias for highlight operations
pub type Result<T> = std::result::Result<T, HiliteError>;

/// Highlight engine error types
///
/// These only surface from rule-file loading and rule compilation.
/// The engine never propagates errors to its caller: a rule that
/// fails to compile is logged and skipped for the current pass.
#[derive(Error, Debug)]
pub enum HiliteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid rule file: {0}")]
    RuleFile(#[from] toml::de::Error),

    #[error("invalid condition pattern: {0}")]
    Condition(regex::Error),

    #[error("invalid pattern: {0}")]
    Pattern(regex::Error),
}
