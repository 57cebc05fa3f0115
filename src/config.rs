//! Declarative highlight rules
//!
//! Rules are plain data: a content pattern, an optional gating
//! condition, styling, and a couple of behavior flags. They arrive
//! either from a host settings store or from a TOML rule file
//! (~/.hilite.toml). Field names deserialize in camelCase so rule
//! files match the original settings schema.
//!
//! Example:
//! ```text
//! enabled = true
//!
//! [[rules]]
//! pattern = "TODO|FIXME"
//! color = "#ff8800"
//! ignoreInString = true
//! description = "open tasks"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

use crate::error::Result;

fn default_true() -> bool {
    true
}

/// A single declarative highlight rule
///
/// `pattern` is the only required field. Everything else defaults to
/// "off": no condition, no group styling, enabled, no context
/// filtering.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Gating pattern; the rule only applies when this matches
    /// anywhere in the document. Blank or absent means always.
    #[serde(default)]
    pub condition: Option<String>,
    /// Content pattern whose occurrences are highlighted. Falls back
    /// to literal matching when it is not a valid regex.
    pub pattern: String,
    /// Regex flag letters for the content pattern (e.g. "im")
    #[serde(default)]
    pub flags: Option<String>,
    /// Regex flag letters for the condition (defaults to "i")
    #[serde(default)]
    pub condition_flags: Option<String>,
    /// Per-capture-group foreground colors; index 0 is group 1
    #[serde(default)]
    pub group_colors: Vec<String>,
    /// Per-capture-group background colors, aligned with group_colors
    #[serde(default)]
    pub group_backgrounds: Vec<String>,
    /// Per-capture-group text decorations, aligned with group_colors
    #[serde(default)]
    pub group_text_decorations: Vec<String>,
    /// Whole-match foreground color
    #[serde(default)]
    pub color: Option<String>,
    /// Whole-match background color
    #[serde(default)]
    pub background_color: Option<String>,
    /// Whole-match border color
    #[serde(default)]
    pub border_color: Option<String>,
    /// Whole-match text decoration (underline, line-through, ...)
    #[serde(default)]
    pub text_decoration: Option<String>,
    /// Whether this rule participates in evaluation
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Suppress matches that fall inside string literals
    #[serde(default)]
    pub ignore_in_string: bool,
    /// Suppress matches that fall inside comments
    #[serde(default)]
    pub ignore_in_comment: bool,
    /// Human-readable description, shown in tooltips
    #[serde(default)]
    pub description: Option<String>,
}

impl Rule {
    /// Create a rule matching a pattern, with everything else default
    pub fn new(pattern: &str) -> Self {
        Self {
            condition: None,
            pattern: pattern.to_string(),
            flags: None,
            condition_flags: None,
            group_colors: Vec::new(),
            group_backgrounds: Vec::new(),
            group_text_decorations: Vec::new(),
            color: None,
            background_color: None,
            border_color: None,
            text_decoration: None,
            enabled: true,
            ignore_in_string: false,
            ignore_in_comment: false,
            description: None,
        }
    }

    /// Builder: set the gating condition pattern
    pub fn with_condition(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }

    /// Builder: set content pattern flags
    pub fn with_flags(mut self, flags: &str) -> Self {
        self.flags = Some(flags.to_string());
        self
    }

    /// Builder: set per-group colors
    pub fn with_group_colors(mut self, colors: &[&str]) -> Self {
        self.group_colors = colors.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Builder: set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Builder: disable the rule
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Builder: suppress matches inside string literals
    pub fn ignore_strings(mut self) -> Self {
        self.ignore_in_string = true;
        self
    }

    /// Builder: suppress matches inside comments
    pub fn ignore_comments(mut self) -> Self {
        self.ignore_in_comment = true;
        self
    }

    /// Text identifying this rule in tooltips: description if set,
    /// otherwise the raw pattern
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.pattern)
    }
}

/// An ordered set of rules plus the global enable flag
///
/// Rule order only determines style-key identity (`rule-0`,
/// `rule-1`, ...); all matching rules apply independently.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            enabled: true,
        }
    }
}

impl RuleSet {
    /// Create an enabled rule set from a list of rules
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            enabled: true,
        }
    }

    /// Get the rule file path (~/.hilite.toml)
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            std::env::var("USERPROFILE")
                .ok()
                .map(|home| PathBuf::from(home).join(".hilite.toml"))
        }

        #[cfg(not(windows))]
        {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".hilite.toml"))
        }
    }

    /// Load a rule set from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load the default rule file, falling back to an empty set
    ///
    /// A missing file is normal; an unreadable or malformed file is
    /// logged and treated as empty.
    pub fn load_default() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(set) => set,
            Err(e) => {
                warn!("failed to load {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
