//! hilite - rule-based regex highlight engine
//!
//! Evaluates user-configured highlight rules against a document
//! snapshot and produces the span lists a host editor should render.
//! The host side (settings storage, rendering, lifecycle events) is
//! abstracted behind the [`Document`] and [`StyleHost`] traits; the
//! engine itself is a pure function of rule set and text.
//!
//! ```
//! use hilite::{Engine, Rule, RuleSet, TextSnapshot};
//! # use hilite::{Span, StyleHost, StyleKey, StyleSpec};
//! # #[derive(Default)]
//! # struct NullHost;
//! # impl StyleHost for NullHost {
//! #     fn create_style(&mut self, _: StyleKey, _: &StyleSpec) {}
//! #     fn dispose_style(&mut self, _: StyleKey) {}
//! #     fn apply_spans(&mut self, _: StyleKey, _: Vec<Span>) {}
//! # }
//!
//! let mut engine = Engine::new();
//! let mut host = NullHost::default();
//! let doc = TextSnapshot::new("// TODO: ship it");
//! let rules = RuleSet::new(vec![Rule::new("TODO")]);
//! engine.on_configuration_changed(rules, &doc, &mut host);
//! ```

mod compile;
mod config;
mod context;
mod engine;
mod error;
mod style;

pub use config::{Rule, RuleSet};
pub use engine::Engine;
pub use error::{HiliteError, Result};
pub use style::{Document, Position, Span, StyleHost, StyleKey, StyleSpec, TextSnapshot};
