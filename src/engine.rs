//! Highlight engine
//!
//! This module provides the `Engine` that owns the current rule set,
//! the compiled matchers, and the style-key registry, and runs the
//! full evaluation pass: condition check, match scan, context
//! filtering, and span application through the `StyleHost`.
//!
//! Evaluation is a pure function of (rule set, document text): a pass
//! always recomputes every span from scratch and atomically replaces
//! what the host shows per style key. There is no incremental update.

use log::{debug, warn};

use crate::compile::CompiledRule;
use crate::config::RuleSet;
use crate::context;
use crate::style::{Document, Span, StyleHost, StyleKey, StyleSpec};

/// The rule-evaluation engine
///
/// One instance per host session. All triggers run synchronously to
/// completion; the host is expected not to overlap calls.
pub struct Engine {
    ruleset: RuleSet,
    /// One entry per rule; `None` when the rule is disabled or its
    /// condition pattern failed to compile
    compiled: Vec<Option<CompiledRule>>,
    /// Style keys created with the host, in creation order
    keys: Vec<StyleKey>,
    /// Session-only toggle, not persisted with the configuration
    runtime_enabled: bool,
}

impl Engine {
    /// Create an engine with an empty rule set
    pub fn new() -> Self {
        Self {
            ruleset: RuleSet::default(),
            compiled: Vec::new(),
            keys: Vec::new(),
            runtime_enabled: true,
        }
    }

    /// Whether evaluation currently produces spans
    pub fn effective_enabled(&self) -> bool {
        self.ruleset.enabled && self.runtime_enabled
    }

    /// Replace the rule set: tear down every existing style key,
    /// recompile, register the new keys, then recompute spans
    pub fn on_configuration_changed(
        &mut self,
        ruleset: RuleSet,
        doc: &dyn Document,
        host: &mut dyn StyleHost,
    ) {
        self.rebuild_styles(ruleset, host);
        self.recompute(doc, host);
    }

    /// Recompute spans after a document edit; matchers are reused
    pub fn on_text_changed(&mut self, doc: &dyn Document, host: &mut dyn StyleHost) {
        self.recompute(doc, host);
    }

    /// Recompute spans after the host switched to another document
    pub fn on_active_context_changed(&mut self, doc: &dyn Document, host: &mut dyn StyleHost) {
        self.recompute(doc, host);
    }

    /// Flip the session-only enabled flag and recompute
    ///
    /// Returns the new effective enabled state so the host can report
    /// it.
    pub fn toggle(&mut self, doc: &dyn Document, host: &mut dyn StyleHost) -> bool {
        self.runtime_enabled = !self.runtime_enabled;
        self.recompute(doc, host);
        self.effective_enabled()
    }

    /// Dispose every style key and drop the rule set
    pub fn shutdown(&mut self, host: &mut dyn StyleHost) {
        for key in self.keys.drain(..) {
            host.dispose_style(key);
        }
        self.ruleset = RuleSet::default();
        self.compiled.clear();
    }

    /// Full teardown-then-rebuild of the style registry
    ///
    /// Old keys are disposed before any new ones are created, so the
    /// host never sees two generations at once.
    fn rebuild_styles(&mut self, ruleset: RuleSet, host: &mut dyn StyleHost) {
        for key in self.keys.drain(..) {
            host.dispose_style(key);
        }

        self.compiled = ruleset
            .rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                if !rule.enabled {
                    return None;
                }
                match CompiledRule::compile(rule) {
                    Ok(compiled) => Some(compiled),
                    Err(e) => {
                        warn!("rule {} skipped: {}", i + 1, e);
                        None
                    }
                }
            })
            .collect();

        for (i, rule) in ruleset.rules.iter().enumerate() {
            if !rule.enabled {
                continue;
            }
            let key = StyleKey::Rule(i);
            host.create_style(key, &StyleSpec::whole_match(rule));
            self.keys.push(key);
            for group in 0..rule.group_colors.len() {
                let key = StyleKey::Group { rule: i, group };
                host.create_style(key, &StyleSpec::group(rule, group));
                self.keys.push(key);
            }
        }

        self.ruleset = ruleset;
    }

    /// Run one full evaluation pass over the document
    fn recompute(&mut self, doc: &dyn Document, host: &mut dyn StyleHost) {
        if !self.effective_enabled() {
            // Clear everything without touching the matchers
            for &key in &self.keys {
                host.apply_spans(key, Vec::new());
            }
            return;
        }

        let text = doc.text();
        debug!("processing {} rules", self.ruleset.rules.len());

        for (i, rule) in self.ruleset.rules.iter().enumerate() {
            if !rule.enabled {
                // No keys exist for a disabled rule
                continue;
            }

            let Some(compiled) = self.compiled.get(i).and_then(|c| c.as_ref()) else {
                clear_rule(host, i, rule.group_colors.len());
                continue;
            };

            if let Some(condition) = &compiled.condition {
                if !condition.is_match(text) {
                    debug!("rule {}: condition not found", i + 1);
                    clear_rule(host, i, compiled.group_count);
                    continue;
                }
            }

            let group_mode = compiled.group_count > 0;
            // A group-decorated rule whose pattern has no capture
            // groups can never emit a span; skip the per-occurrence
            // group work in that case
            let collect_groups = group_mode && compiled.matcher.capture_count() > 1;
            let mut whole: Vec<Span> = Vec::new();
            let mut groups: Vec<Vec<Span>> = vec![Vec::new(); compiled.group_count];
            let mut match_count = 0usize;

            let mut at = 0;
            while at <= text.len() {
                let Some(caps) = compiled.matcher.find_from(text, at) else {
                    break;
                };
                let Some(m) = caps.get(0) else {
                    break;
                };
                let (start, end) = (m.start(), m.end());

                // Scanning resumes at the match end; an empty match
                // must still advance or the loop would never end
                at = if end > start {
                    end
                } else {
                    end + text[end..].chars().next().map_or(1, |c| c.len_utf8())
                };

                if compiled.ignore_in_string && context::inside_string(text, start) {
                    continue;
                }
                if compiled.ignore_in_comment && context::inside_comment(text, start) {
                    continue;
                }
                match_count += 1;

                if collect_groups {
                    let full = m.as_str();
                    for group in 0..compiled.group_count {
                        let Some(captured) = caps.get(group + 1).map(|c| c.as_str()) else {
                            continue;
                        };
                        if captured.is_empty() {
                            continue;
                        }
                        // Located by first occurrence within the
                        // match, not by the group's own offsets
                        let Some(offset) = full.find(captured) else {
                            continue;
                        };
                        let s = start + offset;
                        let e = s + captured.len();
                        groups[group].push(Span {
                            start: doc.position_at(s),
                            end: doc.position_at(e),
                            tooltip: format!(
                                "Rule {} (group {}): {}",
                                i + 1,
                                group + 1,
                                compiled.label
                            ),
                        });
                    }
                } else if !group_mode {
                    whole.push(Span {
                        start: doc.position_at(start),
                        end: doc.position_at(end),
                        tooltip: format!("Rule {}: {}", i + 1, compiled.label),
                    });
                }
            }

            debug!("rule {}: {} matches", i + 1, match_count);

            if group_mode {
                for (group, spans) in groups.into_iter().enumerate() {
                    host.apply_spans(StyleKey::Group { rule: i, group }, spans);
                }
                // Group-decorated rules never show a whole-match span
                host.apply_spans(StyleKey::Rule(i), Vec::new());
            } else {
                host.apply_spans(StyleKey::Rule(i), whole);
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Clear the whole-match key and every group key of one rule
fn clear_rule(host: &mut dyn StyleHost, rule: usize, group_count: usize) {
    host.apply_spans(StyleKey::Rule(rule), Vec::new());
    for group in 0..group_count {
        host.apply_spans(StyleKey::Group { rule, group }, Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rule;
    use crate::style::{Position, TextSnapshot};
    use std::collections::HashMap;

    /// What a host saw, in call order
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Created(StyleKey),
        Disposed(StyleKey),
        Applied(StyleKey, usize),
    }

    /// Test host recording every call and the latest span lists
    #[derive(Default)]
    struct RecordingHost {
        events: Vec<Event>,
        styles: HashMap<StyleKey, StyleSpec>,
        spans: HashMap<StyleKey, Vec<Span>>,
    }

    impl RecordingHost {
        fn spans_for(&self, key: StyleKey) -> &[Span] {
            self.spans.get(&key).map(|s| s.as_slice()).unwrap_or(&[])
        }
    }

    impl StyleHost for RecordingHost {
        fn create_style(&mut self, key: StyleKey, style: &StyleSpec) {
            self.events.push(Event::Created(key));
            self.styles.insert(key, style.clone());
        }

        fn dispose_style(&mut self, key: StyleKey) {
            self.events.push(Event::Disposed(key));
            self.styles.remove(&key);
            self.spans.remove(&key);
        }

        fn apply_spans(&mut self, key: StyleKey, spans: Vec<Span>) {
            self.events.push(Event::Applied(key, spans.len()));
            if self.styles.contains_key(&key) {
                self.spans.insert(key, spans);
            }
            // Unknown key: dropped, per the trait contract
        }
    }

    fn run(rules: Vec<Rule>, text: &str) -> (Engine, RecordingHost) {
        let mut engine = Engine::new();
        let mut host = RecordingHost::default();
        let doc = TextSnapshot::new(text);
        engine.on_configuration_changed(RuleSet::new(rules), &doc, &mut host);
        (engine, host)
    }

    #[test]
    fn test_whole_match_spans() {
        let (_, host) = run(vec![Rule::new("TODO")], "TODO x\nyy TODO");
        let spans = host.spans_for(StyleKey::Rule(0));
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].start, Position::new(0, 0));
        assert_eq!(spans[0].end, Position::new(0, 4));
        assert_eq!(spans[1].start, Position::new(1, 3));
        assert_eq!(spans[1].tooltip, "Rule 1: TODO");
    }

    #[test]
    fn test_evaluation_is_pure() {
        let rules = || {
            vec![
                Rule::new("TODO").ignore_strings(),
                Rule::new(r"(\w+)=(\w+)").with_group_colors(&["#1", "#2"]),
            ]
        };
        let text = "a=b TODO \"TODO\" c=d";
        let (_, first) = run(rules(), text);
        let (_, second) = run(rules(), text);
        assert_eq!(first.spans, second.spans);
    }

    #[test]
    fn test_blank_condition_always_evaluates() {
        let (_, host) = run(vec![Rule::new("TODO").with_condition("   ")], "TODO");
        assert_eq!(host.spans_for(StyleKey::Rule(0)).len(), 1);
    }

    #[test]
    fn test_unmatched_condition_yields_no_spans() {
        let rule = Rule::new(r"(TODO)")
            .with_condition("never_present")
            .with_group_colors(&["#1"]);
        let (_, host) = run(vec![rule], "TODO TODO");
        assert!(host.spans_for(StyleKey::Rule(0)).is_empty());
        assert!(host
            .spans_for(StyleKey::Group { rule: 0, group: 0 })
            .is_empty());
    }

    #[test]
    fn test_condition_is_case_insensitive_by_default() {
        let (_, host) = run(vec![Rule::new("x").with_condition("marker")], "MARKER x");
        assert_eq!(host.spans_for(StyleKey::Rule(0)).len(), 1);
    }

    #[test]
    fn test_invalid_condition_deactivates_only_that_rule() {
        let rules = vec![Rule::new("TODO").with_condition("("), Rule::new("TODO")];
        let (_, host) = run(rules, "TODO");
        assert!(host.spans_for(StyleKey::Rule(0)).is_empty());
        assert_eq!(host.spans_for(StyleKey::Rule(1)).len(), 1);
    }

    #[test]
    fn test_invalid_pattern_matches_literally() {
        // "fixme(" is not a valid regex; the fallback matches it as text
        let (_, host) = run(vec![Rule::new("fixme(")], "fixme(x) and fixme(y)");
        assert_eq!(host.spans_for(StyleKey::Rule(0)).len(), 2);
    }

    #[test]
    fn test_group_rules_emit_group_spans_only() {
        let rule = Rule::new(r"(\w+)=(\w+)").with_group_colors(&["#1", "#2"]);
        let (_, host) = run(vec![rule], "a=b cc=dd");
        assert!(host.spans_for(StyleKey::Rule(0)).is_empty());

        let first = host.spans_for(StyleKey::Group { rule: 0, group: 0 });
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].start, Position::new(0, 0));
        assert_eq!(first[0].end, Position::new(0, 1));
        assert_eq!(first[1].start, Position::new(0, 4));
        assert_eq!(first[1].end, Position::new(0, 6));
        assert_eq!(first[0].tooltip, r"Rule 1 (group 1): (\w+)=(\w+)");

        let second = host.spans_for(StyleKey::Group { rule: 0, group: 1 });
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].start, Position::new(0, 2));
        assert_eq!(second[1].end, Position::new(0, 9));
    }

    #[test]
    fn test_group_rule_without_captures_emits_nothing() {
        // Group styling configured but the pattern has no groups:
        // no whole-match spans either
        let rule = Rule::new("TODO").with_group_colors(&["#1"]);
        let (_, host) = run(vec![rule], "TODO TODO");
        assert!(host.spans_for(StyleKey::Rule(0)).is_empty());
        assert!(host
            .spans_for(StyleKey::Group { rule: 0, group: 0 })
            .is_empty());
    }

    #[test]
    fn test_non_participating_group_contributes_no_span() {
        let rule = Rule::new(r"x(a)?(b)").with_group_colors(&["#1", "#2"]);
        let (_, host) = run(vec![rule], "xb");
        assert!(host
            .spans_for(StyleKey::Group { rule: 0, group: 0 })
            .is_empty());
        assert_eq!(
            host.spans_for(StyleKey::Group { rule: 0, group: 1 }).len(),
            1
        );
    }

    #[test]
    fn test_unconfigured_group_is_not_highlighted() {
        // Two capture groups, one configured style
        let rule = Rule::new(r"(\w+)=(\w+)").with_group_colors(&["#1"]);
        let (_, host) = run(vec![rule], "a=b");
        assert_eq!(
            host.spans_for(StyleKey::Group { rule: 0, group: 0 }).len(),
            1
        );
        assert!(host.spans.get(&StyleKey::Group { rule: 0, group: 1 }).is_none());
    }

    #[test]
    fn test_ignore_in_string() {
        let rule = Rule::new("TODO").ignore_strings();
        let text = r#"const s = "TODO: x"; TODO: y"#;
        let (_, host) = run(vec![rule], text);
        let spans = host.spans_for(StyleKey::Rule(0));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, Position::new(0, 21));
    }

    #[test]
    fn test_ignore_in_comment() {
        let rule = Rule::new("TODO").ignore_comments();
        let (_, host) = run(vec![rule], "// TODO here\nTODO real");
        let spans = host.spans_for(StyleKey::Rule(0));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, Position::new(1, 0));
    }

    #[test]
    fn test_context_flags_off_by_default() {
        let (_, host) = run(vec![Rule::new("TODO")], "// TODO\n\"TODO\"");
        assert_eq!(host.spans_for(StyleKey::Rule(0)).len(), 2);
    }

    #[test]
    fn test_empty_matches_make_forward_progress() {
        // `x*` matches the empty string at every position
        let (_, host) = run(vec![Rule::new("x*")], "axa");
        let spans = host.spans_for(StyleKey::Rule(0));
        assert!(!spans.is_empty());
        // One of them is the real "x"
        assert!(spans
            .iter()
            .any(|s| s.start == Position::new(0, 1) && s.end == Position::new(0, 2)));
    }

    #[test]
    fn test_toggle_clears_and_restores() {
        let (mut engine, mut host) = run(vec![Rule::new("TODO")], "TODO");
        let doc = TextSnapshot::new("TODO");
        assert_eq!(host.spans_for(StyleKey::Rule(0)).len(), 1);

        host.events.clear();
        assert!(!engine.toggle(&doc, &mut host));
        assert!(host.spans_for(StyleKey::Rule(0)).is_empty());
        // Toggling only re-applies spans; styles stay untouched
        assert!(host
            .events
            .iter()
            .all(|e| matches!(e, Event::Applied(..))));

        assert!(engine.toggle(&doc, &mut host));
        assert_eq!(host.spans_for(StyleKey::Rule(0)).len(), 1);
    }

    #[test]
    fn test_global_disable_clears_every_key() {
        let rules = vec![
            Rule::new("TODO"),
            Rule::new(r"(a)").with_group_colors(&["#1"]),
        ];
        let (mut engine, mut host) = run(rules.clone(), "TODO a");
        assert_eq!(host.spans_for(StyleKey::Rule(0)).len(), 1);

        let mut disabled = RuleSet::new(rules);
        disabled.enabled = false;
        let doc = TextSnapshot::new("TODO a");
        engine.on_configuration_changed(disabled, &doc, &mut host);

        for key in [
            StyleKey::Rule(0),
            StyleKey::Rule(1),
            StyleKey::Group { rule: 1, group: 0 },
        ] {
            assert!(host.spans_for(key).is_empty(), "{} not cleared", key);
        }
    }

    #[test]
    fn test_disabling_one_rule_clears_only_its_spans() {
        // Both rules visible first, then one is turned off
        let text = "TODO TODO FIXME";
        let (mut engine, mut host) = run(vec![Rule::new("TODO"), Rule::new("FIXME")], text);
        assert_eq!(host.spans_for(StyleKey::Rule(0)).len(), 2);
        assert_eq!(host.spans_for(StyleKey::Rule(1)).len(), 1);

        let doc = TextSnapshot::new(text);
        let reconfigured = RuleSet::new(vec![Rule::new("TODO").disabled(), Rule::new("FIXME")]);
        engine.on_configuration_changed(reconfigured, &doc, &mut host);

        assert!(host.spans_for(StyleKey::Rule(0)).is_empty());
        assert_eq!(host.spans_for(StyleKey::Rule(1)).len(), 1);
    }

    #[test]
    fn test_disabled_rule_gets_no_style_and_no_spans() {
        let rules = vec![Rule::new("TODO").disabled(), Rule::new("TODO")];
        let (_, host) = run(rules, "TODO");
        assert!(!host.styles.contains_key(&StyleKey::Rule(0)));
        assert!(host.spans_for(StyleKey::Rule(0)).is_empty());
        assert_eq!(host.spans_for(StyleKey::Rule(1)).len(), 1);
    }

    #[test]
    fn test_configuration_change_disposes_before_creating() {
        let (mut engine, mut host) = run(
            vec![Rule::new("a").with_group_colors(&["#1"])],
            "a",
        );
        host.events.clear();

        let doc = TextSnapshot::new("b");
        engine.on_configuration_changed(RuleSet::new(vec![Rule::new("b")]), &doc, &mut host);

        let first_create = host
            .events
            .iter()
            .position(|e| matches!(e, Event::Created(_)))
            .unwrap();
        let last_dispose = host
            .events
            .iter()
            .rposition(|e| matches!(e, Event::Disposed(_)))
            .unwrap();
        assert!(last_dispose < first_create);

        // Old keys are gone, new key present
        assert!(host.events.contains(&Event::Disposed(StyleKey::Rule(0))));
        assert!(host
            .events
            .contains(&Event::Disposed(StyleKey::Group { rule: 0, group: 0 })));
        assert!(host.styles.contains_key(&StyleKey::Rule(0)));
        assert!(!host
            .styles
            .contains_key(&StyleKey::Group { rule: 0, group: 0 }));
    }

    #[test]
    fn test_styles_created_before_any_span_application() {
        let (_, host) = run(vec![Rule::new("a")], "a");
        let first_apply = host
            .events
            .iter()
            .position(|e| matches!(e, Event::Applied(..)))
            .unwrap();
        let last_create = host
            .events
            .iter()
            .rposition(|e| matches!(e, Event::Created(_)))
            .unwrap();
        assert!(last_create < first_apply);
    }

    #[test]
    fn test_text_change_reuses_styles() {
        let (mut engine, mut host) = run(vec![Rule::new("TODO")], "TODO");
        host.events.clear();

        let doc = TextSnapshot::new("x TODO y TODO");
        engine.on_text_changed(&doc, &mut host);

        assert!(host
            .events
            .iter()
            .all(|e| matches!(e, Event::Applied(..))));
        assert_eq!(host.spans_for(StyleKey::Rule(0)).len(), 2);
    }

    #[test]
    fn test_shutdown_disposes_all_keys() {
        let (mut engine, mut host) = run(
            vec![Rule::new(r"(a)").with_group_colors(&["#1"])],
            "a",
        );
        engine.shutdown(&mut host);
        assert!(host.styles.is_empty());
    }

    #[test]
    fn test_tooltip_prefers_description() {
        let (_, host) = run(
            vec![Rule::new("TODO").with_description("open tasks")],
            "TODO",
        );
        assert_eq!(
            host.spans_for(StyleKey::Rule(0))[0].tooltip,
            "Rule 1: open tasks"
        );
    }

    #[test]
    fn test_multiline_flag_reaches_matcher() {
        let (_, host) = run(vec![Rule::new("^fn").with_flags("m")], "x\nfn main");
        let spans = host.spans_for(StyleKey::Rule(0));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, Position::new(1, 0));
    }
}
