//! Rule Engine
//!
//! Applies automation rules to a generated project in place.
//! Rules run in list order; each enabled rule tests every element of every
//! track independently and applies its actions to the elements that match.
//!
//! Rules that change a field their own conditions test are not idempotent:
//! running them twice may apply them twice.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::field::{contains, element_view, loose_equals, resolve_path, to_number, to_text};
use super::models::{AutomationRule, ConditionOperator, RuleAction, RuleActionType, RuleCondition, RuleEffect};
use crate::core::template::{GeneratedContent, GeneratedElement, GeneratedProject};
use crate::core::{CoreError, CoreResult};

/// Outcome of one `apply_rules` call
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReport {
    /// Enabled rules that were evaluated
    pub rules_evaluated: usize,
    /// Disabled rules (by id)
    pub rules_skipped: Vec<String>,
    /// Number of (rule, element) pairs whose conditions matched
    pub matches: usize,
    /// Actions applied, in order
    pub effects: Vec<RuleEffect>,
    /// Action types that were ignored
    pub ignored_actions: Vec<String>,
}

impl RuleReport {
    fn ignore(&mut self, action: &RuleActionType) {
        let name = action.to_string();
        if !self.ignored_actions.contains(&name) {
            self.ignored_actions.push(name);
        }
    }
}

/// Evaluates AND-combined conditions against an element view.
///
/// An empty condition list matches every element.
pub fn evaluate_conditions(
    rule_id: &str,
    conditions: &[RuleCondition],
    view: &Value,
) -> CoreResult<bool> {
    for condition in conditions {
        if !evaluate_condition(rule_id, condition, view)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn evaluate_condition(rule_id: &str, condition: &RuleCondition, view: &Value) -> CoreResult<bool> {
    let actual = resolve_path(view, &condition.field);
    let actual = actual.as_ref();
    let expected = &condition.value;

    let result = match &condition.operator {
        ConditionOperator::Equals => loose_equals(actual, expected),
        ConditionOperator::NotEquals => !loose_equals(actual, expected),
        ConditionOperator::GreaterThan => to_number(actual) > to_number(Some(expected)),
        ConditionOperator::LessThan => to_number(actual) < to_number(Some(expected)),
        ConditionOperator::Contains => contains(actual, expected),
        ConditionOperator::Other(operator) => {
            return Err(CoreError::UnknownRuleOperator {
                rule_id: rule_id.to_string(),
                operator: operator.clone(),
            })
        }
    };
    Ok(result)
}

/// Applies rules to every element of the project.
///
/// All enabled rules are checked for unknown operators before anything is
/// mutated, so an `UnknownRuleOperator` error leaves the project untouched.
/// Applied actions are appended to `project.metadata.rule_effects`.
pub fn apply_rules(
    project: &mut GeneratedProject,
    rules: &[AutomationRule],
) -> CoreResult<RuleReport> {
    for rule in rules.iter().filter(|r| r.enabled) {
        if let Some(operator) = rule.unknown_operators().next() {
            return Err(CoreError::UnknownRuleOperator {
                rule_id: rule.id.clone(),
                operator: operator.to_string(),
            });
        }
    }

    let mut report = RuleReport::default();

    for rule in rules {
        if !rule.enabled {
            debug!("Skipping disabled rule {} ({})", rule.name, rule.id);
            report.rules_skipped.push(rule.id.clone());
            continue;
        }
        report.rules_evaluated += 1;

        for track in &mut project.tracks {
            for index in 0..track.elements.len() {
                let view = element_view(track, &track.elements[index]);
                if !evaluate_conditions(&rule.id, &rule.conditions, &view)? {
                    continue;
                }
                report.matches += 1;

                let element = &mut track.elements[index];
                for action in &rule.actions {
                    if apply_action(element, action, &rule.name, &mut report) {
                        report.effects.push(RuleEffect {
                            rule_id: rule.id.clone(),
                            rule_name: rule.name.clone(),
                            element_id: element.id.clone(),
                            action: action.action_type.clone(),
                            target: action.target.clone(),
                        });
                    }
                }
            }
        }
    }

    project.recompute_duration();
    project
        .metadata
        .rule_effects
        .extend(report.effects.iter().cloned());

    info!(
        "Applied {} rules ({} skipped): {} matches, {} effects",
        report.rules_evaluated,
        report.rules_skipped.len(),
        report.matches,
        report.effects.len()
    );
    Ok(report)
}

/// Executes one action. Returns true if the element was changed.
fn apply_action(
    element: &mut GeneratedElement,
    action: &RuleAction,
    rule_name: &str,
    report: &mut RuleReport,
) -> bool {
    match &action.action_type {
        RuleActionType::SetStyle => {
            let (Some(property), Some(value)) = (&action.target, &action.value) else {
                warn!("Rule '{}': set_style needs a target and a value", rule_name);
                return false;
            };
            let mut style = element.style.clone().unwrap_or_default();
            let result = style.set_property(property, value.clone()).or_else(|e| {
                match coerce_scalar(value) {
                    Some(coerced) => style.set_property(property, coerced),
                    None => Err(e),
                }
            });
            match result {
                Ok(()) => {
                    element.style = Some(style);
                    true
                }
                Err(e) => {
                    warn!(
                        "Rule '{}' failed to set style '{}' on {}: {}",
                        rule_name, property, element.id, e
                    );
                    false
                }
            }
        }
        RuleActionType::SetText => {
            if !matches!(element.content, GeneratedContent::Text { .. }) {
                debug!(
                    "Rule '{}': set_text ignored on non-text element {}",
                    rule_name, element.id
                );
                return false;
            }
            element.content = GeneratedContent::text(to_text(action.value.as_ref()));
            true
        }
        RuleActionType::SetHidden => {
            element.hidden = action.value.as_ref().map_or(true, is_truthy);
            true
        }
        RuleActionType::SetStartTime => match finite_number(action.value.as_ref()) {
            Some(start) => {
                element.start_time = start.max(0.0);
                element.timing_provisional = false;
                true
            }
            None => {
                warn!("Rule '{}': set_start_time needs a number", rule_name);
                false
            }
        },
        RuleActionType::SetDuration => match finite_number(action.value.as_ref()) {
            Some(duration) => {
                element.duration = duration.max(0.0);
                true
            }
            None => {
                warn!("Rule '{}': set_duration needs a number", rule_name);
                false
            }
        },
        RuleActionType::Other(name) => {
            debug!("Rule '{}': ignoring unsupported action '{}'", rule_name, name);
            report.ignore(&action.action_type);
            false
        }
    }
}

/// Loose reading of a string as a bool or number, for typed style properties
fn coerce_scalar(value: &Value) -> Option<Value> {
    let Value::String(s) = value else {
        return None;
    };
    match s.trim() {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        _ => {}
    }
    let n = to_number(Some(value));
    if !n.is_finite() {
        return None;
    }
    serde_json::Number::from_f64(n).map(Value::Number)
}

fn finite_number(value: Option<&Value>) -> Option<f64> {
    value.map(|v| to_number(Some(v))).filter(|n| n.is_finite())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automation::RuleCondition;
    use crate::core::template::{
        CanvasSettings, GeneratedTrack, GenerationMetadata, TrackRole, TrackType,
    };
    use serde_json::json;

    fn text_element(id: &str, text: &str, start: f64) -> GeneratedElement {
        GeneratedElement {
            id: id.to_string(),
            name: id.to_string(),
            start_time: start,
            duration: 2.0,
            content: GeneratedContent::text(text),
            style: None,
            caption_style_id: None,
            position: None,
            hidden: false,
            muted: false,
            timing_provisional: false,
        }
    }

    fn project(elements: Vec<GeneratedElement>) -> GeneratedProject {
        GeneratedProject {
            id: "p".to_string(),
            name: "Test".to_string(),
            canvas: CanvasSettings::default(),
            tracks: vec![GeneratedTrack {
                id: "t".to_string(),
                name: "Titles".to_string(),
                track_type: TrackType::Text,
                role: TrackRole::Title,
                elements,
                muted: false,
                is_main: false,
                volume: 1.0,
            }],
            duration: 0.0,
            metadata: GenerationMetadata {
                template_id: "tpl".to_string(),
                template_name: "Template".to_string(),
                generated_at: chrono::Utc::now(),
                placeholders_used: Vec::new(),
                defaults_applied: Vec::new(),
                element_id_map: Default::default(),
                rule_effects: Vec::new(),
            },
        }
    }

    #[test]
    fn test_conditions_are_and_combined() {
        let mut project = project(vec![
            text_element("short", "Hi", 0.0),
            text_element("long-early", "A much longer headline", 0.0),
            text_element("long-late", "Another long headline", 10.0),
        ]);
        let rule = AutomationRule::new("Shrink early long titles")
            .with_condition(RuleCondition::new(
                "textContent.length",
                ConditionOperator::GreaterThan,
                10,
            ))
            .with_condition(RuleCondition::new(
                "startTime",
                ConditionOperator::LessThan,
                5,
            ))
            .with_action(RuleAction::set_style("fontSize", 32));

        let report = apply_rules(&mut project, &[rule]).unwrap();

        assert_eq!(report.matches, 1);
        let sizes: Vec<f64> = project.tracks[0]
            .elements
            .iter()
            .map(|e| e.style.as_ref().map_or(48.0, |s| s.font_size))
            .collect();
        assert_eq!(sizes, vec![48.0, 32.0, 48.0]);
        assert_eq!(project.metadata.rule_effects.len(), 1);
        assert_eq!(project.metadata.rule_effects[0].element_id, "long-early");
    }

    #[test]
    fn test_set_style_coerces_string_values() {
        let mut project = project(vec![text_element("a", "Hello", 0.0)]);
        let rules = vec![
            AutomationRule::new("Size from CSV").with_action(RuleAction::set_style("fontSize", "32")),
            AutomationRule::new("Bold from CSV").with_action(RuleAction::set_style("bold", "true")),
            AutomationRule::new("Color").with_action(RuleAction::set_style("color", "#FF0000")),
        ];

        let report = apply_rules(&mut project, &rules).unwrap();

        let style = project.tracks[0].elements[0].style.as_ref().unwrap();
        assert_eq!(style.font_size, 32.0);
        assert!(style.bold);
        assert_eq!(style.color, "#FF0000");
        assert_eq!(report.effects.len(), 3);
    }

    #[test]
    fn test_set_style_rejects_unusable_value() {
        let mut project = project(vec![text_element("a", "Hello", 0.0)]);
        let rule = AutomationRule::new("Huge").with_action(RuleAction::set_style("fontSize", "huge"));

        let report = apply_rules(&mut project, &[rule]).unwrap();
        assert!(report.effects.is_empty());
        assert!(project.tracks[0].elements[0].style.is_none());
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let mut project = project(vec![text_element("a", "Hello", 0.0)]);
        let rule = AutomationRule::new("Hide everything")
            .with_action(RuleAction::new(RuleActionType::SetHidden, true))
            .disabled();

        let report = apply_rules(&mut project, &[rule]).unwrap();
        assert_eq!(report.rules_evaluated, 0);
        assert_eq!(report.rules_skipped.len(), 1);
        assert!(!project.tracks[0].elements[0].hidden);
    }

    #[test]
    fn test_unknown_operator_fails_without_mutation() {
        let mut project = project(vec![text_element("a", "Hello", 0.0)]);
        let good = AutomationRule::new("Hide")
            .with_action(RuleAction::new(RuleActionType::SetHidden, true));
        let bad = AutomationRule::new("Broken").with_condition(RuleCondition::new(
            "duration",
            ConditionOperator::from("between".to_string()),
            json!([1, 2]),
        ));

        let err = apply_rules(&mut project, &[good, bad]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnknownRuleOperator { ref operator, .. } if operator == "between"
        ));
        assert!(!project.tracks[0].elements[0].hidden);
    }

    #[test]
    fn test_unknown_action_is_ignored() {
        let mut project = project(vec![text_element("a", "Hello", 0.0)]);
        let rule = AutomationRule::new("Future").with_action(RuleAction::new(
            RuleActionType::from("add_transition".to_string()),
            "fade",
        ));

        let report = apply_rules(&mut project, &[rule]).unwrap();
        assert_eq!(report.matches, 1);
        assert!(report.effects.is_empty());
        assert_eq!(report.ignored_actions, vec!["add_transition".to_string()]);
    }

    #[test]
    fn test_set_start_time_settles_provisional_timing() {
        let mut element = text_element("dyn", "Later", 0.0);
        element.timing_provisional = true;
        let mut project = project(vec![element]);
        let rule = AutomationRule::new("Place dynamic")
            .with_condition(RuleCondition::new(
                "timingProvisional",
                ConditionOperator::Equals,
                true,
            ))
            .with_action(RuleAction::new(RuleActionType::SetStartTime, 4.0));

        apply_rules(&mut project, &[rule]).unwrap();

        let element = &project.tracks[0].elements[0];
        assert_eq!(element.start_time, 4.0);
        assert!(!element.timing_provisional);
        assert_eq!(project.duration, 6.0);
    }

    #[test]
    fn test_track_role_and_text_actions() {
        let mut project = project(vec![text_element("a", "draft", 0.0)]);
        let rule = AutomationRule::new("Finalize titles")
            .with_condition(RuleCondition::new(
                "trackRole",
                ConditionOperator::from("equals".to_string()),
                "title",
            ))
            .with_condition(RuleCondition::new(
                "textContent",
                ConditionOperator::Contains,
                "raf",
            ))
            .with_action(RuleAction::new(RuleActionType::SetText, "Final"));

        apply_rules(&mut project, &[rule]).unwrap();
        assert_eq!(
            project.tracks[0].elements[0].content.as_text(),
            Some("Final")
        );
    }
}
