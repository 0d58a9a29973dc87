//! Automation Rule Models
//!
//! Rules are stored inside templates, so operators and action types are kept
//! as open string enums: unknown names survive a load/save round trip and are
//! only rejected (operators) or ignored (actions) when a rule runs.

use serde::{Deserialize, Serialize};

use crate::core::{new_id, ElementId, RuleId};

/// Comparison operator of a rule condition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    /// Operator name this library does not understand
    Other(String),
}

impl From<String> for ConditionOperator {
    fn from(value: String) -> Self {
        match normalize_name(&value).as_str() {
            "equals" => ConditionOperator::Equals,
            "not_equals" => ConditionOperator::NotEquals,
            "greater_than" => ConditionOperator::GreaterThan,
            "less_than" => ConditionOperator::LessThan,
            "contains" => ConditionOperator::Contains,
            _ => ConditionOperator::Other(value),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(value: ConditionOperator) -> Self {
        match value {
            ConditionOperator::Equals => "equals".to_string(),
            ConditionOperator::NotEquals => "not_equals".to_string(),
            ConditionOperator::GreaterThan => "greater_than".to_string(),
            ConditionOperator::LessThan => "less_than".to_string(),
            ConditionOperator::Contains => "contains".to_string(),
            ConditionOperator::Other(name) => name,
        }
    }
}

impl ConditionOperator {
    pub fn is_known(&self) -> bool {
        !matches!(self, ConditionOperator::Other(_))
    }
}

/// Action kind of a rule action
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleActionType {
    /// Write one text style property (`target` = property name)
    SetStyle,
    /// Replace the text of a text element
    SetText,
    /// Show or hide the element
    SetHidden,
    /// Set the start time (settles dynamic timing)
    SetStartTime,
    /// Set the duration
    SetDuration,
    /// Action name this library does not execute
    Other(String),
}

impl From<String> for RuleActionType {
    fn from(value: String) -> Self {
        match normalize_name(&value).as_str() {
            "set_style" => RuleActionType::SetStyle,
            "set_text" => RuleActionType::SetText,
            "set_hidden" => RuleActionType::SetHidden,
            "set_start_time" => RuleActionType::SetStartTime,
            "set_duration" => RuleActionType::SetDuration,
            _ => RuleActionType::Other(value),
        }
    }
}

impl From<RuleActionType> for String {
    fn from(value: RuleActionType) -> Self {
        match value {
            RuleActionType::SetStyle => "set_style".to_string(),
            RuleActionType::SetText => "set_text".to_string(),
            RuleActionType::SetHidden => "set_hidden".to_string(),
            RuleActionType::SetStartTime => "set_start_time".to_string(),
            RuleActionType::SetDuration => "set_duration".to_string(),
            RuleActionType::Other(name) => name,
        }
    }
}

impl std::fmt::Display for RuleActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

/// Accepts "not equals", "not-equals", "notEquals" and "not_equals" alike
fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.trim().chars() {
        if c == ' ' || c == '-' {
            out.push('_');
        } else if c.is_ascii_uppercase() {
            // Split camelCase only; all-caps words stay whole
            if prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// A single condition: `field <operator> value`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    /// Dotted path into the element, e.g. `textContent.length`
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl RuleCondition {
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// A single action executed on matching elements
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub action_type: RuleActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl RuleAction {
    pub fn set_style(property: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            action_type: RuleActionType::SetStyle,
            target: Some(property.into()),
            value: Some(value.into()),
        }
    }

    pub fn new(action_type: RuleActionType, value: impl Into<serde_json::Value>) -> Self {
        Self {
            action_type,
            target: None,
            value: Some(value.into()),
        }
    }
}

/// Conditional mutation applied per generated element
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRule {
    pub id: RuleId,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// AND-combined
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
}

fn default_enabled() -> bool {
    true
}

impl AutomationRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            enabled: true,
            description: None,
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_action(mut self, action: RuleAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Operators this rule uses that are not understood
    pub fn unknown_operators(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().filter_map(|c| match &c.operator {
            ConditionOperator::Other(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// Record of one action applied to one element
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEffect {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub element_id: ElementId,
    pub action: RuleActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_spellings() {
        for name in ["not equals", "not_equals", "notEquals", "NOT-EQUALS"] {
            assert_eq!(
                ConditionOperator::from(name.to_string()),
                ConditionOperator::NotEquals,
                "{name}"
            );
        }
        assert_eq!(
            ConditionOperator::from("greater than".to_string()),
            ConditionOperator::GreaterThan
        );
    }

    #[test]
    fn test_all_caps_names() {
        assert_eq!(ConditionOperator::from("EQUALS".to_string()), ConditionOperator::Equals);
        assert_eq!(ConditionOperator::from("CONTAINS".to_string()), ConditionOperator::Contains);
        assert_eq!(
            ConditionOperator::from("GREATER_THAN".to_string()),
            ConditionOperator::GreaterThan
        );
        assert_eq!(RuleActionType::from("SET_STYLE".to_string()), RuleActionType::SetStyle);
        assert_eq!(RuleActionType::from("setStartTime".to_string()), RuleActionType::SetStartTime);
    }

    #[test]
    fn test_unknown_operator_survives_round_trip() {
        let condition: RuleCondition = serde_json::from_str(
            r#"{"field":"duration","operator":"between","value":[1,2]}"#,
        )
        .unwrap();
        assert_eq!(
            condition.operator,
            ConditionOperator::Other("between".to_string())
        );
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["operator"], "between");
    }

    #[test]
    fn test_rule_enabled_by_default() {
        let rule: AutomationRule = serde_json::from_str(
            r#"{"id":"r1","name":"Shrink long titles","actions":[{"type":"set_style","target":"fontSize","value":32}]}"#,
        )
        .unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.actions[0].action_type, RuleActionType::SetStyle);
    }
}
