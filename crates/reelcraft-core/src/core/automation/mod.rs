//! Automation Rules
//!
//! Condition/action rules applied to generated projects.
//!
//! # Modules
//!
//! - `models`: rule, condition and action data structures
//! - `field`: dotted field paths and loose value comparison
//! - `engine`: rule evaluation and action execution

pub mod engine;
pub mod field;
pub mod models;

pub use engine::{apply_rules, evaluate_conditions, RuleReport};
pub use models::{
    AutomationRule, ConditionOperator, RuleAction, RuleActionType, RuleCondition, RuleEffect,
};
