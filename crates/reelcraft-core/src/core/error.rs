//! Reelcraft Error Definitions
//!
//! Defines error types used throughout the template compiler.

use thiserror::Error;

use super::template::ValidationIssue;
use super::{ElementId, PlaceholderId};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Extraction Errors
    // =========================================================================
    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    // =========================================================================
    // Interpretation Errors
    // =========================================================================
    #[error("Placeholder validation failed: {}", summarize_issues(.0))]
    PlaceholderValidation(Vec<ValidationIssue>),

    #[error("Unresolved timing reference for element {element_id}: {reason}")]
    UnresolvedTimingReference {
        element_id: ElementId,
        reason: String,
    },

    #[error("Missing media metadata for element {element_id}: {reason}")]
    MissingMediaMetadata {
        element_id: ElementId,
        reason: String,
    },

    #[error("Placeholder type mismatch for {placeholder_id}: expected {expected}, got {actual}")]
    PlaceholderTypeMismatch {
        placeholder_id: PlaceholderId,
        expected: String,
        actual: String,
    },

    #[error("Transcript segment index {index} out of range for element {element_id} ({available} segments)")]
    SegmentIndexOutOfRange {
        element_id: ElementId,
        index: usize,
        available: usize,
    },

    #[error("Unknown generator: {0}")]
    UnknownGenerator(String),

    #[error("Media lookup failed: {0}")]
    MediaLookupFailed(String),

    // =========================================================================
    // Template Format Errors
    // =========================================================================
    #[error("Invalid template format: {0}")]
    InvalidTemplateFormat(String),

    // =========================================================================
    // Automation Errors
    // =========================================================================
    #[error("Unknown rule operator '{operator}' in rule {rule_id}")]
    UnknownRuleOperator { rule_id: String, operator: String },

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Returns the collected validation issues, if this is a validation failure
    pub fn validation_issues(&self) -> Option<&[ValidationIssue]> {
        match self {
            CoreError::PlaceholderValidation(issues) => Some(issues),
            _ => None,
        }
    }
}

fn summarize_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
