//! Template Validator
//!
//! Structural checks for templates and constraint checks for placeholder
//! inputs. Problems are collected as issues, never raised; callers decide
//! whether errors are fatal.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::models::{ElementDuration, Template, TEMPLATE_VERSION};
use super::placeholders::{
    PlaceholderDefinition, PlaceholderInput, PlaceholderInputs, DEFAULT_ASPECT_RATIO_TOLERANCE,
};

// =============================================================================
// Issues
// =============================================================================

/// Machine-readable issue category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    UnsupportedVersion,
    DuplicateId,
    MissingPlaceholder,
    OrphanedReference,
    CircularReference,
    InvalidDuration,
    InvalidConstraints,
    InvalidDefault,
    UnknownOperator,
    UnknownCaptionStyle,
    PositionOutOfBounds,
    UnusedPlaceholder,
    EmptyTemplate,
    MissingRequired,
    TypeMismatch,
    UnknownInput,
    DurationOutOfRange,
    DurationUnknown,
    AspectRatioMismatch,
    FormatNotAllowed,
    FileTooLarge,
    TextLength,
    ValueOutOfRange,
}

/// A single validation finding
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: ValidationCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            placeholder_id: None,
            element_id: None,
            message: message.into(),
        }
    }

    pub fn for_placeholder(mut self, id: impl Into<String>) -> Self {
        self.placeholder_id = Some(id.into());
        self
    }

    pub fn for_element(mut self, id: impl Into<String>) -> Self {
        self.element_id = Some(id.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.placeholder_id, &self.element_id) {
            (Some(p), _) => write!(f, "[{}] {}", p, self.message),
            (None, Some(e)) => write!(f, "[element {}] {}", e, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Collected errors and warnings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    fn warn(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    /// Errors that mention the given placeholder
    pub fn errors_for<'a>(
        &'a self,
        placeholder_id: &'a str,
    ) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.errors
            .iter()
            .filter(move |i| i.placeholder_id.as_deref() == Some(placeholder_id))
    }
}

// =============================================================================
// Template Validation
// =============================================================================

/// Checks a template's internal consistency
pub fn validate_template(template: &Template) -> ValidationResult {
    let mut result = ValidationResult::default();

    if template.version != TEMPLATE_VERSION {
        result.error(ValidationIssue::new(
            ValidationCode::UnsupportedVersion,
            format!(
                "Unsupported template version '{}' (expected '{}')",
                template.version, TEMPLATE_VERSION
            ),
        ));
    }

    if template.tracks.is_empty() {
        result.warn(ValidationIssue::new(
            ValidationCode::EmptyTemplate,
            "Template has no tracks",
        ));
    }

    check_duplicate_ids(template, &mut result);
    check_placeholders(template, &mut result);
    check_elements(template, &mut result);
    check_relative_references(template, &mut result);
    check_rules(template, &mut result);

    result
}

/// Returns true when `validate_template` reports no errors
pub fn is_valid_template(template: &Template) -> bool {
    validate_template(template).is_valid()
}

fn check_duplicate_ids(template: &Template, result: &mut ValidationResult) {
    report_duplicates("track", template.tracks.iter().map(|t| t.id.as_str()), result);
    report_duplicates(
        "element",
        template.elements().map(|(_, e)| e.id.as_str()),
        result,
    );
    report_duplicates(
        "placeholder",
        template.placeholders.iter().map(|p| p.id.as_str()),
        result,
    );
    report_duplicates("rule", template.rules.iter().map(|r| r.id.as_str()), result);
}

fn report_duplicates<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
    result: &mut ValidationResult,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            result.error(ValidationIssue::new(
                ValidationCode::DuplicateId,
                format!("Duplicate {} id '{}'", kind, id),
            ));
        }
    }
}

fn check_placeholders(template: &Template, result: &mut ValidationResult) {
    let referenced: HashSet<&str> = template
        .elements()
        .flat_map(|(_, e)| {
            let audio = match &e.duration {
                ElementDuration::MatchAudio { placeholder_id, .. } => placeholder_id.as_deref(),
                _ => None,
            };
            e.content.placeholder_ref().into_iter().chain(audio)
        })
        .collect();

    for placeholder in &template.placeholders {
        for problem in constraint_problems(placeholder) {
            result.error(
                ValidationIssue::new(ValidationCode::InvalidConstraints, problem)
                    .for_placeholder(&placeholder.id),
            );
        }

        if let Some(default) = &placeholder.default_value {
            if default.input_type() != placeholder.placeholder_type {
                result.error(
                    ValidationIssue::new(
                        ValidationCode::InvalidDefault,
                        format!(
                            "Default value is {} but placeholder is {}",
                            default.input_type(),
                            placeholder.placeholder_type
                        ),
                    )
                    .for_placeholder(&placeholder.id),
                );
            }
        }

        if !referenced.contains(placeholder.id.as_str()) {
            result.warn(
                ValidationIssue::new(
                    ValidationCode::UnusedPlaceholder,
                    format!("Placeholder '{}' is not used by any element", placeholder.name),
                )
                .for_placeholder(&placeholder.id),
            );
        }
    }
}

/// Internal inconsistencies that make a placeholder unsatisfiable
fn constraint_problems(placeholder: &PlaceholderDefinition) -> Vec<String> {
    let c = &placeholder.constraints;
    let mut problems = Vec::new();

    if let (Some(min), Some(max)) = (c.min_duration, c.max_duration) {
        if min > max {
            problems.push(format!("minDuration {} exceeds maxDuration {}", min, max));
        }
    }
    if c.min_duration.is_some_and(|d| d < 0.0) || c.max_duration.is_some_and(|d| d < 0.0) {
        problems.push("Duration bounds must not be negative".to_string());
    }
    if let (Some(min), Some(max)) = (c.min_length, c.max_length) {
        if min > max {
            problems.push(format!("minLength {} exceeds maxLength {}", min, max));
        }
    }
    if let (Some(min), Some(max)) = (c.min_value, c.max_value) {
        if min > max {
            problems.push(format!("minValue {} exceeds maxValue {}", min, max));
        }
    }
    if let Some(ratio) = &c.aspect_ratio {
        if c.target_aspect_ratio().is_none() {
            problems.push(format!("Unparseable aspect ratio '{}'", ratio));
        }
    }
    if c.aspect_ratio_tolerance.is_some_and(|t| !(t >= 0.0)) {
        problems.push("aspectRatioTolerance must be a non-negative number".to_string());
    }
    if c.max_file_size == Some(0) {
        problems.push("maxFileSize of 0 rejects every file".to_string());
    }
    problems
}

/// Elements whose content names a placeholder the template does not define
pub(crate) fn unknown_placeholder_issues(template: &Template) -> Vec<ValidationIssue> {
    template
        .elements()
        .filter_map(|(_, element)| {
            let id = element.content.placeholder_ref()?;
            if template.placeholder(id).is_some() {
                return None;
            }
            Some(
                ValidationIssue::new(
                    ValidationCode::MissingPlaceholder,
                    format!("Element '{}' references unknown placeholder '{}'", element.name, id),
                )
                .for_placeholder(id)
                .for_element(&element.id),
            )
        })
        .collect()
}

fn check_elements(template: &Template, result: &mut ValidationResult) {
    for issue in unknown_placeholder_issues(template) {
        result.error(issue);
    }

    for (_, element) in template.elements() {
        match &element.duration {
            ElementDuration::Fixed { value } if *value < 0.0 || !value.is_finite() => {
                result.error(
                    ValidationIssue::new(
                        ValidationCode::InvalidDuration,
                        format!("Fixed duration {} is invalid", value),
                    )
                    .for_element(&element.id),
                );
            }
            ElementDuration::Content {
                max_duration: Some(max),
                ..
            }
            | ElementDuration::FillGap {
                max_duration: Some(max),
            } if *max < 0.0 => {
                result.error(
                    ValidationIssue::new(
                        ValidationCode::InvalidDuration,
                        format!("maxDuration {} is negative", max),
                    )
                    .for_element(&element.id),
                );
            }
            ElementDuration::MatchAudio {
                placeholder_id: Some(id),
                ..
            } => match template.placeholder(id) {
                None => result.error(
                    ValidationIssue::new(
                        ValidationCode::MissingPlaceholder,
                        format!("Duration matches unknown audio placeholder '{}'", id),
                    )
                    .for_element(&element.id),
                ),
                Some(p) if !p.placeholder_type.has_duration() => result.error(
                    ValidationIssue::new(
                        ValidationCode::InvalidDuration,
                        format!("Placeholder '{}' has no duration to match", p.name),
                    )
                    .for_element(&element.id),
                ),
                Some(_) => {}
            },
            _ => {}
        }

        if let Some(style_id) = &element.caption_style_id {
            if template.caption_style(style_id).is_none() {
                result.warn(
                    ValidationIssue::new(
                        ValidationCode::UnknownCaptionStyle,
                        format!("Unknown caption style '{}'", style_id),
                    )
                    .for_element(&element.id),
                );
            }
        }

        if let Some(position) = &element.position {
            if !position.is_on_canvas() {
                result.warn(
                    ValidationIssue::new(
                        ValidationCode::PositionOutOfBounds,
                        format!(
                            "Position ({:.1}%, {:.1}%) lies outside the canvas",
                            position.x_percent, position.y_percent
                        ),
                    )
                    .for_element(&element.id),
                );
            }
        }
    }
}

/// Orphaned and cyclic timing references.
///
/// An element depends on its `relativeTo` anchor and, when it fills a gap,
/// on the next element of its track. The graph is walked depth-first with an
/// explicit stack and a three-state marker.
fn check_relative_references(template: &Template, result: &mut ValidationResult) {
    let known: HashSet<&str> = template.elements().map(|(_, e)| e.id.as_str()).collect();

    let mut deps: HashMap<&str, Vec<&str>> = HashMap::new();
    for track in &template.tracks {
        for (i, element) in track.elements.iter().enumerate() {
            let edges = deps.entry(element.id.as_str()).or_default();
            if let Some(anchor) = element.timing.anchor_id() {
                if known.contains(anchor) {
                    edges.push(anchor);
                } else {
                    result.error(
                        ValidationIssue::new(
                            ValidationCode::OrphanedReference,
                            format!("relativeTo references unknown element '{}'", anchor),
                        )
                        .for_element(&element.id),
                    );
                }
            }
            if let (ElementDuration::FillGap { .. }, Some(next)) =
                (&element.duration, track.elements.get(i + 1))
            {
                edges.push(next.id.as_str());
            }
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let no_edges: Vec<&str> = Vec::new();

    for (_, element) in template.elements() {
        let root = element.id.as_str();
        if marks.contains_key(root) {
            continue;
        }
        // (node, index of the next edge to follow)
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::Visiting);

        while let Some(&(id, next_edge)) = stack.last() {
            let edges = deps.get(id).unwrap_or(&no_edges);
            let Some(&dep) = edges.get(next_edge) else {
                marks.insert(id, Mark::Done);
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            match marks.get(dep) {
                Some(Mark::Done) => {}
                Some(Mark::Visiting) => {
                    let start = stack.iter().position(|(n, _)| *n == dep).unwrap_or(0);
                    let cycle: Vec<&str> = stack[start..].iter().map(|(n, _)| *n).collect();
                    result.error(
                        ValidationIssue::new(
                            ValidationCode::CircularReference,
                            format!("Circular timing: {} -> {}", cycle.join(" -> "), dep),
                        )
                        .for_element(dep),
                    );
                }
                None => {
                    marks.insert(dep, Mark::Visiting);
                    stack.push((dep, 0));
                }
            }
        }
    }
}

fn check_rules(template: &Template, result: &mut ValidationResult) {
    for rule in &template.rules {
        for operator in rule.unknown_operators() {
            result.error(ValidationIssue::new(
                ValidationCode::UnknownOperator,
                format!("Rule '{}' uses unknown operator '{}'", rule.name, operator),
            ));
        }
    }
}

// =============================================================================
// Input Validation
// =============================================================================

/// Checks inputs against placeholder definitions.
///
/// A placeholder's default value satisfies `required`. Inputs of the wrong
/// type are reported as warnings and their constraints are not checked; the
/// interpreter rejects them separately.
pub fn validate_placeholder_inputs(
    placeholders: &[PlaceholderDefinition],
    inputs: &PlaceholderInputs,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    for placeholder in placeholders {
        let input = inputs
            .get(&placeholder.id)
            .or(placeholder.default_value.as_ref());

        let Some(input) = input else {
            if placeholder.required {
                result.error(
                    ValidationIssue::new(
                        ValidationCode::MissingRequired,
                        format!("Required placeholder '{}' has no value", placeholder.name),
                    )
                    .for_placeholder(&placeholder.id),
                );
            }
            continue;
        };

        if input.input_type() != placeholder.placeholder_type {
            result.warn(
                ValidationIssue::new(
                    ValidationCode::TypeMismatch,
                    format!(
                        "Expected {} input, got {}",
                        placeholder.placeholder_type,
                        input.input_type()
                    ),
                )
                .for_placeholder(&placeholder.id),
            );
            continue;
        }

        check_input(placeholder, input, &mut result);
    }

    for id in inputs.placeholders.keys() {
        if !placeholders.iter().any(|p| &p.id == id) {
            result.warn(
                ValidationIssue::new(
                    ValidationCode::UnknownInput,
                    format!("Input for unknown placeholder '{}'", id),
                )
                .for_placeholder(id),
            );
        }
    }

    result
}

fn check_input(
    placeholder: &PlaceholderDefinition,
    input: &PlaceholderInput,
    result: &mut ValidationResult,
) {
    let c = &placeholder.constraints;
    let issue = |code: ValidationCode, message: String| {
        ValidationIssue::new(code, message).for_placeholder(&placeholder.id)
    };

    match input {
        PlaceholderInput::Video { value }
        | PlaceholderInput::Audio { value }
        | PlaceholderInput::Image { value } => {
            if placeholder.placeholder_type.has_duration()
                && (c.min_duration.is_some() || c.max_duration.is_some())
            {
                match value.duration() {
                    Some(d) => {
                        if let Some(min) = c.min_duration.filter(|min| d < *min) {
                            result.error(issue(
                                ValidationCode::DurationOutOfRange,
                                format!("Duration {:.2}s is shorter than {:.2}s", d, min),
                            ));
                        }
                        if let Some(max) = c.max_duration.filter(|max| d > *max) {
                            result.error(issue(
                                ValidationCode::DurationOutOfRange,
                                format!("Duration {:.2}s is longer than {:.2}s", d, max),
                            ));
                        }
                    }
                    None => result.warn(issue(
                        ValidationCode::DurationUnknown,
                        format!("Duration of '{}' is unknown", value.name),
                    )),
                }
            }

            if let Some(target) = c.target_aspect_ratio() {
                let tolerance = c
                    .aspect_ratio_tolerance
                    .unwrap_or(DEFAULT_ASPECT_RATIO_TOLERANCE);
                if let Some(actual) = value.metadata.as_ref().and_then(|m| m.aspect_ratio()) {
                    if (actual / target - 1.0).abs() > tolerance {
                        result.error(issue(
                            ValidationCode::AspectRatioMismatch,
                            format!(
                                "Aspect ratio {:.3} does not match {:.3}",
                                actual, target
                            ),
                        ));
                    }
                }
            }

            if !c.allowed_formats.is_empty() {
                match value.format() {
                    Some(format) if c.allowed_formats.contains(&format) => {}
                    Some(format) => result.error(issue(
                        ValidationCode::FormatNotAllowed,
                        format!(
                            "Format '{}' is not one of {}",
                            format,
                            c.allowed_formats.join(", ")
                        ),
                    )),
                    None => result.error(issue(
                        ValidationCode::FormatNotAllowed,
                        format!("Format of '{}' could not be determined", value.name),
                    )),
                }
            }

            if let (Some(max), Some(size)) = (
                c.max_file_size,
                value.metadata.as_ref().and_then(|m| m.size_bytes),
            ) {
                if size > max {
                    result.error(issue(
                        ValidationCode::FileTooLarge,
                        format!("File is {} bytes, limit is {}", size, max),
                    ));
                }
            }
        }
        PlaceholderInput::Text { value } | PlaceholderInput::Transcript { value } => {
            let length = value.chars().count();
            if let Some(min) = c.min_length.filter(|min| length < *min) {
                result.error(issue(
                    ValidationCode::TextLength,
                    format!("Text has {} characters, minimum is {}", length, min),
                ));
            }
            if let Some(max) = c.max_length.filter(|max| length > *max) {
                result.error(issue(
                    ValidationCode::TextLength,
                    format!("Text has {} characters, maximum is {}", length, max),
                ));
            }
        }
        PlaceholderInput::Number { value } => {
            if !value.is_finite() {
                result.error(issue(
                    ValidationCode::ValueOutOfRange,
                    format!("{} is not a finite number", value),
                ));
            }
            if let Some(min) = c.min_value.filter(|min| value < min) {
                result.error(issue(
                    ValidationCode::ValueOutOfRange,
                    format!("{} is below the minimum {}", value, min),
                ));
            }
            if let Some(max) = c.max_value.filter(|max| value > max) {
                result.error(issue(
                    ValidationCode::ValueOutOfRange,
                    format!("{} is above the maximum {}", value, max),
                ));
            }
        }
        PlaceholderInput::Color { .. } | PlaceholderInput::Font { .. } => {}
    }
}
