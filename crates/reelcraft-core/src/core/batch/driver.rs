//! Batch Driver
//!
//! Turns each row of a batch data source into a generated project.
//! Rows are isolated: a failing row is reported and the next one runs.
//! Progress goes out on an optional channel and a shared flag cancels the
//! job between rows.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::models::{BatchDataSource, BatchJob, BatchJobStatus, BatchMode};
use crate::core::automation::apply_rules;
use crate::core::template::interpreter::{build_element, coerce_input, static_content};
use crate::core::template::timing::{hinted_duration, resolve_timings};
use crate::core::template::validator::unknown_placeholder_issues;
use crate::core::template::{
    ElementContent, GeneratedContent, GeneratedProject, GeneratedTrack, GenerationMetadata,
    Interpreter, InterpreterOptions, MediaFileRef, PlaceholderInput, PlaceholderInputs,
    PlaceholderType, Template, TemplateElement, TemplateTrack, ValidationCode, ValidationIssue,
};
use crate::core::{new_id, CoreError, CoreResult, PlaceholderId};

// =============================================================================
// Cancellation
// =============================================================================

/// Shared cancellation flag, checked between rows
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Events and Outcomes
// =============================================================================

/// Batch progress event
#[derive(Clone, Debug, PartialEq)]
pub enum BatchEvent {
    Started {
        job_id: String,
        total_rows: usize,
    },
    RowCompleted {
        job_id: String,
        row_index: usize,
        project_id: String,
        name: String,
    },
    RowFailed {
        job_id: String,
        row_index: usize,
        error: String,
    },
    Finished {
        job_id: String,
        status: BatchJobStatus,
        processed_rows: usize,
        failed_rows: usize,
    },
}

/// Result of one row
#[derive(Debug)]
pub struct BatchRowOutcome {
    /// Zero-based row index
    pub row_index: usize,
    /// Expanded project name
    pub name: String,
    pub result: CoreResult<GeneratedProject>,
}

impl BatchRowOutcome {
    pub fn project(&self) -> Option<&GeneratedProject> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&CoreError> {
        self.result.as_ref().err()
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Runs batch jobs against a template
#[derive(Debug, Default)]
pub struct BatchDriver {
    interpreter: Interpreter,
    events: Option<mpsc::UnboundedSender<BatchEvent>>,
    cancellation: CancellationFlag,
}

impl BatchDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpreter used by `BatchMode::Full`
    pub fn with_interpreter(mut self, interpreter: Interpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<BatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Handle that cancels the running job after the current row
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Generates one project per row with lightweight substitution.
    ///
    /// Ignores `job.mode`; use [`BatchDriver::run`] for full interpretation.
    pub fn process_batch_job(&self, job: &mut BatchJob, template: &Template) -> Vec<BatchRowOutcome> {
        self.begin(job, template);

        let rows = job.data_source.data.clone();
        let mut outcomes = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                break;
            }
            let name = expand_name(&job.naming_pattern, index, row, &template.name);
            let result = build_row_inputs(template, &job.data_source, row)
                .and_then(|inputs| quick_project(template, &inputs, &name));
            outcomes.push(self.record(job, index, name, result));
        }

        self.finish(job);
        outcomes
    }

    /// Runs a job in its configured mode.
    ///
    /// `options` only applies to `BatchMode::Full`; the project name always
    /// comes from the naming pattern.
    pub async fn run(
        &self,
        job: &mut BatchJob,
        template: &Template,
        options: &InterpreterOptions,
    ) -> Vec<BatchRowOutcome> {
        if job.mode == BatchMode::Quick {
            return self.process_batch_job(job, template);
        }

        self.begin(job, template);

        let rows = job.data_source.data.clone();
        let mut outcomes = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                break;
            }
            let name = expand_name(&job.naming_pattern, index, row, &template.name);
            let row_options = options.clone().with_project_name(name.clone());
            let result = match build_row_inputs(template, &job.data_source, row) {
                Ok(inputs) => self
                    .interpreter
                    .interpret_with_rules(template, &inputs, &row_options)
                    .await
                    .map(|(project, _)| project),
                Err(e) => Err(e),
            };
            outcomes.push(self.record(job, index, name, result));
        }

        self.finish(job);
        outcomes
    }

    fn begin(&self, job: &mut BatchJob, template: &Template) {
        if job.template_id != template.id {
            warn!(
                "Batch job {} references template {} but runs against {}",
                job.id, job.template_id, template.id
            );
        }
        job.status = BatchJobStatus::Running;
        job.processed_rows = 0;
        job.failed_rows = 0;
        job.completed_at = None;
        info!(
            "Starting batch job {} ({:?}): {} rows",
            job.id,
            job.mode,
            job.total_rows()
        );
        self.emit(BatchEvent::Started {
            job_id: job.id.clone(),
            total_rows: job.total_rows(),
        });
    }

    fn record(
        &self,
        job: &mut BatchJob,
        row_index: usize,
        name: String,
        result: CoreResult<GeneratedProject>,
    ) -> BatchRowOutcome {
        job.processed_rows += 1;
        match &result {
            Ok(project) => {
                debug!("Batch row {} generated project {}", row_index, project.id);
                self.emit(BatchEvent::RowCompleted {
                    job_id: job.id.clone(),
                    row_index,
                    project_id: project.id.clone(),
                    name: name.clone(),
                });
            }
            Err(e) => {
                job.failed_rows += 1;
                warn!("Batch job {} row {} failed: {}", job.id, row_index, e);
                self.emit(BatchEvent::RowFailed {
                    job_id: job.id.clone(),
                    row_index,
                    error: e.to_string(),
                });
            }
        }
        BatchRowOutcome {
            row_index,
            name,
            result,
        }
    }

    fn finish(&self, job: &mut BatchJob) {
        job.status = if self.cancellation.is_cancelled() && job.processed_rows < job.total_rows() {
            BatchJobStatus::Cancelled
        } else if job.failed_rows > 0 {
            BatchJobStatus::CompletedWithErrors
        } else {
            BatchJobStatus::Completed
        };
        job.completed_at = Some(Utc::now());
        info!(
            "Batch job {} finished as {:?}: {} processed, {} failed",
            job.id, job.status, job.processed_rows, job.failed_rows
        );
        self.emit(BatchEvent::Finished {
            job_id: job.id.clone(),
            status: job.status,
            processed_rows: job.processed_rows,
            failed_rows: job.failed_rows,
        });
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

// =============================================================================
// Row Inputs
// =============================================================================

/// Maps one data row onto placeholder inputs.
///
/// Mapping keys match a placeholder by name, then by id. Keys that match
/// nothing are kept as text inputs under the raw key. A required placeholder
/// whose column is missing or empty fails the row unless it has a default.
pub fn build_row_inputs(
    template: &Template,
    source: &BatchDataSource,
    row: &HashMap<String, String>,
) -> CoreResult<PlaceholderInputs> {
    let mut inputs = PlaceholderInputs::new();
    let mut missing = Vec::new();

    for (key, column) in &source.mappings {
        let value = row
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty());
        let placeholder = template
            .placeholder_by_name(key)
            .or_else(|| template.placeholder(key));

        let Some(placeholder) = placeholder else {
            if let Some(value) = value {
                inputs.insert(key.clone(), PlaceholderInput::text(value));
            }
            continue;
        };

        let Some(value) = value else {
            if placeholder.required && placeholder.default_value.is_none() {
                missing.push(
                    ValidationIssue::new(
                        ValidationCode::MissingRequired,
                        format!("column '{}' has no value for '{}'", column, placeholder.name),
                    )
                    .for_placeholder(placeholder.id.clone()),
                );
            }
            continue;
        };

        let input = row_input(&placeholder.id, placeholder.placeholder_type, value)?;
        inputs.insert(placeholder.id.clone(), input);
    }

    if !missing.is_empty() {
        return Err(CoreError::PlaceholderValidation(missing));
    }
    Ok(inputs)
}

fn row_input(
    placeholder_id: &str,
    placeholder_type: PlaceholderType,
    value: &str,
) -> CoreResult<PlaceholderInput> {
    let input = match placeholder_type {
        PlaceholderType::Text => PlaceholderInput::text(value),
        PlaceholderType::Transcript => PlaceholderInput::Transcript {
            value: value.to_string(),
        },
        PlaceholderType::Number => {
            let number = value
                .parse::<f64>()
                .map_err(|_| CoreError::PlaceholderTypeMismatch {
                    placeholder_id: placeholder_id.to_string(),
                    expected: PlaceholderType::Number.to_string(),
                    actual: format!("'{}'", value),
                })?;
            PlaceholderInput::number(number)
        }
        PlaceholderType::Color => PlaceholderInput::Color {
            value: value.to_string(),
        },
        PlaceholderType::Font => PlaceholderInput::Font {
            value: value.to_string(),
        },
        PlaceholderType::Video | PlaceholderType::Audio | PlaceholderType::Image => {
            let file_name = Path::new(value)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| value.to_string());
            let media = MediaFileRef::new(value, file_name).with_path(value);
            PlaceholderInput::media(placeholder_type, media).ok_or_else(|| {
                CoreError::PlaceholderTypeMismatch {
                    placeholder_id: placeholder_id.to_string(),
                    expected: "media".to_string(),
                    actual: placeholder_type.to_string(),
                }
            })?
        }
    };
    Ok(input)
}

// =============================================================================
// Naming
// =============================================================================

fn name_token() -> Option<&'static Regex> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"\{([^{}]+)\}").ok())
        .as_ref()
}

/// Expands a naming pattern for one row.
///
/// `{index}` is the 1-based row number and `{column}` the row's value for
/// that column. Unknown tokens are left as they are. An empty pattern gives
/// `"<template name> <index>"`.
pub fn expand_name(
    pattern: &str,
    row_index: usize,
    row: &HashMap<String, String>,
    template_name: &str,
) -> String {
    let number = row_index + 1;
    if pattern.trim().is_empty() {
        return format!("{} {}", template_name, number);
    }
    let Some(token) = name_token() else {
        return pattern.to_string();
    };
    token
        .replace_all(pattern, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            if key == "index" {
                number.to_string()
            } else {
                row.get(key)
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            }
        })
        .into_owned()
}

// =============================================================================
// Quick Generation
// =============================================================================

/// Required placeholders the row leaves without a value or default, plus
/// element references to placeholders the template lacks
fn quick_input_issues(template: &Template, inputs: &PlaceholderInputs) -> Vec<ValidationIssue> {
    let mut issues = unknown_placeholder_issues(template);
    for placeholder in template.ordered_placeholders() {
        if placeholder.required
            && placeholder.default_value.is_none()
            && inputs.get(&placeholder.id).is_none()
        {
            issues.push(
                ValidationIssue::new(
                    ValidationCode::MissingRequired,
                    format!("Required placeholder '{}' has no value", placeholder.name),
                )
                .for_placeholder(placeholder.id.clone()),
            );
        }
    }
    issues
}

/// Builds a project without collaborators: hinted durations, template
/// canvas, text and media substitution only.
fn quick_project(
    template: &Template,
    inputs: &PlaceholderInputs,
    name: &str,
) -> CoreResult<GeneratedProject> {
    let issues = quick_input_issues(template, inputs);
    if !issues.is_empty() {
        return Err(CoreError::PlaceholderValidation(issues));
    }

    let timings = resolve_timings(template, None, |element| Ok(hinted_duration(element)))?;
    let canvas = template.canvas.clone();
    let size = canvas.size();

    let mut element_id_map = BTreeMap::new();
    let mut defaults_applied: Vec<PlaceholderId> = Vec::new();
    let mut tracks = Vec::with_capacity(template.tracks.len());

    for track in &template.tracks {
        let mut elements = Vec::with_capacity(track.elements.len());
        for element in &track.elements {
            let timing = timings.get(&element.id).copied().ok_or_else(|| {
                CoreError::UnresolvedTimingReference {
                    element_id: element.id.clone(),
                    reason: "no resolved timing".to_string(),
                }
            })?;
            let content = quick_content(template, track, element, inputs, &mut defaults_applied)?;
            let generated = build_element(template, element, timing, content, size);
            element_id_map.insert(element.id.clone(), generated.id.clone());
            elements.push(generated);
        }
        tracks.push(GeneratedTrack {
            id: new_id(),
            name: track.name.clone(),
            track_type: track.track_type,
            role: track.role,
            elements,
            muted: track.muted,
            is_main: track.is_main,
            volume: track.volume,
        });
    }

    let mut project = GeneratedProject {
        id: new_id(),
        name: name.to_string(),
        canvas,
        tracks,
        duration: 0.0,
        metadata: GenerationMetadata {
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            generated_at: Utc::now(),
            placeholders_used: inputs.placeholders.keys().cloned().collect(),
            defaults_applied,
            element_id_map,
            rule_effects: Vec::new(),
        },
    };
    project.recompute_duration();
    apply_rules(&mut project, &template.rules)?;
    Ok(project)
}

fn quick_content(
    template: &Template,
    track: &TemplateTrack,
    element: &TemplateElement,
    inputs: &PlaceholderInputs,
    defaults_applied: &mut Vec<PlaceholderId>,
) -> CoreResult<GeneratedContent> {
    let pending = |reason: &str| GeneratedContent::Pending {
        reason: reason.to_string(),
    };

    match &element.content {
        ElementContent::Placeholder { placeholder_id } => {
            let row_value = inputs.get(placeholder_id).filter(|input| is_quick_input(input));
            let input = match row_value {
                Some(input) => Some(input),
                None => {
                    let default = template
                        .placeholder(placeholder_id)
                        .and_then(|p| p.default_value.as_ref())
                        .filter(|input| !matches!(input, PlaceholderInput::Transcript { .. }));
                    if default.is_some() && !defaults_applied.contains(placeholder_id) {
                        defaults_applied.push(placeholder_id.clone());
                    }
                    default
                }
            };
            match input {
                Some(input) => coerce_input(placeholder_id, input, track.track_type),
                None => Ok(pending("placeholder has no text or media value")),
            }
        }
        ElementContent::Transcript { .. } => Ok(pending("transcript segments need a transcript source")),
        ElementContent::Static { .. } => Ok(static_content(track.track_type, &element.content)
            .unwrap_or_else(|| pending("empty static content"))),
        ElementContent::Generated { generator, .. } => {
            Ok(pending(&format!("generator '{}' runs in full mode", generator)))
        }
    }
}

fn is_quick_input(input: &PlaceholderInput) -> bool {
    input.input_type().is_media() || input.input_type() == PlaceholderType::Text
}
