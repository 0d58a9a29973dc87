//! Batch Job Models

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{new_id, TemplateId};

/// Tabular input for a batch job
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDataSource {
    /// Column names in source order
    #[serde(default)]
    pub columns: Vec<String>,
    /// One map per row: column name → cell value
    #[serde(default)]
    pub data: Vec<HashMap<String, String>>,
    /// Placeholder name (or id) → column name
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,
}

impl BatchDataSource {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Appends a row given as values in column order
    pub fn with_row<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row = self
            .columns
            .iter()
            .cloned()
            .zip(values.into_iter().map(Into::into))
            .collect();
        self.data.push(row);
        self
    }

    pub fn with_mapping(mut self, placeholder: impl Into<String>, column: impl Into<String>) -> Self {
        self.mappings.insert(placeholder.into(), column.into());
        self
    }
}

/// How rows are turned into projects
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Text and media substitution with hinted durations, no collaborators
    #[default]
    Quick,
    /// Typed inputs per row through the full interpreter
    Full,
}

/// Batch job status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchJobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    CompletedWithErrors,
    Cancelled,
}

impl BatchJobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            BatchJobStatus::Completed
                | BatchJobStatus::CompletedWithErrors
                | BatchJobStatus::Cancelled
        )
    }
}

/// A batch generation job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub id: String,
    pub name: String,
    pub template_id: TemplateId,
    pub data_source: BatchDataSource,
    /// `{index}` is the 1-based row number, `{column}` a row value
    #[serde(default)]
    pub naming_pattern: String,
    #[serde(default)]
    pub mode: BatchMode,
    #[serde(default)]
    pub status: BatchJobStatus,
    #[serde(default)]
    pub processed_rows: usize,
    #[serde(default)]
    pub failed_rows: usize,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    pub fn new(
        name: impl Into<String>,
        template_id: impl Into<String>,
        data_source: BatchDataSource,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            template_id: template_id.into(),
            data_source,
            naming_pattern: String::new(),
            mode: BatchMode::Quick,
            status: BatchJobStatus::Pending,
            processed_rows: 0,
            failed_rows: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn with_naming_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.naming_pattern = pattern.into();
        self
    }

    pub fn with_mode(mut self, mode: BatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn total_rows(&self) -> usize {
        self.data_source.data.len()
    }

    /// Fraction of rows processed (0.0 - 1.0)
    pub fn progress(&self) -> f32 {
        match self.total_rows() {
            0 => 1.0,
            total => self.processed_rows as f32 / total as f32,
        }
    }
}
