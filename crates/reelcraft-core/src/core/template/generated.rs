//! Generated Project Model
//!
//! The concrete output of interpretation: resolved numeric timings, pixel
//! positions and substituted content. Generated projects carry fresh ids and
//! no references back into the template they came from.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::coords::PixelPosition;
use super::models::{CanvasSettings, TrackRole, TrackType};
use super::placeholders::{MediaFileRef, PlaceholderType};
use super::styles::TextStyleDefinition;
use crate::core::automation::RuleEffect;
use crate::core::{ElementId, PlaceholderId, TemplateId, TimeSec, TrackId};

/// Substituted element content
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratedContent {
    #[serde(rename_all = "camelCase")]
    Media {
        source: MediaFileRef,
        media_type: PlaceholderType,
    },
    Text {
        text: String,
    },
    Number {
        value: f64,
    },
    Color {
        value: String,
    },
    Font {
        family: String,
    },
    /// Content that still needs a collaborator (batch quick path)
    Pending {
        reason: String,
    },
}

impl GeneratedContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            GeneratedContent::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, GeneratedContent::Pending { .. })
    }
}

/// A concrete element
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedElement {
    pub id: ElementId,
    pub name: String,
    pub start_time: TimeSec,
    pub duration: TimeSec,
    pub content: GeneratedContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyleDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_style_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PixelPosition>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub muted: bool,
    /// Start time is a placeholder until a rule settles it
    #[serde(default)]
    pub timing_provisional: bool,
}

impl GeneratedElement {
    pub fn end_time(&self) -> TimeSec {
        self.start_time + self.duration
    }
}

/// A concrete track
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTrack {
    pub id: TrackId,
    pub name: String,
    #[serde(rename = "type")]
    pub track_type: TrackType,
    pub role: TrackRole,
    pub elements: Vec<GeneratedElement>,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub is_main: bool,
    pub volume: f32,
}

/// Where a generated project came from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub template_id: TemplateId,
    pub template_name: String,
    pub generated_at: DateTime<Utc>,
    /// Placeholders filled from caller inputs
    #[serde(default)]
    pub placeholders_used: Vec<PlaceholderId>,
    /// Placeholders filled from their default value
    #[serde(default)]
    pub defaults_applied: Vec<PlaceholderId>,
    /// Template element id → generated element id
    #[serde(default)]
    pub element_id_map: BTreeMap<ElementId, ElementId>,
    #[serde(default)]
    pub rule_effects: Vec<RuleEffect>,
}

/// A concrete project produced from a template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProject {
    pub id: String,
    pub name: String,
    pub canvas: CanvasSettings,
    pub tracks: Vec<GeneratedTrack>,
    /// End of the last element
    pub duration: TimeSec,
    pub metadata: GenerationMetadata,
}

impl GeneratedProject {
    pub fn elements(&self) -> impl Iterator<Item = (&GeneratedTrack, &GeneratedElement)> {
        self.tracks
            .iter()
            .flat_map(|t| t.elements.iter().map(move |e| (t, e)))
    }

    pub fn element(&self, id: &str) -> Option<&GeneratedElement> {
        self.elements().map(|(_, e)| e).find(|e| e.id == id)
    }

    /// Looks up the element generated from a template element
    pub fn element_for(&self, template_element_id: &str) -> Option<&GeneratedElement> {
        self.metadata
            .element_id_map
            .get(template_element_id)
            .and_then(|id| self.element(id))
    }

    pub fn element_count(&self) -> usize {
        self.tracks.iter().map(|t| t.elements.len()).sum()
    }

    pub fn recompute_duration(&mut self) {
        self.duration = self
            .elements()
            .map(|(_, e)| e.end_time())
            .fold(0.0, f64::max);
    }

    /// Elements whose start time is still provisional
    pub fn provisional_elements(&self) -> Vec<&GeneratedElement> {
        self.elements()
            .map(|(_, e)| e)
            .filter(|e| e.timing_provisional)
            .collect()
    }
}
