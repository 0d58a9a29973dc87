//! Placeholder Models
//!
//! Placeholders are the named, typed slots of a template. Inputs fill them at
//! interpretation time; constraints describe which inputs are acceptable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{new_id, MediaId, PlaceholderId, TimeSec};

/// Placeholder value type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderType {
    Video,
    Audio,
    Image,
    Text,
    Transcript,
    Number,
    Color,
    Font,
}

impl PlaceholderType {
    /// Returns true for file-backed placeholder types
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            PlaceholderType::Video | PlaceholderType::Audio | PlaceholderType::Image
        )
    }

    /// Returns true for types that have a time dimension
    pub fn has_duration(&self) -> bool {
        matches!(self, PlaceholderType::Video | PlaceholderType::Audio)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceholderType::Video => "video",
            PlaceholderType::Audio => "audio",
            PlaceholderType::Image => "image",
            PlaceholderType::Text => "text",
            PlaceholderType::Transcript => "transcript",
            PlaceholderType::Number => "number",
            PlaceholderType::Color => "color",
            PlaceholderType::Font => "font",
        }
    }
}

impl std::fmt::Display for PlaceholderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Constraints
// =============================================================================

/// Input constraints for a placeholder
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<TimeSec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<TimeSec>,
    /// Required aspect ratio, either "16:9" or a decimal like "1.7778"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// Allowed relative deviation from `aspect_ratio` (default 0.02)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio_tolerance: Option<f64>,
    /// Allowed file formats (extensions, lowercase, without dot)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_formats: Vec<String>,
    /// Maximum file size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

/// Default relative tolerance for aspect ratio checks
pub const DEFAULT_ASPECT_RATIO_TOLERANCE: f64 = 0.02;

impl PlaceholderConstraints {
    /// Parses `aspect_ratio` into width / height
    pub fn target_aspect_ratio(&self) -> Option<f64> {
        self.aspect_ratio.as_deref().and_then(parse_aspect_ratio)
    }

    pub fn with_duration_range(mut self, min: Option<TimeSec>, max: Option<TimeSec>) -> Self {
        self.min_duration = min;
        self.max_duration = max;
        self
    }

    pub fn with_length_range(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_value_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_formats = formats
            .into_iter()
            .map(|f| f.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }
}

/// Parses "16:9", "16/9" or "1.7778"
pub fn parse_aspect_ratio(value: &str) -> Option<f64> {
    let value = value.trim();
    let split = value.split_once(':').or_else(|| value.split_once('/'));
    let ratio = match split {
        Some((w, h)) => {
            let w: f64 = w.trim().parse().ok()?;
            let h: f64 = h.trim().parse().ok()?;
            if h == 0.0 {
                return None;
            }
            w / h
        }
        None => value.parse().ok()?,
    };
    (ratio.is_finite() && ratio > 0.0).then_some(ratio)
}

// =============================================================================
// Definition
// =============================================================================

/// A named, typed slot in a template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderDefinition {
    pub id: PlaceholderId,
    pub name: String,
    #[serde(rename = "type")]
    pub placeholder_type: PlaceholderType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub constraints: PlaceholderConstraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<PlaceholderInput>,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PlaceholderDefinition {
    pub fn new(name: impl Into<String>, placeholder_type: PlaceholderType) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            placeholder_type,
            required: false,
            constraints: PlaceholderConstraints::default(),
            default_value: None,
            order: 0,
            description: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_constraints(mut self, constraints: PlaceholderConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_default(mut self, value: PlaceholderInput) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// =============================================================================
// Media references
// =============================================================================

/// Media metadata known for a file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<TimeSec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Container format or extension (e.g. "mp4")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl MediaMetadata {
    pub fn with_duration(mut self, duration_sec: TimeSec) -> Self {
        self.duration_sec = Some(duration_sec);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if h > 0 => Some(w as f64 / h as f64),
            _ => None,
        }
    }
}

/// Reference to a concrete media file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFileRef {
    pub id: MediaId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MediaMetadata>,
}

impl MediaFileRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: None,
            mime_type: None,
            metadata: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Duration from metadata, if known
    pub fn duration(&self) -> Option<TimeSec> {
        self.metadata.as_ref().and_then(|m| m.duration_sec)
    }

    /// Lowercase format: metadata first, then file extension, then MIME subtype
    pub fn format(&self) -> Option<String> {
        if let Some(format) = self.metadata.as_ref().and_then(|m| m.format.as_ref()) {
            return Some(format.to_lowercase());
        }
        let from_name = |s: &str| {
            std::path::Path::new(s)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
        };
        self.path
            .as_deref()
            .and_then(from_name)
            .or_else(|| from_name(&self.name))
            .or_else(|| {
                self.mime_type
                    .as_deref()
                    .and_then(|m| m.split_once('/'))
                    .map(|(_, sub)| sub.to_lowercase())
            })
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// A concrete value for a placeholder
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaceholderInput {
    Video { value: MediaFileRef },
    Audio { value: MediaFileRef },
    Image { value: MediaFileRef },
    Text { value: String },
    /// Transcript identifier understood by the transcript collaborator
    Transcript { value: String },
    Number { value: f64 },
    Color { value: String },
    Font { value: String },
}

impl PlaceholderInput {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    pub fn number(value: f64) -> Self {
        Self::Number { value }
    }

    pub fn video(value: MediaFileRef) -> Self {
        Self::Video { value }
    }

    pub fn audio(value: MediaFileRef) -> Self {
        Self::Audio { value }
    }

    pub fn image(value: MediaFileRef) -> Self {
        Self::Image { value }
    }

    /// Builds a file-backed input of the given media type
    pub fn media(placeholder_type: PlaceholderType, value: MediaFileRef) -> Option<Self> {
        match placeholder_type {
            PlaceholderType::Video => Some(Self::Video { value }),
            PlaceholderType::Audio => Some(Self::Audio { value }),
            PlaceholderType::Image => Some(Self::Image { value }),
            _ => None,
        }
    }

    /// The placeholder type this input satisfies
    pub fn input_type(&self) -> PlaceholderType {
        match self {
            PlaceholderInput::Video { .. } => PlaceholderType::Video,
            PlaceholderInput::Audio { .. } => PlaceholderType::Audio,
            PlaceholderInput::Image { .. } => PlaceholderType::Image,
            PlaceholderInput::Text { .. } => PlaceholderType::Text,
            PlaceholderInput::Transcript { .. } => PlaceholderType::Transcript,
            PlaceholderInput::Number { .. } => PlaceholderType::Number,
            PlaceholderInput::Color { .. } => PlaceholderType::Color,
            PlaceholderInput::Font { .. } => PlaceholderType::Font,
        }
    }

    pub fn media_file(&self) -> Option<&MediaFileRef> {
        match self {
            PlaceholderInput::Video { value }
            | PlaceholderInput::Audio { value }
            | PlaceholderInput::Image { value } => Some(value),
            _ => None,
        }
    }

    pub fn media_file_mut(&mut self) -> Option<&mut MediaFileRef> {
        match self {
            PlaceholderInput::Video { value }
            | PlaceholderInput::Audio { value }
            | PlaceholderInput::Image { value } => Some(value),
            _ => None,
        }
    }

    /// Text form of scalar inputs
    pub fn as_text(&self) -> Option<String> {
        match self {
            PlaceholderInput::Text { value }
            | PlaceholderInput::Transcript { value }
            | PlaceholderInput::Color { value }
            | PlaceholderInput::Font { value } => Some(value.clone()),
            PlaceholderInput::Number { value } => Some(value.to_string()),
            PlaceholderInput::Video { .. }
            | PlaceholderInput::Audio { .. }
            | PlaceholderInput::Image { .. } => None,
        }
    }
}

/// Placeholder inputs keyed by placeholder id
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderInputs {
    #[serde(default)]
    pub placeholders: HashMap<PlaceholderId, PlaceholderInput>,
}

impl PlaceholderInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, input: PlaceholderInput) -> Self {
        self.placeholders.insert(id.into(), input);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, input: PlaceholderInput) {
        self.placeholders.insert(id.into(), input);
    }

    pub fn get(&self, id: &str) -> Option<&PlaceholderInput> {
        self.placeholders.get(id)
    }

    pub fn len(&self) -> usize {
        self.placeholders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placeholders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_json_shape() {
        let inputs: PlaceholderInputs = serde_json::from_str(
            r#"{"placeholders": {"title": {"type": "text", "value": "Hello"}}}"#,
        )
        .unwrap();
        assert_eq!(inputs.get("title"), Some(&PlaceholderInput::text("Hello")));
    }

    #[test]
    fn test_media_input_json_shape() {
        let input: PlaceholderInput = serde_json::from_value(serde_json::json!({
            "type": "video",
            "value": {"id": "m1", "name": "clip.MP4", "metadata": {"durationSec": 12.5}}
        }))
        .unwrap();
        assert_eq!(input.input_type(), PlaceholderType::Video);
        let file = input.media_file().unwrap();
        assert_eq!(file.duration(), Some(12.5));
        assert_eq!(file.format().as_deref(), Some("mp4"));
    }

    #[test]
    fn test_parse_aspect_ratio() {
        assert!((parse_aspect_ratio("16:9").unwrap() - 16.0 / 9.0).abs() < 1e-9);
        assert!((parse_aspect_ratio("9/16").unwrap() - 0.5625).abs() < 1e-9);
        assert_eq!(parse_aspect_ratio("1.5"), Some(1.5));
        assert_eq!(parse_aspect_ratio("16:0"), None);
        assert_eq!(parse_aspect_ratio("wide"), None);
    }

    #[test]
    fn test_format_falls_back_to_mime() {
        let mut file = MediaFileRef::new("m", "blob");
        file.mime_type = Some("audio/MPEG".to_string());
        assert_eq!(file.format().as_deref(), Some("mpeg"));
    }

    #[test]
    fn test_constraints_normalize_formats() {
        let c = PlaceholderConstraints::default().with_formats([".MP4", "mov"]);
        assert_eq!(c.allowed_formats, vec!["mp4", "mov"]);
    }
}
