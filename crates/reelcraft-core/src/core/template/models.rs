//! Template Models
//!
//! Core data structures for parameterized project templates.
//! A template is the compiler's IR: tracks of elements whose timing, duration,
//! content and position are expressed symbolically so they can be resolved
//! against new inputs and new canvas sizes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::placeholders::PlaceholderDefinition;
use super::styles::{CaptionStyleDefinition, TextStyleDefinition};
use crate::core::automation::AutomationRule;
use crate::core::{new_id, ElementId, PlaceholderId, Size2D, TemplateId, TimeSec, TrackId};

/// The only template document version this library reads and writes
pub const TEMPLATE_VERSION: &str = "1.0";

// =============================================================================
// Canvas
// =============================================================================

/// Canvas settings copied from the source project
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSettings {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Background color in hex format
    #[serde(default = "default_background")]
    pub background: String,
}

fn default_fps() -> f64 {
    30.0
}

fn default_background() -> String {
    "#000000".to_string()
}

impl CanvasSettings {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fps: default_fps(),
            background: default_background(),
        }
    }

    /// Vertical 1080x1920 canvas
    pub fn vertical_1080() -> Self {
        Self::new(1080, 1920)
    }

    /// Landscape 1920x1080 canvas
    pub fn landscape_1080() -> Self {
        Self::new(1920, 1080)
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    /// Returns the canvas size used as the normalization basis for positions
    pub fn size(&self) -> Size2D {
        Size2D::new(self.width, self.height)
    }
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self::landscape_1080()
    }
}

// =============================================================================
// Tracks
// =============================================================================

/// Track type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    Media,
    Text,
    Audio,
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackType::Media => write!(f, "media"),
            TrackType::Text => write!(f, "text"),
            TrackType::Audio => write!(f, "audio"),
        }
    }
}

/// Semantic role of a track, used to guide automation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackRole {
    MainVideo,
    BRoll,
    Caption,
    Title,
    BackgroundMusic,
    Voiceover,
    SoundEffect,
    Overlay,
}

impl TrackRole {
    /// Role used when heuristics are disabled
    pub fn default_for(track_type: TrackType) -> Self {
        match track_type {
            TrackType::Media => TrackRole::MainVideo,
            TrackType::Text => TrackRole::Caption,
            TrackType::Audio => TrackRole::BackgroundMusic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackRole::MainVideo => "main_video",
            TrackRole::BRoll => "b_roll",
            TrackRole::Caption => "caption",
            TrackRole::Title => "title",
            TrackRole::BackgroundMusic => "background_music",
            TrackRole::Voiceover => "voiceover",
            TrackRole::SoundEffect => "sound_effect",
            TrackRole::Overlay => "overlay",
        }
    }
}

/// A track of template elements
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTrack {
    pub id: TrackId,
    pub name: String,
    #[serde(rename = "type")]
    pub track_type: TrackType,
    pub role: TrackRole,
    #[serde(default)]
    pub elements: Vec<TemplateElement>,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub is_main: bool,
    /// Volume for audio tracks (0.0 - 2.0, 1.0 = 100%)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_volume() -> f32 {
    1.0
}

impl TemplateTrack {
    pub fn new(name: impl Into<String>, track_type: TrackType, role: TrackRole) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            track_type,
            role,
            elements: Vec::new(),
            muted: false,
            is_main: role == TrackRole::MainVideo,
            volume: default_volume(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_element(mut self, element: TemplateElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }
}

// =============================================================================
// Element Timing / Duration / Content
// =============================================================================

/// Reference point on an anchor element
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingAnchor {
    #[default]
    Start,
    End,
}

/// When an element starts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementTiming {
    /// Fixed start time on the timeline
    #[serde(rename_all = "camelCase")]
    Absolute { start_time: TimeSec },
    /// Offset from the start or end of another element
    #[serde(rename_all = "camelCase")]
    Relative {
        relative_to: ElementId,
        #[serde(default)]
        offset: TimeSec,
        #[serde(default)]
        anchor: TimingAnchor,
    },
    /// Decided by automation rules after generation
    #[serde(rename_all = "camelCase")]
    Dynamic {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
}

impl ElementTiming {
    pub fn absolute(start_time: TimeSec) -> Self {
        Self::Absolute { start_time }
    }

    pub fn relative(relative_to: impl Into<String>, offset: TimeSec, anchor: TimingAnchor) -> Self {
        Self::Relative {
            relative_to: relative_to.into(),
            offset,
            anchor,
        }
    }

    /// Returns the referenced element for relative timing
    pub fn anchor_id(&self) -> Option<&str> {
        match self {
            ElementTiming::Relative { relative_to, .. } => Some(relative_to),
            ElementTiming::Absolute { .. } | ElementTiming::Dynamic { .. } => None,
        }
    }
}

/// How long an element lasts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementDuration {
    /// Literal duration in seconds
    #[serde(rename_all = "camelCase")]
    Fixed { value: TimeSec },
    /// Duration of the bound media
    #[serde(rename_all = "camelCase")]
    Content {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_duration: Option<TimeSec>,
        /// Source duration at extraction time
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<TimeSec>,
    },
    /// Duration of an audio placeholder
    #[serde(rename_all = "camelCase")]
    MatchAudio {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder_id: Option<PlaceholderId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<TimeSec>,
    },
    /// Extends to the next element on the track (or the end of the timeline)
    #[serde(rename_all = "camelCase")]
    FillGap {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_duration: Option<TimeSec>,
    },
}

impl ElementDuration {
    pub fn fixed(value: TimeSec) -> Self {
        Self::Fixed { value }
    }

    pub fn content() -> Self {
        Self::Content {
            max_duration: None,
            hint: None,
        }
    }

    pub fn fill_gap() -> Self {
        Self::FillGap { max_duration: None }
    }
}

/// Transcript segment granularity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentGranularity {
    Word,
    Phrase,
    #[default]
    Sentence,
}

/// What an element shows or plays
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementContent {
    /// Filled from a placeholder input
    #[serde(rename_all = "camelCase")]
    Placeholder { placeholder_id: PlaceholderId },
    /// A segment of a transcript
    #[serde(rename_all = "camelCase")]
    Transcript {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder_id: Option<PlaceholderId>,
        #[serde(default)]
        granularity: SegmentGranularity,
        #[serde(default)]
        index: usize,
    },
    /// Literal content copied verbatim
    #[serde(rename_all = "camelCase")]
    Static {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<super::placeholders::MediaFileRef>,
    },
    /// Produced by a named generator at interpretation time
    #[serde(rename_all = "camelCase")]
    Generated {
        generator: String,
        #[serde(default)]
        params: serde_json::Map<String, serde_json::Value>,
    },
}

impl ElementContent {
    pub fn placeholder(placeholder_id: impl Into<String>) -> Self {
        Self::Placeholder {
            placeholder_id: placeholder_id.into(),
        }
    }

    pub fn static_text(text: impl Into<String>) -> Self {
        Self::Static {
            text: Some(text.into()),
            source: None,
        }
    }

    /// Returns every placeholder id this content refers to
    pub fn placeholder_ref(&self) -> Option<&str> {
        match self {
            ElementContent::Placeholder { placeholder_id } => Some(placeholder_id),
            ElementContent::Transcript { placeholder_id, .. } => placeholder_id.as_deref(),
            ElementContent::Static { .. } | ElementContent::Generated { .. } => None,
        }
    }
}

// =============================================================================
// Position
// =============================================================================

/// Resolution-independent position.
///
/// Percentages are offsets of the element centre from the canvas centre,
/// relative to the canvas size, so on-canvas values lie in [-50, 50].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentPosition {
    pub x_percent: f64,
    pub y_percent: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_percent: Option<f64>,
}

impl PercentPosition {
    pub fn new(x_percent: f64, y_percent: f64) -> Self {
        Self {
            x_percent,
            y_percent,
            ..Default::default()
        }
    }

    /// Returns true if the centre lies on the canvas
    pub fn is_on_canvas(&self) -> bool {
        (-50.0..=50.0).contains(&self.x_percent) && (-50.0..=50.0).contains(&self.y_percent)
    }
}

// =============================================================================
// Element
// =============================================================================

/// A template element
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateElement {
    pub id: ElementId,
    pub name: String,
    pub timing: ElementTiming,
    pub duration: ElementDuration,
    pub content: ElementContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyleDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_style_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PercentPosition>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub muted: bool,
}

impl TemplateElement {
    pub fn new(
        name: impl Into<String>,
        timing: ElementTiming,
        duration: ElementDuration,
        content: ElementContent,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            timing,
            duration,
            content,
            style: None,
            caption_style_id: None,
            position: None,
            hidden: false,
            muted: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_style(mut self, style: TextStyleDefinition) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_position(mut self, position: PercentPosition) -> Self {
        self.position = Some(position);
        self
    }
}

// =============================================================================
// Template
// =============================================================================

/// A parameterized, reusable project description
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub version: String,
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_project_id: Option<String>,
    pub canvas: CanvasSettings,
    #[serde(default)]
    pub tracks: Vec<TemplateTrack>,
    #[serde(default)]
    pub rules: Vec<AutomationRule>,
    #[serde(default)]
    pub caption_styles: Vec<CaptionStyleDefinition>,
    #[serde(default)]
    pub placeholders: Vec<PlaceholderDefinition>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Template {
    /// Creates an empty template
    pub fn new(name: impl Into<String>, canvas: CanvasSettings) -> Self {
        let now = Utc::now();
        Self {
            version: TEMPLATE_VERSION.to_string(),
            id: new_id(),
            name: name.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
            source_project_id: None,
            canvas,
            tracks: Vec::new(),
            rules: Vec::new(),
            caption_styles: Vec::new(),
            placeholders: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_track(mut self, track: TemplateTrack) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn with_placeholder(mut self, placeholder: PlaceholderDefinition) -> Self {
        self.placeholders.push(placeholder);
        self
    }

    pub fn with_rule(mut self, rule: AutomationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_caption_style(mut self, style: CaptionStyleDefinition) -> Self {
        self.caption_styles.push(style);
        self
    }

    /// Gets a placeholder by id
    pub fn placeholder(&self, id: &str) -> Option<&PlaceholderDefinition> {
        self.placeholders.iter().find(|p| p.id == id)
    }

    /// Gets a placeholder by display name
    pub fn placeholder_by_name(&self, name: &str) -> Option<&PlaceholderDefinition> {
        self.placeholders.iter().find(|p| p.name == name)
    }

    /// Gets a caption style by id
    pub fn caption_style(&self, id: &str) -> Option<&CaptionStyleDefinition> {
        self.caption_styles.iter().find(|s| s.id == id)
    }

    /// Iterates over every element together with its track
    pub fn elements(&self) -> impl Iterator<Item = (&TemplateTrack, &TemplateElement)> {
        self.tracks
            .iter()
            .flat_map(|t| t.elements.iter().map(move |e| (t, e)))
    }

    /// Gets an element by id
    pub fn element(&self, id: &str) -> Option<&TemplateElement> {
        self.elements().map(|(_, e)| e).find(|e| e.id == id)
    }

    /// Total number of elements across all tracks
    pub fn element_count(&self) -> usize {
        self.tracks.iter().map(|t| t.elements.len()).sum()
    }

    /// Placeholders sorted by their display order
    pub fn ordered_placeholders(&self) -> Vec<&PlaceholderDefinition> {
        let mut placeholders: Vec<_> = self.placeholders.iter().collect();
        placeholders.sort_by_key(|p| p.order);
        placeholders
    }

    /// Marks the template as modified
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::placeholders::PlaceholderType;

    #[test]
    fn test_template_new_has_version_and_id() {
        let template = Template::new("Promo", CanvasSettings::vertical_1080());
        assert_eq!(template.version, TEMPLATE_VERSION);
        assert!(!template.id.is_empty());
        assert_eq!(template.canvas.size(), Size2D::new(1080, 1920));
    }

    #[test]
    fn test_timing_serializes_as_tagged_union() {
        let timing = ElementTiming::relative("A", 1.0, TimingAnchor::End);
        let json = serde_json::to_value(&timing).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "relative", "relativeTo": "A", "offset": 1.0, "anchor": "end"})
        );

        let parsed: ElementDuration =
            serde_json::from_str(r#"{"type":"fill_gap","maxDuration":3.0}"#).unwrap();
        assert_eq!(
            parsed,
            ElementDuration::FillGap {
                max_duration: Some(3.0)
            }
        );
    }

    #[test]
    fn test_relative_anchor_defaults_to_start() {
        let timing: ElementTiming =
            serde_json::from_str(r#"{"type":"relative","relativeTo":"video"}"#).unwrap();
        assert_eq!(timing, ElementTiming::relative("video", 0.0, TimingAnchor::Start));
    }

    #[test]
    fn test_template_lookup_helpers() {
        let template = Template::new("Lookup", CanvasSettings::default())
            .with_placeholder(
                PlaceholderDefinition::new("Title", PlaceholderType::Text).with_id("title"),
            )
            .with_track(
                TemplateTrack::new("Titles", TrackType::Text, TrackRole::Title).with_element(
                    TemplateElement::new(
                        "Heading",
                        ElementTiming::absolute(0.0),
                        ElementDuration::fixed(2.0),
                        ElementContent::placeholder("title"),
                    )
                    .with_id("heading"),
                ),
            );

        assert!(template.placeholder("title").is_some());
        assert!(template.placeholder_by_name("Title").is_some());
        assert_eq!(template.element("heading").unwrap().name, "Heading");
        assert_eq!(template.element_count(), 1);
    }

    #[test]
    fn test_position_on_canvas() {
        assert!(PercentPosition::new(50.0, -50.0).is_on_canvas());
        assert!(!PercentPosition::new(50.1, 0.0).is_on_canvas());
    }

    #[test]
    fn test_generic_role_mapping() {
        assert_eq!(TrackRole::default_for(TrackType::Media), TrackRole::MainVideo);
        assert_eq!(TrackRole::default_for(TrackType::Text), TrackRole::Caption);
        assert_eq!(
            TrackRole::default_for(TrackType::Audio),
            TrackRole::BackgroundMusic
        );
    }
}
