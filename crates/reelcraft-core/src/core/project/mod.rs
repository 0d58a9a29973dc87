//! Source Project Model
//!
//! The normalized editing-project representation the extractor reads:
//! a project, its tracks with placed elements, and the media files those
//! elements reference. Positions are pixel offsets from the canvas centre.

use serde::{Deserialize, Serialize};

use crate::core::template::{
    CanvasSettings, MediaFileRef, MediaMetadata, PixelPosition, PlaceholderType,
    TextStyleDefinition, TrackType,
};
use crate::core::{new_id, ElementId, MediaId, TimeSec, TrackId};

// =============================================================================
// Project
// =============================================================================

/// Project-level settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Missing canvas settings make a project unextractable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CanvasSettings>,
}

impl SourceProject {
    pub fn new(name: impl Into<String>, canvas: CanvasSettings) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            canvas: Some(canvas),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// =============================================================================
// Media
// =============================================================================

/// Kind of a media file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    pub fn placeholder_type(&self) -> PlaceholderType {
        match self {
            MediaKind::Video => PlaceholderType::Video,
            MediaKind::Audio => PlaceholderType::Audio,
            MediaKind::Image => PlaceholderType::Image,
        }
    }
}

/// A media file in the project library
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: MediaId,
    pub name: String,
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub metadata: MediaMetadata,
}

impl MediaFile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            path: None,
            mime_type: None,
            metadata: MediaMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Reference used in placeholder defaults and generated content
    pub fn to_ref(&self) -> MediaFileRef {
        MediaFileRef {
            id: self.id.clone(),
            name: self.name.clone(),
            path: self.path.clone(),
            mime_type: self.mime_type.clone(),
            metadata: Some(self.metadata.clone()),
        }
    }
}

// =============================================================================
// Elements
// =============================================================================

/// Kind of a placed element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceElementKind {
    Video,
    Audio,
    Image,
    Text,
}

/// An element placed on a track
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceElement {
    pub id: ElementId,
    pub name: String,
    pub kind: SourceElementKind,
    pub start_time: TimeSec,
    pub duration: TimeSec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<MediaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyleDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PixelPosition>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub muted: bool,
    /// Seconds cut from the start of the source media
    #[serde(default)]
    pub trim_start: TimeSec,
    /// Turn this text into a text placeholder
    #[serde(default)]
    pub mark_as_placeholder: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_animation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words_per_group: Option<u32>,
}

impl SourceElement {
    fn base(name: impl Into<String>, kind: SourceElementKind, start_time: TimeSec, duration: TimeSec) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            kind,
            start_time,
            duration,
            media_id: None,
            text: None,
            style: None,
            position: None,
            hidden: false,
            muted: false,
            trim_start: 0.0,
            mark_as_placeholder: false,
            caption_animation: None,
            words_per_group: None,
        }
    }

    /// Element playing a media file
    pub fn media(
        name: impl Into<String>,
        kind: SourceElementKind,
        media_id: impl Into<String>,
        start_time: TimeSec,
        duration: TimeSec,
    ) -> Self {
        let mut element = Self::base(name, kind, start_time, duration);
        element.media_id = Some(media_id.into());
        element
    }

    /// Text element
    pub fn text(name: impl Into<String>, text: impl Into<String>, start_time: TimeSec, duration: TimeSec) -> Self {
        let mut element = Self::base(name, SourceElementKind::Text, start_time, duration);
        element.text = Some(text.into());
        element
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_position(mut self, position: PixelPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_style(mut self, style: TextStyleDefinition) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_trim_start(mut self, trim_start: TimeSec) -> Self {
        self.trim_start = trim_start;
        self
    }

    pub fn marked_as_placeholder(mut self) -> Self {
        self.mark_as_placeholder = true;
        self
    }

    pub fn end_time(&self) -> TimeSec {
        self.start_time + self.duration
    }
}

// =============================================================================
// Tracks
// =============================================================================

/// A track of the source project
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTrack {
    pub id: TrackId,
    pub name: String,
    #[serde(rename = "type")]
    pub track_type: TrackType,
    #[serde(default)]
    pub elements: Vec<SourceElement>,
    #[serde(default)]
    pub muted: bool,
    /// Volume (0.0 - 2.0, 1.0 = 100%)
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub is_main: bool,
}

fn default_volume() -> f32 {
    1.0
}

impl SourceTrack {
    pub fn new(name: impl Into<String>, track_type: TrackType) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            track_type,
            elements: Vec::new(),
            muted: false,
            volume: 1.0,
            is_main: false,
        }
    }

    pub fn with_element(mut self, element: SourceElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn end_time(&self) -> TimeSec {
        self.elements
            .iter()
            .map(SourceElement::end_time)
            .fold(0.0, f64::max)
    }
}
