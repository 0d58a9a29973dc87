//! Template Extractor
//!
//! Turns a concrete editing project into a reusable template: media becomes
//! placeholders, pixel positions become percentages, track roles are inferred
//! and timings are rewritten relative to earlier elements where they line up.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::coords::{anchor_time, to_percent_position};
use super::models::{
    CanvasSettings, ElementContent, ElementDuration, ElementTiming, Template, TemplateElement,
    TemplateTrack, TimingAnchor, TrackRole, TrackType,
};
use super::placeholders::{PlaceholderDefinition, PlaceholderInput, PlaceholderType};
use super::styles::{CaptionAnimation, CaptionStyleDefinition};
use crate::core::project::{MediaFile, MediaKind, SourceElement, SourceElementKind, SourceProject, SourceTrack};
use crate::core::{CoreError, CoreResult, ElementId, MediaId, PlaceholderId, TimeSec, TrackId};

/// Media whose length differs from the element by less than this counts as
/// playing in full
const FULL_SOURCE_TOLERANCE: TimeSec = 1e-3;

/// Audio quieter than this is treated as background music
const BACKGROUND_VOLUME: f32 = 0.5;

// =============================================================================
// Options
// =============================================================================

/// Extraction settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractOptions {
    /// Template name (defaults to the project name)
    pub template_name: Option<String>,
    /// Guess track roles from content; otherwise map track types directly
    pub infer_track_roles: bool,
    /// Roles forced per source track id
    pub role_overrides: HashMap<TrackId, TrackRole>,
    /// Elements sharing a media file share one placeholder
    pub deduplicate_media: bool,
    /// Source media becomes the placeholder default value
    pub include_default_values: bool,
    /// Every text element becomes a text placeholder
    pub promote_text_to_placeholders: bool,
    /// One caption style per caption track
    pub extract_caption_styles: bool,
    /// Rewrite aligned start times as relative timings
    pub detect_relative_timing: bool,
    /// Maximum distance (seconds) for an alignment to count
    pub relative_timing_tolerance: TimeSec,
    /// Untrimmed media playing in full gets a content duration
    pub use_content_durations: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            template_name: None,
            infer_track_roles: true,
            role_overrides: HashMap::new(),
            deduplicate_media: false,
            include_default_values: true,
            promote_text_to_placeholders: false,
            extract_caption_styles: true,
            detect_relative_timing: true,
            relative_timing_tolerance: 0.5,
            use_content_durations: false,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template_name(mut self, name: impl Into<String>) -> Self {
        self.template_name = Some(name.into());
        self
    }

    pub fn with_role_override(mut self, track_id: impl Into<String>, role: TrackRole) -> Self {
        self.role_overrides.insert(track_id.into(), role);
        self
    }

    pub fn with_infer_track_roles(mut self, infer: bool) -> Self {
        self.infer_track_roles = infer;
        self
    }

    pub fn with_deduplicate_media(mut self, dedupe: bool) -> Self {
        self.deduplicate_media = dedupe;
        self
    }

    pub fn with_promote_text(mut self, promote: bool) -> Self {
        self.promote_text_to_placeholders = promote;
        self
    }

    pub fn with_relative_timing(mut self, detect: bool) -> Self {
        self.detect_relative_timing = detect;
        self
    }

    pub fn with_content_durations(mut self, enabled: bool) -> Self {
        self.use_content_durations = enabled;
        self
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Builds a template from a project, its tracks and its media library
pub fn extract(
    project: &SourceProject,
    tracks: &[SourceTrack],
    media_files: &[MediaFile],
    options: &ExtractOptions,
) -> CoreResult<Template> {
    if tracks.is_empty() {
        return Err(CoreError::ExtractionError(
            "project has no tracks".to_string(),
        ));
    }
    let canvas = project.canvas.clone().ok_or_else(|| {
        CoreError::ExtractionError(format!("project '{}' has no canvas settings", project.name))
    })?;

    let media: HashMap<&str, &MediaFile> =
        media_files.iter().map(|m| (m.id.as_str(), m)).collect();
    for track in tracks {
        for element in &track.elements {
            if let Some(media_id) = &element.media_id {
                if !media.contains_key(media_id.as_str()) {
                    return Err(CoreError::ExtractionError(format!(
                        "element '{}' references unknown media file '{}'",
                        element.name, media_id
                    )));
                }
            }
        }
    }

    let roles = assign_roles(tracks, &media, &canvas, options);

    let mut template = Template::new(
        options
            .template_name
            .clone()
            .unwrap_or_else(|| project.name.clone()),
        canvas,
    )
    .with_description(project.description.clone());
    template.source_project_id = Some(project.id.clone());

    let mut state = ExtractState {
        options,
        media: &media,
        emitted: Vec::new(),
        media_placeholders: HashMap::new(),
        relative_count: 0,
    };

    for (track, role) in tracks.iter().zip(roles) {
        let mut template_track = TemplateTrack::new(track.name.clone(), track.track_type, role)
            .with_muted(track.muted);
        template_track.volume = track.volume;
        template_track.is_main = role == TrackRole::MainVideo;

        let caption_style_id = if role == TrackRole::Caption && options.extract_caption_styles {
            caption_style_for(track, &template.canvas).map(|style| {
                let id = style.id.clone();
                template.caption_styles.push(style);
                id
            })
        } else {
            None
        };

        for element in &track.elements {
            let mut extracted = state.extract_element(&mut template, role, element)?;
            if element.kind == SourceElementKind::Text {
                extracted.caption_style_id = caption_style_id.clone();
            }
            template_track.elements.push(extracted);
        }
        template.tracks.push(template_track);
    }

    info!(
        "Extracted template '{}' from project {}: {} tracks, {} elements, {} placeholders, {} relative timings",
        template.name,
        project.id,
        template.tracks.len(),
        template.element_count(),
        template.placeholders.len(),
        state.relative_count
    );
    Ok(template)
}

/// An element already written to the template, for relative timing
struct Emitted {
    id: ElementId,
    start: TimeSec,
    duration: TimeSec,
}

struct ExtractState<'a> {
    options: &'a ExtractOptions,
    media: &'a HashMap<&'a str, &'a MediaFile>,
    emitted: Vec<Emitted>,
    media_placeholders: HashMap<MediaId, PlaceholderId>,
    relative_count: usize,
}

impl ExtractState<'_> {
    fn extract_element(
        &mut self,
        template: &mut Template,
        role: TrackRole,
        element: &SourceElement,
    ) -> CoreResult<TemplateElement> {
        let canvas = template.canvas.size();
        let media = self.media;
        let source = element
            .media_id
            .as_deref()
            .and_then(|id| media.get(id).copied());

        let content = match (element.kind, source) {
            (_, Some(file)) => {
                ElementContent::placeholder(self.media_placeholder(template, role, element, file))
            }
            (SourceElementKind::Text, None) => {
                let text = element.text.clone().unwrap_or_default();
                if self.options.promote_text_to_placeholders || element.mark_as_placeholder {
                    let placeholder = PlaceholderDefinition::new(element.name.clone(), PlaceholderType::Text)
                        .with_order(template.placeholders.len() as u32)
                        .with_default(PlaceholderInput::text(text));
                    let id = placeholder.id.clone();
                    template.placeholders.push(placeholder);
                    ElementContent::placeholder(id)
                } else {
                    ElementContent::static_text(text)
                }
            }
            (kind, None) => {
                debug!("Element {} ({:?}) has no media; kept as static", element.id, kind);
                ElementContent::Static {
                    text: element.text.clone(),
                    source: None,
                }
            }
        };

        let duration = match source {
            Some(file) if self.options.use_content_durations && plays_in_full(element, file) => {
                ElementDuration::Content {
                    max_duration: None,
                    hint: file.metadata.duration_sec,
                }
            }
            _ => ElementDuration::fixed(element.duration),
        };

        let timing = self.timing_for(element.start_time);

        let mut extracted = TemplateElement::new(element.name.clone(), timing, duration, content);
        if element.kind == SourceElementKind::Text {
            extracted.style = element.style.clone();
        }
        extracted.position = element
            .position
            .as_ref()
            .map(|p| to_percent_position(p, canvas));
        extracted.hidden = element.hidden;
        extracted.muted = element.muted;

        self.emitted.push(Emitted {
            id: extracted.id.clone(),
            start: element.start_time,
            duration: element.duration,
        });
        Ok(extracted)
    }

    fn media_placeholder(
        &mut self,
        template: &mut Template,
        role: TrackRole,
        element: &SourceElement,
        file: &MediaFile,
    ) -> PlaceholderId {
        if self.options.deduplicate_media {
            if let Some(id) = self.media_placeholders.get(&file.id) {
                return id.clone();
            }
        }

        let placeholder_type = file.kind.placeholder_type();
        let mut placeholder = PlaceholderDefinition::new(element.name.clone(), placeholder_type)
            .with_required(role == TrackRole::MainVideo)
            .with_order(template.placeholders.len() as u32);
        if self.options.include_default_values {
            if let Some(default) = PlaceholderInput::media(placeholder_type, file.to_ref()) {
                placeholder = placeholder.with_default(default);
            }
        }

        let id = placeholder.id.clone();
        template.placeholders.push(placeholder);
        self.media_placeholders.insert(file.id.clone(), id.clone());
        id
    }

    /// Relative timing against the closest aligned earlier element, if any
    fn timing_for(&mut self, start: TimeSec) -> ElementTiming {
        if !self.options.detect_relative_timing {
            return ElementTiming::absolute(start);
        }
        let tolerance = self.options.relative_timing_tolerance;

        let mut best: Option<(&Emitted, TimingAnchor, TimeSec)> = None;
        for candidate in &self.emitted {
            for anchor in [TimingAnchor::End, TimingAnchor::Start] {
                let point = anchor_time(candidate.start, candidate.duration, anchor);
                let distance = (start - point).abs();
                if distance <= tolerance && best.map_or(true, |(_, _, d)| distance < d) {
                    best = Some((candidate, anchor, distance));
                }
            }
        }

        match best {
            Some((candidate, anchor, _)) => {
                self.relative_count += 1;
                let point = anchor_time(candidate.start, candidate.duration, anchor);
                ElementTiming::relative(candidate.id.clone(), start - point, anchor)
            }
            None => ElementTiming::absolute(start),
        }
    }
}

fn plays_in_full(element: &SourceElement, file: &MediaFile) -> bool {
    file.kind != MediaKind::Image
        && element.trim_start.abs() < FULL_SOURCE_TOLERANCE
        && file
            .metadata
            .duration_sec
            .is_some_and(|d| (d - element.duration).abs() < FULL_SOURCE_TOLERANCE)
}

fn caption_style_for(track: &SourceTrack, canvas: &CanvasSettings) -> Option<CaptionStyleDefinition> {
    let first = track
        .elements
        .iter()
        .find(|e| e.kind == SourceElementKind::Text)?;
    let mut style = CaptionStyleDefinition::new(
        format!("{} style", track.name),
        first.style.clone().unwrap_or_default(),
    )
    .with_animation(
        first
            .caption_animation
            .as_deref()
            .map_or(CaptionAnimation::None, CaptionAnimation::from_name),
    );
    if let Some(words) = first.words_per_group {
        style = style.with_words_per_group(words);
    }
    if let Some(position) = &first.position {
        style = style.with_placement_from_y(to_percent_position(position, canvas.size()).y_percent);
    }
    Some(style)
}

// =============================================================================
// Role Inference
// =============================================================================

fn assign_roles(
    tracks: &[SourceTrack],
    media: &HashMap<&str, &MediaFile>,
    canvas: &CanvasSettings,
    options: &ExtractOptions,
) -> Vec<TrackRole> {
    let main_index = if options.infer_track_roles {
        tracks
            .iter()
            .position(|t| t.track_type == TrackType::Media && t.is_main)
            .or_else(|| {
                tracks
                    .iter()
                    .position(|t| t.track_type == TrackType::Media && is_full_canvas_video(t, media, canvas))
            })
    } else if options.role_overrides.values().any(|r| *r == TrackRole::MainVideo) {
        None
    } else {
        // First media track the caller did not assign
        tracks.iter().position(|t| {
            t.track_type == TrackType::Media && !options.role_overrides.contains_key(&t.id)
        })
    };

    tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            if let Some(role) = options.role_overrides.get(&track.id) {
                return *role;
            }
            if Some(i) == main_index {
                return TrackRole::MainVideo;
            }
            if !options.infer_track_roles {
                return match track.track_type {
                    TrackType::Media => TrackRole::BRoll,
                    other => TrackRole::default_for(other),
                };
            }
            infer_role(track, media, canvas)
        })
        .collect()
}

fn infer_role(track: &SourceTrack, media: &HashMap<&str, &MediaFile>, canvas: &CanvasSettings) -> TrackRole {
    let name = track.name.to_lowercase();
    match track.track_type {
        TrackType::Audio => {
            if track.muted || track.volume < BACKGROUND_VOLUME || name.contains("music") {
                TrackRole::BackgroundMusic
            } else if name.contains("voice") || name.contains("narration") {
                TrackRole::Voiceover
            } else if name.contains("sfx") {
                TrackRole::SoundEffect
            } else {
                TrackRole::BackgroundMusic
            }
        }
        TrackType::Text => {
            if name.contains("caption") || name.contains("subtitle") {
                TrackRole::Caption
            } else {
                TrackRole::Title
            }
        }
        TrackType::Media => {
            let image_only = !track.elements.is_empty()
                && track.elements.iter().all(|e| {
                    e.media_id
                        .as_deref()
                        .and_then(|id| media.get(id))
                        .is_some_and(|m| m.kind == MediaKind::Image)
                });
            let small = !track.elements.is_empty()
                && track.elements.iter().all(|e| is_small(e, canvas));
            if image_only || small {
                TrackRole::Overlay
            } else {
                TrackRole::BRoll
            }
        }
    }
}

/// At least one video element, and every element covers the canvas
fn is_full_canvas_video(
    track: &SourceTrack,
    media: &HashMap<&str, &MediaFile>,
    canvas: &CanvasSettings,
) -> bool {
    let has_video = track.elements.iter().any(|e| {
        e.media_id
            .as_deref()
            .and_then(|id| media.get(id))
            .is_some_and(|m| m.kind == MediaKind::Video)
    });
    has_video && track.elements.iter().all(|e| covers_canvas(e, canvas))
}

fn covers_canvas(element: &SourceElement, canvas: &CanvasSettings) -> bool {
    let Some(position) = &element.position else {
        return true;
    };
    let (w, h) = (canvas.width as f64, canvas.height as f64);
    let centered = position.x.abs() <= w * 0.05 && position.y.abs() <= h * 0.05;
    let wide = position.width.map_or(true, |pw| pw >= w * 0.95);
    let tall = position.height.map_or(true, |ph| ph >= h * 0.95);
    centered && wide && tall
}

fn is_small(element: &SourceElement, canvas: &CanvasSettings) -> bool {
    match &element.position {
        Some(p) => match (p.width, p.height) {
            (Some(w), Some(h)) => w < canvas.width as f64 * 0.5 && h < canvas.height as f64 * 0.5,
            _ => false,
        },
        None => false,
    }
}
