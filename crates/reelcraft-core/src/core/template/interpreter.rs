//! Template Interpreter
//!
//! Turns a template plus placeholder inputs into a concrete generated
//! project: inputs are prepared and validated, timings resolved, positions
//! converted to pixels and content substituted. Any failure aborts the call;
//! no partially resolved project is ever returned.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::collaborators::{
    GeneratorRegistry, MediaInfoProvider, NoMediaInfo, TranscriptSegment, TranscriptSource,
};
use super::coords::to_pixel_position;
use super::generated::{
    GeneratedContent, GeneratedElement, GeneratedProject, GeneratedTrack, GenerationMetadata,
};
use super::models::{
    CanvasSettings, ElementContent, ElementDuration, SegmentGranularity, Template,
    TemplateElement, TemplateTrack, TrackType,
};
use super::placeholders::{PlaceholderInput, PlaceholderInputs, PlaceholderType};
use super::timing::{resolve_timings, ResolvedTiming};
use super::validator::{unknown_placeholder_issues, validate_placeholder_inputs};
use crate::core::automation::{apply_rules, RuleReport};
use crate::core::{new_id, CoreError, CoreResult, PlaceholderId, Size2D, TimeSec};

// =============================================================================
// Options
// =============================================================================

/// Per-call interpretation settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InterpreterOptions {
    /// Canvas to generate for (defaults to the template canvas)
    pub target_canvas: Option<CanvasSettings>,
    /// Audio placeholder used by `match_audio` elements that name none
    pub match_audio_placeholder: Option<PlaceholderId>,
    /// Timeline end for trailing `fill_gap` elements
    pub timeline_duration: Option<TimeSec>,
    /// Name of the generated project (defaults to the template name)
    pub project_name: Option<String>,
}

impl InterpreterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_canvas(mut self, canvas: CanvasSettings) -> Self {
        self.target_canvas = Some(canvas);
        self
    }

    pub fn with_match_audio_placeholder(mut self, placeholder_id: impl Into<String>) -> Self {
        self.match_audio_placeholder = Some(placeholder_id.into());
        self
    }

    pub fn with_timeline_duration(mut self, duration: TimeSec) -> Self {
        self.timeline_duration = Some(duration);
        self
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }
}

/// Inputs after defaults and media probing
#[derive(Clone, Debug, Default)]
pub struct PreparedInputs {
    pub inputs: PlaceholderInputs,
    pub used: Vec<PlaceholderId>,
    pub defaults_applied: Vec<PlaceholderId>,
}

// =============================================================================
// Interpreter
// =============================================================================

/// Interpretation context holding the injected collaborators
#[derive(Clone)]
pub struct Interpreter {
    media_info: Arc<dyn MediaInfoProvider>,
    transcripts: Option<Arc<dyn TranscriptSource>>,
    generators: GeneratorRegistry,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("media_info", &self.media_info.name())
            .field("transcripts", &self.transcripts.is_some())
            .field("generators", &self.generators)
            .finish()
    }
}

impl Interpreter {
    /// Interpreter without media probing, transcripts or generators
    pub fn new() -> Self {
        Self {
            media_info: Arc::new(NoMediaInfo),
            transcripts: None,
            generators: GeneratorRegistry::new(),
        }
    }

    pub fn with_media_info(mut self, provider: Arc<dyn MediaInfoProvider>) -> Self {
        self.media_info = provider;
        self
    }

    pub fn with_transcripts(mut self, source: Arc<dyn TranscriptSource>) -> Self {
        self.transcripts = Some(source);
        self
    }

    pub fn with_generators(mut self, generators: GeneratorRegistry) -> Self {
        self.generators = generators;
        self
    }

    /// Applies defaults for absent inputs and probes media without metadata.
    ///
    /// Provider failures propagate unchanged.
    pub async fn prepare_inputs(
        &self,
        template: &Template,
        inputs: &PlaceholderInputs,
    ) -> CoreResult<PreparedInputs> {
        let mut prepared = PreparedInputs {
            inputs: inputs.clone(),
            ..Default::default()
        };

        for placeholder in template.ordered_placeholders() {
            if inputs.get(&placeholder.id).is_some() {
                prepared.used.push(placeholder.id.clone());
            } else if let Some(default) = &placeholder.default_value {
                prepared.inputs.insert(placeholder.id.clone(), default.clone());
                prepared.defaults_applied.push(placeholder.id.clone());
            }
        }

        for input in prepared.inputs.placeholders.values_mut() {
            let Some(media) = input.media_file_mut() else {
                continue;
            };
            if media.metadata.is_some() {
                continue;
            }
            if let Some(metadata) = self.media_info.probe(media).await? {
                debug!(
                    "Probed '{}' with {}: {:?}",
                    media.name,
                    self.media_info.name(),
                    metadata
                );
                media.metadata = Some(metadata);
            }
        }

        Ok(prepared)
    }

    /// Generates a project from a template and inputs
    pub async fn interpret(
        &self,
        template: &Template,
        inputs: &PlaceholderInputs,
        options: &InterpreterOptions,
    ) -> CoreResult<GeneratedProject> {
        let prepared = self.prepare_inputs(template, inputs).await?;
        self.interpret_prepared(template, prepared, options)
    }

    /// Generates a project and applies the template's own rules to it
    pub async fn interpret_with_rules(
        &self,
        template: &Template,
        inputs: &PlaceholderInputs,
        options: &InterpreterOptions,
    ) -> CoreResult<(GeneratedProject, RuleReport)> {
        let mut project = self.interpret(template, inputs, options).await?;
        let report = apply_rules(&mut project, &template.rules)?;
        Ok((project, report))
    }

    /// Synchronous part of interpretation, after inputs are prepared
    pub fn interpret_prepared(
        &self,
        template: &Template,
        prepared: PreparedInputs,
        options: &InterpreterOptions,
    ) -> CoreResult<GeneratedProject> {
        let inputs = &prepared.inputs;

        let dangling = unknown_placeholder_issues(template);
        if !dangling.is_empty() {
            return Err(CoreError::PlaceholderValidation(dangling));
        }

        let validation = validate_placeholder_inputs(&template.placeholders, inputs);
        if !validation.is_valid() {
            return Err(CoreError::PlaceholderValidation(validation.errors));
        }
        check_input_types(template, inputs)?;

        let timings = resolve_timings(template, options.timeline_duration, |element| {
            resolve_duration(element, inputs, options)
        })?;

        let canvas = options
            .target_canvas
            .clone()
            .unwrap_or_else(|| template.canvas.clone());
        let size = canvas.size();

        let mut element_id_map = BTreeMap::new();
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

                let Some(content) = self.substitute(track, element, inputs)? else {
                    debug!("Dropping element {} with no input", element.id);
                    continue;
                };

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
            name: options
                .project_name
                .clone()
                .unwrap_or_else(|| template.name.clone()),
            canvas,
            tracks,
            duration: 0.0,
            metadata: GenerationMetadata {
                template_id: template.id.clone(),
                template_name: template.name.clone(),
                generated_at: chrono::Utc::now(),
                placeholders_used: prepared.used,
                defaults_applied: prepared.defaults_applied,
                element_id_map,
                rule_effects: Vec::new(),
            },
        };
        project.recompute_duration();

        info!(
            "Interpreted template {} into project {}: {} tracks, {} elements, {:.2}s",
            template.id,
            project.id,
            project.tracks.len(),
            project.element_count(),
            project.duration
        );
        Ok(project)
    }

    /// Returns `None` when an optional placeholder has no value
    fn substitute(
        &self,
        track: &TemplateTrack,
        element: &TemplateElement,
        inputs: &PlaceholderInputs,
    ) -> CoreResult<Option<GeneratedContent>> {
        match &element.content {
            ElementContent::Placeholder { placeholder_id } => {
                let Some(input) = inputs.get(placeholder_id) else {
                    return Ok(None);
                };
                if let PlaceholderInput::Transcript { value } = input {
                    let segments = self.transcript_segments(Some(value), SegmentGranularity::Sentence)?;
                    let text = segments
                        .iter()
                        .map(|s| s.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" ");
                    return Ok(Some(GeneratedContent::text(text)));
                }
                coerce_input(placeholder_id, input, track.track_type).map(Some)
            }
            ElementContent::Transcript {
                placeholder_id,
                granularity,
                index,
            } => {
                let transcript = placeholder_id
                    .as_deref()
                    .and_then(|id| inputs.get(id))
                    .and_then(PlaceholderInput::as_text);
                let segments = self.transcript_segments(transcript.as_deref(), *granularity)?;
                let segment = segments.get(*index).ok_or_else(|| {
                    CoreError::SegmentIndexOutOfRange {
                        element_id: element.id.clone(),
                        index: *index,
                        available: segments.len(),
                    }
                })?;
                Ok(Some(GeneratedContent::text(segment.text.clone())))
            }
            ElementContent::Static { .. } => Ok(static_content(track.track_type, &element.content)),
            ElementContent::Generated { generator, params } => {
                self.generators.generate(generator, params, inputs).map(Some)
            }
        }
    }

    fn transcript_segments(
        &self,
        transcript: Option<&str>,
        granularity: SegmentGranularity,
    ) -> CoreResult<Vec<TranscriptSegment>> {
        let source = self.transcripts.as_ref().ok_or_else(|| {
            CoreError::MediaLookupFailed("transcript content needs a transcript source".to_string())
        })?;
        source.segments(transcript, granularity)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Rejects inputs whose type differs from their placeholder's type
fn check_input_types(template: &Template, inputs: &PlaceholderInputs) -> CoreResult<()> {
    for placeholder in &template.placeholders {
        if let Some(input) = inputs.get(&placeholder.id) {
            if input.input_type() != placeholder.placeholder_type {
                return Err(CoreError::PlaceholderTypeMismatch {
                    placeholder_id: placeholder.id.clone(),
                    expected: placeholder.placeholder_type.to_string(),
                    actual: input.input_type().to_string(),
                });
            }
        }
    }
    Ok(())
}

fn resolve_duration(
    element: &TemplateElement,
    inputs: &PlaceholderInputs,
    options: &InterpreterOptions,
) -> CoreResult<TimeSec> {
    let missing = |reason: String| CoreError::MissingMediaMetadata {
        element_id: element.id.clone(),
        reason,
    };

    match &element.duration {
        ElementDuration::Fixed { value } => Ok(*value),
        ElementDuration::Content { max_duration, hint } => {
            let media = match &element.content {
                ElementContent::Static {
                    source: Some(source),
                    ..
                } => Some(source),
                content => match content.placeholder_ref().map(|id| inputs.get(id)) {
                    // Optional placeholder without a value: the element is dropped later
                    Some(None) => return Ok(hint.unwrap_or(0.0)),
                    Some(Some(input)) => input.media_file(),
                    None => None,
                },
            };
            let duration = media
                .and_then(|m| m.duration())
                .ok_or_else(|| missing("content duration needs media with a known duration".to_string()))?;
            Ok(max_duration.map_or(duration, |max| duration.min(max)))
        }
        ElementDuration::MatchAudio { placeholder_id, .. } => {
            let id = placeholder_id
                .as_ref()
                .or(options.match_audio_placeholder.as_ref())
                .ok_or_else(|| missing("no audio placeholder to match".to_string()))?;
            inputs
                .get(id)
                .and_then(PlaceholderInput::media_file)
                .and_then(|m| m.duration())
                .ok_or_else(|| missing(format!("audio placeholder '{}' has no known duration", id)))
        }
        // Computed by the resolver
        ElementDuration::FillGap { .. } => Ok(0.0),
    }
}

/// Coerces an input to content fitting the track kind
pub(crate) fn coerce_input(
    placeholder_id: &str,
    input: &PlaceholderInput,
    track_type: TrackType,
) -> CoreResult<GeneratedContent> {
    let mismatch = || CoreError::PlaceholderTypeMismatch {
        placeholder_id: placeholder_id.to_string(),
        expected: format!("input for a {} track", track_type),
        actual: input.input_type().to_string(),
    };

    match (track_type, input) {
        (TrackType::Media, PlaceholderInput::Video { value } | PlaceholderInput::Image { value })
        | (TrackType::Audio, PlaceholderInput::Audio { value } | PlaceholderInput::Video { value }) => {
            Ok(GeneratedContent::Media {
                source: value.clone(),
                media_type: input.input_type(),
            })
        }
        (TrackType::Text, PlaceholderInput::Text { value }) => Ok(GeneratedContent::text(value.clone())),
        (TrackType::Text, PlaceholderInput::Number { value }) => Ok(GeneratedContent::Number { value: *value }),
        (TrackType::Text, PlaceholderInput::Color { value }) => Ok(GeneratedContent::Color { value: value.clone() }),
        (TrackType::Text, PlaceholderInput::Font { value }) => Ok(GeneratedContent::Font { family: value.clone() }),
        _ => Err(mismatch()),
    }
}

/// Copies `static` content; `None` for any other content kind
pub(crate) fn static_content(
    track_type: TrackType,
    content: &ElementContent,
) -> Option<GeneratedContent> {
    let ElementContent::Static { text, source } = content else {
        return None;
    };
    Some(match (text, source) {
        (_, Some(source)) => GeneratedContent::Media {
            source: source.clone(),
            media_type: static_media_type(track_type, source.mime_type.as_deref()),
        },
        (Some(text), None) => GeneratedContent::text(text.clone()),
        (None, None) => GeneratedContent::text(""),
    })
}

fn static_media_type(track_type: TrackType, mime_type: Option<&str>) -> PlaceholderType {
    match (track_type, mime_type) {
        (TrackType::Audio, _) => PlaceholderType::Audio,
        (_, Some(mime)) if mime.starts_with("image/") => PlaceholderType::Image,
        (_, Some(mime)) if mime.starts_with("audio/") => PlaceholderType::Audio,
        _ => PlaceholderType::Video,
    }
}

pub(crate) fn build_element(
    template: &Template,
    element: &TemplateElement,
    timing: ResolvedTiming,
    content: GeneratedContent,
    size: Size2D,
) -> GeneratedElement {
    let mut style = element.style.clone().or_else(|| {
        element
            .caption_style_id
            .as_deref()
            .and_then(|id| template.caption_style(id))
            .map(|caption| caption.text_style.clone())
    });
    match &content {
        GeneratedContent::Color { value } => {
            style.get_or_insert_with(Default::default).color = value.clone();
        }
        GeneratedContent::Font { family } => {
            style.get_or_insert_with(Default::default).font_family = family.clone();
        }
        _ => {}
    }

    GeneratedElement {
        id: new_id(),
        name: element.name.clone(),
        start_time: timing.start_time,
        duration: timing.duration,
        content,
        style,
        caption_style_id: element.caption_style_id.clone(),
        position: element.position.as_ref().map(|p| to_pixel_position(p, size)),
        hidden: element.hidden,
        muted: element.muted,
        timing_provisional: timing.provisional,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automation::{
        AutomationRule, ConditionOperator, RuleAction, RuleCondition,
    };
    use crate::core::template::collaborators::{
        InMemoryTranscripts, StaticMediaInfo, TranscriptSegment, DEFAULT_TRANSCRIPT,
    };
    use crate::core::template::{
        ElementTiming, MediaFileRef, MediaMetadata, PercentPosition, PlaceholderDefinition,
        TemplateTrack, TimingAnchor, TrackRole, ValidationCode,
    };

    fn title_template() -> Template {
        Template::new("Title card", CanvasSettings::landscape_1080())
            .with_placeholder(
                PlaceholderDefinition::new("title", PlaceholderType::Text)
                    .with_id("title")
                    .with_required(true),
            )
            .with_track(
                TemplateTrack::new("Titles", TrackType::Text, TrackRole::Title).with_element(
                    TemplateElement::new(
                        "Heading",
                        ElementTiming::absolute(0.5),
                        ElementDuration::fixed(3.0),
                        ElementContent::placeholder("title"),
                    )
                    .with_id("heading")
                    .with_position(PercentPosition::new(0.0, -25.0)),
                ),
            )
    }

    fn video_template() -> Template {
        Template::new("Clip", CanvasSettings::vertical_1080())
            .with_placeholder(
                PlaceholderDefinition::new("Main clip", PlaceholderType::Video)
                    .with_id("clip")
                    .with_required(true),
            )
            .with_track(
                TemplateTrack::new("Main", TrackType::Media, TrackRole::MainVideo).with_element(
                    TemplateElement::new(
                        "Clip",
                        ElementTiming::absolute(0.0),
                        ElementDuration::Content {
                            max_duration: Some(10.0),
                            hint: None,
                        },
                        ElementContent::placeholder("clip"),
                    )
                    .with_id("clip-element"),
                ),
            )
    }

    #[tokio::test]
    async fn test_text_placeholder_is_substituted() {
        let template = title_template();
        let inputs = PlaceholderInputs::new().with("title", PlaceholderInput::text("Hello"));

        let project = Interpreter::new()
            .interpret(&template, &inputs, &InterpreterOptions::default())
            .await
            .unwrap();

        let heading = project.element_for("heading").unwrap();
        assert_eq!(heading.content.as_text(), Some("Hello"));
        assert_eq!(heading.start_time, 0.5);
        assert_eq!(heading.position.as_ref().unwrap().y, -270.0);
        assert_ne!(heading.id, "heading");
        assert_eq!(project.metadata.placeholders_used, vec!["title".to_string()]);
        assert_eq!(project.duration, 3.5);
    }

    #[tokio::test]
    async fn test_missing_required_input_fails_validation() {
        let err = Interpreter::new()
            .interpret(
                &title_template(),
                &PlaceholderInputs::new(),
                &InterpreterOptions::default(),
            )
            .await
            .unwrap_err();

        let issues = err.validation_issues().unwrap();
        assert!(issues
            .iter()
            .any(|i| i.placeholder_id.as_deref() == Some("title")));
    }

    #[tokio::test]
    async fn test_unknown_placeholder_reference_is_an_error() {
        let mut template = title_template();
        template.tracks[0].elements.push(
            TemplateElement::new(
                "Subheading",
                ElementTiming::absolute(1.0),
                ElementDuration::fixed(2.0),
                ElementContent::placeholder("ghost"),
            )
            .with_id("subheading"),
        );
        let inputs = PlaceholderInputs::new().with("title", PlaceholderInput::text("Hello"));

        let err = Interpreter::new()
            .interpret(&template, &inputs, &InterpreterOptions::default())
            .await
            .unwrap_err();

        let issues = err.validation_issues().unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ValidationCode::MissingPlaceholder);
        assert_eq!(issues[0].placeholder_id.as_deref(), Some("ghost"));
        assert_eq!(issues[0].element_id.as_deref(), Some("subheading"));
    }

    #[tokio::test]
    async fn test_relative_timing_scenario() {
        let template = Template::new("Sequence", CanvasSettings::default()).with_track(
            TemplateTrack::new("Text", TrackType::Text, TrackRole::Title)
                .with_element(
                    TemplateElement::new(
                        "A",
                        ElementTiming::absolute(0.0),
                        ElementDuration::fixed(5.0),
                        ElementContent::static_text("first"),
                    )
                    .with_id("A"),
                )
                .with_element(
                    TemplateElement::new(
                        "B",
                        ElementTiming::relative("A", 1.0, TimingAnchor::End),
                        ElementDuration::fixed(2.0),
                        ElementContent::static_text("second"),
                    )
                    .with_id("B"),
                ),
        );

        let project = Interpreter::new()
            .interpret(&template, &PlaceholderInputs::new(), &InterpreterOptions::default())
            .await
            .unwrap();
        assert_eq!(project.element_for("B").unwrap().start_time, 6.0);
    }

    #[tokio::test]
    async fn test_content_duration_from_probe() {
        let template = video_template();
        let inputs = PlaceholderInputs::new()
            .with("clip", PlaceholderInput::video(MediaFileRef::new("m1", "clip.mp4")));

        let err = Interpreter::new()
            .interpret(&template, &inputs, &InterpreterOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingMediaMetadata { .. }));

        let provider =
            StaticMediaInfo::new().with_entry("m1", MediaMetadata::default().with_duration(14.0));
        let project = Interpreter::new()
            .with_media_info(Arc::new(provider))
            .interpret(&template, &inputs, &InterpreterOptions::default())
            .await
            .unwrap();
        assert_eq!(project.element_for("clip-element").unwrap().duration, 10.0);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let inputs = PlaceholderInputs::new()
            .with("clip", PlaceholderInput::video(MediaFileRef::new("m1", "clip.mp4")));
        let err = Interpreter::new()
            .with_media_info(Arc::new(StaticMediaInfo::new().failing()))
            .interpret(&video_template(), &inputs, &InterpreterOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::MediaLookupFailed(_)));
    }

    #[tokio::test]
    async fn test_type_mismatch() {
        let inputs = PlaceholderInputs::new().with("title", PlaceholderInput::number(42.0));
        let err = Interpreter::new()
            .interpret(&title_template(), &inputs, &InterpreterOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::PlaceholderTypeMismatch { ref placeholder_id, .. } if placeholder_id == "title"
        ));
    }

    #[tokio::test]
    async fn test_default_value_and_target_canvas() {
        let mut template = title_template();
        template.placeholders[0].default_value = Some(PlaceholderInput::text("Untitled"));

        let options = InterpreterOptions::new()
            .with_target_canvas(CanvasSettings::new(1280, 720))
            .with_project_name("Render 1");
        let project = Interpreter::new()
            .interpret(&template, &PlaceholderInputs::new(), &options)
            .await
            .unwrap();

        assert_eq!(project.name, "Render 1");
        assert_eq!(project.metadata.defaults_applied, vec!["title".to_string()]);
        let heading = project.element_for("heading").unwrap();
        assert_eq!(heading.content.as_text(), Some("Untitled"));
        assert_eq!(heading.position.as_ref().unwrap().y, -180.0);
    }

    #[tokio::test]
    async fn test_transcript_segments() {
        let template = Template::new("Captions", CanvasSettings::default()).with_track(
            TemplateTrack::new("Captions", TrackType::Text, TrackRole::Caption).with_element(
                TemplateElement::new(
                    "Second sentence",
                    ElementTiming::absolute(0.0),
                    ElementDuration::fixed(1.0),
                    ElementContent::Transcript {
                        placeholder_id: None,
                        granularity: SegmentGranularity::Sentence,
                        index: 1,
                    },
                )
                .with_id("cap"),
            ),
        );
        let transcripts = InMemoryTranscripts::new().with_words(
            DEFAULT_TRANSCRIPT,
            vec![
                TranscriptSegment::new("Hi.", 0.0, 0.3),
                TranscriptSegment::new("Bye.", 0.5, 0.9),
            ],
        );

        let err = Interpreter::new()
            .interpret(&template, &PlaceholderInputs::new(), &InterpreterOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::MediaLookupFailed(_)));

        let interpreter = Interpreter::new().with_transcripts(Arc::new(transcripts));
        let project = interpreter
            .interpret(&template, &PlaceholderInputs::new(), &InterpreterOptions::default())
            .await
            .unwrap();
        assert_eq!(project.element_for("cap").unwrap().content.as_text(), Some("Bye."));

        let mut out_of_range = template.clone();
        if let ElementContent::Transcript { index, .. } = &mut out_of_range.tracks[0].elements[0].content {
            *index = 5;
        }
        let err = interpreter
            .interpret(&out_of_range, &PlaceholderInputs::new(), &InterpreterOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::SegmentIndexOutOfRange { index: 5, available: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_generator() {
        let template = Template::new("Gen", CanvasSettings::default()).with_track(
            TemplateTrack::new("Text", TrackType::Text, TrackRole::Title).with_element(
                TemplateElement::new(
                    "Generated",
                    ElementTiming::absolute(0.0),
                    ElementDuration::fixed(1.0),
                    ElementContent::Generated {
                        generator: "confetti".to_string(),
                        params: Default::default(),
                    },
                ),
            ),
        );
        let err = Interpreter::new()
            .interpret(&template, &PlaceholderInputs::new(), &InterpreterOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownGenerator(name) if name == "confetti"));
    }

    #[tokio::test]
    async fn test_interpret_with_rules() {
        let template = title_template().with_rule(
            AutomationRule::new("Long titles shrink")
                .with_condition(RuleCondition::new(
                    "textContent.length",
                    ConditionOperator::GreaterThan,
                    8,
                ))
                .with_action(RuleAction::set_style("fontSize", 30)),
        );
        let inputs =
            PlaceholderInputs::new().with("title", PlaceholderInput::text("A rather long title"));

        let (project, report) = Interpreter::new()
            .interpret_with_rules(&template, &inputs, &InterpreterOptions::default())
            .await
            .unwrap();

        assert_eq!(report.effects.len(), 1);
        let heading = project.element_for("heading").unwrap();
        assert_eq!(heading.style.as_ref().unwrap().font_size, 30.0);
        assert_eq!(project.metadata.rule_effects.len(), 1);
    }

    #[test]
    fn test_options_from_json() {
        let options: InterpreterOptions =
            serde_json::from_str(r#"{"timelineDuration": 30, "matchAudioPlaceholder": "vo"}"#)
                .unwrap();
        assert_eq!(options.timeline_duration, Some(30.0));
        assert_eq!(options.match_audio_placeholder.as_deref(), Some("vo"));
        assert!(options.target_canvas.is_none());
    }
}
