//! Interpreter Collaborators
//!
//! Traits for the services interpretation depends on but does not own:
//! media probing, transcript segmentation and content generators.
//! Implementations are injected into the `Interpreter`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::generated::GeneratedContent;
use super::models::SegmentGranularity;
use super::placeholders::{MediaFileRef, MediaMetadata, PlaceholderInputs};
use crate::core::{CoreError, CoreResult, MediaId, TimeSec};

// =============================================================================
// Media Info
// =============================================================================

/// Looks up metadata for media files that arrive without it
#[async_trait]
pub trait MediaInfoProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Returns the file's metadata, or `None` if nothing is known about it
    async fn probe(&self, media: &MediaFileRef) -> CoreResult<Option<MediaMetadata>>;
}

/// Provider that knows nothing; media keeps whatever metadata it carries
#[derive(Debug, Default)]
pub struct NoMediaInfo;

#[async_trait]
impl MediaInfoProvider for NoMediaInfo {
    fn name(&self) -> &str {
        "none"
    }

    async fn probe(&self, _media: &MediaFileRef) -> CoreResult<Option<MediaMetadata>> {
        Ok(None)
    }
}

/// In-memory provider keyed by media id
#[derive(Debug, Default)]
pub struct StaticMediaInfo {
    entries: HashMap<MediaId, MediaMetadata>,
    fail: bool,
}

impl StaticMediaInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, media_id: impl Into<String>, metadata: MediaMetadata) -> Self {
        self.entries.insert(media_id.into(), metadata);
        self
    }

    /// Makes every probe fail (for error propagation tests)
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl MediaInfoProvider for StaticMediaInfo {
    fn name(&self) -> &str {
        "static"
    }

    async fn probe(&self, media: &MediaFileRef) -> CoreResult<Option<MediaMetadata>> {
        if self.fail {
            return Err(CoreError::MediaLookupFailed(format!(
                "probe of '{}' failed",
                media.name
            )));
        }
        Ok(self.entries.get(&media.id).cloned())
    }
}

// =============================================================================
// Transcripts
// =============================================================================

/// One segment of a transcript
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub text: String,
    pub start_time: TimeSec,
    pub end_time: TimeSec,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start_time: TimeSec, end_time: TimeSec) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
        }
    }
}

/// Supplies transcript segments at a given granularity
pub trait TranscriptSource: Send + Sync {
    /// `transcript` is the transcript input value, if the element names one
    fn segments(
        &self,
        transcript: Option<&str>,
        granularity: SegmentGranularity,
    ) -> CoreResult<Vec<TranscriptSegment>>;
}

/// In-memory transcript store.
///
/// Holds word-level segments and derives sentences (split after `.`, `!` or
/// `?`) and phrases (additionally split after `,` `;` `:`).
#[derive(Debug, Default)]
pub struct InMemoryTranscripts {
    words: HashMap<String, Vec<TranscriptSegment>>,
}

/// Key used when an element does not name a transcript
pub const DEFAULT_TRANSCRIPT: &str = "default";

impl InMemoryTranscripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_words(mut self, transcript: impl Into<String>, words: Vec<TranscriptSegment>) -> Self {
        self.words.insert(transcript.into(), words);
        self
    }
}

impl TranscriptSource for InMemoryTranscripts {
    fn segments(
        &self,
        transcript: Option<&str>,
        granularity: SegmentGranularity,
    ) -> CoreResult<Vec<TranscriptSegment>> {
        let key = transcript.unwrap_or(DEFAULT_TRANSCRIPT);
        let words = self
            .words
            .get(key)
            .ok_or_else(|| CoreError::MediaLookupFailed(format!("Unknown transcript '{}'", key)))?;

        let breaks: &[char] = match granularity {
            SegmentGranularity::Word => return Ok(words.clone()),
            SegmentGranularity::Sentence => &['.', '!', '?'],
            SegmentGranularity::Phrase => &['.', '!', '?', ',', ';', ':'],
        };
        Ok(group_words(words, breaks))
    }
}

fn group_words(words: &[TranscriptSegment], breaks: &[char]) -> Vec<TranscriptSegment> {
    let mut groups = Vec::new();
    let mut current: Option<TranscriptSegment> = None;

    for word in words {
        let group = match current.take() {
            Some(mut g) => {
                g.text.push(' ');
                g.text.push_str(&word.text);
                g.end_time = word.end_time;
                g
            }
            None => word.clone(),
        };
        if word.text.trim_end().ends_with(breaks) {
            groups.push(group);
        } else {
            current = Some(group);
        }
    }
    groups.extend(current);
    groups
}

// =============================================================================
// Generators
// =============================================================================

/// Produces element content from parameters at interpretation time
pub trait ContentGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn generate(
        &self,
        params: &Map<String, Value>,
        inputs: &PlaceholderInputs,
    ) -> CoreResult<GeneratedContent>;
}

/// Renders `params.template`, replacing `{placeholderId}` with the input's
/// text form. Unknown tokens are left as written.
#[derive(Debug)]
pub struct TextTemplateGenerator {
    token: Regex,
}

impl TextTemplateGenerator {
    pub const NAME: &'static str = "text_template";

    pub fn new() -> CoreResult<Self> {
        let token = Regex::new(r"\{([A-Za-z0-9_\-]+)\}")
            .map_err(|e| CoreError::UnknownGenerator(format!("{}: {}", Self::NAME, e)))?;
        Ok(Self { token })
    }
}

impl ContentGenerator for TextTemplateGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(
        &self,
        params: &Map<String, Value>,
        inputs: &PlaceholderInputs,
    ) -> CoreResult<GeneratedContent> {
        let template = params.get("template").and_then(Value::as_str).unwrap_or("");
        let text = self.token.replace_all(template, |caps: &regex::Captures<'_>| {
            inputs
                .get(&caps[1])
                .and_then(|input| input.as_text())
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(GeneratedContent::text(text.into_owned()))
    }
}

/// Generators by name
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn ContentGenerator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in generators
    pub fn with_builtins() -> CoreResult<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(TextTemplateGenerator::new()?));
        Ok(registry)
    }

    pub fn register(&mut self, generator: Arc<dyn ContentGenerator>) {
        self.generators
            .insert(generator.name().to_string(), generator);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    pub fn generate(
        &self,
        name: &str,
        params: &Map<String, Value>,
        inputs: &PlaceholderInputs,
    ) -> CoreResult<GeneratedContent> {
        let generator = self
            .generators
            .get(name)
            .ok_or_else(|| CoreError::UnknownGenerator(name.to_string()))?;
        generator.generate(params, inputs)
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.generators.keys().collect();
        names.sort();
        f.debug_struct("GeneratorRegistry")
            .field("generators", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::PlaceholderInput;

    fn words() -> Vec<TranscriptSegment> {
        vec![
            TranscriptSegment::new("Hello", 0.0, 0.4),
            TranscriptSegment::new("there,", 0.4, 0.8),
            TranscriptSegment::new("friend.", 0.8, 1.2),
            TranscriptSegment::new("Welcome", 1.5, 2.0),
        ]
    }

    #[test]
    fn test_transcript_granularity() {
        let source = InMemoryTranscripts::new().with_words(DEFAULT_TRANSCRIPT, words());

        let sentences = source.segments(None, SegmentGranularity::Sentence).unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].text, "Hello there, friend.");
        assert_eq!(sentences[0].end_time, 1.2);

        let phrases = source.segments(None, SegmentGranularity::Phrase).unwrap();
        assert_eq!(phrases.len(), 3);

        assert_eq!(source.segments(None, SegmentGranularity::Word).unwrap().len(), 4);
        assert!(source.segments(Some("other"), SegmentGranularity::Word).is_err());
    }

    #[test]
    fn test_text_template_generator() {
        let registry = GeneratorRegistry::with_builtins().unwrap();
        let inputs = PlaceholderInputs::new().with("name", PlaceholderInput::text("Ada"));
        let params = serde_json::json!({"template": "Hi {name}, from {team}"});
        let content = registry
            .generate(TextTemplateGenerator::NAME, params.as_object().unwrap(), &inputs)
            .unwrap();
        assert_eq!(content.as_text(), Some("Hi Ada, from {team}"));
    }

    #[test]
    fn test_unknown_generator() {
        let registry = GeneratorRegistry::new();
        let err = registry
            .generate("sparkles", &Map::new(), &PlaceholderInputs::new())
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownGenerator(name) if name == "sparkles"));
    }

    #[tokio::test]
    async fn test_static_media_info() {
        let provider = StaticMediaInfo::new()
            .with_entry("m1", MediaMetadata::default().with_duration(3.0));
        let found = provider.probe(&MediaFileRef::new("m1", "a.mp4")).await.unwrap();
        assert_eq!(found.and_then(|m| m.duration_sec), Some(3.0));
        assert!(provider
            .probe(&MediaFileRef::new("m2", "b.mp4"))
            .await
            .unwrap()
            .is_none());
        assert!(StaticMediaInfo::new()
            .failing()
            .probe(&MediaFileRef::new("m1", "a.mp4"))
            .await
            .is_err());
    }
}
