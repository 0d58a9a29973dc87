//! Template Import / Export
//!
//! JSON documents with a version gate, atomic file storage, duplication and
//! lightweight summaries for template pickers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::models::{Template, TEMPLATE_VERSION};
use super::timing::{hinted_duration, resolve_timings};
use crate::core::fs::{save_json_document, template_path, TEMPLATE_EXTENSION};
use crate::core::{new_id, CoreError, CoreResult, TemplateId, TimeSec};

/// Parses a template document, accepting only version "1.0"
pub fn import_template(json: &str) -> CoreResult<Template> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| CoreError::InvalidTemplateFormat(format!("malformed JSON: {}", e)))?;

    match value.get("version").and_then(|v| v.as_str()) {
        Some(TEMPLATE_VERSION) => {}
        Some(other) => {
            return Err(CoreError::InvalidTemplateFormat(format!(
                "unsupported version '{}' (expected '{}')",
                other, TEMPLATE_VERSION
            )))
        }
        None => {
            return Err(CoreError::InvalidTemplateFormat(
                "missing version".to_string(),
            ))
        }
    }

    serde_json::from_value(value).map_err(|e| CoreError::InvalidTemplateFormat(e.to_string()))
}

/// Serializes a template as pretty JSON
pub fn export_template(template: &Template) -> CoreResult<String> {
    Ok(serde_json::to_string_pretty(template)?)
}

/// Writes a template to `path` atomically
pub fn save_template(path: &Path, template: &Template) -> CoreResult<()> {
    save_json_document(path, template)?;
    debug!("Saved template {} to {}", template.id, path.display());
    Ok(())
}

/// Writes a template into `dir` under its id and returns the file path
pub fn save_template_in(dir: &Path, template: &Template) -> CoreResult<PathBuf> {
    let path = template_path(dir, &template.id)?;
    save_template(&path, template)?;
    Ok(path)
}

/// Reads a template file through the same checks as `import_template`
pub fn load_template(path: &Path) -> CoreResult<Template> {
    let json = std::fs::read_to_string(path)?;
    import_template(&json)
}

/// Summaries of every readable template in `dir`, newest first.
///
/// Unreadable documents are skipped with a warning.
pub fn list_templates(dir: &Path) -> CoreResult<Vec<TemplateSummary>> {
    let suffix = format!(".{}", TEMPLATE_EXTENSION);
    let mut summaries = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_template = path
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(&suffix))
            .unwrap_or(false);
        if !is_template {
            continue;
        }
        match load_template(&path) {
            Ok(template) => summaries.push(TemplateSummary::from(&template)),
            Err(e) => warn!("Skipping template {}: {}", path.display(), e),
        }
    }

    summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(summaries)
}

/// Copy with a fresh id, a " (Copy)" name suffix and new timestamps
pub fn duplicate_template(template: &Template) -> Template {
    let now = Utc::now();
    let mut copy = template.clone();
    copy.id = new_id();
    copy.name = format!("{} (Copy)", template.name);
    copy.created_at = now;
    copy.updated_at = now;
    copy
}

/// Overview of a template for listings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: TemplateId,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub track_count: usize,
    pub element_count: usize,
    pub placeholder_count: usize,
    pub required_placeholders: usize,
    /// Placeholder count per type name
    pub placeholders_by_type: BTreeMap<String, usize>,
    pub rule_count: usize,
    /// Timeline length from fixed durations and recorded hints
    pub estimated_duration: TimeSec,
    pub updated_at: DateTime<Utc>,
}

impl From<&Template> for TemplateSummary {
    fn from(template: &Template) -> Self {
        let mut placeholders_by_type = BTreeMap::new();
        for placeholder in &template.placeholders {
            *placeholders_by_type
                .entry(placeholder.placeholder_type.to_string())
                .or_insert(0) += 1;
        }

        let estimated_duration = resolve_timings(template, None, |e| Ok(hinted_duration(e)))
            .map(|timings| timings.timeline_end())
            .unwrap_or(0.0);

        Self {
            id: template.id.clone(),
            name: template.name.clone(),
            description: template.description.clone(),
            tags: template.tags.clone(),
            track_count: template.tracks.len(),
            element_count: template.element_count(),
            placeholder_count: template.placeholders.len(),
            required_placeholders: template.placeholders.iter().filter(|p| p.required).count(),
            placeholders_by_type,
            rule_count: template.rules.len(),
            estimated_duration,
            updated_at: template.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::{
        CanvasSettings, ElementContent, ElementDuration, ElementTiming, PlaceholderDefinition,
        PlaceholderType, TemplateElement, TemplateTrack, TimingAnchor, TrackRole, TrackType,
    };
    use tempfile::TempDir;

    fn sample() -> Template {
        Template::new("Promo", CanvasSettings::vertical_1080())
            .with_placeholder(
                PlaceholderDefinition::new("Clip", PlaceholderType::Video)
                    .with_id("clip")
                    .with_required(true),
            )
            .with_placeholder(PlaceholderDefinition::new("Title", PlaceholderType::Text).with_id("title"))
            .with_track(
                TemplateTrack::new("Main", TrackType::Media, TrackRole::MainVideo)
                    .with_element(
                        TemplateElement::new(
                            "Clip",
                            ElementTiming::absolute(0.0),
                            ElementDuration::Content {
                                max_duration: None,
                                hint: Some(8.0),
                            },
                            ElementContent::placeholder("clip"),
                        )
                        .with_id("clip-el"),
                    )
                    .with_element(TemplateElement::new(
                        "Title",
                        ElementTiming::relative("clip-el", 0.5, TimingAnchor::End),
                        ElementDuration::fixed(2.0),
                        ElementContent::placeholder("title"),
                    )),
            )
    }

    #[test]
    fn test_export_import_round_trip() {
        let template = sample();
        let json = export_template(&template).unwrap();
        assert!(json.contains("\"version\": \"1.0\""));
        assert_eq!(import_template(&json).unwrap(), template);
    }

    #[test]
    fn test_import_rejects_other_versions() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["version"] = serde_json::json!("2.0");
        let err = import_template(&value.to_string()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTemplateFormat(msg) if msg.contains("2.0")));

        value.as_object_mut().unwrap().remove("version");
        assert!(matches!(
            import_template(&value.to_string()),
            Err(CoreError::InvalidTemplateFormat(_))
        ));
        assert!(matches!(
            import_template("{not json"),
            Err(CoreError::InvalidTemplateFormat(_))
        ));
        assert!(matches!(
            import_template(r#"{"version": "1.0", "name": 3}"#),
            Err(CoreError::InvalidTemplateFormat(_))
        ));
    }

    #[test]
    fn test_save_load_and_list() {
        let dir = TempDir::new().unwrap();
        let first = sample();
        let path = save_template_in(dir.path(), &first).unwrap();
        assert!(path.to_string_lossy().ends_with(".template.json"));
        assert_eq!(load_template(&path).unwrap(), first);

        // Saving again replaces the document in place
        let mut renamed = first.clone();
        renamed.name = "Promo v2".to_string();
        save_template(&path, &renamed).unwrap();
        assert_eq!(load_template(&path).unwrap().name, "Promo v2");

        std::fs::write(dir.path().join("broken.template.json"), "{").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let listed = list_templates(dir.path()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Promo v2");
    }

    #[test]
    fn test_duplicate() {
        let template = sample();
        let copy = duplicate_template(&template);
        assert_ne!(copy.id, template.id);
        assert_eq!(copy.name, "Promo (Copy)");
        assert_eq!(copy.tracks, template.tracks);
        assert!(copy.created_at >= template.created_at);
    }

    #[test]
    fn test_summary() {
        let summary = TemplateSummary::from(&sample());
        assert_eq!(summary.track_count, 1);
        assert_eq!(summary.element_count, 2);
        assert_eq!(summary.required_placeholders, 1);
        assert_eq!(summary.placeholders_by_type.get("video"), Some(&1));
        assert_eq!(summary.placeholders_by_type.get("text"), Some(&1));
        assert_eq!(summary.estimated_duration, 10.5);
    }
}
