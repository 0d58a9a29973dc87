//! Text and Caption Style Definitions
//!
//! Styling carried by text elements and caption tracks. Styles are plain data
//! so automation rules can address individual properties by name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::new_id;

// =============================================================================
// Text Style
// =============================================================================

/// Horizontal text alignment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlignment {
    Left,
    #[default]
    Center,
    Right,
}

/// Text styling configuration.
///
/// Properties the model does not know about are kept in `extra` so that
/// `set_style` rules and round trips through JSON never lose data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyleDefinition {
    /// Font family name
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Font size in pixels at the template canvas size
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    /// Text color in hex format (#RRGGBB or #RRGGBBAA)
    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    #[serde(default)]
    pub alignment: TextAlignment,

    #[serde(default)]
    pub bold: bool,

    #[serde(default)]
    pub italic: bool,

    #[serde(default)]
    pub underline: bool,

    /// Line height multiplier (1.0 = normal)
    #[serde(default = "default_line_height")]
    pub line_height: f64,

    #[serde(default)]
    pub letter_spacing: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_font_size() -> f64 {
    48.0
}

fn default_color() -> String {
    "#FFFFFF".to_string()
}

fn default_line_height() -> f64 {
    1.2
}

impl Default for TextStyleDefinition {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            color: default_color(),
            background_color: None,
            alignment: TextAlignment::Center,
            bold: false,
            italic: false,
            underline: false,
            line_height: default_line_height(),
            letter_spacing: 0.0,
            stroke_color: None,
            stroke_width: None,
            extra: BTreeMap::new(),
        }
    }
}

impl TextStyleDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size.max(1.0);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Writes a single property by its camelCase JSON name.
    ///
    /// Unknown names land in `extra`. Fails if the value has the wrong type
    /// for a known property; the style is left untouched in that case.
    pub fn set_property(
        &mut self,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), serde_json::Error> {
        let mut json = serde_json::to_value(&*self)?;
        if let serde_json::Value::Object(map) = &mut json {
            map.insert(name.to_string(), value);
        }
        *self = serde_json::from_value(json)?;
        Ok(())
    }
}

// =============================================================================
// Caption Style
// =============================================================================

/// Caption entrance animation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionAnimation {
    #[default]
    None,
    Fade,
    Pop,
    Typewriter,
    Karaoke,
    WordHighlight,
}

impl CaptionAnimation {
    /// Parses an editor animation name, falling back to `None`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "fade" | "fade_in" => CaptionAnimation::Fade,
            "pop" | "bounce" => CaptionAnimation::Pop,
            "typewriter" => CaptionAnimation::Typewriter,
            "karaoke" => CaptionAnimation::Karaoke,
            "word_highlight" | "highlight" => CaptionAnimation::WordHighlight,
            _ => CaptionAnimation::None,
        }
    }
}

/// Vertical caption placement
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionPlacement {
    Top,
    Center,
    #[default]
    Bottom,
}

/// Style shared by all elements of a caption track
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionStyleDefinition {
    pub id: String,
    pub name: String,
    pub text_style: TextStyleDefinition,
    #[serde(default)]
    pub animation: CaptionAnimation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_color: Option<String>,
    /// Words shown together per caption group
    #[serde(default = "default_words_per_group")]
    pub words_per_group: u32,
    #[serde(default = "default_max_lines")]
    pub max_lines: u32,
    #[serde(default)]
    pub placement: CaptionPlacement,
}

fn default_words_per_group() -> u32 {
    3
}

fn default_max_lines() -> u32 {
    2
}

impl CaptionStyleDefinition {
    pub fn new(name: impl Into<String>, text_style: TextStyleDefinition) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            text_style,
            animation: CaptionAnimation::None,
            highlight_color: None,
            words_per_group: default_words_per_group(),
            max_lines: default_max_lines(),
            placement: CaptionPlacement::Bottom,
        }
    }

    pub fn with_animation(mut self, animation: CaptionAnimation) -> Self {
        self.animation = animation;
        self
    }

    pub fn with_words_per_group(mut self, words: u32) -> Self {
        self.words_per_group = words.max(1);
        self
    }

    /// Placement derived from a vertical percent offset (negative = up)
    pub fn with_placement_from_y(mut self, y_percent: f64) -> Self {
        self.placement = if y_percent < -16.0 {
            CaptionPlacement::Top
        } else if y_percent > 16.0 {
            CaptionPlacement::Bottom
        } else {
            CaptionPlacement::Center
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_known_property() {
        let mut style = TextStyleDefinition::default();
        style.set_property("fontSize", json!(32)).unwrap();
        assert_eq!(style.font_size, 32.0);
    }

    #[test]
    fn test_set_unknown_property_goes_to_extra() {
        let mut style = TextStyleDefinition::default();
        style.set_property("textShadow", json!("2px 2px #000")).unwrap();
        assert_eq!(style.extra.get("textShadow"), Some(&json!("2px 2px #000")));

        let round_trip: TextStyleDefinition =
            serde_json::from_value(serde_json::to_value(&style).unwrap()).unwrap();
        assert_eq!(round_trip, style);
    }

    #[test]
    fn test_set_property_wrong_type_leaves_style_untouched() {
        let mut style = TextStyleDefinition::default();
        assert!(style.set_property("fontSize", json!("huge")).is_err());
        assert_eq!(style, TextStyleDefinition::default());
    }

    #[test]
    fn test_caption_animation_from_name() {
        assert_eq!(CaptionAnimation::from_name("Word-Highlight"), CaptionAnimation::WordHighlight);
        assert_eq!(CaptionAnimation::from_name("fade"), CaptionAnimation::Fade);
        assert_eq!(CaptionAnimation::from_name("spin"), CaptionAnimation::None);
    }

    #[test]
    fn test_placement_from_y() {
        let style = TextStyleDefinition::default();
        let caption = CaptionStyleDefinition::new("c", style).with_placement_from_y(35.0);
        assert_eq!(caption.placement, CaptionPlacement::Bottom);
        assert_eq!(caption.clone().with_placement_from_y(-40.0).placement, CaptionPlacement::Top);
        assert_eq!(caption.with_placement_from_y(0.0).placement, CaptionPlacement::Center);
    }
}
