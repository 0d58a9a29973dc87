//! Template System
//!
//! Parameterized, resolution-independent video templates.
//! Extraction turns an edited project into a template; interpretation turns a
//! template plus inputs back into a concrete project.
//!
//! # Modules
//!
//! - `models`: template, track and element data structures
//! - `placeholders`: placeholder definitions, constraints and inputs
//! - `styles`: text and caption styles
//! - `coords`: pixel/percent conversion and anchor arithmetic
//! - `timing`: topological timing resolution
//! - `extractor`: project → template
//! - `interpreter`: template + inputs → generated project
//! - `collaborators`: media probing, transcripts and generators
//! - `generated`: generated project output model
//! - `validator`: template and input checks
//! - `io`: JSON import/export and storage

pub mod collaborators;
pub mod coords;
pub mod extractor;
pub mod generated;
pub mod interpreter;
pub mod io;
pub mod models;
pub mod placeholders;
pub mod styles;
pub mod timing;
pub mod validator;

// Re-export main types
pub use collaborators::{
    ContentGenerator, GeneratorRegistry, MediaInfoProvider, TranscriptSegment, TranscriptSource,
};
pub use coords::{to_percent_position, to_pixel_position, PixelPosition};
pub use extractor::{extract, ExtractOptions};
pub use generated::{
    GeneratedContent, GeneratedElement, GeneratedProject, GeneratedTrack, GenerationMetadata,
};
pub use interpreter::{Interpreter, InterpreterOptions};
pub use io::{
    duplicate_template, export_template, import_template, load_template, save_template,
    TemplateSummary,
};
pub use models::{
    CanvasSettings, ElementContent, ElementDuration, ElementTiming, PercentPosition,
    SegmentGranularity, Template, TemplateElement, TemplateTrack, TimingAnchor, TrackRole,
    TrackType, TEMPLATE_VERSION,
};
pub use placeholders::{
    MediaFileRef, MediaMetadata, PlaceholderConstraints, PlaceholderDefinition, PlaceholderInput,
    PlaceholderInputs, PlaceholderType,
};
pub use styles::{CaptionAnimation, CaptionStyleDefinition, TextStyleDefinition};
pub use validator::{
    is_valid_template, validate_placeholder_inputs, validate_template, ValidationCode,
    ValidationIssue, ValidationResult,
};
