//! Reelcraft Core Engine
//!
//! Template compiler modules.
//! Handles the template data model, extraction, interpretation, automation
//! rules and batch generation.

pub mod automation;
pub mod batch;
pub mod fs;
pub mod project;
pub mod template;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
mod tests_destructive;
