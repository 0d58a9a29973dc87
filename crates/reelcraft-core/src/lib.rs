//! Reelcraft Core Library
//!
//! Template compiler for the Reelcraft video editor.
//! Turns edited projects into reusable, resolution-independent templates and
//! turns templates plus inputs back into concrete projects.
//!
//! ## Pipeline
//!
//! - [`core::template::extract`]: project → template
//! - [`core::template::Interpreter`]: template + inputs → generated project
//! - [`core::automation::apply_rules`]: conditional post-processing
//! - [`core::batch::BatchDriver`]: one generated project per data row

pub mod core;

pub use crate::core::{CoreError, CoreResult};
