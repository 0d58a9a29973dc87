//! Batch Generation
//!
//! Generates one project per row of tabular data.
//!
//! # Modules
//!
//! - `models`: batch job, data source and status types
//! - `driver`: row processing, progress events and cancellation

pub mod driver;
pub mod models;

pub use driver::{expand_name, BatchDriver, BatchEvent, BatchRowOutcome, CancellationFlag};
pub use models::{BatchDataSource, BatchJob, BatchJobStatus, BatchMode};
