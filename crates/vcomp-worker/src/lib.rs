//! Composition worker.
//!
//! This crate provides:
//! - Environment-driven worker configuration
//! - The job executor planning request files and rendering them
//! - Result records written next to rendered outputs
//! - Structured job logging

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{output_size, result_path, write_record, JobExecutor, PlanReport, RenderRecord};
pub use logging::JobLogger;
