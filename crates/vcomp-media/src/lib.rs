#![deny(unreachable_patterns)]
//! Composition planning and FFmpeg execution.
//!
//! This crate provides:
//! - Media probing through `ffprobe` behind the [`MediaProbe`] trait
//! - Pure planners for merge, parallax, overlay and concat compositions
//! - The command assembler turning plans into FFmpeg filter graphs
//! - Type-safe FFmpeg command building and a runner with progress,
//!   timeout and cancellation
//! - The [`Composer`] pipeline tying validation, probing, planning and
//!   assembly together

pub mod assemble;
pub mod command;
pub mod error;
pub mod filters;
pub mod metrics;
pub mod pipeline;
pub mod planner;
pub mod probe;
pub mod progress;

pub use assemble::{assemble, EngineInvocation};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use pipeline::{Composer, ComposerConfig, PlannedComposition};
pub use planner::SegmentMedia;
pub use probe::{FfprobeClient, MediaInfo, MediaProbe};
pub use progress::{FfmpegProgress, ProgressCallback};
