//! Shared data models for the composition planner.
//!
//! This crate provides Serde-serializable types for:
//! - Inbound composition requests and their validation
//! - Media sources, resolutions and probed durations
//! - Per-action plans (merge, parallax, overlay, concat)
//! - Encoding configuration
//! - The resolved-parameter record written next to rendered output

pub mod concat;
pub mod encoding;
pub mod job;
pub mod merge;
pub mod overlay;
pub mod parallax;
pub mod plan;
pub mod request;
pub mod source;
pub mod validation;

// Re-export common types
pub use concat::{AudioFormat, ConcatParams, ConcatPlan, Segment, SegmentPlan};
pub use encoding::EncodingConfig;
pub use job::JobId;
pub use merge::{MergeParams, MergePlan, MergeStrategy, MixWeights, VolumeSpec};
pub use overlay::{OverlayParams, OverlayPlan, OverlayPosition, OverlaySpec};
pub use parallax::{
    CoverGeometry, Curve, MotionPlan, MotionSample, PanDirection, ParallaxParams, ParallaxSpec,
};
pub use plan::{CompositionPlan, ResolvedDetails, ResolvedParameters, ResolvedSegment};
pub use request::{parse_request, validate_request, Action, ComposeRequest, RawRequest};
pub use source::{DurationInfo, InvalidDuration, MediaKind, MediaSource, Resolution};
pub use validation::{ValidationError, ValidationResult};
