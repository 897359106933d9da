//! Multi-segment concatenation parameters and plan.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::source::{MediaSource, Resolution};

/// Upper bound on segments per request.
pub const MAX_SEGMENTS: usize = 50;

/// Frame rate every segment is normalized to.
pub const CONCAT_FPS: u32 = 30;

/// One input clip with an optional trim window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    pub url: String,
    /// Seconds into the source where the segment starts
    pub trim_start: f64,
    /// Seconds into the source where the segment ends; full source if absent
    pub trim_end: Option<f64>,
}

impl Segment {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            trim_start: 0.0,
            trim_end: None,
        }
    }

    pub fn with_trim(mut self, start: f64, end: Option<f64>) -> Self {
        self.trim_start = start;
        self.trim_end = end;
        self
    }

    pub fn source(&self) -> MediaSource {
        MediaSource::video(self.url.clone())
    }
}

/// Validated concat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConcatParams {
    pub segments: Vec<Segment>,
    pub width: u32,
    pub height: u32,
}

impl ConcatParams {
    pub fn target(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// Audio layout shared by every normalized segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channel_layout: String,
    pub sample_format: String,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channel_layout: "stereo".to_string(),
            sample_format: "fltp".to_string(),
        }
    }
}

/// Normalization of a single segment onto the shared target frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentPlan {
    pub index: usize,
    pub source: MediaSource,
    pub source_resolution: Resolution,
    pub trim_start: f64,
    pub trim_end: f64,
    /// Size after aspect-preserving scale-to-fit
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub pad_left: u32,
    pub pad_top: u32,
    /// Frame size after padding; identical for every segment
    pub output: Resolution,
    /// Audio layout after resampling; identical for every segment
    pub audio: AudioFormat,
    /// Sources without audio get generated silence for the window
    pub has_audio: bool,
}

impl SegmentPlan {
    pub fn duration(&self) -> f64 {
        self.trim_end - self.trim_start
    }
}

/// Ordered, normalized segments ready for a single concat pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConcatPlan {
    pub target: Resolution,
    pub audio: AudioFormat,
    pub fps: u32,
    pub segments: Vec<SegmentPlan>,
}

impl ConcatPlan {
    /// Sum of all trimmed segment durations.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(SegmentPlan::duration).sum()
    }
}
