//! Still-image parallax parameters and motion plan.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::source::{MediaSource, Resolution};

pub const DEFAULT_PARALLAX_DURATION_SECS: f64 = 10.0;
pub const MAX_PARALLAX_DURATION_SECS: f64 = 60.0;

pub const DEFAULT_OUTPUT_WIDTH: u32 = 1920;
pub const DEFAULT_OUTPUT_HEIGHT: u32 = 1080;
pub const MIN_PARALLAX_WIDTH: u32 = 480;
pub const MIN_PARALLAX_HEIGHT: u32 = 320;
pub const MAX_PARALLAX_DIMENSION: u32 = 4096;

pub const DEFAULT_ZOOM_FACTOR: f64 = 1.2;
pub const MIN_ZOOM_FACTOR: f64 = 1.1;
pub const MAX_ZOOM_FACTOR: f64 = 2.0;

pub const DEFAULT_INTENSITY: f64 = 0.5;
pub const MIN_INTENSITY: f64 = 0.1;
pub const MAX_INTENSITY: f64 = 1.0;

/// Frame rate of generated parallax clips.
pub const PARALLAX_FPS: u32 = 30;

/// Slack for floating point comparisons against frame bounds (pixels).
const BOUNDS_EPSILON: f64 = 1e-6;

/// Camera motion applied to the still image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PanDirection {
    Left,
    Right,
    Up,
    Down,
    #[default]
    ZoomIn,
    ZoomOut,
}

impl PanDirection {
    pub const ALL: &'static [PanDirection] = &[
        PanDirection::Left,
        PanDirection::Right,
        PanDirection::Up,
        PanDirection::Down,
        PanDirection::ZoomIn,
        PanDirection::ZoomOut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PanDirection::Left => "left",
            PanDirection::Right => "right",
            PanDirection::Up => "up",
            PanDirection::Down => "down",
            PanDirection::ZoomIn => "zoom_in",
            PanDirection::ZoomOut => "zoom_out",
        }
    }

    /// Zoom motions keep the window centered and vary the scale.
    pub fn is_zoom(&self) -> bool {
        matches!(self, PanDirection::ZoomIn | PanDirection::ZoomOut)
    }
}

impl fmt::Display for PanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PanDirection {
    type Err = PanDirectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(PanDirection::Left),
            "right" => Ok(PanDirection::Right),
            "up" => Ok(PanDirection::Up),
            "down" => Ok(PanDirection::Down),
            "zoom_in" => Ok(PanDirection::ZoomIn),
            "zoom_out" => Ok(PanDirection::ZoomOut),
            _ => Err(PanDirectionParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown pan direction: {0}")]
pub struct PanDirectionParseError(String);

/// Validated parallax motion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParallaxSpec {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub zoom_factor: f64,
    pub pan_direction: PanDirection,
    pub intensity: f64,
}

impl Default for ParallaxSpec {
    fn default() -> Self {
        Self {
            duration_seconds: DEFAULT_PARALLAX_DURATION_SECS,
            width: DEFAULT_OUTPUT_WIDTH,
            height: DEFAULT_OUTPUT_HEIGHT,
            zoom_factor: DEFAULT_ZOOM_FACTOR,
            pan_direction: PanDirection::default(),
            intensity: DEFAULT_INTENSITY,
        }
    }
}

impl ParallaxSpec {
    pub fn output(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// Validated parallax request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParallaxParams {
    pub image: MediaSource,
    pub spec: ParallaxSpec,
}

/// Linear interpolation between two values over normalized time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Curve {
    pub start: f64,
    pub end: f64,
}

impl Curve {
    pub fn constant(value: f64) -> Self {
        Self {
            start: value,
            end: value,
        }
    }

    pub fn linear(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Value at normalized time `t` (clamped to `[0, 1]`).
    pub fn at(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        self.start + (self.end - self.start) * t
    }

    pub fn is_constant(&self) -> bool {
        (self.end - self.start).abs() < f64::EPSILON
    }
}

/// Scale-to-fill of the source image onto the output frame.
///
/// The source is scaled uniformly to `scaled_width x scaled_height`
/// (both at least the output size) and the centered output-sized
/// region at `(crop_x, crop_y)` is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CoverGeometry {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub crop_x: u32,
    pub crop_y: u32,
}

/// One evaluated point of a motion plan, in output-frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MotionSample {
    pub t: f64,
    pub scale: f64,
    /// Left edge of the sampled window
    pub offset_x: f64,
    /// Top edge of the sampled window
    pub offset_y: f64,
    pub window_width: f64,
    pub window_height: f64,
}

/// Closed-form camera motion over a filled frame.
///
/// `scale` is the zoom applied to the filled frame (window size is
/// `output / scale`). `pan_x` / `pan_y` are fractions of the travel room
/// `output - window` on each axis: 0.0 is the left/top edge, 1.0 the
/// right/bottom edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MotionPlan {
    pub image: MediaSource,
    pub source: Resolution,
    pub output: Resolution,
    pub cover: CoverGeometry,
    pub direction: PanDirection,
    pub duration_seconds: f64,
    pub fps: u32,
    pub frame_count: u32,
    pub scale: Curve,
    pub pan_x: Curve,
    pub pan_y: Curve,
}

impl MotionPlan {
    /// Evaluate the motion at normalized time `t`.
    ///
    /// Curve values are used as-is, so a scale below 1 or a pan fraction
    /// outside `[0, 1]` yields a window that [`Self::is_within_source`]
    /// rejects.
    pub fn sample(&self, t: f64) -> MotionSample {
        let t = t.clamp(0.0, 1.0);
        let scale = self.scale.at(t);
        let width = self.output.width as f64;
        let height = self.output.height as f64;
        let window_width = width / scale;
        let window_height = height / scale;

        MotionSample {
            t,
            scale,
            offset_x: self.pan_x.at(t) * (width - window_width),
            offset_y: self.pan_y.at(t) * (height - window_height),
            window_width,
            window_height,
        }
    }

    /// `count` samples evenly spaced over `[0, 1]`, endpoints included.
    pub fn samples(&self, count: usize) -> Vec<MotionSample> {
        match count {
            0 => Vec::new(),
            1 => vec![self.sample(0.0)],
            n => (0..n)
                .map(|i| self.sample(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }

    /// Whether a sampled window lies entirely inside the filled frame.
    pub fn is_within_source(&self, sample: &MotionSample) -> bool {
        let width = self.output.width as f64;
        let height = self.output.height as f64;
        sample.offset_x >= -BOUNDS_EPSILON
            && sample.offset_y >= -BOUNDS_EPSILON
            && sample.offset_x + sample.window_width <= width + BOUNDS_EPSILON
            && sample.offset_y + sample.window_height <= height + BOUNDS_EPSILON
    }
}
