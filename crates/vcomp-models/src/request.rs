//! Inbound request schema and the validation layer.
//!
//! A raw request is a JSON object tagged by `action`. Field names are
//! camelCase on the wire (snake_case aliases are accepted). Validation turns
//! a raw request into a fully-defaulted [`ComposeRequest`] or a
//! [`ValidationError`] naming the first offending field. Nothing is planned
//! until validation passes.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::concat::{ConcatParams, Segment, MAX_SEGMENTS};
use crate::merge::{MergeParams, VolumeSpec, DEFAULT_VOLUME, MAX_VOLUME, MIN_VOLUME};
use crate::overlay::{
    OverlayParams, OverlayPosition, OverlaySpec, DEFAULT_BORDER_COLOR, DEFAULT_BORDER_WIDTH,
    DEFAULT_PIP_MARGIN, DEFAULT_PIP_SIZE, MAX_BORDER_WIDTH, MAX_PIP_MARGIN, MAX_PIP_SIZE,
    MIN_PIP_SIZE,
};
use crate::parallax::{
    PanDirection, ParallaxParams, ParallaxSpec, DEFAULT_INTENSITY, DEFAULT_OUTPUT_HEIGHT,
    DEFAULT_OUTPUT_WIDTH, DEFAULT_PARALLAX_DURATION_SECS, DEFAULT_ZOOM_FACTOR,
    MAX_INTENSITY, MAX_PARALLAX_DIMENSION, MAX_PARALLAX_DURATION_SECS, MAX_ZOOM_FACTOR,
    MIN_INTENSITY, MIN_PARALLAX_HEIGHT, MIN_PARALLAX_WIDTH, MIN_ZOOM_FACTOR,
};
use crate::source::MediaSource;
use crate::validation::{
    check_range, check_range_exclusive_min, check_range_int, lenient, parse_hex_color, require_url,
    ValidationError, ValidationResult,
};

/// Action used when a request carries no `action` tag.
pub const DEFAULT_ACTION: Action = Action::Merge;

/// Largest target dimension accepted for concat output.
pub const MAX_CONCAT_DIMENSION: u32 = 4096;

/// Supported editing intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Merge,
    Parallax,
    OverlayPip,
    Concat,
}

impl Action {
    pub const ALL: &'static [Action] = &[
        Action::Merge,
        Action::Parallax,
        Action::OverlayPip,
        Action::Concat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Merge => "merge",
            Action::Parallax => "parallax",
            Action::OverlayPip => "overlay_pip",
            Action::Concat => "concat",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                ValidationError::new(
                    "action",
                    format!(
                        "must be one of merge, parallax, overlay_pip, concat (got '{}')",
                        s
                    ),
                )
            })
    }
}

// =============================================================================
// Raw wire schema
// =============================================================================

fn default_volume() -> f64 {
    DEFAULT_VOLUME
}
fn default_parallax_duration() -> f64 {
    DEFAULT_PARALLAX_DURATION_SECS
}
fn default_width() -> i64 {
    DEFAULT_OUTPUT_WIDTH as i64
}
fn default_height() -> i64 {
    DEFAULT_OUTPUT_HEIGHT as i64
}
fn default_zoom_factor() -> f64 {
    DEFAULT_ZOOM_FACTOR
}
fn default_pan_direction() -> String {
    PanDirection::default().as_str().to_string()
}
fn default_intensity() -> f64 {
    DEFAULT_INTENSITY
}
fn default_position() -> String {
    OverlayPosition::default().as_str().to_string()
}
fn default_pip_size() -> i64 {
    DEFAULT_PIP_SIZE as i64
}
fn default_pip_margin() -> i64 {
    DEFAULT_PIP_MARGIN as i64
}
fn default_border_width() -> i64 {
    DEFAULT_BORDER_WIDTH as i64
}
fn default_border_color() -> String {
    DEFAULT_BORDER_COLOR.to_string()
}

/// Request as received, before validation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RawRequest {
    Merge(MergeRequest),
    Parallax(ParallaxRequest),
    OverlayPip(OverlayRequest),
    Concat(ConcatRequest),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    #[serde(default, alias = "video_url")]
    pub video_url: Option<String>,
    #[serde(default, alias = "audio_url")]
    pub audio_url: Option<String>,
    #[serde(default = "default_volume", alias = "video_volume", deserialize_with = "lenient::float")]
    pub video_volume: f64,
    #[serde(default = "default_volume", alias = "audio_volume", deserialize_with = "lenient::float")]
    pub audio_volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParallaxRequest {
    #[serde(default, alias = "image_url")]
    pub image_url: Option<String>,
    #[serde(default = "default_parallax_duration", deserialize_with = "lenient::float")]
    pub duration: f64,
    #[serde(default = "default_width", deserialize_with = "lenient::integer")]
    pub width: i64,
    #[serde(default = "default_height", deserialize_with = "lenient::integer")]
    pub height: i64,
    #[serde(default = "default_zoom_factor", alias = "zoom_factor", deserialize_with = "lenient::float")]
    pub zoom_factor: f64,
    #[serde(default = "default_pan_direction", alias = "pan_direction")]
    pub pan_direction: String,
    #[serde(default = "default_intensity", deserialize_with = "lenient::float")]
    pub intensity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRequest {
    #[serde(default, alias = "background_url")]
    pub background_url: Option<String>,
    #[serde(default, alias = "overlay_url")]
    pub overlay_url: Option<String>,
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(default = "default_pip_size", deserialize_with = "lenient::integer")]
    pub size: i64,
    #[serde(default = "default_pip_margin", deserialize_with = "lenient::integer")]
    pub margin: i64,
    #[serde(default = "default_border_width", alias = "border_width", deserialize_with = "lenient::integer")]
    pub border_width: i64,
    #[serde(default = "default_border_color", alias = "border_color")]
    pub border_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "trim_start", deserialize_with = "lenient::float")]
    pub trim_start: f64,
    #[serde(default, alias = "trim_end", deserialize_with = "lenient::optional_float")]
    pub trim_end: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConcatRequest {
    #[serde(default)]
    pub segments: Vec<SegmentRequest>,
    #[serde(default = "default_width", deserialize_with = "lenient::integer")]
    pub width: i64,
    #[serde(default = "default_height", deserialize_with = "lenient::integer")]
    pub height: i64,
}

// =============================================================================
// Validated requests
// =============================================================================

/// A fully-defaulted, validated request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ComposeRequest {
    Merge(MergeParams),
    Parallax(ParallaxParams),
    OverlayPip(OverlayParams),
    Concat(ConcatParams),
}

impl ComposeRequest {
    pub fn action(&self) -> Action {
        match self {
            ComposeRequest::Merge(_) => Action::Merge,
            ComposeRequest::Parallax(_) => Action::Parallax,
            ComposeRequest::OverlayPip(_) => Action::OverlayPip,
            ComposeRequest::Concat(_) => Action::Concat,
        }
    }
}

/// Validate a request body given as a JSON string.
pub fn parse_request(body: &str) -> ValidationResult<ComposeRequest> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ValidationError::new("request", format!("must be valid JSON ({})", e)))?;
    validate_request(&value)
}

/// Validate a raw JSON request.
///
/// A missing `action` defaults to `merge`.
pub fn validate_request(value: &Value) -> ValidationResult<ComposeRequest> {
    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::new("request", "must be a JSON object"))?;

    let action = match object.get("action") {
        None | Some(Value::Null) => DEFAULT_ACTION,
        Some(Value::String(tag)) => tag.parse::<Action>()?,
        Some(other) => {
            return Err(ValidationError::new(
                "action",
                format!("must be a string (got {})", other),
            ))
        }
    };

    let raw = match action {
        Action::Merge => RawRequest::Merge(decode(value)?),
        Action::Parallax => RawRequest::Parallax(decode(value)?),
        Action::OverlayPip => RawRequest::OverlayPip(decode(value)?),
        Action::Concat => RawRequest::Concat(decode(value)?),
    };

    raw.validate()
}

/// Decode the action's fields, naming the field on a type mismatch.
fn decode<T: DeserializeOwned>(value: &Value) -> ValidationResult<T> {
    serde_path_to_error::deserialize(value.clone()).map_err(|e| {
        let field = match e.path().to_string() {
            path if path == "." => "request".to_string(),
            path => path,
        };
        ValidationError::new(field, e.into_inner().to_string())
    })
}

impl RawRequest {
    pub fn validate(&self) -> ValidationResult<ComposeRequest> {
        match self {
            RawRequest::Merge(req) => req.validate().map(ComposeRequest::Merge),
            RawRequest::Parallax(req) => req.validate().map(ComposeRequest::Parallax),
            RawRequest::OverlayPip(req) => req.validate().map(ComposeRequest::OverlayPip),
            RawRequest::Concat(req) => req.validate().map(ComposeRequest::Concat),
        }
    }
}

impl MergeRequest {
    pub fn validate(&self) -> ValidationResult<MergeParams> {
        let video_url = require_url("videoUrl", self.video_url.as_deref())?;
        let audio_url = require_url("audioUrl", self.audio_url.as_deref())?;
        check_range("videoVolume", self.video_volume, MIN_VOLUME, MAX_VOLUME)?;
        check_range("audioVolume", self.audio_volume, MIN_VOLUME, MAX_VOLUME)?;

        Ok(MergeParams {
            video: MediaSource::video(video_url),
            audio: MediaSource::audio(audio_url),
            volume: VolumeSpec::new(self.video_volume, self.audio_volume),
        })
    }
}

impl ParallaxRequest {
    pub fn validate(&self) -> ValidationResult<ParallaxParams> {
        let image_url = require_url("imageUrl", self.image_url.as_deref())?;
        check_range_exclusive_min("duration", self.duration, 0.0, MAX_PARALLAX_DURATION_SECS)?;
        let width = check_range_int("width", self.width, MIN_PARALLAX_WIDTH, MAX_PARALLAX_DIMENSION)?;
        let height =
            check_range_int("height", self.height, MIN_PARALLAX_HEIGHT, MAX_PARALLAX_DIMENSION)?;
        check_range("zoomFactor", self.zoom_factor, MIN_ZOOM_FACTOR, MAX_ZOOM_FACTOR)?;
        let pan_direction = self.pan_direction.parse::<PanDirection>().map_err(|_| {
            ValidationError::new(
                "panDirection",
                format!(
                    "must be one of left, right, up, down, zoom_in, zoom_out (got '{}')",
                    self.pan_direction
                ),
            )
        })?;
        check_range("intensity", self.intensity, MIN_INTENSITY, MAX_INTENSITY)?;

        Ok(ParallaxParams {
            image: MediaSource::image(image_url),
            spec: ParallaxSpec {
                duration_seconds: self.duration,
                width,
                height,
                zoom_factor: self.zoom_factor,
                pan_direction,
                intensity: self.intensity,
            },
        })
    }
}

impl OverlayRequest {
    pub fn validate(&self) -> ValidationResult<OverlayParams> {
        let background_url = require_url("backgroundUrl", self.background_url.as_deref())?;
        let overlay_url = require_url("overlayUrl", self.overlay_url.as_deref())?;
        let position = self.position.parse::<OverlayPosition>().map_err(|_| {
            ValidationError::new(
                "position",
                format!(
                    "must be one of bottom_right, bottom_left, top_right, top_left (got '{}')",
                    self.position
                ),
            )
        })?;
        let size = check_range_int("size", self.size, MIN_PIP_SIZE, MAX_PIP_SIZE)?;
        let margin = check_range_int("margin", self.margin, 0, MAX_PIP_MARGIN)?;
        let border_width = check_range_int("borderWidth", self.border_width, 0, MAX_BORDER_WIDTH)?;
        let border_color = parse_hex_color("borderColor", &self.border_color)?;

        Ok(OverlayParams {
            background: MediaSource::video(background_url),
            overlay: MediaSource::video(overlay_url),
            spec: OverlaySpec {
                position,
                size,
                margin,
                border_width,
                border_color,
            },
        })
    }
}

impl ConcatRequest {
    pub fn validate(&self) -> ValidationResult<ConcatParams> {
        if self.segments.is_empty() || self.segments.len() > MAX_SEGMENTS {
            return Err(ValidationError::new(
                "segments",
                format!(
                    "must contain between 1 and {} segments (got {})",
                    MAX_SEGMENTS,
                    self.segments.len()
                ),
            ));
        }

        let segments = self
            .segments
            .iter()
            .enumerate()
            .map(|(index, segment)| segment.validate(index))
            .collect::<ValidationResult<Vec<_>>>()?;

        let width = check_range_int("width", self.width, 2, MAX_CONCAT_DIMENSION)?;
        let height = check_range_int("height", self.height, 2, MAX_CONCAT_DIMENSION)?;

        Ok(ConcatParams {
            segments,
            width,
            height,
        })
    }
}

impl SegmentRequest {
    fn validate(&self, index: usize) -> ValidationResult<Segment> {
        let field = |name: &str| format!("segments[{}].{}", index, name);

        let url = require_url(&field("url"), self.url.as_deref())?;

        if !self.trim_start.is_finite() || self.trim_start < 0.0 {
            return Err(ValidationError::new(
                field("trimStart"),
                format!("must be >= 0 (got {})", self.trim_start),
            ));
        }

        if let Some(end) = self.trim_end {
            if !end.is_finite() || end <= self.trim_start {
                return Err(ValidationError::new(
                    field("trimEnd"),
                    format!(
                        "must be greater than trimStart ({} <= {})",
                        end, self.trim_start
                    ),
                ));
            }
        }

        Ok(Segment::new(url).with_trim(self.trim_start, self.trim_end))
    }
}
