//! Circular picture-in-picture overlay parameters and plan.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::source::{MediaSource, Resolution};

pub const DEFAULT_PIP_SIZE: u32 = 200;
pub const MIN_PIP_SIZE: u32 = 50;
pub const MAX_PIP_SIZE: u32 = 800;

pub const DEFAULT_PIP_MARGIN: u32 = 20;
pub const MAX_PIP_MARGIN: u32 = 200;

pub const DEFAULT_BORDER_WIDTH: u32 = 3;
pub const MAX_BORDER_WIDTH: u32 = 20;

pub const DEFAULT_BORDER_COLOR: &str = "#ffffff";

/// Frame corner the overlay is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPosition {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

impl OverlayPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayPosition::BottomRight => "bottom_right",
            OverlayPosition::BottomLeft => "bottom_left",
            OverlayPosition::TopRight => "top_right",
            OverlayPosition::TopLeft => "top_left",
        }
    }

    /// Whether the horizontal coordinate is measured from the right edge.
    pub fn is_right(&self) -> bool {
        matches!(self, OverlayPosition::BottomRight | OverlayPosition::TopRight)
    }

    /// Whether the vertical coordinate is measured from the bottom edge.
    pub fn is_bottom(&self) -> bool {
        matches!(self, OverlayPosition::BottomRight | OverlayPosition::BottomLeft)
    }
}

impl fmt::Display for OverlayPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverlayPosition {
    type Err = OverlayPositionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bottom_right" => Ok(OverlayPosition::BottomRight),
            "bottom_left" => Ok(OverlayPosition::BottomLeft),
            "top_right" => Ok(OverlayPosition::TopRight),
            "top_left" => Ok(OverlayPosition::TopLeft),
            _ => Err(OverlayPositionParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown overlay position: {0}")]
pub struct OverlayPositionParseError(String);

/// Validated overlay geometry parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverlaySpec {
    pub position: OverlayPosition,
    /// Circle diameter in pixels
    pub size: u32,
    /// Distance from the anchored frame edges in pixels
    pub margin: u32,
    pub border_width: u32,
    /// Normalized `#rrggbb`
    pub border_color: String,
}

impl Default for OverlaySpec {
    fn default() -> Self {
        Self {
            position: OverlayPosition::default(),
            size: DEFAULT_PIP_SIZE,
            margin: DEFAULT_PIP_MARGIN,
            border_width: DEFAULT_BORDER_WIDTH,
            border_color: DEFAULT_BORDER_COLOR.to_string(),
        }
    }
}

impl OverlaySpec {
    /// Space the overlay claims along each axis: `2*margin + size + 2*border`.
    pub fn footprint(&self) -> u32 {
        2 * self.margin + self.size + 2 * self.border_width
    }
}

/// Validated overlay request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverlayParams {
    pub background: MediaSource,
    pub overlay: MediaSource,
    pub spec: OverlaySpec,
}

/// Resolved overlay placement against a concrete background frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverlayPlan {
    pub background: MediaSource,
    pub overlay: MediaSource,
    pub background_resolution: Resolution,
    pub position: OverlayPosition,
    /// Circle diameter in pixels
    pub size: u32,
    pub mask_radius: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub border_width: u32,
    pub border_color: String,
    /// Shorter of the background and overlay durations
    pub output_duration_seconds: f64,
}

impl OverlayPlan {
    /// Top-left corner of the `size x size` overlay square.
    pub fn overlay_origin(&self) -> (i64, i64) {
        (
            (self.center_x - self.mask_radius).round() as i64,
            (self.center_y - self.mask_radius).round() as i64,
        )
    }

    /// Side of the square holding the border ring.
    pub fn ring_size(&self) -> u32 {
        self.size + 2 * self.border_width
    }

    /// Top-left corner of the border ring square.
    pub fn ring_origin(&self) -> (i64, i64) {
        let (x, y) = self.overlay_origin();
        let border = self.border_width as i64;
        (x - border, y - border)
    }

    pub fn has_border(&self) -> bool {
        self.border_width > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_parse_and_edges() {
        assert_eq!(
            "top_left".parse::<OverlayPosition>().unwrap(),
            OverlayPosition::TopLeft
        );
        assert!("center".parse::<OverlayPosition>().is_err());
        assert!(OverlayPosition::BottomRight.is_right());
        assert!(OverlayPosition::BottomRight.is_bottom());
        assert!(!OverlayPosition::TopLeft.is_right());
        assert!(!OverlayPosition::TopLeft.is_bottom());
    }

    #[test]
    fn test_footprint() {
        let spec = OverlaySpec {
            size: 800,
            margin: 200,
            border_width: 20,
            ..Default::default()
        };
        assert_eq!(spec.footprint(), 1240);
    }
}
