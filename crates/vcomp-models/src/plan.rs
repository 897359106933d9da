//! Composition plans and the resolved-parameter record.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::concat::ConcatPlan;
use crate::merge::{MergePlan, MergeStrategy};
use crate::overlay::{OverlayPlan, OverlayPosition};
use crate::parallax::{MotionPlan, PanDirection};
use crate::request::Action;
use crate::source::Resolution;

/// A fully planned composition, ready for command assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CompositionPlan {
    Merge(MergePlan),
    Parallax(MotionPlan),
    OverlayPip(OverlayPlan),
    Concat(ConcatPlan),
}

impl CompositionPlan {
    pub fn action(&self) -> Action {
        match self {
            CompositionPlan::Merge(_) => Action::Merge,
            CompositionPlan::Parallax(_) => Action::Parallax,
            CompositionPlan::OverlayPip(_) => Action::OverlayPip,
            CompositionPlan::Concat(_) => Action::Concat,
        }
    }

    /// Expected duration of the rendered output in seconds.
    pub fn output_duration(&self) -> f64 {
        match self {
            CompositionPlan::Merge(plan) => plan.output_duration_seconds,
            CompositionPlan::Parallax(plan) => plan.duration_seconds,
            CompositionPlan::OverlayPip(plan) => plan.output_duration_seconds,
            CompositionPlan::Concat(plan) => plan.total_duration(),
        }
    }

    /// Frame size of the rendered output, when the plan fixes it.
    ///
    /// Merge keeps the source video's frame untouched, so it has none.
    pub fn output_resolution(&self) -> Option<Resolution> {
        match self {
            CompositionPlan::Merge(_) => None,
            CompositionPlan::Parallax(plan) => Some(plan.output),
            CompositionPlan::OverlayPip(plan) => Some(plan.background_resolution),
            CompositionPlan::Concat(plan) => Some(plan.target),
        }
    }

    /// Audit record of the values the planner computed.
    pub fn resolved_parameters(&self) -> ResolvedParameters {
        let details = match self {
            CompositionPlan::Merge(plan) => ResolvedDetails::Merge {
                strategy: plan.strategy,
                speed_factor: plan.speed_factor,
                video_duration_seconds: plan.video_duration_seconds,
                audio_duration_seconds: plan.audio_duration_seconds,
                video_weight: plan.weights.video,
                audio_weight: plan.weights.audio,
            },
            CompositionPlan::Parallax(plan) => ResolvedDetails::Parallax {
                direction: plan.direction,
                source_resolution: plan.source,
                frame_count: plan.frame_count,
                fps: plan.fps,
                start_scale: plan.scale.start,
                end_scale: plan.scale.end,
            },
            CompositionPlan::OverlayPip(plan) => {
                let (x, y) = plan.overlay_origin();
                ResolvedDetails::OverlayPip {
                    position: plan.position,
                    center_x: plan.center_x,
                    center_y: plan.center_y,
                    mask_radius: plan.mask_radius,
                    overlay_x: x,
                    overlay_y: y,
                    border_width: plan.border_width,
                    border_color: plan.border_color.clone(),
                }
            }
            CompositionPlan::Concat(plan) => ResolvedDetails::Concat {
                segments: plan
                    .segments
                    .iter()
                    .map(|s| ResolvedSegment {
                        index: s.index,
                        url: s.source.url.clone(),
                        trim_start: s.trim_start,
                        trim_end: s.trim_end,
                        source_resolution: s.source_resolution,
                    })
                    .collect(),
            },
        };

        ResolvedParameters {
            action: self.action(),
            output_duration_seconds: self.output_duration(),
            resolution: self.output_resolution(),
            details,
        }
    }
}

/// What the planner decided, recorded next to the rendered output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedParameters {
    pub action: Action,
    pub output_duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    pub details: ResolvedDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedDetails {
    Merge {
        strategy: MergeStrategy,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed_factor: Option<f64>,
        video_duration_seconds: f64,
        audio_duration_seconds: f64,
        video_weight: f64,
        audio_weight: f64,
    },
    Parallax {
        direction: PanDirection,
        source_resolution: Resolution,
        frame_count: u32,
        fps: u32,
        start_scale: f64,
        end_scale: f64,
    },
    OverlayPip {
        position: OverlayPosition,
        center_x: f64,
        center_y: f64,
        mask_radius: f64,
        overlay_x: i64,
        overlay_y: i64,
        border_width: u32,
        border_color: String,
    },
    Concat {
        segments: Vec<ResolvedSegment>,
    },
}

/// Trim window actually used for one concat segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedSegment {
    pub index: usize,
    pub url: String,
    pub trim_start: f64,
    pub trim_end: f64,
    pub source_resolution: Resolution,
}
