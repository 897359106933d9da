//! Overlay planner: place a circular picture-in-picture on a background.

use tracing::debug;
use vcomp_models::{DurationInfo, OverlayParams, OverlayPlan, OverlaySpec, Resolution};

use crate::error::{MediaError, MediaResult};

/// Circle center for an overlay against a background frame.
///
/// The anchor corner's edges sit `max(margin, border_width)` away from the
/// circle, so the border ring is never cut by the frame.
pub fn circle_center(spec: &OverlaySpec, background: Resolution) -> (f64, f64) {
    let radius = spec.size as f64 / 2.0;
    let inset = spec.margin.max(spec.border_width) as f64;

    let x = if spec.position.is_right() {
        background.width as f64 - inset - radius
    } else {
        inset + radius
    };
    let y = if spec.position.is_bottom() {
        background.height as f64 - inset - radius
    } else {
        inset + radius
    };

    (x, y)
}

/// Resolve overlay geometry, rejecting specs that do not fit the frame.
pub fn plan_overlay(
    params: &OverlayParams,
    background: Resolution,
    background_duration: &DurationInfo,
    overlay_duration: &DurationInfo,
) -> MediaResult<OverlayPlan> {
    let spec = &params.spec;
    let footprint = spec.footprint();

    if footprint > background.min_side() {
        return Err(MediaError::invariant(format!(
            "overlay needs {}px (2*margin {} + size {} + 2*border {}) but background {} allows {}px",
            footprint,
            spec.margin,
            spec.size,
            spec.border_width,
            background,
            background.min_side()
        )));
    }

    let (center_x, center_y) = circle_center(spec, background);

    let plan = OverlayPlan {
        background: params.background.clone(),
        overlay: params.overlay.clone(),
        background_resolution: background,
        position: spec.position,
        size: spec.size,
        mask_radius: spec.size as f64 / 2.0,
        center_x,
        center_y,
        border_width: spec.border_width,
        border_color: spec.border_color.clone(),
        output_duration_seconds: background_duration.seconds.min(overlay_duration.seconds),
    };

    debug!(
        position = %plan.position,
        center_x = plan.center_x,
        center_y = plan.center_y,
        background = %background,
        "Planned overlay"
    );

    Ok(plan)
}
