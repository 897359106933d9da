//! Parallax planner: camera motion over a still image.
//!
//! The image is first scaled to cover the output frame and center-cropped,
//! so motion is always sampled from a fully populated frame. Motion is a
//! closed form over normalized time: a zoom curve and two pan-fraction
//! curves (see [`MotionPlan`]).

use tracing::debug;
use vcomp_models::parallax::PARALLAX_FPS;
use vcomp_models::{CoverGeometry, Curve, MotionPlan, PanDirection, ParallaxParams, Resolution};

use crate::error::{MediaError, MediaResult};

/// Normalized times checked against the source bounds before a plan is
/// returned.
pub const CHECK_POINTS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Scale-to-fill geometry for `source` onto `output`.
pub fn cover_geometry(source: Resolution, output: Resolution) -> CoverGeometry {
    let scale = f64::max(
        output.width as f64 / source.width as f64,
        output.height as f64 / source.height as f64,
    );

    // Slack keeps exact fits from rounding up a pixel
    let scaled_width = ((source.width as f64 * scale - 1e-6).ceil() as u32).max(output.width);
    let scaled_height = ((source.height as f64 * scale - 1e-6).ceil() as u32).max(output.height);

    CoverGeometry {
        scaled_width,
        scaled_height,
        crop_x: (scaled_width - output.width) / 2,
        crop_y: (scaled_height - output.height) / 2,
    }
}

/// Zoom and pan curves for a direction.
///
/// Returns `(scale, pan_x, pan_y)`.
pub fn motion_curves(direction: PanDirection, zoom_factor: f64, intensity: f64) -> (Curve, Curve, Curve) {
    let centered = Curve::constant(0.5);
    let peak = 1.0 + (zoom_factor - 1.0) * intensity;
    let low = (0.5 - intensity / 2.0).clamp(0.0, 1.0);
    let high = (0.5 + intensity / 2.0).clamp(0.0, 1.0);

    match direction {
        PanDirection::ZoomIn => (Curve::linear(1.0, peak.max(1.0)), centered, centered),
        PanDirection::ZoomOut => (Curve::linear(peak.max(1.0), 1.0), centered, centered),
        // The window travels toward the named edge
        PanDirection::Left => (Curve::constant(zoom_factor), Curve::linear(high, low), centered),
        PanDirection::Right => (Curve::constant(zoom_factor), Curve::linear(low, high), centered),
        PanDirection::Up => (Curve::constant(zoom_factor), centered, Curve::linear(high, low)),
        PanDirection::Down => (Curve::constant(zoom_factor), centered, Curve::linear(low, high)),
    }
}

/// Total frames for a clip, never zero.
pub fn frame_count(duration_seconds: f64, fps: u32) -> u32 {
    ((duration_seconds * fps as f64).round() as u32).max(1)
}

/// Reject a plan whose window leaves the filled frame at any check point.
pub fn check_bounds(plan: &MotionPlan) -> MediaResult<()> {
    for t in CHECK_POINTS {
        let sample = plan.sample(t);
        if !plan.is_within_source(&sample) {
            return Err(MediaError::invariant(format!(
                "parallax window at t={} leaves the source frame ({:?})",
                t, sample
            )));
        }
    }
    Ok(())
}

/// Build the motion plan for an image of the given resolution.
pub fn plan_parallax(params: &ParallaxParams, source: Resolution) -> MediaResult<MotionPlan> {
    if source.is_empty() {
        return Err(MediaError::probe_failed(
            &params.image.url,
            "image has no dimensions",
            None,
        ));
    }

    let spec = &params.spec;
    let output = spec.output();
    let (scale, pan_x, pan_y) = motion_curves(spec.pan_direction, spec.zoom_factor, spec.intensity);

    let plan = MotionPlan {
        image: params.image.clone(),
        source,
        output,
        cover: cover_geometry(source, output),
        direction: spec.pan_direction,
        duration_seconds: spec.duration_seconds,
        fps: PARALLAX_FPS,
        frame_count: frame_count(spec.duration_seconds, PARALLAX_FPS),
        scale,
        pan_x,
        pan_y,
    };

    check_bounds(&plan)?;

    debug!(
        direction = %plan.direction,
        frames = plan.frame_count,
        scaled = %format!("{}x{}", plan.cover.scaled_width, plan.cover.scaled_height),
        "Planned parallax"
    );

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcomp_models::{MediaSource, ParallaxSpec};

    fn params(spec: ParallaxSpec) -> ParallaxParams {
        ParallaxParams {
            image: MediaSource::image("https://example.com/i.jpg"),
            spec,
        }
    }

    #[test]
    fn test_cover_geometry_wide_source() {
        // 4:3 source onto 16:9 output: width bound, height overflows
        let cover = cover_geometry(Resolution::new(1600, 1200), Resolution::new(1920, 1080));
        assert_eq!(cover.scaled_width, 1920);
        assert_eq!(cover.scaled_height, 1440);
        assert_eq!(cover.crop_x, 0);
        assert_eq!(cover.crop_y, 180);
    }

    #[test]
    fn test_cover_geometry_exact_fit() {
        let cover = cover_geometry(Resolution::new(960, 540), Resolution::new(1920, 1080));
        assert_eq!((cover.scaled_width, cover.scaled_height), (1920, 1080));
        assert_eq!((cover.crop_x, cover.crop_y), (0, 0));
    }

    #[test]
    fn test_zoom_in_curve() {
        let (scale, pan_x, pan_y) = motion_curves(PanDirection::ZoomIn, 1.2, 0.5);
        assert!((scale.start - 1.0).abs() < 1e-9);
        assert!((scale.end - 1.1).abs() < 1e-9);
        assert!(pan_x.is_constant() && pan_y.is_constant());

        let (scale, _, _) = motion_curves(PanDirection::ZoomOut, 2.0, 1.0);
        assert!((scale.start - 2.0).abs() < 1e-9);
        assert!((scale.end - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_left_pan_moves_window_left() {
        let plan = plan_parallax(
            &params(ParallaxSpec {
                pan_direction: PanDirection::Left,
                intensity: 1.0,
                ..Default::default()
            }),
            Resolution::new(1920, 1080),
        )
        .unwrap();

        let start = plan.sample(0.0);
        let end = plan.sample(1.0);
        assert!(start.offset_x > end.offset_x);
        assert!(end.offset_x.abs() < 1e-6);
    }

    #[test]
    fn test_every_direction_stays_in_bounds() {
        let sources = [
            Resolution::new(1920, 1080),
            Resolution::new(800, 1200),
            Resolution::new(4000, 500),
        ];
        for &direction in PanDirection::ALL {
            for &(zoom_factor, intensity) in &[(1.1, 0.1), (1.2, 0.5), (2.0, 1.0)] {
                for &source in &sources {
                    let plan = plan_parallax(
                        &params(ParallaxSpec {
                            pan_direction: direction,
                            zoom_factor,
                            intensity,
                            width: 1280,
                            height: 720,
                            ..Default::default()
                        }),
                        source,
                    )
                    .unwrap();

                    for t in CHECK_POINTS {
                        let sample = plan.sample(t);
                        assert!(plan.is_within_source(&sample), "{:?} t={}", direction, t);
                        assert!(sample.scale >= 1.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_bad_curves_are_rejected() {
        let mut plan = plan_parallax(
            &params(ParallaxSpec {
                pan_direction: PanDirection::Right,
                ..Default::default()
            }),
            Resolution::new(1920, 1080),
        )
        .unwrap();
        assert!(check_bounds(&plan).is_ok());

        plan.pan_x = Curve::linear(3.0, -2.0);
        assert!(matches!(
            check_bounds(&plan),
            Err(MediaError::PlanningInvariantViolation(_))
        ));

        plan.pan_x = Curve::constant(0.5);
        plan.scale = Curve::constant(0.5);
        assert!(matches!(
            check_bounds(&plan),
            Err(MediaError::PlanningInvariantViolation(_))
        ));
    }

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(10.0, 30), 300);
        assert_eq!(frame_count(0.01, 30), 1);
        assert_eq!(frame_count(2.5, 30), 75);
    }

    #[test]
    fn test_empty_source_is_probe_failure() {
        let err = plan_parallax(&params(ParallaxSpec::default()), Resolution::new(0, 0)).unwrap_err();
        assert!(matches!(err, MediaError::ProbeFailed { .. }));
    }
}
