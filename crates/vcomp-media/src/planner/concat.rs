//! Concat planner: normalize segments onto one frame and audio layout.

use tracing::debug;
use vcomp_models::concat::CONCAT_FPS;
use vcomp_models::merge::DURATION_TOLERANCE_SECS;
use vcomp_models::{
    AudioFormat, ConcatParams, ConcatPlan, DurationInfo, Resolution, SegmentPlan, ValidationError,
};

use crate::error::{MediaError, MediaResult};

/// What the probe reported for one segment source.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMedia {
    pub resolution: Resolution,
    /// Required only when the segment has no explicit `trim_end`
    pub duration: Option<DurationInfo>,
    pub has_audio: bool,
}

/// Aspect-preserving fit of `source` inside `target`.
///
/// Returns `(scaled_width, scaled_height, pad_left, pad_top)`. Scaled
/// dimensions are rounded down to even values.
pub fn fit_geometry(source: Resolution, target: Resolution) -> (u32, u32, u32, u32) {
    let factor = f64::min(
        target.width as f64 / source.width as f64,
        target.height as f64 / source.height as f64,
    );

    let even = |value: f64, limit: u32| -> u32 {
        let floored = (value + 1e-6).floor() as u32;
        (floored & !1).clamp(2, limit & !1)
    };

    let scaled_width = even(source.width as f64 * factor, target.width);
    let scaled_height = even(source.height as f64 * factor, target.height);

    (
        scaled_width,
        scaled_height,
        (target.width - scaled_width) / 2,
        (target.height - scaled_height) / 2,
    )
}

/// Check the segment count against a configured maximum.
pub fn check_segment_count(count: usize, max_segments: usize) -> MediaResult<()> {
    if count == 0 || count > max_segments {
        return Err(ValidationError::new(
            "segments",
            format!(
                "must contain between 1 and {} segments (got {})",
                max_segments, count
            ),
        )
        .into());
    }
    Ok(())
}

/// Plan every segment, or fail before producing any of them.
pub fn plan_concat(
    params: &ConcatParams,
    media: &[SegmentMedia],
    max_segments: usize,
) -> MediaResult<ConcatPlan> {
    check_segment_count(params.segments.len(), max_segments)?;

    if media.len() != params.segments.len() {
        return Err(MediaError::invariant(format!(
            "{} segments but {} probe results",
            params.segments.len(),
            media.len()
        )));
    }

    let target = params.target();
    let audio = AudioFormat::default();

    let segments = params
        .segments
        .iter()
        .zip(media)
        .enumerate()
        .map(|(index, (segment, info))| {
            let source = segment.source();

            if info.resolution.is_empty() {
                return Err(MediaError::probe_failed(
                    &segment.url,
                    "no video stream dimensions found",
                    None,
                ));
            }

            let source_duration = info.duration.as_ref().map(|d| d.seconds);

            let trim_end = match (segment.trim_end, source_duration) {
                (Some(end), _) => end,
                (None, Some(seconds)) => seconds,
                (None, None) => {
                    return Err(MediaError::probe_failed(
                        &segment.url,
                        "no duration reported and no trimEnd given",
                        None,
                    ))
                }
            };

            if let Some(seconds) = source_duration {
                if segment.trim_start >= seconds {
                    return Err(MediaError::invariant(format!(
                        "segments[{}].trimStart {} is beyond the source duration {}",
                        index, segment.trim_start, seconds
                    )));
                }
                if trim_end > seconds + DURATION_TOLERANCE_SECS {
                    return Err(MediaError::invariant(format!(
                        "segments[{}].trimEnd {} is beyond the source duration {}",
                        index, trim_end, seconds
                    )));
                }
            }

            if trim_end <= segment.trim_start {
                return Err(MediaError::invariant(format!(
                    "segments[{}] has an empty trim window [{}, {}]",
                    index, segment.trim_start, trim_end
                )));
            }

            let (scaled_width, scaled_height, pad_left, pad_top) =
                fit_geometry(info.resolution, target);

            Ok(SegmentPlan {
                index,
                source,
                source_resolution: info.resolution,
                trim_start: segment.trim_start,
                trim_end,
                scaled_width,
                scaled_height,
                pad_left,
                pad_top,
                output: target,
                audio: audio.clone(),
                has_audio: info.has_audio,
            })
        })
        .collect::<MediaResult<Vec<_>>>()?;

    debug!(
        segments = segments.len(),
        target = %target,
        "Planned concat"
    );

    Ok(ConcatPlan {
        target,
        audio,
        fps: CONCAT_FPS,
        segments,
    })
}
