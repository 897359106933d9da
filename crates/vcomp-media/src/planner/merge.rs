//! Merge planner: reconcile a video and an independent audio track.

use tracing::debug;
use vcomp_models::merge::DURATION_TOLERANCE_SECS;
use vcomp_models::{DurationInfo, MergeParams, MergePlan, MergeStrategy, MixWeights, VolumeSpec};

use crate::error::{MediaError, MediaResult};

/// Gains for summing the two tracks.
///
/// Each track's weight is its volume over the sum of both volumes; two
/// silent tracks split evenly.
pub fn mix_weights(volume: &VolumeSpec) -> MixWeights {
    let total = volume.video_volume + volume.audio_volume;
    if total <= 0.0 {
        return MixWeights {
            video: 0.5,
            audio: 0.5,
        };
    }
    MixWeights {
        video: volume.video_volume / total,
        audio: volume.audio_volume / total,
    }
}

/// Pick a strategy and compute the output timeline.
///
/// `video_has_audio` records whether the video brings its own track to
/// the mix.
pub fn plan_merge(
    params: &MergeParams,
    video: &DurationInfo,
    audio: &DurationInfo,
    video_has_audio: bool,
) -> MediaResult<MergePlan> {
    let vd = video.seconds;
    let ad = audio.seconds;
    let weights = mix_weights(&params.volume);
    let equal = (ad - vd).abs() <= DURATION_TOLERANCE_SECS;

    let (strategy, speed_factor) = if ad > vd && !equal {
        if vd <= 0.0 {
            return Err(MediaError::invariant(format!(
                "video {} has zero duration and cannot be stretched to {}s of audio",
                video.source_ref, ad
            )));
        }
        (MergeStrategy::SpeedAdjustVideo, Some(vd / ad))
    } else {
        (MergeStrategy::MixAudioTracks, None)
    };

    debug!(
        video_duration = vd,
        audio_duration = ad,
        strategy = %strategy,
        speed_factor = ?speed_factor,
        "Planned merge"
    );

    Ok(MergePlan {
        video: params.video.clone(),
        audio: params.audio.clone(),
        strategy,
        speed_factor,
        output_duration_seconds: vd.max(ad),
        video_volume: params.volume.video_volume,
        audio_volume: params.volume.audio_volume,
        weights,
        video_duration_seconds: vd,
        audio_duration_seconds: ad,
        video_has_audio,
    })
}
