//! Video + audio merge parameters and plan.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::MediaSource;

/// Default volume multiplier for both tracks.
pub const DEFAULT_VOLUME: f64 = 1.0;
/// Lowest accepted volume multiplier (silence).
pub const MIN_VOLUME: f64 = 0.0;
/// Highest accepted volume multiplier.
pub const MAX_VOLUME: f64 = 2.0;

/// Durations closer than this are treated as equal (seconds).
pub const DURATION_TOLERANCE_SECS: f64 = 0.05;

/// Volume multipliers for the two merged tracks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VolumeSpec {
    /// Multiplier for the video's own audio track
    pub video_volume: f64,
    /// Multiplier for the independent audio track
    pub audio_volume: f64,
}

impl Default for VolumeSpec {
    fn default() -> Self {
        Self {
            video_volume: DEFAULT_VOLUME,
            audio_volume: DEFAULT_VOLUME,
        }
    }
}

impl VolumeSpec {
    pub fn new(video_volume: f64, audio_volume: f64) -> Self {
        Self {
            video_volume,
            audio_volume,
        }
    }
}

/// Validated merge request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MergeParams {
    pub video: MediaSource,
    pub audio: MediaSource,
    pub volume: VolumeSpec,
}

/// How the two durations are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Audio is longer: slow the video down to the audio's length.
    SpeedAdjustVideo,
    /// Video is longer (or equal): mix audio, truncate to the video.
    MixAudioTracks,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::SpeedAdjustVideo => "speed_adjust_video",
            MergeStrategy::MixAudioTracks => "mix_audio_tracks",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative gains applied when the two audio tracks are summed.
///
/// The weights always sum to 1.0, so the mixed peak never exceeds the
/// louder of the two volume-scaled inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MixWeights {
    pub video: f64,
    pub audio: f64,
}

/// Output of the merge planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MergePlan {
    pub video: MediaSource,
    pub audio: MediaSource,
    pub strategy: MergeStrategy,
    /// `video_duration / audio_duration`, only for `SpeedAdjustVideo`
    pub speed_factor: Option<f64>,
    /// Always `max(video_duration, audio_duration)`
    pub output_duration_seconds: f64,
    pub video_volume: f64,
    pub audio_volume: f64,
    pub weights: MixWeights,
    pub video_duration_seconds: f64,
    pub audio_duration_seconds: f64,
    /// Whether the video carries its own audio track
    pub video_has_audio: bool,
}

impl MergePlan {
    /// Factor applied to presentation timestamps to stretch the video.
    pub fn pts_multiplier(&self) -> Option<f64> {
        self.speed_factor.map(|f| 1.0 / f)
    }

    /// Gains applied to each track in the final mix.
    ///
    /// With both tracks present the gains are the mix weights, so their
    /// ratio is `video_volume : audio_volume` and their sum is at most 1.
    /// Two zero volumes mute the output. A video without audio leaves
    /// nothing to balance, so the audio track plays at its own volume.
    pub fn track_gains(&self) -> MixWeights {
        if !self.video_has_audio {
            return MixWeights {
                video: 0.0,
                audio: self.audio_volume,
            };
        }
        if self.video_volume + self.audio_volume <= 0.0 {
            return MixWeights {
                video: 0.0,
                audio: 0.0,
            };
        }
        self.weights
    }

    /// Whether the video stream can be copied without re-encoding.
    pub fn video_passthrough(&self) -> bool {
        self.strategy == MergeStrategy::MixAudioTracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(video_volume: f64, audio_volume: f64, video_has_audio: bool) -> MergePlan {
        let total = video_volume + audio_volume;
        MergePlan {
            video: MediaSource::video("https://example.com/v.mp4"),
            audio: MediaSource::audio("https://example.com/a.mp3"),
            strategy: MergeStrategy::MixAudioTracks,
            speed_factor: None,
            output_duration_seconds: 20.0,
            video_volume,
            audio_volume,
            weights: MixWeights {
                video: video_volume / total,
                audio: audio_volume / total,
            },
            video_duration_seconds: 20.0,
            audio_duration_seconds: 8.0,
            video_has_audio,
        }
    }

    #[test]
    fn test_track_gains_keep_requested_ratio() {
        let gains = plan(2.0, 0.5, true).track_gains();
        assert!((gains.video / gains.audio - 4.0).abs() < 1e-9);
        assert!((gains.video + gains.audio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_track_gains_silent_video() {
        let gains = plan(1.0, 0.8, false).track_gains();
        assert_eq!(gains.video, 0.0);
        assert_eq!(gains.audio, 0.8);
    }

    #[test]
    fn test_track_gains_both_muted() {
        let mut muted = plan(1.0, 1.0, true);
        muted.video_volume = 0.0;
        muted.audio_volume = 0.0;
        muted.weights = MixWeights {
            video: 0.5,
            audio: 0.5,
        };
        let gains = muted.track_gains();
        assert_eq!((gains.video, gains.audio), (0.0, 0.0));
    }
}
