//! Worker configuration.

use std::str::FromStr;
use std::time::Duration;

use vcomp_media::probe::DEFAULT_PROBE_TIMEOUT_SECS;
use vcomp_media::ComposerConfig;
use vcomp_models::concat::MAX_SEGMENTS;
use vcomp_models::EncodingConfig;

use crate::error::{WorkerError, WorkerResult};

/// Highest CRF/CQ value the H.264 encoders accept.
const MAX_CRF: u8 = 51;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Timeout for a single ffprobe call
    pub probe_timeout: Duration,
    /// Timeout for the FFmpeg render, `None` for unbounded
    pub engine_timeout: Option<Duration>,
    /// Encoder settings applied to every re-encoding plan
    pub encoding: EncodingConfig,
    /// Concat segment limit (capped at the request schema's)
    pub max_segments: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            engine_timeout: None,
            encoding: EncodingConfig::default(),
            max_segments: MAX_SEGMENTS,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut encoding = EncodingConfig::default();
        if parse_or(&lookup, "VCOMP_USE_NVENC", false) {
            encoding = encoding.with_nvenc();
        }
        if let Some(codec) = lookup("VCOMP_VIDEO_CODEC").filter(|s| !s.is_empty()) {
            encoding = encoding.with_codec(codec);
        }
        if let Some(preset) = lookup("VCOMP_PRESET").filter(|s| !s.is_empty()) {
            encoding = encoding.with_preset(preset);
        }
        let crf = parse_or(&lookup, "VCOMP_CRF", encoding.crf);
        encoding = encoding.with_crf(crf);

        let engine_timeout = parse_or(&lookup, "VCOMP_ENGINE_TIMEOUT_SECS", 0u64);

        Self {
            probe_timeout: Duration::from_secs(parse_or(
                &lookup,
                "VCOMP_PROBE_TIMEOUT_SECS",
                DEFAULT_PROBE_TIMEOUT_SECS,
            )),
            engine_timeout: (engine_timeout > 0).then(|| Duration::from_secs(engine_timeout)),
            encoding,
            max_segments: parse_or(&lookup, "VCOMP_MAX_SEGMENTS", MAX_SEGMENTS).min(MAX_SEGMENTS),
        }
    }

    /// Reject settings that would make every job fail.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.probe_timeout.is_zero() {
            return Err(WorkerError::config_error("VCOMP_PROBE_TIMEOUT_SECS must be positive"));
        }
        if self.max_segments == 0 {
            return Err(WorkerError::config_error("VCOMP_MAX_SEGMENTS must be at least 1"));
        }
        if self.encoding.crf > MAX_CRF {
            return Err(WorkerError::config_error(format!(
                "VCOMP_CRF must be at most {}, got {}",
                MAX_CRF, self.encoding.crf
            )));
        }
        Ok(())
    }

    pub fn composer_config(&self) -> ComposerConfig {
        ComposerConfig {
            encoding: self.encoding.clone(),
            max_segments: self.max_segments,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
