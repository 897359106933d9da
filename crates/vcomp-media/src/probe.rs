//! Media probing via FFprobe.
//!
//! Planners only ever see [`MediaInfo`] through the [`MediaProbe`] trait,
//! so they can be driven by a fake in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use vcomp_models::{DurationInfo, MediaSource, Resolution};

use crate::error::{MediaError, MediaResult};

/// Default bound on a single ffprobe call.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

/// What a probe found out about one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in seconds, if reported
    pub duration: Option<f64>,
    /// Dimensions of the first video stream, if any
    pub resolution: Option<Resolution>,
    /// Whether an audio stream is present
    #[serde(default)]
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn new(duration: Option<f64>, resolution: Option<Resolution>) -> Self {
        Self {
            duration,
            resolution,
            has_audio: false,
        }
    }

    /// Mark the source as carrying an audio stream.
    pub fn with_audio(mut self) -> Self {
        self.has_audio = true;
        self
    }

    /// Fail unless the source carries an audio stream.
    pub fn require_audio(&self, source: &MediaSource) -> MediaResult<()> {
        if self.has_audio {
            Ok(())
        } else {
            Err(MediaError::invariant(format!(
                "{} has no audio stream to merge",
                source.url
            )))
        }
    }

    /// Duration usable for planning.
    ///
    /// Missing, non-finite or negative durations are probe failures.
    pub fn duration_info(&self, source: &MediaSource) -> MediaResult<DurationInfo> {
        let seconds = self.duration.ok_or_else(|| {
            MediaError::probe_failed(&source.url, "no duration reported", None)
        })?;
        Ok(DurationInfo::try_new(source.url.clone(), seconds)?)
    }

    /// Video dimensions usable for planning.
    pub fn require_resolution(&self, source: &MediaSource) -> MediaResult<Resolution> {
        match self.resolution {
            Some(res) if !res.is_empty() => Ok(res),
            _ => Err(MediaError::probe_failed(
                &source.url,
                "no video stream dimensions found",
                None,
            )),
        }
    }
}

/// Source of media metadata for the planners.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, source: &MediaSource) -> MediaResult<MediaInfo>;
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_ffprobe_output(bytes: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(bytes)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let resolution = video_stream.and_then(|s| match (s.width, s.height) {
        (Some(w), Some(h)) => Some(Resolution::new(w, h)),
        _ => None,
    });

    // Container duration first, then the first stream that reports one
    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| probe.streams.iter().find_map(|s| s.duration.as_deref()))
        .and_then(|d| d.trim().parse::<f64>().ok());

    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        duration,
        resolution,
        has_audio,
    })
}

/// [`MediaProbe`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeClient {
    binary: String,
    timeout: Duration,
}

impl Default for FfprobeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FfprobeClient {
    pub fn new() -> Self {
        Self {
            binary: "ffprobe".to_string(),
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Use a specific ffprobe executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }
}

/// A probe process that could not be started or read is a probe failure.
fn spawn_failure(source: &MediaSource, err: std::io::Error) -> MediaError {
    MediaError::probe_failed(&source.url, format!("failed to run ffprobe: {}", err), None)
}

#[async_trait]
impl MediaProbe for FfprobeClient {
    async fn probe(&self, source: &MediaSource) -> MediaResult<MediaInfo> {
        which::which(&self.binary).map_err(|_| MediaError::FfprobeNotFound)?;

        debug!(url = %source.url, kind = %source.kind, "Probing source");

        let child = Command::new(&self.binary)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(&source.url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result.map_err(|e| spawn_failure(source, e))?,
            Err(_) => {
                return Err(MediaError::probe_failed(
                    &source.url,
                    format!("ffprobe timed out after {} seconds", self.timeout.as_secs()),
                    None,
                ))
            }
        };

        if !output.status.success() {
            return Err(MediaError::probe_failed(
                &source.url,
                format!("ffprobe exited with status {:?}", output.status.code()),
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ));
        }

        parse_ffprobe_output(&output.stdout).map_err(|e| match e {
            MediaError::JsonParse(err) => MediaError::probe_failed(
                &source.url,
                format!("unreadable ffprobe output: {}", err),
                None,
            ),
            other => other,
        })
    }
}
