//! Job executor.
//!
//! One job is one request file: plan it, and for renders drive FFmpeg and
//! write a result record next to the output.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::Instrument;

use vcomp_media::{
    Composer, FfmpegRunner, FfprobeClient, MediaError, MediaProbe, PlannedComposition,
};
use vcomp_models::{Action, JobId, ResolvedParameters};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Suffix appended to the output file name for the result record.
pub const RESULT_SUFFIX: &str = ".result.json";

/// Planning output for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReport {
    pub job_id: JobId,
    #[serde(flatten)]
    pub planned: PlannedComposition,
    /// Full ffmpeg argv for the output path, when one was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_args: Option<Vec<String>>,
}

/// Record written next to a rendered output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderRecord {
    pub job_id: JobId,
    pub action: Action,
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    pub resolved: ResolvedParameters,
    pub completed_at: DateTime<Utc>,
}

/// Path of the result record for an output file.
pub fn result_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(RESULT_SUFFIX);
    PathBuf::from(name)
}

/// Job executor over a media probe.
pub struct JobExecutor<P> {
    config: WorkerConfig,
    composer: Composer<P>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor<FfprobeClient> {
    /// Executor backed by the system ffprobe.
    pub fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let probe = FfprobeClient::new().with_timeout(config.probe_timeout.as_secs());
        Self::with_probe(config, probe)
    }
}

impl<P: MediaProbe> JobExecutor<P> {
    pub fn with_probe(config: WorkerConfig, probe: P) -> WorkerResult<Self> {
        config.validate()?;
        let composer = Composer::with_config(probe, config.composer_config());
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            config,
            composer,
            shutdown,
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Ask any in-flight render to stop.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Read and parse a request file.
    pub async fn read_request(&self, path: &Path) -> WorkerResult<Value> {
        let bytes = tokio::fs::read(path).await?;
        let value: Value = serde_json::from_slice(&bytes)?;
        if !value.is_object() {
            return Err(WorkerError::invalid_request(format!(
                "{} does not contain a JSON object",
                path.display()
            )));
        }
        Ok(value)
    }

    /// Plan a request file without touching the engine.
    pub async fn plan_file(&self, request: &Path, output: Option<&Path>) -> WorkerResult<PlanReport> {
        let job_id = JobId::new();
        let logger = JobLogger::pending(&job_id);
        let raw = self.read_request(request).await?;

        let planned = self
            .plan_logged(&logger, &raw)
            .instrument(logger.create_span())
            .await?;

        Ok(PlanReport {
            job_id,
            engine_args: output.map(|out| planned.invocation.to_args(out)),
            planned,
        })
    }

    /// Plan a request file, render it to `output` and write the result record.
    pub async fn render_file(&self, request: &Path, output: &Path) -> WorkerResult<RenderRecord> {
        let job_id = JobId::new();
        let logger = JobLogger::pending(&job_id);
        let raw = self.read_request(request).await?;

        let planned = self
            .plan_logged(&logger, &raw)
            .instrument(logger.create_span())
            .await?;
        let logger = logger.with_action(planned.action());

        self.render_planned(&logger, job_id, &planned, output)
            .instrument(logger.create_span())
            .await
    }

    async fn plan_logged(&self, logger: &JobLogger, raw: &Value) -> WorkerResult<PlannedComposition> {
        logger.log_start("planning composition");
        match self.composer.plan_value(raw).await {
            Ok(planned) => {
                let logger = logger.with_action(planned.action());
                logger.log_progress(&format!(
                    "planned {:.3}s output",
                    planned.resolved.output_duration_seconds
                ));
                Ok(planned)
            }
            Err(e) => {
                logger.log_error(&format!("planning failed ({}): {}", e.kind(), e));
                Err(e.into())
            }
        }
    }

    async fn render_planned(
        &self,
        logger: &JobLogger,
        job_id: JobId,
        planned: &PlannedComposition,
        output: &Path,
    ) -> WorkerResult<RenderRecord> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut runner = FfmpegRunner::new().with_cancel(self.shutdown.subscribe());
        if let Some(timeout) = self.config.engine_timeout {
            runner = runner.with_timeout(timeout.as_secs());
        }

        logger.log_progress(&format!("rendering to {}", output.display()));
        if let Err(e) = self.composer.render(planned, output, &runner).await {
            logger.log_error(&format!("render failed ({}): {}", e.kind(), e));
            return Err(e.into());
        }

        let output_size_bytes = match output_size(output).await {
            Ok(size) => size,
            Err(e) => {
                logger.log_error(&format!("render failed ({}): {}", e.kind(), e));
                return Err(e);
            }
        };
        let record = RenderRecord {
            job_id,
            action: planned.action(),
            output_path: output.to_path_buf(),
            output_size_bytes,
            resolved: planned.resolved.clone(),
            completed_at: Utc::now(),
        };
        let record_path = write_record(&record).await?;

        logger.log_completion(&format!(
            "{} bytes, record at {}",
            output_size_bytes,
            record_path.display()
        ));
        Ok(record)
    }
}

/// Size of a rendered output; an empty file counts as an engine failure.
pub async fn output_size(output: &Path) -> WorkerResult<u64> {
    let size = tokio::fs::metadata(output).await?.len();
    if size == 0 {
        return Err(MediaError::engine_failed(
            format!("{} is empty after render", output.display()),
            None,
            None,
        )
        .into());
    }
    Ok(size)
}

/// Write a render record next to its output, returning the record path.
pub async fn write_record(record: &RenderRecord) -> WorkerResult<PathBuf> {
    let path = result_path(&record.output_path);
    let json = serde_json::to_vec_pretty(record)?;
    tokio::fs::write(&path, json).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};
    use vcomp_media::{MediaInfo, MediaResult};
    use vcomp_models::{MediaSource, Resolution};

    struct StaticProbe;

    #[async_trait]
    impl MediaProbe for StaticProbe {
        async fn probe(&self, source: &MediaSource) -> MediaResult<MediaInfo> {
            match source.url.as_str() {
                "https://cdn.test/v.mp4" => Ok(MediaInfo::new(Some(20.0), Some(Resolution::new(1920, 1080))).with_audio()),
                "https://cdn.test/a.mp3" => Ok(MediaInfo::new(Some(8.0), None).with_audio()),
                other => Err(MediaError::probe_failed(other, "not found", None)),
            }
        }
    }

    fn executor() -> JobExecutor<StaticProbe> {
        JobExecutor::with_probe(WorkerConfig::default(), StaticProbe).unwrap()
    }

    async fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, serde_json::to_vec(value).unwrap())
            .await
            .unwrap();
        path
    }

    #[test]
    fn test_result_path() {
        assert_eq!(
            result_path(Path::new("/tmp/out/final.mp4")),
            PathBuf::from("/tmp/out/final.mp4.result.json")
        );
    }

    #[tokio::test]
    async fn test_plan_file() {
        let dir = TempDir::new().unwrap();
        let request = write_json(
            &dir,
            "merge.json",
            &json!({"videoUrl": "https://cdn.test/v.mp4", "audioUrl": "https://cdn.test/a.mp3"}),
        )
        .await;

        let report = assert_ok!(executor().plan_file(&request, Some(Path::new("out.mp4"))).await);
        assert_eq!(report.planned.action(), Action::Merge);
        assert_eq!(report.planned.resolved.output_duration_seconds, 20.0);

        let args = report.engine_args.clone().unwrap();
        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["job_id"].is_string());
        assert_eq!(json["plan"]["action"], "merge");
    }

    #[tokio::test]
    async fn test_plan_file_rejects_non_object() {
        let dir = TempDir::new().unwrap();
        let request = write_json(&dir, "list.json", &json!([1, 2, 3])).await;

        let err = assert_err!(executor().plan_file(&request, None).await);
        assert!(matches!(err, WorkerError::InvalidRequest(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_plan_file_errors() {
        let dir = TempDir::new().unwrap();

        let missing = executor()
            .plan_file(&dir.path().join("missing.json"), None)
            .await
            .unwrap_err();
        assert!(matches!(missing, WorkerError::Io(_)));

        let garbage = dir.path().join("garbage.json");
        tokio::fs::write(&garbage, b"{not json").await.unwrap();
        let err = executor().plan_file(&garbage, None).await.unwrap_err();
        assert!(matches!(err, WorkerError::Json(_)));

        let request = write_json(
            &dir,
            "unreachable.json",
            &json!({"videoUrl": "https://cdn.test/gone.mp4", "audioUrl": "https://cdn.test/a.mp3"}),
        )
        .await;
        let err = executor().plan_file(&request, None).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "probe_failure");
    }

    #[tokio::test]
    async fn test_empty_output_is_an_engine_failure() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.mp4");
        tokio::fs::write(&empty, b"").await.unwrap();

        let err = assert_err!(output_size(&empty).await);
        assert_eq!(err.kind(), "engine_failure");
        assert_eq!(err.exit_code(), 5);

        let rendered = dir.path().join("rendered.mp4");
        tokio::fs::write(&rendered, b"\x00\x00\x00\x18ftyp").await.unwrap();
        assert_eq!(assert_ok!(output_size(&rendered).await), 8);

        let missing = assert_err!(output_size(&dir.path().join("missing.mp4")).await);
        assert!(matches!(missing, WorkerError::Io(_)));
    }

    #[tokio::test]
    async fn test_write_record() {
        let dir = TempDir::new().unwrap();
        let request = write_json(
            &dir,
            "merge.json",
            &json!({"videoUrl": "https://cdn.test/v.mp4", "audioUrl": "https://cdn.test/a.mp3"}),
        )
        .await;
        let report = executor().plan_file(&request, None).await.unwrap();

        let record = RenderRecord {
            job_id: report.job_id.clone(),
            action: report.planned.action(),
            output_path: dir.path().join("out.mp4"),
            output_size_bytes: 1024,
            resolved: report.planned.resolved.clone(),
            completed_at: Utc::now(),
        };
        let path = write_record(&record).await.unwrap();
        assert_eq!(path, dir.path().join("out.mp4.result.json"));

        let written: RenderRecord =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(written, record);
    }
}
