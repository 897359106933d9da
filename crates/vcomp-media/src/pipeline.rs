//! Validate → Probe → Plan → Assemble for a single request.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use vcomp_models::concat::MAX_SEGMENTS;
use vcomp_models::{
    validate_request, Action, ComposeRequest, CompositionPlan, ConcatParams, EncodingConfig,
    MediaSource, MergeParams, OverlayParams, ParallaxParams, ResolvedParameters,
};

use crate::assemble::{assemble, EngineInvocation};
use crate::command::FfmpegRunner;
use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::planner::{self, SegmentMedia};
use crate::probe::{MediaInfo, MediaProbe};
use crate::progress::FfmpegProgress;

/// Settings shared by every request a [`Composer`] handles.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    pub encoding: EncodingConfig,
    /// Upper bound on concat segments (never above the request schema's)
    pub max_segments: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingConfig::default(),
            max_segments: MAX_SEGMENTS,
        }
    }
}

/// Result of planning one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedComposition {
    pub plan: CompositionPlan,
    pub invocation: EngineInvocation,
    pub resolved: ResolvedParameters,
}

impl PlannedComposition {
    pub fn action(&self) -> Action {
        self.plan.action()
    }
}

/// Stateless planning pipeline over a [`MediaProbe`].
pub struct Composer<P> {
    probe: P,
    config: ComposerConfig,
}

impl<P: MediaProbe> Composer<P> {
    pub fn new(probe: P) -> Self {
        Self::with_config(probe, ComposerConfig::default())
    }

    pub fn with_config(probe: P, config: ComposerConfig) -> Self {
        Self { probe, config }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Validate a raw JSON request and plan it.
    pub async fn plan_value(&self, raw: &Value) -> MediaResult<PlannedComposition> {
        let request = validate_request(raw).inspect_err(|e| {
            metrics::record_plan_failure("unknown", "validation");
            debug!(field = %e.field, "Request rejected: {}", e.constraint);
        })?;
        self.plan(&request).await
    }

    /// Probe, plan and assemble a validated request.
    pub async fn plan(&self, request: &ComposeRequest) -> MediaResult<PlannedComposition> {
        let action = request.action();
        let started = Instant::now();

        match self.build_plan(request).await {
            Ok(plan) => {
                let invocation = assemble(&plan, &self.config.encoding);
                let resolved = plan.resolved_parameters();
                metrics::record_plan(action.as_str(), started.elapsed().as_secs_f64());
                info!(
                    action = %action,
                    output_duration = resolved.output_duration_seconds,
                    "Composition planned"
                );
                Ok(PlannedComposition {
                    plan,
                    invocation,
                    resolved,
                })
            }
            Err(e) => {
                metrics::record_plan_failure(action.as_str(), e.kind());
                warn!(action = %action, kind = e.kind(), "Planning failed: {}", e);
                Err(e)
            }
        }
    }

    /// Run the planner for a request's action.
    pub async fn build_plan(&self, request: &ComposeRequest) -> MediaResult<CompositionPlan> {
        match request {
            ComposeRequest::Merge(params) => self.plan_merge(params).await,
            ComposeRequest::Parallax(params) => self.plan_parallax(params).await,
            ComposeRequest::OverlayPip(params) => self.plan_overlay(params).await,
            ComposeRequest::Concat(params) => self.plan_concat(params).await,
        }
    }

    /// Execute a planned composition, writing to `output`.
    ///
    /// Engine failures carry the invocation that produced them.
    pub async fn render(
        &self,
        planned: &PlannedComposition,
        output: &Path,
        runner: &FfmpegRunner,
    ) -> MediaResult<()> {
        let action = planned.action();
        let expected = planned.resolved.output_duration_seconds;
        let command = planned.invocation.to_command(output);
        let started = Instant::now();

        info!(action = %action, output = %output.display(), "Rendering composition");

        let result = runner
            .run_with_progress(&command, move |progress: FfmpegProgress| {
                debug!(
                    percent = progress.fraction(expected) * 100.0,
                    speed = progress.speed,
                    "FFmpeg progress"
                );
            })
            .await;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_render(action.as_str(), result.is_ok(), elapsed);

        result.map_err(|e| e.with_invocation(planned.invocation.clone()))
    }

    async fn probe(&self, source: &MediaSource) -> MediaResult<MediaInfo> {
        let result = self.probe.probe(source).await;
        metrics::record_probe(source.kind.as_str(), result.is_ok());
        result
    }

    async fn plan_merge(&self, params: &MergeParams) -> MediaResult<CompositionPlan> {
        let (video, audio) = tokio::try_join!(self.probe(&params.video), self.probe(&params.audio))?;
        audio.require_audio(&params.audio)?;
        let video_has_audio = video.has_audio;
        let video = video.duration_info(&params.video)?;
        let audio = audio.duration_info(&params.audio)?;
        planner::plan_merge(params, &video, &audio, video_has_audio).map(CompositionPlan::Merge)
    }

    async fn plan_parallax(&self, params: &ParallaxParams) -> MediaResult<CompositionPlan> {
        let info = self.probe(&params.image).await?;
        let source = info.require_resolution(&params.image)?;
        planner::plan_parallax(params, source).map(CompositionPlan::Parallax)
    }

    async fn plan_overlay(&self, params: &OverlayParams) -> MediaResult<CompositionPlan> {
        let (background, overlay) =
            tokio::try_join!(self.probe(&params.background), self.probe(&params.overlay))?;
        let resolution = background.require_resolution(&params.background)?;
        let background_duration = background.duration_info(&params.background)?;
        let overlay_duration = overlay.duration_info(&params.overlay)?;
        planner::plan_overlay(params, resolution, &background_duration, &overlay_duration)
            .map(CompositionPlan::OverlayPip)
    }

    async fn plan_concat(&self, params: &ConcatParams) -> MediaResult<CompositionPlan> {
        // Reject oversized lists before any probe runs
        planner::concat::check_segment_count(params.segments.len(), self.config.max_segments)?;

        let media = try_join_all(params.segments.iter().map(|segment| async move {
            let source = segment.source();
            let info = self.probe(&source).await?;
            let resolution = info.require_resolution(&source)?;
            // An explicit trimEnd makes the source duration optional
            let duration = if segment.trim_end.is_none() || info.duration.is_some() {
                Some(info.duration_info(&source)?)
            } else {
                None
            };
            Ok::<_, MediaError>(SegmentMedia {
                resolution,
                duration,
                has_audio: info.has_audio,
            })
        }))
        .await?;

        planner::plan_concat(params, &media, self.config.max_segments).map(CompositionPlan::Concat)
    }
}
