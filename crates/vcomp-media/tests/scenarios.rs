//! End-to-end planning scenarios against a scripted probe.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_test::{assert_err, assert_ok};

use vcomp_media::{Composer, MediaError, MediaInfo, MediaProbe, MediaResult};
use vcomp_models::{
    CompositionPlan, MediaSource, MergeStrategy, ResolvedDetails, Resolution,
};

/// Probe that answers from a fixed table and counts calls.
#[derive(Default)]
struct ScriptedProbe {
    media: HashMap<String, MediaInfo>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    fn with(self, url: &str, duration: Option<f64>, resolution: Option<(u32, u32)>) -> Self {
        self.insert(url, media(duration, resolution).with_audio())
    }

    /// Source without an audio stream.
    fn with_silent(self, url: &str, duration: Option<f64>, resolution: Option<(u32, u32)>) -> Self {
        self.insert(url, media(duration, resolution))
    }

    fn insert(mut self, url: &str, info: MediaInfo) -> Self {
        self.media.insert(url.to_string(), info);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn media(duration: Option<f64>, resolution: Option<(u32, u32)>) -> MediaInfo {
    MediaInfo::new(duration, resolution.map(|(w, h)| Resolution::new(w, h)))
}

#[async_trait]
impl MediaProbe for ScriptedProbe {
    async fn probe(&self, source: &MediaSource) -> MediaResult<MediaInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.media
            .get(&source.url)
            .cloned()
            .ok_or_else(|| MediaError::probe_failed(&source.url, "ffprobe exited with status 1", None))
    }
}

#[tokio::test]
async fn test_audio_longer_than_video() {
    let probe = ScriptedProbe::default()
        .with("https://cdn.test/v.mp4", Some(10.0), Some((1280, 720)))
        .with("https://cdn.test/a.mp3", Some(15.0), None);
    let composer = Composer::new(probe);

    let planned = assert_ok!(
        composer
            .plan_value(&json!({
                "action": "merge",
                "videoUrl": "https://cdn.test/v.mp4",
                "audioUrl": "https://cdn.test/a.mp3",
                "videoVolume": 1.0,
                "audioVolume": 1.0
            }))
            .await
    );

    let CompositionPlan::Merge(plan) = &planned.plan else {
        panic!("expected merge plan, got {:?}", planned.plan);
    };
    assert_eq!(plan.strategy, MergeStrategy::SpeedAdjustVideo);
    assert!((plan.speed_factor.unwrap() - 10.0 / 15.0).abs() < 1e-9);
    assert!((plan.output_duration_seconds - 15.0).abs() < 1e-9);
    assert_eq!(plan.weights.video, 0.5);
    assert_eq!(plan.weights.audio, 0.5);

    let args = planned.invocation.to_args("out.mp4");
    assert!(args.iter().any(|a| a.contains("setpts=PTS*1.5")));
    assert!(args.iter().any(|a| a.contains("atempo=0.666667")));

    let resolved = serde_json::to_value(&planned.resolved).unwrap();
    assert_eq!(resolved["details"]["strategy"], "speed_adjust_video");
}

#[tokio::test]
async fn test_video_longer_than_audio() {
    let probe = ScriptedProbe::default()
        .with("https://cdn.test/v.mp4", Some(20.0), Some((1920, 1080)))
        .with("https://cdn.test/a.mp3", Some(8.0), None);
    let composer = Composer::new(probe);

    let planned = assert_ok!(
        composer
            .plan_value(&json!({
                "videoUrl": "https://cdn.test/v.mp4",
                "audioUrl": "https://cdn.test/a.mp3"
            }))
            .await
    );

    let CompositionPlan::Merge(plan) = &planned.plan else {
        panic!("expected merge plan, got {:?}", planned.plan);
    };
    assert_eq!(plan.strategy, MergeStrategy::MixAudioTracks);
    assert!((plan.output_duration_seconds - 20.0).abs() < 1e-9);
    assert!(planned.invocation.output_args.contains(&"copy".to_string()));
}

#[tokio::test]
async fn test_concat_three_segments() {
    let probe = ScriptedProbe::default()
        .with("https://cdn.test/1.mp4", Some(12.0), Some((1920, 1080)))
        .with("https://cdn.test/2.mp4", Some(45.0), Some((1080, 1920)))
        .with("https://cdn.test/3.mp4", Some(7.5), Some((640, 480)));
    let composer = Composer::new(probe);

    let planned = assert_ok!(
        composer
            .plan_value(&json!({
                "action": "concat",
                "width": 1920,
                "height": 1080,
                "segments": [
                    {"url": "https://cdn.test/1.mp4", "trimStart": 0, "trimEnd": 5},
                    {"url": "https://cdn.test/2.mp4", "trimStart": 2, "trimEnd": 30},
                    {"url": "https://cdn.test/3.mp4"}
                ]
            }))
            .await
    );

    let CompositionPlan::Concat(plan) = &planned.plan else {
        panic!("expected concat plan, got {:?}", planned.plan);
    };
    assert_eq!(plan.segments.len(), 3);

    let windows: Vec<(f64, f64)> = plan
        .segments
        .iter()
        .map(|s| (s.trim_start, s.trim_end))
        .collect();
    assert_eq!(windows, vec![(0.0, 5.0), (2.0, 30.0), (0.0, 7.5)]);

    for segment in &plan.segments {
        assert_eq!(segment.output, Resolution::new(1920, 1080));
        assert_eq!(segment.audio, plan.segments[0].audio);
    }

    let ResolvedDetails::Concat { segments } = &planned.resolved.details else {
        panic!("expected concat details");
    };
    assert_eq!(segments[2].trim_end, 7.5);
    assert!((planned.resolved.output_duration_seconds - 40.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_concat_with_silent_clip() {
    let probe = ScriptedProbe::default()
        .with("https://cdn.test/talk.mp4", Some(12.0), Some((1920, 1080)))
        .with_silent("https://cdn.test/broll.mp4", Some(6.0), Some((1920, 1080)));
    let composer = Composer::new(probe);

    let planned = assert_ok!(
        composer
            .plan_value(&json!({
                "action": "concat",
                "segments": [
                    {"url": "https://cdn.test/talk.mp4"},
                    {"url": "https://cdn.test/broll.mp4"}
                ]
            }))
            .await
    );

    let CompositionPlan::Concat(plan) = &planned.plan else {
        panic!("expected concat plan, got {:?}", planned.plan);
    };
    assert!(plan.segments[0].has_audio);
    assert!(!plan.segments[1].has_audio);

    let graph = &planned.invocation.filter_graph;
    assert!(graph.contains("[0:a]"));
    assert!(!graph.contains("[1:a]"));
    assert!(graph.contains("anullsrc="));
}

#[tokio::test]
async fn test_merge_needs_an_audio_stream() {
    let probe = ScriptedProbe::default()
        .with("https://cdn.test/v.mp4", Some(10.0), Some((1280, 720)))
        .with_silent("https://cdn.test/cover.mp4", Some(10.0), Some((1280, 720)));
    let composer = Composer::new(probe);

    let err = assert_err!(
        composer
            .plan_value(&json!({
                "videoUrl": "https://cdn.test/v.mp4",
                "audioUrl": "https://cdn.test/cover.mp4"
            }))
            .await
    );
    assert!(matches!(err, MediaError::PlanningInvariantViolation(_)));
}

#[tokio::test]
async fn test_oversized_overlay_rejected() {
    let probe = ScriptedProbe::default()
        .with("https://cdn.test/bg.mp4", Some(30.0), Some((1000, 1000)))
        .with("https://cdn.test/face.mp4", Some(30.0), Some((720, 720)));
    let composer = Composer::new(probe);

    let err = assert_err!(
        composer
            .plan_value(&json!({
                "action": "overlay_pip",
                "backgroundUrl": "https://cdn.test/bg.mp4",
                "overlayUrl": "https://cdn.test/face.mp4",
                "position": "bottom_right",
                "size": 800,
                "margin": 200,
                "borderWidth": 20
            }))
            .await
    );
    assert!(matches!(err, MediaError::PlanningInvariantViolation(_)));
}

#[tokio::test]
async fn test_overlay_defaults() {
    let probe = ScriptedProbe::default()
        .with("https://cdn.test/bg.mp4", Some(30.0), Some((1920, 1080)))
        .with("https://cdn.test/face.mp4", Some(12.0), Some((1280, 720)));
    let composer = Composer::new(probe);

    let planned = assert_ok!(
        composer
            .plan_value(&json!({
                "action": "overlay_pip",
                "backgroundUrl": "https://cdn.test/bg.mp4",
                "overlayUrl": "https://cdn.test/face.mp4"
            }))
            .await
    );

    let CompositionPlan::OverlayPip(plan) = &planned.plan else {
        panic!("expected overlay plan, got {:?}", planned.plan);
    };
    assert_eq!((plan.center_x, plan.center_y), (1800.0, 960.0));
    assert_eq!(plan.output_duration_seconds, 12.0);
    assert_eq!(planned.resolved.resolution, Some(Resolution::new(1920, 1080)));
}

#[tokio::test]
async fn test_parallax_request() {
    let probe = ScriptedProbe::default().with("https://cdn.test/i.jpg", None, Some((1024, 1024)));
    let composer = Composer::new(probe);

    let planned = assert_ok!(
        composer
            .plan_value(&json!({
                "action": "parallax",
                "imageUrl": "https://cdn.test/i.jpg",
                "duration": 4,
                "width": 1280,
                "height": 720,
                "panDirection": "up",
                "intensity": 1.0
            }))
            .await
    );

    let CompositionPlan::Parallax(plan) = &planned.plan else {
        panic!("expected parallax plan, got {:?}", planned.plan);
    };
    assert_eq!(plan.frame_count, 120);
    for sample in plan.samples(5) {
        assert!(plan.is_within_source(&sample));
    }
    assert!(planned.invocation.filter_graph.contains("zoompan="));
}

#[tokio::test]
async fn test_invalid_requests_never_probe() {
    let composer = Composer::new(ScriptedProbe::default());

    let err = assert_err!(
        composer
            .plan_value(&json!({
                "action": "concat",
                "segments": [{"url": "https://cdn.test/1.mp4", "trimStart": 4, "trimEnd": 2}]
            }))
            .await
    );
    assert!(matches!(err, MediaError::Validation(ref e) if e.field == "segments[0].trimEnd"));

    let err = assert_err!(composer.plan_value(&json!({"action": "slideshow"})).await);
    assert!(matches!(err, MediaError::Validation(ref e) if e.field == "action"));
}

#[tokio::test]
async fn test_concat_repeated_source() {
    let probe = ScriptedProbe::default()
        .with("https://cdn.test/1.mp4", Some(3.0), Some((1920, 1080)))
        .with("https://cdn.test/2.mp4", Some(3.0), Some((1920, 1080)));
    let composer = Composer::new(probe);

    let planned = assert_ok!(
        composer
            .plan_value(&json!({
                "action": "concat",
                "segments": [
                    {"url": "https://cdn.test/1.mp4"},
                    {"url": "https://cdn.test/2.mp4"},
                    {"url": "https://cdn.test/1.mp4", "trimStart": 1}
                ]
            }))
            .await
    );

    let CompositionPlan::Concat(plan) = &planned.plan else {
        panic!("expected concat plan, got {:?}", planned.plan);
    };
    assert_eq!((plan.segments[2].trim_start, plan.segments[2].trim_end), (1.0, 3.0));
    assert_eq!(planned.invocation.inputs.len(), 3);
    assert!(planned.invocation.filter_graph.ends_with("concat=n=3:v=1:a=1[v][a]"));
}

#[test]
fn test_scripted_probe_counts_calls() {
    let probe = ScriptedProbe::default().with("https://cdn.test/1.mp4", Some(1.0), None);
    let source = MediaSource::video("https://cdn.test/1.mp4");

    assert_ok!(tokio_test::block_on(probe.probe(&source)));
    assert_err!(tokio_test::block_on(probe.probe(&MediaSource::video("https://cdn.test/x.mp4"))));
    assert_eq!(probe.calls(), 2);
}
