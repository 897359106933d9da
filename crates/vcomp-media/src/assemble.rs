//! Command assembler: the only place plans become FFmpeg syntax.
//!
//! Assembly is deterministic. The same plan and encoding config always
//! produce the same invocation, and no decision is taken here that the
//! planner has not already made.

use serde::{Deserialize, Serialize};
use std::path::Path;

use vcomp_models::{
    CompositionPlan, ConcatPlan, EncodingConfig, MergePlan, MergeStrategy, MotionPlan, OverlayPlan,
};

use crate::command::{FfmpegCommand, FfmpegInput};
use crate::filters;

/// Everything FFmpeg needs apart from the output path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineInvocation {
    pub inputs: Vec<FfmpegInput>,
    /// `-filter_complex` graph, `;`-separated chains
    pub filter_graph: String,
    /// `-map` targets in output stream order
    pub maps: Vec<String>,
    /// Encoder and container directives
    pub output_args: Vec<String>,
}

impl EngineInvocation {
    /// Plain argument vector for `ffmpeg`, overwrite enabled.
    pub fn to_args(&self, output: impl AsRef<Path>) -> Vec<String> {
        let mut args = vec!["-y".to_string()];
        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }
        args.extend(self.graph_and_output_args());
        args.push(output.as_ref().to_string_lossy().to_string());
        args
    }

    /// Runnable command with progress reporting.
    pub fn to_command(&self, output: impl AsRef<Path>) -> FfmpegCommand {
        self.inputs
            .iter()
            .cloned()
            .fold(FfmpegCommand::new(output), FfmpegCommand::push_input)
            .output_args(self.graph_and_output_args())
    }

    fn graph_and_output_args(&self) -> Vec<String> {
        let mut args = vec!["-filter_complex".to_string(), self.filter_graph.clone()];
        for map in &self.maps {
            args.push("-map".to_string());
            args.push(map.clone());
        }
        args.extend(self.output_args.iter().cloned());
        args
    }
}

/// Serialize a plan into an engine invocation.
pub fn assemble(plan: &CompositionPlan, encoding: &EncodingConfig) -> EngineInvocation {
    match plan {
        CompositionPlan::Merge(plan) => assemble_merge(plan, encoding),
        CompositionPlan::Parallax(plan) => assemble_parallax(plan, encoding),
        CompositionPlan::OverlayPip(plan) => assemble_overlay(plan, encoding),
        CompositionPlan::Concat(plan) => assemble_concat(plan, encoding),
    }
}

fn input(source: &str) -> FfmpegInput {
    FfmpegInput {
        args: Vec::new(),
        source: source.to_string(),
    }
}

fn duration_args(seconds: f64) -> [String; 2] {
    ["-t".to_string(), filters::fmt_num(seconds)]
}

fn assemble_merge(plan: &MergePlan, encoding: &EncodingConfig) -> EngineInvocation {
    let gains = plan.track_gains();
    let speed_factor = match plan.strategy {
        MergeStrategy::SpeedAdjustVideo => plan.speed_factor,
        MergeStrategy::MixAudioTracks => None,
    };

    let mut chains = Vec::new();
    let mut output_args = Vec::new();

    let video_map = match speed_factor {
        Some(speed_factor) => {
            chains.push(format!("[0:v]{}[v]", filters::setpts_scale(1.0 / speed_factor)));
            output_args.extend(encoding.video_args());
            "[v]".to_string()
        }
        None => {
            output_args.extend(["-c:v".to_string(), "copy".to_string()]);
            "0:v:0".to_string()
        }
    };

    if plan.video_has_audio {
        // Stretched video audio keeps pace with the slowed picture
        let video_audio = match speed_factor {
            Some(speed_factor) => {
                chains.push(format!("[0:a]{}[va]", filters::atempo_chain(speed_factor)));
                "[va]"
            }
            None => "[0:a]",
        };
        let mode = if speed_factor.is_some() { "longest" } else { "first" };
        chains.push(format!(
            "{}[1:a]{}[a]",
            video_audio,
            filters::amix(mode, gains.video, gains.audio)
        ));
    } else {
        chains.push(format!("[1:a]{}[a]", filters::volume(gains.audio)));
    }

    let filter_graph = chains.join(";");
    let maps = vec![video_map, "[a]".to_string()];

    output_args.extend(encoding.audio_args());
    output_args.extend(duration_args(plan.output_duration_seconds));
    output_args.extend(encoding.extra_args.iter().cloned());

    EngineInvocation {
        inputs: vec![input(&plan.video.url), input(&plan.audio.url)],
        filter_graph,
        maps,
        output_args,
    }
}

fn assemble_parallax(plan: &MotionPlan, encoding: &EncodingConfig) -> EngineInvocation {
    let frames = plan.frame_count;
    let zoom = filters::frame_lerp(plan.scale.start, plan.scale.end, frames);
    let pan_x = filters::frame_lerp(plan.pan_x.start, plan.pan_x.end, frames);
    let pan_y = filters::frame_lerp(plan.pan_y.start, plan.pan_y.end, frames);

    let filter_graph = format!(
        "[0:v]{},setsar=1,{},format={}[v]",
        filters::scale_crop(
            plan.cover.scaled_width,
            plan.cover.scaled_height,
            plan.output.width,
            plan.output.height,
            plan.cover.crop_x,
            plan.cover.crop_y,
        ),
        filters::zoompan(&zoom, &pan_x, &pan_y, plan.output.width, plan.output.height, plan.fps),
        encoding.pixel_format,
    );

    let mut output_args = encoding.video_args();
    output_args.extend([
        "-r".to_string(),
        plan.fps.to_string(),
        "-frames:v".to_string(),
        frames.to_string(),
        "-an".to_string(),
    ]);
    output_args.extend(encoding.extra_args.iter().cloned());

    EngineInvocation {
        inputs: vec![FfmpegInput {
            args: vec![
                "-loop".to_string(),
                "1".to_string(),
                "-framerate".to_string(),
                plan.fps.to_string(),
            ],
            source: plan.image.url.clone(),
        }],
        filter_graph,
        maps: vec!["[v]".to_string()],
        output_args,
    }
}

fn assemble_overlay(plan: &OverlayPlan, encoding: &EncodingConfig) -> EngineInvocation {
    let (x, y) = plan.overlay_origin();

    let pip = format!(
        "[1:v]{},scale={}:{},{}[pip]",
        filters::square_crop(),
        plan.size,
        plan.size,
        filters::circle_mask(plan.size),
    );

    let filter_graph = if plan.has_border() {
        let ring_size = plan.ring_size();
        let (rx, ry) = plan.ring_origin();
        format!(
            "{};{},{}[ring];[0:v][ring]{}[bg];[bg][pip]{},format={}[v]",
            pip,
            filters::color_source(&plan.border_color, ring_size),
            filters::ring_mask(ring_size, plan.mask_radius),
            filters::overlay_at(rx, ry),
            filters::overlay_at(x, y),
            encoding.pixel_format,
        )
    } else {
        format!(
            "{};[0:v][pip]{},format={}[v]",
            pip,
            filters::overlay_at(x, y),
            encoding.pixel_format,
        )
    };

    let mut output_args = encoding.video_args();
    output_args.extend(encoding.audio_args());
    output_args.extend(duration_args(plan.output_duration_seconds));
    output_args.extend(encoding.extra_args.iter().cloned());

    EngineInvocation {
        inputs: vec![input(&plan.background.url), input(&plan.overlay.url)],
        filter_graph,
        // Background audio is optional
        maps: vec!["[v]".to_string(), "0:a?".to_string()],
        output_args,
    }
}

fn assemble_concat(plan: &ConcatPlan, encoding: &EncodingConfig) -> EngineInvocation {
    let mut chains = Vec::with_capacity(plan.segments.len() * 2 + 1);
    let mut concat_inputs = String::new();

    for (i, segment) in plan.segments.iter().enumerate() {
        chains.push(format!(
            "[{i}:v]{},{},setsar=1,fps={},format={}[v{i}]",
            filters::trim(segment.trim_start, segment.trim_end),
            filters::scale_pad(
                segment.scaled_width,
                segment.scaled_height,
                segment.output.width,
                segment.output.height,
                segment.pad_left,
                segment.pad_top,
            ),
            plan.fps,
            encoding.pixel_format,
            i = i,
        ));
        let audio_source = if segment.has_audio {
            format!("[{i}:a]{}", filters::atrim(segment.trim_start, segment.trim_end), i = i)
        } else {
            filters::silence(
                segment.audio.sample_rate,
                &segment.audio.channel_layout,
                segment.duration(),
            )
        };
        chains.push(format!(
            "{},{}[a{i}]",
            audio_source,
            filters::audio_normalize(
                segment.audio.sample_rate,
                &segment.audio.sample_format,
                &segment.audio.channel_layout,
            ),
            i = i,
        ));
        concat_inputs.push_str(&format!("[v{i}][a{i}]", i = i));
    }

    chains.push(format!(
        "{}concat=n={}:v=1:a=1[v][a]",
        concat_inputs,
        plan.segments.len()
    ));

    let mut output_args = encoding.video_args();
    output_args.extend(encoding.audio_args());
    output_args.extend(encoding.extra_args.iter().cloned());

    EngineInvocation {
        inputs: plan
            .segments
            .iter()
            .map(|segment| input(&segment.source.url))
            .collect(),
        filter_graph: chains.join(";"),
        maps: vec!["[v]".to_string(), "[a]".to_string()],
        output_args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcomp_models::parallax::PARALLAX_FPS;
    use vcomp_models::{
        AudioFormat, CoverGeometry, Curve, MediaSource, MixWeights, OverlayPosition, PanDirection,
        Resolution, SegmentPlan,
    };

    fn merge_plan(strategy: MergeStrategy, speed_factor: Option<f64>) -> MergePlan {
        MergePlan {
            video: MediaSource::video("https://example.com/v.mp4"),
            audio: MediaSource::audio("https://example.com/a.mp3"),
            strategy,
            speed_factor,
            output_duration_seconds: 15.0,
            video_volume: 1.0,
            audio_volume: 1.0,
            weights: MixWeights {
                video: 0.5,
                audio: 0.5,
            },
            video_duration_seconds: 10.0,
            audio_duration_seconds: 15.0,
            video_has_audio: true,
        }
    }

    fn overlay_plan(border_width: u32) -> OverlayPlan {
        OverlayPlan {
            background: MediaSource::video("https://example.com/bg.mp4"),
            overlay: MediaSource::video("https://example.com/face.mp4"),
            background_resolution: Resolution::new(1920, 1080),
            position: OverlayPosition::BottomRight,
            size: 200,
            mask_radius: 100.0,
            center_x: 1800.0,
            center_y: 960.0,
            border_width,
            border_color: "#ff0000".to_string(),
            output_duration_seconds: 8.0,
        }
    }

    #[test]
    fn test_speed_adjust_graph() {
        let plan = CompositionPlan::Merge(merge_plan(
            MergeStrategy::SpeedAdjustVideo,
            Some(10.0 / 15.0),
        ));
        let invocation = assemble(&plan, &EncodingConfig::default());

        assert_eq!(
            invocation.filter_graph,
            "[0:v]setpts=PTS*1.5[v];[0:a]atempo=0.666667[va];\
             [va][1:a]amix=inputs=2:duration=longest:dropout_transition=0:weights=0.5 0.5:normalize=0[a]"
        );
        assert_eq!(invocation.maps, vec!["[v]", "[a]"]);
        assert!(invocation.output_args.contains(&"libx264".to_string()));

        let args = invocation.to_args("out.mp4");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "15");
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_mix_copies_video() {
        let plan = CompositionPlan::Merge(merge_plan(MergeStrategy::MixAudioTracks, None));
        let invocation = assemble(&plan, &EncodingConfig::default());

        assert!(invocation.filter_graph.contains("duration=first"));
        assert!(!invocation.filter_graph.contains("setpts"));
        assert_eq!(invocation.maps[0], "0:v:0");
        assert_eq!(&invocation.output_args[..2], &["-c:v", "copy"]);
        assert!(!invocation.output_args.contains(&"-crf".to_string()));
    }

    #[test]
    fn test_mix_gains_follow_requested_balance() {
        let mut plan = merge_plan(MergeStrategy::MixAudioTracks, None);
        plan.video_volume = 2.0;
        plan.audio_volume = 0.5;
        plan.weights = MixWeights {
            video: 0.8,
            audio: 0.2,
        };
        let invocation = assemble(&CompositionPlan::Merge(plan), &EncodingConfig::default());

        // Weights are the only gains, 4:1 as requested
        assert_eq!(
            invocation.filter_graph,
            "[0:a][1:a]amix=inputs=2:duration=first:dropout_transition=0:weights=0.8 0.2:normalize=0[a]"
        );
        assert!(!invocation.filter_graph.contains("volume="));
    }

    #[test]
    fn test_silent_video_speed_adjust() {
        let mut plan = merge_plan(MergeStrategy::SpeedAdjustVideo, Some(10.0 / 15.0));
        plan.video_has_audio = false;
        plan.audio_volume = 0.8;
        let invocation = assemble(&CompositionPlan::Merge(plan), &EncodingConfig::default());

        assert_eq!(
            invocation.filter_graph,
            "[0:v]setpts=PTS*1.5[v];[1:a]volume=0.8[a]"
        );
        assert!(!invocation.filter_graph.contains("[0:a]"));
        assert_eq!(invocation.maps, vec!["[v]", "[a]"]);
    }

    #[test]
    fn test_silent_video_mix() {
        let mut plan = merge_plan(MergeStrategy::MixAudioTracks, None);
        plan.video_has_audio = false;
        let invocation = assemble(&CompositionPlan::Merge(plan), &EncodingConfig::default());

        assert_eq!(invocation.filter_graph, "[1:a]volume=1[a]");
        assert_eq!(invocation.maps, vec!["0:v:0", "[a]"]);
        assert_eq!(&invocation.output_args[..2], &["-c:v", "copy"]);
    }

    #[test]
    fn test_overlay_graph_with_and_without_border() {
        let with_border = assemble(
            &CompositionPlan::OverlayPip(overlay_plan(3)),
            &EncodingConfig::default(),
        );
        assert!(with_border.filter_graph.contains("color=c=0xff0000:s=206x206"));
        assert!(with_border.filter_graph.contains("[0:v][ring]overlay=1697:857:shortest=1[bg]"));
        assert!(with_border.filter_graph.contains("[bg][pip]overlay=1700:860:shortest=1"));
        assert_eq!(with_border.maps, vec!["[v]", "0:a?"]);

        let plain = assemble(
            &CompositionPlan::OverlayPip(overlay_plan(0)),
            &EncodingConfig::default(),
        );
        assert!(!plain.filter_graph.contains("color="));
        assert!(plain.filter_graph.contains("[0:v][pip]overlay=1700:860:shortest=1"));
    }

    #[test]
    fn test_parallax_graph() {
        let plan = CompositionPlan::Parallax(MotionPlan {
            image: MediaSource::image("https://example.com/i.jpg"),
            source: Resolution::new(1600, 1200),
            output: Resolution::new(1920, 1080),
            cover: CoverGeometry {
                scaled_width: 1920,
                scaled_height: 1440,
                crop_x: 0,
                crop_y: 180,
            },
            direction: PanDirection::ZoomIn,
            duration_seconds: 5.0,
            fps: PARALLAX_FPS,
            frame_count: 150,
            scale: Curve::linear(1.0, 1.1),
            pan_x: Curve::constant(0.5),
            pan_y: Curve::constant(0.5),
        });
        let invocation = assemble(&plan, &EncodingConfig::default());

        assert!(invocation
            .filter_graph
            .starts_with("[0:v]scale=1920:1440,crop=1920:1080:0:180,setsar=1,zoompan=z='1+(0.1)*on/149'"));
        assert!(invocation.filter_graph.contains("d=1:s=1920x1080:fps=30"));
        assert_eq!(invocation.inputs[0].args, vec!["-loop", "1", "-framerate", "30"]);
        assert!(invocation.output_args.contains(&"150".to_string()));
    }

    #[test]
    fn test_concat_graph() {
        let segment = |index: usize, start: f64, end: f64| SegmentPlan {
            index,
            source: MediaSource::video(format!("https://example.com/{}.mp4", index)),
            source_resolution: Resolution::new(1080, 1920),
            trim_start: start,
            trim_end: end,
            scaled_width: 606,
            scaled_height: 1080,
            pad_left: 657,
            pad_top: 0,
            output: Resolution::new(1920, 1080),
            audio: AudioFormat::default(),
            has_audio: true,
        };
        let plan = CompositionPlan::Concat(ConcatPlan {
            target: Resolution::new(1920, 1080),
            audio: AudioFormat::default(),
            fps: 30,
            segments: vec![segment(0, 0.0, 5.0), segment(1, 2.0, 30.0)],
        });
        let invocation = assemble(&plan, &EncodingConfig::default());

        assert_eq!(invocation.inputs.len(), 2);
        assert!(invocation.filter_graph.contains(
            "[1:v]trim=start=2:end=30,setpts=PTS-STARTPTS,scale=606:1080,pad=1920:1080:657:0:color=black"
        ));
        assert!(invocation.filter_graph.contains("aresample=44100"));
        assert!(invocation
            .filter_graph
            .ends_with("[v0][a0][v1][a1]concat=n=2:v=1:a=1[v][a]"));
    }

    #[test]
    fn test_concat_silent_segment_gets_generated_audio() {
        let segment = |index: usize, has_audio: bool| SegmentPlan {
            index,
            source: MediaSource::video(format!("https://example.com/{}.mp4", index)),
            source_resolution: Resolution::new(1920, 1080),
            trim_start: 1.0,
            trim_end: 4.0,
            scaled_width: 1920,
            scaled_height: 1080,
            pad_left: 0,
            pad_top: 0,
            output: Resolution::new(1920, 1080),
            audio: AudioFormat::default(),
            has_audio,
        };
        let plan = CompositionPlan::Concat(ConcatPlan {
            target: Resolution::new(1920, 1080),
            audio: AudioFormat::default(),
            fps: 30,
            segments: vec![segment(0, true), segment(1, false)],
        });
        let invocation = assemble(&plan, &EncodingConfig::default());

        assert!(invocation.filter_graph.contains("[0:a]atrim=start=1:end=4"));
        assert!(!invocation.filter_graph.contains("[1:a]"));
        assert!(invocation
            .filter_graph
            .contains("anullsrc=r=44100:cl=stereo,atrim=end=3,aresample=44100"));
        assert!(invocation.filter_graph.contains("[a1];[v0][a0][v1][a1]concat=n=2"));
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let plan = CompositionPlan::OverlayPip(overlay_plan(5));
        let encoding = EncodingConfig::default().with_nvenc();
        assert_eq!(assemble(&plan, &encoding), assemble(&plan, &encoding));
    }

    #[test]
    fn test_to_command_matches_args() {
        let invocation = assemble(
            &CompositionPlan::OverlayPip(overlay_plan(3)),
            &EncodingConfig::default(),
        );
        let command_args = invocation.to_command("out.mp4").build_args();
        let plain_args = invocation.to_args("out.mp4");

        // The runnable command only adds logging and progress flags
        assert_eq!(&command_args[5..], &plain_args[1..]);
    }
}
