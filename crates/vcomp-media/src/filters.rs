//! FFmpeg filter fragments.
//!
//! Each function returns one filter (or a comma-joined chain) with no
//! stream labels; the assembler wires labels around them.

/// Lowest tempo a single `atempo` instance accepts.
pub const ATEMPO_MIN: f64 = 0.5;
/// Highest tempo a single `atempo` instance accepts.
pub const ATEMPO_MAX: f64 = 2.0;

/// Format a number with fixed precision and no trailing zeros.
///
/// `1.5 -> "1.5"`, `2.0 -> "2"`, `0.6666666 -> "0.666667"`.
pub fn fmt_num(value: f64) -> String {
    let formatted = format!("{:.6}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Split a tempo factor into `atempo` stages that each stay in range.
pub fn atempo_stages(factor: f64) -> Vec<f64> {
    let mut stages = Vec::new();
    let mut remaining = factor;

    while remaining < ATEMPO_MIN {
        stages.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    while remaining > ATEMPO_MAX {
        stages.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }

    stages.push(remaining);
    stages
}

/// `atempo` chain whose product is `factor`.
pub fn atempo_chain(factor: f64) -> String {
    atempo_stages(factor)
        .into_iter()
        .map(|stage| format!("atempo={}", fmt_num(stage)))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn volume(multiplier: f64) -> String {
    format!("volume={}", fmt_num(multiplier))
}

/// Stretch video timestamps by `multiplier` (> 1 slows down).
pub fn setpts_scale(multiplier: f64) -> String {
    format!("setpts=PTS*{}", fmt_num(multiplier))
}

/// Two-input mix with explicit gains and no automatic normalization.
pub fn amix(duration_mode: &str, weight_a: f64, weight_b: f64) -> String {
    format!(
        "amix=inputs=2:duration={}:dropout_transition=0:weights={} {}:normalize=0",
        duration_mode,
        fmt_num(weight_a),
        fmt_num(weight_b)
    )
}

/// Scale then center-crop to exactly `width x height`.
pub fn scale_crop(
    scaled_width: u32,
    scaled_height: u32,
    width: u32,
    height: u32,
    crop_x: u32,
    crop_y: u32,
) -> String {
    format!(
        "scale={}:{},crop={}:{}:{}:{}",
        scaled_width, scaled_height, width, height, crop_x, crop_y
    )
}

/// Scale then pad onto a `width x height` black canvas.
pub fn scale_pad(
    scaled_width: u32,
    scaled_height: u32,
    width: u32,
    height: u32,
    pad_left: u32,
    pad_top: u32,
) -> String {
    format!(
        "scale={}:{},pad={}:{}:{}:{}:color=black",
        scaled_width, scaled_height, width, height, pad_left, pad_top
    )
}

/// Center-crop to the largest square.
pub fn square_crop() -> &'static str {
    "crop='min(iw,ih)':'min(iw,ih)'"
}

/// Keep luma/chroma, set alpha to opaque inside the given radius band.
fn alpha_geq(alpha_expr: &str) -> String {
    format!(
        "format=yuva420p,geq=lum='p(X,Y)':cb='p(X,Y)':cr='p(X,Y)':a='{}'",
        alpha_expr
    )
}

/// Circular alpha mask for a `diameter x diameter` frame.
pub fn circle_mask(diameter: u32) -> String {
    let r = fmt_num(diameter as f64 / 2.0);
    alpha_geq(&format!("if(lte(hypot(X-{r},Y-{r}),{r}),255,0)", r = r))
}

/// Ring alpha mask: opaque between `inner_radius` and the frame's half-size.
pub fn ring_mask(ring_size: u32, inner_radius: f64) -> String {
    let c = fmt_num(ring_size as f64 / 2.0);
    alpha_geq(&format!(
        "if(between(hypot(X-{c},Y-{c}),{inner},{c}),255,0)",
        c = c,
        inner = fmt_num(inner_radius)
    ))
}

/// Solid color source of the given size.
pub fn color_source(hex_color: &str, size: u32) -> String {
    format!(
        "color=c=0x{}:s={}x{}",
        hex_color.trim_start_matches('#'),
        size,
        size
    )
}

pub fn overlay_at(x: i64, y: i64) -> String {
    format!("overlay={}:{}:shortest=1", x, y)
}

/// Linear interpolation over zoompan's output frame index.
///
/// `frames` is the total frame count; the value reaches `end` on the last
/// frame.
pub fn frame_lerp(start: f64, end: f64, frames: u32) -> String {
    if (end - start).abs() < f64::EPSILON || frames <= 1 {
        return fmt_num(start);
    }
    format!(
        "{}+({})*on/{}",
        fmt_num(start),
        fmt_num(end - start),
        frames - 1
    )
}

/// `zoompan` with closed-form zoom and pan expressions.
///
/// `pan_x` / `pan_y` are fraction expressions of the travel room
/// `iw - iw/zoom` (resp. `ih - ih/zoom`).
pub fn zoompan(zoom: &str, pan_x: &str, pan_y: &str, width: u32, height: u32, fps: u32) -> String {
    format!(
        "zoompan=z='{zoom}':x='({px})*(iw-iw/zoom)':y='({py})*(ih-ih/zoom)':d=1:s={w}x{h}:fps={fps}",
        zoom = zoom,
        px = pan_x,
        py = pan_y,
        w = width,
        h = height,
        fps = fps
    )
}

/// Cut `[start, end)` and rebase timestamps.
pub fn trim(start: f64, end: f64) -> String {
    format!(
        "trim=start={}:end={},setpts=PTS-STARTPTS",
        fmt_num(start),
        fmt_num(end)
    )
}

/// Audio counterpart of [`trim`].
pub fn atrim(start: f64, end: f64) -> String {
    format!(
        "atrim=start={}:end={},asetpts=PTS-STARTPTS",
        fmt_num(start),
        fmt_num(end)
    )
}

/// Silent audio of `duration` seconds for inputs without an audio track.
pub fn silence(sample_rate: u32, channel_layout: &str, duration: f64) -> String {
    format!(
        "anullsrc=r={}:cl={},atrim=end={}",
        sample_rate,
        channel_layout,
        fmt_num(duration)
    )
}

/// Resample to a fixed rate, sample format and channel layout.
pub fn audio_normalize(sample_rate: u32, sample_format: &str, channel_layout: &str) -> String {
    format!(
        "aresample={},aformat=sample_fmts={}:sample_rates={}:channel_layouts={}",
        sample_rate, sample_format, sample_rate, channel_layout
    )
}
