//! ffmpeg invocation and argument builders for every transcode the tools run.

use crate::error::TranscodeError;
use crate::geometry::{CropRect, CropWindow};
use log::{debug, trace};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

const STDERR_TAIL_LINES: usize = 20;
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

/// Video encoder settings used whenever a tool has to re-encode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
}

impl EncodeSettings {
    /// High quality x264, used for aspect-ratio normalization.
    pub fn high_quality() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 18,
            preset: "slow".to_string(),
        }
    }

    /// x264 defaults at a balanced preset.
    pub fn balanced() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 23,
            preset: "medium".to_string(),
        }
    }

    fn push_args(&self, args: &mut Vec<OsString>) {
        push(args, ["-c:v", self.video_codec.as_str()]);
        args.push("-crf".into());
        args.push(self.crf.to_string().into());
        push(args, ["-preset", self.preset.as_str()]);
    }
}

/// Runs the `ffmpeg` executable.
#[derive(Clone, Debug)]
pub struct Ffmpeg {
    program: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn run(&self, args: &[OsString]) -> Result<(), TranscodeError> {
        let program = self.program.display().to_string();
        trace!(
            "{} {}",
            program,
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| TranscodeError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TranscodeError::Failed {
                program,
                status: output.status.to_string(),
                stderr: stderr_tail(&String::from_utf8_lossy(&output.stderr)),
            });
        }
        debug!("{} finished with {}", program, output.status);
        Ok(())
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

fn push<const N: usize>(args: &mut Vec<OsString>, values: [&str; N]) {
    args.extend(values.iter().map(|value| OsString::from(*value)));
}

fn base_args() -> Vec<OsString> {
    let mut args = Vec::new();
    push(&mut args, ["-hide_banner", "-loglevel", "error", "-y"]);
    args
}

fn push_input(args: &mut Vec<OsString>, input: &Path) {
    args.push("-i".into());
    args.push(input.as_os_str().to_owned());
}

pub fn crop_filter(rect: &CropRect) -> String {
    format!("crop={}:{}:{}:{}", rect.width, rect.height, rect.x, rect.y)
}

/// `crop=...` plus a `scale=...` stage when the output size differs from the crop.
pub fn crop_scale_filter(window: &CropWindow) -> String {
    let crop = crop_filter(&window.crop);
    if window.needs_scale() {
        format!(
            "{},scale={}:{}",
            crop, window.output_width, window.output_height
        )
    } else {
        crop
    }
}

pub fn normalize_args(
    input: &Path,
    output: &Path,
    window: &CropWindow,
    encode: &EncodeSettings,
) -> Vec<OsString> {
    let mut args = base_args();
    push_input(&mut args, input);
    args.push("-vf".into());
    args.push(crop_scale_filter(window).into());
    encode.push_args(&mut args);
    push(&mut args, ["-c:a", "copy"]);
    args.push(output.as_os_str().to_owned());
    args
}

/// Resamples to `fps` with the `fps` filter; duration is kept by dropping or
/// duplicating frames.
pub fn resample_fps_args(
    input: &Path,
    output: &Path,
    fps: f64,
    encode: &EncodeSettings,
) -> Vec<OsString> {
    let mut args = base_args();
    push_input(&mut args, input);
    args.push("-filter:v".into());
    args.push(format!("fps={}", fps).into());
    encode.push_args(&mut args);
    push(&mut args, ["-c:a", "copy"]);
    args.push(output.as_os_str().to_owned());
    args
}

/// Rescales input timestamps by `scale` without re-encoding, so every frame
/// is kept and the duration changes.
pub fn retime_args(input: &Path, output: &Path, scale: f64) -> Vec<OsString> {
    let mut args = base_args();
    args.push("-itsscale".into());
    args.push(scale.to_string().into());
    push_input(&mut args, input);
    push(
        &mut args,
        ["-c:v", "copy", "-c:a", "copy", "-avoid_negative_ts", "make_zero"],
    );
    args.push(output.as_os_str().to_owned());
    args
}

pub fn speed_args(
    input: &Path,
    output: &Path,
    factor: f64,
    keep_audio: bool,
    encode: &EncodeSettings,
) -> Vec<OsString> {
    let mut args = base_args();
    push_input(&mut args, input);
    args.push("-filter:v".into());
    args.push(format!("setpts=PTS/{}", factor).into());
    encode.push_args(&mut args);
    if keep_audio {
        let chain = atempo_chain(factor)
            .iter()
            .map(|step| format!("atempo={}", step))
            .collect::<Vec<_>>()
            .join(",");
        args.push("-filter:a".into());
        args.push(chain.into());
    } else {
        args.push("-an".into());
    }
    args.push(output.as_os_str().to_owned());
    args
}

pub fn tile_args(
    input: &Path,
    output: &Path,
    rect: &CropRect,
    encode: &EncodeSettings,
) -> Vec<OsString> {
    let mut args = base_args();
    push_input(&mut args, input);
    args.push("-vf".into());
    args.push(crop_filter(rect).into());
    encode.push_args(&mut args);
    push(&mut args, ["-c:a", "copy"]);
    args.push(output.as_os_str().to_owned());
    args
}

/// Splits a tempo factor into `atempo` steps that each stay within the
/// filter's supported range.
pub fn atempo_chain(factor: f64) -> Vec<f64> {
    let mut steps = Vec::new();
    let mut remaining = factor;
    while remaining > ATEMPO_MAX {
        steps.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        steps.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    steps.push(remaining);
    steps
}
