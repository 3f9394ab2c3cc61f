use super::{FrameCountMethod, MediaProbe, StreamInfo};
use crate::bucket::FrameCount;
use crate::error::ProbeError;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

/// [`MediaProbe`] backed by the `ffprobe` executable.
#[derive(Clone, Debug)]
pub struct Ffprobe {
    program: PathBuf,
}

impl Default for Ffprobe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl Ffprobe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl MediaProbe for Ffprobe {
    fn stream_info(
        &self,
        path: &Path,
        method: FrameCountMethod,
    ) -> Result<StreamInfo, ProbeError> {
        let mut cmd = Command::new(&self.program);
        cmd.args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]);
        if method == FrameCountMethod::Decode {
            cmd.arg("-count_frames");
        }
        cmd.arg(path);

        debug!("Probing '{}' ({:?} frame count)", path.display(), method);
        let output = cmd.output().map_err(|source| ProbeError::Spawn {
            program: self.program_name(),
            source,
        })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                program: self.program_name(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_json(&String::from_utf8_lossy(&output.stdout), method)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    nb_read_frames: Option<String>,
    duration: Option<String>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Turns `ffprobe -print_format json` output into a [`StreamInfo`].
pub fn parse_probe_json(json: &str, method: FrameCountMethod) -> Result<StreamInfo, ProbeError> {
    let probe: ProbeOutput = serde_json::from_str(json)?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref().map_or(true, |t| t == "video"))
        .ok_or(ProbeError::NoVideoStream)?;

    let width = stream.width.ok_or(ProbeError::MissingField("width"))?;
    let height = stream.height.ok_or(ProbeError::MissingField("height"))?;

    let avg_fps = stream.avg_frame_rate.as_deref().and_then(parse_fraction);
    let nominal_fps = stream.r_frame_rate.as_deref().and_then(parse_fraction);
    let fps = avg_fps.or(nominal_fps);
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let stream_duration = stream.duration.as_deref().and_then(parse_seconds);
    let format_duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_seconds);

    let frame_count = match method {
        FrameCountMethod::Decode => stream.nb_read_frames.as_deref().and_then(parse_count),
        FrameCountMethod::Metadata => stream
            .nb_frames
            .as_deref()
            .and_then(parse_count)
            .filter(|&n| n > 0)
            .or_else(|| frames_from_duration(stream_duration, fps))
            .or_else(|| frames_from_duration(format_duration, fps)),
    };

    Ok(StreamInfo {
        width,
        height,
        frame_count: FrameCount::from(frame_count),
        fps,
        nominal_fps: nominal_fps.or(avg_fps),
        duration_secs: stream_duration.or(format_duration),
        has_audio,
    })
}

/// Parses `"30000/1001"` or `"25"`; zero, negative and `0/0` rates are absent.
pub fn parse_fraction(value: &str) -> Option<f64> {
    let value = value.trim();
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

fn parse_seconds(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}

fn parse_count(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn frames_from_duration(duration: Option<f64>, fps: Option<f64>) -> Option<u64> {
    let frames = duration? * fps?;
    (frames.is_finite() && frames >= 0.0).then(|| frames.floor() as u64)
}
