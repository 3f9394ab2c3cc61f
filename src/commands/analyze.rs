use super::{require_dir, Toolchain};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use clip_prep::media::{FrameCountMethod, StreamInfo};
use clip_prep::scan;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const NAME_WIDTH: usize = 40;
const MAX_NAME_CHARS: usize = 38;
const TRUNCATED_NAME_CHARS: usize = 35;

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Clone, Debug)]
pub struct AnalyzeArgs {
    /// Folder containing the clips to analyze
    pub folder: PathBuf,

    /// Search subfolders as well
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Skip the frame count and FPS columns
    #[arg(long, default_value_t = false)]
    pub no_duration: bool,

    /// Count frames by decoding every frame (slow but exact)
    #[arg(long, default_value_t = false, id = "exact_frames")]
    pub exact_frames: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, id = "output")]
    pub output: OutputFormat,
}

/// One analyzed clip; `info` holds the probe error message on failure.
#[derive(Debug, Clone)]
pub struct AnalyzedClip {
    pub name: String,
    pub info: std::result::Result<StreamInfo, String>,
}

#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    file: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

pub fn run(args: &AnalyzeArgs, tools: &Toolchain, extensions: &[String]) -> Result<()> {
    require_dir(&args.folder, "Input")?;

    let clips = scan::find_videos(&args.folder, extensions, args.recursive);
    for clip in &clips {
        debug!("Found {}", clip.display());
    }

    let method = if args.exact_frames {
        FrameCountMethod::Decode
    } else {
        FrameCountMethod::Metadata
    };
    let analyzed: Vec<AnalyzedClip> = clips
        .iter()
        .map(|clip| AnalyzedClip {
            name: clip_label(&args.folder, clip, args.recursive),
            info: tools
                .probe
                .stream_info(clip, method)
                .map_err(|err| err.to_string()),
        })
        .collect();

    let report = match args.output {
        OutputFormat::Text if analyzed.is_empty() => no_files_message(&args.folder, extensions),
        OutputFormat::Text => render_table(&analyzed, !args.no_duration),
        OutputFormat::Json => render_json(&analyzed, !args.no_duration)?,
    };
    print!("{}", report);
    Ok(())
}

/// Path shown for `clip`: relative to `root` when recursing, the bare file
/// name otherwise.
pub fn clip_label(root: &Path, clip: &Path, recursive: bool) -> String {
    if recursive {
        if let Ok(relative) = clip.strip_prefix(root) {
            return relative.display().to_string();
        }
    }
    super::display_name(clip)
}

pub fn truncate_name(name: &str) -> String {
    if name.chars().count() > MAX_NAME_CHARS {
        let head: String = name.chars().take(TRUNCATED_NAME_CHARS).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

fn no_files_message(folder: &Path, extensions: &[String]) -> String {
    format!(
        "No video files found in '{}'\nSupported extensions: {}\n",
        folder.display(),
        extensions.join(", ")
    )
}

fn format_fps(fps: Option<f64>) -> String {
    fps.map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn render_table(clips: &[AnalyzedClip], show_duration: bool) -> String {
    let mut out = String::new();
    let rule = "-".repeat(if show_duration { 105 } else { 80 });

    let _ = write!(
        out,
        "{:<width$} {:<15} {:<12}",
        "Filename",
        "Resolution",
        "Aspect Ratio",
        width = NAME_WIDTH
    );
    if show_duration {
        let _ = write!(out, " {:<12} {:<8}", "Frames", "FPS");
    }
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    for clip in clips {
        let name = truncate_name(&clip.name);
        match &clip.info {
            Ok(info) => {
                let resolution = format!("{}x{}", info.width, info.height);
                let ratio = info
                    .display_aspect_ratio()
                    .map(|r| format!("{:.2}", r))
                    .unwrap_or_else(|| "N/A".to_string());
                let _ = write!(
                    out,
                    "{:<width$} {:<15} {:<12}",
                    name,
                    resolution,
                    ratio,
                    width = NAME_WIDTH
                );
                if show_duration {
                    let _ = write!(
                        out,
                        " {:<12} {:<8}",
                        info.frame_count.to_string(),
                        format_fps(info.fps)
                    );
                }
            }
            Err(_) => {
                let _ = write!(
                    out,
                    "{:<width$} {:<15} {:<12}",
                    name,
                    "Error",
                    "N/A",
                    width = NAME_WIDTH
                );
                if show_duration {
                    let _ = write!(out, " {:<12} {:<8}", "N/A", "N/A");
                }
            }
        }
        let trimmed = out.trim_end_matches(' ').len();
        out.truncate(trimmed);
        out.push('\n');
    }

    out.push_str(&rule);
    out.push('\n');
    let _ = writeln!(out, "Total files processed: {}", clips.len());
    out
}

pub fn render_json(clips: &[AnalyzedClip], show_duration: bool) -> Result<String> {
    let records: Vec<JsonRecord<'_>> = clips
        .iter()
        .map(|clip| match &clip.info {
            Ok(info) => JsonRecord {
                file: &clip.name,
                width: Some(info.width),
                height: Some(info.height),
                aspect_ratio: info.display_aspect_ratio(),
                frames: if show_duration {
                    info.frame_count.known()
                } else {
                    None
                },
                fps: if show_duration { info.fps } else { None },
                error: None,
            },
            Err(message) => JsonRecord {
                file: &clip.name,
                width: None,
                height: None,
                aspect_ratio: None,
                frames: None,
                fps: None,
                error: Some(message),
            },
        })
        .collect();
    let mut json =
        serde_json::to_string_pretty(&records).context("Failed to serialize analysis report")?;
    json.push('\n');
    Ok(json)
}
