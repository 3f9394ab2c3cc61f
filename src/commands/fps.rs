use super::{
    display_name, ensure_distinct, ensure_positive, parse_positive_f64, prepare_output_dir,
    process_file, require_dir, BatchSummary, Toolchain,
};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use clip_prep::media::ffmpeg::{resample_fps_args, retime_args};
use clip_prep::media::{EncodeSettings, MediaProbe};
use clip_prep::scan::{self, derived_file_name};
use log::{info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_TARGET_FPS: f64 = 30.0;
/// Assumed source rate when retiming a clip whose rate cannot be read.
pub const FALLBACK_SOURCE_FPS: f64 = 30.0;

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DurationMode {
    /// Keep the duration; frames are dropped or duplicated.
    #[default]
    Preserve,
    /// Keep every frame; the duration stretches or shrinks.
    Change,
}

#[derive(Args, Clone, Debug)]
pub struct FpsArgs {
    /// Input folder containing videos
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output folder for converted videos
    #[arg(short, long)]
    pub output: PathBuf,

    /// Target frames per second
    #[arg(
        short = 'f',
        long = "fps",
        default_value_t = DEFAULT_TARGET_FPS,
        value_parser = parse_positive_f64,
        id = "target_fps"
    )]
    pub target_fps: f64,

    /// Whether to preserve the duration or change it
    #[arg(
        short,
        long = "duration",
        value_enum,
        default_value_t = DurationMode::Preserve,
        id = "duration_mode"
    )]
    pub duration_mode: DurationMode,
}

/// `<stem>_fps<N><ext>`, with the rate truncated to an integer.
pub fn output_file_name(clip: &Path, target_fps: f64) -> String {
    derived_file_name(clip, &format!("_fps{}", target_fps.trunc() as u64))
}

/// `-itsscale` factor that retimes `source_fps` material to `target_fps`.
pub fn retime_scale(source_fps: f64, target_fps: f64) -> f64 {
    source_fps / target_fps
}

/// Base rate of `clip`, or [`FALLBACK_SOURCE_FPS`] when it cannot be read.
pub fn source_frame_rate(probe: &dyn MediaProbe, clip: &Path) -> f64 {
    probe.frame_rate(clip).unwrap_or_else(|| {
        warn!(
            "Could not read the frame rate of {}; assuming {} fps",
            display_name(clip),
            FALLBACK_SOURCE_FPS
        );
        FALLBACK_SOURCE_FPS
    })
}

pub fn run(args: &FpsArgs, tools: &Toolchain, extensions: &[String]) -> Result<BatchSummary> {
    require_dir(&args.input, "Input")?;
    ensure_distinct(&args.input, &args.output)?;
    ensure_positive("target fps", args.target_fps)?;
    prepare_output_dir(&args.output)?;

    let clips = scan::find_videos(&args.input, extensions, false);
    let mut summary = BatchSummary {
        total: clips.len(),
        ..Default::default()
    };
    if clips.is_empty() {
        info!("No video files found in '{}'", args.input.display());
        return Ok(summary);
    }

    info!(
        "Converting {} videos to {} fps ({} duration)",
        clips.len(),
        args.target_fps,
        args.duration_mode
    );
    let encode = tools.encode_settings(EncodeSettings::balanced());

    for clip in &clips {
        let output = args.output.join(output_file_name(clip, args.target_fps));
        process_file(&mut summary, clip, || {
            let job = match args.duration_mode {
                DurationMode::Preserve => {
                    resample_fps_args(clip, &output, args.target_fps, &encode)
                }
                DurationMode::Change => {
                    let source_fps = source_frame_rate(tools.probe.as_ref(), clip);
                    retime_args(clip, &output, retime_scale(source_fps, args.target_fps))
                }
            };
            tools
                .ffmpeg
                .run(&job)
                .with_context(|| format!("Failed to convert {}", display_name(clip)))?;
            info!("Successfully converted: {}", display_name(clip));
            Ok(())
        })?;
    }

    info!(
        "Conversion completed: {} videos successfully converted, {} failed",
        summary.succeeded, summary.failed
    );
    Ok(summary)
}
