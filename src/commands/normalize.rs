use super::{
    display_name, ensure_distinct, prepare_output_dir, process_file, require_dir, BatchSummary,
    Toolchain,
};
use anyhow::{Context, Result};
use clap::Args;
use clip_prep::geometry::{DEFAULT_ASPECT_RATIO, DEFAULT_TOLERANCE};
use clip_prep::media::ffmpeg::normalize_args;
use clip_prep::media::EncodeSettings;
use clip_prep::scan::{self, derived_file_name};
use clip_prep::{plan_crop, AspectRatioTarget, CropPlan, SourceGeometry, Tolerance};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

pub const OUTPUT_SUFFIX: &str = "_normalized";

#[derive(Args, Clone, Debug)]
pub struct NormalizeArgs {
    /// Input folder containing videos
    pub input_folder: PathBuf,

    /// Output folder for normalized videos
    pub output_folder: PathBuf,

    /// Target aspect ratio (1.78 for 16:9, 1.0 for square)
    #[arg(long, default_value_t = DEFAULT_ASPECT_RATIO, id = "aspect_ratio")]
    pub aspect_ratio: f64,

    /// Fixed output width; the height follows from the aspect ratio
    #[arg(long, id = "width")]
    pub width: Option<u32>,

    /// Fixed output height; the width follows from the aspect ratio
    #[arg(long, id = "height")]
    pub height: Option<u32>,

    /// Largest aspect ratio difference left untouched
    #[arg(long, default_value_t = DEFAULT_TOLERANCE, id = "tolerance")]
    pub tolerance: f64,
}

pub fn run(args: &NormalizeArgs, tools: &Toolchain, extensions: &[String]) -> Result<BatchSummary> {
    let target = AspectRatioTarget::new(args.aspect_ratio, args.width, args.height)?;
    let tolerance = Tolerance::new(args.tolerance)?;
    let fixed_output = target.fixed_output(tolerance)?;

    require_dir(&args.input_folder, "Input")?;
    ensure_distinct(&args.input_folder, &args.output_folder)?;
    prepare_output_dir(&args.output_folder)?;

    let clips = scan::find_videos(&args.input_folder, extensions, false);
    let mut summary = BatchSummary {
        total: clips.len(),
        ..Default::default()
    };
    if clips.is_empty() {
        info!("No video files found in '{}'", args.input_folder.display());
        return Ok(summary);
    }

    info!("Found {} video files", clips.len());
    match fixed_output {
        Some((width, height)) => info!(
            "Target resolution: {}x{} (AR: {:.2})",
            width,
            height,
            width as f64 / height as f64
        ),
        None => info!(
            "Target aspect ratio: {:.2} (resolution calculated per video)",
            target.ratio()
        ),
    }
    info!("Method: crop (content may be lost from the edges)");

    let encode = tools.encode_settings(EncodeSettings::high_quality());
    for clip in &clips {
        let output = args
            .output_folder
            .join(derived_file_name(clip, OUTPUT_SUFFIX));
        process_file(&mut summary, clip, || {
            normalize_clip(clip, &output, &target, tolerance, tools, &encode)
        })?;
    }

    info!(
        "Processed {}/{} videos successfully",
        summary.succeeded, summary.total
    );
    Ok(summary)
}

fn normalize_clip(
    clip: &Path,
    output: &Path,
    target: &AspectRatioTarget,
    tolerance: Tolerance,
    tools: &Toolchain,
    encode: &EncodeSettings,
) -> Result<()> {
    let name = display_name(clip);
    let (width, height) = tools
        .probe
        .probe_dimensions(clip)
        .with_context(|| format!("Could not get dimensions of {}", name))?;
    let source = SourceGeometry::new(width, height);

    match plan_crop(source, target, tolerance)? {
        CropPlan::PassThrough => {
            info!(
                "Copying: {} (already at AR {:.2})",
                name,
                source.ratio()
            );
            fs::copy(clip, output)
                .with_context(|| format!("Failed to copy {} to {}", name, output.display()))?;
        }
        CropPlan::Crop(window) => {
            let removed_horizontally = source.width - window.crop.width;
            let (removed, edges) = if removed_horizontally > 0 {
                (removed_horizontally, "left/right")
            } else {
                (source.height - window.crop.height, "top/bottom")
            };
            info!("Processing: {}", name);
            info!("  Input: {} (AR: {:.2})", source, source.ratio());
            info!(
                "  Crop: {}x{} (removing {}px from {})",
                window.crop.width, window.crop.height, removed, edges
            );
            info!(
                "  Final: {}x{} (AR: {:.2})",
                window.output_width,
                window.output_height,
                window.output_ratio()
            );
            tools
                .ffmpeg
                .run(&normalize_args(clip, output, &window, encode))?;
        }
    }

    info!("  ✓ Saved: {}", display_name(output));
    Ok(())
}
