use super::{
    display_name, ensure_distinct, prepare_output_dir, process_file, require_dir, BatchSummary,
    Toolchain,
};
use anyhow::{Context, Result};
use clap::{value_parser, Args};
use clip_prep::media::ffmpeg::tile_args;
use clip_prep::media::EncodeSettings;
use clip_prep::scan::{self, derived_file_name};
use clip_prep::{split_frame, SourceGeometry, Tile};
use log::{debug, info};
use std::path::{Path, PathBuf};

#[derive(Args, Clone, Debug)]
pub struct SplitArgs {
    /// Input folder containing videos
    pub input_folder: PathBuf,

    /// Output folder for the tiles
    pub output_folder: PathBuf,

    /// Number of tile columns
    #[arg(long, default_value_t = 2, value_parser = value_parser!(u32).range(1..))]
    pub columns: u32,

    /// Number of tile rows
    #[arg(long, default_value_t = 1, value_parser = value_parser!(u32).range(1..))]
    pub rows: u32,
}

/// `<stem>_r<row>c<col><ext>`, counting rows and columns from 1.
pub fn tile_file_name(clip: &Path, tile: &Tile) -> String {
    derived_file_name(clip, &format!("_r{}c{}", tile.row + 1, tile.column + 1))
}

pub fn run(args: &SplitArgs, tools: &Toolchain, extensions: &[String]) -> Result<BatchSummary> {
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

    info!(
        "Splitting {} videos into {}x{} tiles",
        clips.len(),
        args.columns,
        args.rows
    );
    let encode = tools.encode_settings(EncodeSettings::balanced());

    for (idx, clip) in clips.iter().enumerate() {
        info!("Processing {}/{}: {}", idx + 1, clips.len(), display_name(clip));
        process_file(&mut summary, clip, || {
            split_clip(clip, &args.output_folder, args.columns, args.rows, tools, &encode)
        })?;
    }

    info!(
        "Processed {}/{} videos successfully",
        summary.succeeded, summary.total
    );
    Ok(summary)
}

fn split_clip(
    clip: &Path,
    output_folder: &Path,
    columns: u32,
    rows: u32,
    tools: &Toolchain,
    encode: &EncodeSettings,
) -> Result<()> {
    let (width, height) = tools
        .probe
        .probe_dimensions(clip)
        .with_context(|| format!("Could not get dimensions of {}", display_name(clip)))?;
    let tiles = split_frame(SourceGeometry::new(width, height), columns, rows)?;

    for tile in &tiles {
        let output = output_folder.join(tile_file_name(clip, tile));
        debug!("  Tile {} -> {}", tile.rect, output.display());
        tools
            .ffmpeg
            .run(&tile_args(clip, &output, &tile.rect, encode))?;
    }
    info!("  ✓ Wrote {} tiles", tiles.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clip_prep::CropRect;

    #[test]
    fn tile_names_count_from_one() {
        let tile = Tile {
            row: 0,
            column: 2,
            rect: CropRect {
                width: 2,
                height: 2,
                x: 0,
                y: 0,
            },
        };
        assert_eq!(tile_file_name(Path::new("in/a.mp4"), &tile), "a_r1c3.mp4");
    }
}
