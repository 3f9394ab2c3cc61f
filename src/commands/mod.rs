pub mod analyze;
pub mod bucket;
pub mod caption;
pub mod fps;
pub mod normalize;
pub mod speed;
pub mod split;

use crate::config::EncodeOverrides;
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use clip_prep::media::{EncodeSettings, Ffmpeg, MediaProbe};
use clip_prep::PrepError;
use log::{error, info};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Clone, Debug, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Tool {
    /// Sort clips into frame-count bucket folders
    Bucket(bucket::BucketArgs),
    /// Change the frame rate of every clip in a folder
    Fps(fps::FpsArgs),
    /// Report resolution, aspect ratio, frame count and FPS of clips
    Analyze(analyze::AnalyzeArgs),
    /// Crop clips to a common aspect ratio
    Normalize(normalize::NormalizeArgs),
    /// Speed clips up or slow them down by a constant factor
    Speed(speed::SpeedArgs),
    /// Crop each clip into a grid of tiles, one output clip per tile
    Split(split::SplitArgs),
    /// Write `.txt` caption files from a trigger word or a CSV file
    Caption(caption::CaptionArgs),
}

/// External programs and encoder settings shared by every tool.
pub struct Toolchain {
    pub probe: Box<dyn MediaProbe>,
    pub ffmpeg: Ffmpeg,
    pub encode: EncodeOverrides,
}

impl Toolchain {
    pub fn encode_settings(&self, base: EncodeSettings) -> EncodeSettings {
        self.encode.apply(base)
    }
}

/// Per-run tally for the converting tools.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub fn run(tool: &Tool, tools: &Toolchain, extensions: Option<&[String]>) -> Result<()> {
    info!("Running {}", tool);
    match tool {
        Tool::Bucket(args) => {
            let exts = extensions_or(extensions, bucket::DEFAULT_EXTENSIONS);
            bucket::run(args, tools, &exts).map(|_| ())
        }
        Tool::Fps(args) => {
            let exts = extensions_or(extensions, clip_prep::scan::VIDEO_EXTENSIONS);
            fps::run(args, tools, &exts).map(|_| ())
        }
        Tool::Analyze(args) => {
            let exts = extensions_or(extensions, clip_prep::scan::ANALYZE_EXTENSIONS);
            analyze::run(args, tools, &exts)
        }
        Tool::Normalize(args) => {
            let exts = extensions_or(extensions, clip_prep::scan::VIDEO_EXTENSIONS);
            normalize::run(args, tools, &exts).map(|_| ())
        }
        Tool::Speed(args) => {
            let exts = extensions_or(extensions, clip_prep::scan::VIDEO_EXTENSIONS);
            speed::run(args, tools, &exts).map(|_| ())
        }
        Tool::Split(args) => {
            let exts = extensions_or(extensions, clip_prep::scan::VIDEO_EXTENSIONS);
            split::run(args, tools, &exts).map(|_| ())
        }
        Tool::Caption(args) => {
            let exts = extensions_or(extensions, caption::DEFAULT_EXTENSIONS);
            caption::run(args, &exts).map(|_| ())
        }
    }
}

fn extensions_or(configured: Option<&[String]>, default: &[&str]) -> Vec<String> {
    match configured {
        Some(list) if !list.is_empty() => list.to_vec(),
        _ => default.iter().map(|ext| ext.to_string()).collect(),
    }
}

pub(crate) fn parse_positive_f64(input: &str) -> Result<f64, String> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|err| format!("'{}' is not a number: {}", input, err))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("'{}' must be a positive number", input));
    }
    Ok(value)
}

/// Rejects non-positive values that may arrive through the config file.
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PrepError::config(format!("{} must be positive, got {}", name, value)).into());
    }
    Ok(())
}

pub(crate) fn require_dir(path: &Path, role: &str) -> Result<()> {
    if !path.is_dir() {
        bail!(
            "{} folder '{}' does not exist or is not a directory",
            role,
            path.display()
        );
    }
    Ok(())
}

pub(crate) fn prepare_output_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create output folder '{}'", path.display()))
}

fn resolve(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    })
}

pub(crate) fn ensure_distinct(input: &Path, output: &Path) -> Result<()> {
    if resolve(input) == resolve(output) {
        bail!(
            "Input and output folders must be different (both are '{}')",
            input.display()
        );
    }
    Ok(())
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_fatal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PrepError>()
        .is_some_and(PrepError::is_fatal)
}

/// Runs one file's job, logging failures so the batch can continue.
/// Configuration errors still abort the whole run.
pub(crate) fn process_file<F>(summary: &mut BatchSummary, clip: &Path, job: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    match job() {
        Ok(()) => {
            summary.succeeded += 1;
            Ok(())
        }
        Err(err) if is_fatal(&err) => Err(err),
        Err(err) => {
            error!("  ✗ Error processing {}: {:#}", display_name(clip), err);
            summary.failed += 1;
            Ok(())
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn positive_number_parser_rejects_zero_and_garbage() {
        assert_eq!(parse_positive_f64(" 2.5 "), Ok(2.5));
        assert!(parse_positive_f64("0").is_err());
        assert!(parse_positive_f64("-1").is_err());
        assert!(parse_positive_f64("inf").is_err());
        assert!(parse_positive_f64("fast").is_err());
    }

    #[test]
    fn same_folder_is_rejected_even_through_dot_segments() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("clips");
        fs::create_dir(&sub).unwrap();
        let dotted = tmp.path().join("clips/../clips");
        assert!(ensure_distinct(&sub, &dotted).is_err());
        assert!(ensure_distinct(&sub, &tmp.path().join("out")).is_ok());
    }

    #[test]
    fn configuration_errors_abort_but_file_errors_do_not() {
        let mut summary = BatchSummary::default();
        let clip = Path::new("clip.mp4");

        process_file(&mut summary, clip, || Err(PrepError::input("too small").into())).unwrap();
        process_file(&mut summary, clip, || Ok(())).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);

        let fatal = process_file(&mut summary, clip, || {
            Err(PrepError::config("zero columns").into())
        });
        assert!(fatal.is_err());
    }

    #[test]
    fn configured_extensions_replace_defaults() {
        let configured = vec!["webm".to_string()];
        assert_eq!(extensions_or(Some(&configured), &["mp4"]), vec!["webm"]);
        assert_eq!(extensions_or(None, &["mp4"]), vec!["mp4"]);
        assert_eq!(extensions_or(Some(&[]), &["mp4"]), vec!["mp4"]);
    }
}
