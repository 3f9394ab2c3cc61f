use super::{display_name, require_dir, Toolchain};
use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use clip_prep::bucket::{bucket_dir_name, parse_bucket_list};
use clip_prep::media::{FrameCountMethod, MediaProbe};
use clip_prep::{assign_bucket, scan, Assignment, BucketSet, Unbucketed};
use log::{error, info, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXTENSIONS: &[&str] = &["mp4"];
pub const UNBUCKETED_DIR: &str = "unbucketed";

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    ValueEnum,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UnbucketedPolicy {
    /// Leave clips that fit no bucket where they are.
    #[default]
    Skip,
    /// Copy them into an `unbucketed` folder.
    Collect,
}

#[derive(Args, Clone, Debug)]
pub struct BucketArgs {
    /// Folder containing the clips to sort
    pub input_folder: PathBuf,

    /// Frame count buckets, comma separated (e.g. 30,60,120,300)
    #[arg(short, long, id = "buckets")]
    pub buckets: Option<String>,

    /// Base folder for the bucket folders (defaults to the input folder)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// What to do with clips that fit no bucket
    #[arg(long, value_enum, default_value_t = UnbucketedPolicy::Skip, id = "unbucketed")]
    pub unbucketed: UnbucketedPolicy,

    /// Decode every frame instead of trusting container metadata (slow)
    #[arg(long, default_value_t = false, id = "exact_frames")]
    pub exact_frames: bool,

    /// Search subfolders (default)
    #[arg(long, overrides_with = "no_recursive")]
    pub recursive: bool,

    /// Only look at the top level of the input folder
    #[arg(long, overrides_with = "recursive")]
    pub no_recursive: bool,
}

impl BucketArgs {
    pub fn recursive(&self) -> bool {
        self.recursive || !self.no_recursive
    }
}

/// Where each clip goes, decided before anything is copied.
#[derive(Debug, Default)]
pub struct BucketPlan {
    pub assigned: BTreeMap<u64, Vec<PathBuf>>,
    pub below_minimum: Vec<PathBuf>,
    pub unknown: Vec<PathBuf>,
}

impl BucketPlan {
    pub fn total(&self) -> usize {
        self.assigned.values().map(Vec::len).sum::<usize>()
            + self.below_minimum.len()
            + self.unknown.len()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BucketSummary {
    pub total: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub buckets_created: usize,
}

pub fn run(args: &BucketArgs, tools: &Toolchain, extensions: &[String]) -> Result<BucketSummary> {
    require_dir(&args.input_folder, "Input")?;

    let raw = args.buckets.as_deref().ok_or_else(|| {
        anyhow!("No buckets given; pass --buckets or set [bucket] buckets in the config file")
    })?;
    let buckets = BucketSet::new(parse_bucket_list(raw)?)?;

    let output_root = args
        .output
        .clone()
        .unwrap_or_else(|| args.input_folder.clone());
    if args.output.is_some() {
        super::prepare_output_dir(&output_root)?;
    }

    info!("Scanning for videos in: {}", args.input_folder.display());
    info!("Output directory: {}", output_root.display());
    info!("Using buckets: {}", buckets);

    let clips = scan::find_videos(&args.input_folder, extensions, args.recursive());
    if clips.is_empty() {
        info!("No video files found");
        return Ok(BucketSummary::default());
    }
    info!("Found {} video files", clips.len());

    let method = if args.exact_frames {
        FrameCountMethod::Decode
    } else {
        FrameCountMethod::Metadata
    };
    let plan = plan_buckets(&clips, &buckets, tools.probe.as_ref(), method);
    let summary = copy_into_buckets(&plan, &output_root, args.unbucketed)?;
    log_summary(&summary);
    Ok(summary)
}

/// Phase one: count frames and pick a bucket for every clip.
pub fn plan_buckets(
    clips: &[PathBuf],
    buckets: &BucketSet,
    probe: &dyn MediaProbe,
    method: FrameCountMethod,
) -> BucketPlan {
    let mut plan = BucketPlan::default();
    let total = clips.len();

    for (idx, clip) in clips.iter().enumerate() {
        let name = display_name(clip);
        let frames = probe.count_frames(clip, method);
        match assign_bucket(frames, buckets) {
            Assignment::Bucket(bucket) => {
                info!(
                    "Processing {}/{}: {} - {} frames - assigned to {}",
                    idx + 1,
                    total,
                    name,
                    frames,
                    bucket_dir_name(bucket)
                );
                plan.assigned.entry(bucket).or_default().push(clip.clone());
            }
            Assignment::Unbucketed(Unbucketed::BelowMinimum) => {
                info!(
                    "Processing {}/{}: {} - {} frames - SKIPPED (no suitable bucket)",
                    idx + 1,
                    total,
                    name,
                    frames
                );
                plan.below_minimum.push(clip.clone());
            }
            Assignment::Unbucketed(Unbucketed::UnknownFrameCount) => {
                warn!(
                    "Processing {}/{}: {} - SKIPPED (could not determine frame count)",
                    idx + 1,
                    total,
                    name
                );
                plan.unknown.push(clip.clone());
            }
        }
    }

    plan
}

/// Phase two: create only the folders that receive clips and copy into them.
/// Clips already present at the destination are left alone.
pub fn copy_into_buckets(
    plan: &BucketPlan,
    output_root: &Path,
    policy: UnbucketedPolicy,
) -> Result<BucketSummary> {
    let mut summary = BucketSummary {
        total: plan.total(),
        ..Default::default()
    };

    let mut targets: Vec<(String, bool, Vec<&PathBuf>)> = plan
        .assigned
        .iter()
        .map(|(bucket, clips)| (bucket_dir_name(*bucket), true, clips.iter().collect()))
        .collect();

    let leftovers: Vec<&PathBuf> = plan.below_minimum.iter().chain(&plan.unknown).collect();
    match policy {
        UnbucketedPolicy::Skip => summary.skipped += leftovers.len(),
        UnbucketedPolicy::Collect => {
            targets.push((UNBUCKETED_DIR.to_string(), false, leftovers));
        }
    }

    for (folder, is_bucket, clips) in targets {
        if clips.is_empty() {
            continue;
        }
        let dir = output_root.join(&folder);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create folder '{}'", dir.display()))?;
        if is_bucket {
            summary.buckets_created += 1;
        }
        info!("Created {} for {} files", folder, clips.len());

        let mut copied_here = 0;
        for clip in clips {
            let Some(file_name) = clip.file_name() else {
                continue;
            };
            let dest = dir.join(file_name);
            if dest.exists() {
                info!(
                    "  Skipped {} (already exists in {})",
                    display_name(clip),
                    folder
                );
                summary.skipped += 1;
                continue;
            }
            match fs::copy(clip, &dest) {
                Ok(_) => {
                    copied_here += 1;
                    summary.copied += 1;
                }
                Err(err) => {
                    error!(
                        "  Error copying {} to {}: {}",
                        clip.display(),
                        dest.display(),
                        err
                    );
                    summary.failed += 1;
                }
            }
        }
        info!("  Copied {} files to {}", copied_here, folder);
    }

    Ok(summary)
}

fn log_summary(summary: &BucketSummary) {
    info!("Summary:");
    info!("  Total video files: {}", summary.total);
    info!("  Successfully processed: {}", summary.copied);
    info!("  Skipped: {}", summary.skipped);
    if summary.failed > 0 {
        info!("  Failed: {}", summary.failed);
    }
    info!("  Number of buckets created: {}", summary.buckets_created);
}
