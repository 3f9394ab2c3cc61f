use anyhow::Result;
use clap::parser::ValueSource;
use clap::{value_parser, ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use clip_prep::media::{Ffmpeg, Ffprobe};
use commands::caption::CaptionSource;
use commands::{Tool, Toolchain};
use log::{debug, info};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true, value_parser = value_parser!(PathBuf))]
    config_file: Option<PathBuf>,

    /// More output: -v for debug, -vv for trace
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only consider files with these extensions (comma separated)
    #[arg(long, global = true, value_delimiter = ',', id = "extensions")]
    extensions: Option<Vec<String>>,

    #[command(subcommand)]
    tool: Tool,
}

fn cli_value_provided(matches: &ArgMatches, id: &str) -> bool {
    let direct = matches
        .value_source(id)
        .is_some_and(|src| matches!(src, ValueSource::CommandLine));
    if direct {
        return true;
    }
    let alt_id = id.replace('_', "-");
    matches
        .value_source(alt_id.as_str())
        .is_some_and(|src| matches!(src, ValueSource::CommandLine))
}

fn apply_config_overrides(args: &mut Args, cfg: &config::Config, matches: &ArgMatches) {
    if args.extensions.is_none() {
        if let Some(extensions) = cfg.extensions.as_ref() {
            args.extensions = Some(extensions.clone());
        }
    }

    let Some((_, sub)) = matches.subcommand() else {
        return;
    };

    match &mut args.tool {
        Tool::Bucket(bucket) => {
            if bucket.buckets.is_none() {
                if let Some(list) = cfg.bucket.buckets.as_ref() {
                    let joined: Vec<String> = list.iter().map(u64::to_string).collect();
                    bucket.buckets = Some(joined.join(","));
                }
            }
            if !cli_value_provided(sub, "unbucketed") {
                if let Some(policy) = cfg.bucket.unbucketed {
                    bucket.unbucketed = policy;
                }
            }
            if !cli_value_provided(sub, "exact_frames") {
                if let Some(exact) = cfg.bucket.exact_frames {
                    bucket.exact_frames = exact;
                }
            }
        }
        Tool::Normalize(normalize) => {
            if !cli_value_provided(sub, "aspect_ratio") {
                if let Some(ratio) = cfg.normalize.aspect_ratio {
                    normalize.aspect_ratio = ratio;
                }
            }
            if !cli_value_provided(sub, "tolerance") {
                if let Some(tolerance) = cfg.normalize.tolerance {
                    normalize.tolerance = tolerance;
                }
            }
            if normalize.width.is_none() && normalize.height.is_none() {
                normalize.width = cfg.normalize.width;
                normalize.height = cfg.normalize.height;
            }
        }
        Tool::Fps(fps) => {
            if !cli_value_provided(sub, "target_fps") {
                if let Some(target) = cfg.fps.target_fps {
                    fps.target_fps = target;
                }
            }
            if !cli_value_provided(sub, "duration_mode") {
                if let Some(mode) = cfg.fps.duration_mode {
                    fps.duration_mode = mode;
                }
            }
        }
        Tool::Analyze(analyze) => {
            if !cli_value_provided(sub, "output") {
                if let Some(output) = cfg.analyze.output {
                    analyze.output = output;
                }
            }
            if !cli_value_provided(sub, "exact_frames") {
                if let Some(exact) = cfg.analyze.exact_frames {
                    analyze.exact_frames = exact;
                }
            }
        }
        Tool::Caption(caption) => {
            if let CaptionSource::Csv(csv) = &mut caption.source {
                if csv.text_column.is_none() {
                    csv.text_column = cfg.caption.text_column.clone();
                }
                if csv.filename_column.is_none() {
                    csv.filename_column = cfg.caption.filename_column.clone();
                }
            }
        }
        Tool::Speed(_) | Tool::Split(_) => {}
    }
}

fn main() -> Result<()> {
    let mut matches = Args::command().get_matches();
    let mut args = Args::from_arg_matches_mut(&mut matches)?;

    logging::init(args.verbose);
    logging::log_relevant_env();

    let loaded_config = config::load(args.config_file.as_deref())?;
    if let Some((_, source)) = &loaded_config {
        match source {
            config::ConfigSource::Env(path) => {
                info!(
                    "Loaded configuration from '{}' (via {}).",
                    path.display(),
                    config::CONFIG_ENV_VAR
                );
            }
            other => info!("Loaded configuration from '{}'.", other.path().display()),
        }
    } else {
        debug!("No configuration file found; using built-in defaults");
    }
    let cfg = loaded_config.map(|(cfg, _)| cfg).unwrap_or_default();
    apply_config_overrides(&mut args, &cfg, &matches);

    let tools = Toolchain {
        probe: Box::new(
            cfg.ffprobe_path
                .clone()
                .map(Ffprobe::new)
                .unwrap_or_default(),
        ),
        ffmpeg: cfg.ffmpeg_path.clone().map(Ffmpeg::new).unwrap_or_default(),
        encode: cfg.encode.clone(),
    };

    commands::run(&args.tool, &tools, args.extensions.as_deref())
}
