use super::{
    display_name, ensure_distinct, ensure_positive, parse_positive_f64, prepare_output_dir,
    process_file, require_dir, BatchSummary, Toolchain,
};
use anyhow::{Context, Result};
use clap::Args;
use clip_prep::media::ffmpeg::speed_args;
use clip_prep::media::{EncodeSettings, MediaProbe};
use clip_prep::scan::{self, derived_file_name};
use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Args, Clone, Debug)]
pub struct SpeedArgs {
    /// Input folder containing videos
    pub input_folder: PathBuf,

    /// Output folder for the retimed videos
    pub output_folder: PathBuf,

    /// Playback speed multiplier (2 plays twice as fast, 0.5 at half speed)
    #[arg(short, long, value_parser = parse_positive_f64)]
    pub factor: f64,

    /// Drop the audio track instead of time-stretching it
    #[arg(long, default_value_t = false)]
    pub no_audio: bool,
}

/// `<stem>_x<factor><ext>`, e.g. `clip_x2.mp4` or `clip_x0.5.mp4`.
pub fn output_file_name(clip: &Path, factor: f64) -> String {
    derived_file_name(clip, &format!("_x{}", factor))
}

/// ffmpeg arguments for one clip. Audio is only time-stretched when the clip
/// has an audio stream to stretch.
pub fn speed_job(
    clip: &Path,
    output: &Path,
    args: &SpeedArgs,
    probe: &dyn MediaProbe,
    encode: &EncodeSettings,
) -> Result<Vec<OsString>> {
    let keep_audio = !args.no_audio
        && probe
            .has_audio(clip)
            .with_context(|| format!("Could not read the streams of {}", display_name(clip)))?;
    if !args.no_audio && !keep_audio {
        debug!("{} has no audio stream", display_name(clip));
    }
    Ok(speed_args(clip, output, args.factor, keep_audio, encode))
}

pub fn run(args: &SpeedArgs, tools: &Toolchain, extensions: &[String]) -> Result<BatchSummary> {
    ensure_positive("speed factor", args.factor)?;
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
        "Changing speed of {} videos by x{}{}",
        clips.len(),
        args.factor,
        if args.no_audio { " (audio dropped)" } else { "" }
    );
    let encode = tools.encode_settings(EncodeSettings::balanced());

    for (idx, clip) in clips.iter().enumerate() {
        let output = args
            .output_folder
            .join(output_file_name(clip, args.factor));
        info!("Processing {}/{}: {}", idx + 1, clips.len(), display_name(clip));
        process_file(&mut summary, clip, || {
            let job = speed_job(clip, &output, args, tools.probe.as_ref(), &encode)?;
            tools
                .ffmpeg
                .run(&job)
                .with_context(|| format!("Failed to retime {}", display_name(clip)))?;
            info!("  ✓ Saved: {}", display_name(&output));
            Ok(())
        })?;
    }

    info!(
        "Processed {}/{} videos successfully",
        summary.succeeded, summary.total
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::FakeProbe;

    fn args(no_audio: bool) -> SpeedArgs {
        SpeedArgs {
            input_folder: PathBuf::from("in"),
            output_folder: PathBuf::from("out"),
            factor: 2.0,
            no_audio,
        }
    }

    fn job(clip: &str, no_audio: bool, probe: &FakeProbe) -> Result<Vec<String>> {
        let argv = speed_job(
            Path::new(clip),
            Path::new("out/x.mp4"),
            &args(no_audio),
            probe,
            &EncodeSettings::balanced(),
        )?;
        Ok(argv
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect())
    }

    #[test]
    fn audio_filter_only_for_clips_with_audio() {
        let probe = FakeProbe::default()
            .with("talk.mp4", 640, 360, Some(60))
            .with_audio("talk.mp4")
            .with("mute.mp4", 640, 360, Some(60));

        let talk = job("in/talk.mp4", false, &probe).unwrap();
        assert!(talk.windows(2).any(|w| w == ["-filter:a", "atempo=2"]));

        let mute = job("in/mute.mp4", false, &probe).unwrap();
        assert!(!mute.contains(&"-filter:a".to_string()));
        assert!(mute.contains(&"-an".to_string()));

        let dropped = job("in/talk.mp4", true, &probe).unwrap();
        assert!(!dropped.contains(&"-filter:a".to_string()));
    }

    #[test]
    fn unreadable_clip_fails_before_ffmpeg_runs() {
        assert!(job("in/missing.mp4", false, &FakeProbe::default()).is_err());
    }

    #[test]
    fn output_names_carry_the_factor() {
        assert_eq!(output_file_name(Path::new("a.mp4"), 2.0), "a_x2.mp4");
        assert_eq!(output_file_name(Path::new("dir/b.mov"), 0.5), "b_x0.5.mov");
        assert_eq!(output_file_name(Path::new("c.mkv"), 1.25), "c_x1.25.mkv");
    }
}
