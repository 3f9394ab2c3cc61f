#![allow(dead_code)]

use assert_cmd::prelude::*;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub fn ensure_ffmpeg_present() {
    for tool in ["ffmpeg", "ffprobe"] {
        let out = Command::new(tool).arg("-version").output();
        match out {
            Ok(o) if o.status.success() => {}
            _ => panic!("{tool} CLI not found. Install ffmpeg and ensure it is on PATH."),
        }
    }
}

/// The binary under test, isolated from any user configuration.
pub fn clip_prep(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("clip_prep").expect("binary clip_prep should be built");
    cmd.env_remove("CLIP_PREP_CONFIG");
    cmd.env_remove("XDG_CONFIG_HOME");
    cmd.env_remove("RUST_LOG");
    cmd.env("HOME", home);
    cmd.current_dir(home);
    cmd
}

pub fn make_dir(tmp: &TempDir, name: &str) -> PathBuf {
    let dir = tmp.path().join(name);
    fs::create_dir_all(&dir).expect("create test folder");
    dir
}

/// Writes a `testsrc` clip of `width`x`height` at `rate` fps lasting `seconds`.
pub fn gen_clip(path: &Path, width: u32, height: u32, rate: u32, seconds: f64) {
    gen_clip_with_audio(path, width, height, rate, seconds, false);
}

pub fn gen_clip_with_audio(
    path: &Path,
    width: u32,
    height: u32,
    rate: u32,
    seconds: f64,
    audio: bool,
) {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-hide_banner", "-loglevel", "error", "-f", "lavfi", "-i"]);
    cmd.arg(format!(
        "testsrc=size={}x{}:rate={}:duration={}",
        width, height, rate, seconds
    ));
    if audio {
        cmd.args(["-f", "lavfi", "-i"]);
        cmd.arg(format!(
            "sine=frequency=1000:sample_rate=48000:duration={}",
            seconds
        ));
        cmd.args(["-c:a", "aac", "-shortest"]);
    }
    cmd.args([
        "-c:v",
        "libx264",
        "-preset",
        "ultrafast",
        "-pix_fmt",
        "yuv420p",
    ]);
    cmd.arg(path);
    let status = cmd.status().expect("run ffmpeg clip generator");
    assert!(status.success(), "ffmpeg clip generation failed for {:?}", path);
}

fn ffprobe_entry(path: &Path, entries: &str) -> Result<String, Box<dyn Error>> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            entries,
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()?;
    if !output.status.success() {
        return Err(format!(
            "ffprobe failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )
        .into());
    }
    Ok(String::from_utf8(output.stdout)?)
}

pub fn ffprobe_dimensions(path: &Path) -> Result<(u32, u32), Box<dyn Error>> {
    let raw = ffprobe_entry(path, "stream=width,height")?;
    let mut lines = raw.lines().map(str::trim).filter(|l| !l.is_empty());
    let width = lines.next().ok_or("missing width")?.parse()?;
    let height = lines.next().ok_or("missing height")?.parse()?;
    Ok((width, height))
}

pub fn ffprobe_frame_rate(path: &Path) -> Result<f64, Box<dyn Error>> {
    let raw = ffprobe_entry(path, "stream=avg_frame_rate")?;
    parse_fraction(raw.trim())
}

pub fn ffprobe_duration(path: &Path) -> Result<f64, Box<dyn Error>> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()?;
    if !output.status.success() {
        return Err(format!(
            "ffprobe failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )
        .into());
    }
    let duration = String::from_utf8(output.stdout)?.trim().parse::<f64>()?;
    Ok(duration)
}

fn parse_fraction(value: &str) -> Result<f64, Box<dyn Error>> {
    if let Some((num, den)) = value.split_once('/') {
        let num = num.trim().parse::<f64>()?;
        let den = den.trim().parse::<f64>()?;
        if den == 0.0 {
            Err("fraction denominator cannot be zero".into())
        } else {
            Ok(num / den)
        }
    } else {
        Ok(value.trim().parse::<f64>()?)
    }
}
