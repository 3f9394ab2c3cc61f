//! Frame rate conversion in both duration modes.

#[path = "common/mod.rs"]
mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn preserve_mode_keeps_duration() -> Result<(), Box<dyn std::error::Error>> {
    common::ensure_ffmpeg_present();

    let tmp = TempDir::new()?;
    let input = common::make_dir(&tmp, "in");
    let output = tmp.path().join("out");
    common::gen_clip(&input.join("clip.mp4"), 96, 64, 25, 2.0);

    common::clip_prep(tmp.path())
        .arg("fps")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["-f", "10"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("1 videos successfully converted"));

    let converted = output.join("clip_fps10.mp4");
    let rate = common::ffprobe_frame_rate(&converted)?;
    assert!((rate - 10.0).abs() < 0.01, "frame rate was {}", rate);
    let duration = common::ffprobe_duration(&converted)?;
    assert!((duration - 2.0).abs() < 0.3, "duration was {}", duration);
    Ok(())
}

#[test]
fn change_mode_keeps_every_frame() -> Result<(), Box<dyn std::error::Error>> {
    common::ensure_ffmpeg_present();

    let tmp = TempDir::new()?;
    let input = common::make_dir(&tmp, "in");
    let output = tmp.path().join("out");
    common::gen_clip(&input.join("clip.mp4"), 96, 64, 25, 2.0);

    common::clip_prep(tmp.path())
        .arg("fps")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--fps", "12.5", "-d", "change"])
        .assert()
        .success();

    // 50 frames played at 12.5 fps last about 4 seconds.
    let duration = common::ffprobe_duration(&output.join("clip_fps12.mp4"))?;
    assert!(duration > 3.5, "duration was {}", duration);
    Ok(())
}
