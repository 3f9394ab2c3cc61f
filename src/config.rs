use crate::commands::analyze::OutputFormat;
use crate::commands::bucket::UnbucketedPolicy;
use crate::commands::fps::DurationMode;
use anyhow::{Context, Result};
use clip_prep::media::EncodeSettings;
use log::warn;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "CLIP_PREP_CONFIG";
const APP_DIR: &str = "clip-prep";
const CONFIG_FILE_NAME: &str = "config.toml";
const FLAT_CONFIG_NAME: &str = "clip-prep.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli(PathBuf),
    Env(PathBuf),
    Default(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Cli(path) | ConfigSource::Env(path) | ConfigSource::Default(path) => {
                path
            }
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub extensions: Option<Vec<String>>,
    pub bucket: BucketSettings,
    pub normalize: NormalizeSettings,
    pub fps: FpsSettings,
    pub analyze: AnalyzeSettings,
    pub caption: CaptionSettings,
    pub encode: EncodeOverrides,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BucketSettings {
    pub buckets: Option<Vec<u64>>,
    pub unbucketed: Option<UnbucketedPolicy>,
    pub exact_frames: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeSettings {
    pub aspect_ratio: Option<f64>,
    pub tolerance: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FpsSettings {
    pub target_fps: Option<f64>,
    pub duration_mode: Option<DurationMode>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzeSettings {
    pub output: Option<OutputFormat>,
    pub exact_frames: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionSettings {
    pub text_column: Option<String>,
    pub filename_column: Option<String>,
}

/// Encoder settings that replace the per-tool defaults when present.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeOverrides {
    pub video_codec: Option<String>,
    pub crf: Option<u8>,
    pub preset: Option<String>,
}

impl EncodeOverrides {
    pub fn apply(&self, mut base: EncodeSettings) -> EncodeSettings {
        if let Some(codec) = self.video_codec.as_ref() {
            base.video_codec = codec.clone();
        }
        if let Some(crf) = self.crf {
            base.crf = crf;
        }
        if let Some(preset) = self.preset.as_ref() {
            base.preset = preset.clone();
        }
        base
    }
}

/// Loads the configuration file, if one can be found.
///
/// An explicit path must exist. Otherwise `$CLIP_PREP_CONFIG` is tried, then
/// the usual per-user and system locations.
pub fn load(path_override: Option<&Path>) -> Result<Option<(Config, ConfigSource)>> {
    if let Some(path) = path_override {
        let config = read_config(path)?;
        return Ok(Some((config, ConfigSource::Cli(path.to_path_buf()))));
    }

    if let Some(env_path) = env::var_os(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            let config = read_config(&path)?;
            return Ok(Some((config, ConfigSource::Env(path))));
        }
        warn!(
            "{} points to '{}', which does not exist; ignoring it",
            CONFIG_ENV_VAR,
            path.display()
        );
    }

    for candidate in default_config_candidates() {
        if candidate.is_file() {
            let config = read_config(&candidate)?;
            return Ok(Some((config, ConfigSource::Default(candidate))));
        }
    }

    Ok(None)
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file at {}", path.display()))?;
    parse_config(&contents, path)
}

pub fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    toml::from_str(contents)
        .with_context(|| format!("Invalid configuration file {}", path.display()))
}

fn default_config_candidates() -> Vec<PathBuf> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();

    let mut push_unique = |path: PathBuf, out: &mut Vec<PathBuf>| {
        if !path.as_os_str().is_empty() && seen.insert(path.clone()) {
            out.push(path);
        }
    };

    if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME").filter(|val| !val.is_empty()) {
        let mut path = PathBuf::from(xdg_config);
        path.push(APP_DIR);
        path.push(CONFIG_FILE_NAME);
        push_unique(path, &mut out);
    }

    if let Some(home) = env::var_os("HOME").filter(|val| !val.is_empty()) {
        let home = PathBuf::from(home);
        let mut path = home.join(".config");
        path.push(APP_DIR);
        path.push(CONFIG_FILE_NAME);
        push_unique(path, &mut out);

        push_unique(home.join(FLAT_CONFIG_NAME), &mut out);
    }

    if let Ok(current_dir) = env::current_dir() {
        push_unique(current_dir.join(FLAT_CONFIG_NAME), &mut out);
    }

    push_unique(
        PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILE_NAME),
        &mut out,
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let contents = r#"
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            extensions = ["mp4", "mov"]

            [bucket]
            buckets = [30, 60, 120, 300]
            unbucketed = "collect"

            [normalize]
            aspect_ratio = 1.0
            width = 1024

            [fps]
            target_fps = 24
            duration_mode = "change"

            [encode]
            crf = 20
        "#;
        let cfg = parse_config(contents, Path::new("test.toml")).unwrap();
        assert_eq!(cfg.ffmpeg_path, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));
        assert_eq!(cfg.bucket.buckets, Some(vec![30, 60, 120, 300]));
        assert_eq!(cfg.bucket.unbucketed, Some(UnbucketedPolicy::Collect));
        assert_eq!(cfg.normalize.width, Some(1024));
        assert_eq!(cfg.fps.target_fps, Some(24.0));
        assert_eq!(cfg.fps.duration_mode, Some(DurationMode::Change));
        assert_eq!(cfg.encode.crf, Some(20));
        assert!(cfg.analyze.output.is_none());
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let cfg = parse_config("", Path::new("empty.toml")).unwrap();
        assert!(cfg.bucket.buckets.is_none());
        assert!(cfg.extensions.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_config("bukets = [1]\n", Path::new("typo.toml")).unwrap_err();
        assert!(err.to_string().contains("typo.toml"));
    }

    #[test]
    fn encode_overrides_replace_only_given_fields() {
        let overrides = EncodeOverrides {
            crf: Some(28),
            ..Default::default()
        };
        let applied = overrides.apply(EncodeSettings::high_quality());
        assert_eq!(applied.crf, 28);
        assert_eq!(applied.preset, "slow");
        assert_eq!(applied.video_codec, "libx264");
    }

    #[test]
    fn explicit_path_must_exist() {
        assert!(load(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }

    #[test]
    fn candidates_are_unique() {
        let candidates = default_config_candidates();
        let unique: BTreeSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
    }
}
