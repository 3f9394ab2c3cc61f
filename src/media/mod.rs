//! External media collaborators: metadata probing and transcoding.

pub mod ffmpeg;
pub mod ffprobe;

use crate::bucket::FrameCount;
use crate::error::ProbeError;
use log::warn;
use serde::Serialize;
use std::path::Path;

pub use ffmpeg::{EncodeSettings, Ffmpeg};
pub use ffprobe::Ffprobe;

/// How frame counts are obtained.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum FrameCountMethod {
    /// Container metadata, falling back to duration x frame rate.
    #[default]
    Metadata,
    /// Decode every frame. Exact but slow.
    Decode,
}

/// Properties of the first video stream of a file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    #[serde(serialize_with = "serialize_frame_count")]
    pub frame_count: FrameCount,
    /// Average frame rate, as reported.
    pub fps: Option<f64>,
    /// Base frame rate of the stream (`r_frame_rate`), used for retiming.
    #[serde(skip)]
    pub nominal_fps: Option<f64>,
    pub duration_secs: Option<f64>,
    #[serde(skip)]
    pub has_audio: bool,
}

impl StreamInfo {
    /// Aspect ratio rounded to two decimals, as shown in reports.
    pub fn display_aspect_ratio(&self) -> Option<f64> {
        if self.height == 0 {
            return None;
        }
        Some((self.width as f64 / self.height as f64 * 100.0).round() / 100.0)
    }
}

fn serialize_frame_count<S: serde::Serializer>(
    value: &FrameCount,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value.known() {
        Some(n) => serializer.serialize_some(&n),
        None => serializer.serialize_none(),
    }
}

/// Reads clip metadata. Implemented by [`Ffprobe`]; tests substitute fakes.
pub trait MediaProbe {
    fn stream_info(&self, path: &Path, method: FrameCountMethod)
        -> Result<StreamInfo, ProbeError>;

    /// Frame count of `path`; read failures become [`FrameCount::Unknown`].
    fn count_frames(&self, path: &Path, method: FrameCountMethod) -> FrameCount {
        match self.stream_info(path, method) {
            Ok(info) => info.frame_count,
            Err(err) => {
                warn!("Could not read frame count of '{}': {}", path.display(), err);
                FrameCount::Unknown
            }
        }
    }

    fn probe_dimensions(&self, path: &Path) -> Result<(u32, u32), ProbeError> {
        self.stream_info(path, FrameCountMethod::Metadata)
            .map(|info| (info.width, info.height))
    }

    /// Base frame rate of `path`, falling back to the average rate.
    fn frame_rate(&self, path: &Path) -> Option<f64> {
        self.stream_info(path, FrameCountMethod::Metadata)
            .ok()
            .and_then(|info| info.nominal_fps.or(info.fps))
    }

    fn has_audio(&self, path: &Path) -> Result<bool, ProbeError> {
        self.stream_info(path, FrameCountMethod::Metadata)
            .map(|info| info.has_audio)
    }
}
