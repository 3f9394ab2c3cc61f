use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Container extensions handled by the converting tools.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "m4v", "wmv", "flv", "webm"];

/// Everything `analyze` will try to probe.
pub const ANALYZE_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "3gp", "mpg", "mpeg", "m2v", "ts",
    "m2ts", "mts", "vob", "ogv", "ogg", "rm", "rmvb", "divx", "f4v", "3g2", "asf", "mxf", "dv",
    "nut", "nsv", "roq", "svi", "amv", "mtv", "yuv", "h264", "h265", "hevc",
];

/// Collects video files below `root`, sorted by path.
///
/// Extensions match case-insensitively. Hidden files and directories are
/// skipped. Without `recursive` only the direct children of `root` are
/// considered.
pub fn find_videos<S: AsRef<str>>(root: &Path, extensions: &[S], recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut found = Vec::new();

    let walker = WalkDir::new(root).min_depth(1).max_depth(max_depth);
    for entry in walker.into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry under '{}': {}", root.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if has_extension(entry.path(), extensions) {
            found.push(entry.into_path());
        } else {
            debug!("Ignoring non-video file '{}'", entry.path().display());
        }
    }

    found.sort();
    found
}

pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.as_ref().trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// File name `<stem><suffix>.<ext>` for an output derived from `input`.
pub fn derived_file_name(input: &Path, suffix: &str) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    }
}
