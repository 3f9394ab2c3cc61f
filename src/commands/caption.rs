use super::{display_name, prepare_output_dir, require_dir, BatchSummary};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use clip_prep::scan::{self, has_extension, VIDEO_EXTENSIONS};
use clip_prep::PrepError;
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXTENSIONS: &[&str] = &["mp4"];
const CAPTION_EXTENSION: &str = "txt";
const RESERVED_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Args, Clone, Debug)]
pub struct CaptionArgs {
    #[command(subcommand)]
    pub source: CaptionSource,
}

#[derive(Subcommand, Clone, Debug, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CaptionSource {
    /// Write the same trigger word next to every clip as `<stem>.txt`
    Trigger(TriggerArgs),
    /// Write one caption file per CSV row
    Csv(CsvArgs),
}

#[derive(Args, Clone, Debug)]
pub struct TriggerArgs {
    /// Folder containing the clips
    pub folder: PathBuf,

    /// Text written to every caption file
    pub trigger_word: String,
}

#[derive(Args, Clone, Debug)]
pub struct CsvArgs {
    /// CSV file with a header row
    pub csv_file: PathBuf,

    /// Folder the caption files are written to
    #[arg(short, long)]
    pub output: PathBuf,

    /// Column holding the caption text
    #[arg(long, id = "text_column")]
    pub text_column: Option<String>,

    /// Column holding the clip file name the caption belongs to
    #[arg(long, id = "filename_column")]
    pub filename_column: Option<String>,
}

pub fn run(args: &CaptionArgs, extensions: &[String]) -> Result<BatchSummary> {
    match &args.source {
        CaptionSource::Trigger(trigger) => write_trigger_captions(trigger, extensions),
        CaptionSource::Csv(csv) => write_csv_captions(csv),
    }
}

/// Writes `trigger_word` to `<stem>.txt` beside every clip in the folder,
/// replacing any caption already there.
pub fn write_trigger_captions(args: &TriggerArgs, extensions: &[String]) -> Result<BatchSummary> {
    require_dir(&args.folder, "Input")?;
    if args.trigger_word.trim().is_empty() {
        return Err(PrepError::config("trigger word must not be empty").into());
    }

    let clips = scan::find_videos(&args.folder, extensions, false);
    let mut summary = BatchSummary {
        total: clips.len(),
        ..Default::default()
    };
    if clips.is_empty() {
        info!("No video files found in '{}'", args.folder.display());
        return Ok(summary);
    }
    info!("Found {} video files", clips.len());

    for clip in &clips {
        let caption = clip.with_extension(CAPTION_EXTENSION);
        match fs::write(&caption, &args.trigger_word) {
            Ok(()) => {
                info!("Created: {}", display_name(&caption));
                summary.succeeded += 1;
            }
            Err(err) => {
                error!("  ✗ Error writing {}: {}", caption.display(), err);
                summary.failed += 1;
            }
        }
    }

    info!("Done! {} txt files created", summary.succeeded);
    Ok(summary)
}

pub fn write_csv_captions(args: &CsvArgs) -> Result<BatchSummary> {
    let text_column = args.text_column.as_deref().ok_or_else(|| {
        anyhow!("No text column given; pass --text-column or set [caption] text_column in the config file")
    })?;
    let filename_column = args.filename_column.as_deref().ok_or_else(|| {
        anyhow!("No file name column given; pass --filename-column or set [caption] filename_column in the config file")
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&args.csv_file)
        .with_context(|| format!("Failed to open CSV file '{}'", args.csv_file.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read the header of '{}'", args.csv_file.display()))?
        .clone();
    let text_idx = column_index(&headers, text_column)?;
    let name_idx = column_index(&headers, filename_column)?;

    prepare_output_dir(&args.output)?;

    let mut summary = BatchSummary::default();
    for (idx, record) in reader.records().enumerate() {
        let row = idx + 1;
        summary.total += 1;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                error!("  ✗ Skipping row {}: {}", row, err);
                summary.failed += 1;
                continue;
            }
        };

        let text = record.get(text_idx).unwrap_or_default();
        let name = caption_file_name(record.get(name_idx).unwrap_or_default(), row);
        let path = unique_path(&args.output.join(name));
        match fs::write(&path, text) {
            Ok(()) => {
                info!("Created: {}", path.display());
                summary.succeeded += 1;
            }
            Err(err) => {
                error!("  ✗ Error writing {}: {}", path.display(), err);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Completed! Created {} text files in '{}'",
        summary.succeeded,
        args.output.display()
    );
    Ok(summary)
}

fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize> {
    match headers.iter().position(|header| header == column) {
        Some(idx) => Ok(idx),
        None => bail!(
            "Column '{}' not found in CSV file. Available columns: {}",
            column,
            headers.iter().collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Caption file name for a CSV row: reserved characters become `_`, a video
/// extension is swapped for `.txt`, and blank names fall back to `row_<N>`.
pub fn caption_file_name(raw: &str, row: usize) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if RESERVED_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return format!("row_{}.{}", row, CAPTION_EXTENSION);
    }

    let path = Path::new(cleaned);
    if has_extension(path, VIDEO_EXTENSIONS) {
        return path
            .with_extension(CAPTION_EXTENSION)
            .to_string_lossy()
            .into_owned();
    }
    if has_extension(path, &[CAPTION_EXTENSION]) {
        return cleaned.to_string();
    }
    format!("{}.{}", cleaned, CAPTION_EXTENSION)
}

/// `path`, or `<stem>_<N>.<ext>` with the first free `N` when it is taken.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut counter = 1;
    loop {
        let candidate = path.with_file_name(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            warn!(
                "{} already exists; writing {} instead",
                display_name(path),
                display_name(&candidate)
            );
            return candidate;
        }
        counter += 1;
    }
}
