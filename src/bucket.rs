//! Frame-count bucketing.
//!
//! A clip lands in the bucket whose threshold is the largest one that is
//! still less than or equal to its frame count.

use crate::error::{PrepError, Result};
use std::fmt;

/// Frame count of one clip as reported by the prober.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameCount {
    Known(u64),
    /// The prober could not read a frame count for this clip.
    Unknown,
}

impl FrameCount {
    pub fn known(self) -> Option<u64> {
        match self {
            FrameCount::Known(n) => Some(n),
            FrameCount::Unknown => None,
        }
    }
}

impl From<Option<u64>> for FrameCount {
    fn from(value: Option<u64>) -> Self {
        value.map_or(FrameCount::Unknown, FrameCount::Known)
    }
}

impl fmt::Display for FrameCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameCount::Known(n) => write!(f, "{}", n),
            FrameCount::Unknown => f.write_str("N/A"),
        }
    }
}

/// Why a clip did not get a bucket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Unbucketed {
    UnknownFrameCount,
    BelowMinimum,
}

/// Outcome of [`assign_bucket`].
///
/// Ordering puts every unbucketed outcome below every bucket, which keeps
/// assignments monotonic in the frame count.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Assignment {
    Unbucketed(Unbucketed),
    Bucket(u64),
}

impl Assignment {
    pub fn bucket(self) -> Option<u64> {
        match self {
            Assignment::Bucket(value) => Some(value),
            Assignment::Unbucketed(_) => None,
        }
    }
}

/// Strictly increasing, positive frame-count thresholds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BucketSet {
    thresholds: Vec<u64>,
}

impl BucketSet {
    /// Builds a set from thresholds in any order.
    ///
    /// Zero and repeated thresholds are rejected.
    pub fn new(mut thresholds: Vec<u64>) -> Result<Self> {
        if thresholds.contains(&0) {
            return Err(PrepError::config("bucket thresholds must be positive"));
        }
        thresholds.sort_unstable();
        if let Some(pair) = thresholds.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(PrepError::config(format!(
                "duplicate bucket threshold {}",
                pair[0]
            )));
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &[u64] {
        &self.thresholds
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }
}

impl fmt::Display for BucketSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .thresholds
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{}]", joined)
    }
}

/// Parses a comma separated threshold list such as `"30, 60,120,300"`.
pub fn parse_bucket_list(input: &str) -> Result<Vec<u64>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PrepError::config("bucket list cannot be empty"));
    }

    trimmed
        .split(',')
        .map(str::trim)
        .map(|entry| {
            entry.parse::<u64>().map_err(|_| {
                PrepError::config(format!(
                    "buckets must be comma-separated integers, got '{}'",
                    entry
                ))
            })
        })
        .collect()
}

/// Picks the bucket for a clip. Never fails.
pub fn assign_bucket(frame_count: FrameCount, buckets: &BucketSet) -> Assignment {
    let frames = match frame_count {
        FrameCount::Known(n) => n,
        FrameCount::Unknown => return Assignment::Unbucketed(Unbucketed::UnknownFrameCount),
    };

    let fitting = buckets.thresholds.partition_point(|&threshold| threshold <= frames);
    match fitting.checked_sub(1) {
        Some(idx) => Assignment::Bucket(buckets.thresholds[idx]),
        None => Assignment::Unbucketed(Unbucketed::BelowMinimum),
    }
}

/// Folder name used for a bucket inside the output directory.
pub fn bucket_dir_name(bucket: u64) -> String {
    format!("bucket_{}_frames", bucket)
}
