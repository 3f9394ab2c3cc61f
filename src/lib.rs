pub mod bucket;
pub mod error;
pub mod geometry;
pub mod media;
pub mod scan;

pub use bucket::{assign_bucket, Assignment, BucketSet, FrameCount, Unbucketed};
pub use error::{PrepError, ProbeError, TranscodeError};
pub use geometry::{
    plan_crop, split_frame, AspectRatioTarget, CropPlan, CropRect, CropWindow, FixedDimension,
    SourceGeometry, Tile, Tolerance,
};
