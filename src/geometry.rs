//! Crop geometry for aspect-ratio normalization and frame splitting.
//!
//! Everything here is pure arithmetic over frame dimensions; turning a plan
//! into an ffmpeg filter is left to [`crate::media::ffmpeg`].

use crate::error::{PrepError, Result};
use std::fmt;

pub const DEFAULT_ASPECT_RATIO: f64 = 1.78;
pub const DEFAULT_TOLERANCE: f64 = 0.01;
/// Largest even value a frame side can take.
pub const MAX_DIMENSION: u32 = u32::MAX - 1;

/// Largest accepted distance between an achieved and a target aspect ratio.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tolerance(f64);

impl Tolerance {
    pub fn new(value: f64) -> Result<Self> {
        if !(value.is_finite() && value > 0.0) {
            return Err(PrepError::config(format!(
                "aspect ratio tolerance must be a positive number, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn accepts(self, achieved: f64, target: f64) -> bool {
        (achieved - target).abs() <= self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self(DEFAULT_TOLERANCE)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FixedDimension {
    Width(u32),
    Height(u32),
}

/// Target aspect ratio plus an optional fixed output width or height.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AspectRatioTarget {
    ratio: f64,
    fixed: Option<FixedDimension>,
}

impl AspectRatioTarget {
    pub fn new(ratio: f64, width: Option<u32>, height: Option<u32>) -> Result<Self> {
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(PrepError::config(format!(
                "target aspect ratio must be a positive number, got {}",
                ratio
            )));
        }

        let fixed = match (width, height) {
            (Some(_), Some(_)) => {
                return Err(PrepError::config(
                    "specify either a fixed output width or height, not both",
                ))
            }
            (Some(0), None) | (None, Some(0)) => {
                return Err(PrepError::config("fixed output dimension must be positive"))
            }
            (Some(w), None) => Some(FixedDimension::Width(w)),
            (None, Some(h)) => Some(FixedDimension::Height(h)),
            (None, None) => None,
        };

        Ok(Self { ratio, fixed })
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn fixed(&self) -> Option<FixedDimension> {
        self.fixed
    }

    /// Output size implied by the fixed dimension, if there is one.
    ///
    /// The fixed side is rounded down to an even value; the dependent side is
    /// rounded to the nearest even value that stays within `tolerance`.
    pub fn fixed_output(&self, tolerance: Tolerance) -> Result<Option<(u32, u32)>> {
        let ratio = self.ratio;
        match self.fixed {
            None => Ok(None),
            Some(FixedDimension::Width(width)) => {
                let width = even_fixed(width, "width")?;
                let exact = width as f64 / ratio;
                ensure_representable(exact, "height", width, ratio)?;
                let height = fit_dependent(exact, None, |h| width as f64 / h as f64, ratio, tolerance)
                    .ok_or_else(|| {
                        PrepError::config(format!(
                            "fixed width {} cannot reach aspect ratio {:.3} within {}",
                            width,
                            ratio,
                            tolerance.value()
                        ))
                    })?;
                Ok(Some((width, height)))
            }
            Some(FixedDimension::Height(height)) => {
                let height = even_fixed(height, "height")?;
                let exact = height as f64 * ratio;
                ensure_representable(exact, "width", height, ratio)?;
                let width = fit_dependent(exact, None, |w| w as f64 / height as f64, ratio, tolerance)
                    .ok_or_else(|| {
                        PrepError::config(format!(
                            "fixed height {} cannot reach aspect ratio {:.3} within {}",
                            height,
                            ratio,
                            tolerance.value()
                        ))
                    })?;
                Ok(Some((width, height)))
            }
        }
    }
}

fn even_fixed(value: u32, side: &str) -> Result<u32> {
    match even_floor(value) {
        0 => Err(PrepError::config(format!(
            "fixed output {} must be at least 2, got {}",
            side, value
        ))),
        even => Ok(even),
    }
}

fn ensure_representable(exact: f64, side: &str, fixed: u32, ratio: f64) -> Result<()> {
    if exact.is_finite() && exact <= MAX_DIMENSION as f64 {
        return Ok(());
    }
    Err(PrepError::config(format!(
        "aspect ratio {} with a fixed side of {} needs an output {} beyond {} pixels",
        ratio, fixed, side, MAX_DIMENSION
    )))
}

/// Width and height of one source clip.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SourceGeometry {
    pub width: u32,
    pub height: u32,
}

impl SourceGeometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    fn ensure_positive(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PrepError::input(format!(
                "source dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SourceGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Region of the source frame that is kept, anchored at its top-left corner.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl CropRect {
    pub fn fits_within(&self, source: SourceGeometry) -> bool {
        self.width > 0
            && self.height > 0
            && u64::from(self.x) + u64::from(self.width) <= u64::from(source.width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(source.height)
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CropWindow {
    pub crop: CropRect,
    pub output_width: u32,
    pub output_height: u32,
}

impl CropWindow {
    pub fn needs_scale(&self) -> bool {
        self.output_width != self.crop.width || self.output_height != self.crop.height
    }

    pub fn output_ratio(&self) -> f64 {
        self.output_width as f64 / self.output_height as f64
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CropPlan {
    /// Source already matches the target; copy it untouched.
    PassThrough,
    Crop(CropWindow),
}

impl CropPlan {
    pub fn output_dimensions(&self, source: SourceGeometry) -> (u32, u32) {
        match self {
            CropPlan::PassThrough => (source.width, source.height),
            CropPlan::Crop(window) => (window.output_width, window.output_height),
        }
    }
}

/// Decides how to bring `source` to the target aspect ratio by cropping.
///
/// Cropping is always centered and never pads. Crop and output dimensions are
/// always even; a source whose even-sized crops all miss `tolerance` is
/// rejected as [`PrepError::InvalidInput`].
pub fn plan_crop(
    source: SourceGeometry,
    target: &AspectRatioTarget,
    tolerance: Tolerance,
) -> Result<CropPlan> {
    source.ensure_positive()?;

    let ratio = target.ratio();
    if tolerance.accepts(source.ratio(), ratio) {
        return Ok(CropPlan::PassThrough);
    }

    // Encoders want even sizes, so an odd kept side loses its last pixel.
    let (width, height) = (source.width, source.height);
    let (kept_width, kept_height) = (even_floor(width), even_floor(height));
    let too_small = || {
        PrepError::input(format!(
            "{} is too small to crop to aspect ratio {:.3} within {}",
            source,
            ratio,
            tolerance.value()
        ))
    };
    if kept_width == 0 || kept_height == 0 {
        return Err(too_small());
    }

    let crop = if source.ratio() > ratio {
        let crop_width = fit_dependent(
            kept_height as f64 * ratio,
            Some(kept_width),
            |w| w as f64 / kept_height as f64,
            ratio,
            tolerance,
        )
        .ok_or_else(too_small)?;
        CropRect {
            width: crop_width,
            height: kept_height,
            x: (width - crop_width) / 2,
            y: (height - kept_height) / 2,
        }
    } else {
        let crop_height = fit_dependent(
            kept_width as f64 / ratio,
            Some(kept_height),
            |h| kept_width as f64 / h as f64,
            ratio,
            tolerance,
        )
        .ok_or_else(too_small)?;
        CropRect {
            width: kept_width,
            height: crop_height,
            x: (width - kept_width) / 2,
            y: (height - crop_height) / 2,
        }
    };

    let (output_width, output_height) = target
        .fixed_output(tolerance)?
        .unwrap_or((crop.width, crop.height));

    let window = CropWindow {
        crop,
        output_width,
        output_height,
    };

    debug_assert!(window.crop.fits_within(source), "crop {} escapes {}", crop, source);
    debug_assert!(
        output_width % 2 == 0 && output_height % 2 == 0,
        "odd output {}x{}",
        output_width,
        output_height
    );
    debug_assert!(
        tolerance.accepts(window.output_ratio(), ratio),
        "output {}x{} misses ratio {}",
        output_width,
        output_height,
        ratio
    );

    Ok(CropPlan::Crop(window))
}

/// One cell of a frame split into a grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub row: u32,
    pub column: u32,
    pub rect: CropRect,
}

/// Splits a frame into `columns` x `rows` equal, even-sized tiles.
///
/// Pixels that do not divide evenly are trimmed from the borders, split
/// between opposite edges so the grid stays centered. Tiles are returned in
/// row-major order.
pub fn split_frame(source: SourceGeometry, columns: u32, rows: u32) -> Result<Vec<Tile>> {
    if columns == 0 || rows == 0 {
        return Err(PrepError::config(format!(
            "tile grid must have at least one column and row, got {}x{}",
            columns, rows
        )));
    }
    source.ensure_positive()?;

    let tile_width = even_floor(source.width / columns);
    let tile_height = even_floor(source.height / rows);
    if tile_width < 2 || tile_height < 2 {
        return Err(PrepError::input(format!(
            "{} is too small to split into {}x{} tiles",
            source, columns, rows
        )));
    }

    let origin_x = (source.width - tile_width * columns) / 2;
    let origin_y = (source.height - tile_height * rows) / 2;

    let tiles = (0..rows)
        .flat_map(|row| {
            (0..columns).map(move |column| Tile {
                row,
                column,
                rect: CropRect {
                    width: tile_width,
                    height: tile_height,
                    x: origin_x + column * tile_width,
                    y: origin_y + row * tile_height,
                },
            })
        })
        .collect();

    Ok(tiles)
}

/// Nearest even integer, halves rounding away from zero.
pub fn round_to_even(value: f64) -> u32 {
    ((value / 2.0).round() * 2.0) as u32
}

fn even_floor(value: u32) -> u32 {
    value & !1
}

// Picks an even size for the side that follows from the ratio: the nearest
// even value first, then the other even neighbour.
fn fit_dependent(
    exact: f64,
    limit: Option<u32>,
    achieved: impl Fn(u32) -> f64,
    ratio: f64,
    tolerance: Tolerance,
) -> Option<u32> {
    if !(exact.is_finite() && exact >= 0.0 && exact <= MAX_DIMENSION as f64) {
        return None;
    }
    let nearest_even = round_to_even(exact);
    let lower_even = ((exact / 2.0).floor() * 2.0) as u32;
    let other_even = if nearest_even == lower_even {
        lower_even.checked_add(2)
    } else {
        Some(lower_even)
    };

    [Some(nearest_even), other_even]
        .into_iter()
        .flatten()
        .filter(|&candidate| candidate > 0 && limit.map_or(true, |max| candidate <= max))
        .find(|&candidate| tolerance.accepts(achieved(candidate), ratio))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(ratio: f64) -> AspectRatioTarget {
        AspectRatioTarget::new(ratio, None, None).unwrap()
    }

    fn crop_window(plan: CropPlan) -> CropWindow {
        match plan {
            CropPlan::Crop(window) => window,
            CropPlan::PassThrough => panic!("expected a crop, got pass-through"),
        }
    }

    #[test]
    fn matching_source_passes_through() {
        let plan = plan_crop(
            SourceGeometry::new(1920, 1080),
            &target(1.78),
            Tolerance::default(),
        )
        .unwrap();
        assert_eq!(plan, CropPlan::PassThrough);
        assert_eq!(
            plan.output_dimensions(SourceGeometry::new(1920, 1080)),
            (1920, 1080)
        );
    }

    #[test]
    fn portrait_source_crops_height_around_center() {
        let source = SourceGeometry::new(1080, 1920);
        let window = crop_window(plan_crop(source, &target(1.78), Tolerance::default()).unwrap());

        assert_eq!(window.crop.width, 1080);
        assert_eq!(window.crop.height, 606);
        assert_eq!(window.crop.x, 0);
        assert_eq!(window.crop.y, (1920 - 606) / 2);
        assert_eq!((window.output_width, window.output_height), (1080, 606));
        assert!(!window.needs_scale());
    }

    #[test]
    fn wide_source_crops_width_around_center() {
        // 2.39:1 scope footage down to 16:9
        let source = SourceGeometry::new(2048, 858);
        let window = crop_window(plan_crop(source, &target(1.78), Tolerance::default()).unwrap());

        assert_eq!(window.crop.height, 858);
        assert_eq!(window.crop.width % 2, 0);
        assert_eq!(window.crop.y, 0);
        let right_margin = source.width - window.crop.x - window.crop.width;
        assert!(right_margin.abs_diff(window.crop.x) <= 1);
        assert!((window.output_ratio() - 1.78).abs() <= DEFAULT_TOLERANCE);
    }

    #[test]
    fn fixed_width_scales_after_crop() {
        let source = SourceGeometry::new(1000, 1000);
        let target = AspectRatioTarget::new(1.78, Some(1920), None).unwrap();
        let window = crop_window(plan_crop(source, &target, Tolerance::default()).unwrap());

        assert_eq!((window.output_width, window.output_height), (1920, 1078));
        assert_eq!(window.crop.width, 1000);
        assert_eq!(window.crop.height, 562);
        assert_eq!(window.crop.y, 219);
        assert!(window.needs_scale());
    }

    #[test]
    fn fixed_height_derives_even_width() {
        let target = AspectRatioTarget::new(1.78, None, Some(720)).unwrap();
        assert_eq!(
            target.fixed_output(Tolerance::default()).unwrap(),
            Some((1282, 720))
        );
    }

    #[test]
    fn fixed_dimension_that_cannot_reach_ratio_is_a_configuration_error() {
        let target = AspectRatioTarget::new(1.78, Some(3), None).unwrap();
        assert!(matches!(
            target.fixed_output(Tolerance::default()),
            Err(PrepError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_invalid_targets() {
        assert!(matches!(
            AspectRatioTarget::new(0.0, None, None),
            Err(PrepError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            AspectRatioTarget::new(-1.0, None, None),
            Err(PrepError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            AspectRatioTarget::new(f64::NAN, None, None),
            Err(PrepError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            AspectRatioTarget::new(1.78, Some(1920), Some(1080)),
            Err(PrepError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            AspectRatioTarget::new(1.78, Some(0), None),
            Err(PrepError::InvalidConfiguration(_))
        ));
        assert!(Tolerance::new(0.0).is_err());
        assert!(Tolerance::new(f64::INFINITY).is_err());
    }

    #[test]
    fn zero_sized_source_is_invalid_input() {
        for source in [SourceGeometry::new(0, 1080), SourceGeometry::new(1920, 0)] {
            assert!(matches!(
                plan_crop(source, &target(1.78), Tolerance::default()),
                Err(PrepError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn tiny_source_that_cannot_hit_ratio_is_invalid_input() {
        let result = plan_crop(SourceGeometry::new(3, 1), &target(1.78), Tolerance::default());
        assert!(matches!(result, Err(PrepError::InvalidInput(_))));
    }

    #[test]
    fn output_fed_back_is_pass_through() {
        let source = SourceGeometry::new(1440, 1080);
        let target = target(1.78);
        let plan = plan_crop(source, &target, Tolerance::default()).unwrap();
        let (w, h) = plan.output_dimensions(source);
        assert_eq!(
            plan_crop(SourceGeometry::new(w, h), &target, Tolerance::default()).unwrap(),
            CropPlan::PassThrough
        );
    }

    #[test]
    fn odd_source_trims_the_kept_side_to_even() {
        let source = SourceGeometry::new(1081, 1921);
        let window = crop_window(plan_crop(source, &target(1.78), Tolerance::default()).unwrap());

        assert_eq!(window.crop.width, 1080);
        assert_eq!(window.crop.height, 606);
        assert_eq!((window.crop.x, window.crop.y), (0, 657));
        assert_eq!((window.output_width, window.output_height), (1080, 606));
        let bottom = source.height - window.crop.y - window.crop.height;
        assert!(bottom - window.crop.y <= 1);
    }

    #[test]
    fn odd_wide_source_gets_even_crop() {
        let source = SourceGeometry::new(2049, 857);
        let window = crop_window(plan_crop(source, &target(1.78), Tolerance::default()).unwrap());

        assert_eq!(window.crop.height, 856);
        assert_eq!(window.crop.width % 2, 0);
        assert_eq!(window.crop.y, 0);
        assert!(window.crop.fits_within(source));
    }

    #[test]
    fn odd_fixed_width_rounds_down_to_even() {
        let target = AspectRatioTarget::new(1.78, Some(1921), None).unwrap();
        assert_eq!(
            target.fixed_output(Tolerance::default()).unwrap(),
            Some((1920, 1078))
        );
    }

    #[test]
    fn unrepresentable_dependent_side_is_a_configuration_error() {
        let target = AspectRatioTarget::new(1e-12, Some(1920), None).unwrap();
        assert!(matches!(
            target.fixed_output(Tolerance::default()),
            Err(PrepError::InvalidConfiguration(_))
        ));
        let target = AspectRatioTarget::new(1e12, None, Some(1080)).unwrap();
        assert!(matches!(
            target.fixed_output(Tolerance::default()),
            Err(PrepError::InvalidConfiguration(_))
        ));
        let target = AspectRatioTarget::new(1.78, Some(1), None).unwrap();
        assert!(matches!(
            target.fixed_output(Tolerance::default()),
            Err(PrepError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn single_pixel_side_is_invalid_input() {
        for source in [SourceGeometry::new(1, 64), SourceGeometry::new(64, 1)] {
            assert!(matches!(
                plan_crop(source, &target(1.78), Tolerance::default()),
                Err(PrepError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn round_to_even_prefers_nearest() {
        assert_eq!(round_to_even(606.74), 606);
        assert_eq!(round_to_even(607.2), 608);
        assert_eq!(round_to_even(1078.65), 1078);
        assert_eq!(round_to_even(3.0), 4);
    }

    #[test]
    fn splits_side_by_side_halves() {
        let tiles = split_frame(SourceGeometry::new(1920, 1080), 2, 1).unwrap();
        assert_eq!(tiles.len(), 2);
        assert_eq!(
            tiles[0].rect,
            CropRect {
                width: 960,
                height: 1080,
                x: 0,
                y: 0
            }
        );
        assert_eq!(tiles[1].rect.x, 960);
        assert_eq!((tiles[1].row, tiles[1].column), (0, 1));
    }

    #[test]
    fn uneven_split_keeps_grid_centered() {
        let source = SourceGeometry::new(1000, 999);
        let tiles = split_frame(source, 3, 2).unwrap();
        assert_eq!(tiles.len(), 6);

        let first = tiles[0].rect;
        assert_eq!((first.width, first.height), (332, 498));
        assert_eq!((first.x, first.y), (2, 1));
        let last = tiles[5].rect;
        assert_eq!(source.width - (last.x + last.width), 2);
        assert_eq!(source.height - (last.y + last.height), 2);
        assert!(tiles.iter().all(|tile| tile.rect.fits_within(source)));
    }

    #[test]
    fn split_rejects_empty_grids_and_tiny_frames() {
        assert!(matches!(
            split_frame(SourceGeometry::new(1920, 1080), 0, 1),
            Err(PrepError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            split_frame(SourceGeometry::new(6, 6), 4, 1),
            Err(PrepError::InvalidInput(_))
        ));
    }
}
