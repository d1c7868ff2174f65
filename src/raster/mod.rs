//! In-memory raster model
//!
//! Rasters are single-band `f32` grids on a north-up geographic grid (lon/lat
//! degrees). `NaN` marks pixels without data, which is also how masked pixels
//! are represented. Boolean layers use [`Mask`].

use thiserror::Error;

use crate::region::{Bbox, Region};

pub mod distance;
pub mod focal;
pub mod image;
pub mod terrain;

pub use image::Image;

/// Metres per degree of latitude (mean).
const METERS_PER_DEGREE_LAT: f64 = 110_540.0;
/// Metres per degree of longitude at the equator.
const METERS_PER_DEGREE_LON: f64 = 111_320.0;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("band '{0}' not found in image")]
    MissingBand(String),

    #[error("grid mismatch: {0}x{1} vs {2}x{3}")]
    GridMismatch(usize, usize, usize, usize),

    #[error("data length {len} does not match a {width}x{height} grid")]
    DataLength {
        len: usize,
        width: usize,
        height: usize,
    },

    #[error("invalid kernel: {0}")]
    InvalidKernel(String),

    #[error("region does not overlap the raster extent")]
    NoOverlap,

    #[error("invalid scale {0}")]
    InvalidScale(f64),

    #[error("a {width}x{height} grid does not fit in memory")]
    GridTooLarge { width: f64, height: f64 },
}

pub type Result<T> = std::result::Result<T, RasterError>;

/// North-up affine transform, GDAL layout without the rotation terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    /// Negative for north-up rasters.
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            origin_y,
            pixel_height,
        }
    }

    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self::new(gt[0], gt[1], gt[3], gt[5])
    }

    /// Coordinates of the centre of pixel (col, row).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional pixel coordinates of a point.
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
}

impl Grid {
    pub fn new(width: usize, height: usize, transform: GeoTransform) -> Self {
        Self {
            width,
            height,
            transform,
        }
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn extent(&self) -> Bbox {
        let t = &self.transform;
        let x1 = t.origin_x;
        let x2 = t.origin_x + self.width as f64 * t.pixel_width;
        let y1 = t.origin_y;
        let y2 = t.origin_y + self.height as f64 * t.pixel_height;
        Bbox {
            xmin: x1.min(x2),
            xmax: x1.max(x2),
            ymin: y1.min(y2),
            ymax: y1.max(y2),
        }
    }

    fn center_latitude(&self) -> f64 {
        let extent = self.extent();
        (extent.ymin + extent.ymax) / 2.0
    }

    /// Approximate pixel size in metres (x, y), evaluated at the centre latitude.
    pub fn cell_size_meters(&self) -> (f64, f64) {
        let lat = self.center_latitude().to_radians();
        (
            self.transform.pixel_width.abs() * METERS_PER_DEGREE_LON * lat.cos(),
            self.transform.pixel_height.abs() * METERS_PER_DEGREE_LAT,
        )
    }

    /// Pixel window (col, row, width, height) covering `bbox`, clamped to the grid.
    pub fn window(&self, bbox: &Bbox) -> Option<(usize, usize, usize, usize)> {
        if !self.extent().intersects(bbox) {
            return None;
        }

        let t = &self.transform;

        // geotransform: [top_left_x, pixel_width, 0, top_left_y, 0, -pixel_height]
        let pixel_min_x = ((bbox.xmin - t.origin_x) / t.pixel_width).floor() as i64;
        let pixel_max_x = ((bbox.xmax - t.origin_x) / t.pixel_width).ceil() as i64;
        let pixel_min_y = ((bbox.ymax - t.origin_y) / t.pixel_height).floor() as i64;
        let pixel_max_y = ((bbox.ymin - t.origin_y) / t.pixel_height).ceil() as i64;

        let start_x = pixel_min_x.max(0) as usize;
        let end_x = pixel_max_x.max(0).min(self.width as i64) as usize;
        let start_y = pixel_min_y.max(0) as usize;
        let end_y = pixel_max_y.max(0).min(self.height as i64) as usize;

        if end_x <= start_x || end_y <= start_y {
            return None;
        }

        Some((start_x, start_y, end_x - start_x, end_y - start_y))
    }

    pub fn subgrid(&self, col: usize, row: usize, width: usize, height: usize) -> Grid {
        let t = &self.transform;
        Grid::new(
            width,
            height,
            GeoTransform::new(
                t.origin_x + col as f64 * t.pixel_width,
                t.pixel_width,
                t.origin_y + row as f64 * t.pixel_height,
                t.pixel_height,
            ),
        )
    }

    /// Pixel sizes in degrees and dimensions of the grid with `scale` metre
    /// pixels, before any conversion to integers.
    fn scaled_dimensions(&self, scale: f64) -> Result<(f64, f64, f64, f64)> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RasterError::InvalidScale(scale));
        }

        let extent = self.extent();
        let lat = self.center_latitude().to_radians();
        let pixel_width = scale / (METERS_PER_DEGREE_LON * lat.cos());
        let pixel_height = scale / METERS_PER_DEGREE_LAT;

        let width = ((extent.xmax - extent.xmin) / pixel_width).ceil().max(1.0);
        let height = ((extent.ymax - extent.ymin) / pixel_height).ceil().max(1.0);
        Ok((pixel_width, pixel_height, width, height))
    }

    /// Number of pixels [`Grid::with_scale`] would produce, saturating at
    /// `u64::MAX`.
    pub fn scaled_pixel_count(&self, scale: f64) -> Result<u64> {
        let (_, _, width, height) = self.scaled_dimensions(scale)?;
        Ok((width * height) as u64)
    }

    /// Grid covering the same extent with pixels of `scale` metres.
    pub fn with_scale(&self, scale: f64) -> Result<Grid> {
        let (pixel_width, pixel_height, width, height) = self.scaled_dimensions(scale)?;
        if width * height > usize::MAX as f64 {
            return Err(RasterError::GridTooLarge { width, height });
        }

        let extent = self.extent();
        Ok(Grid::new(
            width as usize,
            height as usize,
            GeoTransform::new(extent.xmin, pixel_width, extent.ymax, -pixel_height),
        ))
    }

    /// Pixels whose centre falls inside `region`.
    pub fn footprint(&self, region: &Region) -> Mask {
        Mask::from_fn(*self, |col, row| {
            let (x, y) = self.transform.pixel_center(col, row);
            region.contains(x, y)
        })
    }

    fn check_same(&self, other: &Grid) -> Result<()> {
        if self.width != other.width || self.height != other.height {
            return Err(RasterError::GridMismatch(
                self.width,
                self.height,
                other.width,
                other.height,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    grid: Grid,
    data: Vec<f32>,
}

impl Raster {
    pub fn new(grid: Grid, data: Vec<f32>) -> Result<Self> {
        if data.len() != grid.len() {
            return Err(RasterError::DataLength {
                len: data.len(),
                width: grid.width,
                height: grid.height,
            });
        }
        Ok(Self { grid, data })
    }

    pub fn filled(grid: Grid, value: f32) -> Self {
        Self {
            grid,
            data: vec![value; grid.len()],
        }
    }

    pub fn from_fn(grid: Grid, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(grid.len());
        for row in 0..grid.height {
            for col in 0..grid.width {
                data.push(f(col, row));
            }
        }
        Self { grid, data }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn width(&self) -> usize {
        self.grid.width
    }

    pub fn height(&self) -> usize {
        self.grid.height
    }

    #[inline(always)]
    pub fn get(&self, col: usize, row: usize) -> f32 {
        self.data[row * self.grid.width + col]
    }

    #[inline(always)]
    pub fn set(&mut self, col: usize, row: usize, value: f32) {
        self.data[row * self.grid.width + col] = value;
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Raster {
        Raster {
            grid: self.grid,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    pub fn zip_with(&self, other: &Raster, f: impl Fn(f32, f32) -> f32) -> Result<Raster> {
        self.grid.check_same(&other.grid)?;
        Ok(Raster {
            grid: self.grid,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// True where the pixel holds data.
    pub fn valid_mask(&self) -> Mask {
        Mask {
            grid: self.grid,
            data: self.data.iter().map(|v| !v.is_nan()).collect(),
        }
    }

    /// True where the pixel holds data different from zero.
    pub fn nonzero_mask(&self) -> Mask {
        Mask {
            grid: self.grid,
            data: self.data.iter().map(|&v| !v.is_nan() && v != 0.0).collect(),
        }
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Replaces no-data pixels with `value`.
    pub fn unmask(&self, value: f32) -> Raster {
        self.map(|v| if v.is_nan() { value } else { v })
    }

    /// Pixels where `mask` is false become no-data.
    pub fn update_mask(&self, mask: &Mask) -> Result<Raster> {
        self.grid.check_same(&mask.grid)?;
        Ok(Raster {
            grid: self.grid,
            data: self
                .data
                .iter()
                .zip(&mask.data)
                .map(|(&v, &keep)| if keep { v } else { f32::NAN })
                .collect(),
        })
    }

    pub fn crop(&self, col: usize, row: usize, width: usize, height: usize) -> Raster {
        let grid = self.grid.subgrid(col, row, width, height);
        let mut data = Vec::with_capacity(grid.len());
        for r in row..row + height {
            let start = r * self.grid.width + col;
            data.extend_from_slice(&self.data[start..start + width]);
        }
        Raster { grid, data }
    }

    /// Crops to the region's bounding box and masks pixels outside the polygon.
    pub fn clip(&self, region: &Region) -> Result<Raster> {
        let (col, row, width, height) = self
            .grid
            .window(region.bbox())
            .ok_or(RasterError::NoOverlap)?;
        let cropped = self.crop(col, row, width, height);
        let footprint = cropped.grid.footprint(region);
        cropped.update_mask(&footprint)
    }

    /// Nearest-neighbour resampling onto `target`. Pixels falling outside
    /// the source extent are no-data.
    pub fn resample(&self, target: &Grid) -> Raster {
        if *target == self.grid {
            return self.clone();
        }

        Raster::from_fn(*target, |col, row| {
            let (x, y) = target.transform.pixel_center(col, row);
            let (px, py) = self.grid.transform.to_pixel(x, y);
            if px < 0.0 || py < 0.0 {
                return f32::NAN;
            }
            let (sc, sr) = (px.floor() as usize, py.floor() as usize);
            if sc >= self.grid.width || sr >= self.grid.height {
                f32::NAN
            } else {
                self.get(sc, sr)
            }
        })
    }
}

/// Boolean raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    grid: Grid,
    data: Vec<bool>,
}

impl Mask {
    pub fn filled(grid: Grid, value: bool) -> Self {
        Self {
            grid,
            data: vec![value; grid.len()],
        }
    }

    pub fn from_fn(grid: Grid, f: impl Fn(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(grid.len());
        for row in 0..grid.height {
            for col in 0..grid.width {
                data.push(f(col, row));
            }
        }
        Self { grid, data }
    }

    pub fn from_vec(grid: Grid, data: Vec<bool>) -> Result<Self> {
        if data.len() != grid.len() {
            return Err(RasterError::DataLength {
                len: data.len(),
                width: grid.width,
                height: grid.height,
            });
        }
        Ok(Self { grid, data })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn data(&self) -> &[bool] {
        &self.data
    }

    #[inline(always)]
    pub fn get(&self, col: usize, row: usize) -> bool {
        self.data[row * self.grid.width + col]
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn and(&self, other: &Mask) -> Result<Mask> {
        self.grid.check_same(&other.grid)?;
        Ok(Mask {
            grid: self.grid,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| a && b)
                .collect(),
        })
    }

    pub fn not(&self) -> Mask {
        Mask {
            grid: self.grid,
            data: self.data.iter().map(|v| !v).collect(),
        }
    }

    /// Every pixel set here is also set in `other`.
    pub fn is_subset_of(&self, other: &Mask) -> bool {
        self.data.len() == other.data.len()
            && self.data.iter().zip(&other.data).all(|(&a, &b)| !a || b)
    }

    /// 1.0 where set, 0.0 elsewhere.
    pub fn to_raster(&self) -> Raster {
        Raster {
            grid: self.grid,
            data: self
                .data
                .iter()
                .map(|&v| if v { 1.0 } else { 0.0 })
                .collect(),
        }
    }

    /// Nearest-neighbour resampling; pixels outside the source extent are unset.
    pub fn resample(&self, target: &Grid) -> Mask {
        self.to_raster().resample(target).nonzero_mask()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 0.001 degree grid anchored at (10, 46).
    pub(crate) fn test_grid(width: usize, height: usize) -> Grid {
        Grid::new(width, height, GeoTransform::new(10.0, 0.001, 46.0, -0.001))
    }

    #[test]
    fn test_raster_rejects_wrong_length() {
        let grid = test_grid(3, 2);
        assert!(Raster::new(grid, vec![0.0; 5]).is_err());
        assert!(Raster::new(grid, vec![0.0; 6]).is_ok());
    }

    #[test]
    fn test_window_and_clip() {
        let grid = test_grid(10, 10);
        let raster = Raster::from_fn(grid, |col, row| (row * 10 + col) as f32);

        // right triangle inside pixels 2..7
        let region = Region::new(vec![
            (10.0021, 45.9979),
            (10.0069, 45.9979),
            (10.0021, 45.9931),
        ])
        .unwrap();

        let clipped = raster.clip(&region).unwrap();
        assert_eq!(clipped.width(), 5);
        assert_eq!(clipped.height(), 5);
        assert_eq!(clipped.get(0, 0), 22.0);
        assert!(clipped.get(4, 4).is_nan());
        assert!(clipped.valid_count() < 25);
    }

    #[test]
    fn test_clip_outside_extent() {
        let raster = Raster::filled(test_grid(5, 5), 1.0);
        let region = Region::new(vec![(20.0, 10.0), (21.0, 10.0), (21.0, 11.0)]).unwrap();
        assert!(matches!(raster.clip(&region), Err(RasterError::NoOverlap)));
    }

    #[test]
    fn test_update_mask() {
        let grid = test_grid(2, 1);
        let raster = Raster::new(grid, vec![1.0, 2.0]).unwrap();
        let mask = Mask::from_vec(grid, vec![true, false]).unwrap();
        let masked = raster.update_mask(&mask).unwrap();
        assert_eq!(masked.get(0, 0), 1.0);
        assert!(masked.get(1, 0).is_nan());
    }

    #[test]
    fn test_resample_to_finer_grid() {
        let coarse = Grid::new(2, 2, GeoTransform::new(10.0, 0.002, 46.0, -0.002));
        let raster = Raster::from_fn(coarse, |col, _| col as f32);
        let resampled = raster.resample(&test_grid(4, 4));
        assert_eq!(&resampled.data()[0..4], &[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(&resampled.data()[12..16], &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_with_scale_keeps_extent() {
        let grid = test_grid(100, 100);
        let (cx, cy) = grid.cell_size_meters();
        let scaled = grid.with_scale(cy * 2.0).unwrap();
        assert!((49..=51).contains(&scaled.height));
        assert!(scaled.width < 100);
        assert!(cx < cy);
        assert!(grid.with_scale(0.0).is_err());
    }

    #[test]
    fn test_tiny_scale_does_not_overflow() {
        let grid = test_grid(100, 100);
        assert_eq!(grid.scaled_pixel_count(1e-12).unwrap(), u64::MAX);
        assert!(matches!(
            grid.with_scale(1e-12),
            Err(RasterError::GridTooLarge { .. })
        ));

        let (_, cy) = grid.cell_size_meters();
        let count = grid.scaled_pixel_count(cy * 2.0).unwrap();
        assert_eq!(count, grid.with_scale(cy * 2.0).unwrap().len() as u64);
    }

    #[test]
    fn test_mask_logic() {
        let grid = test_grid(3, 1);
        let a = Mask::from_vec(grid, vec![true, true, false]).unwrap();
        let b = Mask::from_vec(grid, vec![true, false, false]).unwrap();
        let both = a.and(&b).unwrap();
        assert_eq!(both, b);
        assert!(b.is_subset_of(&a));
        assert!(!a.is_subset_of(&b));
        assert_eq!(a.not().count(), 1);
        assert_eq!(a.to_raster().data(), &[1.0, 1.0, 0.0]);
    }
}
