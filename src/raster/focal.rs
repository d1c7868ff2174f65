//! Focal median filtering (despeckling)
//!
//! Kernels are expressed in pixels. NaN neighbours are ignored; a pixel with
//! no valid neighbour stays NaN.

use std::str::FromStr;

use super::{Image, Raster, RasterError, Result};

/// Kernel radius used when despeckling aspect masks.
pub const DEFAULT_DESPECKLE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelShape {
    #[default]
    Circle,
    Square,
    /// Both diagonals.
    Cross,
    /// Horizontal and vertical arms.
    Plus,
    Octagon,
    Diamond,
}

impl FromStr for KernelShape {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "circle" => Ok(KernelShape::Circle),
            "square" => Ok(KernelShape::Square),
            "cross" => Ok(KernelShape::Cross),
            "plus" => Ok(KernelShape::Plus),
            "octagon" => Ok(KernelShape::Octagon),
            "diamond" => Ok(KernelShape::Diamond),
            other => Err(RasterError::InvalidKernel(format!("unknown shape '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel {
    pub radius: usize,
    pub shape: KernelShape,
}

impl Kernel {
    pub fn new(radius: usize, shape: KernelShape) -> Result<Self> {
        if radius == 0 {
            return Err(RasterError::InvalidKernel(
                "kernel radius must be at least 1".to_string(),
            ));
        }
        Ok(Self { radius, shape })
    }

    /// (dx, dy) offsets of the active cells, centre included.
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius as isize;
        let mut offsets = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                let active = match self.shape {
                    KernelShape::Square => true,
                    KernelShape::Circle => dx * dx + dy * dy <= r * r,
                    KernelShape::Cross => dx == dy || dx == -dy,
                    KernelShape::Plus => dx == 0 || dy == 0,
                    KernelShape::Diamond => dx.abs() + dy.abs() <= r,
                    KernelShape::Octagon => (dx.abs() + dy.abs()) as f64 <= 1.5 * r as f64,
                };
                if active {
                    offsets.push((dx, dy));
                }
            }
        }
        offsets
    }
}

fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return f32::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

pub fn median_filter(raster: &Raster, kernel: &Kernel) -> Raster {
    let offsets = kernel.offsets();
    let (cols, rows) = (raster.width() as isize, raster.height() as isize);
    let mut values: Vec<f32> = Vec::with_capacity(offsets.len());

    let mut out = Raster::filled(*raster.grid(), f32::NAN);
    for row in 0..rows {
        for col in 0..cols {
            values.clear();
            for &(dx, dy) in &offsets {
                let (nc, nr) = (col + dx, row + dy);
                if nc >= 0 && nr >= 0 && nc < cols && nr < rows {
                    let v = raster.get(nc as usize, nr as usize);
                    if !v.is_nan() {
                        values.push(v);
                    }
                }
            }
            out.set(col as usize, row as usize, median(&mut values));
        }
    }
    out
}

/// Median filter over every band of `image`; acquisition time and
/// properties are carried over.
pub fn despeckle(image: &Image, size: usize, shape: KernelShape) -> Result<Image> {
    let kernel = Kernel::new(size, shape)?;
    image.map_bands(|raster| Ok(median_filter(raster, &kernel)))
}
