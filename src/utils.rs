use std::fmt;

use crate::raster::Raster;

/// Min, max and mean over the valid pixels of a raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterSummary {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub valid: usize,
    pub total: usize,
}

impl RasterSummary {
    pub fn new(raster: &Raster) -> Self {
        let valid_values: Vec<f32> = raster
            .data()
            .iter()
            .filter(|&&v| !v.is_nan())
            .cloned()
            .collect();

        let mean = if valid_values.is_empty() {
            f32::NAN
        } else {
            valid_values.iter().sum::<f32>() / valid_values.len() as f32
        };

        Self {
            min: valid_values.iter().fold(f32::INFINITY, |a, &b| a.min(b)),
            max: valid_values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b)),
            mean,
            valid: valid_values.len(),
            total: raster.data().len(),
        }
    }

    /// Share of pixels holding data, in percent.
    pub fn valid_percent(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.valid as f32 / self.total as f32
        }
    }
}

impl fmt::Display for RasterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid == 0 {
            return write!(f, "no valid pixels (0 / {})", self.total);
        }
        write!(
            f,
            "min {:.2}, max {:.2}, mean {:.2}, valid pixels {} / {} ({:.1}%)",
            self.min,
            self.max,
            self.mean,
            self.valid,
            self.total,
            self.valid_percent()
        )
    }
}
