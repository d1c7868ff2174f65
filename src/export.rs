//! Writing rasters and images to disk
//!
//! Exports are GeoTIFFs named after a sanitised description. Large requests
//! are refused before anything is written.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::raster::{Image, Raster};
use crate::readers::{ReadError, write_geotiff};

/// Largest raster accepted for export.
pub const MAX_PIXELS: u64 = 1_549_491_660;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("export of {pixels} pixels exceeds the limit of {max}")]
    TooManyPixels { pixels: u64, max: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write raster: {0}")]
    Write(#[from] ReadError),
}

/// Keeps the characters allowed in a task description and file name.
pub fn sanitize_description(description: &str) -> String {
    let cleaned: String = description
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || ".,:;_-".contains(*c))
        .collect();
    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned
    }
}

pub fn check_pixels(pixels: u64) -> Result<(), ExportError> {
    if pixels > MAX_PIXELS {
        return Err(ExportError::TooManyPixels {
            pixels,
            max: MAX_PIXELS,
        });
    }
    Ok(())
}

/// A raster waiting to be written to `<folder>/<description>.tif`.
#[derive(Debug, Clone)]
pub struct ExportTask {
    description: String,
    path: PathBuf,
    raster: Raster,
}

impl ExportTask {
    pub fn new<P: AsRef<Path>>(
        raster: Raster,
        description: &str,
        folder: P,
    ) -> Result<Self, ExportError> {
        check_pixels(raster.grid().len() as u64)?;

        let description = sanitize_description(description);
        let path = folder.as_ref().join(format!("{}.tif", description));
        Ok(Self {
            description,
            path,
            raster,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run(&self) -> Result<PathBuf, ExportError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_geotiff(&self.path, &self.raster)?;
        info!(
            "exported {} ({}x{}) to {}",
            self.description,
            self.raster.width(),
            self.raster.height(),
            self.path.display()
        );
        Ok(self.path.clone())
    }
}

/// Writes every band of `image` as `<dir>/<band>.tif`, the layout
/// [`crate::readers::open_image`] reads back.
pub fn export_image<P: AsRef<Path>>(image: &Image, dir: P) -> Result<PathBuf, ExportError> {
    let dir = dir.as_ref();
    check_pixels((image.grid().len() as u64).saturating_mul(image.bands().len() as u64))?;
    fs::create_dir_all(dir)?;
    for band in image.bands() {
        write_geotiff(dir.join(format!("{}.tif", band.name)), &band.raster)?;
    }
    Ok(dir.to_path_buf())
}
