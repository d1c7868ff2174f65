use std::path::PathBuf;

use thiserror::Error;

use crate::raster::{Raster, RasterError};

pub trait DataReader {
    fn read_data(&self) -> Result<Raster, ReadError>;
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("GeoTIFF error: {0}")]
    GeoTiff(String),

    #[error("NetCDF error: {0}")]
    NetCDF(String),

    #[error("unknown file type: {0}")]
    UnknownFileType(PathBuf),

    #[error("no band files found in {0}")]
    NoBands(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid band file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("raster error: {0}")]
    Raster(#[from] RasterError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    GeoTiff,
    NetCDF,
}
