//! Raster file access
//!
//! An image on disk is a directory holding one file per band, named after
//! the band (`B4.tif`, `occurrence.tif`, ...). The acquisition date, when
//! present, is taken from the directory name.

use std::path::Path;

use tracing::debug;

pub mod geotiff;
pub mod nc;
pub mod types;
pub mod utils;

pub use geotiff::{GeoTiffReader, write_geotiff};
pub use nc::NcReader;
pub use types::{DataReader, FileType, ReadError};
pub use utils::{date_from_name, reader_from_filetype};

use crate::raster::Image;

pub fn create_reader(file_name: String) -> Result<Box<dyn DataReader>, ReadError> {
    let path = Path::new(&file_name);
    match reader_from_filetype(path)? {
        FileType::GeoTiff => Ok(Box::new(GeoTiffReader { file_name })),
        FileType::NetCDF => {
            let variable = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            Ok(Box::new(NcReader {
                file_name,
                variable,
            }))
        }
    }
}

/// Reads every band file of an image directory, ordered by band name.
pub fn open_image<P: AsRef<Path>>(dir: P) -> Result<Image, ReadError> {
    let dir = dir.as_ref();
    let pattern = dir.join("*.*");

    let mut files: Vec<_> = glob::glob(&pattern.to_string_lossy())?
        .filter_map(|entry| entry.ok())
        .filter(|path| reader_from_filetype(path).is_ok())
        .collect();
    files.sort();

    let mut image: Option<Image> = None;
    for path in files {
        let Some(band) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            continue;
        };
        debug!("reading band {} from {}", band, path.display());

        let raster = create_reader(path.to_string_lossy().to_string())?.read_data()?;
        image = Some(match image {
            None => Image::from_band(&band, raster),
            Some(image) => image.add_band(&band, raster)?,
        });
    }

    let mut image = image.ok_or_else(|| ReadError::NoBands(dir.to_path_buf()))?;
    if let Some(date) = dir
        .file_name()
        .and_then(|name| date_from_name(&name.to_string_lossy()))
    {
        image.set_timestamp(date.and_hms_opt(0, 0, 0));
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GeoTransform, Grid, Raster};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn test_open_image_reads_all_bands() {
        let root = tempdir().unwrap();
        let scene = root.path().join("S2B_MSIL2A_20200704T101559");
        std::fs::create_dir(&scene).unwrap();

        let grid = Grid::new(2, 2, GeoTransform::new(10.0, 0.001, 46.0, -0.001));
        write_geotiff(scene.join("B8.tif"), &Raster::filled(grid, 0.5)).unwrap();
        write_geotiff(scene.join("B4.tif"), &Raster::filled(grid, 0.2)).unwrap();
        std::fs::write(scene.join("notes.txt"), "not a band").unwrap();

        let image = open_image(&scene).unwrap();
        assert_eq!(image.band_names(), vec!["B4", "B8"]);
        assert_eq!(
            image.timestamp().map(|t| t.date()),
            NaiveDate::from_ymd_opt(2020, 7, 4)
        );
    }

    #[test]
    fn test_open_empty_directory() {
        let root = tempdir().unwrap();
        assert!(matches!(open_image(root.path()), Err(ReadError::NoBands(_))));
    }
}
