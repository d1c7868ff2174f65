use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

use super::{DataReader, ReadError};
use crate::raster::{GeoTransform, Grid, Raster};

/// GDAL_NODATA, an ASCII tag holding the no-data value.
const GDAL_NODATA: u16 = 42113;

pub struct GeoTiffReader {
    pub file_name: String,
}

impl DataReader for GeoTiffReader {
    fn read_data(&self) -> Result<Raster, ReadError> {
        let file = File::open(&self.file_name)
            .map_err(|e| ReadError::GeoTiff(format!("Failed to open file: {}", e)))?;

        let reader = BufReader::new(file);

        let mut decoder = Decoder::new(reader)
            .map_err(|e| ReadError::GeoTiff(format!("Failed to decode TIFF: {}", e)))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| ReadError::GeoTiff(format!("Failed to get dimensions: {}", e)))?;

        let transform = read_geotransform(&mut decoder);
        let nodata = read_nodata(&mut decoder);

        let mut image_data: Vec<f32> = match decoder
            .read_image()
            .map_err(|e| ReadError::GeoTiff(format!("Failed to read image: {}", e)))?
        {
            DecodingResult::U8(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::U16(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::U32(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::I16(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::I32(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::F32(data) => data,
            DecodingResult::F64(data) => data.iter().map(|&x| x as f32).collect(),
            _ => return Err(ReadError::GeoTiff("Unsupported pixel format".to_string())),
        };

        if let Some(nodata) = nodata.map(|v| v as f32).filter(|v| !v.is_nan()) {
            for value in image_data.iter_mut().filter(|v| **v == nodata) {
                *value = f32::NAN;
            }
        }

        let grid = Grid::new(width as usize, height as usize, transform);
        Ok(Raster::new(grid, image_data)?)
    }
}

/// Reads ModelPixelScale and ModelTiepoint. Files without georeferencing get
/// a unit grid anchored at the origin.
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> GeoTransform {
    let mut transform = GeoTransform::new(0.0, 1.0, 0.0, -1.0);

    if let Ok(Some(value)) = decoder.find_tag(Tag::ModelPixelScaleTag)
        && let Ok(scale) = value.into_f64_vec()
        && scale.len() >= 2
    {
        transform.pixel_width = scale[0];
        transform.pixel_height = -scale[1];
    }

    if let Ok(Some(value)) = decoder.find_tag(Tag::ModelTiepointTag)
        && let Ok(tie) = value.into_f64_vec()
        && tie.len() >= 6
    {
        // raster point (i, j) maps to model point (x, y)
        transform.origin_x = tie[3] - tie[0] * transform.pixel_width;
        transform.origin_y = tie[4] - tie[1] * transform.pixel_height;
    }

    transform
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let value = decoder.find_tag(Tag::Unknown(GDAL_NODATA)).ok()??;
    let text = value.into_string().ok()?;
    text.trim_end_matches('\0').trim().parse().ok()
}

/// Writes a single band `f32` GeoTIFF with pixel scale, tie point and
/// no-data (NaN) tags.
pub fn write_geotiff<P: AsRef<Path>>(path: P, raster: &Raster) -> Result<(), ReadError> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    let mut encoder = TiffEncoder::new(&mut writer)
        .map_err(|e| ReadError::GeoTiff(format!("Failed to create encoder: {}", e)))?;

    let t = &raster.grid().transform;
    let scale = [t.pixel_width, -t.pixel_height, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];

    let mut image = encoder
        .new_image::<colortype::Gray32Float>(raster.width() as u32, raster.height() as u32)
        .map_err(|e| ReadError::GeoTiff(format!("Failed to create image: {}", e)))?;

    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(|e| ReadError::GeoTiff(format!("Failed to write pixel scale: {}", e)))?;
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(|e| ReadError::GeoTiff(format!("Failed to write tie point: {}", e)))?;
    image
        .encoder()
        .write_tag(Tag::Unknown(GDAL_NODATA), "nan")
        .map_err(|e| ReadError::GeoTiff(format!("Failed to write nodata: {}", e)))?;

    image
        .write_data(raster.data())
        .map_err(|e| ReadError::GeoTiff(format!("Failed to write data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_written_geotiff_keeps_georeferencing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("B4.tif");

        let grid = Grid::new(3, 2, GeoTransform::new(10.0, 0.5, 46.0, -0.25));
        let raster = Raster::new(grid, vec![0.1, 0.2, 0.3, 0.4, f32::NAN, 0.6]).unwrap();
        write_geotiff(&path, &raster).unwrap();

        let reader = GeoTiffReader {
            file_name: path.to_string_lossy().to_string(),
        };
        let read = reader.read_data().unwrap();

        assert_eq!(read.grid(), raster.grid());
        assert_eq!(read.get(2, 1), 0.6);
        assert!(read.get(1, 1).is_nan());
    }

    #[test]
    fn test_nodata_tag_masks_pixels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("elevation.tif");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(BufWriter::new(file)).unwrap();
            let mut image = encoder.new_image::<colortype::GrayI16>(2, 1).unwrap();
            image
                .encoder()
                .write_tag(Tag::Unknown(GDAL_NODATA), "-32768")
                .unwrap();
            image.write_data(&[-32768i16, 120][..]).unwrap();
        }

        let reader = GeoTiffReader {
            file_name: path.to_string_lossy().to_string(),
        };
        let read = reader.read_data().unwrap();
        assert!(read.get(0, 0).is_nan());
        assert_eq!(read.get(1, 0), 120.0);
        assert_eq!(read.valid_mask().count(), 1);
    }

    #[test]
    fn test_written_geotiff_carries_nodata_tag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mask.tif");
        let grid = Grid::new(1, 1, GeoTransform::new(0.0, 1.0, 0.0, -1.0));
        write_geotiff(&path, &Raster::filled(grid, 1.0)).unwrap();

        let mut decoder = Decoder::new(BufReader::new(File::open(&path).unwrap())).unwrap();
        assert!(read_nodata(&mut decoder).is_some_and(f64::is_nan));
    }

    #[test]
    fn test_missing_file() {
        let reader = GeoTiffReader {
            file_name: "does/not/exist.tif".to_string(),
        };
        assert!(matches!(reader.read_data(), Err(ReadError::GeoTiff(_))));
    }
}
