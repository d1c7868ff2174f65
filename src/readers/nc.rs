use super::{DataReader, ReadError};
use crate::raster::Raster;

/// NetCDF variable reader, backed by GDAL's `NETCDF:` driver.
pub struct NcReader {
    pub file_name: String,
    pub variable: String,
}

#[cfg(feature = "gdal")]
impl DataReader for NcReader {
    fn read_data(&self) -> Result<Raster, ReadError> {
        use crate::raster::{GeoTransform, Grid};
        use gdal::Dataset;

        let gdal_path = format!("NETCDF:{}:{}", self.file_name, self.variable);
        let dataset = Dataset::open(&gdal_path)
            .map_err(|e| ReadError::NetCDF(format!("Failed to open {}: {}", gdal_path, e)))?;

        let (width, height) = dataset.raster_size();
        let geotransform = dataset
            .geo_transform()
            .map_err(|e| ReadError::NetCDF(format!("Missing geotransform: {}", e)))?;

        let band = dataset
            .rasterband(1)
            .map_err(|e| ReadError::NetCDF(format!("Failed to read band: {}", e)))?;
        let buffer = band
            .read_as::<f32>((0, 0), (width, height), (width, height), None)
            .map_err(|e| ReadError::NetCDF(format!("Failed to read data: {}", e)))?;

        let scale = band.scale().unwrap_or(1.0) as f32;
        let missing_value = band.no_data_value();
        let data = buffer
            .data()
            .iter()
            .map(|&v| {
                if missing_value.is_some_and(|mv| v == mv as f32) {
                    f32::NAN
                } else {
                    v * scale
                }
            })
            .collect();

        let grid = Grid::new(width, height, GeoTransform::from_gdal(geotransform));
        Ok(Raster::new(grid, data)?)
    }
}

#[cfg(not(feature = "gdal"))]
impl DataReader for NcReader {
    fn read_data(&self) -> Result<Raster, ReadError> {
        Err(ReadError::NetCDF(format!(
            "cannot read {}: NetCDF support requires the `gdal` feature",
            self.file_name
        )))
    }
}
