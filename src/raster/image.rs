use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::{Grid, Mask, Raster, RasterError, Result};
use crate::region::Region;

#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub name: String,
    pub raster: Raster,
}

/// Multi-band image: named bands on one grid, an optional acquisition time
/// and numeric properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    grid: Grid,
    bands: Vec<Band>,
    timestamp: Option<NaiveDateTime>,
    properties: BTreeMap<String, f64>,
}

impl Image {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            bands: Vec::new(),
            timestamp: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn from_band(name: &str, raster: Raster) -> Self {
        Self {
            grid: *raster.grid(),
            bands: vec![Band {
                name: name.to_string(),
                raster,
            }],
            timestamp: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: Option<NaiveDateTime>) {
        self.timestamp = timestamp;
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }

    pub fn set_property(&mut self, name: &str, value: f64) {
        self.properties.insert(name.to_string(), value);
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn band(&self, name: &str) -> Result<&Raster> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.raster)
            .ok_or_else(|| RasterError::MissingBand(name.to_string()))
    }

    /// Single band image keeping time and properties.
    pub fn select(&self, name: &str) -> Result<Image> {
        let raster = self.band(name)?.clone();
        Ok(self.with_bands(vec![Band {
            name: name.to_string(),
            raster,
        }]))
    }

    /// Appends a band. A band with the same name is replaced in place.
    pub fn add_band(mut self, name: &str, raster: Raster) -> Result<Image> {
        if self.bands.is_empty() {
            self.grid = *raster.grid();
        } else if raster.grid().width != self.grid.width || raster.grid().height != self.grid.height
        {
            return Err(RasterError::GridMismatch(
                self.grid.width,
                self.grid.height,
                raster.width(),
                raster.height(),
            ));
        }

        match self.bands.iter_mut().find(|b| b.name == name) {
            Some(band) => band.raster = raster,
            None => self.bands.push(Band {
                name: name.to_string(),
                raster,
            }),
        }
        Ok(self)
    }

    /// Applies `f` to every band, keeping names, time and properties.
    pub fn map_bands(&self, f: impl Fn(&Raster) -> Result<Raster>) -> Result<Image> {
        let mut bands = Vec::with_capacity(self.bands.len());
        for band in &self.bands {
            bands.push(Band {
                name: band.name.clone(),
                raster: f(&band.raster)?,
            });
        }
        let mut image = self.with_bands(bands);
        if let Some(first) = image.bands.first() {
            image.grid = *first.raster.grid();
        }
        Ok(image)
    }

    pub fn update_mask(&self, mask: &Mask) -> Result<Image> {
        self.map_bands(|raster| raster.update_mask(mask))
    }

    pub fn clip(&self, region: &Region) -> Result<Image> {
        self.map_bands(|raster| raster.clip(region))
    }

    /// Evaluates `f` pixel by pixel over the named bands. Non-finite results
    /// (division by zero, square root of a negative value) become no-data.
    pub fn expression<const N: usize>(
        &self,
        names: [&str; N],
        f: impl Fn([f32; N]) -> f32,
    ) -> Result<Raster> {
        let mut inputs = Vec::with_capacity(N);
        for name in names {
            inputs.push(self.band(name)?.data());
        }

        let data = (0..self.grid.len())
            .map(|i| {
                let value = f(std::array::from_fn(|k| inputs[k][i]));
                if value.is_finite() { value } else { f32::NAN }
            })
            .collect();

        Raster::new(self.grid, data)
    }

    fn with_bands(&self, bands: Vec<Band>) -> Image {
        Image {
            grid: self.grid,
            bands,
            timestamp: self.timestamp,
            properties: self.properties.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::tests::test_grid;
    use chrono::NaiveDate;

    fn two_band_image() -> Image {
        let grid = test_grid(2, 1);
        Image::from_band("B4", Raster::new(grid, vec![0.2, 0.1]).unwrap())
            .add_band("B8", Raster::new(grid, vec![0.5, 0.1]).unwrap())
            .unwrap()
    }

    #[test]
    fn test_add_band_keeps_existing_bands() {
        let image = two_band_image();
        assert_eq!(image.band_names(), vec!["B4", "B8"]);

        let replaced = image
            .add_band("B4", Raster::filled(test_grid(2, 1), 1.0))
            .unwrap();
        assert_eq!(replaced.band_names(), vec!["B4", "B8"]);
        assert_eq!(replaced.band("B4").unwrap().get(0, 0), 1.0);
    }

    #[test]
    fn test_add_band_rejects_other_grid() {
        let image = two_band_image();
        assert!(image.add_band("x", Raster::filled(test_grid(3, 1), 0.0)).is_err());
    }

    #[test]
    fn test_missing_band() {
        let image = two_band_image();
        assert!(matches!(image.band("B11"), Err(RasterError::MissingBand(b)) if b == "B11"));
    }

    #[test]
    fn test_select_keeps_metadata() {
        let ts = NaiveDate::from_ymd_opt(2020, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let mut image = two_band_image().with_timestamp(ts);
        image.set_property("cloud", 12.0);

        let selected = image.select("B8").unwrap();
        assert_eq!(selected.band_names(), vec!["B8"]);
        assert_eq!(selected.timestamp(), Some(ts));
        assert_eq!(selected.property("cloud"), Some(12.0));
    }

    #[test]
    fn test_expression_masks_non_finite() {
        let image = two_band_image();
        let ratio = image
            .expression(["B8", "B4"], |[nir, red]| (nir - red) / (nir - red))
            .unwrap();
        assert_eq!(ratio.get(0, 0), 1.0);
        assert!(ratio.get(1, 0).is_nan());
    }
}
