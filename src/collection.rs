//! Time-ordered image collections
//!
//! Collections are filtered by acquisition time and reduced with pixel-wise
//! means. Monthly compositing is exposed through the [`TimeSeries`] trait.

use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::raster::{Image, Raster, RasterError};
use crate::readers::{ReadError, date_from_name, open_image};

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("collection is empty")]
    Empty,

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageCollection {
    images: Vec<Image>,
}

impl ImageCollection {
    pub fn new(images: Vec<Image>) -> Self {
        Self { images }
    }

    /// Loads every scene directory under `dir` whose name carries a
    /// `YYYYMMDD` date, ordered by acquisition time. Dated directories
    /// without band files are skipped.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, CollectionError> {
        let mut images = Vec::new();
        for entry in WalkDir::new(dir.as_ref()).min_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            if date_from_name(&entry.file_name().to_string_lossy()).is_none() {
                continue;
            }

            match open_image(entry.path()) {
                Ok(image) => images.push(image),
                Err(ReadError::NoBands(path)) => {
                    warn!("no band files in {}, skipped", path.display())
                }
                Err(e) => return Err(e.into()),
            }
        }

        images.sort_by_key(|image| image.timestamp());
        info!("loaded {} scenes from {}", images.len(), dir.as_ref().display());
        Ok(Self { images })
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn push(&mut self, image: Image) {
        self.images.push(image);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Image> {
        self.images.iter()
    }

    /// Applies `f` to every image, stopping at the first error.
    pub fn try_map<E>(&self, mut f: impl FnMut(&Image) -> Result<Image, E>) -> Result<Self, E> {
        let images = self
            .images
            .iter()
            .map(|image| f(image))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self { images })
    }

    fn filter(&self, keep: impl Fn(&Image) -> bool) -> Self {
        Self {
            images: self.images.iter().filter(|i| keep(*i)).cloned().collect(),
        }
    }

    /// Images acquired in `[start, end)`. Images without a timestamp are dropped.
    pub fn filter_date(&self, start: NaiveDate, end: NaiveDate) -> Self {
        self.filter(|image| in_period(image.timestamp(), start, end))
    }

    pub fn filter_year(&self, year: i32) -> Self {
        self.filter(|image| image.timestamp().is_some_and(|t| t.year() == year))
    }

    /// Pixel-wise mean of every band of the first image. No-data values are
    /// ignored; a pixel without data in every image stays no-data.
    pub fn mean(&self) -> Result<Image, CollectionError> {
        let first = self.images.first().ok_or(CollectionError::Empty)?;
        let grid = *first.grid();

        let mut out = Image::new(grid);
        for name in first.band_names() {
            let mut sum = Raster::filled(grid, 0.0);
            let mut count = Raster::filled(grid, 0.0);
            for image in &self.images {
                let band = image.band(name)?;
                sum = sum.zip_with(band, |s, v| if v.is_nan() { s } else { s + v })?;
                count = count.zip_with(band, |n, v| if v.is_nan() { n } else { n + 1.0 })?;
            }
            let mean = sum.zip_with(&count, |s, n| if n > 0.0 { s / n } else { f32::NAN })?;
            out = out.add_band(name, mean)?;
        }
        Ok(out)
    }
}

fn in_period(timestamp: Option<NaiveDateTime>, start: NaiveDate, end: NaiveDate) -> bool {
    timestamp.is_some_and(|t| t.date() >= start && t.date() < end)
}

impl FromIterator<Image> for ImageCollection {
    fn from_iter<T: IntoIterator<Item = Image>>(iter: T) -> Self {
        Self {
            images: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ImageCollection {
    type Item = Image;
    type IntoIter = std::vec::IntoIter<Image>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_iter()
    }
}

pub trait TimeSeries: Sized {
    /// Mean composite of each calendar month of `year` that has images,
    /// tagged with a `month` property and a first-of-month timestamp.
    fn by_month(&self, year: i32) -> Result<Self, CollectionError>;

    /// Everything except the images acquired in `[start, end)`.
    fn remove_period(&self, start: NaiveDate, end: NaiveDate) -> Self;
}

impl TimeSeries for ImageCollection {
    fn by_month(&self, year: i32) -> Result<Self, CollectionError> {
        let in_year = self.filter_year(year);
        let mut composites = Vec::new();

        for month in 1..=12u32 {
            let images = in_year.filter(|image| image.timestamp().is_some_and(|t| t.month() == month));
            if images.is_empty() {
                debug!("no images for {}-{:02}", year, month);
                continue;
            }

            let mut composite = images.mean()?;
            composite.set_property("month", month as f64);
            composite.set_timestamp(
                NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
            );
            composites.push(composite);
        }

        Ok(Self { images: composites })
    }

    fn remove_period(&self, start: NaiveDate, end: NaiveDate) -> Self {
        self.filter(|image| !in_period(image.timestamp(), start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::tests::test_grid;
    use crate::readers::write_geotiff;
    use tempfile::tempdir;

    fn scene(y: i32, m: u32, d: u32, value: f32) -> Image {
        let ts = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        Image::from_band("ndvi", Raster::filled(test_grid(2, 2), value)).with_timestamp(ts)
    }

    fn year_2020() -> ImageCollection {
        ImageCollection::new(vec![
            scene(2019, 12, 31, 9.0),
            scene(2020, 1, 5, 0.2),
            scene(2020, 1, 20, 0.4),
            scene(2020, 3, 1, 0.6),
            scene(2020, 7, 15, 0.8),
            scene(2021, 1, 1, 9.0),
        ])
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_filter_date_is_half_open() {
        let collection = year_2020();
        let january = collection.filter_date(date(2020, 1, 5), date(2020, 1, 20));
        assert_eq!(january.len(), 1);
        assert_eq!(collection.filter_year(2020).len(), 4);
    }

    #[test]
    fn test_by_month_skips_empty_months() {
        let monthly = year_2020().by_month(2020).unwrap();
        let months: Vec<f64> = monthly.iter().filter_map(|i| i.property("month")).collect();
        assert_eq!(months, vec![1.0, 3.0, 7.0]);

        let january = &monthly.images()[0];
        assert!((january.band("ndvi").unwrap().get(0, 0) - 0.3).abs() < 1e-6);
        assert_eq!(
            january.timestamp(),
            date(2020, 1, 1).and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn test_by_month_empty_year() {
        assert!(year_2020().by_month(2015).unwrap().is_empty());
    }

    #[test]
    fn test_remove_period() {
        let collection = year_2020();
        let (start, end) = (date(2020, 1, 1), date(2020, 4, 1));
        let rest = collection.remove_period(start, end);
        assert_eq!(rest.len(), 3);
        assert!(rest.filter_date(start, end).is_empty());
        assert_eq!(collection.filter_date(start, end).len(), 3);

        let mut undated = collection.clone();
        undated.push(Image::from_band("ndvi", Raster::filled(test_grid(2, 2), 0.0)));
        assert_eq!(undated.remove_period(date(2000, 1, 1), date(2100, 1, 1)).len(), 1);
        assert!(undated.filter_date(date(2000, 1, 1), date(2100, 1, 1)).len() == 6);
    }

    #[test]
    fn test_mean_ignores_nodata() {
        let grid = test_grid(2, 1);
        let collection = ImageCollection::new(vec![
            Image::from_band("b", Raster::new(grid, vec![1.0, f32::NAN]).unwrap()),
            Image::from_band("b", Raster::new(grid, vec![3.0, f32::NAN]).unwrap()),
        ]);
        let mean = collection.mean().unwrap();
        let band = mean.band("b").unwrap();
        assert_eq!(band.get(0, 0), 2.0);
        assert!(band.get(1, 0).is_nan());

        assert!(matches!(
            ImageCollection::default().mean(),
            Err(CollectionError::Empty)
        ));
    }

    #[test]
    fn test_load_scene_directories() {
        let root = tempdir().unwrap();
        let grid = test_grid(2, 2);
        for (name, value) in [("S2A_20200301T1000", 0.6), ("S2B_20200105T1000", 0.2)] {
            let dir = root.path().join("tiles").join(name);
            std::fs::create_dir_all(&dir).unwrap();
            write_geotiff(dir.join("B4.tif"), &Raster::filled(grid, value)).unwrap();
        }
        std::fs::create_dir_all(root.path().join("S2A_20200401_empty")).unwrap();

        let collection = ImageCollection::load(root.path()).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.images()[0].timestamp().map(|t| t.date()),
            Some(date(2020, 1, 5))
        );
    }
}
