//! Exclusion masks for a region
//!
//! A [`Masks`] instance holds every layer needed to build the masks of one
//! region, all resampled onto the DEM grid: elevation, aspect, surface water
//! occurrence, land and forest loss year. Individual masks are computed on
//! demand. The combined mask is the AND of the masks enabled in the
//! [`MaskConfig`], seeded with the region's footprint. Region and
//! configuration are fixed at construction; another configuration needs
//! another instance.
//!
//! Every mask follows the multiplicative convention: `true` keeps a pixel,
//! `false` excludes it.

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Product;
use crate::config::{ConfigError, ForestLossMask, MaskConfig, RawMaskConfig};
use crate::export::{ExportError, ExportTask, check_pixels};
use crate::raster::distance::beyond_distance;
use crate::raster::focal::{DEFAULT_DESPECKLE_SIZE, KernelShape, despeckle};
use crate::raster::terrain::aspect;
use crate::raster::{Grid, Image, Mask, Raster, RasterError};
use crate::region::Region;
use crate::session::{Session, SessionError, TaskId};

#[derive(Error, Debug)]
pub enum MaskError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Aspect sector kept by an orbit direction. Flat cells and cells without
/// elevation have no aspect and fall outside both sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orbit {
    /// West-facing slopes, (202.5, 337.5).
    Ascending,
    /// East-facing slopes, (22.5, 157.5).
    Descending,
}

impl Orbit {
    fn sector(&self) -> (f32, f32) {
        match self {
            Orbit::Ascending => (202.5, 337.5),
            Orbit::Descending => (22.5, 157.5),
        }
    }

    fn keeps(&self, aspect: f32) -> bool {
        let (low, high) = self.sector();
        aspect > low && aspect < high
    }
}

fn aspect_mask(aspect: &Raster, orbit: Orbit) -> Result<Mask, RasterError> {
    let kept = aspect.map(|v| if orbit.keeps(v) { 1.0 } else { 0.0 });
    let smoothed = despeckle(
        &Image::from_band("aspect", kept),
        DEFAULT_DESPECKLE_SIZE,
        KernelShape::Circle,
    )?;
    let band = smoothed.band("aspect")?;
    Ok(Mask::from_fn(*band.grid(), |col, row| band.get(col, row) >= 0.5))
}

fn buffer_distance(kind: &str, buffer: i64) -> Option<f64> {
    if buffer <= 0 {
        warn!("{} mask buffer must be positive, got {}; mask skipped", kind, buffer);
        return None;
    }
    Some(buffer as f64)
}

fn apply(image: &Image, mask: Option<Mask>) -> Result<Image, RasterError> {
    match mask {
        None => Ok(image.clone()),
        Some(mask) if mask.grid() == image.grid() => image.update_mask(&mask),
        Some(mask) => image.update_mask(&mask.resample(image.grid())),
    }
}

#[derive(Debug, Clone)]
pub struct Masks {
    region: Region,
    config: MaskConfig,
    footprint: Mask,
    dem: Raster,
    aspect: Raster,
    ascending: Mask,
    descending: Mask,
    occurrence: Raster,
    land: Mask,
    lossyear: Raster,
    combined: Option<Mask>,
}

impl Masks {
    /// Loads and aligns the layers of `region`.
    pub fn new(session: &Session, region: &Region, config: &MaskConfig) -> Result<Self, MaskError> {
        let elevation = session.load(&Product::NASADEM)?;
        let (col, row, width, height) = elevation
            .grid()
            .window(region.bbox())
            .ok_or(RasterError::NoOverlap)?;
        let dem = elevation.crop(col, row, width, height);
        let grid = *dem.grid();
        info!("mask grid {}x{} for region {:?}", grid.width, grid.height, region.bbox());

        let footprint = grid.footprint(region);
        let aspect = aspect(&dem);
        let ascending = aspect_mask(&aspect, Orbit::Ascending)?;
        let descending = aspect_mask(&aspect, Orbit::Descending)?;

        let occurrence = session.load(&Product::SURFACE_WATER)?.resample(&grid);
        let lossyear = session.load(&Product::FOREST_CHANGE)?.resample(&grid);
        let land = session.load(&Product::SRTM)?.resample(&grid).valid_mask();
        let dem = dem.update_mask(&footprint)?;

        Ok(Self {
            region: region.clone(),
            config: config.clone(),
            footprint,
            dem,
            aspect,
            ascending,
            descending,
            occurrence,
            land,
            lossyear,
            combined: None,
        })
    }

    /// Same as [`Masks::new`], from the configuration as written in JSON.
    pub fn from_raw(
        session: &Session,
        region: &Region,
        raw: &RawMaskConfig,
    ) -> Result<Self, MaskError> {
        let config = MaskConfig::from_raw(raw)?;
        Masks::new(session, region, &config)
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        self.dem.grid()
    }

    /// Elevation clipped to the region.
    pub fn dem(&self) -> &Raster {
        &self.dem
    }

    /// Aspect in degrees clockwise from north.
    pub fn aspect(&self) -> &Raster {
        &self.aspect
    }

    pub fn ascending_mask(&self) -> &Mask {
        &self.ascending
    }

    pub fn descending_mask(&self) -> &Mask {
        &self.descending
    }

    /// The last combined mask, if it is up to date.
    pub fn combined_mask(&self) -> Option<&Mask> {
        self.combined.as_ref()
    }

    /// Pixels farther than `buffer` metres from any observed surface water.
    pub fn surface_water_mask(&self, buffer: i64) -> Option<Mask> {
        let distance = buffer_distance("surface water", buffer)?;
        Some(beyond_distance(&self.occurrence.nonzero_mask(), distance))
    }

    /// Pixels farther than `buffer` metres from any pixel without land.
    pub fn land_mask(&self, buffer: i64) -> Option<Mask> {
        let distance = buffer_distance("land", buffer)?;
        Some(beyond_distance(&self.land.not(), distance))
    }

    /// Pixels farther than `buffer` metres from forest lost between the
    /// years of `start` and `end`, both included.
    pub fn forest_loss_mask(&self, start: NaiveDate, end: NaiveDate, buffer: i64) -> Option<Mask> {
        let distance = buffer_distance("forest loss", buffer)?;

        // lossyear counts years since 2000, 0 means no loss
        let (first, last) = (start.year() - 2000, end.year() - 2000);
        let lost = self.lossyear.map(|v| {
            let lost = !v.is_nan() && v > 0.0 && (first..=last).contains(&(v.round() as i32));
            if lost { 1.0 } else { 0.0 }
        });
        Some(beyond_distance(&lost.nonzero_mask(), distance))
    }

    pub fn apply_surface_water_mask(&self, image: &Image, buffer: i64) -> Result<Image, RasterError> {
        apply(image, self.surface_water_mask(buffer))
    }

    pub fn apply_land_mask(&self, image: &Image, buffer: i64) -> Result<Image, RasterError> {
        apply(image, self.land_mask(buffer))
    }

    pub fn apply_forest_loss_mask(
        &self,
        image: &Image,
        start: NaiveDate,
        end: NaiveDate,
        buffer: i64,
    ) -> Result<Image, RasterError> {
        apply(image, self.forest_loss_mask(start, end, buffer))
    }

    /// Masks enabled by the configuration, in combination order.
    fn enabled_masks(&self) -> Vec<Mask> {
        let config = &self.config;
        let mut masks = Vec::new();

        if let Some(mask) = config
            .surface_water
            .buffer()
            .and_then(|b| self.surface_water_mask(b))
        {
            masks.push(mask);
        }
        if let Some(mask) = config.land.buffer().and_then(|b| self.land_mask(b)) {
            masks.push(mask);
        }
        if config.aspect_ascending.is_enabled() {
            masks.push(self.ascending.clone());
        }
        if config.aspect_descending.is_enabled() {
            masks.push(self.descending.clone());
        }
        if let ForestLossMask::Enabled { buffer, start, end } = config.forest_loss {
            if config.include_forest_loss {
                masks.extend(self.forest_loss_mask(start, end, buffer));
            } else {
                debug!("forest loss mask configured but not included in the combined mask");
            }
        }
        masks
    }

    /// AND of the region footprint and every enabled mask. The result is
    /// stored and reused by the other combined-mask operations.
    pub fn calculate_combined_mask(&mut self) -> Result<&Mask, RasterError> {
        let mut combined = self.footprint.clone();
        for mask in self.enabled_masks() {
            combined = combined.and(&mask)?;
        }
        debug!("combined mask keeps {} of {} pixels", combined.count(), self.grid().len());
        Ok(self.combined.insert(combined))
    }

    fn ensure_combined(&mut self) -> Result<Mask, RasterError> {
        match &self.combined {
            Some(mask) => Ok(mask.clone()),
            None => self.calculate_combined_mask().cloned(),
        }
    }

    pub fn update_combined_mask(&mut self, image: &Image) -> Result<Image, RasterError> {
        let mask = self.ensure_combined()?;
        apply(image, Some(mask))
    }

    /// Resamples the combined mask to `scale` metres and hands it to the
    /// session as a background export. Returns without waiting.
    pub fn export_combined_mask<P: AsRef<Path>>(
        &mut self,
        session: &Session,
        scale: f64,
        description: &str,
        folder: P,
    ) -> Result<TaskId, MaskError> {
        let mask = self.ensure_combined()?;
        check_pixels(mask.grid().scaled_pixel_count(scale)?)?;
        let target = mask.grid().with_scale(scale)?;

        let task = ExportTask::new(mask.resample(&target).to_raster(), description, folder)?;
        Ok(session.submit(task)?)
    }
}
