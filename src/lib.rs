//! Terrain, water, land and forest-loss masks plus Sentinel-2 spectral
//! indices over a local raster catalogue.

pub mod catalog;
pub mod collection;
pub mod config;
pub mod diagnostics;
pub mod export;
pub mod indices;
pub mod masks;
pub mod raster;
pub mod readers;
pub mod region;
pub mod sat_bands;
pub mod session;
pub mod tabular;
pub mod utils;

pub use collection::{ImageCollection, TimeSeries};
pub use config::{Config, MaskConfig};
pub use masks::Masks;
pub use raster::{Image, Mask, Raster};
pub use region::Region;
pub use session::Session;
