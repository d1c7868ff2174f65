use chrono::NaiveDate;

use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::region::Region;

pub mod error;
pub use error::ConfigError;

pub mod mask;
pub use mask::{AspectFilter, BufferedMask, ForestLossMask, MaskConfig, RawMaskConfig};

/// Where the data products live.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CatalogConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub account: Option<String>,
    /// Product key to directory, relative to `root`. Keys not listed here
    /// resolve to `root/<key>`.
    #[serde(default)]
    pub products: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ExportConfig {
    pub folder: PathBuf,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_description")]
    pub description: String,
}

fn default_scale() -> f64 {
    30.0
}

fn default_description() -> String {
    "combined_mask".to_string()
}

#[derive(Debug, Clone)]
pub struct Config {
    start_date: NaiveDate,
    end_date: NaiveDate,
    region: Region,
    catalog: CatalogConfig,
    masks: MaskConfig,
    collection: Option<PathBuf>,
    export: Option<ExportConfig>,
}

// Deserializes a Config, checking that the dates are valid and in order, that the region is a
// valid polygon and that the mask configuration is well formed.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            start_date: String,
            end_date: String,
            region: Vec<[f64; 2]>,
            catalog: CatalogConfig,
            #[serde(default)]
            masks: RawMaskConfig,
            collection: Option<PathBuf>,
            export: Option<ExportConfig>,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        let start_date = NaiveDate::parse_from_str(&helper.start_date, "%Y-%m-%d")
            .map_err(|e| D::Error::custom(format!("Invalid start_date format: {}", e)))?;

        let end_date = NaiveDate::parse_from_str(&helper.end_date, "%Y-%m-%d")
            .map_err(|e| D::Error::custom(format!("Invalid end_date format: {}", e)))?;

        if start_date > end_date {
            return Err(D::Error::custom(ConfigError::DateOrder));
        }

        let region = Region::new(helper.region.iter().map(|p| (p[0], p[1])).collect())
            .map_err(|e| D::Error::custom(ConfigError::Region(e)))?;

        let masks = MaskConfig::from_raw(&helper.masks).map_err(D::Error::custom)?;

        Ok(Config {
            start_date,
            end_date,
            region,
            catalog: helper.catalog,
            masks,
            collection: helper.collection,
            export: helper.export,
        })
    }
}

impl Config {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        region: Region,
        catalog: CatalogConfig,
    ) -> Self {
        Self {
            start_date,
            end_date,
            region,
            catalog,
            masks: MaskConfig::default(),
            collection: None,
            export: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn catalog(&self) -> &CatalogConfig {
        &self.catalog
    }

    pub fn masks(&self) -> &MaskConfig {
        &self.masks
    }

    pub fn collection(&self) -> Option<&Path> {
        self.collection.as_deref()
    }

    pub fn export(&self) -> Option<&ExportConfig> {
        self.export.as_ref()
    }
}
