//! Which masks to build, and with what parameters
//!
//! The JSON shape is the one used by the processing scripts:
//!
//! ```json
//! { "gsw": 50, "lmask": 30, "aspectAsc": 0, "aspectDes": 3,
//!   "forestMask": [30, "2015-01-01", "2019-12-31"] }
//! ```
//!
//! Water and land masks are enabled by a strictly positive buffer. The aspect
//! entries are triggers rather than distances: an aspect mask is enabled only
//! when its value is exactly 0.

use chrono::NaiveDate;
use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMaskConfig {
    pub gsw: Option<i64>,
    pub lmask: Option<i64>,
    pub aspect_des: Option<i64>,
    pub aspect_asc: Option<i64>,
    pub forest_mask: Option<Vec<Value>>,
    #[serde(default)]
    pub include_forest_loss: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferedMask {
    #[default]
    Disabled,
    /// Buffer distance in metres, always > 0.
    Enabled { buffer: i64 },
}

impl BufferedMask {
    pub fn from_raw(value: Option<i64>) -> Self {
        match value {
            Some(buffer) if buffer > 0 => BufferedMask::Enabled { buffer },
            _ => BufferedMask::Disabled,
        }
    }

    pub fn buffer(&self) -> Option<i64> {
        match self {
            BufferedMask::Enabled { buffer } => Some(*buffer),
            BufferedMask::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectFilter {
    #[default]
    Disabled,
    Enabled,
}

impl AspectFilter {
    pub fn from_raw(value: Option<i64>) -> Self {
        match value {
            Some(0) => AspectFilter::Enabled,
            _ => AspectFilter::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, AspectFilter::Enabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForestLossMask {
    #[default]
    Disabled,
    Enabled {
        buffer: i64,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl ForestLossMask {
    /// Parses the `[buffer, start_date, end_date]` triple. A malformed entry
    /// is an error even when the buffer would leave the mask disabled.
    pub fn from_raw(value: Option<&[Value]>) -> Result<Self, ConfigError> {
        let Some(fields) = value else {
            return Ok(ForestLossMask::Disabled);
        };

        if fields.len() != 3 {
            return Err(ConfigError::ForestMaskArity(fields.len()));
        }

        let buffer = fields[0].as_i64().ok_or_else(|| {
            ConfigError::ForestMaskValue(format!("buffer {} is not an integer", fields[0]))
        })?;
        let start = parse_date(&fields[1])?;
        let end = parse_date(&fields[2])?;

        if start > end {
            return Err(ConfigError::DateOrder);
        }

        if buffer > 0 {
            Ok(ForestLossMask::Enabled { buffer, start, end })
        } else {
            Ok(ForestLossMask::Disabled)
        }
    }
}

fn parse_date(value: &Value) -> Result<NaiveDate, ConfigError> {
    let text = value
        .as_str()
        .ok_or_else(|| ConfigError::ForestMaskValue(format!("date {} is not a string", value)))?;
    Ok(NaiveDate::parse_from_str(text, "%Y-%m-%d")?)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskConfig {
    pub surface_water: BufferedMask,
    pub land: BufferedMask,
    pub aspect_ascending: AspectFilter,
    pub aspect_descending: AspectFilter,
    pub forest_loss: ForestLossMask,
    /// Whether the combined mask includes forest loss. Off unless asked for.
    pub include_forest_loss: bool,
    /// Values as given, disabled entries included.
    pub raw: RawMaskConfig,
}

impl MaskConfig {
    pub fn from_raw(raw: &RawMaskConfig) -> Result<Self, ConfigError> {
        Ok(MaskConfig {
            surface_water: BufferedMask::from_raw(raw.gsw),
            land: BufferedMask::from_raw(raw.lmask),
            aspect_ascending: AspectFilter::from_raw(raw.aspect_asc),
            aspect_descending: AspectFilter::from_raw(raw.aspect_des),
            forest_loss: ForestLossMask::from_raw(raw.forest_mask.as_deref())?,
            include_forest_loss: raw.include_forest_loss,
            raw: raw.clone(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawMaskConfig = serde_json::from_str(text)?;
        MaskConfig::from_raw(&raw)
    }
}

impl<'de> Deserialize<'de> for MaskConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawMaskConfig::deserialize(deserializer)?;
        MaskConfig::from_raw(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_trigger_is_exactly_zero() {
        let enabled = MaskConfig::from_json(r#"{"aspectAsc": 0}"#).unwrap();
        assert_eq!(enabled.aspect_ascending, AspectFilter::Enabled);
        assert_eq!(enabled.aspect_descending, AspectFilter::Disabled);

        let five = MaskConfig::from_json(r#"{"aspectAsc": 5}"#).unwrap();
        assert_eq!(five.aspect_ascending, AspectFilter::Disabled);
        assert_eq!(five.raw.aspect_asc, Some(5));

        let missing = MaskConfig::from_json("{}").unwrap();
        assert_eq!(missing.aspect_ascending, AspectFilter::Disabled);
    }

    #[test]
    fn test_buffers_enable_only_when_positive() {
        let config = MaskConfig::from_json(r#"{"gsw": 50, "lmask": 0}"#).unwrap();
        assert_eq!(config.surface_water, BufferedMask::Enabled { buffer: 50 });
        assert_eq!(config.land, BufferedMask::Disabled);

        let negative = MaskConfig::from_json(r#"{"gsw": -1}"#).unwrap();
        assert_eq!(negative.surface_water.buffer(), None);
    }

    #[test]
    fn test_forest_mask_triple() {
        let config =
            MaskConfig::from_json(r#"{"forestMask": [30, "2015-01-01", "2019-12-31"]}"#).unwrap();
        assert_eq!(
            config.forest_loss,
            ForestLossMask::Enabled {
                buffer: 30,
                start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(),
            }
        );
        assert!(!config.include_forest_loss);
    }

    #[test]
    fn test_forest_mask_wrong_arity() {
        let err = MaskConfig::from_json(r#"{"forestMask": [30, "2015-01-01"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ForestMaskArity(2)));

        let err =
            MaskConfig::from_json(r#"{"forestMask": [30, "2015-01-01", "2019-12-31", 1]}"#)
                .unwrap_err();
        assert!(matches!(err, ConfigError::ForestMaskArity(4)));
    }

    #[test]
    fn test_forest_mask_bad_values() {
        assert!(matches!(
            MaskConfig::from_json(r#"{"forestMask": ["30", "2015-01-01", "2019-12-31"]}"#),
            Err(ConfigError::ForestMaskValue(_))
        ));
        assert!(matches!(
            MaskConfig::from_json(r#"{"forestMask": [30, "2015-13-01", "2019-12-31"]}"#),
            Err(ConfigError::DateParse(_))
        ));
        assert!(matches!(
            MaskConfig::from_json(r#"{"forestMask": [30, "2019-01-01", "2015-12-31"]}"#),
            Err(ConfigError::DateOrder)
        ));
    }
}
