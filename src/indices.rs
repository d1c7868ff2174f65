//! Spectral indices for Sentinel-2 imagery
//!
//! Every `add_*` function evaluates one closed-form expression over fixed
//! Sentinel-2 bands and appends the result as a band named after the index.
//! Existing bands are kept. A missing input band is reported as
//! [`RasterError::MissingBand`].
//!
//! Band assignments follow the processing scripts these indices come from,
//! including the red-edge bands used as "NIR"/"SWIR" by MCARI, MTCI, DNI45,
//! IRECI and REIP.

use std::fmt;
use std::str::FromStr;

use crate::raster::{Image, RasterError, Result};
use crate::sat_bands::Sentinel2Band::{self, B2, B3, B4, B5, B6, B7, B8, B11};

/// ARVI atmospheric self-correction coefficient.
const ARVI_GAMMA: f32 = 1.0;
/// SAVI soil adjustment factor.
const SAVI_L: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralIndex {
    /// Atmospherically Resistant Vegetation Index
    Arvi,
    /// Brightness Index
    Bi,
    /// Brightness Index 2
    Bi2,
    /// Chlorophyll Index
    Ci,
    /// Difference Vegetation Index
    Dvi,
    /// Global Environment Monitoring Index
    Gemi,
    /// Green Normalized Difference Vegetation Index
    Gndvi,
    /// Infrared Percentage Vegetation Index
    Ipvi,
    /// Inverted Red-Edge Chlorophyll Index
    Ireci,
    /// Modified Chlorophyll Absorption Ratio Index
    Mcari,
    /// Modified Normalized Difference Water Index
    Mndwi,
    /// Modified Soil-Adjusted Vegetation Index 2
    Msavi2,
    /// MERIS Terrestrial Chlorophyll Index
    Mtci,
    /// Normalized Difference Index 45
    Dni45,
    /// Normalized Difference Pond Index
    Ndpi,
    /// Normalized Difference Turbidity Index
    Ndti,
    /// Normalized Difference Water Index (NIR/SWIR)
    Ndwi,
    /// Normalized Difference Water Index 2 (green/NIR)
    Ndwi2,
    /// Pigment Specific Simple Ratio a
    Pssra,
    /// Red Edge Inflection Point
    Reip,
    /// Redness Index
    Ri,
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Soil-Adjusted Vegetation Index
    Savi,
    /// Transformed Normalized Difference Vegetation Index
    Tndvi,
    /// Vegetation Index (simple ratio)
    Vi,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 25] = [
        SpectralIndex::Arvi,
        SpectralIndex::Bi,
        SpectralIndex::Bi2,
        SpectralIndex::Ci,
        SpectralIndex::Dvi,
        SpectralIndex::Gemi,
        SpectralIndex::Gndvi,
        SpectralIndex::Ipvi,
        SpectralIndex::Ireci,
        SpectralIndex::Mcari,
        SpectralIndex::Mndwi,
        SpectralIndex::Msavi2,
        SpectralIndex::Mtci,
        SpectralIndex::Dni45,
        SpectralIndex::Ndpi,
        SpectralIndex::Ndti,
        SpectralIndex::Ndwi,
        SpectralIndex::Ndwi2,
        SpectralIndex::Pssra,
        SpectralIndex::Reip,
        SpectralIndex::Ri,
        SpectralIndex::Ndvi,
        SpectralIndex::Savi,
        SpectralIndex::Tndvi,
        SpectralIndex::Vi,
    ];

    /// Output band name.
    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::Arvi => "arvi",
            SpectralIndex::Bi => "bi",
            SpectralIndex::Bi2 => "bi2",
            SpectralIndex::Ci => "ci",
            SpectralIndex::Dvi => "dvi",
            SpectralIndex::Gemi => "gemi",
            SpectralIndex::Gndvi => "gndvi",
            SpectralIndex::Ipvi => "ipvi",
            SpectralIndex::Ireci => "ireci",
            SpectralIndex::Mcari => "mcari",
            SpectralIndex::Mndwi => "mndwi",
            SpectralIndex::Msavi2 => "msavi2",
            SpectralIndex::Mtci => "mtci",
            SpectralIndex::Dni45 => "dni45",
            SpectralIndex::Ndpi => "ndpi",
            SpectralIndex::Ndti => "ndti",
            SpectralIndex::Ndwi => "ndwi",
            SpectralIndex::Ndwi2 => "ndwi2",
            SpectralIndex::Pssra => "pssra",
            SpectralIndex::Reip => "reip",
            SpectralIndex::Ri => "ri",
            SpectralIndex::Ndvi => "ndvi",
            SpectralIndex::Savi => "savi",
            SpectralIndex::Tndvi => "tndvi",
            SpectralIndex::Vi => "vi",
        }
    }

    /// Input bands, in the order the formula uses them.
    pub fn bands(&self) -> &'static [Sentinel2Band] {
        match self {
            SpectralIndex::Arvi => &[B8, B4, B2],
            SpectralIndex::Bi | SpectralIndex::Ci | SpectralIndex::Ri => &[B4, B3],
            SpectralIndex::Bi2 => &[B4, B3, B8],
            SpectralIndex::Ndti => &[B4, B3],
            SpectralIndex::Dvi
            | SpectralIndex::Gemi
            | SpectralIndex::Ipvi
            | SpectralIndex::Msavi2
            | SpectralIndex::Ndvi
            | SpectralIndex::Savi
            | SpectralIndex::Tndvi
            | SpectralIndex::Vi => &[B8, B4],
            SpectralIndex::Gndvi => &[B8, B3],
            SpectralIndex::Ireci => &[B7, B4, B5, B6],
            SpectralIndex::Mcari => &[B5, B4, B3],
            SpectralIndex::Mndwi => &[B3, B11],
            SpectralIndex::Mtci => &[B6, B5, B4],
            SpectralIndex::Dni45 => &[B5, B4],
            SpectralIndex::Ndpi => &[B11, B3],
            SpectralIndex::Ndwi => &[B8, B11],
            SpectralIndex::Ndwi2 => &[B3, B8],
            SpectralIndex::Pssra => &[B7, B4],
            SpectralIndex::Reip => &[B4, B7, B5, B6],
        }
    }

    pub fn apply(&self, image: Image) -> Result<Image> {
        match self {
            SpectralIndex::Arvi => add_arvi(image),
            SpectralIndex::Bi => add_bi(image),
            SpectralIndex::Bi2 => add_bi2(image),
            SpectralIndex::Ci => add_ci(image),
            SpectralIndex::Dvi => add_dvi(image),
            SpectralIndex::Gemi => add_gemi(image),
            SpectralIndex::Gndvi => add_gndvi(image),
            SpectralIndex::Ipvi => add_ipvi(image),
            SpectralIndex::Ireci => add_ireci(image),
            SpectralIndex::Mcari => add_mcari(image),
            SpectralIndex::Mndwi => add_mndwi(image),
            SpectralIndex::Msavi2 => add_msavi2(image),
            SpectralIndex::Mtci => add_mtci(image),
            SpectralIndex::Dni45 => add_dni45(image),
            SpectralIndex::Ndpi => add_ndpi(image),
            SpectralIndex::Ndti => add_ndti(image),
            SpectralIndex::Ndwi => add_ndwi(image),
            SpectralIndex::Ndwi2 => add_ndwi2(image),
            SpectralIndex::Pssra => add_pssra(image),
            SpectralIndex::Reip => add_reip(image),
            SpectralIndex::Ri => add_ri(image),
            SpectralIndex::Ndvi => add_ndvi(image),
            SpectralIndex::Savi => add_savi(image),
            SpectralIndex::Tndvi => add_tndvi(image),
            SpectralIndex::Vi => add_vi(image),
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        SpectralIndex::ALL
            .iter()
            .copied()
            .find(|index| index.name() == lower)
            .ok_or_else(|| format!("unknown index '{}'", s))
    }
}

/// Appends each index in turn.
pub fn add_indices(image: Image, indices: &[SpectralIndex]) -> Result<Image> {
    indices.iter().try_fold(image, |image, index| index.apply(image))
}

fn add_band<const N: usize>(
    image: Image,
    name: &str,
    bands: [Sentinel2Band; N],
    f: impl Fn([f32; N]) -> f32,
) -> Result<Image> {
    let raster = image.expression(bands.map(|b| b.name()), f)?;
    image.add_band(name, raster)
}

fn normalized_difference(image: Image, name: &str, a: Sentinel2Band, b: Sentinel2Band) -> Result<Image> {
    add_band(image, name, [a, b], |[a, b]| (a - b) / (a + b))
}

/// ARVI = (NIR - rb) / (NIR + rb), with rb = R - γ (B - R) and γ = 1
pub fn add_arvi(image: Image) -> Result<Image> {
    add_band(image, "arvi", [B8, B4, B2], |[nir, red, blue]| {
        let rb = red - ARVI_GAMMA * (blue - red);
        (nir - rb) / (nir + rb)
    })
}

/// BI = sqrt((R² + G²) / 2)
pub fn add_bi(image: Image) -> Result<Image> {
    add_band(image, "bi", [B4, B3], |[red, green]| {
        ((red * red + green * green) / 2.0).sqrt()
    })
}

/// BI2 = sqrt((R² + G² + NIR²) / 3)
pub fn add_bi2(image: Image) -> Result<Image> {
    add_band(image, "bi2", [B4, B3, B8], |[red, green, nir]| {
        ((red * red + green * green + nir * nir) / 3.0).sqrt()
    })
}

/// CI = (R - G) / (R + G)
pub fn add_ci(image: Image) -> Result<Image> {
    normalized_difference(image, "ci", B4, B3)
}

/// DVI = NIR - R
pub fn add_dvi(image: Image) -> Result<Image> {
    add_band(image, "dvi", [B8, B4], |[nir, red]| nir - red)
}

/// GEMI = η (1 - 0.25 η) - (R - 0.125) / (1 - R), with
/// η = (2 (NIR² - R²) + 1.5 NIR + 0.5 R) / (NIR + R + 0.5)
pub fn add_gemi(image: Image) -> Result<Image> {
    add_band(image, "gemi", [B8, B4], |[nir, red]| {
        let eta = (2.0 * (nir * nir - red * red) + 1.5 * nir + 0.5 * red) / (nir + red + 0.5);
        eta * (1.0 - 0.25 * eta) - (red - 0.125) / (1.0 - red)
    })
}

/// GNDVI = (NIR - G) / (NIR + G)
pub fn add_gndvi(image: Image) -> Result<Image> {
    normalized_difference(image, "gndvi", B8, B3)
}

/// IPVI = NIR / (NIR + R)
pub fn add_ipvi(image: Image) -> Result<Image> {
    add_band(image, "ipvi", [B8, B4], |[nir, red]| nir / (nir + red))
}

/// IRECI = (B7 - B4) / (B5 / B6)
pub fn add_ireci(image: Image) -> Result<Image> {
    add_band(image, "ireci", [B7, B4, B5, B6], |[b7, b4, b5, b6]| {
        (b7 - b4) / (b5 / b6)
    })
}

/// MCARI = ((B5 - B4) - 0.2 (B5 - B3)) (B5 / B4)
pub fn add_mcari(image: Image) -> Result<Image> {
    add_band(image, "mcari", [B5, B4, B3], |[b5, b4, b3]| {
        ((b5 - b4) - 0.2 * (b5 - b3)) * (b5 / b4)
    })
}

/// MNDWI = (G - SWIR) / (G + SWIR)
pub fn add_mndwi(image: Image) -> Result<Image> {
    normalized_difference(image, "mndwi", B3, B11)
}

/// MSAVI2 = (2 NIR + 1 - sqrt((2 NIR + 1)² - 8 (NIR - R))) / 2
pub fn add_msavi2(image: Image) -> Result<Image> {
    add_band(image, "msavi2", [B8, B4], |[nir, red]| {
        let a = 2.0 * nir + 1.0;
        (a - (a * a - 8.0 * (nir - red)).sqrt()) / 2.0
    })
}

/// MTCI = (B6 - B5) / (B5 - B4)
pub fn add_mtci(image: Image) -> Result<Image> {
    add_band(image, "mtci", [B6, B5, B4], |[b6, b5, b4]| (b6 - b5) / (b5 - b4))
}

/// DNI45 = (B5 - B4) / (B5 + B4)
pub fn add_dni45(image: Image) -> Result<Image> {
    normalized_difference(image, "dni45", B5, B4)
}

/// NDPI = (SWIR - G) / (SWIR + G)
pub fn add_ndpi(image: Image) -> Result<Image> {
    normalized_difference(image, "ndpi", B11, B3)
}

/// NDTI = (R - G) / (R + G)
pub fn add_ndti(image: Image) -> Result<Image> {
    normalized_difference(image, "ndti", B4, B3)
}

/// NDWI = (NIR - SWIR) / (NIR + SWIR)
pub fn add_ndwi(image: Image) -> Result<Image> {
    normalized_difference(image, "ndwi", B8, B11)
}

/// NDWI2 = (G - NIR) / (G + NIR)
pub fn add_ndwi2(image: Image) -> Result<Image> {
    normalized_difference(image, "ndwi2", B3, B8)
}

/// PSSRa = B7 / B4
pub fn add_pssra(image: Image) -> Result<Image> {
    add_band(image, "pssra", [B7, B4], |[b7, b4]| b7 / b4)
}

/// REIP = 705 + 35 ((B4 + B7) / 2 - B5) / (B6 - B5)
pub fn add_reip(image: Image) -> Result<Image> {
    add_band(image, "reip", [B4, B7, B5, B6], |[b4, b7, b5, b6]| {
        705.0 + 35.0 * ((b4 + b7) / 2.0 - b5) / (b6 - b5)
    })
}

/// RI = R² / G³
pub fn add_ri(image: Image) -> Result<Image> {
    add_band(image, "ri", [B4, B3], |[red, green]| {
        (red * red) / (green * green * green)
    })
}

/// NDVI = (NIR - R) / (NIR + R)
pub fn add_ndvi(image: Image) -> Result<Image> {
    normalized_difference(image, "ndvi", B8, B4)
}

/// SAVI = (1 + L) (NIR - R) / (NIR + R + L), with L = 0.5
pub fn add_savi(image: Image) -> Result<Image> {
    add_band(image, "savi", [B8, B4], |[nir, red]| {
        (1.0 + SAVI_L) * ((nir - red) / (nir + red + SAVI_L))
    })
}

/// TNDVI = sqrt((NIR - R) / (NIR + R) + 0.5)
pub fn add_tndvi(image: Image) -> Result<Image> {
    add_band(image, "tndvi", [B8, B4], |[nir, red]| {
        ((nir - red) / (nir + red) + 0.5).sqrt()
    })
}

/// VI = NIR / R
pub fn add_vi(image: Image) -> Result<Image> {
    add_band(image, "vi", [B8, B4], |[nir, red]| nir / red)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use crate::raster::tests::test_grid;

    /// Two pixels with constant reflectances; the second one has no data.
    fn scene() -> Image {
        let grid = test_grid(2, 1);
        let values = [
            (B2, 0.1),
            (B3, 0.15),
            (B4, 0.2),
            (B5, 0.25),
            (B6, 0.3),
            (B7, 0.35),
            (B8, 0.5),
            (B11, 0.3),
        ];

        let mut image = Image::new(grid);
        for (band, value) in values {
            let raster = Raster::new(grid, vec![value, f32::NAN]).unwrap();
            image = image.add_band(band.name(), raster).unwrap();
        }
        image
    }

    fn value_of(index: SpectralIndex) -> f32 {
        let image = index.apply(scene()).unwrap();
        image.band(index.name()).unwrap().get(0, 0)
    }

    #[test]
    fn test_index_values() {
        let expected = [
            (SpectralIndex::Arvi, 0.25),
            (SpectralIndex::Bi, 0.176_776_7),
            (SpectralIndex::Bi2, 0.322_748_6),
            (SpectralIndex::Ci, 0.142_857_1),
            (SpectralIndex::Dvi, 0.3),
            (SpectralIndex::Gemi, 0.684_566),
            (SpectralIndex::Gndvi, 0.538_461_5),
            (SpectralIndex::Ipvi, 0.714_285_7),
            (SpectralIndex::Ireci, 0.18),
            (SpectralIndex::Mcari, 0.0375),
            (SpectralIndex::Mndwi, -0.333_333_3),
            (SpectralIndex::Msavi2, 0.367_544_5),
            (SpectralIndex::Mtci, 1.0),
            (SpectralIndex::Dni45, 0.111_111_1),
            (SpectralIndex::Ndpi, 0.333_333_3),
            (SpectralIndex::Ndti, 0.142_857_1),
            (SpectralIndex::Ndwi, 0.25),
            (SpectralIndex::Ndwi2, -0.538_461_5),
            (SpectralIndex::Pssra, 1.75),
            (SpectralIndex::Reip, 722.5),
            (SpectralIndex::Ri, 11.851_852),
            (SpectralIndex::Ndvi, 0.428_571_4),
            (SpectralIndex::Savi, 0.375),
            (SpectralIndex::Tndvi, 0.963_624_1),
            (SpectralIndex::Vi, 2.5),
        ];

        assert_eq!(expected.len(), SpectralIndex::ALL.len());
        for (index, value) in expected {
            let got = value_of(index);
            assert!(
                (got - value).abs() < 1e-3 * value.abs().max(1.0),
                "{index}: expected {value}, got {got}"
            );
        }
    }

    #[test]
    fn test_input_bands_are_kept() {
        let image = add_ndvi(scene()).unwrap();
        assert_eq!(image.bands().len(), 9);
        assert_eq!(image.band_names().last(), Some(&"ndvi"));
    }

    #[test]
    fn test_nodata_propagates() {
        let image = add_savi(scene()).unwrap();
        assert!(image.band("savi").unwrap().get(1, 0).is_nan());
    }

    #[test]
    fn test_missing_band_is_an_error() {
        let image = Image::from_band("B8", Raster::filled(test_grid(1, 1), 0.5));
        assert!(matches!(add_ndvi(image), Err(RasterError::MissingBand(b)) if b == "B4"));
    }

    #[test]
    fn test_add_indices_in_order() {
        let image = add_indices(scene(), &[SpectralIndex::Ndvi, SpectralIndex::Mndwi]).unwrap();
        let names = image.band_names();
        assert_eq!(&names[names.len() - 2..], &["ndvi", "mndwi"]);
    }

    #[test]
    fn test_parse_index_names() {
        assert_eq!("NDVI".parse::<SpectralIndex>().unwrap(), SpectralIndex::Ndvi);
        assert_eq!("msavi2".parse::<SpectralIndex>().unwrap(), SpectralIndex::Msavi2);
        assert!("evi".parse::<SpectralIndex>().is_err());
    }

    #[test]
    fn test_declared_bands_match_formulas() {
        for index in SpectralIndex::ALL {
            let grid = test_grid(1, 1);
            let mut image = Image::new(grid);
            for band in index.bands() {
                image = image
                    .add_band(band.name(), Raster::filled(grid, 0.3))
                    .unwrap();
            }
            assert!(index.apply(image).is_ok(), "{index}");
        }
    }
}
