//! Data products used by the mask pipeline

/// A catalogue entry: where to find it and which band to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub key: &'static str,
    pub band: &'static str,
}

impl Product {
    /// NASADEM elevation, source of the DEM and its aspect.
    pub const NASADEM: Product = Product {
        key: "NASA/NASADEM_HGT/001",
        band: "elevation",
    };

    /// SRTM digital elevation model, 90 m. Its valid-data footprint is the
    /// land layer.
    pub const SRTM: Product = Product {
        key: "CGIAR/SRTM90_V4",
        band: "elevation",
    };

    /// JRC global surface water, occurrence in percent.
    pub const SURFACE_WATER: Product = Product {
        key: "JRC/GSW1_0/GlobalSurfaceWater",
        band: "occurrence",
    };

    /// Hansen global forest change; `lossyear` counts years since 2000.
    pub const FOREST_CHANGE: Product = Product {
        key: "UMD/hansen/global_forest_change_2021_v1_9",
        band: "lossyear",
    };

    pub const ALL: [Product; 4] = [
        Product::NASADEM,
        Product::SRTM,
        Product::SURFACE_WATER,
        Product::FOREST_CHANGE,
    ];

    pub fn from_key(key: &str) -> Option<Product> {
        Product::ALL.into_iter().find(|p| p.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(Product::from_key("CGIAR/SRTM90_V4"), Some(Product::SRTM));
        assert_eq!(
            Product::from_key("UMD/hansen/global_forest_change_2021_v1_9"),
            Some(Product::FOREST_CHANGE)
        );
        assert_eq!(Product::from_key("COPERNICUS/S2"), None);
    }
}
