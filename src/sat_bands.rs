use std::fmt::Display;

/// Sentinel-2 MSI bands, named as in the Level-2A products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel2Band {
    B1,
    B2,
    B3,
    B4,
    B5,
    B6,
    B7,
    B8,
    B8A,
    B9,
    B11,
    B12,
}

impl Sentinel2Band {
    pub fn name(&self) -> &'static str {
        match self {
            Sentinel2Band::B1 => "B1",
            Sentinel2Band::B2 => "B2",
            Sentinel2Band::B3 => "B3",
            Sentinel2Band::B4 => "B4",
            Sentinel2Band::B5 => "B5",
            Sentinel2Band::B6 => "B6",
            Sentinel2Band::B7 => "B7",
            Sentinel2Band::B8 => "B8",
            Sentinel2Band::B8A => "B8A",
            Sentinel2Band::B9 => "B9",
            Sentinel2Band::B11 => "B11",
            Sentinel2Band::B12 => "B12",
        }
    }

    /// Central wavelength in nm (Sentinel-2A).
    pub fn wavelength(&self) -> u32 {
        match self {
            Sentinel2Band::B1 => 443,
            Sentinel2Band::B2 => 490,
            Sentinel2Band::B3 => 560,
            Sentinel2Band::B4 => 665,
            Sentinel2Band::B5 => 705,
            Sentinel2Band::B6 => 740,
            Sentinel2Band::B7 => 783,
            Sentinel2Band::B8 => 842,
            Sentinel2Band::B8A => 865,
            Sentinel2Band::B9 => 945,
            Sentinel2Band::B11 => 1610,
            Sentinel2Band::B12 => 2190,
        }
    }
}

impl Display for Sentinel2Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} nm)", self.name(), self.wavelength())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Sentinel2Band::B4.to_string(), "B4 (665 nm)");
        assert_eq!(Sentinel2Band::B8A.to_string(), "B8A (865 nm)");
    }
}
