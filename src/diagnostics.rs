//! Smoke test of a catalogue connection

use std::fmt;

use tracing::{info, warn};

use crate::catalog::Product;
use crate::session::Session;
use crate::utils::RasterSummary;

#[derive(Debug, Clone)]
pub struct ProductReport {
    pub key: &'static str,
    pub bands: Vec<String>,
    pub width: usize,
    pub height: usize,
    pub summary: RasterSummary,
}

#[derive(Debug, Clone)]
pub enum ProductCheck {
    Ok(ProductReport),
    Failed { key: &'static str, reason: String },
}

impl ProductCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProductCheck::Ok(_))
    }
}

impl fmt::Display for ProductCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductCheck::Ok(report) => write!(
                f,
                "{}: bands [{}], {}x{}, {}",
                report.key,
                report.bands.join(", "),
                report.width,
                report.height,
                report.summary
            ),
            ProductCheck::Failed { key, reason } => write!(f, "{}: FAILED ({})", key, reason),
        }
    }
}

/// Loads every catalogue product and summarises its main band.
pub fn smoke_test(session: &Session) -> Vec<ProductCheck> {
    Product::ALL
        .iter()
        .map(|product| {
            let loaded = session.load_image(product.key).and_then(|image| {
                let band = image.band(product.band)?;
                Ok(ProductReport {
                    key: product.key,
                    bands: image.band_names().iter().map(|b| b.to_string()).collect(),
                    width: band.width(),
                    height: band.height(),
                    summary: RasterSummary::new(band),
                })
            });

            match loaded {
                Ok(report) => {
                    info!("{} loaded", product.key);
                    ProductCheck::Ok(report)
                }
                Err(e) => {
                    warn!("{} failed: {}", product.key, e);
                    ProductCheck::Failed {
                        key: product.key,
                        reason: e.to_string(),
                    }
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use crate::raster::tests::test_grid;
    use crate::session::tests::catalog_with;

    #[test]
    fn test_all_products_reported() {
        let grid = test_grid(3, 3);
        let (dir, catalog) = catalog_with(
            &Raster::filled(grid, 120.0),
            &Raster::filled(grid, 0.0),
            &Raster::filled(grid, 0.0),
        );
        std::fs::remove_dir_all(dir.path().join(Product::FOREST_CHANGE.key)).unwrap();

        let session = Session::connect(&catalog).unwrap();
        let checks = smoke_test(&session);
        assert_eq!(checks.len(), 4);
        assert!(checks[..3].iter().all(ProductCheck::is_ok));
        assert!(!checks[3].is_ok());
        assert!(checks[1].to_string().starts_with("CGIAR/SRTM90_V4: bands [elevation], 3x3"));
    }
}
