use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Bbox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Bbox {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Self, String> {
        if !(-180.0..=180.0).contains(&xmin) || !(-180.0..=180.0).contains(&xmax) {
            return Err("Longitude values must be between -180 and 180".to_string());
        }

        if !(-90.0..=90.0).contains(&ymin) || !(-90.0..=90.0).contains(&ymax) {
            return Err("Latitude values must be between -90 and 90".to_string());
        }

        if xmin > xmax || ymin > ymax {
            return Err("Min values must be <= max values".to_string());
        }

        Ok(Bbox {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }

    pub fn intersects(&self, other: &Bbox) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }
}

/// Area of interest: a simple polygon given as a ring of (lon, lat) vertices.
///
/// The ring is stored closed (first vertex repeated at the end) and never
/// changes after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    ring: Vec<(f64, f64)>,
    bbox: Bbox,
}

impl Region {
    pub fn new(vertices: Vec<(f64, f64)>) -> Result<Self, String> {
        let mut ring = vertices;
        if ring.first() != ring.last() {
            if let Some(&first) = ring.first() {
                ring.push(first);
            }
        }

        // a closed triangle has four entries
        if ring.len() < 4 {
            return Err("A region needs at least three distinct vertices".to_string());
        }

        let (mut xmin, mut xmax) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut ymin, mut ymax) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in &ring {
            if !x.is_finite() || !y.is_finite() {
                return Err("Region coordinates must be finite".to_string());
            }
            xmin = xmin.min(x);
            xmax = xmax.max(x);
            ymin = ymin.min(y);
            ymax = ymax.max(y);
        }

        let bbox = Bbox::new(xmin, xmax, ymin, ymax)?;
        if xmin == xmax || ymin == ymax {
            return Err("Region has no area".to_string());
        }

        Ok(Region { ring, bbox })
    }

    /// Axis-aligned rectangle covering `bbox`.
    pub fn from_bbox(bbox: Bbox) -> Result<Self, String> {
        Region::new(vec![
            (bbox.xmin, bbox.ymin),
            (bbox.xmax, bbox.ymin),
            (bbox.xmax, bbox.ymax),
            (bbox.xmin, bbox.ymax),
        ])
    }

    pub fn bbox(&self) -> &Bbox {
        &self.bbox
    }

    /// Closed coordinate ring.
    pub fn coordinates(&self) -> &[(f64, f64)] {
        &self.ring
    }

    /// Even-odd point in polygon test.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if x < self.bbox.xmin || x > self.bbox.xmax || y < self.bbox.ymin || y > self.bbox.ymax {
            return false;
        }

        let mut inside = false;
        for edge in self.ring.windows(2) {
            let (x1, y1) = edge[0];
            let (x2, y2) = edge[1];
            if (y1 > y) != (y2 > y) {
                let x_cross = x1 + (y - y1) * (x2 - x1) / (y2 - y1);
                if x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

#[cfg(test)]
mod test {
    use super::{Bbox, Region};

    #[test]
    fn test_bbox_coords_are_within_ranges() {
        let valid_bbox = Bbox::new(-67.2, -58.7, 70.9, 73.3);
        assert!(valid_bbox.is_ok());

        let invalid_lon = Bbox::new(-200.0, 0.0, 0.0, 10.0);
        assert!(invalid_lon.is_err());

        let invalid_lat = Bbox::new(0.0, 10.0, 0.0, 100.0);
        assert!(invalid_lat.is_err());

        let invalid_order_lon = Bbox::new(10.0, 0.0, 0.0, 10.0);
        assert!(invalid_order_lon.is_err());
    }

    #[test]
    fn test_region_closes_ring() {
        let region = Region::new(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]).unwrap();
        assert_eq!(region.coordinates().len(), 4);
        assert_eq!(region.coordinates()[0], region.coordinates()[3]);
    }

    #[test]
    fn test_region_rejects_degenerate_rings() {
        assert!(Region::new(vec![(0.0, 0.0), (1.0, 1.0)]).is_err());
        assert!(Region::new(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]).is_err());
        assert!(Region::new(vec![(0.0, 0.0), (190.0, 0.0), (0.0, 1.0)]).is_err());
    }

    #[test]
    fn test_region_contains() {
        // L-shaped polygon
        let region = Region::new(vec![
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ])
        .unwrap();

        assert!(region.contains(0.5, 0.5));
        assert!(region.contains(1.5, 0.5));
        assert!(region.contains(0.5, 1.5));
        assert!(!region.contains(1.5, 1.5));
        assert!(!region.contains(3.0, 0.5));
    }

    #[test]
    fn test_region_from_bbox() {
        let bbox = Bbox::new(10.0, 10.5, 46.0, 46.5).unwrap();
        let region = Region::from_bbox(bbox).unwrap();
        assert_eq!(region.bbox(), &bbox);
        assert!(region.contains(10.25, 46.25));

        let far = Bbox::new(20.0, 21.0, 46.0, 46.5).unwrap();
        assert!(!bbox.intersects(&far));
        assert!(bbox.intersects(&Bbox::new(10.4, 11.0, 45.0, 46.1).unwrap()));
    }
}
