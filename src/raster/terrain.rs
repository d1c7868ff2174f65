//! Aspect from a DEM (Horn, 1981)

use super::Raster;

/// Aspect in degrees clockwise from north, [0, 360). Flat cells and cells
/// without elevation are NaN. Edge cells reuse the nearest valid neighbour.
pub fn aspect(dem: &Raster) -> Raster {
    let (cols, rows) = (dem.width() as isize, dem.height() as isize);
    let (cell_x, cell_y) = dem.grid().cell_size_meters();

    const FLAT_THRESHOLD: f64 = 1e-10;

    let mut out = Raster::filled(*dem.grid(), f32::NAN);
    for row in 0..rows {
        for col in 0..cols {
            let center = dem.get(col as usize, row as usize);
            if center.is_nan() {
                continue;
            }

            let z = |dc: isize, dr: isize| -> f64 {
                let nc = (col + dc).clamp(0, cols - 1) as usize;
                let nr = (row + dr).clamp(0, rows - 1) as usize;
                let v = dem.get(nc, nr);
                if v.is_nan() { center as f64 } else { v as f64 }
            };

            // a b c
            // d e f
            // g h i
            let (a, b, c) = (z(-1, -1), z(0, -1), z(1, -1));
            let (d, f) = (z(-1, 0), z(1, 0));
            let (g, h, i) = (z(-1, 1), z(0, 1), z(1, 1));

            let dzdx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / (8.0 * cell_x);
            let dzdy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / (8.0 * cell_y);

            if dzdx.abs() < FLAT_THRESHOLD && dzdy.abs() < FLAT_THRESHOLD {
                continue;
            }

            let angle = dzdy.atan2(-dzdx).to_degrees();
            let value = if angle < 0.0 {
                90.0 - angle
            } else if angle > 90.0 {
                360.0 - angle + 90.0
            } else {
                90.0 - angle
            };
            out.set(col as usize, row as usize, (value % 360.0) as f32);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::tests::test_grid;

    #[test]
    fn test_east_facing_slope() {
        // elevation drops towards the east
        let dem = Raster::from_fn(test_grid(5, 5), |col, _| 100.0 - 10.0 * col as f32);
        let aspect = aspect(&dem);
        assert!((aspect.get(2, 2) - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_north_facing_slope() {
        // elevation drops towards the north (row 0)
        let dem = Raster::from_fn(test_grid(5, 5), |_, row| 10.0 * row as f32);
        let aspect = aspect(&dem);
        assert!(aspect.get(2, 2).abs() < 1e-3);
    }

    #[test]
    fn test_south_west_facing_slope() {
        let dem = Raster::from_fn(test_grid(5, 5), |col, row| {
            10.0 * col as f32 - 10.0 * row as f32
        });
        let value = aspect(&dem).get(2, 2);
        assert!(value > 180.0 && value < 270.0, "{value}");
    }

    #[test]
    fn test_flat_is_nodata() {
        let dem = Raster::filled(test_grid(3, 3), 42.0);
        assert_eq!(aspect(&dem).valid_count(), 0);
    }
}
