//! Cost distance from source pixels
//!
//! Uniform-cost Dijkstra on an 8-connected grid, measured in metres. Used to
//! grow a boolean layer outward by a buffer distance.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{Mask, Raster};

#[derive(Debug, Clone, PartialEq)]
struct State {
    cost: f64,
    index: usize,
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed for a min-heap
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}

/// Accumulated distance from the nearest set pixel of `sources`, up to
/// `max_distance` metres. Pixels farther away are left undefined (NaN).
pub fn cumulative_cost(sources: &Mask, max_distance: f64) -> Raster {
    let grid = *sources.grid();
    let (cols, rows) = (grid.width, grid.height);
    let (dx, dy) = grid.cell_size_meters();
    let diagonal = dx.hypot(dy);

    let neighbors: [(isize, isize, f64); 8] = [
        (-1, -1, diagonal),
        (0, -1, dy),
        (1, -1, diagonal),
        (-1, 0, dx),
        (1, 0, dx),
        (-1, 1, diagonal),
        (0, 1, dy),
        (1, 1, diagonal),
    ];

    let mut dist = vec![f64::INFINITY; grid.len()];
    let mut heap = BinaryHeap::new();

    for (index, &is_source) in sources.data().iter().enumerate() {
        if is_source {
            dist[index] = 0.0;
            heap.push(State { cost: 0.0, index });
        }
    }

    while let Some(State { cost, index }) = heap.pop() {
        if cost > dist[index] {
            continue;
        }

        let (col, row) = ((index % cols) as isize, (index / cols) as isize);
        for &(dc, dr, step) in &neighbors {
            let (nc, nr) = (col + dc, row + dr);
            if nc < 0 || nr < 0 || nc >= cols as isize || nr >= rows as isize {
                continue;
            }

            let next = nr as usize * cols + nc as usize;
            let next_cost = cost + step;
            if next_cost <= max_distance && next_cost < dist[next] {
                dist[next] = next_cost;
                heap.push(State {
                    cost: next_cost,
                    index: next,
                });
            }
        }
    }

    Raster::from_fn(grid, |col, row| {
        let d = dist[row * cols + col];
        if d.is_finite() { d as f32 } else { f32::NAN }
    })
}

/// Pixels farther than `max_distance` metres from every set source pixel,
/// i.e. the pixels the cost transform leaves undefined.
pub fn beyond_distance(sources: &Mask, max_distance: f64) -> Mask {
    cumulative_cost(sources, max_distance).valid_mask().not()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::tests::test_grid;

    fn single_source(width: usize, height: usize, col: usize, row: usize) -> Mask {
        Mask::from_fn(test_grid(width, height), |c, r| c == col && r == row)
    }

    #[test]
    fn test_sources_have_zero_cost() {
        let sources = single_source(5, 5, 2, 2);
        let cost = cumulative_cost(&sources, 1_000.0);
        assert_eq!(cost.get(2, 2), 0.0);
    }

    #[test]
    fn test_cost_grows_with_distance() {
        let sources = single_source(7, 1, 0, 0);
        let cost = cumulative_cost(&sources, 10_000.0);
        let (dx, _) = sources.grid().cell_size_meters();
        for col in 1..7 {
            assert!((cost.get(col, 0) as f64 - col as f64 * dx).abs() < 1e-2);
        }
    }

    #[test]
    fn test_cost_is_capped() {
        let sources = single_source(9, 1, 0, 0);
        let (dx, _) = sources.grid().cell_size_meters();
        let cost = cumulative_cost(&sources, 2.5 * dx);
        assert!(!cost.get(2, 0).is_nan());
        assert!(cost.get(3, 0).is_nan());

        let beyond = beyond_distance(&sources, 2.5 * dx);
        assert!(!beyond.get(2, 0));
        assert!(beyond.get(3, 0));
    }

    #[test]
    fn test_no_sources_leaves_everything_undefined() {
        let sources = Mask::filled(test_grid(4, 4), false);
        assert_eq!(beyond_distance(&sources, 500.0).count(), 16);
    }
}
