// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dense uniform grid backend over a fixed extent.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::types::Aabb2D;

/// Dense uniform grid backend for f64 coordinates.
///
/// The grid covers `[0, width] x [0, height]` with square cells. Boxes reaching past the
/// extent are clamped into the border cells, so they are still found by queries that
/// touch the border; the exact test is left to the index.
///
/// A slot spanning several cells is reported once per query: only from the first cell
/// (row-major) that both its box and the query cover. Queries do not allocate.
pub struct GridF64 {
    cell_size: f64,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<usize>>,
    /// First covered cell `(x, y)` per slot.
    origins: Vec<(usize, usize)>,
}

impl GridF64 {
    /// Create a grid covering `width` x `height` with the given cell size.
    pub fn new(width: f64, height: f64, cell_size: f64) -> Self {
        debug_assert!(cell_size > 0.0, "cell size must be positive");
        let cols = Self::cell_count(width, cell_size);
        let rows = Self::cell_count(height, cell_size);
        Self {
            cell_size,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
            origins: Vec::new(),
        }
    }

    #[inline]
    fn floor_to_i64(v: f64) -> i64 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Float to i64 casts saturate; NaN maps to zero."
        )]
        let i = v as i64;
        if (i as f64) > v { i - 1 } else { i }
    }

    #[inline]
    fn ceil_to_i64(v: f64) -> i64 {
        -Self::floor_to_i64(-v)
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Cell counts are small positive integers; NaN and negative extents give one cell."
    )]
    fn cell_count(extent: f64, cell_size: f64) -> usize {
        Self::ceil_to_i64(extent / cell_size).max(1) as usize
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "The cell is clamped to `[0, count - 1]` before the cast."
    )]
    fn clamp_cell(&self, v: f64, count: usize) -> usize {
        let c = Self::floor_to_i64(v / self.cell_size);
        if c <= 0 {
            0
        } else {
            (c as usize).min(count - 1)
        }
    }

    fn cell_range(&self, a: &Aabb2D<f64>) -> (usize, usize, usize, usize) {
        (
            self.clamp_cell(a.min_x, self.cols),
            self.clamp_cell(a.min_y, self.rows),
            self.clamp_cell(a.max_x, self.cols),
            self.clamp_cell(a.max_y, self.rows),
        )
    }

    fn candidates<'a>(&'a self, a: &Aabb2D<f64>) -> impl Iterator<Item = usize> + 'a {
        let (x0, y0, x1, y1) = self.cell_range(a);
        (y0..=y1).flat_map(move |y| {
            (x0..=x1).flat_map(move |x| {
                self.cells[y * self.cols + x].iter().copied().filter(move |&slot| {
                    let (ox, oy) = self.origins[slot];
                    ox.max(x0) == x && oy.max(y0) == y
                })
            })
        })
    }
}

impl Backend<f64> for GridF64 {
    fn insert(&mut self, slot: usize, aabb: Aabb2D<f64>) {
        if self.origins.len() <= slot {
            self.origins.resize(slot + 1, (usize::MAX, usize::MAX));
        }
        if aabb.is_empty() {
            return;
        }
        let (x0, y0, x1, y1) = self.cell_range(&aabb);
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.cells[y * self.cols + x].push(slot);
            }
        }
        self.origins[slot] = (x0, y0);
    }

    fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.origins.clear();
    }

    fn query_point<'a>(&'a self, x: f64, y: f64) -> Box<dyn Iterator<Item = usize> + 'a> {
        Box::new(self.candidates(&Aabb2D::new(x, y, x, y)))
    }

    fn query_rect<'a>(&'a self, rect: Aabb2D<f64>) -> Box<dyn Iterator<Item = usize> + 'a> {
        if rect.is_empty() {
            return Box::new(core::iter::empty());
        }
        Box::new(self.candidates(&rect))
    }
}

impl Debug for GridF64 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let occupied = self.cells.iter().filter(|c| !c.is_empty()).count();
        f.debug_struct("GridF64")
            .field("cell_size", &self.cell_size)
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("slots", &self.origins.len())
            .field("occupied_cells", &occupied)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn grid_query_rect_and_point() {
        let mut g = GridF64::new(100.0, 100.0, 10.0);
        g.insert(0, Aabb2D::new(0.0, 0.0, 15.0, 15.0));
        g.insert(1, Aabb2D::new(50.0, 50.0, 60.0, 60.0));
        let hits: Vec<_> = g.query_rect(Aabb2D::new(12.0, 12.0, 14.0, 14.0)).collect();
        assert_eq!(hits, [0]);
        let hits: Vec<_> = g.query_point(55.0, 55.0).collect();
        assert_eq!(hits, [1]);
    }

    #[test]
    fn out_of_extent_boxes_land_in_border_cells() {
        let mut g = GridF64::new(100.0, 100.0, 10.0);
        g.insert(0, Aabb2D::new(-30.0, -30.0, -20.0, -20.0));
        g.insert(1, Aabb2D::new(120.0, 40.0, 130.0, 45.0));
        let hits: Vec<_> = g.query_rect(Aabb2D::new(0.0, 0.0, 1.0, 1.0)).collect();
        assert_eq!(hits, [0], "negative box is clamped to the origin cell");
        let hits: Vec<_> = g.query_point(99.0, 41.0).collect();
        assert_eq!(hits, [1], "box past the right edge is clamped to the last column");
    }

    #[test]
    fn spanning_slot_is_reported_once() {
        let mut g = GridF64::new(100.0, 100.0, 10.0);
        g.insert(0, Aabb2D::new(5.0, 5.0, 45.0, 45.0));
        g.insert(1, Aabb2D::new(25.0, 25.0, 26.0, 26.0));
        let mut hits: Vec<_> = g.query_rect(Aabb2D::new(0.0, 0.0, 100.0, 100.0)).collect();
        hits.sort_unstable();
        assert_eq!(hits, [0, 1], "a box over 25 cells is still one candidate");
        let hits: Vec<_> = g.query_rect(Aabb2D::new(30.0, 30.0, 60.0, 60.0)).collect();
        assert_eq!(hits, [0], "query starting inside the box reports it once");
    }

    #[test]
    fn manual_rounding_matches_float_rounding() {
        assert_eq!(GridF64::floor_to_i64(2.5), 2, "positive floor");
        assert_eq!(GridF64::floor_to_i64(-2.5), -3, "negative floor");
        assert_eq!(GridF64::floor_to_i64(-3.0), -3, "integral values stay put");
        assert_eq!(GridF64::ceil_to_i64(2.1), 3, "positive ceil");
        assert_eq!(GridF64::ceil_to_i64(4.0), 4, "integral ceil");
        assert_eq!(GridF64::new(95.0, 100.0, 10.0).cols, 10, "partial cells round up");
    }

    #[test]
    fn clear_drops_every_slot() {
        let mut g = GridF64::new(50.0, 50.0, 25.0);
        g.insert(0, Aabb2D::new(0.0, 0.0, 50.0, 50.0));
        g.clear();
        assert_eq!(g.query_rect(Aabb2D::new(0.0, 0.0, 50.0, 50.0)).count(), 0);
    }
}
