// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-pass collision index of accepted label footprints.

use cartouche_index::{GridF64, IndexGeneric};
use glam::DMat4;
use kurbo::{Circle, Point, Rect, Vec2};

use crate::feature::{
    BorderFlags, CollisionBoundaries, CollisionBox, CollisionFeature, CollisionGroup,
    IndexedSubfeature, IntersectStatus, ProjectedCollisionBox, rect_to_aabb,
};
use crate::tile::EXTENT;
use crate::transform::{TransformState, project};

/// Padding in pixels around the viewport inside which labels are still tracked.
pub const VIEWPORT_PADDING: f64 = 100.0;

const GRID_CELL_SIZE: f64 = 25.0;

/// Outcome of [`CollisionIndex::place_feature`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PlacedFeature {
    /// The footprint fits: inside the grid, inside the tile when edges are avoided,
    /// and free of collisions unless overlap is allowed.
    pub placed: bool,
    /// Every part of the footprint lies outside the visible viewport.
    pub offscreen: bool,
}

impl PlacedFeature {
    /// Rejected result.
    pub const REJECTED: Self = Self {
        placed: false,
        offscreen: false,
    };
}

#[derive(Clone, Debug)]
struct GridEntry {
    shape: ProjectedCollisionBox,
    feature: usize,
    group: u16,
}

type Grid = IndexGeneric<f64, GridEntry, GridF64>;

/// Spatial index of footprints accepted in the current pass.
///
/// Coordinates are screen pixels offset by [`VIEWPORT_PADDING`], so the visible viewport
/// spans `[pad, width + pad] x [pad, height + pad]`.
pub struct CollisionIndex {
    state: TransformState,
    viewport_padding: f64,
    collision_grid: Grid,
    ignored_grid: Grid,
    features: Vec<IndexedSubfeature>,
    screen_right_boundary: f64,
    screen_bottom_boundary: f64,
    grid_right_boundary: f64,
    grid_bottom_boundary: f64,
}

impl core::fmt::Debug for CollisionIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CollisionIndex")
            .field("size", &self.state.size())
            .field("viewport_padding", &self.viewport_padding)
            .field("collision_entries", &self.collision_grid.len())
            .field("ignored_entries", &self.ignored_grid.len())
            .field("features", &self.features.len())
            .finish_non_exhaustive()
    }
}

impl CollisionIndex {
    /// An empty index for the given camera.
    pub fn new(state: TransformState) -> Self {
        let size = state.size();
        let pad = VIEWPORT_PADDING;
        let grid_w = size.width + 2.0 * pad;
        let grid_h = size.height + 2.0 * pad;
        Self {
            state,
            viewport_padding: pad,
            collision_grid: IndexGeneric::with_backend(GridF64::new(grid_w, grid_h, GRID_CELL_SIZE)),
            ignored_grid: IndexGeneric::with_backend(GridF64::new(grid_w, grid_h, GRID_CELL_SIZE)),
            features: Vec::new(),
            screen_right_boundary: size.width + pad,
            screen_bottom_boundary: size.height + pad,
            grid_right_boundary: grid_w,
            grid_bottom_boundary: grid_h,
        }
    }

    /// Camera the index projects with.
    pub fn transform_state(&self) -> &TransformState {
        &self.state
    }

    /// Padding around the viewport.
    pub fn viewport_padding(&self) -> f64 {
        self.viewport_padding
    }

    /// Number of footprint shapes that block placement.
    pub fn collision_len(&self) -> usize {
        self.collision_grid.len()
    }

    /// Number of footprint shapes inserted with "ignore placement".
    pub fn ignored_len(&self) -> usize {
        self.ignored_grid.len()
    }

    /// Test whether `feature`, shifted by `shift` tile units, can be placed.
    ///
    /// Projected shapes are appended to `projected` whether or not the feature fits, so
    /// the caller can insert them or keep them for debugging. Nothing is inserted here.
    pub fn place_feature(
        &self,
        feature: &CollisionFeature,
        shift: Vec2,
        pos_matrix: &DMat4,
        pixel_ratio: f64,
        allow_overlap: bool,
        avoid_edges: Option<&CollisionBoundaries>,
        group: CollisionGroup,
        projected: &mut Vec<ProjectedCollisionBox>,
    ) -> PlacedFeature {
        if feature.along_line {
            return self.place_line_feature(
                feature,
                shift,
                pos_matrix,
                pixel_ratio,
                allow_overlap,
                avoid_edges,
                group,
                projected,
            );
        }
        let Some(first) = feature.boxes.first() else {
            return PlacedFeature::REJECTED;
        };
        let Some(bounds) = self.projected_box(pos_matrix, shift, pixel_ratio, first) else {
            return PlacedFeature::REJECTED;
        };
        projected.push(ProjectedCollisionBox::Box(bounds));

        if avoid_edges.is_some_and(|edges| !is_inside_tile(&bounds, edges))
            || !self.is_inside_grid(&bounds)
            || (!allow_overlap && self.collides(&ProjectedCollisionBox::Box(bounds), group))
        {
            return PlacedFeature::REJECTED;
        }
        PlacedFeature {
            placed: true,
            offscreen: self.is_offscreen(&bounds),
        }
    }

    fn place_line_feature(
        &self,
        feature: &CollisionFeature,
        shift: Vec2,
        pos_matrix: &DMat4,
        pixel_ratio: f64,
        allow_overlap: bool,
        avoid_edges: Option<&CollisionBoundaries>,
        group: CollisionGroup,
        projected: &mut Vec<ProjectedCollisionBox>,
    ) -> PlacedFeature {
        if feature.boxes.is_empty() {
            return PlacedFeature::REJECTED;
        }
        let mut placed = true;
        let mut offscreen = true;
        for b in &feature.boxes {
            let Some((anchor, ratio)) = self.project_to_screen(b.anchor, pos_matrix) else {
                return PlacedFeature::REJECTED;
            };
            let tile_to_viewport = pixel_ratio * ratio;
            let center = anchor
                + Vec2::new((b.x1 + b.x2) / 2.0 + shift.x, (b.y1 + b.y2) / 2.0 + shift.y) * tile_to_viewport;
            let circle = Circle::new(center, b.height() / 2.0 * tile_to_viewport);
            let shape = ProjectedCollisionBox::Circle(circle);
            let bounds = shape.bounds();
            projected.push(shape);

            offscreen &= self.is_offscreen(&bounds);
            if avoid_edges.is_some_and(|edges| !is_inside_tile(&bounds, edges))
                || !self.is_inside_grid(&bounds)
                || (!allow_overlap && self.collides(&shape, group))
            {
                placed = false;
            }
        }
        if !placed {
            return PlacedFeature::REJECTED;
        }
        PlacedFeature { placed, offscreen }
    }

    /// Record an accepted footprint.
    ///
    /// With `ignore_placement` the shapes stay queryable but never block later candidates.
    pub fn insert_feature(
        &mut self,
        feature: &CollisionFeature,
        projected: &[ProjectedCollisionBox],
        ignore_placement: bool,
        bucket_instance_id: u32,
        collision_group_id: u16,
    ) {
        if projected.is_empty() {
            return;
        }
        let feature_idx = self.features.len();
        self.features.push(IndexedSubfeature {
            bucket_instance_id,
            collision_group_id,
            ..feature.indexed_feature.clone()
        });
        let grid = if ignore_placement {
            &mut self.ignored_grid
        } else {
            &mut self.collision_grid
        };
        for shape in projected {
            grid.insert(
                rect_to_aabb(&shape.bounds()),
                GridEntry {
                    shape: *shape,
                    feature: feature_idx,
                    group: collision_group_id,
                },
            );
        }
    }

    /// Screen-space border rectangle of the tile drawn with `pos_matrix`.
    ///
    /// Corners behind the camera yield NaN bounds, which contain and cross nothing.
    pub fn project_tile_boundaries(&self, pos_matrix: &DMat4) -> CollisionBoundaries {
        let tl = self.project_to_screen(Point::ORIGIN, pos_matrix);
        let br = self.project_to_screen(Point::new(EXTENT, EXTENT), pos_matrix);
        match (tl, br) {
            (Some((tl, _)), Some((br, _))) => Rect::new(tl.x, tl.y, br.x, br.y),
            _ => Rect::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN),
        }
    }

    /// Which of `tile_edges` the shifted box crosses, and how deeply.
    pub fn intersects_tile_edges(
        &self,
        collision_box: &CollisionBox,
        shift: Vec2,
        pos_matrix: &DMat4,
        pixel_ratio: f64,
        tile_edges: &CollisionBoundaries,
    ) -> IntersectStatus {
        let Some(b) = self.projected_box(pos_matrix, shift, pixel_ratio, collision_box) else {
            return IntersectStatus::default();
        };
        let mut flags = BorderFlags::empty();
        let mut min_section = f64::INFINITY;

        for edge in [tile_edges.x0, tile_edges.x1] {
            if b.x0 < edge && b.x1 > edge {
                flags |= BorderFlags::VERTICAL_BORDERS;
                min_section = min_section.min((edge - b.x0).min(b.x1 - edge));
            }
        }
        for edge in [tile_edges.y0, tile_edges.y1] {
            if b.y0 < edge && b.y1 > edge {
                flags |= BorderFlags::HORIZONTAL_BORDERS;
                min_section = min_section.min((edge - b.y0).min(b.y1 - edge));
            }
        }

        #[allow(
            clippy::cast_possible_truncation,
            reason = "Section lengths are screen pixels; truncation only affects tie-breaks."
        )]
        let min_section_length = if flags.is_empty() { 0 } else { min_section.round() as i32 };
        IntersectStatus {
            flags,
            min_section_length,
        }
    }

    /// Features with a footprint intersecting `rect` (unpadded screen pixels).
    ///
    /// Covers both blocking and ignore-placement footprints; each feature appears once.
    pub fn query_rendered_symbols(&self, rect: Rect) -> Vec<&IndexedSubfeature> {
        let pad = self.viewport_padding;
        let query = ProjectedCollisionBox::Box(rect + Vec2::new(pad, pad));
        let aabb = rect_to_aabb(&query.bounds());
        let mut hits: Vec<usize> = [&self.collision_grid, &self.ignored_grid]
            .into_iter()
            .flat_map(|grid| grid.query_rect(aabb))
            .filter(|(_, _, entry)| entry.shape.intersects(&query))
            .map(|(_, _, entry)| entry.feature)
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits.into_iter().map(|i| &self.features[i]).collect()
    }

    fn collides(&self, shape: &ProjectedCollisionBox, group: CollisionGroup) -> bool {
        self.collision_grid
            .hit_test(rect_to_aabb(&shape.bounds()), |_, entry| {
                group.accepts(entry.group) && entry.shape.intersects(shape)
            })
    }

    /// Project a tile-local point to padded screen space with its perspective ratio.
    fn project_to_screen(&self, point: Point, pos_matrix: &DMat4) -> Option<(Point, f64)> {
        let (ndc, w) = project(point, pos_matrix)?;
        let size = self.state.size();
        let screen = Point::new(
            (ndc.x + 1.0) / 2.0 * size.width + self.viewport_padding,
            (-ndc.y + 1.0) / 2.0 * size.height + self.viewport_padding,
        );
        let ratio = 0.5 + 0.5 * (self.state.camera_to_center_distance() / w);
        Some((screen, ratio))
    }

    fn projected_box(
        &self,
        pos_matrix: &DMat4,
        shift: Vec2,
        pixel_ratio: f64,
        b: &CollisionBox,
    ) -> Option<Rect> {
        let (anchor, ratio) = self.project_to_screen(b.anchor, pos_matrix)?;
        let k = pixel_ratio * ratio;
        Some(Rect::new(
            (b.x1 + shift.x) * k + anchor.x,
            (b.y1 + shift.y) * k + anchor.y,
            (b.x2 + shift.x) * k + anchor.x,
            (b.y2 + shift.y) * k + anchor.y,
        ))
    }

    fn is_inside_grid(&self, r: &Rect) -> bool {
        r.x1 >= 0.0 && r.x0 < self.grid_right_boundary && r.y1 >= 0.0 && r.y0 < self.grid_bottom_boundary
    }

    fn is_offscreen(&self, r: &Rect) -> bool {
        r.x1 < self.viewport_padding
            || r.x0 >= self.screen_right_boundary
            || r.y1 < self.viewport_padding
            || r.y0 > self.screen_bottom_boundary
    }
}

/// Whether `r` lies entirely inside the tile borders.
pub fn is_inside_tile(r: &Rect, tile_edges: &CollisionBoundaries) -> bool {
    r.x0 >= tile_edges.x0 && r.y0 >= tile_edges.y0 && r.x1 < tile_edges.x1 && r.y1 < tile_edges.y1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{CanonicalTileId, UnwrappedTileId};
    use kurbo::Size;

    fn setup() -> (CollisionIndex, DMat4) {
        let state = TransformState::new(Size::new(512.0, 512.0));
        let m = state.matrix_for(&UnwrappedTileId::new(0, CanonicalTileId::new(0, 0, 0)));
        (CollisionIndex::new(state), m)
    }

    const PIXEL_RATIO: f64 = 512.0 / EXTENT;

    /// A point feature of `w` x `h` pixels centered on the tile-local `anchor`.
    fn point_feature(anchor: (f64, f64), w: f64, h: f64, index: usize) -> CollisionFeature {
        let (hw, hh) = (w / PIXEL_RATIO / 2.0, h / PIXEL_RATIO / 2.0);
        CollisionFeature::point(
            CollisionBox::new(Point::new(anchor.0, anchor.1), -hw, -hh, hw, hh),
            IndexedSubfeature {
                index,
                ..IndexedSubfeature::default()
            },
        )
    }

    fn place_and_insert(idx: &mut CollisionIndex, m: &DMat4, f: &CollisionFeature, group: CollisionGroup) -> bool {
        let mut boxes = Vec::new();
        let r = idx.place_feature(f, Vec2::ZERO, m, PIXEL_RATIO, false, None, group, &mut boxes);
        if r.placed {
            idx.insert_feature(f, &boxes, false, 1, group.id);
        }
        r.placed
    }

    #[test]
    fn projected_box_lands_on_padded_screen() {
        let (idx, m) = setup();
        let f = point_feature((4096.0, 4096.0), 40.0, 20.0, 0);
        let mut boxes = Vec::new();
        let r = idx.place_feature(&f, Vec2::ZERO, &m, PIXEL_RATIO, false, None, CollisionGroup::GLOBAL, &mut boxes);
        assert!(r.placed, "an empty index accepts anything on screen");
        assert!(!r.offscreen, "the viewport center is on screen");
        let b = boxes[0].bounds();
        assert!((b.x0 - 336.0).abs() < 1e-6 && (b.y0 - 346.0).abs() < 1e-6, "unexpected box {b:?}");
    }

    #[test]
    fn overlapping_features_collide_until_overlap_allowed() {
        let (mut idx, m) = setup();
        let a = point_feature((4096.0, 4096.0), 40.0, 20.0, 0);
        let b = point_feature((4096.0 + 16.0 * 30.0, 4096.0), 40.0, 20.0, 1);
        assert!(place_and_insert(&mut idx, &m, &a, CollisionGroup::GLOBAL), "first label fits");
        assert!(!place_and_insert(&mut idx, &m, &b, CollisionGroup::GLOBAL), "second overlaps by 10px");

        let mut boxes = Vec::new();
        let r = idx.place_feature(&b, Vec2::ZERO, &m, PIXEL_RATIO, true, None, CollisionGroup::GLOBAL, &mut boxes);
        assert!(r.placed, "allow-overlap skips the collision test");
        // Shifting right by 20px clears the first label.
        let shift = Vec2::new(20.0 / PIXEL_RATIO, 0.0);
        let r = idx.place_feature(&b, shift, &m, PIXEL_RATIO, false, None, CollisionGroup::GLOBAL, &mut boxes);
        assert!(r.placed, "the shifted footprint is clear");
    }

    #[test]
    fn isolated_groups_do_not_see_each_other() {
        let (mut idx, m) = setup();
        let a = point_feature((4096.0, 4096.0), 40.0, 20.0, 0);
        let b = point_feature((4096.0, 4096.0), 40.0, 20.0, 1);
        assert!(place_and_insert(&mut idx, &m, &a, CollisionGroup::isolated(1)), "group 1 label fits");
        assert!(place_and_insert(&mut idx, &m, &b, CollisionGroup::isolated(2)), "group 2 ignores group 1");
        let c = point_feature((4096.0, 4096.0), 10.0, 10.0, 2);
        assert!(!place_and_insert(&mut idx, &m, &c, CollisionGroup::GLOBAL), "global group sees both");
    }

    #[test]
    fn ignored_footprints_do_not_block_but_are_queryable() {
        let (mut idx, m) = setup();
        let a = point_feature((4096.0, 4096.0), 40.0, 20.0, 7);
        let mut boxes = Vec::new();
        let _ = idx.place_feature(&a, Vec2::ZERO, &m, PIXEL_RATIO, false, None, CollisionGroup::GLOBAL, &mut boxes);
        idx.insert_feature(&a, &boxes, true, 3, 0);
        assert_eq!(idx.ignored_len(), 1);
        let b = point_feature((4096.0, 4096.0), 40.0, 20.0, 8);
        assert!(place_and_insert(&mut idx, &m, &b, CollisionGroup::GLOBAL), "ignored footprint does not block");

        let hits = idx.query_rendered_symbols(Rect::new(250.0, 250.0, 260.0, 260.0));
        let found: Vec<_> = hits.iter().map(|f| (f.index, f.bucket_instance_id)).collect();
        assert_eq!(found, [(7, 3), (8, 1)]);
    }

    #[test]
    fn offscreen_and_outside_grid() {
        let (idx, m) = setup();
        let mut boxes = Vec::new();
        // 50px left of the viewport: inside the padding.
        let f = point_feature((-50.0 / PIXEL_RATIO, 4096.0), 20.0, 20.0, 0);
        let r = idx.place_feature(&f, Vec2::ZERO, &m, PIXEL_RATIO, false, None, CollisionGroup::GLOBAL, &mut boxes);
        assert_eq!(r, PlacedFeature { placed: true, offscreen: true });
        // 200px left of the viewport: outside the grid.
        let f = point_feature((-200.0 / PIXEL_RATIO, 4096.0), 20.0, 20.0, 0);
        let r = idx.place_feature(&f, Vec2::ZERO, &m, PIXEL_RATIO, false, None, CollisionGroup::GLOBAL, &mut boxes);
        assert!(!r.placed, "footprints outside the padded grid are rejected");
    }

    #[test]
    fn avoid_edges_rejects_border_crossing() {
        let (idx, m) = setup();
        let borders = idx.project_tile_boundaries(&m);
        for (got, want) in [(borders.x0, 100.0), (borders.y0, 100.0), (borders.x1, 612.0), (borders.y1, 612.0)] {
            assert!((got - want).abs() < 1e-6, "tile borders {borders:?}");
        }
        let mut boxes = Vec::new();
        let f = point_feature((10.0, 4096.0), 20.0, 20.0, 0);
        let r = idx.place_feature(&f, Vec2::ZERO, &m, PIXEL_RATIO, false, Some(&borders), CollisionGroup::GLOBAL, &mut boxes);
        assert!(!r.placed, "a label hanging over the left border is rejected");
        let r = idx.place_feature(&f, Vec2::ZERO, &m, PIXEL_RATIO, false, None, CollisionGroup::GLOBAL, &mut boxes);
        assert!(r.placed, "without edge avoidance it fits");
    }

    #[test]
    fn tile_edge_intersections() {
        let (idx, m) = setup();
        let borders = idx.project_tile_boundaries(&m);
        let f = point_feature((0.0, 0.0), 20.0, 8.0, 0);
        let status = idx.intersects_tile_edges(&f.boxes[0], Vec2::ZERO, &m, PIXEL_RATIO, &borders);
        assert_eq!(status.flags, BorderFlags::HORIZONTAL_BORDERS | BorderFlags::VERTICAL_BORDERS);
        assert_eq!(status.min_section_length, 4, "the 8px tall box is cut in half");

        let f = point_feature((4096.0, 4096.0), 20.0, 8.0, 0);
        let status = idx.intersects_tile_edges(&f.boxes[0], Vec2::ZERO, &m, PIXEL_RATIO, &borders);
        assert!(!status.intersects(), "the center label crosses nothing");
    }

    #[test]
    fn line_features_use_circles() {
        let (mut idx, m) = setup();
        let boxes = (0..3)
            .map(|i| {
                let x = 4096.0 + f64::from(i) * 160.0;
                CollisionBox::new(Point::new(x, 4096.0), -80.0, -80.0, 80.0, 80.0)
            })
            .collect();
        let line = CollisionFeature::along_line(boxes, IndexedSubfeature::default());
        assert!(place_and_insert(&mut idx, &m, &line, CollisionGroup::GLOBAL), "line label fits");
        assert_eq!(idx.collision_len(), 3, "one circle per box");
        // A box that only clips the corner square of a circle's bounds does not collide.
        let corner = point_feature((4096.0 - 80.0, 4096.0 - 80.0), 2.0, 2.0, 0);
        assert!(place_and_insert(&mut idx, &m, &corner, CollisionGroup::GLOBAL), "exact circle test");
    }
}
