// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Camera state and the matrices derived from it.
//!
//! World coordinates are Web Mercator pixels at the current zoom, with `(0, 0)` at the
//! top-left of the primary world and `world_size()` pixels per world edge. The camera
//! looks at `center` (normalized to `[0, 1]`) from `camera_to_center_distance()` pixels
//! away, tilted by `pitch` and rotated by `bearing` (both radians).

use core::f64::consts::FRAC_PI_2;

use glam::{DMat4, DVec3, DVec4};
use kurbo::{Point, Size};

use crate::tile::{EXTENT, TILE_SIZE, UnwrappedTileId, tile_count};

/// Camera and viewport parameters for one placement pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransformState {
    size: Size,
    center: Point,
    zoom: f64,
    bearing: f64,
    pitch: f64,
    fov: f64,
}

impl TransformState {
    /// Default vertical field of view, `2 * atan(1/3)`.
    pub const DEFAULT_FOV: f64 = 0.643_501_108_793_284_4;

    /// A camera over the middle of the world at zoom 0, looking straight down.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            center: Point::new(0.5, 0.5),
            zoom: 0.0,
            bearing: 0.0,
            pitch: 0.0,
            fov: Self::DEFAULT_FOV,
        }
    }

    /// Set the normalized map center.
    pub fn with_center(mut self, center: Point) -> Self {
        self.center = center;
        self
    }

    /// Set the zoom level.
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    /// Set the bearing in radians.
    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = bearing;
        self
    }

    /// Set the pitch in radians.
    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    /// Viewport size in pixels.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Normalized map center.
    pub fn center(&self) -> Point {
        self.center
    }

    /// Zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Bearing in radians.
    pub fn bearing(&self) -> f64 {
        self.bearing
    }

    /// Pitch in radians.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Whether the camera is tilted away from straight down.
    pub fn is_tilted(&self) -> bool {
        self.pitch != 0.0
    }

    /// `2^zoom`.
    pub fn scale(&self) -> f64 {
        2_f64.powf(self.zoom)
    }

    /// Edge length of one world copy in pixels.
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * self.scale()
    }

    /// Distance from the camera to the map center, in pixels.
    pub fn camera_to_center_distance(&self) -> f64 {
        0.5 / (self.fov / 2.0).tan() * self.size.height
    }

    /// World-pixel to clip-space matrix.
    pub fn projection_matrix(&self) -> DMat4 {
        let d = self.camera_to_center_distance();
        let half_fov = self.fov / 2.0;
        let ground_angle = FRAC_PI_2 + self.pitch;
        let top_half_surface = half_fov.sin() * d / (core::f64::consts::PI - ground_angle - half_fov).sin();
        let furthest = (FRAC_PI_2 - self.pitch).cos() * top_half_surface + d;
        let near = self.size.height / 50.0;
        let far = furthest * 1.01;
        let center_px = self.center.to_vec2() * self.world_size();

        DMat4::perspective_rh_gl(self.fov, self.size.width / self.size.height, near, far)
            * DMat4::from_scale(DVec3::new(1.0, -1.0, 1.0))
            * DMat4::from_translation(DVec3::new(0.0, 0.0, -d))
            * DMat4::from_rotation_x(self.pitch)
            * DMat4::from_rotation_z(self.bearing)
            * DMat4::from_translation(DVec3::new(-center_px.x, -center_px.y, 0.0))
    }

    /// Tile-local to clip-space matrix for the tile at column `x`, row `y` of zoom `z`.
    ///
    /// `x` and `y` are not wrapped or clamped, so neighbours past the world edge project
    /// where they would geometrically sit.
    pub fn tile_matrix(&self, z: u8, x: f64, y: f64) -> DMat4 {
        let s = self.world_size() / tile_count(z);
        self.projection_matrix()
            * DMat4::from_translation(DVec3::new(x * s, y * s, 0.0))
            * DMat4::from_scale(DVec3::new(s / EXTENT, s / EXTENT, 1.0))
    }

    /// Tile-local to clip-space matrix for a tile.
    pub fn matrix_for(&self, id: &UnwrappedTileId) -> DMat4 {
        self.tile_matrix(id.canonical.z, id.unwrapped_x(), f64::from(id.canonical.y))
    }
}

/// Project a tile-local point through `matrix`.
///
/// Returns the point after the perspective divide together with the clip-space `w`,
/// or `None` when the point is at or behind the camera plane.
pub fn project(point: Point, matrix: &DMat4) -> Option<(Point, f64)> {
    let p = matrix.mul_vec4(DVec4::new(point.x, point.y, 0.0, 1.0));
    if !(p.w > 0.0) {
        return None;
    }
    Some((Point::new(p.x / p.w, p.y / p.w), p.w))
}

/// Matrix from tile-local units into the plane labels are laid out in.
///
/// Pitch-aligned labels live in tile space scaled to pixels (and unrotated when they
/// do not rotate with the map). Viewport-aligned labels live in screen pixels.
pub fn label_plane_matrix(
    pos_matrix: &DMat4,
    pitch_with_map: bool,
    rotate_with_map: bool,
    state: &TransformState,
    pixels_to_tile_units: f64,
) -> DMat4 {
    if pitch_with_map {
        let m = DMat4::from_scale(DVec3::new(1.0 / pixels_to_tile_units, 1.0 / pixels_to_tile_units, 1.0));
        if rotate_with_map {
            m
        } else {
            m * DMat4::from_rotation_z(state.bearing())
        }
    } else {
        let size = state.size();
        DMat4::from_scale(DVec3::new(size.width / 2.0, -size.height / 2.0, 1.0))
            * DMat4::from_translation(DVec3::new(1.0, -1.0, 0.0))
            * *pos_matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::CanonicalTileId;

    fn assert_close(a: f64, b: f64, what: &str) {
        assert!((a - b).abs() < 1e-6, "{what}: {a} != {b}");
    }

    #[test]
    fn flat_camera_maps_world_pixels_one_to_one() {
        let state = TransformState::new(Size::new(512.0, 512.0));
        let m = state.matrix_for(&UnwrappedTileId::new(0, CanonicalTileId::new(0, 0, 0)));
        let (p, w) = project(Point::new(EXTENT / 2.0, EXTENT / 2.0), &m).expect("center projects");
        assert_close(p.x, 0.0, "center ndc x");
        assert_close(p.y, 0.0, "center ndc y");
        assert_close(w, state.camera_to_center_distance(), "w at the center");

        let (p, _) = project(Point::new(EXTENT, 0.0), &m).expect("corner projects");
        assert_close(p.x, 1.0, "right edge ndc x");
        assert_close(p.y, 1.0, "top edge ndc y");
    }

    #[test]
    fn label_plane_for_viewport_text_is_screen_pixels() {
        let state = TransformState::new(Size::new(400.0, 300.0)).with_zoom(1.0);
        let pos = state.matrix_for(&UnwrappedTileId::new(0, CanonicalTileId::new(1, 0, 0)));
        let m = label_plane_matrix(&pos, false, false, &state, 1.0);
        // Tile (0, 0) at zoom 1 covers world pixels 0..512; the center is at 512.
        let (p, _) = project(Point::new(EXTENT, EXTENT), &m).expect("projects");
        assert_close(p.x, 200.0, "tile corner sits at the screen center x");
        assert_close(p.y, 150.0, "tile corner sits at the screen center y");
    }

    #[test]
    fn points_behind_the_camera_do_not_project() {
        let m = DMat4::from_cols(
            DVec4::X,
            DVec4::Y,
            DVec4::Z,
            DVec4::new(0.0, 0.0, 0.0, -1.0),
        );
        assert!(project(Point::ORIGIN, &m).is_none(), "negative w is rejected");
    }

    #[test]
    fn pitch_shrinks_far_labels() {
        let state = TransformState::new(Size::new(512.0, 512.0)).with_pitch(0.8);
        let m = state.matrix_for(&UnwrappedTileId::new(0, CanonicalTileId::new(0, 0, 0)));
        let (_, w_top) = project(Point::new(EXTENT / 2.0, EXTENT / 4.0), &m).expect("projects");
        let (_, w_bottom) = project(Point::new(EXTENT / 2.0, EXTENT * 0.75), &m).expect("projects");
        assert!(w_top > w_bottom, "the top of the screen is further away when pitched");
    }
}
