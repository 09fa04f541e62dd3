// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tile identifiers and tile-space constants.

/// Number of tile-local units along one tile edge.
pub const EXTENT: f64 = 8192.0;

/// Size of one tile in screen pixels at its native zoom.
pub const TILE_SIZE: f64 = 512.0;

/// A tile address in the canonical (unwrapped, non-overscaled) pyramid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalTileId {
    /// Zoom level.
    pub z: u8,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl CanonicalTileId {
    /// Create a canonical tile id.
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

/// A canonical tile placed in one world copy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnwrappedTileId {
    /// World copy index; 0 is the primary world.
    pub wrap: i32,
    /// The tile address inside that world copy.
    pub canonical: CanonicalTileId,
}

impl UnwrappedTileId {
    /// Create an unwrapped tile id.
    pub const fn new(wrap: i32, canonical: CanonicalTileId) -> Self {
        Self { wrap, canonical }
    }

    /// Column across world copies (`x + wrap * 2^z`).
    pub fn unwrapped_x(&self) -> f64 {
        f64::from(self.canonical.x) + f64::from(self.wrap) * tile_count(self.canonical.z)
    }

    /// Tile-local units covered by `pixel_value` screen pixels at `zoom`.
    pub fn pixels_to_tile_units(&self, pixel_value: f64, zoom: f64) -> f64 {
        pixel_value * (EXTENT / (TILE_SIZE * 2_f64.powf(zoom - f64::from(self.canonical.z))))
    }
}

/// A tile as rendered: possibly overscaled past its source zoom.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OverscaledTileId {
    /// Zoom the tile is displayed at; at least `canonical.z`.
    pub overscaled_z: u8,
    /// World copy index.
    pub wrap: i32,
    /// Source tile address.
    pub canonical: CanonicalTileId,
}

impl OverscaledTileId {
    /// Create an overscaled tile id.
    pub const fn new(overscaled_z: u8, wrap: i32, canonical: CanonicalTileId) -> Self {
        Self {
            overscaled_z,
            wrap,
            canonical,
        }
    }

    /// A tile displayed at its own zoom in the primary world.
    pub const fn from_canonical(canonical: CanonicalTileId) -> Self {
        Self::new(canonical.z, 0, canonical)
    }

    /// `2^(overscaled_z - z)`.
    pub fn overscale_factor(&self) -> f64 {
        2_f64.powi(i32::from(self.overscaled_z) - i32::from(self.canonical.z))
    }

    /// Drop the overscaling.
    pub const fn to_unwrapped(&self) -> UnwrappedTileId {
        UnwrappedTileId::new(self.wrap, self.canonical)
    }
}

/// `2^z` as a float.
pub(crate) fn tile_count(z: u8) -> f64 {
    2_f64.powi(i32::from(z))
}
