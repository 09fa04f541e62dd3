// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=cartouche_collision --heading-base-level=0

//! Cartouche Collision: screen-space collision testing for map labels.
//!
//! Labels arrive as footprints in tile-local units. The [`CollisionIndex`] projects them
//! through a tile matrix into padded screen space, tests them against every footprint
//! accepted so far in the pass, and records the ones the caller accepts.
//!
//! - [`TransformState`] describes the camera and builds projection, tile, and
//!   label-plane matrices ([`glam::DMat4`]).
//! - [`CollisionFeature`] is a label part's footprint: one box for point labels, a run of
//!   boxes (tested as circles) for line labels.
//! - [`CollisionGroup`] scopes collisions, e.g. per data source.
//! - [`CollisionIndex::intersects_tile_edges`] reports how a footprint crosses tile borders,
//!   for placing tiles independently and consistently.
//!
//! # Example
//!
//! ```rust
//! use cartouche_collision::{
//!     CanonicalTileId, CollisionBox, CollisionFeature, CollisionGroup, CollisionIndex,
//!     IndexedSubfeature, TransformState, UnwrappedTileId,
//! };
//! use kurbo::{Point, Size, Vec2};
//!
//! let state = TransformState::new(Size::new(512.0, 512.0));
//! let matrix = state.matrix_for(&UnwrappedTileId::new(0, CanonicalTileId::new(0, 0, 0)));
//! let mut index = CollisionIndex::new(state);
//!
//! let label = CollisionFeature::point(
//!     CollisionBox::new(Point::new(4096.0, 4096.0), -320.0, -160.0, 320.0, 160.0),
//!     IndexedSubfeature::default(),
//! );
//! let pixel_ratio = 512.0 / 8192.0;
//! let mut boxes = Vec::new();
//! let first = index.place_feature(&label, Vec2::ZERO, &matrix, pixel_ratio, false, None, CollisionGroup::GLOBAL, &mut boxes);
//! assert!(first.placed);
//! index.insert_feature(&label, &boxes, false, 1, 0);
//!
//! boxes.clear();
//! let second = index.place_feature(&label, Vec2::ZERO, &matrix, pixel_ratio, false, None, CollisionGroup::GLOBAL, &mut boxes);
//! assert!(!second.placed);
//! ```

pub mod collision_index;
pub mod feature;
pub mod tile;
pub mod transform;

pub use collision_index::{CollisionIndex, PlacedFeature, VIEWPORT_PADDING, is_inside_tile};
pub use feature::{
    BorderFlags, CollisionBoundaries, CollisionBox, CollisionFeature, CollisionGroup,
    IndexedSubfeature, IntersectStatus, ProjectedCollisionBox,
};
pub use tile::{CanonicalTileId, EXTENT, OverscaledTileId, TILE_SIZE, UnwrappedTileId};
pub use transform::{TransformState, label_plane_matrix, project};
