// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collision index basics.
//!
//! Places a row of overlapping label footprints greedily, then queries what ended up
//! under a point of the screen.
//!
//! Run:
//! - `cargo run -p cartouche_demos --example collision_basics`

use cartouche_collision::{
    CanonicalTileId, CollisionBox, CollisionFeature, CollisionGroup, CollisionIndex, EXTENT, IndexedSubfeature,
    TILE_SIZE, TransformState, UnwrappedTileId,
};
use kurbo::{Point, Rect, Size, Vec2};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state = TransformState::new(Size::new(512.0, 512.0));
    let matrix = state.matrix_for(&UnwrappedTileId::new(0, CanonicalTileId::new(0, 0, 0)));
    let pixel_ratio = TILE_SIZE / EXTENT;
    let mut index = CollisionIndex::new(state);

    // Eight 80 px wide labels, 48 px apart: every other one fits.
    for i in 0..8_usize {
        let anchor = Point::new(1024.0 + i as f64 * 48.0 * 16.0, EXTENT / 2.0);
        let feature = CollisionFeature::point(
            CollisionBox::new(anchor, -640.0, -160.0, 640.0, 160.0),
            IndexedSubfeature {
                index: i,
                ..IndexedSubfeature::default()
            },
        );
        let mut boxes = Vec::new();
        let placed = index.place_feature(
            &feature,
            Vec2::ZERO,
            &matrix,
            pixel_ratio,
            false,
            None,
            CollisionGroup::GLOBAL,
            &mut boxes,
        );
        if placed.placed {
            index.insert_feature(&feature, &boxes, false, 1, 0);
        }
        tracing::info!(label = i, placed = placed.placed, bounds = ?boxes.first().map(|b| b.bounds()));
    }

    let cursor = Rect::from_center_size(Point::new(160.0, 256.0), Size::new(4.0, 4.0));
    let hits: Vec<usize> = index.query_rendered_symbols(cursor).iter().map(|f| f.index).collect();
    tracing::info!(?cursor, ?hits, "features under cursor");
}
