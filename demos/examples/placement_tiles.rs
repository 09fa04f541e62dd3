// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tiles placed one at a time that agree on labels crossing their shared border.
//!
//! Each tile has a label straddling the border and a local label competing with it.
//! Placed independently in tile mode, both tiles keep the border label, so the two
//! halves line up when the tiles are drawn next to each other.
//!
//! Run:
//! - `cargo run -p cartouche_demos --example placement_tiles`

use std::sync::Arc;
use std::time::Instant;

use cartouche_collision::{
    CanonicalTileId, CollisionBox, CollisionFeature, EXTENT, IndexedSubfeature, OverscaledTileId, TransformState,
};
use cartouche_placement::{
    BucketPlacementData, FeatureIndex, MapMode, PlacedSymbol, Placement, PlacementConfig, RenderTile, SymbolBucket,
    SymbolInstance, SymbolLayer, SymbolLayout,
};
use kurbo::{Point, Size};
use tracing_subscriber::EnvFilter;

/// Tile units per pixel at zoom 1.
const UNITS_PER_PX: f64 = EXTENT / 512.0;

fn label(id: u32, index: usize, key: &str, anchor: Point, width_px: f64) -> SymbolInstance {
    let half = width_px * UNITS_PER_PX / 2.0;
    let footprint = CollisionFeature::point(
        CollisionBox::new(anchor, -half, -10.0 * UNITS_PER_PX, half, 10.0 * UNITS_PER_PX),
        IndexedSubfeature::default(),
    );
    SymbolInstance::new(anchor, id)
        .with_text(footprint, index, key.len())
        .with_key(key)
}

fn place_tile(x: u32, state: TransformState, symbols: Vec<SymbolInstance>) -> Placement {
    let tile = RenderTile::new(OverscaledTileId::from_canonical(CanonicalTileId::new(1, x, 0)), &state);
    let mut bucket = SymbolBucket::new(x + 1, "places", SymbolLayout::default());
    for symbol in &symbols {
        bucket.text.placed_symbols.push(PlacedSymbol {
            anchor_point: symbol.anchor,
            glyph_count: symbol.glyph_quads.center,
            ..PlacedSymbol::default()
        });
    }
    bucket.symbol_instances = symbols;

    let mut layer = SymbolLayer::new("places");
    layer.push(BucketPlacementData {
        bucket: &bucket,
        tile: &tile,
        feature_index: Arc::new(FeatureIndex::new(tile.id)),
        source_id: "places",
        sort_key_range: None,
    });
    let config = PlacementConfig {
        mode: MapMode::Tile,
        collect_placed_symbol_data: true,
        ..PlacementConfig::default()
    };
    let mut placement = Placement::new(&config.update_parameters(state, Instant::now()), None);
    placement.place_layers(&[&layer]);
    placement
}

fn report(tile: &str, placement: &Placement) {
    for data in placement.placed_symbols_data() {
        tracing::info!(
            tile,
            key = %data.key,
            shown = data.text_placed,
            border_pass = data.intersects_tile_border,
        );
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,cartouche_placement=debug")))
        .init();

    // Two zoom-1 tiles side by side; their border runs down the middle of the screen.
    let state = TransformState::new(Size::new(1024.0, 512.0))
        .with_zoom(1.0)
        .with_center(Point::new(0.5, 0.25));
    let mid = EXTENT / 2.0;

    let west = place_tile(
        0,
        state,
        vec![
            label(1, 0, "Westville", Point::new(EXTENT - 40.0 * UNITS_PER_PX, mid), 60.0),
            label(100, 1, "Border Lake", Point::new(EXTENT, mid), 80.0),
        ],
    );
    let east = place_tile(
        1,
        state,
        vec![
            label(2, 0, "Eastburg", Point::new(40.0 * UNITS_PER_PX, mid), 60.0),
            label(100, 1, "Border Lake", Point::new(0.0, mid), 80.0),
        ],
    );

    report("west tile", &west);
    report("east tile", &east);
}
