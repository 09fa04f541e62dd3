// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fading between placements on a continuous map.
//!
//! Simulates 60 fps frames. A city label is shown first; after a few frames a
//! higher-priority capital label appears at the same spot, takes over, and the city
//! label fades out. The controller only re-places when the last placement is old enough.
//!
//! Run:
//! - `cargo run -p cartouche_demos --example placement_fade`
//! - `RUST_LOG=cartouche_placement=trace cargo run -p cartouche_demos --example placement_fade`

use std::sync::Arc;
use std::time::{Duration, Instant};

use cartouche_collision::{CanonicalTileId, CollisionBox, CollisionFeature, IndexedSubfeature, OverscaledTileId, TransformState};
use cartouche_placement::{
    BucketPlacementData, CrossTileId, FeatureIndex, PlacedSymbol, PlacementConfig, PlacementController, RenderTile,
    SymbolBucket, SymbolInstance, SymbolLayer, SymbolLayout,
};
use kurbo::{Point, Size};
use tracing_subscriber::EnvFilter;

const CAPITAL: CrossTileId = 1;
const CITY: CrossTileId = 2;

fn label(id: CrossTileId, index: usize, key: &str) -> SymbolInstance {
    let anchor = Point::new(4096.0, 4096.0);
    let footprint = CollisionFeature::point(
        CollisionBox::new(anchor, -480.0, -160.0, 480.0, 160.0),
        IndexedSubfeature::default(),
    );
    SymbolInstance::new(anchor, id)
        .with_text(footprint, index, key.len())
        .with_key(key)
}

fn bucket(id: u32, symbols: Vec<SymbolInstance>) -> SymbolBucket {
    let mut bucket = SymbolBucket::new(id, "places", SymbolLayout::default());
    for symbol in &symbols {
        bucket.text.placed_symbols.push(PlacedSymbol {
            anchor_point: symbol.anchor,
            glyph_count: symbol.glyph_quads.center,
            ..PlacedSymbol::default()
        });
    }
    bucket.symbol_instances = symbols;
    bucket
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state = TransformState::new(Size::new(512.0, 512.0));
    let tile = RenderTile::new(OverscaledTileId::from_canonical(CanonicalTileId::new(0, 0, 0)), &state);
    let feature_index = Arc::new(FeatureIndex::new(tile.id));
    let before = bucket(1, vec![label(CITY, 0, "Springfield")]);
    let after = bucket(2, vec![label(CAPITAL, 0, "Capital City"), label(CITY, 1, "Springfield")]);

    let config = PlacementConfig::default();
    let controller = PlacementController::new();
    let start = Instant::now();
    let frame = Duration::from_millis(16);

    for n in 0..48_u32 {
        let now = start + frame * n;
        let current = if n < 20 { &before } else { &after };
        let mut layer = SymbolLayer::new("places");
        layer.push(BucketPlacementData {
            bucket: current,
            tile: &tile,
            feature_index: Arc::clone(&feature_index),
            source_id: "places",
            sort_key_range: None,
        });

        let params = config.update_parameters(state, now);
        let placed = controller.update(&params, &[&layer], n == 20);
        let placement = controller.placement();
        placement.update_layer_buckets(&layer, &state, true);

        // Opacities as a renderer would interpolate them this frame.
        let fade = placement.symbol_fade_change(now) as f32;
        let shown = |id| {
            placement.opacity(id).map_or(0.0, |o| {
                let step = if o.text.placed { fade } else { -fade };
                (o.text.opacity + step).clamp(0.0, 1.0)
            })
        };
        tracing::info!(
            frame = n,
            placed,
            capital = shown(CAPITAL),
            city = shown(CITY),
            fading = controller.has_transitions(now),
        );
    }
}
