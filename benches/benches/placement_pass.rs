// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Full placement passes over a synthetic tile of point labels.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cartouche_collision::{
    CanonicalTileId, CollisionBox, CollisionFeature, IndexedSubfeature, OverscaledTileId, TransformState,
};
use cartouche_placement::{
    BucketPlacementData, FeatureIndex, MapMode, PlacedSymbol, Placement, PlacementConfig, RenderTile, SymbolAnchor,
    SymbolBucket, SymbolInstance, SymbolLayer, SymbolLayout, VariableAnchorOffsetCollection,
};
use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Size, Vec2};

const EXTENT: f64 = 8192.0;

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        ((x >> 11) as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_bucket(n: usize, variable: bool) -> SymbolBucket {
    let mut rng = Rng::new(0xBADC_F00D_1234_5678);
    let mut bucket = SymbolBucket::new(1, "labels", SymbolLayout::default());
    for i in 0..n {
        let anchor = Point::new(rng.next_f64() * EXTENT, rng.next_f64() * EXTENT);
        let half_w = 160.0 + rng.next_f64() * 640.0;
        let footprint = CollisionFeature::point(
            CollisionBox::new(anchor, -half_w, -120.0, half_w, 120.0),
            IndexedSubfeature {
                index: i,
                ..IndexedSubfeature::default()
            },
        );
        let mut symbol = SymbolInstance::new(anchor, i as u32 + 1)
            .with_text(footprint, i, 8)
            .with_data_feature_index(i)
            .with_key(format!("label-{i}"));
        if variable {
            symbol = symbol.with_variable_anchors(
                VariableAnchorOffsetCollection::new([
                    (SymbolAnchor::Top, Vec2::ZERO),
                    (SymbolAnchor::Bottom, Vec2::ZERO),
                    (SymbolAnchor::Left, Vec2::ZERO),
                    (SymbolAnchor::Right, Vec2::ZERO),
                ]),
                16.0,
            );
        }
        bucket.symbol_instances.push(symbol);
        bucket.text.placed_symbols.push(PlacedSymbol {
            anchor_point: anchor,
            glyph_count: 8,
            ..PlacedSymbol::default()
        });
    }
    bucket
}

fn run_pass(mode: MapMode, bucket: &SymbolBucket, prev: Option<Arc<Placement>>, now: Instant) -> Placement {
    let state = TransformState::new(Size::new(1024.0, 1024.0)).with_zoom(1.0);
    let tile = RenderTile::new(OverscaledTileId::from_canonical(CanonicalTileId::new(1, 0, 0)), &state);
    let mut layer = SymbolLayer::new("labels");
    layer.push(BucketPlacementData {
        bucket,
        tile: &tile,
        feature_index: Arc::new(FeatureIndex::new(tile.id)),
        source_id: "source",
        sort_key_range: None,
    });
    let config = PlacementConfig {
        mode,
        ..PlacementConfig::default()
    };
    let mut placement = Placement::new(&config.update_parameters(state, now), prev);
    placement.place_layers(&[&layer]);
    placement
}

fn bench_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement_pass");
    for &n in &[500usize, 2000] {
        let fixed = gen_bucket(n, false);
        let variable = gen_bucket(n, true);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("static_n{n}"), |b| {
            b.iter(|| black_box(run_pass(MapMode::Static, &fixed, None, Instant::now()).placement_count()));
        });
        group.bench_function(format!("static_variable_n{n}"), |b| {
            b.iter(|| black_box(run_pass(MapMode::Static, &variable, None, Instant::now()).placement_count()));
        });
        group.bench_function(format!("tile_n{n}"), |b| {
            b.iter(|| black_box(run_pass(MapMode::Tile, &fixed, None, Instant::now()).placement_count()));
        });
        group.bench_function(format!("continuous_n{n}"), |b| {
            let t0 = Instant::now();
            b.iter_batched(
                || Arc::new(run_pass(MapMode::Continuous, &fixed, Some(Arc::new(Placement::empty())), t0)),
                |prev| {
                    let next = run_pass(MapMode::Continuous, &fixed, Some(prev), t0 + Duration::from_millis(100));
                    black_box(next.placement_count())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_modes);
criterion_main!(benches);
