// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layers as placement sees them: per-tile buckets with their tile and feature index.

use std::sync::Arc;

use cartouche_collision::{IndexedSubfeature, OverscaledTileId, TransformState};
use glam::DMat4;

use crate::bucket::{SortKeyRange, SymbolBucket};

/// Source features of one tile, addressed by the indexes stored in collision footprints.
#[derive(Clone, Debug)]
pub struct FeatureIndex {
    tile_id: OverscaledTileId,
    features: Vec<IndexedSubfeature>,
}

impl FeatureIndex {
    /// An empty index for `tile_id`.
    pub fn new(tile_id: OverscaledTileId) -> Self {
        Self {
            tile_id,
            features: Vec::new(),
        }
    }

    /// Tile the features were read from.
    pub fn tile_id(&self) -> OverscaledTileId {
        self.tile_id
    }

    /// Append a feature; its position becomes its index.
    pub fn insert(&mut self, feature: IndexedSubfeature) -> usize {
        self.features.push(feature);
        self.features.len() - 1
    }

    /// Feature at `index`.
    pub fn get(&self, index: usize) -> Option<&IndexedSubfeature> {
        self.features.get(index)
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A tile as rendered this frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderTile {
    /// Tile id.
    pub id: OverscaledTileId,
    /// Tile-local to clip-space matrix.
    pub matrix: DMat4,
    hold_for_fade: bool,
}

impl RenderTile {
    /// A tile drawn under `state`.
    pub fn new(id: OverscaledTileId, state: &TransformState) -> Self {
        Self {
            id,
            matrix: state.matrix_for(&id.to_unwrapped()),
            hold_for_fade: false,
        }
    }

    /// Mark the tile as only kept on screen while its labels fade out.
    pub fn with_hold_for_fade(mut self, hold: bool) -> Self {
        self.hold_for_fade = hold;
        self
    }

    /// Whether the tile is being kept only for fading; its labels are not placed.
    pub fn hold_for_fade(&self) -> bool {
        self.hold_for_fade
    }
}

/// One bucket of a layer together with what is needed to place it.
#[derive(Clone, Debug)]
pub struct BucketPlacementData<'a> {
    /// The bucket.
    pub bucket: &'a SymbolBucket,
    /// Tile the bucket belongs to.
    pub tile: &'a RenderTile,
    /// Features of that tile.
    pub feature_index: Arc<FeatureIndex>,
    /// Source the layer reads from; selects the collision group.
    pub source_id: &'a str,
    /// Sort-key run to place, for layers split by sort key.
    pub sort_key_range: Option<SortKeyRange>,
}

/// A symbol layer, in placement's view.
pub trait RenderLayer {
    /// Style layer id.
    fn id(&self) -> &str;

    /// Buckets to place, one entry per tile (or per sort-key run).
    fn placement_data(&self) -> &[BucketPlacementData<'_>];
}

/// A plain [`RenderLayer`] over borrowed buckets.
#[derive(Clone, Debug)]
pub struct SymbolLayer<'a> {
    id: String,
    data: Vec<BucketPlacementData<'a>>,
}

impl<'a> SymbolLayer<'a> {
    /// An empty layer.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: Vec::new(),
        }
    }

    /// Add a bucket.
    pub fn push(&mut self, data: BucketPlacementData<'a>) {
        self.data.push(data);
    }
}

impl RenderLayer for SymbolLayer<'_> {
    fn id(&self) -> &str {
        &self.id
    }

    fn placement_data(&self) -> &[BucketPlacementData<'_>] {
        &self.data
    }
}
