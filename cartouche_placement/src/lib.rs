// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=cartouche_placement --heading-base-level=0

//! Cartouche Placement: which map labels to show, and how they fade.
//!
//! A placement pass walks the symbol layers of a frame from top to bottom, tests every
//! label against the labels already accepted, and records one decision per cross-tile id.
//! The decisions are then blended with the previous pass into opacities that renderers
//! interpolate between frames.
//!
//! - [`SymbolBucket`] holds the labels of one layer in one tile, as produced by layout,
//!   along with the render state this crate writes back.
//! - [`Placement`] is one pass. It is built from [`UpdateParameters`], run with
//!   [`Placement::place_layers`], and read afterwards.
//! - [`PlacementController`] publishes passes and decides when the next one is due.
//! - [`MapMode`] selects the strategy: continuous maps fade from the previous pass,
//!   static maps show their result at once, and tile passes place labels crossing tile
//!   borders first so that neighbouring tiles rendered separately agree on them.
//!
//! Labels that keep their cross-tile id across tile reloads keep their fade state and,
//! for variable-anchor text, their anchor.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! use cartouche_collision::{
//!     CanonicalTileId, CollisionBox, CollisionFeature, IndexedSubfeature, OverscaledTileId,
//!     TransformState,
//! };
//! use cartouche_placement::{
//!     BucketPlacementData, FeatureIndex, PlacedSymbol, PlacementConfig, PlacementController,
//!     RenderTile, SymbolBucket, SymbolInstance, SymbolLayer, SymbolLayout,
//! };
//! use kurbo::{Point, Size};
//!
//! let state = TransformState::new(Size::new(512.0, 512.0));
//! let tile = RenderTile::new(OverscaledTileId::from_canonical(CanonicalTileId::new(0, 0, 0)), &state);
//!
//! let anchor = Point::new(4096.0, 4096.0);
//! let footprint = CollisionFeature::point(
//!     CollisionBox::new(anchor, -320.0, -160.0, 320.0, 160.0),
//!     IndexedSubfeature::default(),
//! );
//! let mut bucket = SymbolBucket::new(1, "labels", SymbolLayout::default());
//! bucket.symbol_instances.push(SymbolInstance::new(anchor, 1).with_text(footprint, 0, 5));
//! bucket.text.placed_symbols.push(PlacedSymbol { anchor_point: anchor, glyph_count: 5, ..PlacedSymbol::default() });
//!
//! let mut layer = SymbolLayer::new("labels");
//! layer.push(BucketPlacementData {
//!     bucket: &bucket,
//!     tile: &tile,
//!     feature_index: Arc::new(FeatureIndex::new(tile.id)),
//!     source_id: "streets",
//!     sort_key_range: None,
//! });
//!
//! let controller = PlacementController::new();
//! let params = PlacementConfig::default().update_parameters(state, Instant::now());
//! assert!(controller.update(&params, &[&layer], true));
//!
//! let placement = controller.placement();
//! assert!(placement.get_symbol_placement(&bucket.symbol_instances[0]).is_some_and(|p| p.text));
//! placement.update_layer_buckets(&layer, &state, true);
//! assert_eq!(bucket.render_state().text.opacity_vertices.len(), 5);
//! ```

pub mod bucket;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod layer;
pub mod opacity;
pub mod placement;
pub mod symbol;

pub use bucket::{
    Alignment, BucketRenderState, IconTextFit, PlacedSymbol, SizeBinder, SortKeyRange, SymbolBucket,
    SymbolLayout, SymbolPlacementType, SymbolZOrder,
};
pub use config::{DEFAULT_TRANSITION_DURATION, MapMode, PlacementConfig, TransitionOptions, UpdateParameters};
pub use context::{CollisionGroups, PlacementContext};
pub use controller::{NEW_SYMBOLS_UPDATE_PERIOD, PlacementController};
pub use error::PlacementError;
pub use layer::{BucketPlacementData, FeatureIndex, RenderLayer, RenderTile, SymbolLayer};
pub use opacity::{JointOpacityState, JointPlacement, OpacityState, VariableOffset};
pub use placement::{PlacedSymbolData, Placement, RetainedQueryData};
pub use symbol::{
    CrossTileId, INVALID_CROSS_TILE_ID, SymbolAnchor, SymbolInstance, TextWritingMode,
    VariableAnchorOffsetCollection, WritingModes,
};
