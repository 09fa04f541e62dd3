// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mode-specific behaviour of a placement pass.

use cartouche_collision::{CollisionBoundaries, CollisionBox, CollisionIndex, ProjectedCollisionBox};
use kurbo::Vec2;

use super::tile::{PlacedSymbolData, TileState};
use crate::bucket::{SymbolBucket, SymbolPlacementType};
use crate::context::PlacementContext;
use crate::opacity::JointPlacement;
use crate::symbol::{SymbolAnchor, SymbolInstance};

/// Continuous passes fade; static and tile passes show their result at once.
#[derive(Debug)]
pub(super) enum Strategy {
    Continuous,
    Static,
    Tile(TileState),
}

impl Strategy {
    pub(super) fn tile(collect_data: bool) -> Self {
        Self::Tile(TileState::new(collect_data))
    }

    /// Borders labels of `bucket` must stay inside.
    ///
    /// Only tile passes clip: elsewhere neighbouring tiles share one collision index.
    pub(super) fn avoid_edges(
        &self,
        bucket: &SymbolBucket,
        tile_borders: &CollisionBoundaries,
    ) -> Option<CollisionBoundaries> {
        match self {
            Self::Tile(_) => {
                let layout = &bucket.layout;
                (layout.avoid_edges || layout.placement == SymbolPlacementType::Line).then_some(*tile_borders)
            }
            Self::Continuous | Self::Static => None,
        }
    }

    pub(super) fn can_place_at_variable_anchor(
        &self,
        index: &CollisionIndex,
        ctx: &PlacementContext<'_>,
        text_box: &CollisionBox,
        anchor: SymbolAnchor,
        shift: Vec2,
        anchors: &[SymbolAnchor],
    ) -> bool {
        match self {
            Self::Tile(state) => state.can_place_at_variable_anchor(index, ctx, text_box, anchor, shift, anchors),
            Self::Continuous | Self::Static => true,
        }
    }

    /// Whether a label rejected during the border pass should get another chance later.
    pub(super) fn should_retry(&self, placement: &JointPlacement, ctx: &PlacementContext<'_>) -> bool {
        match self {
            Self::Tile(state) => state.should_retry(placement, ctx),
            Self::Continuous | Self::Static => false,
        }
    }

    pub(super) fn new_symbol_placed(
        &mut self,
        symbol: &SymbolInstance,
        ctx: &PlacementContext<'_>,
        placement: &JointPlacement,
        text_boxes: &[ProjectedCollisionBox],
        icon_boxes: &[ProjectedCollisionBox],
        viewport_padding: f64,
    ) {
        if let Self::Tile(state) = self {
            state.new_symbol_placed(symbol, ctx, placement, text_boxes, icon_boxes, viewport_padding);
        }
    }

    pub(super) fn placed_symbols_data(&self) -> &[PlacedSymbolData] {
        match self {
            Self::Tile(state) => &state.placed_symbols,
            Self::Continuous | Self::Static => &[],
        }
    }

    pub(super) fn collect_placed_symbol_data(&mut self, enable: bool) {
        if let Self::Tile(state) = self {
            state.collect_data = enable;
        }
    }
}
