// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tile passes: labels crossing tile borders are placed first, in an order every
//! tile computes the same way, so that neighbouring tiles agree on them.

use core::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use cartouche_collision::{
    CollisionBoundaries, CollisionBox, CollisionIndex, EXTENT, IntersectStatus, ProjectedCollisionBox,
};
use glam::{DMat4, DVec3};
use kurbo::{Point, Rect, Vec2};
use rustc_hash::{FxHashSet, FxHasher};

use super::Placement;
use super::strategy::Strategy;
use crate::bucket::SymbolPlacementType;
use crate::context::PlacementContext;
use crate::layer::{BucketPlacementData, RenderLayer};
use crate::opacity::JointPlacement;
use crate::symbol::{SymbolAnchor, SymbolInstance, variable_layout_offset};

/// A point label decided by a tile pass, for callers stitching tiles together.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedSymbolData {
    /// Label key.
    pub key: String,
    /// Projected text box, if the label has text.
    pub text_collision_box: Option<Rect>,
    /// Projected icon box, if the label has an icon.
    pub icon_collision_box: Option<Rect>,
    /// Text shown.
    pub text_placed: bool,
    /// Icon shown.
    pub icon_placed: bool,
    /// Placed while resolving border labels.
    pub intersects_tile_border: bool,
    /// Padding the boxes are offset by.
    pub viewport_padding: f64,
    /// Style layer of the label.
    pub layer: String,
}

#[derive(Debug)]
pub(super) struct TileState {
    populating: bool,
    current_priority: usize,
    pub(super) collect_data: bool,
    pub(super) placed_symbols: Vec<PlacedSymbolData>,
}

impl TileState {
    pub(super) fn new(collect_data: bool) -> Self {
        Self {
            populating: false,
            current_priority: 0,
            collect_data,
            placed_symbols: Vec::new(),
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
        let crosses = |shift: Vec2| {
            index
                .intersects_tile_edges(text_box, shift, &ctx.tile.matrix, ctx.pixel_ratio, &ctx.tile_borders)
                .intersects()
        };
        if self.populating && anchors.first() == Some(&anchor) && crosses(Vec2::ZERO) {
            return true;
        }
        if self.populating && self.current_priority > 0 {
            return false;
        }
        !crosses(shift)
    }

    pub(super) fn should_retry(&self, placement: &JointPlacement, ctx: &PlacementContext<'_>) -> bool {
        self.populating && !placement.placed() && ctx.has_variable_text_anchors
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
        if !self.collect_data
            || ctx.placement_type != SymbolPlacementType::Point
            || self.should_retry(placement, ctx)
        {
            return;
        }
        self.placed_symbols.push(PlacedSymbolData {
            key: symbol.key.clone(),
            text_collision_box: text_boxes.first().map(ProjectedCollisionBox::bounds),
            icon_collision_box: icon_boxes.first().map(ProjectedCollisionBox::bounds),
            text_placed: placement.text,
            icon_placed: placement.icon,
            intersects_tile_border: !placement.skip_fade && self.populating,
            viewport_padding,
            layer: ctx.bucket.bucket_leader_id.clone(),
        });
    }
}

struct Intersection<'a> {
    ctx: Rc<PlacementContext<'a>>,
    symbol_index: usize,
    status: IntersectStatus,
    priority: usize,
    anchor: Point,
    key_hash: u64,
}

/// Border labels first: higher-priority layers, more borders crossed, deeper cuts,
/// then top-to-bottom, left-to-right, and finally the key so the order is total.
fn compare(a: &Intersection<'_>, b: &Intersection<'_>) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| b.status.flags.cmp(&a.status.flags))
        .then_with(|| b.status.min_section_length.cmp(&a.status.min_section_length))
        .then_with(|| a.anchor.y.total_cmp(&b.anchor.y))
        .then_with(|| a.anchor.x.total_cmp(&b.anchor.x))
        .then_with(|| a.key_hash.cmp(&b.key_hash))
}

fn key_hash(key: &str) -> u64 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

fn tile_state(placement: &mut Placement) -> Option<&mut TileState> {
    match &mut placement.strategy {
        Strategy::Tile(state) => Some(state),
        Strategy::Continuous | Strategy::Static => None,
    }
}

pub(super) fn place_layers(placement: &mut Placement, layers: &[&dyn RenderLayer]) {
    if let Some(state) = tile_state(placement) {
        state.placed_symbols.clear();
        state.current_priority = 0;
        state.populating = true;
    }

    let mut seen = FxHashSet::default();
    let mut intersections = Vec::new();
    for &layer in layers.iter().rev() {
        for data in layer.placement_data() {
            populate_intersections(placement, data, &mut intersections);
        }
    }
    intersections.sort_by(compare);
    tracing::debug!(count = intersections.len(), "placing tile border labels");

    for intersection in &intersections {
        if let Some(state) = tile_state(placement) {
            state.current_priority = intersection.priority;
        }
        let id = intersection.ctx.bucket.symbol_instances[intersection.symbol_index].cross_tile_id;
        if seen.contains(&id) {
            continue;
        }
        let result = placement.place_symbol(intersection.symbol_index, &intersection.ctx);
        if placement.strategy.should_retry(&result, &intersection.ctx) {
            continue;
        }
        seen.insert(id);
    }

    if let Some(state) = tile_state(placement) {
        state.populating = false;
    }
    for &layer in layers.iter().rev() {
        placement.place_layer(layer, &mut seen);
    }
    placement.commit();
}

fn populate_intersections<'a>(
    placement: &mut Placement,
    data: &BucketPlacementData<'a>,
    intersections: &mut Vec<Intersection<'a>>,
) {
    let bucket = data.bucket;
    if bucket.layout.placement != SymbolPlacementType::Point || bucket.layout.avoid_edges {
        return;
    }
    let ctx = Rc::new(placement.build_context(data));
    let priority = tile_state(placement).map_or(0, |s| s.current_priority);

    let neighbour_borders = neighbour_borders(&placement.collision_index, &data.tile.matrix);

    for index in placement.sorted_symbols(data) {
        let symbol = &bucket.symbol_instances[index];
        if !symbol.is_valid() {
            continue;
        }
        let status = symbol_intersects_tile_edges(&placement.collision_index, symbol, &ctx, &neighbour_borders);
        if !status.intersects() {
            continue;
        }
        intersections.push(Intersection {
            ctx: Rc::clone(&ctx),
            symbol_index: index,
            status,
            priority,
            anchor: symbol.anchor,
            key_hash: key_hash(&symbol.key),
        });
    }

    if let Some(state) = tile_state(placement) {
        state.current_priority += 1;
    }
}

/// Projected borders of the four tiles sharing an edge with the tile at `matrix`.
fn neighbour_borders(index: &CollisionIndex, matrix: &DMat4) -> Vec<CollisionBoundaries> {
    [(0.0, -1.0), (0.0, 1.0), (-1.0, 0.0), (1.0, 0.0)]
        .into_iter()
        .map(|(dx, dy)| {
            let neighbour = *matrix * DMat4::from_translation(DVec3::new(dx * EXTENT, dy * EXTENT, 0.0));
            index.project_tile_boundaries(&neighbour)
        })
        .collect()
}

/// Border crossings of a label's text and icon boxes, each tested on its own.
///
/// With a variable text position the boxes are tested at the first anchor; the icon
/// only moves with the text when it is fitted to it and may not overlap.
fn symbol_intersects_tile_edges(
    index: &CollisionIndex,
    symbol: &SymbolInstance,
    ctx: &PlacementContext<'_>,
    neighbour_borders: &[CollisionBoundaries],
) -> IntersectStatus {
    let first_anchor = symbol.text_anchors().first().copied();
    let shift_for = |b: &CollisionBox| {
        first_anchor.map_or(Vec2::ZERO, |anchor| {
            variable_layout_offset(
                anchor,
                b.width(),
                b.height(),
                symbol.variable_offset_for(anchor),
                symbol.text_box_scale,
                ctx.rotate_text_with_map,
                ctx.pitch_text_with_map,
                ctx.bearing,
            )
        })
    };

    let mut result = IntersectStatus::default();
    if symbol.default_horizontal_placed_text_index().is_some()
        && let Some(text_box) = symbol.text_collision_feature.boxes.first()
    {
        result = box_intersects_tile_edges(index, text_box, shift_for(text_box), ctx, neighbour_borders);
    }
    if symbol.placed_icon_index.is_some()
        && let Some(icon_box) = symbol.icon_collision_feature.boxes.first()
    {
        let shift = if ctx.has_icon_text_fit && !ctx.icon_allow_overlap {
            shift_for(icon_box)
        } else {
            Vec2::ZERO
        };
        let icon = box_intersects_tile_edges(index, icon_box, shift, ctx, neighbour_borders);
        result.flags |= icon.flags;
        result.min_section_length = result.min_section_length.max(icon.min_section_length);
    }
    result
}

/// Borders of the box's own tile first, then those of its four neighbours.
fn box_intersects_tile_edges(
    index: &CollisionIndex,
    collision_box: &CollisionBox,
    shift: Vec2,
    ctx: &PlacementContext<'_>,
    neighbour_borders: &[CollisionBoundaries],
) -> IntersectStatus {
    core::iter::once(&ctx.tile_borders)
        .chain(neighbour_borders)
        .map(|borders| index.intersects_tile_edges(collision_box, shift, &ctx.tile.matrix, ctx.pixel_ratio, borders))
        .find(IntersectStatus::intersects)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{IconTextFit, SymbolBucket, SymbolLayout};
    use crate::layer::RenderTile;
    use crate::symbol::VariableAnchorOffsetCollection;
    use cartouche_collision::{
        BorderFlags, CanonicalTileId, CollisionFeature, CollisionGroup, IndexedSubfeature, OverscaledTileId,
        TransformState,
    };
    use kurbo::Size;

    /// Tile units per pixel for a zoom-1 tile at zoom 1.
    const UNITS_PER_PX: f64 = EXTENT / 512.0;

    /// Left of two zoom-1 tiles filling a 1024 x 512 viewport; its right border is at x = 512.
    fn left_tile() -> (TransformState, RenderTile) {
        let state = TransformState::new(Size::new(1024.0, 512.0))
            .with_zoom(1.0)
            .with_center(Point::new(0.5, 0.25));
        let tile = RenderTile::new(OverscaledTileId::from_canonical(CanonicalTileId::new(1, 0, 0)), &state);
        (state, tile)
    }

    /// A box spanning `x0..x1` by `-10..10` pixels around `anchor`.
    fn px_feature(anchor: Point, x0: f64, x1: f64) -> CollisionFeature {
        CollisionFeature::point(
            CollisionBox::new(
                anchor,
                x0 * UNITS_PER_PX,
                -10.0 * UNITS_PER_PX,
                x1 * UNITS_PER_PX,
                10.0 * UNITS_PER_PX,
            ),
            IndexedSubfeature::default(),
        )
    }

    fn status(symbol: &SymbolInstance, layout: SymbolLayout) -> IntersectStatus {
        let (state, tile) = left_tile();
        let index = CollisionIndex::new(state);
        let bucket = SymbolBucket::new(1, "labels", layout);
        let borders = index.project_tile_boundaries(&tile.matrix);
        let ctx = PlacementContext::new(&bucket, &tile, &state, CollisionGroup::GLOBAL, borders, None);
        symbol_intersects_tile_edges(&index, symbol, &ctx, &neighbour_borders(&index, &tile.matrix))
    }

    #[test]
    fn fitted_icon_is_tested_at_the_first_variable_anchor() {
        // 30 px left of the border: the 50 px icon only reaches across once shifted right.
        let anchor = Point::new(EXTENT - 30.0 * UNITS_PER_PX, EXTENT / 2.0);
        let symbol = SymbolInstance::new(anchor, 1)
            .with_text(px_feature(anchor, -10.0, 10.0), 0, 1)
            .with_icon(px_feature(anchor, -25.0, 25.0), 0, false)
            .with_variable_anchors(
                VariableAnchorOffsetCollection::new([(SymbolAnchor::Left, Vec2::ZERO)]),
                UNITS_PER_PX,
            );

        let fitted = SymbolLayout {
            icon_text_fit: IconTextFit::Both,
            ..SymbolLayout::default()
        };
        let s = status(&symbol, fitted);
        assert_eq!(s.flags, BorderFlags::VERTICAL_BORDERS, "shifted icon crosses the right border");
        assert_eq!(s.min_section_length, 20, "20 px of the icon sticks out");

        let overlapping = SymbolLayout {
            icon_allow_overlap: true,
            ..fitted
        };
        assert!(!status(&symbol, overlapping).intersects(), "overlapping icons stay put");
        assert!(!status(&symbol, SymbolLayout::default()).intersects(), "unfitted icons stay put");
    }

    #[test]
    fn icon_checks_neighbours_even_when_text_crosses() {
        // Text straddles the shared border; the icon sits far right, across the
        // right neighbour's far border.
        let anchor = Point::new(EXTENT - 10.0 * UNITS_PER_PX, EXTENT / 2.0);
        let symbol = SymbolInstance::new(anchor, 1)
            .with_text(px_feature(anchor, -20.0, 20.0), 0, 1)
            .with_icon(px_feature(anchor, 500.0, 540.0), 0, false);
        let s = status(&symbol, SymbolLayout::default());
        assert_eq!(s.flags, BorderFlags::VERTICAL_BORDERS, "both cross vertical borders");
        assert_eq!(s.min_section_length, 18, "the icon's deeper cut wins over the text's 10 px");
    }
}
