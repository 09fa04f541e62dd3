// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One placement pass: collision decisions for every label, then fade state.

mod render;
mod strategy;
mod tile;

use std::sync::Arc;
use std::time::{Duration, Instant};

use cartouche_collision::{
    CollisionFeature, CollisionIndex, IndexedSubfeature, OverscaledTileId, PlacedFeature, ProjectedCollisionBox,
    TransformState,
};
use kurbo::{Rect, Size, Vec2};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bucket::SymbolBucket;
use crate::config::{MapMode, TransitionOptions, UpdateParameters};
use crate::context::{CollisionGroups, PlacementContext};
use crate::error::PlacementError;
use crate::layer::{BucketPlacementData, FeatureIndex, RenderLayer};
use crate::opacity::{JointOpacityState, JointPlacement, VariableOffset};
use crate::symbol::{
    CrossTileId, INVALID_CROSS_TILE_ID, SymbolAnchor, SymbolInstance, TextWritingMode, WritingModes,
    variable_layout_offset,
};

use strategy::Strategy;
pub use tile::PlacedSymbolData;

/// Zoom levels over which fades speed up after zooming out.
const ZOOM_ADJUSTMENT_RANGE: f64 = 1.5;

/// Lower bound of the placement refresh period.
const MIN_UPDATE_PERIOD: Duration = Duration::from_millis(300);

/// What feature queries need from a placed bucket.
#[derive(Clone, Debug)]
pub struct RetainedQueryData {
    /// Bucket the data belongs to.
    pub bucket_instance_id: u32,
    /// Features of the bucket's tile.
    pub feature_index: Arc<FeatureIndex>,
    /// The bucket's tile.
    pub tile_id: OverscaledTileId,
    /// Draw order of source features when sorted by screen position.
    pub feature_sort_order: Option<Arc<[usize]>>,
}

type CollisionCircleKey = (u32, usize, bool);

/// The outcome of one placement pass.
///
/// Build one with [`Placement::new`], run [`Placement::place_layers`], then publish it
/// (see [`PlacementController`](crate::PlacementController)). A published placement is
/// only read.
pub struct Placement {
    update_parameters: Option<UpdateParameters>,
    collision_index: CollisionIndex,
    transition_options: TransitionOptions,
    commit_time: Option<Instant>,
    fade_start_time: Option<Instant>,
    placement_zoom: f64,
    prev_zoom_adjustment: f64,
    collision_groups: CollisionGroups,
    prev_placement: Option<Arc<Self>>,
    show_collision_boxes: bool,
    strategy: Strategy,

    placements: FxHashMap<CrossTileId, JointPlacement>,
    opacities: FxHashMap<CrossTileId, JointOpacityState>,
    variable_offsets: FxHashMap<CrossTileId, VariableOffset>,
    placed_orientations: FxHashMap<CrossTileId, TextWritingMode>,
    retained_query_data: FxHashMap<u32, RetainedQueryData>,
    collision_circles: FxHashMap<CollisionCircleKey, Vec<ProjectedCollisionBox>>,

    text_boxes: Vec<ProjectedCollisionBox>,
    icon_boxes: Vec<ProjectedCollisionBox>,
}

impl core::fmt::Debug for Placement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Placement")
            .field("strategy", &self.strategy)
            .field("commit_time", &self.commit_time)
            .field("fade_start_time", &self.fade_start_time)
            .field("placement_zoom", &self.placement_zoom)
            .field("placements", &self.placements.len())
            .field("opacities", &self.opacities.len())
            .field("has_prev_placement", &self.prev_placement.is_some())
            .finish_non_exhaustive()
    }
}

impl Placement {
    /// A placement that has never run: nothing placed, nothing fading.
    pub fn empty() -> Self {
        Self::from_parts(
            None,
            CollisionIndex::new(TransformState::new(Size::ZERO)),
            TransitionOptions::default(),
            None,
            0.0,
            CollisionGroups::new(true),
            None,
            false,
            Strategy::Continuous,
        )
    }

    /// A pass for `params`.
    ///
    /// `prev` is the currently published placement; continuous passes fade from it and
    /// require it (use [`Placement::empty`] for the first pass), static and tile passes
    /// ignore it.
    pub fn new(params: &UpdateParameters, prev: Option<Arc<Self>>) -> Self {
        let (strategy, prev) = match params.mode {
            MapMode::Continuous => (Strategy::Continuous, prev),
            MapMode::Static => (Strategy::Static, None),
            MapMode::Tile => (Strategy::tile(params.collect_placed_symbol_data), None),
        };
        debug_assert!(
            params.mode != MapMode::Continuous || prev.is_some(),
            "continuous placement needs the previous placement"
        );
        if params.mode == MapMode::Continuous && prev.is_none() {
            tracing::warn!("continuous placement without a previous placement; labels will not fade in");
        }
        Self::from_parts(
            Some(*params),
            CollisionIndex::new(params.transform_state),
            params.transition_options,
            Some(params.time_point),
            params.transform_state.zoom(),
            CollisionGroups::new(params.cross_source_collisions),
            prev,
            params.show_collision_boxes,
            strategy,
        )
    }

    fn from_parts(
        update_parameters: Option<UpdateParameters>,
        collision_index: CollisionIndex,
        transition_options: TransitionOptions,
        commit_time: Option<Instant>,
        placement_zoom: f64,
        collision_groups: CollisionGroups,
        prev_placement: Option<Arc<Self>>,
        show_collision_boxes: bool,
        strategy: Strategy,
    ) -> Self {
        Self {
            update_parameters,
            collision_index,
            transition_options,
            commit_time,
            fade_start_time: None,
            placement_zoom,
            prev_zoom_adjustment: 0.0,
            collision_groups,
            prev_placement,
            show_collision_boxes,
            strategy,
            placements: FxHashMap::default(),
            opacities: FxHashMap::default(),
            variable_offsets: FxHashMap::default(),
            placed_orientations: FxHashMap::default(),
            retained_query_data: FxHashMap::default(),
            collision_circles: FxHashMap::default(),
            text_boxes: Vec::new(),
            icon_boxes: Vec::new(),
        }
    }

    /// Place every label of `layers` and commit the fade state.
    ///
    /// Layers are given bottom to top; the topmost layer places first.
    pub fn place_layers(&mut self, layers: &[&dyn RenderLayer]) {
        let _span = tracing::debug_span!("place_layers", layers = layers.len()).entered();
        if matches!(self.strategy, Strategy::Tile(_)) {
            tile::place_layers(self, layers);
            return;
        }
        for layer in layers.iter().rev() {
            let mut seen = FxHashSet::default();
            self.place_layer(*layer, &mut seen);
        }
        self.commit();
    }

    fn place_layer(&mut self, layer: &dyn RenderLayer, seen: &mut FxHashSet<CrossTileId>) {
        for data in layer.placement_data() {
            self.place_symbol_bucket(data, seen);
        }
    }

    fn place_symbol_bucket(&mut self, data: &BucketPlacementData<'_>, seen: &mut FxHashSet<CrossTileId>) {
        let bucket = data.bucket;
        let ctx = self.build_context(data);
        for index in self.sorted_symbols(data) {
            let symbol = &bucket.symbol_instances[index];
            if !symbol.is_valid() || seen.contains(&symbol.cross_tile_id) {
                continue;
            }
            let placement = self.place_symbol(index, &ctx);
            if self.strategy.should_retry(&placement, &ctx) {
                continue;
            }
            if symbol.cross_tile_id != INVALID_CROSS_TILE_ID && !data.tile.hold_for_fade() {
                seen.insert(symbol.cross_tile_id);
            }
        }

        tracing::trace!(
            bucket = bucket.bucket_instance_id,
            symbols = bucket.symbol_instances.len(),
            "placed bucket"
        );
        bucket.set_just_reloaded(false);
        let bearing = self.collision_index.transform_state().bearing();
        self.retained_query_data
            .entry(bucket.bucket_instance_id)
            .or_insert_with(|| RetainedQueryData {
                bucket_instance_id: bucket.bucket_instance_id,
                feature_index: Arc::clone(&data.feature_index),
                tile_id: data.tile.id,
                feature_sort_order: bucket.feature_sort_order(bearing),
            });
    }

    fn build_context<'a>(&mut self, data: &BucketPlacementData<'a>) -> PlacementContext<'a> {
        let state = *self.collision_index.transform_state();
        let group = self.collision_groups.get(data.source_id);
        let tile_borders = self.collision_index.project_tile_boundaries(&data.tile.matrix);
        let avoid_edges = self.strategy.avoid_edges(data.bucket, &tile_borders);
        PlacementContext::new(
            data.bucket,
            data.tile,
            &state,
            group,
            tile_borders,
            avoid_edges,
        )
    }

    /// Placement order of a bucket's symbols.
    ///
    /// In a tilted view, labels shown by the previous pass go first, then new labels,
    /// then labels that were hidden, so that panning does not reshuffle the far field.
    fn sorted_symbols(&self, data: &BucketPlacementData<'_>) -> Vec<usize> {
        let bucket = data.bucket;
        let mut order = bucket.placement_order(
            data.sort_key_range.as_ref(),
            self.collision_index.transform_state().bearing(),
        );
        if self.is_tilted_view()
            && let Some(prev) = &self.prev_placement
        {
            order.sort_by_key(|&i| match prev.placements.get(&bucket.symbol_instances[i].cross_tile_id) {
                Some(p) if p.placed() => 0_u8,
                None => 1,
                Some(_) => 2,
            });
        }
        order
    }

    fn is_tilted_view(&self) -> bool {
        self.collision_index.transform_state().is_tilted()
    }

    /// Candidate anchors for `symbol`, with the anchor it was shown at last time moved to
    /// the front. In a tilted view only that anchor is kept.
    pub(crate) fn ordered_variable_anchors(&self, symbol: &SymbolInstance) -> Vec<SymbolAnchor> {
        let anchors = symbol.text_anchors();
        let Some(prev_anchor) = self
            .prev_placement
            .as_ref()
            .and_then(|prev| prev.variable_offsets.get(&symbol.cross_tile_id))
            .map(|offset| offset.anchor)
        else {
            return anchors;
        };
        match anchors.iter().position(|a| *a == prev_anchor) {
            Some(pos) if pos != 0 => {
                let mut ordered = vec![prev_anchor];
                if !self.is_tilted_view() {
                    ordered.extend(anchors.into_iter().filter(|a| *a != prev_anchor));
                }
                ordered
            }
            _ => anchors,
        }
    }

    fn text_placement_modes<'b>(bucket: &'b SymbolBucket, symbol: &SymbolInstance) -> &'b [TextWritingMode] {
        if bucket.allow_vertical_placement
            && symbol.writing_modes.contains(WritingModes::VERTICAL)
            && !bucket.placement_modes.is_empty()
        {
            &bucket.placement_modes
        } else {
            &[TextWritingMode::Horizontal]
        }
    }

    /// Decide one label and record it.
    pub(crate) fn place_symbol(&mut self, symbol_index: usize, ctx: &PlacementContext<'_>) -> JointPlacement {
        let bucket = ctx.bucket;
        let Some(symbol) = bucket.symbol_instances.get(symbol_index) else {
            return JointPlacement::UNPLACED;
        };
        let id = symbol.cross_tile_id;
        if !symbol.is_valid() || id == INVALID_CROSS_TILE_ID {
            return JointPlacement::UNPLACED;
        }
        if ctx.tile.hold_for_fade() {
            // Left unrecorded: the commit carries its opacity forward and fades it out.
            return JointPlacement::UNPLACED;
        }

        let layout = &bucket.layout;
        let variable_anchors = self.ordered_variable_anchors(symbol);
        self.text_boxes.clear();
        self.icon_boxes.clear();

        let mut place_text = false;
        let mut place_icon = false;
        let mut offscreen = true;
        let mut placed_vertical_text = false;
        let mut shift = Vec2::ZERO;

        if symbol.default_horizontal_placed_text_index().is_some() {
            let modes = Self::text_placement_modes(bucket, symbol);
            let mut placed = PlacedFeature::REJECTED;
            if variable_anchors.is_empty() {
                for &mode in modes {
                    let feature = match mode {
                        TextWritingMode::Horizontal => Some(&symbol.text_collision_feature),
                        TextWritingMode::Vertical => symbol.vertical_text_collision_feature.as_ref(),
                    };
                    if let Some(feature) = feature {
                        placed = self.place_fixed_text(ctx, feature, mode, id);
                    }
                    if placed.placed {
                        placed_vertical_text = mode == TextWritingMode::Vertical;
                        break;
                    }
                }
            } else if !symbol.text_collision_feature.along_line && !symbol.text_collision_feature.is_empty() {
                let do_variable_icon_placement =
                    ctx.has_icon_text_fit && !ctx.icon_allow_overlap && symbol.placed_icon_index.is_some();
                for &mode in modes {
                    let features = match mode {
                        TextWritingMode::Horizontal => {
                            Some((&symbol.text_collision_feature, &symbol.icon_collision_feature))
                        }
                        TextWritingMode::Vertical => symbol.vertical_text_collision_feature.as_ref().map(|text| {
                            (
                                text,
                                symbol
                                    .vertical_icon_collision_feature
                                    .as_ref()
                                    .unwrap_or(&symbol.icon_collision_feature),
                            )
                        }),
                    };
                    if let Some((text_feature, icon_feature)) = features {
                        placed = self.place_variable_anchors(
                            symbol,
                            ctx,
                            text_feature,
                            mode,
                            icon_feature,
                            &variable_anchors,
                            do_variable_icon_placement,
                            &mut shift,
                        );
                    }
                    if placed.placed {
                        placed_vertical_text = mode == TextWritingMode::Vertical;
                        break;
                    }
                }
                if !placed.placed
                    && let Some(prev_offset) = self
                        .prev_placement
                        .as_ref()
                        .and_then(|prev| prev.variable_offsets.get(&id))
                {
                    // Keep the old anchor so the label fades out where it was.
                    self.variable_offsets.insert(id, *prev_offset);
                }
            }
            place_text = placed.placed;
            offscreen &= placed.offscreen;
            self.update_previous_orientation_if_not_placed(bucket, id, place_text);
        }

        let text_feature = match (&symbol.vertical_text_collision_feature, placed_vertical_text) {
            (Some(vertical), true) => vertical,
            _ => &symbol.text_collision_feature,
        };
        let icon_feature = match (&symbol.vertical_icon_collision_feature, placed_vertical_text) {
            (Some(vertical), true) => vertical,
            _ => &symbol.icon_collision_feature,
        };

        if symbol.placed_icon_index.is_some() {
            if !(ctx.has_icon_text_fit && place_text && !variable_anchors.is_empty()) {
                shift = Vec2::ZERO;
            }
            self.icon_boxes.clear();
            let placed = self.collision_index.place_feature(
                icon_feature,
                shift,
                &ctx.tile.matrix,
                ctx.pixel_ratio,
                ctx.icon_allow_overlap,
                ctx.avoid_edges.as_ref(),
                ctx.collision_group,
                &mut self.icon_boxes,
            );
            place_icon = placed.placed;
            offscreen &= placed.offscreen;
        }

        let icon_without_text = !symbol.has_text() || layout.text_optional;
        let text_without_icon = !symbol.has_icon() || layout.icon_optional;
        if !icon_without_text && !text_without_icon {
            place_icon = place_text && place_icon;
            place_text = place_icon;
        } else if !text_without_icon {
            place_text = place_text && place_icon;
        } else if !icon_without_text {
            place_icon = place_text && place_icon;
        }

        if place_text {
            self.collision_index.insert_feature(
                text_feature,
                &self.text_boxes,
                layout.text_ignore_placement,
                bucket.bucket_instance_id,
                ctx.collision_group.id,
            );
        }
        if place_icon {
            self.collision_index.insert_feature(
                icon_feature,
                &self.icon_boxes,
                layout.icon_ignore_placement,
                bucket.bucket_instance_id,
                ctx.collision_group.id,
            );
        }

        if self.show_collision_boxes {
            self.keep_collision_circles(bucket.bucket_instance_id, symbol_index, text_feature, icon_feature);
        }

        let result = JointPlacement::new(
            place_text || ctx.always_show_text,
            place_icon || ctx.always_show_icon,
            offscreen || bucket.just_reloaded(),
        );
        self.placements.insert(id, result);
        self.strategy.new_symbol_placed(
            symbol,
            ctx,
            &result,
            &self.text_boxes,
            &self.icon_boxes,
            self.collision_index.viewport_padding(),
        );
        result
    }

    fn place_fixed_text(
        &mut self,
        ctx: &PlacementContext<'_>,
        feature: &CollisionFeature,
        orientation: TextWritingMode,
        id: CrossTileId,
    ) -> PlacedFeature {
        self.text_boxes.clear();
        let placed = self.collision_index.place_feature(
            feature,
            Vec2::ZERO,
            &ctx.tile.matrix,
            ctx.pixel_ratio,
            ctx.text_allow_overlap,
            ctx.avoid_edges.as_ref(),
            ctx.collision_group,
            &mut self.text_boxes,
        );
        if placed.placed && ctx.bucket.allow_vertical_placement {
            self.placed_orientations.entry(id).or_insert(orientation);
        }
        placed
    }

    /// Try each candidate anchor in turn; with overlap allowed, a second round accepts
    /// the first anchor that passes the other checks.
    fn place_variable_anchors(
        &mut self,
        symbol: &SymbolInstance,
        ctx: &PlacementContext<'_>,
        text_feature: &CollisionFeature,
        orientation: TextWritingMode,
        icon_feature: &CollisionFeature,
        anchors: &[SymbolAnchor],
        do_variable_icon_placement: bool,
        shift: &mut Vec2,
    ) -> PlacedFeature {
        let Some(text_box) = text_feature.boxes.first() else {
            return PlacedFeature::REJECTED;
        };
        let id = symbol.cross_tile_id;
        let (width, height) = (text_box.width(), text_box.height());
        let text_box_scale = symbol.text_box_scale;
        let attempts = if ctx.text_allow_overlap {
            anchors.len() * 2
        } else {
            anchors.len()
        };

        let mut placed = PlacedFeature::REJECTED;
        for i in 0..attempts {
            let anchor = anchors[i % anchors.len()];
            let offset = symbol.variable_offset_for(anchor);
            let allow_overlap = i >= anchors.len();
            *shift = variable_layout_offset(
                anchor,
                width,
                height,
                offset,
                text_box_scale,
                ctx.rotate_text_with_map,
                ctx.pitch_text_with_map,
                ctx.bearing,
            );
            self.text_boxes.clear();
            if !self
                .strategy
                .can_place_at_variable_anchor(&self.collision_index, ctx, text_box, anchor, *shift, anchors)
            {
                continue;
            }

            placed = self.collision_index.place_feature(
                text_feature,
                *shift,
                &ctx.tile.matrix,
                ctx.pixel_ratio,
                allow_overlap,
                ctx.avoid_edges.as_ref(),
                ctx.collision_group,
                &mut self.text_boxes,
            );

            if do_variable_icon_placement {
                let icon_placed = self.collision_index.place_feature(
                    icon_feature,
                    *shift,
                    &ctx.tile.matrix,
                    ctx.pixel_ratio,
                    ctx.icon_allow_overlap,
                    ctx.avoid_edges.as_ref(),
                    ctx.collision_group,
                    &mut self.icon_boxes,
                );
                self.icon_boxes.clear();
                if !icon_placed.placed {
                    placed = PlacedFeature::REJECTED;
                    continue;
                }
            }

            if placed.placed {
                let prev_anchor = self.prev_placement.as_ref().and_then(|prev| {
                    let offset = prev.variable_offsets.get(&id)?;
                    prev.placements
                        .get(&id)
                        .filter(|p| p.text)
                        .map(|_| offset.anchor)
                });
                self.variable_offsets.entry(id).or_insert(VariableOffset {
                    offset,
                    width,
                    height,
                    anchor,
                    text_box_scale,
                    prev_anchor,
                });
                if ctx.bucket.allow_vertical_placement {
                    self.placed_orientations.entry(id).or_insert(orientation);
                }
                break;
            }
        }
        placed
    }

    fn update_previous_orientation_if_not_placed(&mut self, bucket: &SymbolBucket, id: CrossTileId, placed: bool) {
        if !bucket.allow_vertical_placement || placed {
            return;
        }
        if let Some(orientation) = self
            .prev_placement
            .as_ref()
            .and_then(|prev| prev.placed_orientations.get(&id))
        {
            self.placed_orientations.insert(id, *orientation);
        }
    }

    fn keep_collision_circles(
        &mut self,
        bucket_instance_id: u32,
        symbol_index: usize,
        text_feature: &CollisionFeature,
        icon_feature: &CollisionFeature,
    ) {
        if icon_feature.along_line && !self.icon_boxes.is_empty() {
            self.collision_circles
                .insert((bucket_instance_id, symbol_index, false), self.icon_boxes.clone());
        }
        if text_feature.along_line && !self.text_boxes.is_empty() {
            self.collision_circles
                .insert((bucket_instance_id, symbol_index, true), self.text_boxes.clone());
        }
    }

    fn commit(&mut self) {
        let _span = tracing::debug_span!("commit").entered();
        match self.strategy {
            Strategy::Continuous => self.commit_fading(),
            Strategy::Static | Strategy::Tile(_) => self.commit_static(),
        }
        // Published placements are immutable; keeping the chain would only retain memory.
        self.prev_placement = None;
    }

    fn commit_fading(&mut self) {
        let Some(commit_time) = self.commit_time else {
            return;
        };
        let prev = self.prev_placement.clone();
        let mut placement_changed = false;

        let increment = match &prev {
            Some(prev) => {
                self.prev_zoom_adjustment = prev.zoom_adjustment(self.placement_zoom);
                prev.symbol_fade_change(commit_time)
            }
            None => 1.0,
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Fade increments are in [0, 1]; f32 is the vertex precision."
        )]
        let increment = increment as f32;

        for (&id, placement) in &self.placements {
            let prev_opacity = prev.as_ref().and_then(|p| p.opacities.get(&id));
            let opacity = match prev_opacity {
                Some(prev_opacity) => {
                    placement_changed |= placement.text != prev_opacity.text.placed
                        || placement.icon != prev_opacity.icon.placed;
                    JointOpacityState::from_prev(prev_opacity, increment, placement.text, placement.icon)
                }
                None => {
                    placement_changed |= placement.text || placement.icon;
                    JointOpacityState::new(placement.text, placement.icon, placement.skip_fade)
                }
            };
            self.opacities.insert(id, opacity);
        }

        if let Some(prev) = &prev {
            for (&id, prev_opacity) in &prev.opacities {
                if self.opacities.contains_key(&id) {
                    continue;
                }
                let opacity = JointOpacityState::from_prev(prev_opacity, increment, false, false);
                if !opacity.is_hidden() {
                    self.opacities.insert(id, opacity);
                    placement_changed |= prev_opacity.icon.placed || prev_opacity.text.placed;
                }
            }

            for (&id, offset) in &prev.variable_offsets {
                if !self.variable_offsets.contains_key(&id) && self.is_fading(id) {
                    self.variable_offsets.insert(id, *offset);
                }
            }
            for (&id, orientation) in &prev.placed_orientations {
                if !self.placed_orientations.contains_key(&id) && self.is_fading(id) {
                    self.placed_orientations.insert(id, *orientation);
                }
            }
        }

        self.fade_start_time = if placement_changed || prev.is_none() {
            Some(commit_time)
        } else {
            prev.as_ref().and_then(|p| p.fade_start_time)
        };
        tracing::debug!(
            placements = self.placements.len(),
            opacities = self.opacities.len(),
            placement_changed,
            "committed placement"
        );
    }

    fn is_fading(&self, id: CrossTileId) -> bool {
        self.opacities.get(&id).is_some_and(|o| !o.is_hidden())
    }

    fn commit_static(&mut self) {
        self.fade_start_time = self.commit_time;
        for (&id, placement) in &self.placements {
            self.opacities
                .insert(id, JointOpacityState::new(placement.text, placement.icon, true));
        }
    }

    /// Placement decision for `symbol`, if it was considered by this pass.
    pub fn get_symbol_placement(&self, symbol: &SymbolInstance) -> Option<&JointPlacement> {
        debug_assert_ne!(
            symbol.cross_tile_id, INVALID_CROSS_TILE_ID,
            "symbols without a cross-tile id are never placed"
        );
        self.placements.get(&symbol.cross_tile_id)
    }

    /// Query data retained for `bucket_instance_id`.
    pub fn get_query_data(&self, bucket_instance_id: u32) -> Result<&RetainedQueryData, PlacementError> {
        self.retained_query_data
            .get(&bucket_instance_id)
            .ok_or(PlacementError::UnknownBucket(bucket_instance_id))
    }

    /// Fade state of the label `id`.
    pub fn opacity(&self, id: CrossTileId) -> Option<&JointOpacityState> {
        self.opacities.get(&id)
    }

    /// Anchor chosen for the variable-position label `id`.
    pub fn variable_offset(&self, id: CrossTileId) -> Option<&VariableOffset> {
        self.variable_offsets.get(&id)
    }

    /// Orientation the label `id` is shown in.
    pub fn placed_orientation(&self, id: CrossTileId) -> Option<TextWritingMode> {
        self.placed_orientations.get(&id).copied()
    }

    /// Number of labels this pass decided.
    pub fn placement_count(&self) -> usize {
        self.placements.len()
    }

    /// Collision index built by this pass.
    pub fn collision_index(&self) -> &CollisionIndex {
        &self.collision_index
    }

    /// Features with a placed footprint inside `rect` (screen pixels).
    pub fn query_rendered_symbols(&self, rect: Rect) -> Vec<&IndexedSubfeature> {
        self.collision_index.query_rendered_symbols(rect)
    }

    /// Parameters the pass ran with; `None` for [`Placement::empty`].
    pub fn update_parameters(&self) -> Option<&UpdateParameters> {
        self.update_parameters.as_ref()
    }

    /// The previous placement, until this pass commits.
    pub fn prev_placement(&self) -> Option<&Arc<Self>> {
        self.prev_placement.as_ref()
    }

    /// Point labels recorded by a tile pass.
    pub fn placed_symbols_data(&self) -> &[PlacedSymbolData] {
        self.strategy.placed_symbols_data()
    }

    /// Enable or disable recording of placed point labels in tile passes.
    pub fn collect_placed_symbol_data(&mut self, enable: bool) {
        self.strategy.collect_placed_symbol_data(enable);
    }

    /// When this pass was committed.
    pub fn commit_time(&self) -> Option<Instant> {
        self.commit_time
    }

    /// When the fades that are running now started.
    pub fn fade_start_time(&self) -> Option<Instant> {
        self.fade_start_time
    }

    /// Zoom the pass placed at.
    pub fn placement_zoom(&self) -> f64 {
        self.placement_zoom
    }

    /// Whether this pass fades at all.
    pub fn transitions_enabled(&self) -> bool {
        match self.strategy {
            Strategy::Continuous => self.transition_options.enable_placement_transitions,
            Strategy::Static | Strategy::Tile(_) => false,
        }
    }

    /// How much faster fades run after zooming out from the placement zoom to `zoom`.
    ///
    /// Labels dropped by a zoom-out would otherwise pile up while they fade.
    pub fn zoom_adjustment(&self, zoom: f64) -> f64 {
        ((self.placement_zoom - zoom) / ZOOM_ADJUSTMENT_RANGE).max(0.0)
    }

    /// Opacity change for fades that have run from the commit time until `now`.
    ///
    /// Fades start once the configured delay has passed.
    pub fn symbol_fade_change(&self, now: Instant) -> f64 {
        if !self.transitions_enabled() {
            return 1.0;
        }
        let Some(commit_time) = self.commit_time else {
            return 1.0;
        };
        let duration = self.transition_options.duration_or_default().as_secs_f64();
        if duration <= 0.0 {
            return 1.0;
        }
        let elapsed = now
            .saturating_duration_since(commit_time)
            .saturating_sub(self.transition_options.delay_or_zero());
        elapsed.as_secs_f64() / duration + self.prev_zoom_adjustment
    }

    /// How often placement should be rerun at `zoom`.
    pub fn update_period(&self, zoom: f64) -> Duration {
        let base = self
            .transition_options
            .duration_or_default()
            .max(MIN_UPDATE_PERIOD);
        base.mul_f64((1.0 - self.zoom_adjustment(zoom)).max(0.0))
    }

    /// Whether fades started by this pass are still running at `now`.
    pub fn has_transitions(&self, now: Instant) -> bool {
        if !self.transitions_enabled() {
            return false;
        }
        let options = &self.transition_options;
        let total = options.delay_or_zero() + options.duration_or_default();
        self.fade_start_time
            .is_some_and(|start| now.saturating_duration_since(start) < total)
    }
}
