// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Writing a placement back into bucket render state.

use core::iter::repeat_n;

use cartouche_collision::{CollisionFeature, TransformState, label_plane_matrix, project};
use glam::DMat4;
use kurbo::{Point, Vec2};
use rustc_hash::FxHashSet;

use super::Placement;
use crate::bucket::{
    Alignment, BucketRenderState, BufferRenderState, CollisionDebugVertex, DynamicVertex, IconTextFit, OpacityVertex,
    SortKeyRange, SymbolBuffer, SymbolBucket, SymbolPlacementType, evaluate_size_for_feature,
};
use crate::layer::{RenderLayer, RenderTile};
use crate::opacity::{JointOpacityState, OpacityState, VariableOffset};
use crate::symbol::{CrossTileId, SymbolAnchor, SymbolInstance, TextWritingMode, variable_layout_offset};

/// Font size glyph metrics are laid out at.
const ONE_EM: f64 = 24.0;

/// Text shapings of `symbol` as `(buffer index, quads)`, each index once.
fn text_shapings(symbol: &SymbolInstance) -> Vec<(usize, usize)> {
    let quads = symbol.glyph_quads;
    let mut out: Vec<(usize, usize)> = Vec::with_capacity(4);
    for (index, count) in [
        (symbol.placed_right_text_index, quads.right),
        (symbol.placed_center_text_index, quads.center),
        (symbol.placed_left_text_index, quads.left),
        (symbol.placed_vertical_text_index, quads.vertical),
    ] {
        if let Some(index) = index
            && !out.iter().any(|(seen, _)| *seen == index)
        {
            out.push((index, count));
        }
    }
    out
}

fn opacity_vertex(state: &OpacityState) -> OpacityVertex {
    OpacityVertex {
        placed: state.placed,
        opacity: state.opacity,
    }
}

/// Keep only the shaping matching the chosen anchor (or the vertical shaping) tagged
/// with the label's cross-tile id; the others are zeroed so they are not drawn.
pub(super) fn mark_used_justification(
    text: &mut BufferRenderState,
    anchor: SymbolAnchor,
    symbol: &SymbolInstance,
    orientation: TextWritingMode,
) {
    let chosen = match orientation {
        TextWritingMode::Vertical => symbol.placed_vertical_text_index,
        TextWritingMode::Horizontal => symbol.text_index_for(anchor.justification()),
    };
    for index in [
        symbol.placed_right_text_index,
        symbol.placed_center_text_index,
        symbol.placed_left_text_index,
        symbol.placed_vertical_text_index,
    ]
    .into_iter()
    .flatten()
    {
        let Some(state) = text.placed.get_mut(index) else {
            continue;
        };
        if Some(index) == chosen {
            state.cross_tile_id = symbol.cross_tile_id;
            state.placed_orientation = Some(orientation);
        } else {
            state.cross_tile_id = 0;
        }
    }
}

/// Record which orientation each shaping of `symbol` is shown in.
pub(super) fn mark_used_orientation(text: &mut BufferRenderState, orientation: TextWritingMode, symbol: &SymbolInstance) {
    let horizontal = (orientation == TextWritingMode::Horizontal).then_some(orientation);
    let vertical = (orientation == TextWritingMode::Vertical).then_some(orientation);
    for index in [
        symbol.placed_right_text_index,
        symbol.placed_center_text_index,
        symbol.placed_left_text_index,
    ]
    .into_iter()
    .flatten()
    {
        if let Some(state) = text.placed.get_mut(index) {
            state.placed_orientation = horizontal;
        }
    }
    if let Some(state) = symbol
        .placed_vertical_text_index
        .and_then(|index| text.placed.get_mut(index))
    {
        state.placed_orientation = vertical;
    }
}

impl Placement {
    /// Write this placement into the render state of every bucket of `layer`.
    ///
    /// Opacities are only rewritten when `update_opacities` is set; dynamic positions
    /// always are. Layers split by sort key are updated once, through their first run.
    pub fn update_layer_buckets(&self, layer: &dyn RenderLayer, state: &TransformState, update_opacities: bool) {
        let mut seen = FxHashSet::default();
        for data in layer.placement_data() {
            if data
                .sort_key_range
                .as_ref()
                .is_none_or(SortKeyRange::is_first_range)
            {
                if update_opacities {
                    self.update_bucket_opacities(data.bucket, state, &mut seen);
                }
                self.update_bucket_dynamic_vertices(data.bucket, state, data.tile);
            }
        }
    }

    /// Rewrite opacity vertices and hidden flags of `bucket`.
    ///
    /// A cross-tile id already in `seen` is a duplicate from an overlapping tile and is
    /// hidden without fading.
    pub fn update_bucket_opacities(
        &self,
        bucket: &SymbolBucket,
        state: &TransformState,
        seen: &mut FxHashSet<CrossTileId>,
    ) {
        {
            let mut render = bucket.render_state_mut();
            render.text.opacity_vertices.clear();
            render.icon.opacity_vertices.clear();
            render.sdf_icon.opacity_vertices.clear();
            render.text_collision_boxes.clear();
            render.icon_collision_boxes.clear();
            render.text_collision_circles.clear();
            render.icon_collision_circles.clear();

            let layout = &bucket.layout;
            let has_icon_buffer = bucket.has_icon_data() || bucket.has_sdf_icon_data();
            let reloaded = layout.screen_space || bucket.just_reloaded();
            let duplicate = JointOpacityState::new(false, false, true);
            // With overlap allowed a fresh bucket is shown at once, before it is placed.
            let default_state = JointOpacityState::new(
                reloaded
                    && layout.text_allow_overlap
                    && (layout.icon_allow_overlap || !has_icon_buffer || layout.icon_optional),
                reloaded
                    && layout.icon_allow_overlap
                    && (layout.text_allow_overlap || !bucket.has_text_data() || layout.text_optional),
                true,
            );

            for (symbol_index, symbol) in bucket.symbol_instances.iter().enumerate() {
                if !symbol.is_valid() {
                    continue;
                }
                let id = symbol.cross_tile_id;
                let is_duplicate = !seen.insert(id);
                let opacity = if is_duplicate {
                    duplicate
                } else {
                    self.opacities.get(&id).copied().unwrap_or(default_state)
                };

                if (symbol.has_text() || symbol.has_icon())
                    && !symbol.check_indexes(
                        bucket.text.placed_symbols.len(),
                        bucket.icon.placed_symbols.len(),
                        bucket.sdf_icon.placed_symbols.len(),
                    )
                {
                    continue;
                }

                if symbol.has_text() {
                    let vertex = opacity_vertex(&opacity.text);
                    let hidden = opacity.text.is_hidden();
                    for (index, quads) in text_shapings(symbol) {
                        render.text.placed[index].hidden = hidden;
                        render.text.opacity_vertices.extend(repeat_n(vertex, quads));
                    }
                    if bucket.allow_vertical_placement
                        && let Some(orientation) = self.placed_orientations.get(&id)
                    {
                        mark_used_orientation(&mut render.text, *orientation, symbol);
                    }
                }

                if symbol.has_icon() {
                    let vertex = opacity_vertex(&opacity.icon);
                    let hidden = opacity.icon.is_hidden();
                    let buffer = if symbol.has_sdf_icon() {
                        &mut render.sdf_icon
                    } else {
                        &mut render.icon
                    };
                    for index in [symbol.placed_icon_index, symbol.placed_vertical_icon_index]
                        .into_iter()
                        .flatten()
                    {
                        buffer.placed[index].hidden = hidden;
                        buffer.opacity_vertices.extend(repeat_n(vertex, symbol.icon_quads));
                    }
                }

                if bucket.has_collision_debug_data {
                    self.update_collision_debug(&mut render, bucket, symbol_index, symbol, &opacity, state);
                }
            }
        }
        bucket.sort_features(state.bearing());
    }

    fn update_collision_debug(
        &self,
        render: &mut BucketRenderState,
        bucket: &SymbolBucket,
        symbol_index: usize,
        symbol: &SymbolInstance,
        opacity: &JointOpacityState,
        state: &TransformState,
    ) {
        let layout = &bucket.layout;
        let variable_offset = self.variable_offsets.get(&symbol.cross_tile_id);
        let has_variable_anchors = symbol
            .text_variable_anchor_offset
            .as_ref()
            .is_some_and(|c| !c.is_empty());
        let text_shift = variable_offset.map_or(Vec2::ZERO, |offset| {
            variable_layout_offset(
                offset.anchor,
                offset.width,
                offset.height,
                offset.offset,
                offset.text_box_scale,
                layout.text_rotation_alignment == Alignment::Map,
                layout.text_pitch_alignment == Alignment::Map,
                state.bearing(),
            )
        });
        let text_used = !has_variable_anchors || variable_offset.is_some();
        let icon_shift = if layout.icon_text_fit == IconTextFit::None {
            Vec2::ZERO
        } else {
            text_shift
        };

        let debug = |feature: &CollisionFeature,
                     placed: bool,
                     used: bool,
                     shift: Vec2,
                     is_text: bool,
                     boxes: &mut Vec<CollisionDebugVertex>,
                     circles: &mut Vec<CollisionDebugVertex>| {
            if feature.along_line {
                let kept = self
                    .collision_circles
                    .get(&(bucket.bucket_instance_id, symbol_index, is_text));
                let vertex = CollisionDebugVertex {
                    placed,
                    not_used: kept.is_none(),
                    shift: Vec2::ZERO,
                };
                let count = kept.map_or(feature.boxes.len(), Vec::len);
                circles.extend(repeat_n(vertex, count));
            } else {
                let vertex = CollisionDebugVertex {
                    placed,
                    not_used: !used,
                    shift,
                };
                boxes.extend(repeat_n(vertex, feature.boxes.len()));
            }
        };

        if symbol.has_text() {
            debug(
                &symbol.text_collision_feature,
                opacity.text.placed,
                text_used,
                text_shift,
                true,
                &mut render.text_collision_boxes,
                &mut render.text_collision_circles,
            );
        }
        if symbol.has_icon() {
            debug(
                &symbol.icon_collision_feature,
                opacity.icon.placed,
                true,
                icon_shift,
                false,
                &mut render.icon_collision_boxes,
                &mut render.icon_collision_circles,
            );
        }
    }

    /// Rewrite per-frame glyph positions of `bucket`.
    ///
    /// Returns whether the bucket has dynamic positions this frame.
    pub fn update_bucket_dynamic_vertices(&self, bucket: &SymbolBucket, state: &TransformState, tile: &RenderTile) -> bool {
        let layout = &bucket.layout;
        let pixels_to_tile_units = tile.id.to_unwrapped().pixels_to_tile_units(1.0, state.zoom());
        let rotate_text_with_map = layout.text_rotation_alignment == Alignment::Map;
        let pitch_text_with_map = layout.text_pitch_alignment == Alignment::Map;
        let text_label_plane = label_plane_matrix(
            &tile.matrix,
            pitch_text_with_map,
            rotate_text_with_map,
            state,
            pixels_to_tile_units,
        );
        let mut render = bucket.render_state_mut();

        if layout.placement != SymbolPlacementType::Point {
            let mut result = false;
            if bucket.has_text_data() && rotate_text_with_map {
                reproject_line_labels(&mut render.text, &bucket.text, &text_label_plane);
                result = true;
            }
            if layout.icon_rotation_alignment == Alignment::Map {
                let icon_label_plane = label_plane_matrix(
                    &tile.matrix,
                    layout.icon_pitch_alignment == Alignment::Map,
                    true,
                    state,
                    pixels_to_tile_units,
                );
                if bucket.has_icon_data() {
                    reproject_line_labels(&mut render.icon, &bucket.icon, &icon_label_plane);
                    result = true;
                }
                if bucket.has_sdf_icon_data() {
                    reproject_line_labels(&mut render.sdf_icon, &bucket.sdf_icon, &icon_label_plane);
                    result = true;
                }
            }
            return result;
        }

        if bucket.has_text_data() && bucket.has_variable_text_anchors() {
            let text_size = bucket.text_size.evaluate_for_zoom(state.zoom());
            let render = &mut *render;
            render.text.dynamic_vertices.clear();
            render.has_variable_placement = false;

            for symbol in &bucket.symbol_instances {
                let id = symbol.cross_tile_id;
                let offset = self.variable_offsets.get(&id);
                let orientation = self
                    .placed_orientations
                    .get(&id)
                    .copied()
                    .filter(|_| bucket.allow_vertical_placement)
                    .unwrap_or(TextWritingMode::Horizontal);
                if let Some(offset) = offset {
                    mark_used_justification(&mut render.text, offset.anchor, symbol, orientation);
                }

                for (index, _) in text_shapings(symbol) {
                    let Some(placed) = bucket.text.placed_symbols.get(index) else {
                        continue;
                    };
                    let hidden = render.text.placed.get(index).is_none_or(|s| s.hidden);
                    let position = offset.filter(|_| !hidden).and_then(|offset| {
                        shifted_anchor(
                            placed.anchor_point,
                            offset,
                            evaluate_size_for_feature(&text_size, placed),
                            state,
                            &tile.matrix,
                            &text_label_plane,
                            pitch_text_with_map,
                            rotate_text_with_map,
                            pixels_to_tile_units,
                        )
                    });
                    let vertex = match position {
                        Some(anchor) => {
                            render.has_variable_placement = true;
                            DynamicVertex::Visible {
                                anchor,
                                angle: placed.angle,
                            }
                        }
                        None => DynamicVertex::Hidden,
                    };
                    render.text.dynamic_vertices.extend(repeat_n(vertex, placed.glyph_count));
                }
            }
            return true;
        }

        if bucket.has_text_data() && bucket.allow_vertical_placement {
            let render = &mut *render;
            render.text.dynamic_vertices.clear();
            for (placed, placed_state) in bucket.text.placed_symbols.iter().zip(&render.text.placed) {
                let vertex = if placed_state.hidden || placed_state.placed_orientation.is_none() {
                    DynamicVertex::Hidden
                } else {
                    DynamicVertex::Visible {
                        anchor: placed.anchor_point,
                        angle: placed.angle,
                    }
                };
                render.text.dynamic_vertices.extend(repeat_n(vertex, placed.glyph_count));
            }
            return true;
        }

        false
    }
}

/// Label-plane anchor of text drawn at a variable anchor.
///
/// Viewport-pitched text is shifted in pixels after projection; map-pitched text is
/// shifted in tile units before it.
fn shifted_anchor(
    tile_anchor: Point,
    offset: &VariableOffset,
    font_size: f64,
    state: &TransformState,
    pos_matrix: &DMat4,
    label_plane: &DMat4,
    pitch_with_map: bool,
    rotate_with_map: bool,
    pixels_to_tile_units: f64,
) -> Option<Point> {
    let (_, w) = project(tile_anchor, pos_matrix)?;
    let perspective_ratio = 0.5 + 0.5 * (state.camera_to_center_distance() / w);
    let render_text_size = if pitch_with_map {
        font_size / ONE_EM * pixels_to_tile_units
    } else {
        font_size * perspective_ratio / ONE_EM
    };
    let align = offset.anchor.alignment();
    let scale = if offset.text_box_scale == 0.0 {
        1.0
    } else {
        offset.text_box_scale
    };
    let shift = Vec2::new(
        (-(align.horizontal_align - 0.5) * offset.width / scale + offset.offset.x) * render_text_size,
        (-(align.vertical_align - 0.5) * offset.height / scale + offset.offset.y) * render_text_size,
    );
    if pitch_with_map {
        project(tile_anchor + shift, label_plane).map(|(p, _)| p)
    } else {
        let shift = if rotate_with_map {
            let (sin, cos) = (-state.bearing()).sin_cos();
            Vec2::new(cos * shift.x - sin * shift.y, sin * shift.x + cos * shift.y)
        } else {
            shift
        };
        project(tile_anchor, label_plane).map(|(p, _)| p + shift)
    }
}

/// Place each glyph run of a line label at its projected anchor, hiding runs that are
/// hidden or behind the camera.
fn reproject_line_labels(render: &mut BufferRenderState, buffer: &SymbolBuffer, label_plane: &DMat4) {
    render.dynamic_vertices.clear();
    for (placed, placed_state) in buffer.placed_symbols.iter().zip(&render.placed) {
        let vertex = if placed_state.hidden {
            DynamicVertex::Hidden
        } else {
            match project(placed.anchor_point, label_plane) {
                Some((anchor, _)) => DynamicVertex::Visible {
                    anchor,
                    angle: placed.angle,
                },
                None => DynamicVertex::Hidden,
            }
        };
        render.dynamic_vertices.extend(repeat_n(vertex, placed.glyph_count));
    }
}
