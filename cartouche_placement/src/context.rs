// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-bucket values shared by every label placed from that bucket.

use cartouche_collision::{CollisionBoundaries, CollisionGroup, EXTENT, TILE_SIZE, TransformState};
use rustc_hash::FxHashMap;

use crate::bucket::{Alignment, IconTextFit, SymbolBucket, SymbolPlacementType};
use crate::layer::RenderTile;

/// Assigns collision groups to sources.
///
/// With cross-source collisions every source shares the global group; otherwise each
/// source gets its own isolated group, numbered from 1 in order of first use.
#[derive(Clone, Debug)]
pub struct CollisionGroups {
    cross_source_collisions: bool,
    max_group_id: u16,
    groups: FxHashMap<String, CollisionGroup>,
}

impl CollisionGroups {
    /// Groups for a pass.
    pub fn new(cross_source_collisions: bool) -> Self {
        Self {
            cross_source_collisions,
            max_group_id: 0,
            groups: FxHashMap::default(),
        }
    }

    /// Group of `source_id`, allocating one on first use.
    pub fn get(&mut self, source_id: &str) -> CollisionGroup {
        if self.cross_source_collisions {
            return CollisionGroup::GLOBAL;
        }
        if let Some(group) = self.groups.get(source_id) {
            return *group;
        }
        self.max_group_id = self.max_group_id.wrapping_add(1);
        let group = CollisionGroup::isolated(self.max_group_id);
        self.groups.insert(source_id.to_owned(), group);
        group
    }
}

/// Values derived once per bucket for a placement pass.
#[derive(Debug)]
pub struct PlacementContext<'a> {
    /// The bucket being placed.
    pub bucket: &'a SymbolBucket,
    /// Its tile.
    pub tile: &'a RenderTile,
    /// Camera bearing.
    pub bearing: f64,
    /// Pixels per tile unit for collision boxes.
    pub pixel_ratio: f64,
    /// Text is drawn in the map plane (pitched).
    pub pitch_text_with_map: bool,
    /// Text rotates with the map.
    pub rotate_text_with_map: bool,
    /// Geometry placement of the layer.
    pub placement_type: SymbolPlacementType,
    /// Group the bucket's labels collide in.
    pub collision_group: CollisionGroup,
    /// Text may overlap.
    pub text_allow_overlap: bool,
    /// Icons may overlap.
    pub icon_allow_overlap: bool,
    /// Text is shown even when it collides, because icons may overlap and text is optional.
    pub always_show_text: bool,
    /// Icon is shown even when it collides, because text may overlap and icons are optional.
    pub always_show_icon: bool,
    /// Icons stretch around text.
    pub has_icon_text_fit: bool,
    /// Some label of the bucket has a variable text position.
    pub has_variable_text_anchors: bool,
    /// Projected borders of the tile.
    pub tile_borders: CollisionBoundaries,
    /// Borders labels must stay inside, when edges are avoided.
    pub avoid_edges: Option<CollisionBoundaries>,
}

impl<'a> PlacementContext<'a> {
    /// Context for placing `bucket` of `tile` under the camera `state`.
    pub fn new(
        bucket: &'a SymbolBucket,
        tile: &'a RenderTile,
        state: &TransformState,
        collision_group: CollisionGroup,
        tile_borders: CollisionBoundaries,
        avoid_edges: Option<CollisionBoundaries>,
    ) -> Self {
        let layout = &bucket.layout;
        let pixel_ratio = TILE_SIZE * tile.id.overscale_factor() / EXTENT;
        let has_icon = bucket.has_icon_data() || bucket.has_sdf_icon_data();
        let text_allow_overlap = layout.text_allow_overlap;
        let icon_allow_overlap = layout.icon_allow_overlap;

        Self {
            bucket,
            tile,
            bearing: state.bearing(),
            pixel_ratio,
            pitch_text_with_map: layout.text_pitch_alignment == Alignment::Map,
            rotate_text_with_map: layout.text_rotation_alignment == Alignment::Map,
            placement_type: layout.placement,
            collision_group,
            text_allow_overlap,
            icon_allow_overlap,
            always_show_text: text_allow_overlap && (icon_allow_overlap || !has_icon || layout.icon_optional),
            always_show_icon: icon_allow_overlap && (text_allow_overlap || !bucket.has_text_data() || layout.text_optional),
            has_icon_text_fit: layout.icon_text_fit != IconTextFit::None,
            has_variable_text_anchors: bucket.has_variable_text_anchors(),
            tile_borders,
            avoid_edges,
        }
    }
}
