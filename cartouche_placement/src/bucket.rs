// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Symbol buckets: the labels of one style layer in one tile, with the layout
//! properties placement reads and the render state placement writes.

use core::cell::{Cell, Ref, RefCell};
use std::sync::Arc;

use kurbo::{Point, Vec2};

use crate::symbol::{SymbolInstance, TextWritingMode};

/// How a layer's labels follow their geometry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SymbolPlacementType {
    /// One label per point.
    #[default]
    Point,
    /// Labels repeated along lines.
    Line,
    /// One label at the middle of each line.
    LineCenter,
}

/// Reference frame for label rotation or pitch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Aligned to the map plane.
    Map,
    /// Aligned to the screen.
    #[default]
    Viewport,
}

/// Draw and placement order of a layer's labels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SymbolZOrder {
    /// Viewport order when overlap is possible and no sort key is set, else source order.
    #[default]
    Auto,
    /// Top to bottom on screen.
    ViewportY,
    /// Source or sort-key order.
    Source,
}

/// How an icon stretches around its text.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum IconTextFit {
    /// No stretching.
    #[default]
    None,
    /// Stretch horizontally.
    Width,
    /// Stretch vertically.
    Height,
    /// Stretch both ways.
    Both,
}

/// Evaluated layout properties that affect placement.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SymbolLayout {
    /// Placement along geometry.
    pub placement: SymbolPlacementType,
    /// Ordering.
    pub z_order: SymbolZOrder,
    /// Whether a per-feature sort key is configured.
    pub has_sort_key: bool,
    /// Keep labels inside their tile.
    pub avoid_edges: bool,
    /// Labels of the layer ignore tile boundaries entirely.
    pub screen_space: bool,
    /// Text rotation alignment.
    pub text_rotation_alignment: Alignment,
    /// Text pitch alignment.
    pub text_pitch_alignment: Alignment,
    /// Icon rotation alignment.
    pub icon_rotation_alignment: Alignment,
    /// Icon pitch alignment.
    pub icon_pitch_alignment: Alignment,
    /// Text may overlap other labels.
    pub text_allow_overlap: bool,
    /// Icons may overlap other labels.
    pub icon_allow_overlap: bool,
    /// Text does not block other labels.
    pub text_ignore_placement: bool,
    /// Icons do not block other labels.
    pub icon_ignore_placement: bool,
    /// The icon may be shown without the text.
    pub text_optional: bool,
    /// The text may be shown without the icon.
    pub icon_optional: bool,
    /// Icon stretching.
    pub icon_text_fit: IconTextFit,
}

/// How a label size varies with zoom and feature.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SizeBinder {
    /// Same size everywhere.
    Constant(f64),
    /// Zoom-dependent, the same for every feature.
    Camera {
        /// Zoom of `min_size`.
        min_zoom: f64,
        /// Zoom of `max_size`.
        max_zoom: f64,
        /// Size at `min_zoom` and below.
        min_size: f64,
        /// Size at `max_zoom` and above.
        max_size: f64,
    },
    /// Per feature, constant over zoom. Sizes come from [`PlacedSymbol::lower_size`].
    Source,
    /// Per feature and zoom, interpolated between the placed symbol's lower and upper sizes.
    Composite {
        /// Zoom of the lower size.
        min_zoom: f64,
        /// Zoom of the upper size.
        max_zoom: f64,
    },
}

impl Default for SizeBinder {
    fn default() -> Self {
        Self::Constant(16.0)
    }
}

/// A [`SizeBinder`] evaluated at one zoom.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ZoomEvaluatedSize {
    /// The size does not depend on zoom.
    pub is_zoom_constant: bool,
    /// The size does not depend on the feature.
    pub is_feature_constant: bool,
    /// Interpolation factor between per-feature lower and upper sizes.
    pub size_t: f64,
    /// Size when feature-constant.
    pub size: f64,
}

fn interpolation_factor(zoom: f64, min_zoom: f64, max_zoom: f64) -> f64 {
    if max_zoom <= min_zoom {
        return 0.0;
    }
    ((zoom - min_zoom) / (max_zoom - min_zoom)).clamp(0.0, 1.0)
}

impl SizeBinder {
    /// Evaluate at `zoom`.
    pub fn evaluate_for_zoom(&self, zoom: f64) -> ZoomEvaluatedSize {
        match *self {
            Self::Constant(size) => ZoomEvaluatedSize {
                is_zoom_constant: true,
                is_feature_constant: true,
                size_t: 0.0,
                size,
            },
            Self::Camera {
                min_zoom,
                max_zoom,
                min_size,
                max_size,
            } => {
                let t = interpolation_factor(zoom, min_zoom, max_zoom);
                ZoomEvaluatedSize {
                    is_zoom_constant: false,
                    is_feature_constant: true,
                    size_t: t,
                    size: min_size + (max_size - min_size) * t,
                }
            }
            Self::Source => ZoomEvaluatedSize {
                is_zoom_constant: true,
                is_feature_constant: false,
                size_t: 0.0,
                size: 0.0,
            },
            Self::Composite { min_zoom, max_zoom } => ZoomEvaluatedSize {
                is_zoom_constant: false,
                is_feature_constant: false,
                size_t: interpolation_factor(zoom, min_zoom, max_zoom),
                size: 0.0,
            },
        }
    }
}

/// Size of one placed symbol under an evaluated binder.
pub fn evaluate_size_for_feature(size: &ZoomEvaluatedSize, symbol: &PlacedSymbol) -> f64 {
    if size.is_feature_constant {
        size.size
    } else {
        symbol.lower_size + (symbol.upper_size - symbol.lower_size) * size.size_t
    }
}

/// Static geometry of one shaped text or icon in a bucket buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PlacedSymbol {
    /// Tile-local anchor.
    pub anchor_point: Point,
    /// Quads drawn for this symbol.
    pub glyph_count: usize,
    /// Per-feature size at the lower zoom stop.
    pub lower_size: f64,
    /// Per-feature size at the upper zoom stop.
    pub upper_size: f64,
    /// Rotation of the anchor's line segment, in radians.
    pub angle: f64,
    /// Icon paired with this text, for icons stretched around text.
    pub placed_icon_index: Option<usize>,
}

/// A text or icon buffer of a bucket.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolBuffer {
    /// Shaped symbols, addressed by the `placed_*_index` fields of symbol instances.
    pub placed_symbols: Vec<PlacedSymbol>,
}

impl SymbolBuffer {
    /// Whether the buffer holds anything to draw.
    pub fn has_data(&self) -> bool {
        !self.placed_symbols.is_empty()
    }
}

/// Per-symbol state written by placement.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PlacedSymbolState {
    /// Not drawn.
    pub hidden: bool,
    /// Orientation the symbol was last shown in.
    pub placed_orientation: Option<TextWritingMode>,
    /// Cross-tile id, zeroed for shapings that were not chosen.
    pub cross_tile_id: u32,
}

/// Placed flag and opacity of one quad.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct OpacityVertex {
    /// Target state of the fade.
    pub placed: bool,
    /// Current opacity.
    pub opacity: f32,
}

/// Position override of one quad for this frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DynamicVertex {
    /// Not drawn this frame.
    Hidden,
    /// Drawn at `anchor` (label plane) rotated by `angle`.
    Visible {
        /// Label-plane anchor.
        anchor: Point,
        /// Rotation in radians.
        angle: f64,
    },
}

/// Render state of one buffer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BufferRenderState {
    /// Per placed symbol.
    pub placed: Vec<PlacedSymbolState>,
    /// Per quad.
    pub opacity_vertices: Vec<OpacityVertex>,
    /// Per quad; empty when positions are static.
    pub dynamic_vertices: Vec<DynamicVertex>,
}

impl BufferRenderState {
    fn sync(&mut self, buffer: &SymbolBuffer) {
        self.placed
            .resize(buffer.placed_symbols.len(), PlacedSymbolState::default());
    }
}

/// Debug state of one collision box or circle.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CollisionDebugVertex {
    /// The owning part was placed.
    pub placed: bool,
    /// The box belongs to a shaping that is not shown.
    pub not_used: bool,
    /// Shift applied by variable anchors, in tile units.
    pub shift: Vec2,
}

/// Everything placement writes back into a bucket.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BucketRenderState {
    /// Text buffer state.
    pub text: BufferRenderState,
    /// Colour icon buffer state.
    pub icon: BufferRenderState,
    /// SDF icon buffer state.
    pub sdf_icon: BufferRenderState,
    /// Text collision box debug state.
    pub text_collision_boxes: Vec<CollisionDebugVertex>,
    /// Icon collision box debug state.
    pub icon_collision_boxes: Vec<CollisionDebugVertex>,
    /// Text collision circle debug state.
    pub text_collision_circles: Vec<CollisionDebugVertex>,
    /// Icon collision circle debug state.
    pub icon_collision_circles: Vec<CollisionDebugVertex>,
    /// At least one variable-anchor label is currently visible.
    pub has_variable_placement: bool,
    /// Data feature indices in draw order, when sorted by screen position.
    pub feature_sort_order: Option<Arc<[usize]>>,
    /// Bearing `feature_sort_order` was computed for.
    pub sorted_angle: Option<f64>,
}

/// A contiguous run of symbols sharing one sort key.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SortKeyRange {
    /// The key.
    pub sort_key: f64,
    /// First symbol index.
    pub start: usize,
    /// One past the last symbol index.
    pub end: usize,
}

impl SortKeyRange {
    /// Whether this is the bucket's first run.
    pub fn is_first_range(&self) -> bool {
        self.start == 0
    }
}

/// The labels of one style layer in one tile.
#[derive(Debug)]
pub struct SymbolBucket {
    /// Unique id of this bucket instance.
    pub bucket_instance_id: u32,
    /// Id of the style layer the bucket was built for.
    pub bucket_leader_id: String,
    /// Layout properties.
    pub layout: SymbolLayout,
    /// Labels in source or sort-key order.
    pub symbol_instances: Vec<SymbolInstance>,
    /// Text geometry.
    pub text: SymbolBuffer,
    /// Colour icon geometry.
    pub icon: SymbolBuffer,
    /// SDF icon geometry.
    pub sdf_icon: SymbolBuffer,
    /// Text size.
    pub text_size: SizeBinder,
    /// Icon size.
    pub icon_size: SizeBinder,
    /// Whether vertical text may be placed.
    pub allow_vertical_placement: bool,
    /// Writing modes to try in order when vertical placement is allowed.
    pub placement_modes: Vec<TextWritingMode>,
    /// Tile units per pixel at the tile's own zoom.
    pub tile_pixel_ratio: f64,
    /// Whether collision debug state is maintained.
    pub has_collision_debug_data: bool,
    just_reloaded: Cell<bool>,
    render: RefCell<BucketRenderState>,
}

impl SymbolBucket {
    /// An empty bucket for the layer `leader_id`.
    pub fn new(bucket_instance_id: u32, leader_id: impl Into<String>, layout: SymbolLayout) -> Self {
        Self {
            bucket_instance_id,
            bucket_leader_id: leader_id.into(),
            layout,
            symbol_instances: Vec::new(),
            text: SymbolBuffer::default(),
            icon: SymbolBuffer::default(),
            sdf_icon: SymbolBuffer::default(),
            text_size: SizeBinder::default(),
            icon_size: SizeBinder::default(),
            allow_vertical_placement: false,
            placement_modes: vec![TextWritingMode::Horizontal],
            tile_pixel_ratio: 1.0,
            has_collision_debug_data: false,
            just_reloaded: Cell::new(false),
            render: RefCell::new(BucketRenderState::default()),
        }
    }

    /// Whether the bucket has text to draw.
    pub fn has_text_data(&self) -> bool {
        self.text.has_data()
    }

    /// Whether the bucket has colour icons to draw.
    pub fn has_icon_data(&self) -> bool {
        self.icon.has_data()
    }

    /// Whether the bucket has SDF icons to draw.
    pub fn has_sdf_icon_data(&self) -> bool {
        self.sdf_icon.has_data()
    }

    /// Whether any label has a variable text position.
    pub fn has_variable_text_anchors(&self) -> bool {
        self.symbol_instances
            .iter()
            .any(|s| s.text_variable_anchor_offset.as_ref().is_some_and(|c| !c.is_empty()))
    }

    /// Whether the bucket was just reloaded and has not been placed since.
    pub fn just_reloaded(&self) -> bool {
        self.just_reloaded.get()
    }

    /// Mark the bucket as freshly reloaded (or not).
    pub fn set_just_reloaded(&self, value: bool) {
        self.just_reloaded.set(value);
    }

    /// Render state written by the last update.
    pub fn render_state(&self) -> Ref<'_, BucketRenderState> {
        self.render.borrow()
    }

    pub(crate) fn render_state_mut(&self) -> core::cell::RefMut<'_, BucketRenderState> {
        let mut render = self.render.borrow_mut();
        render.text.sync(&self.text);
        render.icon.sync(&self.icon);
        render.sdf_icon.sync(&self.sdf_icon);
        render
    }

    /// Whether labels are ordered top to bottom on screen.
    pub fn sort_features_by_y(&self) -> bool {
        let layout = &self.layout;
        match layout.z_order {
            SymbolZOrder::ViewportY => true,
            SymbolZOrder::Source => false,
            SymbolZOrder::Auto => {
                !layout.has_sort_key
                    && (layout.text_allow_overlap
                        || layout.icon_allow_overlap
                        || layout.text_ignore_placement
                        || layout.icon_ignore_placement)
            }
        }
    }

    /// Symbol indices ordered by rotated screen y, ties by source feature index descending.
    pub fn sorted_symbols(&self, angle: f64) -> Vec<usize> {
        let (sin, cos) = angle.sin_cos();
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Rounded tile coordinates fit in i64."
        )]
        let rotated_y = |s: &SymbolInstance| (sin * s.anchor.x + cos * s.anchor.y).round() as i64;
        let mut order: Vec<usize> = (0..self.symbol_instances.len()).collect();
        order.sort_by(|&a, &b| {
            let (sa, sb) = (&self.symbol_instances[a], &self.symbol_instances[b]);
            rotated_y(sa)
                .cmp(&rotated_y(sb))
                .then(sb.data_feature_index.cmp(&sa.data_feature_index))
        });
        order
    }

    /// Symbol indices in the order they are placed: bottom of the screen first when
    /// sorted by y, otherwise the bucket order restricted to `range`.
    pub fn placement_order(&self, range: Option<&SortKeyRange>, angle: f64) -> Vec<usize> {
        if self.sort_features_by_y() {
            let mut order = self.sorted_symbols(angle);
            order.reverse();
            order
        } else if let Some(range) = range {
            (range.start..range.end.min(self.symbol_instances.len())).collect()
        } else {
            (0..self.symbol_instances.len()).collect()
        }
    }

    /// Draw order of source features for `angle`, when sorted by screen position.
    pub fn feature_sort_order(&self, angle: f64) -> Option<Arc<[usize]>> {
        self.sort_features_by_y().then(|| {
            self.sorted_symbols(angle)
                .into_iter()
                .map(|i| self.symbol_instances[i].data_feature_index)
                .collect()
        })
    }

    /// Refresh the draw order in the render state if the bearing changed.
    pub(crate) fn sort_features(&self, angle: f64) {
        if !self.sort_features_by_y() {
            return;
        }
        let mut render = self.render.borrow_mut();
        if render.sorted_angle == Some(angle) {
            return;
        }
        render.sorted_angle = Some(angle);
        render.feature_sort_order = self.feature_sort_order(angle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_with_anchors(anchors: &[(f64, f64)]) -> SymbolBucket {
        let mut b = SymbolBucket::new(
            1,
            "labels",
            SymbolLayout {
                z_order: SymbolZOrder::ViewportY,
                ..SymbolLayout::default()
            },
        );
        b.symbol_instances = anchors
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                SymbolInstance::new(Point::new(x, y), u32::try_from(i + 1).unwrap()).with_data_feature_index(i)
            })
            .collect();
        b
    }

    #[test]
    fn sorted_symbols_follow_screen_y() {
        let b = bucket_with_anchors(&[(0.0, 30.0), (0.0, 10.0), (0.0, 20.0)]);
        assert_eq!(b.sorted_symbols(0.0), [1, 2, 0]);
        assert_eq!(b.placement_order(None, 0.0), [0, 2, 1], "lowest label is placed first");
    }

    #[test]
    fn sorted_symbols_ties_break_by_feature_index_descending() {
        let b = bucket_with_anchors(&[(0.0, 10.0), (5.0, 10.0)]);
        assert_eq!(b.sorted_symbols(0.0), [1, 0]);
    }

    #[test]
    fn rotation_changes_the_order() {
        // At a quarter turn the rotated y is the x coordinate.
        let b = bucket_with_anchors(&[(30.0, 0.0), (10.0, 50.0)]);
        assert_eq!(b.sorted_symbols(core::f64::consts::FRAC_PI_2), [1, 0]);
    }

    #[test]
    fn auto_z_order_sorts_only_when_overlap_is_possible() {
        let mut b = bucket_with_anchors(&[(0.0, 0.0)]);
        b.layout.z_order = SymbolZOrder::Auto;
        assert!(!b.sort_features_by_y(), "no overlap, source order");
        b.layout.icon_allow_overlap = true;
        assert!(b.sort_features_by_y(), "overlap allowed, viewport order");
        b.layout.has_sort_key = true;
        assert!(!b.sort_features_by_y(), "a sort key wins");
    }

    #[test]
    fn sort_key_range_limits_placement_order() {
        let mut b = bucket_with_anchors(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0)]);
        b.layout.z_order = SymbolZOrder::Source;
        let range = SortKeyRange {
            sort_key: 2.0,
            start: 1,
            end: 3,
        };
        assert_eq!(b.placement_order(Some(&range), 0.0), [1, 2]);
        assert!(!range.is_first_range(), "range starting at 1 is not the first");
    }

    #[test]
    fn composite_size_interpolates_per_feature() {
        let size = SizeBinder::Composite {
            min_zoom: 10.0,
            max_zoom: 12.0,
        }
        .evaluate_for_zoom(11.0);
        let symbol = PlacedSymbol {
            lower_size: 10.0,
            upper_size: 20.0,
            ..PlacedSymbol::default()
        };
        assert_eq!(evaluate_size_for_feature(&size, &symbol), 15.0);
        let constant = SizeBinder::Constant(12.0).evaluate_for_zoom(3.0);
        assert_eq!(evaluate_size_for_feature(&constant, &symbol), 12.0);
    }
}
