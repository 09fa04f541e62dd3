// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Symbol instances: one label (text, icon, or both) produced by layout.

use core::cell::Cell;

use cartouche_collision::CollisionFeature;
use kurbo::{Point, Vec2};

/// Identifier shared by copies of one label across zoom levels and tiles.
pub type CrossTileId = u32;

/// Cross-tile id of a symbol that has not been assigned one. Such symbols are never placed.
pub const INVALID_CROSS_TILE_ID: CrossTileId = 0;

/// Position of a label's text relative to its anchor point.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolAnchor {
    /// Centered on the anchor.
    Center,
    /// Anchor on the left edge.
    Left,
    /// Anchor on the right edge.
    Right,
    /// Anchor on the top edge.
    Top,
    /// Anchor on the bottom edge.
    Bottom,
    /// Anchor at the top-left corner.
    TopLeft,
    /// Anchor at the top-right corner.
    TopRight,
    /// Anchor at the bottom-left corner.
    BottomLeft,
    /// Anchor at the bottom-right corner.
    BottomRight,
}

/// Fractions of the label's width and height that lie before the anchor.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AnchorAlignment {
    /// 0 for left-anchored, 0.5 centered, 1 for right-anchored.
    pub horizontal_align: f64,
    /// 0 for top-anchored, 0.5 centered, 1 for bottom-anchored.
    pub vertical_align: f64,
}

impl SymbolAnchor {
    /// Alignment fractions for this anchor.
    pub fn alignment(self) -> AnchorAlignment {
        let horizontal_align = match self {
            Self::Left | Self::TopLeft | Self::BottomLeft => 0.0,
            Self::Right | Self::TopRight | Self::BottomRight => 1.0,
            Self::Center | Self::Top | Self::Bottom => 0.5,
        };
        let vertical_align = match self {
            Self::Top | Self::TopLeft | Self::TopRight => 0.0,
            Self::Bottom | Self::BottomLeft | Self::BottomRight => 1.0,
            Self::Center | Self::Left | Self::Right => 0.5,
        };
        AnchorAlignment {
            horizontal_align,
            vertical_align,
        }
    }

    /// Text justification that reads naturally at this anchor.
    pub fn justification(self) -> TextJustify {
        match self {
            Self::Left | Self::TopLeft | Self::BottomLeft => TextJustify::Left,
            Self::Right | Self::TopRight | Self::BottomRight => TextJustify::Right,
            Self::Center | Self::Top | Self::Bottom => TextJustify::Center,
        }
    }
}

/// Horizontal justification of the lines of a label.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextJustify {
    /// Lines flush left.
    Left,
    /// Lines centered.
    Center,
    /// Lines flush right.
    Right,
}

/// Orientation text was laid out in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextWritingMode {
    /// Left to right.
    Horizontal,
    /// Top to bottom.
    Vertical,
}

bitflags::bitflags! {
    /// Writing modes a label was shaped for.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct WritingModes: u8 {
        /// Horizontal shaping present.
        const HORIZONTAL = 0b0000_0001;
        /// Vertical shaping present.
        const VERTICAL   = 0b0000_0010;
    }
}

bitflags::bitflags! {
    /// Parts a label carries.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SymbolContent: u8 {
        /// Has shaped text.
        const TEXT      = 0b0000_0001;
        /// Has a colour icon.
        const ICON_RGBA = 0b0000_0010;
        /// Has a signed-distance-field icon.
        const ICON_SDF  = 0b0000_0100;
    }
}

/// One candidate anchor with its extra offset in ems.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VariableAnchorOffset {
    /// Anchor position.
    pub anchor: SymbolAnchor,
    /// Additional offset from the anchor, in ems.
    pub offset: Vec2,
}

/// Ordered candidate anchors for a label with a variable position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableAnchorOffsetCollection(Vec<VariableAnchorOffset>);

impl VariableAnchorOffsetCollection {
    /// Collection from `(anchor, offset)` pairs in preference order.
    pub fn new(entries: impl IntoIterator<Item = (SymbolAnchor, Vec2)>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(anchor, offset)| VariableAnchorOffset { anchor, offset })
                .collect(),
        )
    }

    /// Whether no anchors are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Anchors in preference order.
    pub fn anchors(&self) -> impl Iterator<Item = SymbolAnchor> + '_ {
        self.0.iter().map(|e| e.anchor)
    }

    /// Offset configured for `anchor`, zero if it is not a candidate.
    pub fn offset_for(&self, anchor: SymbolAnchor) -> Vec2 {
        self.0
            .iter()
            .find(|e| e.anchor == anchor)
            .map_or(Vec2::ZERO, |e| e.offset)
    }
}

/// Where a text box has to move so that `anchor` sits at the label's anchor point.
///
/// `width` and `height` are the unshifted box size. The result is in the same units and
/// is rotated into the label plane when the text rotates with the map.
pub fn variable_layout_offset(
    anchor: SymbolAnchor,
    width: f64,
    height: f64,
    offset: Vec2,
    text_box_scale: f64,
    rotate_with_map: bool,
    pitch_with_map: bool,
    bearing: f64,
) -> Vec2 {
    let align = anchor.alignment();
    let shift = Vec2::new(
        -(align.horizontal_align - 0.5) * width + offset.x * text_box_scale,
        -(align.vertical_align - 0.5) * height + offset.y * text_box_scale,
    );
    if rotate_with_map {
        let angle = if pitch_with_map { bearing } else { -bearing };
        let (sin, cos) = angle.sin_cos();
        Vec2::new(cos * shift.x - sin * shift.y, sin * shift.x + cos * shift.y)
    } else {
        shift
    }
}

/// Glyph quads per justification, for text shaped more than once.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GlyphQuadCounts {
    /// Quads of the right-justified shaping.
    pub right: usize,
    /// Quads of the centered shaping.
    pub center: usize,
    /// Quads of the left-justified shaping.
    pub left: usize,
    /// Quads of the vertical shaping.
    pub vertical: usize,
}

/// A label produced by layout, ready for placement.
///
/// The `placed_*_index` fields point into the owning bucket's text and icon buffers.
#[derive(Debug, Clone)]
pub struct SymbolInstance {
    /// Tile-local anchor point.
    pub anchor: Point,
    /// Identity shared with copies of this label in other tiles.
    pub cross_tile_id: CrossTileId,
    /// Label key, used to break ties between border labels.
    pub key: String,
    /// Parts the label carries.
    pub content: SymbolContent,
    /// Writing modes the text was shaped for.
    pub writing_modes: WritingModes,
    /// Index of the source feature in the tile data.
    pub data_feature_index: usize,
    /// Footprint of the horizontal text.
    pub text_collision_feature: CollisionFeature,
    /// Footprint of the icon.
    pub icon_collision_feature: CollisionFeature,
    /// Footprint of the vertical text.
    pub vertical_text_collision_feature: Option<CollisionFeature>,
    /// Footprint of the icon when paired with vertical text.
    pub vertical_icon_collision_feature: Option<CollisionFeature>,
    /// Right-justified text in the text buffer.
    pub placed_right_text_index: Option<usize>,
    /// Centered text in the text buffer.
    pub placed_center_text_index: Option<usize>,
    /// Left-justified text in the text buffer.
    pub placed_left_text_index: Option<usize>,
    /// Vertical text in the text buffer.
    pub placed_vertical_text_index: Option<usize>,
    /// Icon in the icon buffer (SDF buffer for SDF icons).
    pub placed_icon_index: Option<usize>,
    /// Icon paired with vertical text.
    pub placed_vertical_icon_index: Option<usize>,
    /// Glyph quads per shaping.
    pub glyph_quads: GlyphQuadCounts,
    /// Icon quads (per icon shaping).
    pub icon_quads: usize,
    /// Tile units per em used when applying variable anchor offsets.
    pub text_box_scale: f64,
    /// Candidate anchors when the text position is variable.
    pub text_variable_anchor_offset: Option<VariableAnchorOffsetCollection>,
    /// Whether the text has a single line (one justification suffices).
    pub single_line: bool,
    failed: Cell<bool>,
}

impl SymbolInstance {
    /// An empty label at `anchor`.
    pub fn new(anchor: Point, cross_tile_id: CrossTileId) -> Self {
        Self {
            anchor,
            cross_tile_id,
            key: String::new(),
            content: SymbolContent::empty(),
            writing_modes: WritingModes::HORIZONTAL,
            data_feature_index: 0,
            text_collision_feature: CollisionFeature::default(),
            icon_collision_feature: CollisionFeature::default(),
            vertical_text_collision_feature: None,
            vertical_icon_collision_feature: None,
            placed_right_text_index: None,
            placed_center_text_index: None,
            placed_left_text_index: None,
            placed_vertical_text_index: None,
            placed_icon_index: None,
            placed_vertical_icon_index: None,
            glyph_quads: GlyphQuadCounts::default(),
            icon_quads: 0,
            text_box_scale: 1.0,
            text_variable_anchor_offset: None,
            single_line: true,
            failed: Cell::new(false),
        }
    }

    /// Attach centered single-line text at `text_index` of the text buffer.
    pub fn with_text(mut self, feature: CollisionFeature, text_index: usize, glyph_quads: usize) -> Self {
        self.content |= SymbolContent::TEXT;
        self.text_collision_feature = feature;
        self.placed_center_text_index = Some(text_index);
        self.glyph_quads.center = glyph_quads;
        self
    }

    /// Attach an icon at `icon_index` of the icon buffer (SDF buffer when `sdf`).
    pub fn with_icon(mut self, feature: CollisionFeature, icon_index: usize, sdf: bool) -> Self {
        self.content |= if sdf {
            SymbolContent::ICON_SDF
        } else {
            SymbolContent::ICON_RGBA
        };
        self.icon_collision_feature = feature;
        self.placed_icon_index = Some(icon_index);
        self.icon_quads = 1;
        self
    }

    /// Attach vertical text at `text_index` of the text buffer.
    pub fn with_vertical_text(mut self, feature: CollisionFeature, text_index: usize, glyph_quads: usize) -> Self {
        self.writing_modes |= WritingModes::VERTICAL;
        self.vertical_text_collision_feature = Some(feature);
        self.placed_vertical_text_index = Some(text_index);
        self.glyph_quads.vertical = glyph_quads;
        self
    }

    /// Give the text a variable position.
    pub fn with_variable_anchors(mut self, anchors: VariableAnchorOffsetCollection, text_box_scale: f64) -> Self {
        self.text_variable_anchor_offset = Some(anchors);
        self.text_box_scale = text_box_scale;
        self
    }

    /// Set the label key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set the source feature index.
    pub fn with_data_feature_index(mut self, index: usize) -> Self {
        self.data_feature_index = index;
        self
    }

    /// Whether the label has text.
    pub fn has_text(&self) -> bool {
        self.content.contains(SymbolContent::TEXT)
    }

    /// Whether the label has an icon of either kind.
    pub fn has_icon(&self) -> bool {
        self.content
            .intersects(SymbolContent::ICON_RGBA | SymbolContent::ICON_SDF)
    }

    /// Whether the icon is a signed-distance-field icon.
    pub fn has_sdf_icon(&self) -> bool {
        self.content.contains(SymbolContent::ICON_SDF)
    }

    /// Whether the label is still eligible for placement.
    pub fn is_valid(&self) -> bool {
        !self.failed.get()
    }

    /// Exclude the label from placement from now on.
    pub fn force_fail(&self) {
        self.failed.set(true);
    }

    /// Verify the buffer indexes against buffer sizes, failing the label if any is out of range.
    pub fn check_indexes(&self, text_count: usize, icon_count: usize, sdf_icon_count: usize) -> bool {
        let icon_limit = if self.has_sdf_icon() {
            sdf_icon_count
        } else {
            icon_count
        };
        let text_ok = [
            self.placed_right_text_index,
            self.placed_center_text_index,
            self.placed_left_text_index,
            self.placed_vertical_text_index,
        ]
        .into_iter()
        .flatten()
        .all(|i| i < text_count);
        let icon_ok = [self.placed_icon_index, self.placed_vertical_icon_index]
            .into_iter()
            .flatten()
            .all(|i| i < icon_limit);
        if !(text_ok && icon_ok) {
            tracing::error!(
                cross_tile_id = self.cross_tile_id,
                key = %self.key,
                "symbol buffer index out of range; label disabled"
            );
            self.force_fail();
            return false;
        }
        true
    }

    /// Text index used for collision when text is horizontal: right, else center, else left.
    pub fn default_horizontal_placed_text_index(&self) -> Option<usize> {
        self.placed_right_text_index
            .or(self.placed_center_text_index)
            .or(self.placed_left_text_index)
    }

    /// Candidate anchors in preference order; empty for fixed-position text.
    pub fn text_anchors(&self) -> Vec<SymbolAnchor> {
        self.text_variable_anchor_offset
            .as_ref()
            .map(|c| c.anchors().collect())
            .unwrap_or_default()
    }

    /// Offset configured for `anchor`.
    pub fn variable_offset_for(&self, anchor: SymbolAnchor) -> Vec2 {
        self.text_variable_anchor_offset
            .as_ref()
            .map_or(Vec2::ZERO, |c| c.offset_for(anchor))
    }

    /// Text index holding the shaping for `justify`, if that shaping exists.
    pub fn text_index_for(&self, justify: TextJustify) -> Option<usize> {
        match justify {
            TextJustify::Left => self.placed_left_text_index,
            TextJustify::Center => self.placed_center_text_index,
            TextJustify::Right => self.placed_right_text_index,
        }
    }
}
