// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placement decisions and the fade state derived from them.

use crate::symbol::{SymbolAnchor, TextJustify};
use kurbo::Vec2;

/// Placement decision for one label.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct JointPlacement {
    /// Text is shown.
    pub text: bool,
    /// Icon is shown.
    pub icon: bool,
    /// Show or hide without fading.
    pub skip_fade: bool,
}

impl JointPlacement {
    /// Nothing shown.
    pub const UNPLACED: Self = Self::new(false, false, false);

    /// A placement decision.
    pub const fn new(text: bool, icon: bool, skip_fade: bool) -> Self {
        Self {
            text,
            icon,
            skip_fade,
        }
    }

    /// Whether any part is shown.
    pub fn placed(&self) -> bool {
        self.text || self.icon
    }
}

/// Fade state of one label part.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct OpacityState {
    /// Current opacity in `[0, 1]`.
    pub opacity: f32,
    /// Whether the part is fading in (or shown).
    pub placed: bool,
}

impl OpacityState {
    /// Initial state: fully shown if placed without fading, otherwise transparent.
    pub fn new(placed: bool, skip_fade: bool) -> Self {
        Self {
            opacity: if skip_fade && placed { 1.0 } else { 0.0 },
            placed,
        }
    }

    /// Move `prev` by `increment` toward the new target: up when `placed`, down otherwise.
    pub fn from_prev(prev: &Self, increment: f32, placed: bool) -> Self {
        let step = if placed { increment } else { -increment };
        Self {
            opacity: (prev.opacity + step).clamp(0.0, 1.0),
            placed,
        }
    }

    /// Fully faded out and not coming back.
    pub fn is_hidden(&self) -> bool {
        self.opacity == 0.0 && !self.placed
    }
}

/// Fade state of a label's icon and text.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct JointOpacityState {
    /// Icon state.
    pub icon: OpacityState,
    /// Text state.
    pub text: OpacityState,
}

impl JointOpacityState {
    /// Initial state for a newly tracked label.
    pub fn new(placed_text: bool, placed_icon: bool, skip_fade: bool) -> Self {
        Self {
            icon: OpacityState::new(placed_icon, skip_fade),
            text: OpacityState::new(placed_text, skip_fade),
        }
    }

    /// Blend from `prev` toward a new decision.
    pub fn from_prev(prev: &Self, increment: f32, placed_text: bool, placed_icon: bool) -> Self {
        Self {
            icon: OpacityState::from_prev(&prev.icon, increment, placed_icon),
            text: OpacityState::from_prev(&prev.text, increment, placed_text),
        }
    }

    /// Both parts fully faded out.
    pub fn is_hidden(&self) -> bool {
        self.icon.is_hidden() && self.text.is_hidden()
    }
}

/// Anchor chosen for a label with a variable text position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VariableOffset {
    /// Em offset configured for the anchor.
    pub offset: Vec2,
    /// Unshifted box width.
    pub width: f64,
    /// Unshifted box height.
    pub height: f64,
    /// Chosen anchor.
    pub anchor: SymbolAnchor,
    /// Tile units per em.
    pub text_box_scale: f64,
    /// Anchor the label was shown at in the previous pass, if it was shown.
    pub prev_anchor: Option<SymbolAnchor>,
}

impl VariableOffset {
    /// Justification to draw with: the one matching the anchor.
    pub fn justification(&self) -> TextJustify {
        self.anchor.justification()
    }
}
