// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pass configuration: map mode, fade transitions, and per-pass parameters.

use std::time::{Duration, Instant};

use cartouche_collision::TransformState;
use serde::{Deserialize, Serialize};

use crate::error::PlacementError;

/// Fade duration used when none is configured.
pub const DEFAULT_TRANSITION_DURATION: Duration = Duration::from_millis(300);

/// How a map is being rendered, which selects the placement strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    /// Interactive rendering: fades between passes.
    #[default]
    Continuous,
    /// One-shot image rendering: no fades.
    Static,
    /// One-shot tile rendering: border labels are resolved first so that
    /// neighbouring tiles agree.
    Tile,
}

/// Fade timing for placement changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOptions {
    /// Fade duration; [`DEFAULT_TRANSITION_DURATION`] when unset.
    pub duration: Option<Duration>,
    /// Time between a commit and the start of the fades it triggers.
    pub delay: Option<Duration>,
    /// Whether placement changes fade at all.
    pub enable_placement_transitions: bool,
}

impl Default for TransitionOptions {
    fn default() -> Self {
        Self {
            duration: None,
            delay: None,
            enable_placement_transitions: true,
        }
    }
}

impl TransitionOptions {
    /// The configured duration, or the default.
    pub fn duration_or_default(&self) -> Duration {
        self.duration.unwrap_or(DEFAULT_TRANSITION_DURATION)
    }

    /// The configured delay, or none.
    pub fn delay_or_zero(&self) -> Duration {
        self.delay.unwrap_or(Duration::ZERO)
    }
}

/// Serializable placement settings.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlacementConfig {
    /// Map mode.
    pub mode: MapMode,
    /// Fade duration in milliseconds.
    pub fade_duration_ms: Option<u64>,
    /// Fade delay in milliseconds.
    pub fade_delay_ms: Option<u64>,
    /// Whether placement changes fade.
    pub enable_placement_transitions: bool,
    /// Whether labels from different sources collide with each other.
    pub cross_source_collisions: bool,
    /// Keep projected line-label circles for collision debugging.
    pub show_collision_boxes: bool,
    /// Record placed point labels in tile mode.
    pub collect_placed_symbol_data: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            mode: MapMode::default(),
            fade_duration_ms: None,
            fade_delay_ms: None,
            enable_placement_transitions: true,
            cross_source_collisions: true,
            show_collision_boxes: false,
            collect_placed_symbol_data: false,
        }
    }
}

impl PlacementConfig {
    /// Parse a config from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, PlacementError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Fade options described by this config.
    pub fn transition_options(&self) -> TransitionOptions {
        TransitionOptions {
            duration: self.fade_duration_ms.map(Duration::from_millis),
            delay: self.fade_delay_ms.map(Duration::from_millis),
            enable_placement_transitions: self.enable_placement_transitions,
        }
    }

    /// Parameters for a pass over `transform_state` at `time_point`.
    pub fn update_parameters(&self, transform_state: TransformState, time_point: Instant) -> UpdateParameters {
        UpdateParameters {
            mode: self.mode,
            transform_state,
            time_point,
            transition_options: self.transition_options(),
            cross_source_collisions: self.cross_source_collisions,
            show_collision_boxes: self.show_collision_boxes,
            collect_placed_symbol_data: self.collect_placed_symbol_data,
        }
    }
}

/// Inputs for one placement pass.
#[derive(Debug, Clone, Copy)]
pub struct UpdateParameters {
    /// Map mode.
    pub mode: MapMode,
    /// Camera for the pass.
    pub transform_state: TransformState,
    /// Time the pass starts; becomes the commit time.
    pub time_point: Instant,
    /// Fade timing.
    pub transition_options: TransitionOptions,
    /// Whether labels from different sources collide with each other.
    pub cross_source_collisions: bool,
    /// Keep projected line-label circles for collision debugging.
    pub show_collision_boxes: bool,
    /// Record placed point labels in tile mode.
    pub collect_placed_symbol_data: bool,
}
