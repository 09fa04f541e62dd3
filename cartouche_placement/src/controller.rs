// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Publishing placements and deciding when the next pass is due.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::config::{MapMode, UpdateParameters};
use crate::layer::RenderLayer;
use crate::placement::Placement;

/// Refresh period while new buckets arrive in an untilted view, so that labels of tiles
/// loading one after another are placed together and soon.
pub const NEW_SYMBOLS_UPDATE_PERIOD: Duration = Duration::from_millis(30);

/// Owner of the current placement.
///
/// Readers take an [`Arc`] of the published placement and keep using it while a newer
/// one is built and swapped in; a placement is never changed after it is published.
#[derive(Debug)]
pub struct PlacementController {
    placement: RwLock<Arc<Placement>>,
    stale: AtomicBool,
}

impl Default for PlacementController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementController {
    /// A controller holding [`Placement::empty`].
    pub fn new() -> Self {
        Self {
            placement: RwLock::new(Arc::new(Placement::empty())),
            stale: AtomicBool::new(false),
        }
    }

    /// The published placement.
    pub fn placement(&self) -> Arc<Placement> {
        Arc::clone(&self.placement.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Publish `placement` and mark it fresh.
    pub fn set_placement(&self, placement: Arc<Placement>) {
        *self.placement.write().unwrap_or_else(PoisonError::into_inner) = placement;
        self.stale.store(false, Ordering::Release);
    }

    /// Record that a pass was due but skipped, so the map keeps repainting.
    pub fn set_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    /// Whether a pass was skipped since the last publish.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Whether the published placement is young enough at `zoom` to skip a pass.
    ///
    /// `period_override` replaces the zoom-dependent refresh period.
    pub fn placement_is_recent(&self, now: Instant, zoom: f64, period_override: Option<Duration>) -> bool {
        let placement = self.placement();
        if !placement.transitions_enabled() {
            return false;
        }
        let period = period_override.unwrap_or_else(|| placement.update_period(zoom));
        placement
            .commit_time()
            .is_some_and(|commit| commit + period > now)
    }

    /// Whether the map must keep redrawing at `now`: a pass is pending or fades are running.
    pub fn has_transitions(&self, now: Instant) -> bool {
        let placement = self.placement();
        if !placement.transitions_enabled() {
            return false;
        }
        self.is_stale() || placement.has_transitions(now)
    }

    /// Run a pass over `layers` if one is due and publish it.
    ///
    /// Continuous maps skip the pass while the published placement is recent, marking
    /// it stale instead; `symbol_buckets_added` shortens the wait in untilted views.
    /// Other modes always place. Returns whether a new placement was published.
    pub fn update(&self, params: &UpdateParameters, layers: &[&dyn RenderLayer], symbol_buckets_added: bool) -> bool {
        if params.mode != MapMode::Continuous {
            let mut placement = Placement::new(params, None);
            placement.place_layers(layers);
            self.set_placement(Arc::new(placement));
            return true;
        }

        let state = &params.transform_state;
        let period_override = (symbol_buckets_added && !state.is_tilted()).then_some(NEW_SYMBOLS_UPDATE_PERIOD);
        if self.placement_is_recent(params.time_point, state.zoom(), period_override) {
            self.set_stale();
            return false;
        }
        let mut placement = Placement::new(params, Some(self.placement()));
        placement.place_layers(layers);
        tracing::debug!(labels = placement.placement_count(), "publishing placement");
        self.set_placement(Arc::new(placement));
        true
    }
}
