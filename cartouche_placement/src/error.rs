// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for placement lookups and configuration.

use thiserror::Error;

/// Errors surfaced by the placement API.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// Query data was requested for a bucket the placement never saw.
    #[error("no query data retained for bucket instance {0}")]
    UnknownBucket(u32),
    /// A placement configuration document could not be parsed.
    #[error("invalid placement config: {0}")]
    Config(#[from] serde_json::Error),
}
