// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for different spatial strategies.
//!
//! - `flatvec`: flat vector with linear scans (small, simple).
//! - `grid`: dense uniform grid over a fixed f64 extent, sized for one viewport.

pub mod flatvec;
pub mod grid;

pub use grid::GridF64;
