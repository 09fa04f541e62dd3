// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=cartouche_index --heading-base-level=0

//! Cartouche Index: an insert-only 2D AABB index for per-frame collision passes.
//!
//! A placement pass inserts accepted footprints one at a time and tests every new
//! candidate against everything inserted so far. The index is cleared (or dropped)
//! between passes, so it never moves or removes entries.
//!
//! - Insert axis-aligned bounding boxes (AABBs) with arbitrary payloads.
//! - Query by point or intersecting rectangle; each entry is reported once.
//! - Early-exit hit tests with a payload predicate ([`IndexGeneric::hit_test`]).
//!
//! It is generic over the scalar type `T` and does not depend on any geometry crate.
//! Higher layers compute screen-space boxes and exact shapes and feed them here.
//!
//! # Example
//!
//! ```rust
//! use cartouche_index::{Index, Aabb2D};
//!
//! let mut idx: Index<f64, u32> = Index::new();
//! idx.insert(Aabb2D::new(0.0, 0.0, 10.0, 10.0), 1);
//! idx.insert(Aabb2D::new(5.0, 5.0, 15.0, 15.0), 2);
//!
//! let hits: Vec<_> = idx.query_point(6.0, 6.0).map(|(_, p)| *p).collect();
//! assert_eq!(hits, [1, 2]);
//!
//! // Only entries accepted by the predicate count as collisions.
//! assert!(!idx.hit_test(Aabb2D::new(12.0, 12.0, 13.0, 13.0), |_, p| *p == 1));
//! ```
//!
//! ## Choosing a backend
//!
//! - `FlatVec` (default): linear scans. Good for small sets and tests.
//! - `GridF64`: dense uniform grid over a fixed extent such as a padded viewport.
//!   Boxes outside the extent are clamped into the border cells.
//!
//! ### Float semantics
//!
//! Bounds are closed. A box with a NaN coordinate is treated as empty and never hits.

#![no_std]

extern crate alloc;

pub mod backend;
pub mod backends;
pub mod index;
pub mod types;

pub use backend::Backend;
pub use backends::flatvec::FlatVec;
pub use backends::grid::GridF64;
pub use index::{Index, IndexGeneric, Key};
pub use types::Aabb2D;
