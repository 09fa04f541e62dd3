// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `Index` API and generic implementation over a pluggable backend.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::backends::flatvec::FlatVec;
use crate::backends::grid::GridF64;
use crate::types::Aabb2D;

/// Handle for an inserted entry.
///
/// Keys are only meaningful until the next [`IndexGeneric::clear`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(u32);

impl Key {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Index keys are 32-bit; a single pass never holds more than u32::MAX entries."
    )]
    const fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Entry<T, P> {
    aabb: Aabb2D<T>,
    payload: P,
}

/// An insert-only AABB index parameterized by a spatial backend.
///
/// Entries are never moved or removed individually; the whole index is rebuilt by
/// clearing it. The flat backend answers queries in insertion order; the grid answers
/// in cell order.
#[derive(Clone, Debug)]
pub struct IndexGeneric<T: Copy + PartialOrd + Debug, P, B: Backend<T>> {
    entries: Vec<Entry<T, P>>,
    backend: B,
}

impl<T, P, B> IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    B: Backend<T> + Default,
{
    /// Create an empty index using the backend's default constructor.
    pub fn new() -> Self {
        Self::with_backend(B::default())
    }
}

impl<T, P, B> IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    B: Backend<T>,
{
    /// Create an empty index over an explicit backend.
    pub fn with_backend(backend: B) -> Self {
        Self {
            entries: Vec::new(),
            backend,
        }
    }

    /// Reserve space for at least `n` more entries.
    pub fn reserve(&mut self, n: usize) {
        self.entries.reserve(n);
    }

    /// Insert a new AABB with payload.
    pub fn insert(&mut self, aabb: Aabb2D<T>, payload: P) -> Key {
        let idx = self.entries.len();
        self.backend.insert(idx, aabb);
        self.entries.push(Entry { aabb, payload });
        Key::new(idx)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.backend.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by key.
    pub fn get(&self, key: Key) -> Option<(Aabb2D<T>, &P)> {
        self.entries.get(key.idx()).map(|e| (e.aabb, &e.payload))
    }

    /// Iterate all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, Aabb2D<T>, &P)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (Key::new(i), e.aabb, &e.payload))
    }

    /// Query for entries whose AABB contains the point.
    pub fn query_point(&self, x: T, y: T) -> impl Iterator<Item = (Key, &P)> + '_ {
        self.backend.query_point(x, y).filter_map(move |i| {
            let e = self.entries.get(i)?;
            e.aabb
                .contains_point(x, y)
                .then_some((Key::new(i), &e.payload))
        })
    }

    /// Query for entries whose AABB intersects the given rectangle.
    pub fn query_rect(&self, rect: Aabb2D<T>) -> impl Iterator<Item = (Key, Aabb2D<T>, &P)> + '_ {
        self.backend.query_rect(rect).filter_map(move |i| {
            let e = self.entries.get(i)?;
            e.aabb
                .overlaps(&rect)
                .then_some((Key::new(i), e.aabb, &e.payload))
        })
    }

    /// Whether any entry intersecting `rect` satisfies `pred`.
    ///
    /// Stops at the first accepted entry.
    pub fn hit_test(&self, rect: Aabb2D<T>, mut pred: impl FnMut(&Aabb2D<T>, &P) -> bool) -> bool {
        self.query_rect(rect).any(|(_, aabb, p)| pred(&aabb, p))
    }
}

/// Default index using a flat vector backend.
pub type Index<T, P> = IndexGeneric<T, P, FlatVec<T>>;

impl<T: Copy + PartialOrd + Debug, P> Default for Index<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Index<f64, P> {
    /// Create a grid-backed index covering `[0, width] x [0, height]`.
    pub fn with_uniform_grid(width: f64, height: f64, cell_size: f64) -> IndexGeneric<f64, P, GridF64> {
        IndexGeneric::with_backend(GridF64::new(width, height, cell_size))
    }
}
