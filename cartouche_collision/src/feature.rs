// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collision footprints: tile-space boxes, their screen projections, and the
//! bookkeeping carried by every indexed footprint.

use cartouche_index::Aabb2D;
use kurbo::{Circle, Point, Rect};

/// One box of a collision footprint, in tile units relative to `anchor`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionBox {
    /// Tile-local anchor the box is offset from.
    pub anchor: Point,
    /// Left edge offset.
    pub x1: f64,
    /// Top edge offset.
    pub y1: f64,
    /// Right edge offset.
    pub x2: f64,
    /// Bottom edge offset.
    pub y2: f64,
    /// Distance along the line from the label anchor (line labels only).
    pub signed_distance_from_anchor: f64,
}

impl CollisionBox {
    /// A box at `anchor` spanning the given offsets.
    pub const fn new(anchor: Point, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            anchor,
            x1,
            y1,
            x2,
            y2,
            signed_distance_from_anchor: 0.0,
        }
    }

    /// Width in tile units.
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Height in tile units.
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

/// Identity of the feature a footprint belongs to, used by feature queries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexedSubfeature {
    /// Feature index inside the tile's source layer.
    pub index: usize,
    /// Source layer the feature was read from.
    pub source_layer_name: String,
    /// Id of the style layer that owns the bucket.
    pub bucket_leader_id: String,
    /// Position of the feature in the bucket's draw order.
    pub sort_index: usize,
    /// Bucket that inserted the footprint. Set on insertion.
    pub bucket_instance_id: u32,
    /// Collision group the footprint was inserted under. Set on insertion.
    pub collision_group_id: u16,
}

/// The footprint of one text or icon part of a label.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionFeature {
    /// Boxes in placement order. Point labels carry exactly one.
    pub boxes: Vec<CollisionBox>,
    /// Feature identity stored with every inserted box.
    pub indexed_feature: IndexedSubfeature,
    /// Whether the boxes follow a line (tested as circles).
    pub along_line: bool,
}

impl CollisionFeature {
    /// A single-box point footprint.
    pub fn point(collision_box: CollisionBox, indexed_feature: IndexedSubfeature) -> Self {
        Self {
            boxes: vec![collision_box],
            indexed_feature,
            along_line: false,
        }
    }

    /// A footprint following a line, one box per step along it.
    pub fn along_line(boxes: Vec<CollisionBox>, indexed_feature: IndexedSubfeature) -> Self {
        Self {
            boxes,
            indexed_feature,
            along_line: true,
        }
    }

    /// Whether the footprint has nothing to place.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// A footprint box after projection to padded screen space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ProjectedCollisionBox {
    /// Axis-aligned box (point labels).
    Box(Rect),
    /// Circle (one step of a line label).
    Circle(Circle),
}

impl ProjectedCollisionBox {
    /// Axis-aligned bounds.
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Box(r) => *r,
            Self::Circle(c) => Rect::new(
                c.center.x - c.radius,
                c.center.y - c.radius,
                c.center.x + c.radius,
                c.center.y + c.radius,
            ),
        }
    }

    /// Whether this is a box.
    pub fn is_box(&self) -> bool {
        matches!(self, Self::Box(_))
    }

    /// Whether this is a circle.
    pub fn is_circle(&self) -> bool {
        matches!(self, Self::Circle(_))
    }

    /// Exact overlap test. Touching shapes collide.
    pub fn intersects(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Box(a), Self::Box(b)) => boxes_collide(a, b),
            (Self::Circle(a), Self::Circle(b)) => {
                let r = a.radius + b.radius;
                (a.center - b.center).hypot2() <= r * r
            }
            (Self::Box(r), Self::Circle(c)) | (Self::Circle(c), Self::Box(r)) => circle_and_box_collide(c, r),
        }
    }
}

fn boxes_collide(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && a.y0 <= b.y1 && a.x1 >= b.x0 && a.y1 >= b.y0
}

fn circle_and_box_collide(c: &Circle, r: &Rect) -> bool {
    let half_w = (r.x1 - r.x0) / 2.0;
    let half_h = (r.y1 - r.y0) / 2.0;
    let dist_x = (c.center.x - (r.x0 + half_w)).abs();
    let dist_y = (c.center.y - (r.y0 + half_h)).abs();
    if dist_x > half_w + c.radius || dist_y > half_h + c.radius {
        return false;
    }
    if dist_x <= half_w || dist_y <= half_h {
        return true;
    }
    let dx = dist_x - half_w;
    let dy = dist_y - half_h;
    dx * dx + dy * dy <= c.radius * c.radius
}

/// Screen-space rectangle of the current tile's borders, in padded coordinates.
pub type CollisionBoundaries = Rect;

pub(crate) fn rect_to_aabb(r: &Rect) -> Aabb2D<f64> {
    Aabb2D::new(r.x0, r.y0, r.x1, r.y1)
}

/// A collision group: footprints only collide with footprints their group accepts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CollisionGroup {
    /// Group id stored with inserted footprints.
    pub id: u16,
    /// When set, only footprints with the same id collide.
    pub isolated: bool,
}

impl CollisionGroup {
    /// The shared group that collides with everything.
    pub const GLOBAL: Self = Self {
        id: 0,
        isolated: false,
    };

    /// A group that only collides with itself.
    pub const fn isolated(id: u16) -> Self {
        Self { id, isolated: true }
    }

    /// Whether a footprint inserted under `other_id` can block this group.
    pub fn accepts(&self, other_id: u16) -> bool {
        !self.isolated || other_id == self.id
    }
}

bitflags::bitflags! {
    /// Which tile borders a footprint crosses.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct BorderFlags: u8 {
        /// Crosses the top or bottom border.
        const HORIZONTAL_BORDERS = 0b0000_0001;
        /// Crosses the left or right border.
        const VERTICAL_BORDERS   = 0b0000_0010;
    }
}

/// Result of testing a footprint against tile borders.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IntersectStatus {
    /// Crossed borders.
    pub flags: BorderFlags,
    /// Shortest piece of the footprint cut off by a crossed border, in pixels.
    ///
    /// Larger means the cut is more noticeable. Zero when nothing is crossed.
    pub min_section_length: i32,
}

impl IntersectStatus {
    /// Whether any border is crossed.
    pub fn intersects(&self) -> bool {
        !self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_box_corner_case() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let near = ProjectedCollisionBox::Circle(Circle::new((12.0, 12.0), 3.0));
        let far = ProjectedCollisionBox::Circle(Circle::new((13.0, 13.0), 3.0));
        let b = ProjectedCollisionBox::Box(r);
        assert!(near.intersects(&b), "corner distance 2.83 is within radius 3");
        assert!(!far.intersects(&b), "corner distance 4.24 exceeds radius 3");
        assert!(b.intersects(&near), "test is symmetric");
    }

    #[test]
    fn circles_touching_collide() {
        let a = ProjectedCollisionBox::Circle(Circle::new((0.0, 0.0), 5.0));
        let b = ProjectedCollisionBox::Circle(Circle::new((10.0, 0.0), 5.0));
        let c = ProjectedCollisionBox::Circle(Circle::new((10.5, 0.0), 5.0));
        assert!(a.intersects(&b), "touching circles collide");
        assert!(!a.intersects(&c), "separated circles do not");
    }

    #[test]
    fn isolated_groups_only_accept_themselves() {
        let g = CollisionGroup::isolated(3);
        assert!(g.accepts(3), "same group collides");
        assert!(!g.accepts(0), "other groups are invisible");
        assert!(CollisionGroup::GLOBAL.accepts(7), "the global group sees everything");
    }
}
