//! Grid geometry: points, quarter-turn rotations and axis-aligned segments.
//!
//! Everything in the editor lives on an integer grid. Wire segments are
//! axis-aligned spans between two grid points; a segment *covers* every
//! lattice point between its endpoints inclusive, which is what lets a pin
//! attach in the middle of a wire without an explicit junction marker.
//! Malformed segments (zero length, diagonal) are rejected here, at
//! construction, so the rest of the core never sees one.

use crate::error::StructuralError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the editor grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridPoint {
    /// Construct a point.
    pub fn new(x: i32, y: i32) -> Self {
        GridPoint { x, y }
    }

    /// This point translated by `(dx, dy)`.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        GridPoint::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A node orientation in quarter turns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rotation {
    /// No rotation.
    #[default]
    R0,
    /// One quarter turn clockwise.
    R90,
    /// Half turn.
    R180,
    /// Three quarter turns clockwise.
    R270,
}

impl Rotation {
    /// Rotation from a quarter-turn count (taken modulo 4).
    pub fn from_quarter_turns(n: u8) -> Self {
        match n % 4 {
            0 => Rotation::R0,
            1 => Rotation::R90,
            2 => Rotation::R180,
            _ => Rotation::R270,
        }
    }

    /// Quarter-turn count, 0–3.
    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    /// One further quarter turn clockwise.
    pub fn rotated_cw(self) -> Self {
        Rotation::from_quarter_turns(self.quarter_turns() + 1)
    }

    /// Rotate a relative offset around the origin.
    ///
    /// Grid y grows downward, so a clockwise quarter turn maps
    /// `(x, y)` to `(-y, x)`.
    pub fn apply(self, offset: (i32, i32)) -> (i32, i32) {
        let (x, y) = offset;
        match self {
            Rotation::R0 => (x, y),
            Rotation::R90 => (-y, x),
            Rotation::R180 => (-x, -y),
            Rotation::R270 => (y, -x),
        }
    }
}

impl From<Rotation> for u8 {
    fn from(r: Rotation) -> u8 {
        r.quarter_turns()
    }
}

impl TryFrom<u8> for Rotation {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        if n < 4 {
            Ok(Rotation::from_quarter_turns(n))
        } else {
            Err(format!("rotation must be 0-3, got {n}"))
        }
    }
}

/// An axis-aligned wire segment between two grid points.
///
/// Endpoints are normalized so that `a <= b` lexicographically, making two
/// segments with swapped endpoints compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    a: GridPoint,
    b: GridPoint,
}

impl Segment {
    /// Build a segment, rejecting zero-length and diagonal spans.
    pub fn new(a: GridPoint, b: GridPoint) -> Result<Self, StructuralError> {
        if a == b {
            return Err(StructuralError::ZeroLengthSegment(a));
        }
        if a.x != b.x && a.y != b.y {
            return Err(StructuralError::NotAxisAligned { a, b });
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        Ok(Segment { a, b })
    }

    /// The normalized endpoints, lesser first.
    pub fn endpoints(self) -> (GridPoint, GridPoint) {
        (self.a, self.b)
    }

    /// True when the segment runs along the x axis.
    pub fn is_horizontal(self) -> bool {
        self.a.y == self.b.y
    }

    /// Manhattan length in grid steps.
    pub fn len(self) -> u32 {
        ((self.b.x - self.a.x).abs() + (self.b.y - self.a.y).abs()) as u32
    }

    /// True when `p` lies on the segment, endpoint or strictly interior.
    pub fn covers(self, p: GridPoint) -> bool {
        if self.is_horizontal() {
            p.y == self.a.y && self.a.x <= p.x && p.x <= self.b.x
        } else {
            p.x == self.a.x && self.a.y <= p.y && p.y <= self.b.y
        }
    }

    /// True when `p` is one of the two endpoints.
    pub fn has_endpoint(self, p: GridPoint) -> bool {
        p == self.a || p == self.b
    }

    /// Every lattice point the segment covers, endpoints included.
    pub fn lattice_points(self) -> impl Iterator<Item = GridPoint> {
        let (a, b) = (self.a, self.b);
        let horizontal = self.is_horizontal();
        (0..=self.len() as i32).map(move |i| {
            if horizontal {
                GridPoint::new(a.x + i, a.y)
            } else {
                GridPoint::new(a.x, a.y + i)
            }
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.a, self.b)
    }
}
