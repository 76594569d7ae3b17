//! Orientation of search offsets relative to the I/O bank edge.
//!
//! Offsets are written as `(u, v)` with `u` running along the edge and `v`
//! pointing into the fabric, as seen from a pad on the left edge. A pad on
//! another edge rotates them so that `v` still points inward.

use crate::codec::Coordinate;

/// The fabric edge an I/O pad sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoEdge {
    /// `x == 0`.
    Left,
    /// `y == 0`.
    Bottom,
    /// Right edge.
    Right,
    /// Top edge.
    Top,
}

impl IoEdge {
    /// Classifies a pad site. The left edge wins over the bottom one at the
    /// origin; elsewhere `x > y` means right.
    pub fn of(io: Coordinate) -> Self {
        if io.x == 0 {
            IoEdge::Left
        } else if io.y == 0 {
            IoEdge::Bottom
        } else if io.x > io.y {
            IoEdge::Right
        } else {
            IoEdge::Top
        }
    }

    /// Maps an edge-relative offset to a fabric `(dx, dy)`.
    pub fn rotate(self, u: i32, v: i32) -> (i32, i32) {
        match self {
            IoEdge::Left => (v, u),
            IoEdge::Bottom => (u, v),
            IoEdge::Right => (-v, -u),
            IoEdge::Top => (-u, -v),
        }
    }
}
