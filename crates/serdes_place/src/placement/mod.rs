//! Priority-driven placement of SerDes blocks.
//!
//! Blocks are placed tier by tier in the order of the [`PlacementPlan`].
//! Each block resolves a target coordinate (its I/O pad, a placed sibling, or
//! the centroid of several placed siblings), then probes the plan's offsets
//! around the target, rotated to the pad's fabric edge, and takes the first
//! site with enough free slots and a compatible control group.

mod engine;
mod plan;
mod search;

pub use engine::Placer;
pub use plan::{PlacementPlan, Target, Tier};
pub use search::IoEdge;

use crate::block::{BlockRef, Groups};
use crate::codec::Coordinate;
use crate::error::PlaceResult;
use crate::grid::SiteGrid;
use crate::host::Host;
use serdes_diagnostics::DiagnosticSink;
use std::collections::BTreeMap;

/// The base coordinate assigned to every placed block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    positions: BTreeMap<BlockRef, Coordinate>,
    order: Vec<BlockRef>,
}

impl Placement {
    /// Creates an empty placement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the first cell of `block` was placed.
    pub fn position_of(&self, block: BlockRef) -> Option<Coordinate> {
        self.positions.get(&block).copied()
    }

    /// Whether `block` has been placed.
    pub fn contains(&self, block: BlockRef) -> bool {
        self.positions.contains_key(&block)
    }

    /// Placed blocks with their base coordinates, in placement order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockRef, Coordinate)> + '_ {
        self.order.iter().map(|b| (*b, self.positions[b]))
    }

    /// Number of placed blocks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing was placed.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn record(&mut self, block: BlockRef, base: Coordinate) {
        if self.positions.insert(block, base).is_none() {
            self.order.push(block);
        }
    }
}

/// Places every block the plan has a tier for and commits the cells to
/// `host`.
pub fn place(
    host: &mut dyn Host,
    groups: &Groups,
    grid: SiteGrid,
    plan: &PlacementPlan,
    sink: &DiagnosticSink,
) -> PlaceResult<Placement> {
    Placer::new(groups, grid, plan, sink).run(host)
}
