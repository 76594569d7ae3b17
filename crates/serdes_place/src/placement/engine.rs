//! The greedy placement loop.

use super::plan::{PlacementPlan, Target};
use super::search::IoEdge;
use super::Placement;
use crate::block::{Block, BlockRef, Group, Groups};
use crate::codec::{BlockType, Coordinate};
use crate::error::{PlaceError, PlaceResult};
use crate::grid::SiteGrid;
use crate::host::Host;
use crate::report::CENTROID_FALLBACK;
use serdes_diagnostics::{Diagnostic, DiagnosticSink};

/// Places the blocks of a set of analyzed groups onto a site grid.
///
/// The placer owns the grid for the duration of the run; the plan and the
/// groups are only read.
pub struct Placer<'a> {
    groups: &'a Groups,
    plan: &'a PlacementPlan,
    sink: &'a DiagnosticSink,
    grid: SiteGrid,
    placement: Placement,
}

impl<'a> Placer<'a> {
    /// Creates a placer over an empty grid.
    pub fn new(
        groups: &'a Groups,
        grid: SiteGrid,
        plan: &'a PlacementPlan,
        sink: &'a DiagnosticSink,
    ) -> Self {
        Self {
            groups,
            plan,
            sink,
            grid,
            placement: Placement::new(),
        }
    }

    /// Runs every tier and returns the resulting placement.
    ///
    /// Stops at the first block that cannot be placed; cells already
    /// committed to the host stay where they are.
    pub fn run(mut self, host: &mut dyn Host) -> PlaceResult<Placement> {
        let (groups, plan) = (self.groups, self.plan);
        for tier in plan.tiers() {
            for (group, block) in groups.blocks_of_kind(tier.kind) {
                self.place_block(host, group, block, &tier.target)?;
            }
        }
        Ok(self.placement)
    }

    fn place_block(
        &mut self,
        host: &mut dyn Host,
        group: &Group,
        block: &Block,
        target: &Target,
    ) -> PlaceResult<Coordinate> {
        let io = group
            .io_site()
            .ok_or(PlaceError::MissingIoSite { group: group.id() })?;
        let anchor = self.resolve(group, block.id(), target, io)?;
        let edge = IoEdge::of(io);

        for &(u, v) in self.plan.offsets() {
            let (dx, dy) = edge.rotate(u, v);
            let candidate = anchor.offset(dx, dy);
            if !self.grid.is_valid_for(candidate, block) {
                continue;
            }
            let base = self.grid.commit(candidate, block)?;
            self.placement.record(block.id(), base);
            for (i, cell) in block.cells().enumerate() {
                host.place_cell(cell, base.with_slot_offset(i))?;
            }
            return Ok(base);
        }

        Err(PlaceError::PlacementExhausted {
            block: block.id(),
            target: anchor,
        })
    }

    /// The coordinate the offset search of `id` starts from.
    fn resolve(
        &self,
        group: &Group,
        id: BlockRef,
        target: &Target,
        io: Coordinate,
    ) -> PlaceResult<Coordinate> {
        match target {
            Target::IoSite => Ok(io),
            Target::Sibling { kind, subgroup } => {
                self.sibling_position(id, *kind, subgroup.resolve(id.subgroup))
            }
            Target::Centroid {
                kind,
                required,
                optional,
            } => {
                let mut points = Vec::with_capacity(required.len() + optional.len());
                for &sub in required {
                    points.push(self.sibling_position(id, *kind, sub)?);
                }
                let mut skipped = Vec::new();
                for &sub in optional {
                    if group.block(sub, *kind).is_some() {
                        points.push(self.sibling_position(id, *kind, sub)?);
                    } else {
                        skipped.push(sub);
                    }
                }
                if !skipped.is_empty() {
                    self.sink.emit(
                        Diagnostic::note(
                            CENTROID_FALLBACK,
                            format!(
                                "{id} anchored on {} of {} {kind} siblings",
                                points.len(),
                                points.len() + skipped.len()
                            ),
                        )
                        .with_subject(format!("SerDes group {}", id.group))
                        .with_note(format!("absent subgroups: {skipped:x?}")),
                    );
                }
                Coordinate::centroid(&points).ok_or(PlaceError::UnresolvedTarget {
                    block: id,
                    dependency: BlockRef::new(id.group, id.subgroup, *kind),
                })
            }
        }
    }

    fn sibling_position(
        &self,
        id: BlockRef,
        kind: BlockType,
        subgroup: u8,
    ) -> PlaceResult<Coordinate> {
        let dependency = BlockRef::new(id.group, subgroup, kind);
        self.placement
            .position_of(dependency)
            .ok_or(PlaceError::UnresolvedTarget {
                block: id,
                dependency,
            })
    }
}
