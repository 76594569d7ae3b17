//! What a run of the pass did, as data and as diagnostics.

use crate::block::{BlockRef, Groups};
use crate::codec::Coordinate;
use crate::lbuf::Reconnection;
use crate::placement::{Placement, PlacementPlan};
use serde::{Deserialize, Serialize};
use serdes_diagnostics::{Category, Diagnostic, DiagnosticCode};

/// Per-group placement summary.
pub const GROUP_SUMMARY: DiagnosticCode = DiagnosticCode::new(Category::Note, 101);
/// A centroid target was computed from fewer siblings than configured.
pub const CENTROID_FALLBACK: DiagnosticCode = DiagnosticCode::new(Category::Note, 102);
/// Number of consumer ports moved onto local buffer copies.
pub const REWIRE_SUMMARY: DiagnosticCode = DiagnosticCode::new(Category::Note, 103);
/// A block has a type no placement tier covers and was left unplaced.
pub const UNPLACED_KIND: DiagnosticCode = DiagnosticCode::new(Category::Warning, 101);

/// One placed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedBlock {
    /// The block.
    pub block: BlockRef,
    /// Location of its first cell.
    pub base: Coordinate,
    /// Number of cells, placed in consecutive slots from `base`.
    pub len: usize,
}

/// The outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementReport {
    /// Placed blocks, in placement order.
    pub blocks: Vec<PlacedBlock>,
    /// Ports moved onto local buffer copies, in visiting order.
    pub reconnections: Vec<Reconnection>,
}

impl PlacementReport {
    /// Assembles the report of a run.
    pub fn new(groups: &Groups, placement: &Placement, reconnections: Vec<Reconnection>) -> Self {
        let blocks = placement
            .iter()
            .map(|(block, base)| PlacedBlock {
                block,
                base,
                len: groups.block(block).map_or(0, |b| b.len()),
            })
            .collect();
        Self {
            blocks,
            reconnections,
        }
    }

    /// Where the first cell of `block` went.
    pub fn position_of(&self, block: BlockRef) -> Option<Coordinate> {
        self.blocks
            .iter()
            .find(|p| p.block == block)
            .map(|p| p.base)
    }
}

/// One note per group listing where each of its blocks went.
pub fn group_summaries(groups: &Groups, placement: &Placement) -> Vec<Diagnostic> {
    groups
        .iter()
        .map(|group| {
            let io = group
                .io_site()
                .map_or_else(|| "no I/O site".to_string(), |io| io.to_string());
            let mut diag = Diagnostic::note(
                GROUP_SUMMARY,
                format!("SerDes group {} for I/O {io}", group.id()),
            );
            for block in group.blocks() {
                let at = placement
                    .position_of(block.id())
                    .map_or_else(|| "unplaced".to_string(), |p| p.to_string());
                diag = diag.with_note(format!("{}: {} cells placed @ {at}", block.id(), block.len()));
            }
            diag
        })
        .collect()
}

/// One warning per block whose type the plan never places.
pub fn unplaced_kinds(groups: &Groups, plan: &PlacementPlan) -> Vec<Diagnostic> {
    groups
        .iter()
        .flat_map(|g| g.blocks())
        .filter(|b| !plan.places(b.id().kind))
        .map(|b| {
            Diagnostic::warning(UNPLACED_KIND, format!("{} has no placement rule", b.id()))
                .with_help("add its type to the placement priority table")
        })
        .collect()
}
