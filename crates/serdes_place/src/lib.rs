//! SerDes placement pass for iCE40-class FPGA place-and-route.
//!
//! The packer tags every logic cell of a SerDes macro with its position in
//! the macro (group, subgroup, block type, slot). This crate turns those tags
//! back into blocks and groups, places each block next to the I/O pad it
//! serves or next to the sibling it feeds, and finally points the consumers
//! of duplicated sync nets at their nearest local copy.
//!
//! # Pipeline
//!
//! 1. **Collect**: scan cell attributes, record local sync buffers, group
//!    tagged cells into blocks
//! 2. **Analyze**: check block layouts, find each group's I/O site and each
//!    block's control group
//! 3. **Place**: walk the priority tiers and commit every block to the first
//!    compatible site around its target
//! 4. **Rewire**: move consumer ports onto the nearest sync buffer copy
//!
//! The pass talks to the surrounding tool only through the [`Host`] trait;
//! [`Netlist`] is an in-memory implementation.
//!
//! # Usage
//!
//! ```ignore
//! use serdes_place::place_serdes;
//!
//! let report = place_serdes(&mut netlist, &config, &sink)?;
//! for placed in &report.blocks {
//!     println!("{} @ {}", placed.block, placed.base);
//! }
//! ```

#![warn(missing_docs)]

pub mod block;
pub mod codec;
pub mod collect;
pub mod error;
pub mod grid;
pub mod host;
pub mod ids;
pub mod lbuf;
pub mod netlist;
pub mod placement;
pub mod report;

pub use block::{Block, BlockRef, Group, Groups, SlotError};
pub use codec::{BlockType, ControlGroup, Coordinate, DecodeError, HierarchicalId, PathFamily};
pub use collect::{collect, Collected};
pub use error::{PlaceError, PlaceResult};
pub use grid::{Site, SiteGrid};
pub use host::{Host, HostError};
pub use ids::{CellId, NetId};
pub use lbuf::{BufferCopy, CopyMap, LocalBuffers, Reconnection};
pub use netlist::Netlist;
pub use placement::{Placement, PlacementPlan, Placer};
pub use report::{PlacedBlock, PlacementReport};

use serdes_config::{validate_config, PlacerConfig};
use serdes_diagnostics::{Diagnostic, DiagnosticSink};

/// Runs the complete pass against `host`.
///
/// `config` is validated first, since its fields can be edited in code
/// after loading. Notes and warnings go to `sink` as the pass proceeds. On
/// failure the error is also emitted to `sink` before it is returned; cells
/// placed before the failure keep their new location.
pub fn place_serdes(
    host: &mut dyn Host,
    config: &PlacerConfig,
    sink: &DiagnosticSink,
) -> PlaceResult<PlacementReport> {
    run(host, config, sink).inspect_err(|err| sink.emit(err.to_diagnostic()))
}

fn run(
    host: &mut dyn Host,
    config: &PlacerConfig,
    sink: &DiagnosticSink,
) -> PlaceResult<PlacementReport> {
    validate_config(config)?;

    // 1. Collect
    let Collected {
        mut groups,
        buffers,
        ..
    } = collect(host, config)?;

    // 2. Analyze
    groups.analyze(&*host, config)?;

    // 3. Place
    let plan = PlacementPlan::from_config(&config.placement);
    for diag in report::unplaced_kinds(&groups, &plan) {
        sink.emit(diag);
    }
    let grid = SiteGrid::build(&*host, config)?;
    let placement = placement::place(host, &groups, grid, &plan, sink)?;
    for diag in report::group_summaries(&groups, &placement) {
        sink.emit(diag);
    }

    // 4. Rewire
    let reconnections = lbuf::rewire(host, &groups, &placement, &buffers.copy_map(), config)?;
    if !reconnections.is_empty() {
        sink.emit(Diagnostic::note(
            report::REWIRE_SUMMARY,
            format!(
                "moved {} ports onto {} local sync buffer copies",
                reconnections.len(),
                buffers.len()
            ),
        ));
    }

    Ok(PlacementReport::new(&groups, &placement, reconnections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::PortDirection;
    use serdes_diagnostics::Severity;

    #[test]
    fn empty_design_is_a_no_op() {
        let mut nl = Netlist::new();
        nl.add_bel("X1/Y1/lc0");
        let sink = DiagnosticSink::new();
        let report = place_serdes(&mut nl, &PlacerConfig::default(), &sink).unwrap();
        assert!(report.blocks.is_empty());
        assert!(report.reconnections.is_empty());
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn failure_is_emitted_and_returned() {
        let mut nl = Netlist::new();
        let cell = nl.add_cell("lonely", "ICESTORM_LC");
        nl.add_port(cell, "I0", PortDirection::Input, None);
        // group 0, subgroup 0, OSERDES Shift, slot 0; no I/O connection
        nl.set_attr(cell, "SERDES_GRP", "10000".into());
        let sink = DiagnosticSink::new();
        let err = place_serdes(&mut nl, &PlacerConfig::default(), &sink).unwrap_err();
        assert_eq!(err, PlaceError::MissingIoSite { group: 0 });
        assert!(sink.has_errors());
        assert_eq!(sink.count(Severity::Error), 1);
        assert_eq!(sink.diagnostics()[0].code.to_string(), "E307");
    }

    #[test]
    fn oversized_site_capacity_is_rejected() {
        let mut nl = Netlist::new();
        nl.add_bel("X1/Y5/lc0");
        let cell = nl.add_cell("shift_0", "ICESTORM_LC");
        // group 1, subgroup 4, ISERDES Shift, slot 0
        nl.set_attr(cell, "SERDES_GRP", "0001010010100000".into());
        let mut config = PlacerConfig::default();
        config.placement.site_capacity = 12;
        let sink = DiagnosticSink::new();

        let err = place_serdes(&mut nl, &config, &sink).unwrap_err();
        assert!(matches!(
            err,
            PlaceError::InvalidConfig(ref msg) if msg.contains("site_capacity")
        ));
        assert_eq!(sink.diagnostics()[0].code.to_string(), "E312");
        // nothing was touched
        assert!(nl.cell(cell).attrs.contains_key("SERDES_GRP"));
        assert!(!nl.cell(cell).attrs.contains_key("BEL"));
    }
}
