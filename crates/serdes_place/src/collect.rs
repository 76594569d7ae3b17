//! The attribute scan that opens the pass.
//!
//! Every cell is visited once. Blank location attributes are dropped, local
//! sync buffers are recorded, and cells tagged with a group id are sorted
//! into their blocks. The scan consumes the role and group attributes, so
//! they never reach the host's output.

use crate::block::Groups;
use crate::codec::HierarchicalId;
use crate::error::{PlaceError, PlaceResult};
use crate::host::Host;
use crate::lbuf::LocalBuffers;
use serdes_config::PlacerConfig;

/// What the scan found.
#[derive(Debug, Default)]
pub struct Collected {
    /// Tagged cells, grouped but not yet analyzed.
    pub groups: Groups,
    /// Local sync buffers.
    pub buffers: LocalBuffers,
    /// Cells carrying the "no group" sentinel.
    pub ungrouped: usize,
}

/// Scans every cell of `host`.
pub fn collect(host: &mut dyn Host, config: &PlacerConfig) -> PlaceResult<Collected> {
    let attrs = &config.attributes;
    let mut found = Collected::default();

    for cell in host.cells() {
        if host.attr(cell, &attrs.bel).is_some_and(|v| v.trim().is_empty()) {
            host.clear_attr(cell, &attrs.bel);
        }

        if let Some(role) = host.attr(cell, &attrs.role).map(str::to_string) {
            host.clear_attr(cell, &attrs.role);
            if role.starts_with(&config.cells.sync_buffer_prefix) {
                found.buffers.record(&*host, cell, config)?;
            }
        }

        let Some(raw) = host.attr(cell, &attrs.group).map(str::to_string) else {
            continue;
        };
        host.clear_attr(cell, &attrs.group);
        let sentinel = config.placement.ungrouped_sentinel;
        let id = HierarchicalId::parse_attr(&raw, sentinel).map_err(|reason| {
            PlaceError::MalformedAttribute {
                cell: host.cell_name(cell).to_string(),
                attribute: attrs.group.clone(),
                value: raw.clone(),
                reason,
            }
        })?;
        match id {
            Some(id) => found.groups.ingest(&*host, cell, id)?,
            None => found.ungrouped += 1,
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockRef;
    use crate::codec::{BlockType, DecodeError};
    use crate::netlist::{Netlist, PortDirection};

    fn tagged(nl: &mut Netlist, name: &str, grp: &str) -> crate::ids::CellId {
        let cell = nl.add_cell(name, "ICESTORM_LC");
        nl.set_attr(cell, "SERDES_GRP", grp.into());
        cell
    }

    #[test]
    fn groups_tagged_cells_and_consumes_attributes() {
        let mut nl = Netlist::new();
        // group 1, subgroup 4, kind 0xa, slots 0 and 1
        let a = tagged(&mut nl, "a", "0001010010100000");
        let b = tagged(&mut nl, "b", "0001010010100001");
        let c = tagged(&mut nl, "c", "11111111111111111111111111111111");
        let found = collect(&mut nl, &PlacerConfig::default()).unwrap();

        let block = found
            .groups
            .block(BlockRef::new(1, 4, BlockType::INPUT_SHIFT))
            .unwrap();
        assert_eq!(block.cells().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(found.ungrouped, 1);
        assert_eq!(found.groups.len(), 1);
        for cell in [a, b, c] {
            assert!(!nl.cell(cell).attrs.contains_key("SERDES_GRP"));
        }
    }

    #[test]
    fn blank_bel_is_cleared() {
        let mut nl = Netlist::new();
        let blank = nl.add_cell("blank", "ICESTORM_LC");
        nl.set_attr(blank, "BEL", "  ".into());
        let kept = nl.add_cell("kept", "ICESTORM_LC");
        nl.set_attr(kept, "BEL", "X1/Y1/lc0".into());
        collect(&mut nl, &PlacerConfig::default()).unwrap();
        assert!(!nl.cell(blank).attrs.contains_key("BEL"));
        assert_eq!(nl.cell(kept).attrs["BEL"], "X1/Y1/lc0");
    }

    #[test]
    fn malformed_group_attribute_names_the_cell() {
        let mut nl = Netlist::new();
        tagged(&mut nl, "bad", "10201");
        let err = collect(&mut nl, &PlacerConfig::default()).unwrap_err();
        assert_eq!(
            err,
            PlaceError::MalformedAttribute {
                cell: "bad".into(),
                attribute: "SERDES_GRP".into(),
                value: "10201".into(),
                reason: DecodeError::NotBinary,
            }
        );
    }

    #[test]
    fn sync_buffers_are_recorded() {
        let mut nl = Netlist::new();
        let drv = nl.add_cell("drv", "ICESTORM_LC");
        nl.set_attr(drv, "BEL", "X4/Y4/lc2".into());
        let src = nl.add_net("rst");
        nl.add_port(drv, "O", PortDirection::Output, Some(src));

        let buf = nl.add_cell("buf", "ICESTORM_LC");
        nl.set_attr(buf, "BEL", "X2/Y4/lc7".into());
        nl.set_attr(buf, "SERDES_ATTR", "sync_lbuf_0".into());
        let copy = nl.add_net("rst_copy");
        nl.add_port(buf, "I0", PortDirection::Input, Some(src));
        nl.add_port(buf, "O", PortDirection::Output, Some(copy));

        let other = nl.add_cell("other", "ICESTORM_LC");
        nl.set_attr(other, "SERDES_ATTR", "something_else".into());

        let found = collect(&mut nl, &PlacerConfig::default()).unwrap();
        assert_eq!(found.buffers.len(), 1);
        assert_eq!(
            found.buffers.copy_map().copies("rst").unwrap()[0].net,
            "rst_copy"
        );
        assert!(!nl.cell(buf).attrs.contains_key("SERDES_ATTR"));
        assert!(!nl.cell(other).attrs.contains_key("SERDES_ATTR"));
    }

    #[test]
    fn duplicate_slot_is_rejected() {
        let mut nl = Netlist::new();
        tagged(&mut nl, "a", "0001010010100000");
        tagged(&mut nl, "b", "0001010010100000");
        assert!(matches!(
            collect(&mut nl, &PlacerConfig::default()),
            Err(PlaceError::DuplicateSlot { ref cell, .. }) if cell == "b"
        ));
    }
}
