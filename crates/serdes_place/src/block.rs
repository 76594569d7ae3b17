//! Reconstruction of SerDes groups and blocks from tagged logic cells.
//!
//! Cells are ingested one by one with their decoded [`HierarchicalId`]; cells
//! sharing `(group, subgroup, type)` form a [`Block`] of up to eight slots,
//! and blocks sharing a group id form a [`Group`]. [`Groups::analyze`] then
//! validates the slot layout and derives, per block, the anchor I/O site and
//! the control group, and per group the single I/O site all blocks agree on.

use crate::codec::{BlockType, ControlGroup, Coordinate, HierarchicalId};
use crate::error::{PlaceError, PlaceResult};
use crate::host::Host;
use crate::ids::CellId;
use serde::{Deserialize, Serialize};
use serdes_config::PlacerConfig;
use std::collections::BTreeMap;
use std::fmt;

/// Maximum number of cells in one block (the slot field is 3 bits wide).
pub const MAX_SLOTS: usize = 8;

/// Why [`Block::insert`] refused a cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SlotError {
    /// The slot already holds this cell.
    Taken(CellId),
    /// The slot index is not below [`MAX_SLOTS`].
    OutOfRange(usize),
}

/// Identity of a block: group, subgroup and type.
///
/// Orders by `(group, subgroup, kind)`, the order placement visits blocks
/// of one tier in.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct BlockRef {
    /// Group id.
    pub group: u8,
    /// Subgroup within the group.
    pub subgroup: u8,
    /// Block type.
    pub kind: BlockType,
}

impl BlockRef {
    /// Creates a block reference.
    pub fn new(group: u8, subgroup: u8, kind: BlockType) -> Self {
        Self {
            group,
            subgroup,
            kind,
        }
    }

    /// The block of the given cell id.
    pub fn of(id: &HierarchicalId) -> Self {
        Self::new(id.group, id.subgroup, id.kind)
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {}/{:x}/{}", self.group, self.subgroup, self.kind)
    }
}

/// Up to eight logic cells implementing one function of a SerDes instance.
#[derive(Debug, Clone)]
pub struct Block {
    id: BlockRef,
    slots: [Option<CellId>; MAX_SLOTS],
    io_site: Option<Coordinate>,
    control_group: Option<ControlGroup>,
}

impl Block {
    /// Creates an empty block.
    pub fn new(id: BlockRef) -> Self {
        Self {
            id,
            slots: [None; MAX_SLOTS],
            io_site: None,
            control_group: None,
        }
    }

    /// The identity of this block.
    pub fn id(&self) -> BlockRef {
        self.id
    }

    /// Puts `cell` into `slot`.
    pub fn insert(&mut self, slot: usize, cell: CellId) -> Result<(), SlotError> {
        match self.slots.get_mut(slot) {
            None => Err(SlotError::OutOfRange(slot)),
            Some(Some(existing)) => Err(SlotError::Taken(*existing)),
            Some(entry) => {
                *entry = Some(cell);
                Ok(())
            }
        }
    }

    /// Number of populated slots, i.e. the site capacity the block consumes.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether no slot is populated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The cell in `slot`, if any.
    pub fn cell(&self, slot: usize) -> Option<CellId> {
        self.slots.get(slot).copied().flatten()
    }

    /// The populated cells in slot order. After analysis, the cell at
    /// position `i` sits in slot `i`.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// The I/O pad site this block is wired to, once analyzed.
    pub fn io_site(&self) -> Option<Coordinate> {
        self.io_site
    }

    /// The control-group fingerprint, once analyzed.
    pub fn control_group(&self) -> Option<&ControlGroup> {
        self.control_group.as_ref()
    }

    /// Validates the slot layout and derives the I/O site and control group.
    ///
    /// Only derived fields are written, so analyzing twice gives the same
    /// result.
    pub fn analyze(&mut self, host: &dyn Host, config: &PlacerConfig) -> PlaceResult<()> {
        let len = self.len();
        if let Some(gap) = self.slots[..len].iter().position(Option::is_none) {
            return Err(PlaceError::IncompleteBlock {
                block: self.id,
                len,
                gap,
            });
        }

        let mut io_site = None;
        for cell in self.cells() {
            io_site = find_io_site(host, cell, config)?;
            if io_site.is_some() {
                break;
            }
        }
        self.io_site = io_site;

        self.control_group = self
            .cell(0)
            .map(|lead| ControlGroup::from_cell(host, lead, &config.ports));
        Ok(())
    }
}

/// Looks for an I/O pad on the nets of `cell`'s search ports.
///
/// Placeholder nets created by the packer are skipped. For each remaining
/// net, the driver is checked before the users.
fn find_io_site(
    host: &dyn Host,
    cell: CellId,
    config: &PlacerConfig,
) -> PlaceResult<Option<Coordinate>> {
    for port in &config.ports.io_search {
        let Some(net) = host.port_net(cell, port) else {
            continue;
        };
        if host
            .net_name(net)
            .starts_with(&config.cells.internal_net_prefix)
        {
            continue;
        }
        let candidates = host.net_driver(net).into_iter().chain(host.net_users(net));
        for other in candidates {
            if host.cell_type(other) != config.cells.io_type {
                continue;
            }
            if let Some(bel) = host.attr(other, &config.attributes.bel) {
                return decode_bel(host, other, &config.attributes.bel, bel).map(Some);
            }
        }
    }
    Ok(None)
}

/// Decodes a location attribute, attributing failures to `cell`.
pub(crate) fn decode_bel(
    host: &dyn Host,
    cell: CellId,
    attribute: &str,
    value: &str,
) -> PlaceResult<Coordinate> {
    Coordinate::decode(value).map_err(|reason| PlaceError::MalformedAttribute {
        cell: host.cell_name(cell).to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
        reason,
    })
}

/// All blocks of one SerDes instance.
#[derive(Debug, Clone)]
pub struct Group {
    id: u8,
    blocks: BTreeMap<(u8, BlockType), Block>,
    io_site: Option<Coordinate>,
}

impl Group {
    /// Creates an empty group.
    pub fn new(id: u8) -> Self {
        Self {
            id,
            blocks: BTreeMap::new(),
            io_site: None,
        }
    }

    /// The group id.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// The I/O pad site shared by the group, once analyzed.
    pub fn io_site(&self) -> Option<Coordinate> {
        self.io_site
    }

    /// The block at `(subgroup, kind)`.
    pub fn block(&self, subgroup: u8, kind: BlockType) -> Option<&Block> {
        self.blocks.get(&(subgroup, kind))
    }

    /// All blocks, ordered by `(subgroup, kind)`.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    fn block_mut(&mut self, subgroup: u8, kind: BlockType) -> &mut Block {
        let id = BlockRef::new(self.id, subgroup, kind);
        self.blocks
            .entry((subgroup, kind))
            .or_insert_with(|| Block::new(id))
    }

    /// Analyzes every block, then checks that all blocks reporting an I/O
    /// site agree on it.
    pub fn analyze(&mut self, host: &dyn Host, config: &PlacerConfig) -> PlaceResult<()> {
        for block in self.blocks.values_mut() {
            block.analyze(host, config)?;
        }

        let mut io_site: Option<Coordinate> = None;
        for site in self.blocks.values().filter_map(Block::io_site) {
            match io_site {
                Some(first) if first != site => {
                    return Err(PlaceError::ConflictingIoSite {
                        group: self.id,
                        first,
                        second: site,
                    });
                }
                _ => io_site = Some(site),
            }
        }
        self.io_site = io_site;
        Ok(())
    }
}

/// Every SerDes group of the design, keyed by group id.
#[derive(Debug, Clone, Default)]
pub struct Groups {
    groups: BTreeMap<u8, Group>,
}

impl Groups {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `cell` at the position given by `id`.
    ///
    /// Fails with [`PlaceError::DuplicateSlot`] when another cell already
    /// holds that position.
    pub fn ingest(&mut self, host: &dyn Host, cell: CellId, id: HierarchicalId) -> PlaceResult<()> {
        let block = self
            .groups
            .entry(id.group)
            .or_insert_with(|| Group::new(id.group))
            .block_mut(id.subgroup, id.kind);
        let cell_name = || host.cell_name(cell).to_string();
        block
            .insert(usize::from(id.slot), cell)
            .map_err(|err| match err {
                SlotError::Taken(_) => PlaceError::DuplicateSlot {
                    id,
                    cell: cell_name(),
                },
                SlotError::OutOfRange(_) => PlaceError::SlotOutOfRange {
                    id,
                    cell: cell_name(),
                },
            })
    }

    /// Analyzes every group.
    pub fn analyze(&mut self, host: &dyn Host, config: &PlacerConfig) -> PlaceResult<()> {
        for group in self.groups.values_mut() {
            group.analyze(host, config)?;
        }
        Ok(())
    }

    /// The group with id `group`.
    pub fn group(&self, group: u8) -> Option<&Group> {
        self.groups.get(&group)
    }

    /// All groups by ascending id.
    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// The block named by `id`.
    pub fn block(&self, id: BlockRef) -> Option<&Block> {
        self.group(id.group)?.block(id.subgroup, id.kind)
    }

    /// Every block of type `kind` with its group, ordered by
    /// `(group, subgroup)`.
    pub fn blocks_of_kind(&self, kind: BlockType) -> Vec<(&Group, &Block)> {
        let mut found: Vec<(&Group, &Block)> = self
            .iter()
            .flat_map(|g| g.blocks().map(move |b| (g, b)))
            .filter(|(_, b)| b.id().kind == kind)
            .collect();
        found.sort_by_key(|(_, b)| b.id());
        found
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{Netlist, PortDirection};

    fn id(group: u8, subgroup: u8, kind: BlockType, slot: u8) -> HierarchicalId {
        HierarchicalId {
            group,
            subgroup,
            kind,
            slot,
        }
    }

    /// A logic cell with clock `clk` and an I0 input on `net`.
    fn lc(nl: &mut Netlist, name: &str, net: Option<crate::ids::NetId>) -> CellId {
        let cell = nl.add_cell(name, "ICESTORM_LC");
        let clk = nl.net_id("clk").unwrap_or_else(|| nl.add_net("clk"));
        nl.add_port(cell, "CLK", PortDirection::Input, Some(clk));
        nl.add_port(cell, "I0", PortDirection::Input, net);
        nl.add_port(cell, "O", PortDirection::Output, None);
        cell
    }

    fn io_pad(nl: &mut Netlist, name: &str, bel: &str) -> crate::ids::NetId {
        let pad = nl.add_cell(name, "SB_IO");
        nl.set_attr(pad, "BEL", bel.into());
        let net = nl.add_net(format!("{name}_din"));
        nl.add_port(pad, "D_IN_0", PortDirection::Output, Some(net));
        net
    }

    #[test]
    fn contiguous_block_len() {
        let mut nl = Netlist::new();
        let mut groups = Groups::new();
        for slot in 0..3 {
            let cell = lc(&mut nl, &format!("c{slot}"), None);
            groups
                .ingest(&nl, cell, id(0, 4, BlockType::INPUT_SHIFT, slot))
                .unwrap();
        }
        groups.analyze(&nl, &PlacerConfig::default()).unwrap();
        let block = groups
            .block(BlockRef::new(0, 4, BlockType::INPUT_SHIFT))
            .unwrap();
        assert_eq!(block.len(), 3);
        assert_eq!(block.cells().count(), 3);
    }

    #[test]
    fn gap_is_incomplete() {
        let mut nl = Netlist::new();
        let mut groups = Groups::new();
        for slot in [0, 2] {
            let cell = lc(&mut nl, &format!("c{slot}"), None);
            groups
                .ingest(&nl, cell, id(0, 4, BlockType::INPUT_SHIFT, slot))
                .unwrap();
        }
        let err = groups.analyze(&nl, &PlacerConfig::default()).unwrap_err();
        assert_eq!(
            err,
            PlaceError::IncompleteBlock {
                block: BlockRef::new(0, 4, BlockType::INPUT_SHIFT),
                len: 2,
                gap: 1,
            }
        );
    }

    #[test]
    fn slot_past_eight_is_an_error() {
        let mut nl = Netlist::new();
        let mut groups = Groups::new();
        let cell = lc(&mut nl, "c8", None);
        let err = groups
            .ingest(&nl, cell, id(0, 4, BlockType::INPUT_SHIFT, 8))
            .unwrap_err();
        assert_eq!(
            err,
            PlaceError::SlotOutOfRange {
                id: id(0, 4, BlockType::INPUT_SHIFT, 8),
                cell: "c8".into(),
            }
        );

        let mut block = Block::new(BlockRef::new(0, 4, BlockType::INPUT_SHIFT));
        assert_eq!(block.insert(MAX_SLOTS, cell), Err(SlotError::OutOfRange(8)));
        block.insert(7, cell).unwrap();
        assert_eq!(block.insert(7, cell), Err(SlotError::Taken(cell)));
    }

    #[test]
    fn duplicate_slot_rejected() {
        let mut nl = Netlist::new();
        let a = lc(&mut nl, "a", None);
        let b = lc(&mut nl, "b", None);
        let mut groups = Groups::new();
        let pos = id(1, 0, BlockType::OUTPUT_SHIFT, 2);
        groups.ingest(&nl, a, pos).unwrap();
        let err = groups.ingest(&nl, b, pos).unwrap_err();
        assert_eq!(
            err,
            PlaceError::DuplicateSlot {
                id: pos,
                cell: "b".into()
            }
        );
    }

    #[test]
    fn io_site_from_pad_driver() {
        let mut nl = Netlist::new();
        let din = io_pad(&mut nl, "pad", "X0/Y5/io1");
        let cell = lc(&mut nl, "c0", Some(din));
        let mut groups = Groups::new();
        groups
            .ingest(&nl, cell, id(2, 4, BlockType::INPUT_SHIFT, 0))
            .unwrap();
        groups.analyze(&nl, &PlacerConfig::default()).unwrap();
        assert_eq!(
            groups.group(2).unwrap().io_site(),
            Some(Coordinate::new(0, 5, 1))
        );
    }

    #[test]
    fn packer_nets_are_ignored() {
        let mut nl = Netlist::new();
        let pad = nl.add_cell("pad", "SB_IO");
        nl.set_attr(pad, "BEL", "X0/Y5/io0".into());
        let net = nl.add_net("$PACKER_GND_NET");
        nl.add_port(pad, "D_IN_0", PortDirection::Output, Some(net));
        let cell = lc(&mut nl, "c0", Some(net));
        let mut groups = Groups::new();
        groups
            .ingest(&nl, cell, id(0, 0, BlockType::OUTPUT_SHIFT, 0))
            .unwrap();
        groups.analyze(&nl, &PlacerConfig::default()).unwrap();
        assert_eq!(groups.group(0).unwrap().io_site(), None);
    }

    #[test]
    fn unplaced_pad_is_ignored() {
        let mut nl = Netlist::new();
        let pad = nl.add_cell("pad", "SB_IO");
        let net = nl.add_net("din");
        nl.add_port(pad, "D_IN_0", PortDirection::Output, Some(net));
        let cell = lc(&mut nl, "c0", Some(net));
        let mut groups = Groups::new();
        groups
            .ingest(&nl, cell, id(0, 4, BlockType::INPUT_SHIFT, 0))
            .unwrap();
        groups.analyze(&nl, &PlacerConfig::default()).unwrap();
        assert_eq!(groups.group(0).unwrap().io_site(), None);
    }

    #[test]
    fn conflicting_io_sites() {
        let mut nl = Netlist::new();
        let a = io_pad(&mut nl, "pad_a", "X0/Y5/io0");
        let b = io_pad(&mut nl, "pad_b", "X0/Y9/io0");
        let ca = lc(&mut nl, "ca", Some(a));
        let cb = lc(&mut nl, "cb", Some(b));
        let mut groups = Groups::new();
        groups
            .ingest(&nl, ca, id(3, 4, BlockType::INPUT_SHIFT, 0))
            .unwrap();
        groups
            .ingest(&nl, cb, id(3, 5, BlockType::INPUT_SHIFT, 0))
            .unwrap();
        let err = groups.analyze(&nl, &PlacerConfig::default()).unwrap_err();
        assert_eq!(
            err,
            PlaceError::ConflictingIoSite {
                group: 3,
                first: Coordinate::new(0, 5, 0),
                second: Coordinate::new(0, 9, 0),
            }
        );
    }

    #[test]
    fn malformed_pad_bel() {
        let mut nl = Netlist::new();
        let din = io_pad(&mut nl, "pad", "X0/io0");
        let cell = lc(&mut nl, "c0", Some(din));
        let mut groups = Groups::new();
        groups
            .ingest(&nl, cell, id(0, 4, BlockType::INPUT_SHIFT, 0))
            .unwrap();
        let err = groups.analyze(&nl, &PlacerConfig::default()).unwrap_err();
        assert!(matches!(err, PlaceError::MalformedAttribute { ref cell, .. } if cell == "pad"));
    }

    #[test]
    fn control_group_from_slot_zero() {
        let mut nl = Netlist::new();
        let c0 = lc(&mut nl, "c0", None);
        let c1 = lc(&mut nl, "c1", None);
        let rst = nl.add_net("rst");
        nl.add_port(c0, "SR", PortDirection::Input, Some(rst));
        nl.cell_mut(c0).params.insert("NEG_CLK".into(), "1".into());
        let mut groups = Groups::new();
        groups
            .ingest(&nl, c1, id(0, 0, BlockType::OUTPUT_NEGEDGE_DELAY, 1))
            .unwrap();
        groups
            .ingest(&nl, c0, id(0, 0, BlockType::OUTPUT_NEGEDGE_DELAY, 0))
            .unwrap();
        groups.analyze(&nl, &PlacerConfig::default()).unwrap();
        let cg = groups
            .block(BlockRef::new(0, 0, BlockType::OUTPUT_NEGEDGE_DELAY))
            .unwrap()
            .control_group()
            .unwrap();
        assert_eq!(
            *cg,
            ControlGroup {
                clock: Some("clk".into()),
                reset: Some("rst".into()),
                enable: None,
                negedge: true,
            }
        );
    }

    #[test]
    fn analyze_is_idempotent() {
        let mut nl = Netlist::new();
        let din = io_pad(&mut nl, "pad", "X0/Y5/io0");
        let mut groups = Groups::new();
        for slot in 0..4 {
            let cell = lc(&mut nl, &format!("c{slot}"), Some(din));
            groups
                .ingest(&nl, cell, id(0, 4, BlockType::INPUT_SHIFT, slot))
                .unwrap();
        }
        let config = PlacerConfig::default();
        let key = BlockRef::new(0, 4, BlockType::INPUT_SHIFT);

        groups.analyze(&nl, &config).unwrap();
        let first = groups.block(key).unwrap().clone();
        let first_io = groups.group(0).unwrap().io_site();

        groups.analyze(&nl, &config).unwrap();
        let second = groups.block(key).unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first.control_group(), second.control_group());
        assert_eq!(first.io_site(), second.io_site());
        assert_eq!(first_io, groups.group(0).unwrap().io_site());
    }

    #[test]
    fn blocks_of_kind_sorted() {
        let mut nl = Netlist::new();
        let mut groups = Groups::new();
        for (g, s) in [(2, 1), (0, 1), (2, 0), (1, 0)] {
            let cell = lc(&mut nl, &format!("c{g}{s}"), None);
            groups
                .ingest(&nl, cell, id(g, s, BlockType::OUTPUT_SHIFT, 0))
                .unwrap();
        }
        let cell = lc(&mut nl, "other", None);
        groups
            .ingest(&nl, cell, id(0, 0, BlockType::OUTPUT_CAPTURE, 0))
            .unwrap();

        let order: Vec<(u8, u8)> = groups
            .blocks_of_kind(BlockType::OUTPUT_SHIFT)
            .into_iter()
            .map(|(g, b)| (g.id(), b.id().subgroup))
            .collect();
        assert_eq!(order, vec![(0, 1), (1, 0), (2, 0), (2, 1)]);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn block_ref_display() {
        let b = BlockRef::new(1, 4, BlockType::INPUT_SHIFT);
        assert_eq!(b.to_string(), "block 1/4/a ISERDES Shift");
    }
}
