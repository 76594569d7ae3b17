//! Configuration types deserialized from TOML.

use serde::Deserialize;

/// The top-level placer configuration.
///
/// All sections default individually, so a document only needs to name
/// what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct PlacerConfig {
    /// Names of the cell attributes the pass reads and writes.
    pub attributes: AttributeNames,
    /// Cell-type and naming conventions of the host netlist.
    pub cells: CellConventions,
    /// Port and parameter names on logic cells.
    pub ports: PortNames,
    /// Site capacity, priority table and search offsets.
    pub placement: PlacementConfig,
}

/// Cell attribute keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AttributeNames {
    /// Binary-string hierarchical id of a SerDes logic cell.
    pub group: String,
    /// Role tag; local sync buffers carry a value starting with
    /// [`CellConventions::sync_buffer_prefix`].
    pub role: String,
    /// Placed location in `X<x>/Y<y>/<kind><z>` form.
    pub bel: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            group: "SERDES_GRP".into(),
            role: "SERDES_ATTR".into(),
            bel: "BEL".into(),
        }
    }
}

/// Naming conventions used to recognize cells, nets and sites.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CellConventions {
    /// Cell type of an I/O pad.
    pub io_type: String,
    /// Nets whose names start with this prefix are packer placeholders.
    pub internal_net_prefix: String,
    /// BEL names ending with this suffix are slot 0 of a logic site.
    pub logic_bel_suffix: String,
    /// Role attribute prefix marking a local sync buffer.
    pub sync_buffer_prefix: String,
}

impl Default for CellConventions {
    fn default() -> Self {
        Self {
            io_type: "SB_IO".into(),
            internal_net_prefix: "$PACKER_".into(),
            logic_bel_suffix: "/lc0".into(),
            sync_buffer_prefix: "sync_lbuf".into(),
        }
    }
}

/// Port and parameter names on logic cells.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PortNames {
    /// Ports scanned, in order, for a connection to an I/O pad.
    pub io_search: Vec<String>,
    /// Clock input.
    pub clock: String,
    /// Set/reset input.
    pub reset: String,
    /// Clock enable input.
    pub enable: String,
    /// Parameter that is `"1"` for negative-edge clocking.
    pub negedge_param: String,
    /// Consumer ports rewired to the nearest local buffer copy.
    pub rewire: Vec<String>,
    /// Input of a local sync buffer (the shared source net).
    pub buffer_input: String,
    /// Output of a local sync buffer (the private copy net).
    pub buffer_output: String,
}

impl Default for PortNames {
    fn default() -> Self {
        Self {
            io_search: ["I0", "I1", "I2", "I3", "O"].map(String::from).to_vec(),
            clock: "CLK".into(),
            reset: "SR".into(),
            enable: "CEN".into(),
            negedge_param: "NEG_CLK".into(),
            rewire: ["I0", "I1", "I2", "I3", "CEN"].map(String::from).to_vec(),
            buffer_input: "I0".into(),
            buffer_output: "O".into(),
        }
    }
}

/// Placement tables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Slots per logic site.
    pub site_capacity: u8,
    /// Group attribute value marking a cell that belongs to no group.
    pub ungrouped_sentinel: u32,
    /// Search offsets as `(u, v)`: `u` runs along the I/O bank edge, `v`
    /// points away from it.
    pub offsets: Vec<(i32, i32)>,
    /// Block types in placement order, with the rule giving each its target.
    pub priority: Vec<PriorityEntry>,
}

/// Default `(u, v)` search offsets.
pub const DEFAULT_OFFSETS: [(i32, i32); 23] = [
    (0, 1),
    (-1, 1),
    (1, 1),
    (-1, 0),
    (1, 0),
    (0, -1),
    (-1, -1),
    (1, -1),
    (0, 1),
    (0, 2),
    (0, 3),
    (0, 4),
    (-1, 1),
    (1, 1),
    (-1, 2),
    (1, 2),
    (-1, 3),
    (1, 3),
    (-1, 4),
    (1, 4),
    (0, 5),
    (-1, 5),
    (1, 5),
];

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            site_capacity: 8,
            ungrouped_sentinel: 0xffff_ffff,
            offsets: DEFAULT_OFFSETS.to_vec(),
            priority: default_priority(),
        }
    }
}

/// The SerDes placement order: I/O-column types first, then the types that
/// only need to sit near an already placed sibling.
fn default_priority() -> Vec<PriorityEntry> {
    vec![
        PriorityEntry::new(0x2, TargetRule::IoSite),
        PriorityEntry::new(0xb, TargetRule::IoSite),
        PriorityEntry::new(0xa, TargetRule::IoSite),
        PriorityEntry::new(
            0x9,
            TargetRule::Sibling {
                kind: 0xa,
                subgroup: SubgroupSelector::Parity(4),
            },
        ),
        PriorityEntry::new(0x1, TargetRule::IoSite),
        PriorityEntry::new(
            0x0,
            TargetRule::Sibling {
                kind: 0x1,
                subgroup: SubgroupSelector::Same,
            },
        ),
        PriorityEntry::new(
            0x8,
            TargetRule::Centroid {
                kind: 0xa,
                required: vec![4],
                optional: vec![5],
            },
        ),
    ]
}

/// One tier of the placement priority table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PriorityEntry {
    /// Raw 4-bit block type placed in this tier.
    pub kind: u8,
    /// How the search anchor of each block is resolved.
    pub target: TargetRule,
}

impl PriorityEntry {
    /// Creates a priority entry.
    pub fn new(kind: u8, target: TargetRule) -> Self {
        Self { kind, target }
    }
}

/// Target resolution rule for one priority tier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum TargetRule {
    /// The group's anchor I/O site.
    IoSite,
    /// The placed coordinate of one sibling block in the same group.
    Sibling {
        /// Raw type of the sibling.
        kind: u8,
        /// Which subgroup the sibling lives in.
        subgroup: SubgroupSelector,
    },
    /// The rounded centroid of several sibling blocks of one type.
    Centroid {
        /// Raw type of the siblings.
        kind: u8,
        /// Subgroups that must be present.
        required: Vec<u8>,
        /// Subgroups included only when the group has them.
        #[serde(default)]
        optional: Vec<u8>,
    },
}

impl TargetRule {
    /// The sibling type this rule depends on, if any.
    pub fn dependency(&self) -> Option<u8> {
        match self {
            TargetRule::IoSite => None,
            TargetRule::Sibling { kind, .. } | TargetRule::Centroid { kind, .. } => Some(*kind),
        }
    }
}

/// Selects a sibling subgroup relative to the block being placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubgroupSelector {
    /// The block's own subgroup.
    Same,
    /// A fixed subgroup.
    Fixed(u8),
    /// `base | (own & 1)`: the sibling of the same data path parity.
    Parity(u8),
}

impl SubgroupSelector {
    /// Resolves the sibling subgroup for a block in subgroup `own`.
    pub fn resolve(self, own: u8) -> u8 {
        match self {
            SubgroupSelector::Same => own,
            SubgroupSelector::Fixed(sub) => sub,
            SubgroupSelector::Parity(base) => base | (own & 1),
        }
    }
}
