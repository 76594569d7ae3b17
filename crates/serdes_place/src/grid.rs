//! The logic sites blocks are placed onto.
//!
//! One [`Site`] exists per slot-0 logic BEL of the fabric. A site has a fixed
//! number of slots and takes blocks until they are used up; the first
//! occupant with a control group fixes the fingerprint every later occupant
//! must match.

use crate::block::{Block, BlockRef};
use crate::codec::{ControlGroup, Coordinate};
use crate::error::{PlaceError, PlaceResult};
use crate::host::Host;
use serdes_config::PlacerConfig;
use std::collections::HashMap;

/// One multi-slot placement location.
#[derive(Debug, Clone)]
pub struct Site {
    pos: Coordinate,
    capacity: u8,
    free: u8,
    blocks: Vec<BlockRef>,
    control_group: Option<ControlGroup>,
}

impl Site {
    /// Creates an empty site at `pos` (slot 0) with `capacity` slots.
    pub fn new(pos: Coordinate, capacity: u8) -> Self {
        Self {
            pos: pos.site(),
            capacity,
            free: capacity,
            blocks: Vec::new(),
            control_group: None,
        }
    }

    /// Position of slot 0.
    pub fn pos(&self) -> Coordinate {
        self.pos
    }

    /// Remaining free slots.
    pub fn free(&self) -> u8 {
        self.free
    }

    /// Blocks placed here, in placement order.
    pub fn blocks(&self) -> &[BlockRef] {
        &self.blocks
    }

    /// The fingerprint imposed by the first occupant that had one.
    pub fn control_group(&self) -> Option<&ControlGroup> {
        self.control_group.as_ref()
    }

    /// Whether `block` fits and is control-group compatible.
    pub fn accepts(&self, block: &Block) -> bool {
        usize::from(self.free) >= block.len()
            && match (&self.control_group, block.control_group()) {
                (Some(site), Some(blk)) => site.compatible(blk),
                _ => true,
            }
    }

    /// Takes `block` into the next free slots and returns the coordinate of
    /// its first slot.
    fn take(&mut self, block: &Block) -> Coordinate {
        let base = Coordinate::new(self.pos.x, self.pos.y, i32::from(self.capacity - self.free));
        if self.control_group.is_none() {
            self.control_group = block.control_group().cloned();
        }
        // `accepts` was checked by the caller, so this cannot underflow.
        self.free -= block.len() as u8;
        self.blocks.push(block.id());
        base
    }
}

/// All logic sites of the fabric, keyed by slot-0 position.
#[derive(Debug, Clone, Default)]
pub struct SiteGrid {
    sites: HashMap<Coordinate, Site>,
}

impl SiteGrid {
    /// Creates a grid of empty sites at the given positions.
    pub fn from_positions(positions: impl IntoIterator<Item = Coordinate>, capacity: u8) -> Self {
        let sites = positions
            .into_iter()
            .map(|p| (p.site(), Site::new(p, capacity)))
            .collect();
        Self { sites }
    }

    /// Enumerates the host's BELs and creates an empty site for each one
    /// naming slot 0 of a logic site.
    pub fn build(host: &dyn Host, config: &PlacerConfig) -> PlaceResult<Self> {
        let mut positions = Vec::new();
        for bel in host.bel_names() {
            if !bel.ends_with(&config.cells.logic_bel_suffix) {
                continue;
            }
            let pos = Coordinate::decode(&bel).map_err(|reason| PlaceError::MalformedAttribute {
                cell: bel.clone(),
                attribute: "bel name".to_string(),
                value: bel.clone(),
                reason,
            })?;
            positions.push(pos);
        }
        Ok(Self::from_positions(positions, config.placement.site_capacity))
    }

    /// The site at `pos`, if the fabric has one.
    pub fn site(&self, pos: Coordinate) -> Option<&Site> {
        self.sites.get(&pos.site())
    }

    /// Number of sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether the fabric has no logic sites.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Whether a site exists at `pos` and accepts `block`.
    pub fn is_valid_for(&self, pos: Coordinate, block: &Block) -> bool {
        self.site(pos).is_some_and(|s| s.accepts(block))
    }

    /// Assigns `block` to the site at `pos` and returns the coordinate of
    /// the block's first cell.
    pub fn commit(&mut self, pos: Coordinate, block: &Block) -> PlaceResult<Coordinate> {
        match self.sites.get_mut(&pos.site()) {
            Some(site) if site.accepts(block) => Ok(site.take(block)),
            _ => Err(PlaceError::SiteOverflow {
                site: pos.site(),
                block: block.id(),
            }),
        }
    }
}
