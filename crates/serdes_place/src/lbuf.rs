//! Local sync buffer rewiring.
//!
//! The packer duplicates high-fanout sync signals into local buffer cells,
//! each driving a private copy of the source net. After placement, every
//! consumer port of a placed SerDes cell that reads such a source is moved
//! to the copy whose buffer sits closest to the consumer.
//!
//! Buffers are grouped by the site of the cell driving their input: all
//! source nets driven from one site share that site's pool of copies.

use crate::block::{decode_bel, Groups};
use crate::codec::Coordinate;
use crate::error::{PlaceError, PlaceResult};
use crate::host::Host;
use crate::ids::CellId;
use crate::placement::Placement;
use serde::{Deserialize, Serialize};
use serdes_config::PlacerConfig;
use std::collections::{BTreeMap, HashMap};

/// One buffered copy of a sync net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferCopy {
    /// Where the buffer cell sits.
    pub at: Coordinate,
    /// The copy net it drives.
    pub net: String,
}

#[derive(Debug, Clone, Default)]
struct DriverSite {
    sources: Vec<String>,
    copies: Vec<BufferCopy>,
}

/// Buffers collected during the attribute scan, keyed by driver site.
#[derive(Debug, Clone, Default)]
pub struct LocalBuffers {
    by_driver_site: BTreeMap<Coordinate, DriverSite>,
    count: usize,
}

impl LocalBuffers {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the buffer `cell`: its source net, the site of the source's
    /// driver, its own location and the copy net it drives.
    pub fn record(
        &mut self,
        host: &dyn Host,
        cell: CellId,
        config: &PlacerConfig,
    ) -> PlaceResult<()> {
        let ports = &config.ports;
        let bel = &config.attributes.bel;

        let source = host
            .port_net(cell, &ports.buffer_input)
            .ok_or_else(|| unconnected(host, cell, &ports.buffer_input))?;
        let driver = host
            .net_driver(source)
            .ok_or_else(|| unconnected(host, cell, &ports.buffer_input))?;
        let driver_site = located(host, driver, bel)?.site();
        let copy = host
            .port_net(cell, &ports.buffer_output)
            .ok_or_else(|| unconnected(host, cell, &ports.buffer_output))?;
        let at = located(host, cell, bel)?;

        let site = self.by_driver_site.entry(driver_site).or_default();
        site.sources.push(host.net_name(source).to_string());
        site.copies.push(BufferCopy {
            at,
            net: host.net_name(copy).to_string(),
        });
        self.count += 1;
        Ok(())
    }

    /// Number of recorded buffers.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no buffer was recorded.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Builds the source-net lookup used for rewiring.
    pub fn copy_map(&self) -> CopyMap {
        let mut copies = HashMap::new();
        for site in self.by_driver_site.values() {
            for source in &site.sources {
                copies.insert(source.clone(), site.copies.clone());
            }
        }
        CopyMap { copies }
    }
}

fn unconnected(host: &dyn Host, cell: CellId, port: &str) -> PlaceError {
    PlaceError::UnconnectedPort {
        cell: host.cell_name(cell).to_string(),
        port: port.to_string(),
    }
}

fn located(host: &dyn Host, cell: CellId, attribute: &str) -> PlaceResult<Coordinate> {
    let value = host
        .attr(cell, attribute)
        .ok_or_else(|| PlaceError::MissingAttribute {
            cell: host.cell_name(cell).to_string(),
            attribute: attribute.to_string(),
        })?;
    decode_bel(host, cell, attribute, value)
}

/// Source net name to the buffered copies available for it.
#[derive(Debug, Clone, Default)]
pub struct CopyMap {
    copies: HashMap<String, Vec<BufferCopy>>,
}

impl CopyMap {
    /// The copies available for `source`.
    pub fn copies(&self, source: &str) -> Option<&[BufferCopy]> {
        self.copies.get(source).map(Vec::as_slice)
    }

    /// The copy of `source` closest to `from`. Ties go to the copy recorded
    /// first.
    pub fn nearest(&self, source: &str, from: Coordinate) -> Option<&BufferCopy> {
        self.copies
            .get(source)?
            .iter()
            .min_by_key(|c| c.at.distance(from))
    }

    /// Number of source nets with copies.
    pub fn len(&self) -> usize {
        self.copies.len()
    }

    /// Whether no source net has copies.
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }
}

/// A consumer port moved from a source net to one of its copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconnection {
    /// Consumer cell.
    pub cell: String,
    /// Consumer port.
    pub port: String,
    /// Source net the port read before.
    pub from: String,
    /// Copy net it reads now.
    pub to: String,
}

/// Moves the consumer ports of every placed SerDes cell onto the nearest
/// copy of their source net.
///
/// Cells are visited group by group, block by block, slot by slot; each
/// cell's position is its block's base plus its slot index.
pub fn rewire(
    host: &mut dyn Host,
    groups: &Groups,
    placement: &Placement,
    copies: &CopyMap,
    config: &PlacerConfig,
) -> PlaceResult<Vec<Reconnection>> {
    let mut moved = Vec::new();
    if copies.is_empty() {
        return Ok(moved);
    }
    for group in groups.iter() {
        for block in group.blocks() {
            let Some(base) = placement.position_of(block.id()) else {
                continue;
            };
            for (i, cell) in block.cells().enumerate() {
                let at = base.with_slot_offset(i);
                for port in &config.ports.rewire {
                    let Some(net) = host.port_net(cell, port) else {
                        continue;
                    };
                    let from = host.net_name(net).to_string();
                    let Some(copy) = copies.nearest(&from, at) else {
                        continue;
                    };
                    host.disconnect_port(cell, port)?;
                    host.connect_port(&copy.net, cell, port)?;
                    moved.push(Reconnection {
                        cell: host.cell_name(cell).to_string(),
                        port: port.clone(),
                        from,
                        to: copy.net.clone(),
                    });
                }
            }
        }
    }
    Ok(moved)
}
