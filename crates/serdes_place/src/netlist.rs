//! In-memory netlist implementing [`Host`].
//!
//! A [`Netlist`] holds cells (type, attributes, parameters, ports), nets
//! (one driving port, any number of consuming ports) and the list of BEL
//! names of the fabric. It backs the tests of this crate and lets an
//! embedding tool run the pass against a serialized design snapshot.

use crate::codec::Coordinate;
use crate::host::{Host, HostError};
use crate::ids::{CellId, NetId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The attribute [`Netlist::place_cell`] writes the BEL name into unless
/// [`Netlist::with_bel_attr`] names another one. It has to match the
/// `attributes.bel` key of the placer configuration.
pub const BEL_ATTR: &str = "BEL";

/// A design snapshot: cells, nets and the fabric's BEL names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Netlist {
    /// All cells, indexed by [`CellId`].
    pub cells: Vec<NetlistCell>,
    /// All nets, indexed by [`NetId`].
    pub nets: Vec<NetlistNet>,
    /// Names of every BEL in the fabric.
    pub bels: Vec<String>,
    /// Attribute placements are written to; [`BEL_ATTR`] when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bel_attr: Option<String>,
    /// Auxiliary index: cell name to ID (rebuilt on deserialization).
    #[serde(skip)]
    pub cell_by_name: HashMap<String, CellId>,
    /// Auxiliary index: net name to ID (rebuilt on deserialization).
    #[serde(skip)]
    pub net_by_name: HashMap<String, NetId>,
}

/// Direction of a cell port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// The port consumes its net.
    Input,
    /// The port drives its net.
    Output,
}

/// A port of a cell and the net it is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetlistPort {
    /// Direction of the port.
    pub direction: PortDirection,
    /// Attached net, if any.
    pub net: Option<NetId>,
}

/// A cell of the netlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetlistCell {
    /// Instance name.
    pub name: String,
    /// Cell type, e.g. `"ICESTORM_LC"`.
    pub cell_type: String,
    /// String attributes.
    pub attrs: BTreeMap<String, String>,
    /// String parameters.
    pub params: BTreeMap<String, String>,
    /// Ports by name.
    pub ports: BTreeMap<String, NetlistPort>,
}

/// One end of a connection: a port on a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    /// The cell.
    pub cell: CellId,
    /// The port name on that cell.
    pub port: String,
}

/// A net of the netlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetlistNet {
    /// Net name.
    pub name: String,
    /// The driving port.
    pub driver: Option<PortRef>,
    /// Consuming ports, in connection order.
    pub users: Vec<PortRef>,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes placements into `attr` instead of [`BEL_ATTR`].
    pub fn with_bel_attr(mut self, attr: impl Into<String>) -> Self {
        self.bel_attr = Some(attr.into());
        self
    }

    /// The attribute placements are written to.
    pub fn bel_attr(&self) -> &str {
        self.bel_attr.as_deref().unwrap_or(BEL_ATTR)
    }

    /// Adds a cell with no ports and returns its ID.
    pub fn add_cell(&mut self, name: impl Into<String>, cell_type: impl Into<String>) -> CellId {
        let id = CellId::from_raw(self.cells.len() as u32);
        let name = name.into();
        self.cell_by_name.insert(name.clone(), id);
        self.cells.push(NetlistCell {
            name,
            cell_type: cell_type.into(),
            attrs: BTreeMap::new(),
            params: BTreeMap::new(),
            ports: BTreeMap::new(),
        });
        id
    }

    /// Adds a net with no connections and returns its ID.
    pub fn add_net(&mut self, name: impl Into<String>) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        let name = name.into();
        self.net_by_name.insert(name.clone(), id);
        self.nets.push(NetlistNet {
            name,
            driver: None,
            users: Vec::new(),
        });
        id
    }

    /// Adds a BEL name to the fabric.
    pub fn add_bel(&mut self, name: impl Into<String>) {
        self.bels.push(name.into());
    }

    /// Declares a port on a cell and, if `net` is given, attaches it.
    ///
    /// An output port becomes the net's driver; an input port is appended
    /// to its users.
    pub fn add_port(
        &mut self,
        cell: CellId,
        port: impl Into<String>,
        direction: PortDirection,
        net: Option<NetId>,
    ) {
        let port = port.into();
        if let Some(net) = net {
            self.attach(net, cell, &port, direction);
        }
        self.cells[cell.index()]
            .ports
            .insert(port, NetlistPort { direction, net });
    }

    /// Returns the cell with the given ID.
    pub fn cell(&self, id: CellId) -> &NetlistCell {
        &self.cells[id.index()]
    }

    /// Returns a mutable reference to the cell with the given ID.
    pub fn cell_mut(&mut self, id: CellId) -> &mut NetlistCell {
        &mut self.cells[id.index()]
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &NetlistNet {
        &self.nets[id.index()]
    }

    /// Looks up a net by name.
    pub fn net_id(&self, name: &str) -> Option<NetId> {
        self.net_by_name.get(name).copied()
    }

    /// Returns the name of the net attached to `port` of `cell`.
    pub fn port_net_name(&self, cell: CellId, port: &str) -> Option<&str> {
        self.port_net(cell, port).map(|n| self.net(n).name.as_str())
    }

    /// Returns the number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns the number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Rebuilds auxiliary indices after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.cell_by_name = self
            .cells
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), CellId::from_raw(i as u32)))
            .collect();
        self.net_by_name = self
            .nets
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.clone(), NetId::from_raw(i as u32)))
            .collect();
    }

    fn attach(&mut self, net: NetId, cell: CellId, port: &str, direction: PortDirection) {
        let port_ref = PortRef {
            cell,
            port: port.to_string(),
        };
        let net = &mut self.nets[net.index()];
        match direction {
            PortDirection::Output => net.driver = Some(port_ref),
            PortDirection::Input => net.users.push(port_ref),
        }
    }

    fn detach(&mut self, net: NetId, cell: CellId, port: &str) {
        let net = &mut self.nets[net.index()];
        let is_this = |p: &PortRef| p.cell == cell && p.port == port;
        if net.driver.as_ref().is_some_and(is_this) {
            net.driver = None;
        }
        net.users.retain(|p| !is_this(p));
    }

    fn check_cell(&self, cell: CellId) -> Result<&NetlistCell, HostError> {
        self.cells.get(cell.index()).ok_or(HostError::UnknownCell(cell))
    }

    fn port_direction(&self, cell: CellId, port: &str) -> Result<PortDirection, HostError> {
        let c = self.check_cell(cell)?;
        c.ports
            .get(port)
            .map(|p| p.direction)
            .ok_or_else(|| HostError::UnknownPort {
                cell: c.name.clone(),
                port: port.to_string(),
            })
    }
}

impl Host for Netlist {
    fn cells(&self) -> Vec<CellId> {
        (0..self.cells.len() as u32).map(CellId::from_raw).collect()
    }

    fn bel_names(&self) -> Vec<String> {
        self.bels.clone()
    }

    fn cell_name(&self, cell: CellId) -> &str {
        &self.cell(cell).name
    }

    fn cell_type(&self, cell: CellId) -> &str {
        &self.cell(cell).cell_type
    }

    fn attr(&self, cell: CellId, key: &str) -> Option<&str> {
        self.cell(cell).attrs.get(key).map(String::as_str)
    }

    fn set_attr(&mut self, cell: CellId, key: &str, value: String) {
        self.cell_mut(cell).attrs.insert(key.to_string(), value);
    }

    fn clear_attr(&mut self, cell: CellId, key: &str) {
        self.cell_mut(cell).attrs.remove(key);
    }

    fn param(&self, cell: CellId, key: &str) -> Option<&str> {
        self.cell(cell).params.get(key).map(String::as_str)
    }

    fn port_net(&self, cell: CellId, port: &str) -> Option<NetId> {
        self.cell(cell).ports.get(port).and_then(|p| p.net)
    }

    fn net_name(&self, net: NetId) -> &str {
        &self.net(net).name
    }

    fn net_driver(&self, net: NetId) -> Option<CellId> {
        self.net(net).driver.as_ref().map(|p| p.cell)
    }

    fn net_users(&self, net: NetId) -> Vec<CellId> {
        self.net(net).users.iter().map(|p| p.cell).collect()
    }

    fn place_cell(&mut self, cell: CellId, at: Coordinate) -> Result<(), HostError> {
        self.check_cell(cell)?;
        let attr = self.bel_attr().to_string();
        self.set_attr(cell, &attr, at.to_string());
        Ok(())
    }

    fn disconnect_port(&mut self, cell: CellId, port: &str) -> Result<(), HostError> {
        self.port_direction(cell, port)?;
        let slot = self.cells[cell.index()]
            .ports
            .get_mut(port)
            .and_then(|p| p.net.take());
        if let Some(net) = slot {
            self.detach(net, cell, port);
        }
        Ok(())
    }

    fn connect_port(&mut self, net: &str, cell: CellId, port: &str) -> Result<(), HostError> {
        let direction = self.port_direction(cell, port)?;
        let net_id = self
            .net_id(net)
            .ok_or_else(|| HostError::UnknownNet(net.to_string()))?;
        if let Some(previous) = self.port_net(cell, port) {
            self.detach(previous, cell, port);
        }
        self.attach(net_id, cell, port, direction);
        if let Some(p) = self.cells[cell.index()].ports.get_mut(port) {
            p.net = Some(net_id);
        }
        Ok(())
    }
}
