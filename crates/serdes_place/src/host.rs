//! The capability interface the pass uses to reach the host netlist.
//!
//! The pass never assumes a global database handle: every stage receives a
//! `&dyn Host` (or `&mut dyn Host` when it commits) from the caller. The trait
//! exposes exactly what the pass needs: attribute and parameter access, port
//! and net connectivity, cell types, BEL enumeration, and the two mutations
//! (placing a cell, repointing a port).

use crate::codec::Coordinate;
use crate::ids::{CellId, NetId};

/// Errors reported by a host when a mutation cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The cell handle does not name a cell.
    #[error("unknown cell {0}")]
    UnknownCell(CellId),

    /// No net with this name exists.
    #[error("unknown net '{0}'")]
    UnknownNet(String),

    /// The cell has no port with this name.
    #[error("cell '{cell}' has no port '{port}'")]
    UnknownPort {
        /// Name of the cell.
        cell: String,
        /// Name of the missing port.
        port: String,
    },
}

/// Read and mutation access to the host's cells, nets and BELs.
pub trait Host {
    /// Returns every cell in the design, in the host's iteration order.
    fn cells(&self) -> Vec<CellId>;

    /// Returns the name of every BEL in the fabric.
    fn bel_names(&self) -> Vec<String>;

    /// Returns the instance name of a cell.
    fn cell_name(&self, cell: CellId) -> &str;

    /// Returns the type of a cell (e.g. `"ICESTORM_LC"`, `"SB_IO"`).
    fn cell_type(&self, cell: CellId) -> &str;

    /// Returns the value of a cell attribute.
    fn attr(&self, cell: CellId, key: &str) -> Option<&str>;

    /// Sets a cell attribute, replacing any previous value.
    fn set_attr(&mut self, cell: CellId, key: &str, value: String);

    /// Removes a cell attribute if present.
    fn clear_attr(&mut self, cell: CellId, key: &str);

    /// Returns the value of a cell parameter.
    fn param(&self, cell: CellId, key: &str) -> Option<&str>;

    /// Returns the net connected to a port, or `None` if the port is
    /// unconnected or does not exist.
    fn port_net(&self, cell: CellId, port: &str) -> Option<NetId>;

    /// Returns the name of a net.
    fn net_name(&self, net: NetId) -> &str;

    /// Returns the cell driving a net.
    fn net_driver(&self, net: NetId) -> Option<CellId>;

    /// Returns the cells consuming a net, in connection order.
    fn net_users(&self, net: NetId) -> Vec<CellId>;

    /// Commits a cell to a physical location.
    fn place_cell(&mut self, cell: CellId, at: Coordinate) -> Result<(), HostError>;

    /// Detaches a port from whatever net it is connected to.
    fn disconnect_port(&mut self, cell: CellId, port: &str) -> Result<(), HostError>;

    /// Attaches a port to the named net.
    fn connect_port(&mut self, net: &str, cell: CellId, port: &str) -> Result<(), HostError>;
}
