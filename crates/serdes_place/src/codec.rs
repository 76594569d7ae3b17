//! Decoding of the identities the packer encodes into cell attributes.
//!
//! Three values come off the host as text or packed integers: fabric
//! locations ([`Coordinate`]), the position of a cell inside a SerDes macro
//! ([`HierarchicalId`]), and the clock/reset/enable fingerprint of a logic
//! cell ([`ControlGroup`]). Everything downstream of collection works only on
//! these typed values.

use crate::host::Host;
use crate::ids::CellId;
use serde::{Deserialize, Serialize};
use serdes_config::PortNames;
use std::fmt;

/// Why an attribute value could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A coordinate needs three `/`-separated integer fields.
    #[error("expected 3 integer fields, found {0}")]
    TooFewFields(usize),

    /// A coordinate field holds no parseable integer.
    #[error("field '{0}' is not an integer")]
    BadField(String),

    /// A packed id is not a binary digit string.
    #[error("not a binary number")]
    NotBinary,

    /// A packed id does not fit in 16 bits.
    #[error("value {0:#x} does not fit in 16 bits")]
    TooWide(u32),
}

/// A fabric location. `z` is the slot inside the site at `(x, y)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Coordinate {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Slot within the site.
    pub z: i32,
}

impl Coordinate {
    /// Creates a coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Decodes a BEL-style location such as `"X3/Y7/lc2"` or `"3/-1/0"`.
    ///
    /// The text is split on `/`; in each of the first three fields every
    /// character other than an ASCII digit or `-` is dropped and the rest is
    /// parsed as an integer.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let fields: Vec<&str> = text.splitn(4, '/').collect();
        if fields.len() < 3 {
            return Err(DecodeError::TooFewFields(fields.len()));
        }
        let mut values = [0i32; 3];
        for (value, field) in values.iter_mut().zip(&fields) {
            let digits: String = field
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '-')
                .collect();
            *value = digits
                .parse()
                .map_err(|_| DecodeError::BadField(field.to_string()))?;
        }
        Ok(Self::new(values[0], values[1], values[2]))
    }

    /// Manhattan distance in the `(x, y)` plane; `z` is ignored.
    pub fn distance(self, other: Coordinate) -> u32 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.y.abs_diff(other.y))
    }

    /// The same `(x, y)` position at slot 0.
    pub fn site(self) -> Coordinate {
        Coordinate::new(self.x, self.y, 0)
    }

    /// Offsets the `(x, y)` position, landing on slot 0. Saturates at the
    /// `i32` bounds; no fabric has a site there.
    pub fn offset(self, dx: i32, dy: i32) -> Coordinate {
        Coordinate::new(self.x.saturating_add(dx), self.y.saturating_add(dy), 0)
    }

    /// The same site with the slot index advanced by `slots`.
    pub fn with_slot_offset(self, slots: usize) -> Coordinate {
        Coordinate::new(self.x, self.y, self.z + slots as i32)
    }

    /// Rounded mean of the `(x, y)` positions at slot 0, or `None` for an
    /// empty slice. Halves round to even.
    pub fn centroid(points: &[Coordinate]) -> Option<Coordinate> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let sx: i64 = points.iter().map(|p| i64::from(p.x)).sum();
        let sy: i64 = points.iter().map(|p| i64::from(p.y)).sum();
        let x = (sx as f64 / n).round_ties_even() as i32;
        let y = (sy as f64 / n).round_ties_even() as i32;
        Some(Coordinate::new(x, y, 0))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X{}/Y{}/lc{}", self.x, self.y, self.z)
    }
}

/// The functional kind of a SerDes block, a 4-bit value.
///
/// Unknown values are carried as-is; [`BlockType::name`] only knows the
/// kinds of the macro library.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct BlockType(u8);

impl BlockType {
    /// Output capture register.
    pub const OUTPUT_CAPTURE: BlockType = BlockType(0x0);
    /// Output shift register.
    pub const OUTPUT_SHIFT: BlockType = BlockType(0x1);
    /// Output negative-edge delay register.
    pub const OUTPUT_NEGEDGE_DELAY: BlockType = BlockType(0x2);
    /// Input capture register in the slow clock domain.
    pub const INPUT_SLOW_CAPTURE: BlockType = BlockType(0x8);
    /// Input capture register in the fast clock domain.
    pub const INPUT_FAST_CAPTURE: BlockType = BlockType(0x9);
    /// Input shift register.
    pub const INPUT_SHIFT: BlockType = BlockType(0xa);
    /// Input pre-multiplexer.
    pub const INPUT_PREMUX: BlockType = BlockType(0xb);

    /// Wraps a raw type value.
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw type value.
    pub const fn as_raw(self) -> u8 {
        self.0
    }

    /// The library name of a known kind.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::OUTPUT_CAPTURE => "OSERDES Capture",
            Self::OUTPUT_SHIFT => "OSERDES Shift",
            Self::OUTPUT_NEGEDGE_DELAY => "OSERDES NegEdge Delay",
            Self::INPUT_SLOW_CAPTURE => "ISERDES Slow Capture",
            Self::INPUT_FAST_CAPTURE => "ISERDES Fast Capture",
            Self::INPUT_SHIFT => "ISERDES Shift",
            Self::INPUT_PREMUX => "ISERDES PreMux",
            _ => return None,
        })
    }

    /// Which half of the macro a known kind belongs to.
    pub fn family(self) -> Option<PathFamily> {
        match self.0 {
            0x0..=0x2 => Some(PathFamily::Output),
            0x8..=0xb => Some(PathFamily::Input),
            _ => None,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x} {}", self.0, self.name().unwrap_or("unknown"))
    }
}

/// The two functional halves of a SerDes macro.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PathFamily {
    /// Serializer towards the pad.
    Output,
    /// Deserializer from the pad.
    Input,
}

/// Position of one logic cell inside a SerDes macro.
///
/// Packed layout: `[15:12]` group, `[11:8]` subgroup, `[7:4]` type,
/// `[2:0]` slot; bit 3 is unused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct HierarchicalId {
    /// SerDes instance.
    pub group: u8,
    /// Data path within the instance.
    pub subgroup: u8,
    /// Block kind.
    pub kind: BlockType,
    /// Cell index within the block.
    pub slot: u8,
}

impl HierarchicalId {
    /// Extracts the bit fields of a packed id.
    pub fn decode(packed: u16) -> Self {
        Self {
            group: (packed >> 12) as u8 & 0xf,
            subgroup: (packed >> 8) as u8 & 0xf,
            kind: BlockType::from_raw((packed >> 4) as u8 & 0xf),
            slot: packed as u8 & 0x7,
        }
    }

    /// Reassembles the packed form, with bit 3 clear.
    pub fn encode(self) -> u16 {
        (u16::from(self.group & 0xf) << 12)
            | (u16::from(self.subgroup & 0xf) << 8)
            | (u16::from(self.kind.as_raw() & 0xf) << 4)
            | u16::from(self.slot & 0x7)
    }

    /// Parses the binary digit string the packer stores in the group
    /// attribute. Returns `Ok(None)` for `sentinel`, which marks a cell that
    /// belongs to no group.
    pub fn parse_attr(text: &str, sentinel: u32) -> Result<Option<Self>, DecodeError> {
        let value = u32::from_str_radix(text.trim(), 2).map_err(|_| DecodeError::NotBinary)?;
        if value == sentinel {
            return Ok(None);
        }
        let packed = u16::try_from(value).map_err(|_| DecodeError::TooWide(value))?;
        Ok(Some(Self::decode(packed)))
    }
}

impl fmt::Display for HierarchicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{:x}/{:x}/{}",
            self.group,
            self.subgroup,
            self.kind.as_raw(),
            self.slot
        )
    }
}

/// Clock, reset and enable nets plus clock polarity of a logic cell.
///
/// Blocks may share a site only if their control groups are equal.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct ControlGroup {
    /// Clock net name.
    pub clock: Option<String>,
    /// Set/reset net name.
    pub reset: Option<String>,
    /// Clock enable net name.
    pub enable: Option<String>,
    /// Whether the cell clocks on the falling edge.
    pub negedge: bool,
}

impl ControlGroup {
    /// Reads the fingerprint off `cell`.
    pub fn from_cell(host: &dyn Host, cell: CellId, ports: &PortNames) -> Self {
        let net_name = |port: &str| host.port_net(cell, port).map(|n| host.net_name(n).to_string());
        Self {
            clock: net_name(&ports.clock),
            reset: net_name(&ports.reset),
            enable: net_name(&ports.enable),
            negedge: host.param(cell, &ports.negedge_param) == Some("1"),
        }
    }

    /// Whether two fingerprints allow sharing a site.
    pub fn compatible(&self, other: &ControlGroup) -> bool {
        self == other
    }
}
