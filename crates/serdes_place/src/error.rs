//! Fatal errors of the placement pass.
//!
//! Every variant aborts the run; none is retried. Each one carries enough
//! context (cell, group, block, coordinates) to be diagnosed from its message,
//! and maps to a stable [`DiagnosticCode`] for reporting through a
//! [`DiagnosticSink`](serdes_diagnostics::DiagnosticSink).

use crate::block::BlockRef;
use crate::codec::{Coordinate, DecodeError, HierarchicalId};
use crate::host::HostError;
use serdes_config::ConfigError;
use serdes_diagnostics::{Category, Diagnostic, DiagnosticCode};

/// Result alias for the pass.
pub type PlaceResult<T> = Result<T, PlaceError>;

/// A fatal condition that stops the pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaceError {
    /// An attribute value could not be decoded.
    #[error("cell '{cell}': malformed {attribute} attribute '{value}': {reason}")]
    MalformedAttribute {
        /// Cell carrying the attribute.
        cell: String,
        /// Attribute key.
        attribute: String,
        /// The raw value.
        value: String,
        /// What was wrong with it.
        reason: DecodeError,
    },

    /// A required attribute is absent.
    #[error("cell '{cell}' has no {attribute} attribute")]
    MissingAttribute {
        /// Cell lacking the attribute.
        cell: String,
        /// Attribute key.
        attribute: String,
    },

    /// A port the pass needs is unconnected, or its net has no driver.
    #[error("cell '{cell}': port {port} is not connected to a driven net")]
    UnconnectedPort {
        /// Cell name.
        cell: String,
        /// Port name.
        port: String,
    },

    /// Two cells claim the same slot of one block.
    #[error("cell '{cell}' duplicates slot {id}")]
    DuplicateSlot {
        /// The contested position.
        id: HierarchicalId,
        /// The second cell claiming it.
        cell: String,
    },

    /// A block's populated slots do not form a prefix.
    #[error("block {block} has a gap: {len} cells but slot {gap} is empty")]
    IncompleteBlock {
        /// The block.
        block: BlockRef,
        /// Number of populated slots.
        len: usize,
        /// First empty slot before a populated one.
        gap: usize,
    },

    /// Blocks of one group are wired to different I/O pads.
    #[error("incompatible I/O sites in SerDes group {group}: {first} vs {second}")]
    ConflictingIoSite {
        /// The group.
        group: u8,
        /// Site found first.
        first: Coordinate,
        /// Conflicting site.
        second: Coordinate,
    },

    /// A group has no block connected to an I/O pad.
    #[error("SerDes group {group} is not connected to any I/O site")]
    MissingIoSite {
        /// The group.
        group: u8,
    },

    /// No offset around the target yields a valid site.
    #[error("unable to place {block} near {target}")]
    PlacementExhausted {
        /// The block.
        block: BlockRef,
        /// The search anchor.
        target: Coordinate,
    },

    /// A target rule names a block that is absent or not yet placed.
    #[error("target of {block} depends on {dependency}, which is not placed")]
    UnresolvedTarget {
        /// The block being placed.
        block: BlockRef,
        /// The block its target depends on.
        dependency: BlockRef,
    },

    /// A commit was attempted on an unknown or full site.
    #[error("site {site} cannot take block {block}")]
    SiteOverflow {
        /// Site position.
        site: Coordinate,
        /// The block.
        block: BlockRef,
    },

    /// The host rejected a mutation.
    #[error("host rejected update: {0}")]
    Host(#[from] HostError),

    /// The placer configuration failed validation.
    #[error("invalid placer configuration: {0}")]
    InvalidConfig(String),

    /// A cell's slot index does not fit a block.
    #[error("cell '{cell}' claims slot {id}, past the last slot of a block")]
    SlotOutOfRange {
        /// The claimed position.
        id: HierarchicalId,
        /// The cell.
        cell: String,
    },
}

impl From<ConfigError> for PlaceError {
    fn from(err: ConfigError) -> Self {
        PlaceError::InvalidConfig(err.to_string())
    }
}

impl PlaceError {
    /// The stable diagnostic code of this error kind.
    pub fn code(&self) -> DiagnosticCode {
        let number = match self {
            PlaceError::MalformedAttribute { .. } => 301,
            PlaceError::MissingAttribute { .. } => 302,
            PlaceError::UnconnectedPort { .. } => 303,
            PlaceError::DuplicateSlot { .. } => 304,
            PlaceError::IncompleteBlock { .. } => 305,
            PlaceError::ConflictingIoSite { .. } => 306,
            PlaceError::MissingIoSite { .. } => 307,
            PlaceError::PlacementExhausted { .. } => 308,
            PlaceError::UnresolvedTarget { .. } => 309,
            PlaceError::SiteOverflow { .. } => 310,
            PlaceError::Host(_) => 311,
            PlaceError::InvalidConfig(_) => 312,
            PlaceError::SlotOutOfRange { .. } => 313,
        };
        DiagnosticCode::new(Category::Error, number)
    }

    /// Converts the error into an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            PlaceError::UnresolvedTarget { .. } | PlaceError::SiteOverflow { .. } => diag
                .with_note("placement tiers are ordered so that this cannot happen")
                .with_help("check the priority table of the placer configuration"),
            PlaceError::InvalidConfig(_) => {
                diag.with_help("configurations built in code must pass `validate_config`")
            }
            PlaceError::PlacementExhausted { .. } => {
                diag.with_help("all search offsets hit missing, full or incompatible sites")
            }
            _ => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BlockType;
    use serdes_diagnostics::Severity;

    fn block() -> BlockRef {
        BlockRef::new(1, 4, BlockType::INPUT_SHIFT)
    }

    #[test]
    fn messages_carry_context() {
        let err = PlaceError::ConflictingIoSite {
            group: 2,
            first: Coordinate::new(0, 5, 0),
            second: Coordinate::new(0, 6, 1),
        };
        assert_eq!(
            err.to_string(),
            "incompatible I/O sites in SerDes group 2: X0/Y5/lc0 vs X0/Y6/lc1"
        );

        let err = PlaceError::PlacementExhausted {
            block: block(),
            target: Coordinate::new(0, 5, 0),
        };
        assert!(err.to_string().contains("ISERDES Shift"));
        assert!(err.to_string().contains("X0/Y5/lc0"));
    }

    #[test]
    fn malformed_attribute_message() {
        let err = PlaceError::MalformedAttribute {
            cell: "lc_3".into(),
            attribute: "BEL".into(),
            value: "X3/Y7".into(),
            reason: DecodeError::TooFewFields(2),
        };
        assert_eq!(
            err.to_string(),
            "cell 'lc_3': malformed BEL attribute 'X3/Y7': expected 3 integer fields, found 2"
        );
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            PlaceError::MissingIoSite { group: 0 },
            PlaceError::UnresolvedTarget {
                block: block(),
                dependency: block(),
            },
            PlaceError::Host(HostError::UnknownNet("x".into())),
            PlaceError::InvalidConfig("x".into()),
        ];
        let codes: Vec<String> = errors.iter().map(|e| e.code().to_string()).collect();
        assert_eq!(codes, vec!["E307", "E309", "E311", "E312"]);
    }

    #[test]
    fn config_error_converts() {
        let err = PlaceError::from(ConfigError::DuplicateKind(0xa));
        assert_eq!(
            err.to_string(),
            "invalid placer configuration: type 0xa appears twice in placement.priority"
        );
    }

    #[test]
    fn to_diagnostic_is_error() {
        let diag = PlaceError::UnresolvedTarget {
            block: block(),
            dependency: block(),
        }
        .to_diagnostic();
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code.to_string(), "E309");
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.len(), 1);
    }
}
