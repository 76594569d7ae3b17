//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a placer configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required name is empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A priority tier is anchored on a block type no earlier tier places.
    #[error("type {kind:#x} is anchored on type {dependency:#x}, which is not placed before it")]
    PriorityOrder {
        /// Type of the offending tier.
        kind: u8,
        /// Type its target rule depends on.
        dependency: u8,
    },

    /// A block type has more than one priority tier.
    #[error("type {0:#x} appears twice in placement.priority")]
    DuplicateKind(u8),
}
