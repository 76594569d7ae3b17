//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{PlacerConfig, SubgroupSelector, TargetRule};
use std::collections::HashSet;
use std::path::Path;

/// The built-in configuration spelled out as TOML.
///
/// Loading this document yields the same value as [`PlacerConfig::default`].
pub const DEFAULT_CONFIG_TOML: &str = r#"
[attributes]
group = "SERDES_GRP"
role = "SERDES_ATTR"
bel = "BEL"

[cells]
io_type = "SB_IO"
internal_net_prefix = "$PACKER_"
logic_bel_suffix = "/lc0"
sync_buffer_prefix = "sync_lbuf"

[ports]
io_search = ["I0", "I1", "I2", "I3", "O"]
clock = "CLK"
reset = "SR"
enable = "CEN"
negedge_param = "NEG_CLK"
rewire = ["I0", "I1", "I2", "I3", "CEN"]
buffer_input = "I0"
buffer_output = "O"

[placement]
site_capacity = 8
ungrouped_sentinel = 4294967295
offsets = [
    [0, 1], [-1, 1], [1, 1], [-1, 0], [1, 0], [0, -1], [-1, -1], [1, -1],
    [0, 1], [0, 2], [0, 3], [0, 4], [-1, 1], [1, 1], [-1, 2], [1, 2],
    [-1, 3], [1, 3], [-1, 4], [1, 4], [0, 5], [-1, 5], [1, 5],
]

# OSERDES NegEdge Delay
[[placement.priority]]
kind = 2
target = { rule = "io_site" }

# ISERDES PreMux
[[placement.priority]]
kind = 11
target = { rule = "io_site" }

# ISERDES Shift
[[placement.priority]]
kind = 10
target = { rule = "io_site" }

# ISERDES Fast Capture, next to the shift block of the same path
[[placement.priority]]
kind = 9
target = { rule = "sibling", kind = 10, subgroup = { parity = 4 } }

# OSERDES Shift
[[placement.priority]]
kind = 1
target = { rule = "io_site" }

# OSERDES Capture
[[placement.priority]]
kind = 0
target = { rule = "sibling", kind = 1, subgroup = "same" }

# ISERDES Slow Capture, between both input shift blocks
[[placement.priority]]
kind = 8
target = { rule = "centroid", kind = 10, required = [4], optional = [5] }
"#;

/// Loads and validates a placer configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PlacerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a placer configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<PlacerConfig, ConfigError> {
    let config: PlacerConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks names, table shapes, and that every target rule only depends on
/// block types placed by an earlier tier.
pub fn validate_config(config: &PlacerConfig) -> Result<(), ConfigError> {
    let required = [
        ("attributes.group", &config.attributes.group),
        ("attributes.bel", &config.attributes.bel),
        ("cells.io_type", &config.cells.io_type),
        ("cells.logic_bel_suffix", &config.cells.logic_bel_suffix),
    ];
    for (field, value) in required {
        if value.is_empty() {
            return Err(ConfigError::MissingField(field.to_string()));
        }
    }

    let placement = &config.placement;
    if !(1..=8).contains(&placement.site_capacity) {
        return Err(ConfigError::ValidationError(format!(
            "placement.site_capacity must be within 1..=8, got {}",
            placement.site_capacity
        )));
    }
    if placement.offsets.is_empty() {
        return Err(invalid("placement.offsets must not be empty"));
    }
    if placement.priority.is_empty() {
        return Err(invalid("placement.priority must not be empty"));
    }

    let mut placed = HashSet::new();
    for entry in &placement.priority {
        check_nibble("priority kind", entry.kind)?;
        if let TargetRule::Sibling { subgroup, .. } = &entry.target {
            if let SubgroupSelector::Fixed(sub) | SubgroupSelector::Parity(sub) = subgroup {
                check_nibble("sibling subgroup", *sub)?;
            }
        }
        if let TargetRule::Centroid {
            required, optional, ..
        } = &entry.target
        {
            if required.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "centroid rule for type {:#x} needs at least one required subgroup",
                    entry.kind
                )));
            }
            for sub in required.iter().chain(optional) {
                check_nibble("centroid subgroup", *sub)?;
            }
        }
        if let Some(dependency) = entry.target.dependency() {
            if !placed.contains(&dependency) {
                return Err(ConfigError::PriorityOrder {
                    kind: entry.kind,
                    dependency,
                });
            }
        }
        if !placed.insert(entry.kind) {
            return Err(ConfigError::DuplicateKind(entry.kind));
        }
    }
    Ok(())
}

fn check_nibble(what: &str, value: u8) -> Result<(), ConfigError> {
    if value > 0xf {
        return Err(ConfigError::ValidationError(format!(
            "{what} {value:#x} does not fit in 4 bits"
        )));
    }
    Ok(())
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::ValidationError(msg.to_string())
}
