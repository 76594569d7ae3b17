//! Configuration for the SerDes placement pass.
//!
//! A [`PlacerConfig`] carries the attribute and port names the pass reads off
//! the host netlist, plus the placement priority table and the directional
//! offset list. Every field has a default matching the SerDes macro library,
//! so an empty TOML document yields a working configuration.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, validate_config, DEFAULT_CONFIG_TOML};
pub use types::*;
