//! # gleaner-core
//!
//! Domain types, configuration surface, and the process-wide ledger-path
//! registry shared by the gleaner workspace.

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::{ParserConfig, WatchConfig};
pub use error::ConfigError;
pub use types::{FileIdentity, IdentityKey, KeyMode};
