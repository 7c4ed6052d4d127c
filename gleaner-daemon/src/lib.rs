//! # gleaner-daemon
//!
//! Periodic scheduler for reconciler passes: one pass per tick, passes never
//! overlap, ctrl-c shuts down after the in-flight pass completes.

pub mod error;
pub mod runtime;

pub use error::DaemonError;
pub use runtime::{run, start_blocking};
