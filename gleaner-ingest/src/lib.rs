//! # gleaner-ingest
//!
//! Poll-based process-once file ingestion: discover files matching
//! configured patterns, diff them against the durable [`Ledger`], parse and
//! emit each new file exactly once, and record that it was handled.
//!
//! Call [`Reconciler::run_pass`] for one discover → diff → untrack → process
//! cycle; the daemon crate drives it on a periodic schedule.

pub mod archive;
pub mod discovery;
pub mod emit;
pub mod error;
pub mod ledger;
pub mod parse;
pub mod reconciler;

pub use discovery::Discovery;
pub use emit::{Emitter, JsonLineEmitter, MemoryEmitter};
pub use error::IngestError;
pub use ledger::Ledger;
pub use parse::{parser_from_config, CsvParser, Parser, Record};
pub use reconciler::{PassSummary, Reconciler};
