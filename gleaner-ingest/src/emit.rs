//! Emitter collaborator: receives (tag, timestamp, record) tuples.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::{io_err, IngestError};
use crate::parse::Record;

/// Downstream for parsed records. Assumed synchronous and non-blocking.
pub trait Emitter: Send {
    fn emit(
        &mut self,
        tag: &str,
        time: Option<DateTime<Utc>>,
        record: &Record,
    ) -> Result<(), IngestError>;
}

/// Writes each event as one JSON line: `{"tag","time","record"}`.
pub struct JsonLineEmitter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonLineEmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl JsonLineEmitter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> Emitter for JsonLineEmitter<W> {
    fn emit(
        &mut self,
        tag: &str,
        time: Option<DateTime<Utc>>,
        record: &Record,
    ) -> Result<(), IngestError> {
        let event = json!({
            "tag": tag,
            "time": time.unwrap_or_else(Utc::now).to_rfc3339(),
            "record": record,
        });
        let line = serde_json::to_string(&event)?;
        writeln!(self.out, "{line}").map_err(|e| io_err("emitter output", e))?;
        Ok(())
    }
}

/// Collects events in memory; the emitter used by tests.
#[derive(Debug, Default)]
pub struct MemoryEmitter {
    pub events: Vec<(String, Record)>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Emitter for MemoryEmitter {
    fn emit(
        &mut self,
        tag: &str,
        _time: Option<DateTime<Utc>>,
        record: &Record,
    ) -> Result<(), IngestError> {
        self.events.push((tag.to_string(), record.clone()));
        Ok(())
    }
}
