//! Parser collaborator: turns an open byte stream into records.
//!
//! A parser failure is fatal to the file being processed, never to the
//! whole pass; the file stays untracked and is retried on the next tick.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;

use gleaner_core::ParserConfig;

use crate::error::IngestError;

/// A parsed record: flat field map, JSON-typed values.
pub type Record = serde_json::Map<String, Value>;

/// Sink invoked once per parsed record.
pub type RecordSink<'a> =
    dyn FnMut(Option<DateTime<Utc>>, Record) -> Result<(), IngestError> + 'a;

/// Turns a file's byte stream into a sequence of timestamped records.
pub trait Parser: Send {
    fn parse(
        &self,
        path: &Path,
        input: &mut dyn Read,
        sink: &mut RecordSink<'_>,
    ) -> Result<(), IngestError>;
}

/// Build the parser named by the config section.
pub fn parser_from_config(config: &ParserConfig) -> Box<dyn Parser> {
    match config {
        ParserConfig::Csv {
            keys,
            delimiter,
            has_header,
        } => Box::new(CsvParser::new(keys.clone(), *delimiter, *has_header)),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Whole-file CSV parser.
///
/// With a header row, field names come from the header. Without one, they
/// come from the configured `keys`, falling back to 1-based column indices.
pub struct CsvParser {
    keys: Vec<String>,
    delimiter: char,
    has_header: bool,
}

impl CsvParser {
    pub fn new(keys: Vec<String>, delimiter: char, has_header: bool) -> Self {
        Self {
            keys,
            delimiter,
            has_header,
        }
    }

    fn row_headers(&self, width: usize) -> Vec<String> {
        if self.keys.is_empty() {
            (1..=width).map(|i| i.to_string()).collect()
        } else {
            self.keys.clone()
        }
    }
}

impl Parser for CsvParser {
    fn parse(
        &self,
        _path: &Path,
        input: &mut dyn Read,
        sink: &mut RecordSink<'_>,
    ) -> Result<(), IngestError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter as u8)
            .has_headers(self.has_header)
            .flexible(true)
            .from_reader(input);

        let headers: Vec<String> = if self.has_header {
            reader.headers()?.iter().map(str::to_string).collect()
        } else {
            vec![]
        };

        for row in reader.records() {
            let row = row?;
            let names = if self.has_header {
                headers.clone()
            } else {
                self.row_headers(row.len())
            };

            let mut record = Record::new();
            for (name, field) in names.iter().zip(row.iter()) {
                record.insert(name.clone(), Value::String(field.to_string()));
            }
            sink(None, record)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
