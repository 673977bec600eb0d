//! # Diagnostic Side-Channel
//!
//! Append-only text log of non-fatal per-field failures. It is independent of
//! the dump artifact: a field that lands here is simply left out of the dump.
//!
//! Entries are kept in memory and, when a sink is attached, written out as
//! they arrive. The sink is flushed when the log is dropped, so it is closed
//! on every exit path of a dump, including a failed root resolution.
//!
//! ```text
//! ---(STATE)---
//!     field_expr = root.cache->table
//!     classification = pointer
//! Exception: Internal introspection error: unknown type `TABLE`
//! -------------
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::warn;

use crate::classify::Classification;
use crate::error::{ProviderError, Result};

/// One logged failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry
{
    pub field_expr: String,
    /// `None` when the failure happened before the type was known.
    pub classification: Option<Classification>,
    pub error: ProviderError,
}

/// Append-only failure log owned by one dump.
pub struct DiagnosticLog
{
    entries: Vec<DiagnosticEntry>,
    sink: Option<BufWriter<Box<dyn Write>>>,
}

impl DiagnosticLog
{
    /// Log kept in memory only.
    pub fn in_memory() -> Self
    {
        Self {
            entries: Vec::new(),
            sink: None,
        }
    }

    /// Log appending to the file at `path` (created if missing).
    ///
    /// ## Errors
    ///
    /// Returns `DumpError::Io` if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self>
    {
        let file: File = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::to_writer(file))
    }

    /// Log writing to an arbitrary sink.
    pub fn to_writer(writer: impl Write + 'static) -> Self
    {
        Self {
            entries: Vec::new(),
            sink: Some(BufWriter::new(Box::new(writer))),
        }
    }

    /// Write a header line separating dumps in a shared log file.
    pub fn begin(&mut self, root_expr: &str, timestamp: &str)
    {
        let line = format!("=== dump of `{root_expr}` started {timestamp} ===\n");
        self.write(&line);
    }

    pub fn record(&mut self, entry: DiagnosticEntry)
    {
        warn!(
            field_expr = %entry.field_expr,
            classification = ?entry.classification,
            error = %entry.error,
            "Field skipped"
        );

        let classification = entry
            .classification
            .map_or_else(|| "unknown".to_string(), |classification| classification.to_string());
        let block = format!(
            "---(STATE)---\n    field_expr = {}\n    classification = {}\nException: {}\n-------------\n",
            entry.field_expr, classification, entry.error
        );
        self.write(&block);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[DiagnosticEntry]
    {
        &self.entries
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    /// Give up the in-memory entries, flushing the sink.
    pub fn into_entries(mut self) -> Vec<DiagnosticEntry>
    {
        self.flush();
        std::mem::take(&mut self.entries)
    }

    fn write(&mut self, text: &str)
    {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(err) = sink.write_all(text.as_bytes()) {
            // Losing the side channel must not end the dump.
            warn!(error = %err, "Diagnostic log write failed, continuing in memory");
            self.sink = None;
        }
    }

    fn flush(&mut self)
    {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(err) = sink.flush() {
                warn!(error = %err, "Diagnostic log flush failed");
            }
        }
    }
}

impl Drop for DiagnosticLog
{
    fn drop(&mut self)
    {
        self.flush();
    }
}

impl std::fmt::Debug for DiagnosticLog
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("DiagnosticLog")
            .field("entries", &self.entries)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
