//! # Dump Assembler
//!
//! Top-level entry point: resolves a root expression, walks the graph below
//! it, captures the backtrace and assembles everything into one
//! [`DumpResult`].
//!
//! ## Phases
//!
//! 1. Capture the start timestamp
//! 2. Resolve the root (fatal on failure, before any output exists)
//! 3. Record the root identity, dereference a pointer root once
//! 4. Expand the root's fields
//! 5. Capture the backtrace of the selected frame
//!
//! Writing the artifact is a separate step ([`DumpResult::write_json`]) so a
//! result can also be inspected or serialized in memory.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::backtrace::capture_backtrace;
use crate::config::DumpConfig;
use crate::diagnostics::{DiagnosticEntry, DiagnosticLog};
use crate::error::{DumpError, Result};
use crate::provider::IntrospectionProvider;
use crate::types::{BacktraceFrame, Value};
use crate::walker::{GraphWalker, WalkContext, WalkStats};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const FILE_STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One complete dump, ready to be written
///
/// Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DumpResult
{
    pub timestamp: String,
    pub backtrace: Vec<BacktraceFrame>,
    pub expr: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: Value,
    #[serde(skip)]
    started_at: DateTime<Local>,
}

impl DumpResult
{
    /// When the dump started.
    pub fn started_at(&self) -> DateTime<Local>
    {
        self.started_at
    }

    /// Default artifact name: `<expr with -> and / replaced by .>_<YYYYmmddHHMMSS>.json`.
    pub fn file_name(&self) -> String
    {
        let stem = self.expr.replace("->", ".").replace('/', ".");
        format!("{stem}_{}.json", self.started_at.format(FILE_STAMP_FORMAT))
    }

    /// Maximum nesting depth of the value tree (0 when the root is a leaf).
    pub fn depth(&self) -> usize
    {
        self.value.depth()
    }

    /// Pretty JSON with four-space indentation.
    ///
    /// ## Errors
    ///
    /// Returns `DumpError::Serialize` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>>
    {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        buffer.push(b'\n');
        Ok(buffer)
    }

    /// Write the dump to `path`
    ///
    /// The JSON is rendered in memory and written to a temporary file next
    /// to `path`, which is then renamed into place. A failure leaves no
    /// partial artifact behind.
    ///
    /// ## Errors
    ///
    /// Returns `DumpError::Serialize` or `DumpError::Io`.
    pub fn write_json(&self, path: &Path) -> Result<()>
    {
        let bytes = self.to_json_pretty()?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(&bytes)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|err| DumpError::Io(err.error))?;

        info!(path = %path.display(), bytes = bytes.len(), "Dump written");
        Ok(())
    }
}

/// A dump together with what the walk observed on the way.
#[derive(Debug)]
pub struct DumpRun
{
    pub result: DumpResult,
    pub stats: WalkStats,
    pub diagnostics: Vec<DiagnosticEntry>,
}

/// Runs dumps against one provider
///
/// ## Example
///
/// ```rust
/// use graphdump_core::config::DumpConfig;
/// use graphdump_core::dump::Dumper;
/// use graphdump_core::image::HeapImage;
///
/// let image = HeapImage::from_json_str(
///     r#"{
///         "types": {
///             "int": { "kind": "int" },
///             "Node": { "kind": "struct", "fields": [
///                 { "name": "id", "type": "int" },
///                 { "name": "next", "type": "Node *" }
///             ] },
///             "Node *": { "kind": "pointer", "target": "Node" }
///         },
///         "symbols": { "root": { "address": "0x1000", "type": "Node" } },
///         "objects": {
///             "0x1000": { "id": 1, "next": "0x1000" }
///         }
///     }"#,
/// )?;
///
/// let result = Dumper::new(&image, DumpConfig::default()).dump("root")?;
/// assert_eq!(result.value.fields().unwrap()["id"].value.as_text().as_deref(), Some("1"));
/// assert_eq!(
///     result.value.fields().unwrap()["next"].value.as_text().as_deref(),
///     Some("(back-reference: root)")
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Dumper<'p, P: IntrospectionProvider + ?Sized>
{
    provider: &'p P,
    config: DumpConfig,
}

impl<'p, P: IntrospectionProvider + ?Sized> Dumper<'p, P>
{
    pub fn new(provider: &'p P, config: DumpConfig) -> Self
    {
        Self { provider, config }
    }

    pub fn config(&self) -> &DumpConfig
    {
        &self.config
    }

    /// Dump the graph reachable from `expr`.
    ///
    /// ## Errors
    ///
    /// See [`run`](Self::run).
    pub fn dump(&self, expr: &str) -> Result<DumpResult>
    {
        self.run(expr).map(|run| run.result)
    }

    /// Dump the graph reachable from `expr`, keeping walk statistics and diagnostics
    ///
    /// ## Errors
    ///
    /// - `InvalidExpression`: `expr` is empty
    /// - `RootResolution`: the root cannot be evaluated, typed or dereferenced
    /// - `Io`: the diagnostic log cannot be opened
    pub fn run(&self, expr: &str) -> Result<DumpRun>
    {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(DumpError::InvalidExpression("expression is empty".to_string()));
        }

        let started_at = Local::now();
        let timestamp = started_at.format(TIMESTAMP_FORMAT).to_string();
        info!(expr, "Starting dump");

        let mut diagnostics = match &self.config.diagnostics_path {
            Some(path) => DiagnosticLog::open(path)?,
            None => DiagnosticLog::in_memory(),
        };
        diagnostics.begin(expr, &timestamp);
        let mut ctx = WalkContext::from_config(&self.config, diagnostics);

        let root_error = |source| DumpError::RootResolution {
            expr: expr.to_string(),
            source,
        };
        let root = self.provider.evaluate(expr).map_err(root_error)?;
        let type_name = root.type_name().to_string();
        ctx.visited.record(&root, expr);
        debug!(expr, type_name = %type_name, "Root resolved");

        info!(expr, "Expanding object graph");
        let value = GraphWalker::new(self.provider, &mut ctx)
            .walk_root(expr, &root)
            .map_err(root_error)?;

        let backtrace = capture_backtrace(self.provider, self.provider.selected_frame());

        let WalkContext {
            stats,
            diagnostics,
            visited,
            ..
        } = ctx;
        info!(
            expr,
            identities = visited.len(),
            fields = stats.fields,
            back_references = stats.back_references,
            nulls = stats.nulls,
            ignored = stats.ignored,
            diagnostics = stats.diagnostics,
            elapsed_ms = (Local::now() - started_at).num_milliseconds(),
            "Dump assembled"
        );

        Ok(DumpRun {
            result: DumpResult {
                timestamp,
                backtrace,
                expr: expr.to_string(),
                type_name,
                value,
                started_at,
            },
            stats,
            diagnostics: diagnostics.into_entries(),
        })
    }
}
