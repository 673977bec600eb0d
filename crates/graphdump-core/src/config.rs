//! # Dump Configuration
//!
//! Static knobs for a dump, loaded from TOML and then overridden by the
//! environment and the command line (in that order).
//!
//! ```toml
//! ignore_types = ["THD *", "MEM_ROOT", "mysql_mutex_t"]
//! opaque_namespace_markers = ["std::", "__gnu_cxx::"]
//! max_depth = 12
//! error_token = "error:"
//! diagnostics_path = "error.log"
//! ```
//!
//! ## Environment Variables
//!
//! - `GRAPHDUMP_IGNORE_TYPES`: comma-separated type names appended to `ignore_types`

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{DumpError, Result};

/// Environment variable holding extra ignore-listed type names.
pub const IGNORE_TYPES_ENV: &str = "GRAPHDUMP_IGNORE_TYPES";

/// Configuration for one dump.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DumpConfig
{
    /// Declared type names that are never expanded (exact match).
    pub ignore_types: BTreeSet<String>,
    /// An aggregate whose first field name contains one of these is rendered flat.
    pub opaque_namespace_markers: Vec<String>,
    /// Deepest nesting level that is still expanded; `None` means unbounded.
    pub max_depth: Option<usize>,
    /// Substring marking a rendering as failed.
    pub error_token: String,
    /// Where non-fatal per-field failures are logged; `None` keeps them in memory only.
    pub diagnostics_path: Option<PathBuf>,
}

impl Default for DumpConfig
{
    fn default() -> Self
    {
        Self {
            ignore_types: BTreeSet::new(),
            opaque_namespace_markers: vec!["std::".to_string()],
            max_depth: None,
            error_token: "error:".to_string(),
            diagnostics_path: None,
        }
    }
}

impl DumpConfig
{
    /// Parse a TOML document.
    ///
    /// ## Errors
    ///
    /// Returns `DumpError::Config` for malformed TOML, unknown keys, or an
    /// empty `error_token`.
    pub fn from_toml_str(text: &str) -> Result<Self>
    {
        let config: Self = toml::from_str(text).map_err(|err| DumpError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    ///
    /// ## Errors
    ///
    /// Returns `DumpError::Io` if the file cannot be read, otherwise see
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: &Path) -> Result<Self>
    {
        debug!(path = %path.display(), "Loading dump configuration");
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|err| match err {
            DumpError::Config(reason) => DumpError::Config(format!("{}: {reason}", path.display())),
            other => other,
        })
    }

    /// Append ignore-listed types from `GRAPHDUMP_IGNORE_TYPES`.
    #[must_use]
    pub fn with_env_overrides(self) -> Self
    {
        match env::var(IGNORE_TYPES_ENV) {
            Ok(list) => self.with_ignore_list(&list),
            Err(_) => self,
        }
    }

    /// Append the comma-separated type names in `list`.
    #[must_use]
    pub fn with_ignore_list(mut self, list: &str) -> Self
    {
        self.ignore_types
            .extend(list.split(',').map(str::trim).filter(|name| !name.is_empty()).map(str::to_string));
        self
    }

    #[must_use]
    pub fn with_ignored_type(mut self, type_name: impl Into<String>) -> Self
    {
        self.ignore_types.insert(type_name.into());
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self
    {
        self.max_depth = Some(max_depth);
        self
    }

    #[must_use]
    pub fn with_diagnostics_path(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.diagnostics_path = Some(path.into());
        self
    }

    fn validate(&self) -> Result<()>
    {
        if self.error_token.is_empty() {
            return Err(DumpError::Config("error_token must not be empty".to_string()));
        }
        Ok(())
    }
}
