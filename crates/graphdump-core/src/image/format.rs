//! On-disk layout of a heap image.
//!
//! ```json
//! {
//!     "types": {
//!         "Node":   { "kind": "struct", "fields": [ { "name": "next", "type": "Node *" } ] },
//!         "Node *": { "kind": "pointer", "target": "Node" },
//!         "node_t": { "typedef": "Node" }
//!     },
//!     "symbols": { "head": { "address": "0x1000", "type": "Node" } },
//!     "objects": { "0x1000": { "next": "0x1000" } },
//!     "frames":  [ { "function": "main", "line": 12 } ]
//! }
//! ```
//!
//! Pointer types of the form `T *` may be left out of `types`; they are
//! derived from `T` on demand.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{DumpError, Result};
use crate::types::{Address, TypeKind};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ImageFile
{
    #[serde(default)]
    pub types: IndexMap<String, TypeEntry>,
    #[serde(default)]
    pub symbols: IndexMap<String, SymbolEntry>,
    #[serde(default)]
    pub objects: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub frames: Vec<FrameEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TypeEntry
{
    #[serde(default)]
    pub kind: Option<TypeKind>,
    /// Alias of another type; `kind` and `fields` come from there.
    #[serde(default)]
    pub typedef: Option<String>,
    /// Pointee of a pointer or element type of an array.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FieldEntry
{
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Byte offset; defaults to 8 per preceding field in structs, 0 in unions.
    #[serde(default)]
    pub offset: Option<u64>,
    /// Only reachable through a scripted accessor.
    #[serde(default)]
    pub synthetic: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SymbolEntry
{
    pub address: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FrameEntry
{
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub line: u32,
}

/// Validated image contents.
#[derive(Debug)]
pub(crate) struct ImageData
{
    pub types: IndexMap<String, TypeEntry>,
    pub symbols: IndexMap<String, (Address, String)>,
    pub objects: HashMap<Address, serde_json::Value>,
    pub frames: Vec<FrameEntry>,
}

impl ImageFile
{
    pub fn validate(self) -> Result<ImageData>
    {
        for (name, entry) in &self.types {
            match (&entry.kind, &entry.typedef) {
                (Some(_), Some(_)) => {
                    return Err(DumpError::Image(format!("type `{name}` has both a kind and a typedef")));
                }
                (None, None) => return Err(DumpError::Image(format!("type `{name}` has neither a kind nor a typedef"))),
                _ => {}
            }
        }

        let symbols = self
            .symbols
            .into_iter()
            .map(|(name, symbol)| {
                let address = symbol
                    .address
                    .parse::<Address>()
                    .map_err(|reason| DumpError::Image(format!("symbol `{name}`: {reason}")))?;
                Ok((name, (address, symbol.type_name)))
            })
            .collect::<Result<IndexMap<_, _>>>()?;

        let objects = self
            .objects
            .into_iter()
            .map(|(key, value)| {
                let address =
                    key.parse::<Address>().map_err(|reason| DumpError::Image(format!("object `{key}`: {reason}")))?;
                Ok((address, value))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(ImageData {
            types: self.types,
            symbols,
            objects,
            frames: self.frames,
        })
    }
}

