//! # graphdump-core
//!
//! Cycle-safe object graph walking and JSON dumping for paused processes.
//!
//! Given a root expression into the memory of a paused process, this crate
//! expands every reachable field into a tree of [`FieldRecord`]s, replaces
//! already-serialized nodes with back-references, and keeps going when
//! individual fields cannot be read.
//!
//! ## Layers
//!
//! - [`provider`]: the read-only introspection interface a debugger backend implements
//! - [`image`]: a provider over a serialized heap image
//! - [`classify`], [`visited`], [`walker`]: the recursive engine
//! - [`backtrace`], [`dump`]: dump assembly and output
//! - [`config`], [`diagnostics`], [`error`]: the plumbing around a dump
//!
//! ## Example
//!
//! ```rust
//! use graphdump_core::{DumpConfig, Dumper, HeapImage};
//!
//! let image = HeapImage::from_json_str(
//!     r#"{
//!         "types": {
//!             "int": { "kind": "int" },
//!             "Point": { "kind": "struct", "fields": [
//!                 { "name": "x", "type": "int" },
//!                 { "name": "y", "type": "int" }
//!             ] }
//!         },
//!         "symbols": { "origin": { "address": "0x100", "type": "Point" } },
//!         "objects": { "0x100": { "x": 0, "y": 0 } }
//!     }"#,
//! )?;
//!
//! let result = Dumper::new(&image, DumpConfig::default()).dump("origin")?;
//! assert_eq!(result.type_name, "Point");
//! assert_eq!(result.depth(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backtrace;
pub mod classify;
pub mod config;
pub mod demangle;
pub mod diagnostics;
pub mod dump;
pub mod error;
pub mod image;
pub mod prelude;
pub mod provider;
pub mod types;
pub mod visited;
pub mod walker;

// Re-export commonly used types
pub use config::DumpConfig;
pub use dump::{DumpResult, DumpRun, Dumper};
pub use error::{DumpError, ProviderError, ProviderResult, Result};
pub use image::HeapImage;
pub use provider::IntrospectionProvider;
pub use types::{FieldRecord, ObjectHandle, TypeDescriptor, Value};
