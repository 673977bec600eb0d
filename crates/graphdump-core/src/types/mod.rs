//! # Types
//!
//! Provider-agnostic types used throughout the dumper.
//!
//! These types abstract away the introspection backend, allowing the walker to
//! work with concepts like "handle", "type descriptor" and "field record"
//! without knowing which debugger produced them.

pub mod address;
pub mod descriptor;
pub mod handle;
pub mod record;
pub mod stack;

// Re-export all public types
pub use address::Address;
pub use descriptor::{FieldDescriptor, FieldList, KindCategory, TypeDescriptor, TypeKind};
pub use handle::ObjectHandle;
pub use record::{FieldMap, FieldRecord, Value, IGNORED_MARKER};
pub use stack::{BacktraceFrame, FrameFunction, FrameId};
