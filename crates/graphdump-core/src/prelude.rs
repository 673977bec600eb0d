//! Common module for library exports

pub use crate::classify::{Classification, OpaqueReason, TypeClassifier};
pub use crate::config::DumpConfig;
pub use crate::dump::{DumpResult, Dumper};
pub use crate::error::{DumpError, ProviderError, ProviderResult, Result};
pub use crate::image::HeapImage;
pub use crate::provider::IntrospectionProvider;
pub use crate::types::{Address, FieldRecord, ObjectHandle, TypeDescriptor, TypeKind, Value};
