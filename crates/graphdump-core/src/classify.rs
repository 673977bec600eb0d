//! # Type Classifier
//!
//! Decides, per type descriptor, whether a value is printed, followed,
//! expanded, or rendered as an opaque string.
//!
//! | Input                                         | Classification          |
//! |-----------------------------------------------|-------------------------|
//! | declared name on the ignore list              | `Opaque(Ignored)`       |
//! | int, float, char, bool, enum, array, ...      | `PrintableScalar`       |
//! | pointer, reference, member pointer            | `Pointer`               |
//! | struct/union with no fields                   | `Opaque(Empty)`         |
//! | struct/union matched by the opaque predicate  | `Opaque(Internal)`      |
//! | struct/union with fields                      | `ExpandableAggregate`   |
//! | void, error, unknown                          | `Opaque(Unsupported)`   |
//!
//! The "internal representation" check is a pluggable [`OpaquePredicate`] so
//! the first-field-name heuristic can be swapped for an explicit table
//! without touching the walker.

use std::collections::BTreeSet;
use std::fmt;

use crate::config::DumpConfig;
use crate::types::{KindCategory, TypeDescriptor};

/// Why a value is rendered as text instead of being expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpaqueReason
{
    /// Declared type is on the ignore list.
    Ignored,
    /// Aggregate without fields.
    Empty,
    /// Aggregate judged an internal library representation.
    Internal,
    /// Kind the dumper has no rendering rule for.
    Unsupported,
}

/// Outcome of [`TypeClassifier::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification
{
    PrintableScalar,
    Pointer,
    ExpandableAggregate,
    Opaque(OpaqueReason),
}

impl fmt::Display for Classification
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Classification::PrintableScalar => write!(f, "printable-scalar"),
            Classification::Pointer => write!(f, "pointer"),
            Classification::ExpandableAggregate => write!(f, "expandable-aggregate"),
            Classification::Opaque(OpaqueReason::Ignored) => write!(f, "opaque (ignored)"),
            Classification::Opaque(OpaqueReason::Empty) => write!(f, "opaque (empty)"),
            Classification::Opaque(OpaqueReason::Internal) => write!(f, "opaque (internal)"),
            Classification::Opaque(OpaqueReason::Unsupported) => write!(f, "opaque (unsupported)"),
        }
    }
}

/// Decides whether a non-empty aggregate should be rendered flat.
pub trait OpaquePredicate
{
    fn is_opaque(&self, descriptor: &TypeDescriptor) -> bool;
}

/// Flags aggregates whose first declared field name contains a namespace marker
///
/// Standard library containers typically start with a base-class member
/// named after an internal type (`std::_Vector_base<...>`); their flat
/// rendering is far more useful than their implementation fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceMarkers
{
    markers: Vec<String>,
}

impl NamespaceMarkers
{
    pub fn new(markers: impl IntoIterator<Item = impl Into<String>>) -> Self
    {
        Self {
            markers: markers.into_iter().map(Into::into).filter(|m: &String| !m.is_empty()).collect(),
        }
    }
}

impl OpaquePredicate for NamespaceMarkers
{
    fn is_opaque(&self, descriptor: &TypeDescriptor) -> bool
    {
        descriptor
            .fields
            .first()
            .is_some_and(|field| self.markers.iter().any(|marker| field.name.contains(marker.as_str())))
    }
}

/// Maps type descriptors onto [`Classification`]s.
pub struct TypeClassifier
{
    ignored: BTreeSet<String>,
    predicate: Box<dyn OpaquePredicate>,
}

impl TypeClassifier
{
    pub fn new(ignored: BTreeSet<String>, predicate: Box<dyn OpaquePredicate>) -> Self
    {
        Self { ignored, predicate }
    }

    /// Ignore list and namespace markers taken from `config`.
    pub fn from_config(config: &DumpConfig) -> Self
    {
        Self::new(
            config.ignore_types.clone(),
            Box::new(NamespaceMarkers::new(config.opaque_namespace_markers.iter().cloned())),
        )
    }

    /// Exact match of a declared type name against the ignore list.
    pub fn is_ignored(&self, type_name: &str) -> bool
    {
        self.ignored.contains(type_name)
    }

    pub fn classify(&self, descriptor: &TypeDescriptor) -> Classification
    {
        if self.is_ignored(&descriptor.name) {
            return Classification::Opaque(OpaqueReason::Ignored);
        }

        match descriptor.category() {
            KindCategory::Scalar => Classification::PrintableScalar,
            KindCategory::Pointer => Classification::Pointer,
            KindCategory::Aggregate if descriptor.fields.is_empty() => Classification::Opaque(OpaqueReason::Empty),
            KindCategory::Aggregate if self.predicate.is_opaque(descriptor) => {
                Classification::Opaque(OpaqueReason::Internal)
            }
            KindCategory::Aggregate => Classification::ExpandableAggregate,
            KindCategory::Other => Classification::Opaque(OpaqueReason::Unsupported),
        }
    }
}

impl Default for TypeClassifier
{
    fn default() -> Self
    {
        Self::from_config(&DumpConfig::default())
    }
}

impl fmt::Debug for TypeClassifier
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("TypeClassifier").field("ignored", &self.ignored).finish_non_exhaustive()
    }
}
