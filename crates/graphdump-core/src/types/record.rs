//! Field records: the nodes of a dump's value tree.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Sentinel written in place of an ignore-listed value.
pub const IGNORED_MARKER: &str = "(ignored)";

/// Field name to record, in declaration order.
pub type FieldMap = IndexMap<String, FieldRecord>;

/// The value slot of a [`FieldRecord`]
///
/// Serializes to plain JSON: `null`, a string, or an object of nested records.
#[derive(Debug, Clone, PartialEq)]
pub enum Value
{
    /// Unreadable, empty aggregate, or rendering carrying an error token.
    Null,
    /// Complete textual rendering of a scalar or pointer.
    Scalar(String),
    /// Flat textual stand-in for something not expanded field by field.
    Opaque(String),
    /// The node was already serialized; holds its first-seen expression path.
    BackReference(String),
    /// The declared type is on the ignore list.
    Ignored,
    /// Expansion stopped at the configured maximum depth.
    Truncated(usize),
    /// Expanded aggregate.
    Fields(FieldMap),
}

impl Value
{
    pub const fn is_null(&self) -> bool
    {
        matches!(self, Value::Null)
    }

    /// Nested records, if this is an expanded aggregate.
    pub fn fields(&self) -> Option<&FieldMap>
    {
        match self {
            Value::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// Text form of every non-aggregate, non-null value.
    pub fn as_text(&self) -> Option<String>
    {
        match self {
            Value::Scalar(text) | Value::Opaque(text) => Some(text.clone()),
            Value::BackReference(path) => Some(format!("(back-reference: {path})")),
            Value::Ignored => Some(IGNORED_MARKER.to_string()),
            Value::Truncated(depth) => Some(format!("(truncated: depth {depth})")),
            Value::Null | Value::Fields(_) => None,
        }
    }

    /// Maximum nesting depth below this value (0 for leaves).
    pub fn depth(&self) -> usize
    {
        match self {
            Value::Fields(fields) if !fields.is_empty() => {
                1 + fields.values().map(|record| record.value.depth()).max().unwrap_or(0)
            }
            _ => 0,
        }
    }
}

impl Serialize for Value
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Fields(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, record) in fields {
                    map.serialize_entry(name, record)?;
                }
                map.end()
            }
            other => {
                let text = other.as_text().unwrap_or_default();
                serializer.serialize_str(&text)
            }
        }
    }
}

/// One serialized field: how it was reached, what it was declared as, and its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRecord
{
    pub expr: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: Value,
}

impl FieldRecord
{
    pub fn new(expr: impl Into<String>, type_name: impl Into<String>, value: Value) -> Self
    {
        Self {
            expr: expr.into(),
            type_name: type_name.into(),
            value,
        }
    }

    /// Number of records in this subtree, this one included.
    pub fn count(&self) -> usize
    {
        1 + self.value.fields().map_or(0, |fields| fields.values().map(FieldRecord::count).sum())
    }
}
