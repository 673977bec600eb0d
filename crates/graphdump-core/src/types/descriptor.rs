//! Type descriptors.
//!
//! Providers translate their own type codes into the closed [`TypeKind`] set
//! once, at the adapter boundary. Everything past that point (classifier,
//! walker) only ever sees these types.

use std::fmt;

use serde::Deserialize;
use smallvec::SmallVec;

/// Fine-grained kind of a type, mirroring the codes debuggers report
///
/// Typedefs never appear here: providers resolve them before building a
/// descriptor, so `kind` is always the kind of the underlying type while
/// [`TypeDescriptor::name`] keeps the declared spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind
{
    Int,
    Float,
    Char,
    Bool,
    Enum,
    Flags,
    Complex,
    #[serde(rename = "decfloat")]
    DecFloat,
    Func,
    Method,
    String,
    Array,
    Pointer,
    #[serde(rename = "ref")]
    Reference,
    #[serde(rename = "rvalue_ref")]
    RvalueReference,
    #[serde(rename = "memberptr")]
    MemberPointer,
    #[serde(rename = "methodptr")]
    MethodPointer,
    Struct,
    Union,
    Void,
    Error,
    Unknown,
}

/// The coarse four-way split of [`TypeKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindCategory
{
    /// Rendered text is a complete representation of the value.
    Scalar,
    /// Reference-like; may be dereferenced.
    Pointer,
    /// Has named fields.
    Aggregate,
    /// Void, error and unknown types.
    Other,
}

impl TypeKind
{
    /// Map to the coarse category the classifier works with.
    pub const fn category(self) -> KindCategory
    {
        match self {
            TypeKind::Int
            | TypeKind::Float
            | TypeKind::Char
            | TypeKind::Bool
            | TypeKind::Enum
            | TypeKind::Flags
            | TypeKind::Complex
            | TypeKind::DecFloat
            | TypeKind::Func
            | TypeKind::Method
            | TypeKind::String
            | TypeKind::Array => KindCategory::Scalar,
            TypeKind::Pointer
            | TypeKind::Reference
            | TypeKind::RvalueReference
            | TypeKind::MemberPointer
            | TypeKind::MethodPointer => KindCategory::Pointer,
            TypeKind::Struct | TypeKind::Union => KindCategory::Aggregate,
            TypeKind::Void | TypeKind::Error | TypeKind::Unknown => KindCategory::Other,
        }
    }

    pub const fn is_pointer_like(self) -> bool
    {
        matches!(self.category(), KindCategory::Pointer)
    }

    pub const fn is_aggregate(self) -> bool
    {
        matches!(self.category(), KindCategory::Aggregate)
    }
}

impl fmt::Display for TypeKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            TypeKind::Int => "INT",
            TypeKind::Float => "FLT",
            TypeKind::Char => "CHAR",
            TypeKind::Bool => "BOOL",
            TypeKind::Enum => "ENUM",
            TypeKind::Flags => "FLAGS",
            TypeKind::Complex => "COMPLEX",
            TypeKind::DecFloat => "DECFLOAT",
            TypeKind::Func => "FUNC",
            TypeKind::Method => "METHOD",
            TypeKind::String => "STRING",
            TypeKind::Array => "ARRAY",
            TypeKind::Pointer => "PTR",
            TypeKind::Reference => "REF",
            TypeKind::RvalueReference => "RVALUE_REF",
            TypeKind::MemberPointer => "MEMBERPTR",
            TypeKind::MethodPointer => "METHODPTR",
            TypeKind::Struct => "STRUCT",
            TypeKind::Union => "UNION",
            TypeKind::Void => "VOID",
            TypeKind::Error => "ERROR",
            TypeKind::Unknown => "UNKNOWN",
        };
        write!(f, "{label}")
    }
}

/// One declared field of an aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor
{
    /// Field name as declared. Base classes show up under their type name.
    pub name: String,
    /// Declared type of the field.
    pub type_name: String,
}

impl FieldDescriptor
{
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self
    {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Ordered field list; most aggregates are small.
pub type FieldList = SmallVec<[FieldDescriptor; 8]>;

/// What a provider knows about a value's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor
{
    /// Declared type name (typedef spelling preserved).
    pub name: String,
    /// Kind of the underlying type.
    pub kind: TypeKind,
    /// Fields in declaration order; empty for non-aggregates.
    pub fields: FieldList,
    /// Target of a pointer-like type, when the provider knows it.
    pub target: Option<Box<TypeDescriptor>>,
}

impl TypeDescriptor
{
    /// Descriptor for a type without fields or target.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self
    {
        Self {
            name: name.into(),
            kind,
            fields: FieldList::new(),
            target: None,
        }
    }

    /// Descriptor for a struct or union.
    pub fn aggregate(name: impl Into<String>, kind: TypeKind, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self
    {
        Self {
            name: name.into(),
            kind,
            fields: fields.into_iter().collect(),
            target: None,
        }
    }

    /// Descriptor for a pointer-like type.
    pub fn pointer(name: impl Into<String>, kind: TypeKind, target: TypeDescriptor) -> Self
    {
        Self {
            name: name.into(),
            kind,
            fields: FieldList::new(),
            target: Some(Box::new(target)),
        }
    }

    pub fn category(&self) -> KindCategory
    {
        self.kind.category()
    }

    /// `true` for pointers whose target is a struct or union.
    pub fn points_to_aggregate(&self) -> bool
    {
        self.kind.is_pointer_like() && self.target.as_ref().is_some_and(|target| target.kind.is_aggregate())
    }
}
