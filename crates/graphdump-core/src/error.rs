//! # Error Types
//!
//! Error handling for dumps and for the introspection provider.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! There are two layers:
//!
//! - [`ProviderError`]: what an introspection call on a single value can fail
//!   with. The graph walker contains these at the field or object level.
//! - [`DumpError`]: what ends a whole dump operation. Only a root expression
//!   that cannot be resolved (plus configuration and output failures outside
//!   the walk) ever surfaces here.

use thiserror::Error;

/// Errors reported by an [`IntrospectionProvider`](crate::provider::IntrospectionProvider)
///
/// Each variant maps onto one recovery policy of the walker:
///
/// | Variant               | Walker reaction                                  |
/// |-----------------------|--------------------------------------------------|
/// | `MemoryRead`          | field value becomes `null`                       |
/// | `Evaluation`          | field value becomes `null`                       |
/// | `UnsupportedAccessor` | enclosing object is rendered as flat text        |
/// | `Internal`            | diagnostic entry written, field left out         |
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError
{
    /// The memory backing a value cannot be read
    ///
    /// The string names the offending location, usually as
    /// `Cannot access memory at address 0x...`.
    #[error("{0}")]
    MemoryRead(String),

    /// A synthetic or virtual member could not be evaluated
    ///
    /// Debuggers expose some members through scripted accessors (xmethods,
    /// synthetic children). When those are unavailable the whole enclosing
    /// object falls back to its flat textual rendering.
    #[error("Unsupported accessor: {0}")]
    UnsupportedAccessor(String),

    /// The provider rejected the expression
    ///
    /// Examples: unknown symbol, no such member, syntax error.
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// Anything else that went wrong inside the provider
    #[error("Internal introspection error: {0}")]
    Internal(String),
}

impl ProviderError
{
    /// Build the memory read error a debugger reports for an address.
    pub fn unreadable(address: impl std::fmt::Display) -> Self
    {
        ProviderError::MemoryRead(format!("Cannot access memory at address {address}"))
    }

    /// Whether the walker should treat this as a plain read failure (`null` value).
    pub const fn is_read_failure(&self) -> bool
    {
        matches!(self, ProviderError::MemoryRead(_) | ProviderError::Evaluation(_))
    }
}

/// Convenience type alias for `Result<T, ProviderError>`
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Main error type for dump operations
///
/// ## Error Categories
///
/// 1. **Root errors**: RootResolution, InvalidExpression
/// 2. **Input errors**: Config, Image
/// 3. **Output errors**: Serialize, Io
#[derive(Error, Debug)]
pub enum DumpError
{
    /// The root expression does not resolve to a value
    ///
    /// This is the only failure of the walk itself that aborts a dump. It is
    /// raised before any output artifact exists.
    #[error("Cannot resolve root expression `{expr}`: {source}")]
    RootResolution
    {
        /// The expression as the user typed it
        expr: String,
        /// What the provider reported
        #[source]
        source: ProviderError,
    },

    /// The root expression is empty or otherwise unusable before evaluation
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A heap image could not be parsed
    #[error("Invalid heap image: {0}")]
    Image(String),

    /// The assembled dump could not be serialized
    #[error("Failed to serialize dump: {0}")]
    Serialize(#[from] serde_json::Error),

    /// I/O error while writing the dump or the diagnostic log
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, DumpError>`
///
/// ```rust
/// use graphdump_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DumpError>;
