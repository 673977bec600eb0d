//! Handles to values inside the inspected process.

use super::Address;

/// Opaque reference to a value inside the inspected process
///
/// `L` is whatever the provider needs to find the value again (a value id, a
/// location path, ...). The walker never looks inside it.
///
/// A handle also carries the declared type name and the provider's textual
/// rendering of the value's address. Non-addressable values (temporaries,
/// register values) have no identity text and are never deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle<L>
{
    locator: L,
    type_name: String,
    identity: Option<String>,
}

impl<L> ObjectHandle<L>
{
    pub fn new(locator: L, type_name: impl Into<String>, identity: Option<String>) -> Self
    {
        Self {
            locator,
            type_name: type_name.into(),
            identity,
        }
    }

    /// Provider-specific locator.
    pub fn locator(&self) -> &L
    {
        &self.locator
    }

    /// Declared type name, exactly as the provider spells it.
    pub fn type_name(&self) -> &str
    {
        &self.type_name
    }

    /// Textual address rendering, e.g. `(Node *) 0x601040 <head>`.
    pub fn identity(&self) -> Option<&str>
    {
        self.identity.as_deref()
    }

    /// Address parsed out of [`identity`](Self::identity), if any.
    pub fn address(&self) -> Option<Address>
    {
        self.identity.as_deref().and_then(Address::extract)
    }
}
