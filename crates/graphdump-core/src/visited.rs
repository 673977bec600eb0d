//! # Visited Identity Table
//!
//! Remembers which nodes a dump has already serialized and the expression
//! path that reached each one first. This table is the only thing standing
//! between the walker and an infinite loop on cyclic graphs.
//!
//! A node's identity is `(address, declared type)`. Keeping the type in the
//! key means a struct and its first member (same address) or two members of
//! a union are distinct nodes and are both expanded.
//!
//! Entries are kept in recording order. A walker that abandons part of its
//! output (a depth cut-off, an object replaced by its flat rendering) rolls
//! the table back to a [`mark`](VisitedTable::mark) taken before it started,
//! so no back-reference ever points at a record missing from the dump.

use indexmap::IndexMap;

use crate::types::{Address, ObjectHandle};

/// Identity of a serialized node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitedKey
{
    pub address: Address,
    pub type_name: String,
}

impl VisitedKey
{
    pub fn new(address: Address, type_name: impl Into<String>) -> Self
    {
        Self {
            address,
            type_name: type_name.into(),
        }
    }

    /// Key for a handle, or `None` if the handle has no resolvable address.
    pub fn for_handle<L>(handle: &ObjectHandle<L>) -> Option<Self>
    {
        handle.address().map(|address| Self::new(address, handle.type_name()))
    }
}

/// First-seen expression path per identity, for one dump.
#[derive(Debug, Default)]
pub struct VisitedTable
{
    paths: IndexMap<VisitedKey, String>,
}

/// Position in a [`VisitedTable`]'s recording order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitedMark(usize);

impl VisitedTable
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Whether the handle's identity has been recorded. Non-addressable handles never are.
    pub fn contains<L>(&self, handle: &ObjectHandle<L>) -> bool
    {
        self.path_of(handle).is_some()
    }

    /// Record `path` for the handle's identity
    ///
    /// Returns `true` if the identity was newly recorded. The first path
    /// recorded for an identity is kept; later calls and non-addressable
    /// handles are no-ops returning `false`.
    pub fn record<L>(&mut self, handle: &ObjectHandle<L>, path: &str) -> bool
    {
        let Some(key) = VisitedKey::for_handle(handle) else {
            return false;
        };
        self.record_key(key, path)
    }

    /// [`record`](Self::record) for an already built key.
    fn record_key(&mut self, key: VisitedKey, path: &str) -> bool
    {
        if self.paths.contains_key(&key) {
            return false;
        }
        self.paths.insert(key, path.to_string());
        true
    }

    /// Path that first reached the handle's identity.
    pub fn path_of<L>(&self, handle: &ObjectHandle<L>) -> Option<&str>
    {
        VisitedKey::for_handle(handle).and_then(|key| self.paths.get(&key)).map(String::as_str)
    }

    pub fn len(&self) -> usize
    {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.paths.is_empty()
    }

    /// Current end of the recording order.
    pub fn mark(&self) -> VisitedMark
    {
        VisitedMark(self.paths.len())
    }

    /// Forget every identity recorded after `mark`.
    pub fn rollback(&mut self, mark: VisitedMark)
    {
        self.paths.truncate(mark.0);
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn handle(type_name: &str, identity: Option<&str>) -> ObjectHandle<()>
    {
        ObjectHandle::new((), type_name, identity.map(str::to_string))
    }

    #[test]
    fn test_first_record_wins()
    {
        let mut table = VisitedTable::new();
        let node = handle("Node", Some("(Node *) 0x1000 <root>"));

        assert!(!table.contains(&node));
        assert!(table.record(&node, "root"));
        assert!(!table.record(&node, "other->next"));
        assert_eq!(table.path_of(&node), Some("root"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_same_address_different_type_is_distinct()
    {
        let mut table = VisitedTable::new();
        let as_struct = handle("Outer", Some("0x2000"));
        let as_member = handle("Inner", Some("0x2000"));

        table.record(&as_struct, "root");
        assert!(!table.contains(&as_member));
        assert!(table.record(&as_member, "root.inner"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_identity_decoration_does_not_matter()
    {
        let mut table = VisitedTable::new();
        table.record(&handle("Node", Some("(Node *) 0x1000 <root>")), "root");
        assert_eq!(table.path_of(&handle("Node", Some("0x1000"))), Some("root"));
    }

    #[test]
    fn test_rollback_forgets_later_records()
    {
        let mut table = VisitedTable::new();
        let root = handle("Node", Some("0x1000"));
        let child = handle("Node", Some("0x2000"));

        table.record(&root, "root");
        let mark = table.mark();
        table.record(&child, "root.next");
        assert!(table.contains(&child));

        table.rollback(mark);
        assert!(table.contains(&root));
        assert!(!table.contains(&child));
        assert!(table.record(&child, "root.other"));
        assert_eq!(table.path_of(&child), Some("root.other"));
    }

    #[test]
    fn test_non_addressable_is_never_recorded()
    {
        let mut table = VisitedTable::new();
        let temporary = handle("int", None);
        let register = handle("int", Some("<synthetic pointer>"));

        assert!(!table.record(&temporary, "a + b"));
        assert!(!table.record(&register, "$rax"));
        assert!(!table.contains(&temporary));
        assert!(table.is_empty());
    }
}
