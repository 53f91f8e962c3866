//! The DFA state: a transition table plus an optional accepting cell.

use std::fmt;

use super::store::NodeId;
use super::table::{Key, Symbol, TransitionTable};

/// Bound for accepting payloads. Pure machines use `()`.
pub trait Payload: Clone + PartialEq + fmt::Debug {}

impl<T: Clone + PartialEq + fmt::Debug> Payload for T {}

/// The accepting cell of a node.
///
/// `back_by` is the number of transitions the non-full-match modes report the
/// accept position back by, leaving that many trailing symbols unconsumed.
#[derive(Clone, PartialEq, Debug)]
pub struct AcceptValue<V> {
    pub value: V,
    pub back_by: usize,
}

impl<V> AcceptValue<V> {
    pub fn new(value: V) -> Self {
        Self { value, back_by: 0 }
    }

    pub fn with_back_by(value: V, back_by: usize) -> Self {
        Self { value, back_by }
    }
}

/// A single DFA state.
#[derive(Clone, PartialEq)]
pub struct Node<S: Symbol, V> {
    pub(crate) table: S::Table,
    pub(crate) value: Option<AcceptValue<V>>,
}

impl<S: Symbol, V> Default for Node<S, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Symbol, V> Node<S, V> {
    pub fn new() -> Self {
        Self {
            table: S::Table::new(),
            value: None,
        }
    }

    /// Destination on `key`, or NULL.
    #[inline]
    pub fn transition(&self, key: &Key<S>) -> NodeId {
        self.table.get(key)
    }

    #[inline]
    pub(crate) fn set_transition(&mut self, key: &Key<S>, to: NodeId) {
        self.table.set(key, to);
    }

    /// The accepting cell, if this node accepts.
    pub fn accept(&self) -> Option<&AcceptValue<V>> {
        self.value.as_ref()
    }

    pub fn is_accepting(&self) -> bool {
        self.value.is_some()
    }

    /// Visit every non-null transition (value keys ascending, EOF, default).
    pub fn each_transition(&self, f: impl FnMut(Key<S>, NodeId)) {
        self.table.for_each(f);
    }

    /// Snapshot of all non-null transitions, safe to hold while the store is
    /// mutated.
    pub fn transitions(&self) -> Vec<(Key<S>, NodeId)> {
        let mut out = Vec::new();
        self.table.for_each(|k, to| out.push((k, to)));
        out
    }

    /// Clear all slots and the accepting cell.
    pub fn nullify(&mut self) {
        self.table.clear();
        self.value = None;
    }

    /// True iff the node has no accepting cell and every slot is NULL.
    pub fn is_null(&self) -> bool {
        self.value.is_none() && self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_after_nullify() {
        let mut node: Node<u8, u32> = Node::new();
        assert!(node.is_null());
        node.set_transition(&Key::Sym(b'a'), NodeId::from_raw(2));
        node.value = Some(AcceptValue::new(7));
        assert!(!node.is_null());
        node.nullify();
        assert!(node.is_null());
        assert!(node.accept().is_none());
    }

    #[test]
    fn test_accept_cell_equality_includes_back_by() {
        let a = AcceptValue::with_back_by(1u32, 0);
        let b = AcceptValue::with_back_by(1u32, 2);
        let c = AcceptValue::with_back_by(1u32, 2);
        assert_ne!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_snapshot_lists_eof_and_default() {
        let mut node: Node<u8, ()> = Node::new();
        node.set_transition(&Key::Sym(b'x'), NodeId::from_raw(2));
        node.set_transition(&Key::Eof, NodeId::from_raw(3));
        node.set_transition(&Key::Default, NodeId::from_raw(4));
        let tzns = node.transitions();
        assert_eq!(tzns.len(), 3);
        assert_eq!(tzns[0], (Key::Sym(b'x'), NodeId::from_raw(2)));
        assert_eq!(tzns[1], (Key::Eof, NodeId::from_raw(3)));
        assert_eq!(tzns[2], (Key::Default, NodeId::from_raw(4)));
    }
}
