//! Transition tables and the symbols that key them.
//!
//! A node's transitions are keyed by a small closed set: one *value key* per
//! alphabet symbol, plus the distinguished EOF and default channels. The table
//! shape is selected statically by the symbol type through [`Symbol::Table`] -
//! never by dynamic dispatch on the hot path:
//!
//! - [`ByteTable`]: fixed 128-slot array plus EOF/default, for `u8` symbols
//! - [`WideTable`]: fixed 196-slot array plus EOF/default, for the compressed
//!   UTF-8 byte alphabet ([`PackedByte`](crate::utf8::PackedByte))
//! - [`MapTable`]: sparse ordered map plus dedicated EOF/default fields, for
//!   arbitrary `Ord` symbols
//!
//! Every shape iterates its live slots in the same stable order: value keys
//! ascending, then EOF, then default.

use std::collections::BTreeMap;
use std::fmt;

use super::store::NodeId;

/// A transition key: a value key for one alphabet symbol, or one of the two
/// distinguished channels.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Key<S> {
    Sym(S),
    Eof,
    Default,
}

impl<S: Symbol> Key<S> {
    /// Human-readable form for the debug dump.
    pub fn render(&self) -> String {
        match self {
            Key::Sym(s) => s.render(),
            Key::Eof => "<EOF>".to_string(),
            Key::Default => "<Default>".to_string(),
        }
    }
}

/// An alphabet symbol. The associated table type fixes the node shape for
/// machines keyed by this symbol.
pub trait Symbol: Clone + Ord + fmt::Debug {
    type Table: TransitionTable<Self>;

    /// Human-readable form for the debug dump.
    fn render(&self) -> String {
        format!("{:?}", self)
    }
}

/// A symbol that is a dense small integer, usable as a direct index into an
/// [`ArrayTable`].
pub trait IndexSymbol: Symbol {
    fn key_index(&self) -> usize;
    fn from_index(index: usize) -> Self;
}

/// The contract every table shape satisfies.
///
/// Reads of absent (or out-of-alphabet) keys yield [`NodeId::NULL`]; writes of
/// out-of-alphabet value keys are a programming error and panic.
pub trait TransitionTable<S>: Clone + PartialEq {
    fn new() -> Self;

    /// Destination for `key`, or NULL.
    fn get(&self, key: &Key<S>) -> NodeId;

    /// Point `key` at `to` (NULL clears the slot).
    fn set(&mut self, key: &Key<S>, to: NodeId);

    /// Clear every slot.
    fn clear(&mut self);

    /// True iff every slot is NULL.
    fn is_empty(&self) -> bool;

    /// Visit every non-null transition, including EOF and default, in the
    /// stable order (value keys ascending, EOF, default).
    fn for_each(&self, f: impl FnMut(Key<S>, NodeId));

    /// Rewrite every non-null slot through `f`.
    fn retarget(&mut self, f: impl FnMut(NodeId) -> NodeId);

    /// Full transition-vector equality under the self-reference rule: a slot
    /// where `self` points at `self_id` and `other` points at `other_id` is
    /// considered equal.
    fn congruent(&self, self_id: NodeId, other: &Self, other_id: NodeId) -> bool;
}

#[inline]
fn slots_agree(a: NodeId, b: NodeId, self_id: NodeId, other_id: NodeId) -> bool {
    a == b || (a == self_id && b == other_id)
}

/// Fixed-shape transition table: `N - 2` value-key slots followed by the EOF
/// and default slots. The whole table is one flat array, so the runtime walk
/// is a single indexed load.
#[derive(Clone)]
pub struct ArrayTable<const N: usize> {
    slots: [NodeId; N],
}

/// Table for the byte specialization: the 128-key ASCII alphabet.
pub type ByteTable = ArrayTable<130>;

/// Table for the compressed UTF-8 specialization: 196 masked-byte value keys.
pub type WideTable = ArrayTable<198>;

impl<const N: usize> ArrayTable<N> {
    /// Number of value-key slots.
    pub const KEYSPACE: usize = N - 2;
    const EOF: usize = N - 2;
    const DEF: usize = N - 1;

    fn idx<S: IndexSymbol>(key: &Key<S>) -> usize {
        match key {
            Key::Sym(s) => {
                let i = s.key_index();
                assert!(
                    i < Self::KEYSPACE,
                    "transition key {} outside the alphabet (keyspace {})",
                    i,
                    Self::KEYSPACE
                );
                i
            }
            Key::Eof => Self::EOF,
            Key::Default => Self::DEF,
        }
    }
}

impl<const N: usize> Default for ArrayTable<N> {
    fn default() -> Self {
        Self {
            slots: [NodeId::NULL; N],
        }
    }
}

impl<const N: usize> PartialEq for ArrayTable<N> {
    fn eq(&self, other: &Self) -> bool {
        self.slots == other.slots
    }
}

impl<S: IndexSymbol, const N: usize> TransitionTable<S> for ArrayTable<N> {
    fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn get(&self, key: &Key<S>) -> NodeId {
        match key {
            Key::Sym(s) if s.key_index() >= Self::KEYSPACE => NodeId::NULL,
            _ => self.slots[Self::idx(key)],
        }
    }

    #[inline]
    fn set(&mut self, key: &Key<S>, to: NodeId) {
        self.slots[Self::idx::<S>(key)] = to;
    }

    fn clear(&mut self) {
        self.slots = [NodeId::NULL; N];
    }

    fn is_empty(&self) -> bool {
        self.slots.iter().all(|t| t.is_null())
    }

    fn for_each(&self, mut f: impl FnMut(Key<S>, NodeId)) {
        for i in 0..Self::KEYSPACE {
            if !self.slots[i].is_null() {
                f(Key::Sym(S::from_index(i)), self.slots[i]);
            }
        }
        if !self.slots[Self::EOF].is_null() {
            f(Key::Eof, self.slots[Self::EOF]);
        }
        if !self.slots[Self::DEF].is_null() {
            f(Key::Default, self.slots[Self::DEF]);
        }
    }

    fn retarget(&mut self, mut f: impl FnMut(NodeId) -> NodeId) {
        for slot in self.slots.iter_mut() {
            if !slot.is_null() {
                *slot = f(*slot);
            }
        }
    }

    fn congruent(&self, self_id: NodeId, other: &Self, other_id: NodeId) -> bool {
        self.slots
            .iter()
            .zip(other.slots.iter())
            .all(|(&a, &b)| slots_agree(a, b, self_id, other_id))
    }
}

/// Sparse table for arbitrary `Ord` symbols. The map holds value keys only;
/// EOF and default are dedicated fields, not map entries.
#[derive(Clone, PartialEq)]
pub struct MapTable<S: Ord + Clone> {
    syms: BTreeMap<S, NodeId>,
    eof: NodeId,
    default: NodeId,
}

impl<S: Ord + Clone> Default for MapTable<S> {
    fn default() -> Self {
        Self {
            syms: BTreeMap::new(),
            eof: NodeId::NULL,
            default: NodeId::NULL,
        }
    }
}

impl<S: Ord + Clone> TransitionTable<S> for MapTable<S> {
    fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &Key<S>) -> NodeId {
        match key {
            Key::Sym(s) => self.syms.get(s).copied().unwrap_or(NodeId::NULL),
            Key::Eof => self.eof,
            Key::Default => self.default,
        }
    }

    fn set(&mut self, key: &Key<S>, to: NodeId) {
        match key {
            Key::Sym(s) => {
                if to.is_null() {
                    self.syms.remove(s);
                } else {
                    self.syms.insert(s.clone(), to);
                }
            }
            Key::Eof => self.eof = to,
            Key::Default => self.default = to,
        }
    }

    fn clear(&mut self) {
        self.syms.clear();
        self.eof = NodeId::NULL;
        self.default = NodeId::NULL;
    }

    fn is_empty(&self) -> bool {
        self.syms.values().all(|t| t.is_null()) && self.eof.is_null() && self.default.is_null()
    }

    fn for_each(&self, mut f: impl FnMut(Key<S>, NodeId)) {
        for (s, &to) in &self.syms {
            if !to.is_null() {
                f(Key::Sym(s.clone()), to);
            }
        }
        if !self.eof.is_null() {
            f(Key::Eof, self.eof);
        }
        if !self.default.is_null() {
            f(Key::Default, self.default);
        }
    }

    fn retarget(&mut self, mut f: impl FnMut(NodeId) -> NodeId) {
        let mut dead = Vec::new();
        for (s, to) in self.syms.iter_mut() {
            *to = f(*to);
            if to.is_null() {
                dead.push(s.clone());
            }
        }
        for s in dead {
            self.syms.remove(&s);
        }
        if !self.eof.is_null() {
            self.eof = f(self.eof);
        }
        if !self.default.is_null() {
            self.default = f(self.default);
        }
    }

    fn congruent(&self, self_id: NodeId, other: &Self, other_id: NodeId) -> bool {
        // Union of both key sets: absent keys read as NULL.
        for s in self.syms.keys().chain(other.syms.keys()) {
            let key = Key::Sym(s.clone());
            if !slots_agree(self.get(&key), other.get(&key), self_id, other_id) {
                return false;
            }
        }
        slots_agree(self.eof, other.eof, self_id, other_id)
            && slots_agree(self.default, other.default, self_id, other_id)
    }
}

impl Symbol for u8 {
    type Table = ByteTable;

    fn render(&self) -> String {
        match *self {
            0..=31 | 127..=255 => format!("\\{}", self),
            c => format!("'{}'", c as char),
        }
    }
}

impl IndexSymbol for u8 {
    #[inline]
    fn key_index(&self) -> usize {
        *self as usize
    }

    #[inline]
    fn from_index(index: usize) -> Self {
        index as u8
    }
}

impl Symbol for char {
    type Table = MapTable<char>;
}

impl Symbol for u32 {
    type Table = MapTable<u32>;

    fn render(&self) -> String {
        format!("{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_table_get_set() {
        let mut t = ByteTable::default();
        assert!(TransitionTable::<u8>::get(&t, &Key::Sym(b'a')).is_null());
        t.set(&Key::Sym(b'a'), NodeId::from_raw(3));
        assert_eq!(t.get(&Key::Sym(b'a')).get(), 3);
        t.set(&Key::<u8>::Eof, NodeId::from_raw(4));
        t.set(&Key::<u8>::Default, NodeId::from_raw(5));
        assert_eq!(TransitionTable::<u8>::get(&t, &Key::Eof).get(), 4);
        assert_eq!(TransitionTable::<u8>::get(&t, &Key::Default).get(), 5);
        // Out-of-alphabet bytes read as NULL rather than panicking.
        assert!(t.get(&Key::Sym(0xF0u8)).is_null());
    }

    #[test]
    #[should_panic(expected = "outside the alphabet")]
    fn test_byte_table_out_of_range_write_panics() {
        let mut t = ByteTable::default();
        t.set(&Key::Sym(200u8), NodeId::from_raw(1));
    }

    #[test]
    fn test_for_each_order_is_syms_then_eof_then_default() {
        let mut t = ByteTable::default();
        t.set(&Key::<u8>::Default, NodeId::from_raw(9));
        t.set(&Key::Sym(b'z'), NodeId::from_raw(2));
        t.set(&Key::Sym(b'a'), NodeId::from_raw(1));
        t.set(&Key::<u8>::Eof, NodeId::from_raw(8));
        let mut seen = Vec::new();
        t.for_each(|k: Key<u8>, to| seen.push((k, to.get())));
        assert_eq!(
            seen,
            vec![
                (Key::Sym(b'a'), 1),
                (Key::Sym(b'z'), 2),
                (Key::Eof, 8),
                (Key::Default, 9),
            ]
        );
    }

    #[test]
    fn test_congruence_accepts_matched_self_loops() {
        let a_id = NodeId::from_raw(2);
        let b_id = NodeId::from_raw(7);
        let mut a = ByteTable::default();
        let mut b = ByteTable::default();
        a.set(&Key::Sym(b'x'), a_id); // self-loop
        b.set(&Key::Sym(b'x'), b_id); // self-loop
        a.set(&Key::Sym(b'y'), NodeId::from_raw(3));
        b.set(&Key::Sym(b'y'), NodeId::from_raw(3));
        assert!(TransitionTable::<u8>::congruent(&a, a_id, &b, b_id));

        // A one-sided extra transition breaks congruence in either direction.
        b.set(&Key::Sym(b'q'), NodeId::from_raw(4));
        assert!(!TransitionTable::<u8>::congruent(&a, a_id, &b, b_id));
        assert!(!TransitionTable::<u8>::congruent(&b, b_id, &a, a_id));
    }

    #[test]
    fn test_map_table_union_congruence() {
        let a_id = NodeId::from_raw(2);
        let b_id = NodeId::from_raw(3);
        let mut a: MapTable<u32> = MapTable::default();
        let mut b: MapTable<u32> = MapTable::default();
        a.set(&Key::Sym(10), NodeId::from_raw(5));
        b.set(&Key::Sym(10), NodeId::from_raw(5));
        assert!(a.congruent(a_id, &b, b_id));
        b.set(&Key::Sym(11), NodeId::from_raw(6));
        assert!(!a.congruent(a_id, &b, b_id));
    }

    #[test]
    fn test_retarget_rewrites_every_channel() {
        let mut t = ByteTable::default();
        t.set(&Key::Sym(b'a'), NodeId::from_raw(2));
        t.set(&Key::<u8>::Eof, NodeId::from_raw(2));
        t.set(&Key::<u8>::Default, NodeId::from_raw(3));
        TransitionTable::<u8>::retarget(&mut t, |d| {
            if d.get() == 2 {
                NodeId::from_raw(9)
            } else {
                d
            }
        });
        assert_eq!(t.get(&Key::Sym(b'a')).get(), 9);
        assert_eq!(TransitionTable::<u8>::get(&t, &Key::Eof).get(), 9);
        assert_eq!(TransitionTable::<u8>::get(&t, &Key::Default).get(), 3);
    }
}
