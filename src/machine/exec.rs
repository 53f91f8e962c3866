//! Read-only matching over a constructed machine.
//!
//! Four modes, all pure table walks on `&self`:
//!
//! - full match, in string mode and file mode (the latter takes one EOF
//!   transition after the last symbol)
//! - longest-prefix lookup
//! - find-first (leftmost anchor, longest match)
//! - find-all (greedy, non-overlapping)
//!
//! Every step falls back to the node's default transition when the explicit
//! slot is empty. The EOF channel is only consumed by file-mode full match.
//!
//! Accepting cells with a nonzero `back_by` report their position that many
//! transitions early in the non-full-match modes, leaving the trailing
//! symbols unconsumed.

use super::builder::StateMachine;
use super::node::Payload;
use super::store::NodeId;
use super::table::{Key, Symbol};

/// One match found by the find modes. `end` is exclusive and already
/// adjusted by the accepting cell's `back_by`.
#[derive(PartialEq, Eq, Debug)]
pub struct MatchSpan<'m, V> {
    pub start: usize,
    pub end: usize,
    pub value: &'m V,
}

impl<V> Clone for MatchSpan<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for MatchSpan<'_, V> {}

impl<V: Payload, S: Symbol> StateMachine<V, S> {
    /// One transition step: the explicit slot for `key`, or the node's
    /// default transition when the slot is empty.
    #[inline]
    fn step(&self, node: NodeId, key: &Key<S>) -> NodeId {
        let dest = self.nodes[node].transition(key);
        if dest.is_null() {
            self.nodes[node].transition(&Key::Default)
        } else {
            dest
        }
    }

    /// Match the entire input in string mode. Returns the accepting value of
    /// the final node, or `None` when the walk dies or ends off an accepting
    /// node.
    pub fn full_match(&self, input: &[S]) -> Option<&V> {
        let node = self.walk(input)?;
        self.nodes[node].value.as_ref().map(|cell| &cell.value)
    }

    /// Match the entire input in file mode: after the last symbol one EOF
    /// transition is taken, and the post-EOF node decides acceptance.
    pub fn full_match_eof(&self, input: &[S]) -> Option<&V> {
        let node = self.walk(input)?;
        let end = self.nodes[node].transition(&Key::Eof);
        if end.is_null() {
            return None;
        }
        self.nodes[end].value.as_ref().map(|cell| &cell.value)
    }

    /// String-mode full match as a plain yes/no.
    pub fn is_match(&self, input: &[S]) -> bool {
        self.full_match(input).is_some()
    }

    /// File-mode full match as a plain yes/no.
    pub fn is_match_eof(&self, input: &[S]) -> bool {
        self.full_match_eof(input).is_some()
    }

    fn walk(&self, input: &[S]) -> Option<NodeId> {
        let mut node = NodeId::ROOT;
        for sym in input {
            node = self.step(node, &Key::Sym(sym.clone()));
            if node.is_null() {
                return None;
            }
        }
        Some(node)
    }

    /// Longest accepting prefix of the input.
    ///
    /// Walks from the root, remembering the most recent accepting node, and
    /// stops when no further transition exists. Returns the end position
    /// (symbols consumed, minus the accepting cell's `back_by`) and the
    /// value, or `None` when no prefix accepts. An accepting root matches
    /// the empty prefix.
    pub fn lookup(&self, input: &[S]) -> Option<(usize, &V)> {
        let mut node = NodeId::ROOT;
        let mut best = self.nodes[node]
            .value
            .as_ref()
            .map(|cell| (0usize.saturating_sub(cell.back_by), &cell.value));
        for (i, sym) in input.iter().enumerate() {
            let next = self.step(node, &Key::Sym(sym.clone()));
            if next.is_null() {
                break;
            }
            if let Some(cell) = &self.nodes[next].value {
                best = Some(((i + 1).saturating_sub(cell.back_by), &cell.value));
            }
            node = next;
        }
        best
    }

    /// First match in the input: leftmost anchor wins, and at each anchor the
    /// longest accepting prefix wins.
    pub fn find_first(&self, input: &[S]) -> Option<MatchSpan<'_, V>> {
        for start in 0..=input.len() {
            if let Some((len, value)) = self.lookup(&input[start..]) {
                return Some(MatchSpan {
                    start,
                    end: start + len,
                    value,
                });
            }
        }
        None
    }

    /// All greedy, non-overlapping matches, leftmost first. The anchor
    /// advances past the end of each match (and always makes progress, so
    /// empty matches cannot stall the scan).
    pub fn find_all(&self, input: &[S]) -> Vec<MatchSpan<'_, V>> {
        let mut found = Vec::new();
        let mut anchor = 0;
        while anchor <= input.len() {
            let Some(span) = self.find_first(&input[anchor..]) else {
                break;
            };
            let span = MatchSpan {
                start: anchor + span.start,
                end: anchor + span.end,
                value: span.value,
            };
            anchor = if span.end > span.start {
                span.end
            } else {
                span.start + 1
            };
            found.push(span);
        }
        found
    }
}
