//! tablewalk: incremental construction and table-walk execution of keyed DFAs
//!
//! The builder's primitives mirror the operators of regular expressions -
//! literal sequences, character classes, alternation, optional, Kleene star,
//! sub-expression embedding - but every operation mutates a single flat,
//! index-addressed graph, so matching at runtime is a pure table walk with no
//! AST in sight.
//!
//! ```
//! use tablewalk::StateMachine;
//!
//! let mut m: StateMachine<u32> = StateMachine::new();
//! m.match_sequence(b"one").commit(1).unwrap();
//! m.match_sequence(b"two").commit(2).unwrap();
//! m.optimize();
//!
//! assert_eq!(m.full_match(b"two"), Some(&2));
//! assert_eq!(m.full_match(b"twos"), None);
//! ```
//!
//! A machine is generic over its accepting payload (`()` for pure patterns,
//! aliased as [`Regex`]) and its alphabet symbol. Byte machines use a fixed
//! 128-slot ASCII table; [`Utf8StateMachine`] runs Unicode input through a
//! compressed per-byte alphabet; any `Ord` key type can drive a sparse
//! map-backed machine.
//!
//! Construction is single-threaded; a built machine is immutable through the
//! matching API and freely shareable across threads. For a read-mostly shared
//! machine with occasional rebuilds, see [`SharedStateMachine`].

use std::fmt;

pub mod charsets;
mod machine;
pub mod presets;
mod shared;
mod utf8;

pub use machine::{
    AcceptValue, ArrayTable, ByteTable, Conflict, IndexSymbol, Key, MapTable, MatchSpan, Node,
    NodeId, NodeStore, Payload, Regex, StateMachine, Symbol, TransitionTable, WideTable,
};
pub use shared::SharedStateMachine;
pub use utf8::{str_keys, PackedByte, Utf8Regex, Utf8StateMachine};

/// Errors surfaced by construction and by UTF-8 matching entry points.
///
/// Construction conflicts are reported only under [`Conflict::Error`]; the
/// other policies resolve them silently. Invariant violations (null-handle
/// loads, out-of-range store access, non-terminating ambiguous merges) are
/// defects, not user errors, and panic instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TablewalkError {
    /// A value was committed (or propagated during linking) onto a node that
    /// already carries a different value.
    ValueConflict {
        node: usize,
        existing: String,
        attempted: String,
    },
    /// A default branch was installed on a node whose default slot is taken.
    DefaultConflict {
        node: usize,
        existing: usize,
        attempted: usize,
    },
    /// An exit point was rewritten with a different look-back count.
    LookbackConflict {
        node: usize,
        existing: usize,
        attempted: usize,
    },
    /// Byte input to a UTF-8 matching call is not valid UTF-8.
    InvalidUtf8 { offset: usize },
}

impl fmt::Display for TablewalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TablewalkError::ValueConflict {
                node,
                existing,
                attempted,
            } => write!(
                f,
                "node #{} already holds value {}; refusing to replace it with {} \
                 (set a Skip or Overwrite conflict policy if this is intended)",
                node, existing, attempted
            ),
            TablewalkError::DefaultConflict {
                node,
                existing,
                attempted,
            } => write!(
                f,
                "node #{} already has a default transition to #{}; refusing to replace it with #{}",
                node, existing, attempted
            ),
            TablewalkError::LookbackConflict {
                node,
                existing,
                attempted,
            } => write!(
                f,
                "node #{} already has an exit point backing off by {}; refusing to replace it with {}",
                node, existing, attempted
            ),
            TablewalkError::InvalidUtf8 { offset } => {
                write!(f, "input is not valid UTF-8 at byte offset {}", offset)
            }
        }
    }
}

impl std::error::Error for TablewalkError {}
