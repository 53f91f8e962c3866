//! The graph-construction and execution engine.
//!
//! A machine is a flat, 1-indexed collection of nodes; every edge is a
//! [`NodeId`] handle into the store, so cycles (Kleene loops) are plain data
//! and matching is a pure table walk. The key pieces:
//!
//! - `store`: the node store and handle type
//! - `table`: transition-table shapes and the [`Symbol`] trait selecting them
//! - `node`: a DFA state - transition table plus optional accepting cell
//! - `builder`: the mutable construction surface, sub-machine embedding, and
//!   the non-ambiguous linking routine
//! - `optimizer`: duplicate fusion, orphan elimination, blank compaction
//! - `exec`: full match, prefix lookup, find-first, find-all
//! - `dump`: the debug rendering

mod builder;
mod dump;
mod exec;
mod node;
mod optimizer;
mod store;
mod table;

pub use builder::{Conflict, Regex, StateMachine};
pub(crate) use builder::CursorSet;
pub use exec::MatchSpan;
pub use node::{AcceptValue, Node, Payload};
pub use store::{NodeId, NodeStore};
pub use table::{ArrayTable, ByteTable, IndexSymbol, Key, MapTable, Symbol, TransitionTable, WideTable};
