//! The mutable state-machine builder.
//!
//! A [`StateMachine`] is a flat graph of nodes plus a *cursor set* - the
//! frontier of handles the next operation writes from. Every primitive reads
//! the cursors, mutates the graph, and installs a new cursor set, so a regex
//! is materialized directly as a table rather than an AST.
//!
//! The two central routines live here:
//!
//! - `consume_pattern_except_root` + `match_pattern`: embed a pure sub-machine
//!   by cloning its non-root nodes and fanning its root transitions into every
//!   cursor, so the host's existing transitions are honored.
//! - `link_nonambiguous`: install an effective transition without disturbing
//!   pre-existing ones, cloning the colliding destination into a merge node
//!   and recursing over the target's outgoing transitions. All determinism
//!   conflicts funnel through it.

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use crate::TablewalkError;

use super::node::{AcceptValue, Node, Payload};
use super::store::{NodeId, NodeStore};
use super::table::{Key, Symbol, TransitionTable};

/// What to do when an operation would overwrite existing data on a node.
/// Equal data never conflicts; the policy is consulted only when the data
/// actually differs.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Conflict {
    /// Keep the existing data.
    Skip,
    /// Replace it with the new data.
    Overwrite,
    /// Fail the operation with a structured error.
    #[default]
    Error,
}

pub(crate) type CursorSet = SmallVec<[NodeId; 4]>;

/// A mutable, incrementally built state machine over symbols `S`, carrying a
/// value of type `V` on accepting nodes.
///
/// Construction is single-threaded; a finished machine is immutable through
/// the matching API and can be shared freely across threads.
#[derive(Clone)]
pub struct StateMachine<V: Payload, S: Symbol = u8> {
    pub(crate) nodes: NodeStore<S, V>,
    pub(crate) cursors: CursorSet,
    pub(crate) on_conflict: Conflict,
}

/// A pure pattern: a machine whose accepting cell carries no payload.
pub type Regex<S = u8> = StateMachine<(), S>;

struct Consumed {
    mapping: FxHashMap<NodeId, NodeId>,
    terminals: Vec<NodeId>,
}

impl Consumed {
    /// Translate `pattern`'s root transitions through the handle mapping.
    fn root_transitions<S: Symbol>(&self, pattern: &Regex<S>) -> Vec<(Key<S>, NodeId)> {
        pattern
            .root()
            .transitions()
            .into_iter()
            .map(|(key, dest)| (key, self.mapping[&dest]))
            .collect()
    }
}

impl<V: Payload, S: Symbol> Default for StateMachine<V, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Payload, S: Symbol> PartialEq for StateMachine<V, S> {
    /// Structural equality over the node store. Cursors and conflict policy
    /// are construction state, not machine identity.
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl<V: Payload, S: Symbol> std::fmt::Debug for StateMachine<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("nodes", &self.nodes.len())
            .field("cursors", &self.cursors)
            .finish()
    }
}

impl<V: Payload, S: Symbol> StateMachine<V, S> {
    pub fn new() -> Self {
        let mut nodes = NodeStore::new();
        nodes.push_blank(); // root, handle 1
        Self {
            nodes,
            cursors: smallvec![NodeId::ROOT],
            on_conflict: Conflict::Error,
        }
    }

    /// The root node.
    pub fn root(&self) -> &Node<S, V> {
        &self.nodes[NodeId::ROOT]
    }

    /// Number of nodes currently in the store, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The current insertion frontier.
    pub fn cursors(&self) -> &[NodeId] {
        &self.cursors
    }

    /// Set the conflict policy for subsequent operations.
    pub fn conflict(&mut self, policy: Conflict) -> &mut Self {
        self.on_conflict = policy;
        self
    }

    /// Reset the cursor set to the root.
    pub fn goback(&mut self) -> &mut Self {
        self.cursors = smallvec![NodeId::ROOT];
        self
    }

    /// Match `seq` exactly: one cursor transition per element.
    pub fn match_sequence(&mut self, seq: &[S]) -> &mut Self {
        for sym in seq {
            self.cursor_transition(&Key::Sym(sym.clone()));
        }
        self
    }

    /// Match any one of `choices`.
    ///
    /// All initially-absent (cursor, key) pairs share a single fresh
    /// destination, so the alternation collapses to one state when possible;
    /// keys a cursor already covers contribute their existing destinations.
    pub fn match_any_of(&mut self, choices: &[S]) -> &mut Self {
        let initial = self.cursors.clone();
        let mut fresh = NodeId::NULL;
        let mut next = CursorSet::new();
        for choice in choices {
            let key = Key::Sym(choice.clone());
            for &cur in &initial {
                let dest = self.nodes[cur].transition(&key);
                if dest.is_null() {
                    if fresh.is_null() {
                        fresh = self.nodes.push_blank();
                        next.push(fresh);
                    }
                    self.nodes[cur].set_transition(&key, fresh);
                } else if !next.contains(&dest) {
                    next.push(dest);
                }
            }
        }
        self.cursors = next;
        self
    }

    /// Cursor transition on the EOF key (matched in file-mode full matching).
    pub fn match_eof(&mut self) -> &mut Self {
        self.cursor_transition(&Key::Eof);
        self
    }

    /// Branch for every input the cursors have no explicit entry for.
    ///
    /// A single fresh node becomes the default destination of every cursor;
    /// an occupied default slot goes through the conflict policy.
    pub fn match_default(&mut self) -> Result<&mut Self, TablewalkError> {
        let fresh = self.nodes.push_blank();
        let mut next: CursorSet = smallvec![fresh];
        for cur in self.cursors.clone() {
            let existing = self.nodes[cur].transition(&Key::Default);
            if existing.is_null() {
                self.nodes[cur].set_transition(&Key::Default, fresh);
            } else if existing != fresh {
                match self.on_conflict {
                    Conflict::Skip => {
                        if !next.contains(&existing) {
                            next.push(existing);
                        }
                    }
                    Conflict::Overwrite => {
                        self.nodes[cur].set_transition(&Key::Default, fresh);
                    }
                    Conflict::Error => {
                        return Err(TablewalkError::DefaultConflict {
                            node: cur.get(),
                            existing: existing.get(),
                            attempted: fresh.get(),
                        })
                    }
                }
            }
        }
        self.cursors = next;
        Ok(self)
    }

    /// Write `value` at every cursor, then reset the cursors to the root.
    pub fn commit(&mut self, value: V) -> Result<&mut Self, TablewalkError> {
        self.commit_continue(value)?;
        self.goback();
        Ok(self)
    }

    /// Write `value` at every cursor and keep building from here.
    pub fn commit_continue(&mut self, value: V) -> Result<&mut Self, TablewalkError> {
        self.commit_cell(AcceptValue::new(value))?;
        Ok(self)
    }

    /// As [`commit`](Self::commit), with a look-back count: non-full-match
    /// modes will report the accept position `back_by` transitions early,
    /// leaving that many trailing symbols unconsumed.
    pub fn commit_with_lookback(
        &mut self,
        value: V,
        back_by: usize,
    ) -> Result<&mut Self, TablewalkError> {
        self.commit_cell(AcceptValue::with_back_by(value, back_by))?;
        self.goback();
        Ok(self)
    }

    fn commit_cell(&mut self, cell: AcceptValue<V>) -> Result<&mut Self, TablewalkError> {
        let policy = self.on_conflict;
        for cur in self.cursors.clone() {
            let existing = self.nodes[cur].value.clone();
            match existing {
                None => self.nodes[cur].value = Some(cell.clone()),
                Some(ref e) if *e == cell => {}
                Some(e) => match policy {
                    Conflict::Skip => {}
                    Conflict::Overwrite => self.nodes[cur].value = Some(cell.clone()),
                    Conflict::Error => {
                        return Err(TablewalkError::ValueConflict {
                            node: cur.get(),
                            existing: format!("{:?}", e),
                            attempted: format!("{:?}", cell),
                        })
                    }
                },
            }
        }
        Ok(self)
    }

    /// Match the given pure pattern (sub-expression embedding).
    pub fn match_pattern(&mut self, pattern: &Regex<S>) -> Result<&mut Self, TablewalkError> {
        let consumed = self.consume_pattern_except_root(pattern);
        let root_transitions = consumed.root_transitions(pattern);
        let mut terminals = consumed.terminals;
        for cursor in self.cursors.clone() {
            for (key, dest) in &root_transitions {
                let created = self.link_nonambiguous(cursor, key, *dest, &terminals)?;
                terminals.extend(created);
            }
        }
        self.cursors = terminals.into_iter().collect();
        Ok(self)
    }

    /// Match the pattern zero or one time (the `?` operator).
    pub fn match_optionally(&mut self, pattern: &Regex<S>) -> Result<&mut Self, TablewalkError> {
        let before = self.cursors.clone();
        self.match_pattern(pattern)?;
        for cur in before {
            if !self.cursors.contains(&cur) {
                self.cursors.push(cur);
            }
        }
        Ok(self)
    }

    /// Match the pattern one or more times (the `+` operator).
    pub fn match_many(&mut self, pattern: &Regex<S>) -> Result<&mut Self, TablewalkError> {
        self.match_pattern(pattern)?;
        self.match_many_optionally(pattern)
    }

    /// Match the pattern zero or more times (the `*` operator).
    ///
    /// Installs the Kleene cycle by folding the pattern's accepting frontier
    /// back into its beginning, then links the cycle into every current
    /// cursor. Clones that replace accepting nodes during linking join the
    /// final cursor set.
    pub fn match_many_optionally(
        &mut self,
        pattern: &Regex<S>,
    ) -> Result<&mut Self, TablewalkError> {
        let cursors_before = self.cursors.clone();
        let consumed = self.consume_pattern_except_root(pattern);
        let root_transitions = consumed.root_transitions(pattern);
        let mut terminals = consumed.terminals.clone();

        // The cycle: every sub-terminal re-enters the pattern the way its
        // root does.
        for (key, dest) in &root_transitions {
            for &terminal in &consumed.terminals {
                let created = self.link_nonambiguous(terminal, key, *dest, &terminals)?;
                terminals.extend(created);
            }
        }

        // The entry: every pre-merge cursor can step into the cycle.
        for (key, dest) in &root_transitions {
            for &cursor in &cursors_before {
                let created = self.link_nonambiguous(cursor, key, *dest, &terminals)?;
                terminals.extend(created);
            }
        }

        let mut next = cursors_before;
        for t in terminals {
            if !next.contains(&t) {
                next.push(t);
            }
        }
        self.cursors = next;
        Ok(self)
    }

    /// Dump a textual representation of the machine to stdout.
    pub fn print_dbg(&self) {
        print!("{}", self.dump());
    }

    //
    // Internals
    //

    /// Step every cursor along `key`, materializing one shared fresh node for
    /// cursors that lack the transition. Not loop-aware and not
    /// collision-resolving; composition goes through `link_nonambiguous`.
    pub(crate) fn cursor_transition(&mut self, key: &Key<S>) {
        let mut with_child: CursorSet = CursorSet::new();
        let mut without_child: CursorSet = CursorSet::new();
        for &cur in &self.cursors {
            if self.nodes[cur].transition(key).is_null() {
                without_child.push(cur);
            } else {
                with_child.push(cur);
            }
        }

        let mut next = CursorSet::new();
        if !without_child.is_empty() {
            // One fresh destination serves every cursor that lacked the key.
            let fresh = self.nodes.push_blank();
            next.push(fresh);
            for cur in without_child {
                self.nodes[cur].set_transition(key, fresh);
            }
        }
        for cur in with_child {
            let dest = self.nodes[cur].transition(key);
            if !next.contains(&dest) {
                next.push(dest);
            }
        }
        self.cursors = next;
    }

    /// Clone `pattern`'s non-root nodes into this store, translating every
    /// internal handle by a fixed offset. Accepting cells are not copied; the
    /// accepting frontier is carried out as the sub-terminal list.
    fn consume_pattern_except_root(&mut self, pattern: &Regex<S>) -> Consumed {
        let base = self.nodes.len() - 1;
        let mut mapping = FxHashMap::default();
        let mut terminals = Vec::new();
        for old_id in pattern.nodes.ids().skip(1) {
            let old = &pattern.nodes[old_id];
            let mut node: Node<S, V> = Node::new();
            old.each_transition(|key, dest| node.set_transition(&key, dest.offset_by(base)));
            let new_id = self.nodes.push(node);
            mapping.insert(old_id, new_id);
            if old.is_accepting() {
                terminals.push(new_id);
            }
        }
        Consumed { mapping, terminals }
    }

    /// Install an effective transition `from --key--> to` without disturbing
    /// any pre-existing transition of `from` on `key`.
    ///
    /// Never modifies `to`; collisions are resolved by cloning the current
    /// destination into a merge node and folding `to`'s behavior into the
    /// clone, recursing where their outgoing transitions collide in turn.
    /// Returns the clones created as surrogates for members of `watch`.
    pub(crate) fn link_nonambiguous(
        &mut self,
        from: NodeId,
        key: &Key<S>,
        to: NodeId,
        watch: &[NodeId],
    ) -> Result<Vec<NodeId>, TablewalkError> {
        // A terminating merge never recurses deeper than the graph it walks;
        // blowing this bound means an ambiguous cyclic merge.
        let limit = self.nodes.len() * 2 + 64;
        self.link_step(from, key, to, watch, 0, limit)
    }

    fn link_step(
        &mut self,
        from: NodeId,
        key: &Key<S>,
        to: NodeId,
        watch: &[NodeId],
        depth: usize,
        limit: usize,
    ) -> Result<Vec<NodeId>, TablewalkError> {
        assert!(!from.is_null(), "tried to link from a null node");
        assert!(!to.is_null(), "tried to link to a null node");
        assert!(
            depth <= limit,
            "non-ambiguous link from {:?} via {} does not terminate",
            from,
            key.render()
        );

        let current = self.nodes[from].transition(key);
        if current.is_null() {
            self.nodes[from].set_transition(key, to);
            return Ok(Vec::new());
        }
        if current == to {
            return Ok(Vec::new());
        }

        // Conflict. Clone the current destination into a merge node, fixing
        // self-references so edges that pointed at the old destination now
        // point at the clone.
        let mut clone = self.nodes[current].clone();
        let merge = NodeId::from_raw(self.nodes.len() + 1);
        clone.table.retarget(|d| if d == current { merge } else { d });
        let pushed = self.nodes.push(clone);
        debug_assert_eq!(pushed, merge);

        let mut tracked = Vec::new();
        if watch.contains(&to) || watch.contains(&current) {
            tracked.push(merge);
        }

        // Accepting-cell propagation from `to` into the merge node.
        if let Some(incoming) = self.nodes[to].value.clone() {
            let policy = self.on_conflict;
            let existing = self.nodes[merge].value.clone();
            match existing {
                None => self.nodes[merge].value = Some(incoming),
                Some(ref e) if *e == incoming => {}
                Some(e) => match policy {
                    Conflict::Skip => {}
                    Conflict::Overwrite => self.nodes[merge].value = Some(incoming),
                    Conflict::Error => {
                        return Err(TablewalkError::ValueConflict {
                            node: merge.get(),
                            existing: format!("{:?}", e),
                            attempted: format!("{:?}", incoming),
                        })
                    }
                },
            }
        }

        // Fold `to`'s transitions into the merge node. The keys to reconcile
        // are every live transition of `to`, plus any self-loop slot of the
        // merge node on a key `to` lacks.
        let mut keys: Vec<Key<S>> = self.nodes[to]
            .transitions()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        self.nodes[merge].each_transition(|k, d| {
            if d == merge && !keys.contains(&k) {
                keys.push(k);
            }
        });

        for k in keys {
            let to_dest = self.nodes[to].transition(&k);
            let merge_dest = self.nodes[merge].transition(&k);

            if merge_dest == merge && to_dest.is_null() {
                // The clone self-loops where `to` has nothing: restore the
                // loop through the original destination so the clone stays
                // pure.
                self.nodes[merge].set_transition(&k, current);
            } else if to_dest == to && merge_dest.is_null() {
                // `to` self-loops where the clone has nothing.
                self.nodes[merge].set_transition(&k, current);
            } else if to_dest == to && merge_dest == merge {
                // Both self-loop; the merge node keeps looping on itself.
            } else if to_dest.is_null() {
                // Nothing to merge on this key.
            } else {
                let created = self.link_step(merge, &k, to_dest, watch, depth + 1, limit)?;
                tracked.extend(created);
            }
        }

        self.nodes[from].set_transition(key, merge);
        Ok(tracked)
    }
}

impl<S: Symbol> Regex<S> {
    /// Mark every current cursor as accepting.
    pub fn terminal(&mut self) -> Result<&mut Self, TablewalkError> {
        self.exit_point(0)
    }

    /// Mark every current cursor as accepting with a look-back count: the
    /// non-full-match modes report the accept position `back_by` transitions
    /// early, leaving the trailing symbols unconsumed for later matches.
    pub fn exit_point(&mut self, back_by: usize) -> Result<&mut Self, TablewalkError> {
        let policy = self.on_conflict;
        for cur in self.cursors.clone() {
            let existing = self.nodes[cur].value.as_ref().map(|cell| cell.back_by);
            match existing {
                None => {
                    self.nodes[cur].value = Some(AcceptValue::with_back_by((), back_by));
                }
                Some(prior) if prior == back_by => {}
                Some(prior) => match policy {
                    Conflict::Skip => {}
                    Conflict::Overwrite => {
                        self.nodes[cur].value = Some(AcceptValue::with_back_by((), back_by));
                    }
                    Conflict::Error => {
                        return Err(TablewalkError::LookbackConflict {
                            node: cur.get(),
                            existing: prior,
                            attempted: back_by,
                        })
                    }
                },
            }
        }
        Ok(self)
    }
}
