//! Post-construction graph optimization.
//!
//! Four passes run to a fixpoint: null-reference propagation, duplicate
//! fusion, orphan elimination, and blank compaction. None of them changes the
//! language the machine accepts, and running the whole pipeline twice is a
//! structural no-op.
//!
//! The cursor set survives optimization: fusion never merges a cursor-bearing
//! node with a cursor-free one (cursors are the writable frontier), and
//! compaction keeps cursor-held nodes and remaps the set. Handles taken out
//! of the machine before the call are invalidated by the renumbering.

use super::builder::StateMachine;
use super::node::Payload;
use super::store::{NodeId, NodeStore};
use super::table::{Symbol, TransitionTable};

impl<V: Payload, S: Symbol> StateMachine<V, S> {
    /// Minimize the machine: fuse behaviorally equal nodes, drop unreachable
    /// and null nodes, and renumber the survivors densely.
    ///
    /// The cursor set is carried through the renumbering, so construction can
    /// continue afterwards; handles obtained before the call are invalidated.
    pub fn optimize(&mut self) -> &mut Self {
        loop {
            self.nullify_null_refs();
            if !self.fuse_duplicates() {
                break;
            }
        }
        self.nullify_orphans();
        self.compact();
        self
    }

    /// A node is expendable when it is null, is not the root, and holds no
    /// cursor.
    fn is_expendable(&self, id: NodeId) -> bool {
        id != NodeId::ROOT && self.nodes[id].is_null() && !self.cursors.contains(&id)
    }

    /// Turn every transition into an expendable node into a null transition,
    /// re-evaluating nullness until it stops propagating up the graph.
    fn nullify_null_refs(&mut self) {
        let len = self.nodes.len();
        let mut expendable = vec![false; len + 1];
        for id in self.nodes.ids() {
            expendable[id.get()] = self.is_expendable(id);
        }

        loop {
            let mut changed = false;
            for id in self.nodes.ids() {
                if expendable[id.get()] {
                    continue;
                }
                self.nodes[id]
                    .table
                    .retarget(|d| if expendable[d.get()] { NodeId::NULL } else { d });
                if self.is_expendable(id) && !expendable[id.get()] {
                    expendable[id.get()] = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Fuse behaviorally equal nodes until none remain. Returns whether any
    /// fusion happened.
    fn fuse_duplicates(&mut self) -> bool {
        let mut fused_any = false;
        while self.fuse_duplicates_once() {
            fused_any = true;
        }
        fused_any
    }

    /// One reverse walk over the store. For each surviving node, earlier
    /// nodes with the same accepting cell, the same cursor membership, and a
    /// congruent transition vector are redirected into it and nullified.
    ///
    /// Fused chains tend to expose further duplicates, hence the outer loop.
    fn fuse_duplicates_once(&mut self) -> bool {
        let len = self.nodes.len();
        let mut has_cursor = vec![false; len + 1];
        for &cur in &self.cursors {
            has_cursor[cur.get()] = true;
        }

        let mut fused = false;
        // Reverse creation order, root excluded on both sides of the scan.
        for raw in (2..=len).rev() {
            let id = NodeId::from_raw(raw);
            if self.nodes[id].is_null() && !has_cursor[raw] {
                continue;
            }

            let mut duplicates = Vec::new();
            for other_raw in 2..raw {
                let other = NodeId::from_raw(other_raw);
                if self.nodes[other].is_null() && !has_cursor[other_raw] {
                    continue;
                }
                // Cursors are the writable frontier: a node holding one must
                // not fuse with a node that does not.
                if has_cursor[other_raw] != has_cursor[raw] {
                    continue;
                }
                if self.nodes[id].value != self.nodes[other].value {
                    continue;
                }
                if self.nodes[id]
                    .table
                    .congruent(id, &self.nodes[other].table, other)
                {
                    duplicates.push(other);
                }
            }

            for dup in duplicates {
                fused = true;
                for n in self.nodes.ids() {
                    self.nodes[n]
                        .table
                        .retarget(|d| if d == dup { id } else { d });
                }
                self.nodes[dup].nullify();
                has_cursor[dup.get()] = false;
            }
        }

        self.cursors = (1..=len)
            .filter(|&raw| has_cursor[raw])
            .map(NodeId::from_raw)
            .collect();
        fused
    }

    /// Nullify every node unreachable from the root and drop cursors that
    /// pointed into the unreachable region.
    fn nullify_orphans(&mut self) {
        let len = self.nodes.len();
        let mut reachable = vec![false; len + 1];
        reachable[NodeId::ROOT.get()] = true;
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            self.nodes[id].each_transition(|_, dest| {
                if !reachable[dest.get()] {
                    reachable[dest.get()] = true;
                    stack.push(dest);
                }
            });
        }

        for id in self.nodes.ids() {
            if !reachable[id.get()] {
                self.nodes[id].nullify();
            }
        }
        self.cursors.retain(|cur| reachable[cur.get()]);
    }

    /// Rebuild the store with only the root, non-null nodes, and cursor-held
    /// nodes, rewriting every transition and cursor through the new handle
    /// mapping.
    fn compact(&mut self) {
        let len = self.nodes.len();
        let mut mapping = vec![NodeId::NULL; len + 1];
        let mut compacted: NodeStore<S, V> = NodeStore::new();
        for id in self.nodes.ids() {
            let keep =
                id == NodeId::ROOT || !self.nodes[id].is_null() || self.cursors.contains(&id);
            if keep {
                let new_id = compacted.push(self.nodes[id].clone());
                mapping[id.get()] = new_id;
            }
        }

        for node in compacted.iter_mut() {
            node.table.retarget(|d| mapping[d.get()]);
        }
        for cur in self.cursors.iter_mut() {
            *cur = mapping[cur.get()];
        }
        self.nodes = compacted;
    }
}
