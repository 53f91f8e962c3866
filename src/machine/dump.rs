//! Human-readable dump of a machine's node graph.
//!
//! One block per node: the handle, an accepting marker (with the payload for
//! valued machines), a cursor marker, then one line per non-null transition.
//! The exact layout is advisory; tests should assert on the key/destination
//! tuples, not on whitespace.

use super::builder::StateMachine;
use super::node::Payload;
use super::table::Symbol;

impl<V: Payload, S: Symbol> StateMachine<V, S> {
    /// Render the whole machine, one block per node.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for id in self.nodes.ids() {
            let node = &self.nodes[id];
            out.push_str(&format!("#{}", id.get()));
            if let Some(cell) = node.accept() {
                let rendered = format!("{:?}", cell.value);
                if rendered == "()" {
                    out.push_str(" (terminal");
                } else {
                    out.push_str(&format!(" (terminal val: '{}'", rendered));
                }
                if cell.back_by > 0 {
                    out.push_str(&format!(" back {}", cell.back_by));
                }
                out.push(')');
            }
            if self.cursors.contains(&id) {
                out.push_str(" [cursor]");
            }
            if node.is_null() {
                out.push_str(" NULL");
            }
            out.push_str(" >>\n");
            node.each_transition(|key, dest| {
                out.push_str(&format!(" |  {} -> #{}\n", key.render(), dest.get()));
            });
            out.push('\n');
        }
        out
    }
}
