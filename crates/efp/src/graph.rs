//! Follow-graph replay over the canonical log.
//!
//! The log must be in chronological order; follow/unfollow and tag/untag do not commute.
//! Orphaned tags (tag whose follow edge is gone) are pruned once, after the full replay.

use crate::codec::Opcode;
use crate::reconcile::CanonicalOperation;
use alloy::primitives::Address;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Which side of an edge is the map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// list user → accounts it follows.
    Following,
    /// record address → accounts following it.
    Followers,
}

impl Direction {
    /// (key, counterpart) for one op.
    fn endpoints(self, op: &CanonicalOperation) -> (Address, Address) {
        let follower = op.list_user_address;
        let leader = op.list_op.operation.record_address;
        match self {
            Direction::Following => (follower, leader),
            Direction::Followers => (leader, follower),
        }
    }
}

/// A tag attached by (or to) a key address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagEntry {
    pub address: Address,
    pub tag: String,
}

/// Replayed graph. Keys never map to empty collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphState {
    pub direction: Direction,
    pub edges: BTreeMap<Address, BTreeSet<Address>>,
    pub tags: BTreeMap<Address, BTreeSet<TagEntry>>,
}

impl GraphState {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            edges: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Apply one op. Does not prune tags; see [GraphState::prune_orphan_tags].
    pub fn apply(&mut self, op: &CanonicalOperation) {
        let (key, counterpart) = self.direction.endpoints(op);
        match op.list_op.operation.opcode {
            Opcode::Follow => {
                self.edges.entry(key).or_default().insert(counterpart);
            }
            Opcode::Unfollow => {
                if let Some(set) = self.edges.get_mut(&key) {
                    set.remove(&counterpart);
                    if set.is_empty() {
                        self.edges.remove(&key);
                    }
                }
            }
            Opcode::Tag => {
                self.tags.entry(key).or_default().insert(TagEntry {
                    address: counterpart,
                    tag: op.list_op.operation.tag.clone(),
                });
            }
            Opcode::Untag => {
                if let Some(set) = self.tags.get_mut(&key) {
                    set.retain(|t| !(t.address == counterpart && t.tag == op.list_op.operation.tag));
                    if set.is_empty() {
                        self.tags.remove(&key);
                    }
                }
            }
            Opcode::Unknown(code) => {
                tracing::trace!(code, "unknown opcode, skipping");
            }
        }
    }

    /// Drop tags whose counterpart is no longer an edge of the same key.
    pub fn prune_orphan_tags(&mut self) {
        let edges = &self.edges;
        self.tags.retain(|key, entries| {
            match edges.get(key) {
                Some(followed) => entries.retain(|t| followed.contains(&t.address)),
                None => entries.clear(),
            }
            !entries.is_empty()
        });
    }

    /// One account's slice of the graph.
    pub fn view(&self, address: Address) -> GraphView {
        let edges: Vec<Address> = self
            .edges
            .get(&address)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        let tags: Vec<TagEntry> = self
            .tags
            .get(&address)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        GraphView {
            address,
            direction: self.direction,
            count: edges.len(),
            edges,
            tags,
        }
    }
}

/// Per-account projection of a [GraphState].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphView {
    pub address: Address,
    pub direction: Direction,
    pub edges: Vec<Address>,
    pub count: usize,
    pub tags: Vec<TagEntry>,
}

/// Replay `log` in order, then prune orphaned tags.
pub fn replay(log: &[CanonicalOperation], direction: Direction) -> GraphState {
    let mut state = GraphState::new(direction);
    for op in log {
        state.apply(op);
    }
    state.prune_orphan_tags();
    tracing::debug!(
        ?direction,
        keys = state.edges.len(),
        tagged_keys = state.tags.len(),
        "replayed canonical log"
    );
    state
}
