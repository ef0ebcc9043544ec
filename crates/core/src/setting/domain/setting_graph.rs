//! Co-occurrence graph over per-person setting clusters.
//!
//! Two clusters are linked when faces carrying them appear in the same
//! frame. Connected components are found with union-find and numbered in
//! node-discovery order, so global IDs are reproducible for a given input
//! order.

use std::collections::{HashMap, HashSet};

use crate::shared::setting_id::{GlobalSettingId, SettingId};

#[derive(Debug, Default)]
pub struct SettingGraph {
    nodes: Vec<SettingId>,
    index: HashMap<SettingId, usize>,
    parent: Vec<usize>,
    edges: HashSet<(usize, usize)>,
}

impl SettingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node if unseen and returns its discovery index.
    pub fn add_node(&mut self, id: SettingId) -> usize {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(id);
        self.index.insert(id, idx);
        self.parent.push(idx);
        idx
    }

    /// Records that all `ids` were seen together in one frame: adds each as
    /// a node and links every distinct pair.
    pub fn add_co_occurrence(&mut self, ids: &[SettingId]) {
        let indices: Vec<usize> = ids.iter().map(|&id| self.add_node(id)).collect();
        for (pos, &a) in indices.iter().enumerate() {
            for &b in &indices[pos + 1..] {
                if a != b {
                    self.edges.insert((a.min(b), a.max(b)));
                    union(&mut self.parent, a, b);
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Numbers connected components in the order their first node was
    /// discovered.
    pub fn components(&mut self) -> SettingComponents {
        let mut root_to_global: HashMap<usize, GlobalSettingId> = HashMap::new();
        let mut assignment = HashMap::with_capacity(self.nodes.len());

        for idx in 0..self.nodes.len() {
            let root = find(&mut self.parent, idx);
            let next = GlobalSettingId(root_to_global.len());
            let global = *root_to_global.entry(root).or_insert(next);
            assignment.insert(self.nodes[idx], global);
        }

        SettingComponents {
            assignment,
            count: root_to_global.len(),
        }
    }
}

/// Mapping from every per-person setting cluster to its global setting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingComponents {
    assignment: HashMap<SettingId, GlobalSettingId>,
    count: usize,
}

impl SettingComponents {
    pub fn get(&self, id: &SettingId) -> Option<GlobalSettingId> {
        self.assignment.get(id).copied()
    }

    /// Number of global settings.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Find root of element `i` with path halving for amortized near-O(1).
fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Merge the sets containing `a` and `b`.
fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}
