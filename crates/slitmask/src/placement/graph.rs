use super::conflict::{PlacementParams, conflicts};
use crate::slit::{Slit, SlitId};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

/// Undirected conflict graph over slit ids.
///
/// The graph is a snapshot: moving a slit afterwards does not update its edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictGraph {
    adjacency: BTreeMap<SlitId, BTreeSet<SlitId>>,
}

impl ConflictGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every slit as a node and joins each conflicting pair.
    /// Pairs are tested with the lower id first.
    pub fn build<'a>(slits: impl IntoIterator<Item = &'a Slit>, params: &PlacementParams) -> Self {
        let mut ordered: Vec<&Slit> = slits.into_iter().collect();
        ordered.sort_by_key(|slit| slit.id);
        ordered.dedup_by_key(|slit| slit.id);

        let mut graph = Self::new();
        for slit in &ordered {
            graph.add_node(slit.id);
        }
        for (one, two) in ordered.iter().tuple_combinations() {
            if conflicts(one, two, params) {
                graph.add_edge(one.id, two.id);
            }
        }
        graph
    }

    pub fn add_node(&mut self, id: SlitId) {
        self.adjacency.entry(id).or_default();
    }

    /// Joins two existing nodes. Self-loops and unknown ids are ignored.
    pub fn add_edge(&mut self, a: SlitId, b: SlitId) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) {
            return false;
        }
        let inserted = self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        inserted
    }

    pub fn remove_edge(&mut self, a: SlitId, b: SlitId) -> bool {
        let removed = self.adjacency.get_mut(&a).is_some_and(|n| n.remove(&b));
        if let Some(neighbors) = self.adjacency.get_mut(&b) {
            neighbors.remove(&a);
        }
        removed
    }

    /// Removes a node together with its incident edges
    pub fn remove_node(&mut self, id: SlitId) -> bool {
        let Some(neighbors) = self.adjacency.remove(&id) else {
            return false;
        };
        for neighbor in neighbors {
            if let Some(adjacent) = self.adjacency.get_mut(&neighbor) {
                adjacent.remove(&id);
            }
        }
        true
    }

    pub fn contains(&self, id: SlitId) -> bool {
        self.adjacency.contains_key(&id)
    }

    pub fn neighbors(&self, id: SlitId) -> impl Iterator<Item = SlitId> + '_ {
        self.adjacency.get(&id).into_iter().flatten().copied()
    }

    pub fn degree(&self, id: SlitId) -> Option<usize> {
        self.adjacency.get(&id).map(BTreeSet::len)
    }

    /// All nodes sharing the smallest degree, empty for an empty graph
    pub fn min_degree_nodes(&self) -> BTreeSet<SlitId> {
        let Some(min) = self.adjacency.values().map(BTreeSet::len).min() else {
            return BTreeSet::new();
        };
        self.adjacency
            .iter()
            .filter(|(_, neighbors)| neighbors.len() == min)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = SlitId> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }
}
