//! Grouping of the vertices affected by a removal by mutual reachability.

use crate::graph::{RegularGraph, VertexId};
use std::collections::{BTreeSet, HashMap};

/// Parent pointers over vertex ids. Only ids that were updated are members.
#[derive(Debug, Default)]
pub(crate) struct UnionFind {
    parents: HashMap<VertexId, VertexId>,
}

impl UnionFind {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            parents: HashMap::with_capacity(capacity),
        }
    }

    /// Root of the set containing `element`, `None` if it is no member.
    pub fn find(&self, element: VertexId) -> Option<VertexId> {
        let mut current = element;
        loop {
            let parent = *self.parents.get(&current)?;
            if parent == current {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Point `element` at `parent`. Callers pass roots obtained via `find`.
    pub fn update(&mut self, element: VertexId, parent: VertexId) {
        self.parents.insert(element, parent);
    }
}

/// Vertices which can reach each other, and those of them missing an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachableGroup {
    vertex: VertexId,
    missing_edges: BTreeSet<VertexId>,
    reachable: BTreeSet<VertexId>,
}

impl ReachableGroup {
    pub fn new(vertex: VertexId) -> Self {
        Self {
            vertex,
            missing_edges: BTreeSet::from([vertex]),
            reachable: BTreeSet::from([vertex]),
        }
    }

    /// The vertex the group was created for.
    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    /// Number of involved vertices in the group.
    pub fn size(&self) -> usize {
        self.reachable.len()
    }

    pub fn missing_edges(&self) -> &BTreeSet<VertexId> {
        &self.missing_edges
    }

    pub fn reachable(&self) -> &BTreeSet<VertexId> {
        &self.reachable
    }

    /// `vertex` got its missing edge back.
    pub fn has_edge(&mut self, vertex: VertexId) {
        self.missing_edges.remove(&vertex);
    }

    pub fn merge(&mut self, other: ReachableGroup) {
        if other.vertex == self.vertex {
            return;
        }
        self.missing_edges.extend(other.missing_edges);
        self.reachable.extend(other.reachable);
    }
}

/// Partitions the former neighbors of a removed vertex into groups that can
/// reach each other through the remaining edges.
pub struct ReachabilityAnalyzer;

impl ReachabilityAnalyzer {
    /// Group `involved` by reachability.
    ///
    /// Starting from the involved vertices, a breadth-first search expands
    /// level by level. After the first level only isolated groups keep
    /// expanding. The search stops once the groups with spare missing edges
    /// (more than two) can absorb every isolated vertex, or nothing is left to
    /// expand. Groups are returned sorted by their vertex.
    pub fn analyze(graph: &RegularGraph, involved: &[VertexId]) -> Vec<ReachableGroup> {
        let mut union_find = UnionFind::with_capacity(involved.len() * 4);
        // root -> group
        let mut groups: HashMap<VertexId, ReachableGroup> = HashMap::with_capacity(involved.len());
        for &vertex in involved {
            groups.insert(vertex, ReachableGroup::new(vertex));
            union_find.update(vertex, vertex);
        }

        let mut check: Vec<VertexId> = involved.to_vec();
        let mut check_next: Vec<VertexId> = Vec::new();
        let mut depth = 0usize;
        while !check.is_empty() && needs_more_connections(&groups) {
            for &check_vertex in &check {
                let Some(root) = union_find.find(check_vertex) else {
                    continue;
                };
                if depth > 0 && groups.get(&root).map_or(true, |g| g.size() > 1) {
                    continue;
                }
                let Some(vertex) = graph.vertex(check_vertex) else {
                    continue;
                };

                for neighbor in vertex.edges().ids() {
                    match union_find.find(neighbor) {
                        None => {
                            union_find.update(neighbor, root);
                            check_next.push(neighbor);
                        }
                        Some(other) if other != root => {
                            union_find.update(other, root);
                            if let Some(other_group) = groups.remove(&other) {
                                if let Some(group) = groups.get_mut(&root) {
                                    group.merge(other_group);
                                }
                            }
                        }
                        Some(_) => {}
                    }
                }
            }

            std::mem::swap(&mut check, &mut check_next);
            check_next.clear();
            depth += 1;
        }

        let mut result: Vec<ReachableGroup> = groups.into_values().collect();
        result.sort_by_key(|g| g.vertex);
        result
    }
}

/// True while the isolated groups outnumber the spare connections of the
/// larger groups.
fn needs_more_connections(groups: &HashMap<VertexId, ReachableGroup>) -> bool {
    let mut isolated = 0usize;
    let mut available = 0usize;
    for group in groups.values() {
        if group.size() == 1 {
            isolated += 1;
        } else if group.missing_edges.len() > 2 {
            available += group.missing_edges.len() - 2;
        }
    }
    available < isolated
}
