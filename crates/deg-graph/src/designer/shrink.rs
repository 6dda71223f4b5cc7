//! Removal of a vertex and repair of the affected neighborhood.

use super::improve::improve_edge;
use super::reachability::{ReachabilityAnalyzer, ReachableGroup};
use super::DesignerConfig;
use crate::graph::{Label, RegularGraph, VertexId};
use crate::{GraphError, Result};

use super::extend::ImproveStats;

/// Remove `label` and restore the degree of its former neighbors.
///
/// The former neighbors are grouped by reachability. Isolated vertices are
/// attached to groups with spare missing edges, the remaining groups are
/// chained together, and vertices still missing edges are paired directly
/// or through a swap with a nearby edge.
pub(crate) fn shrink_graph(
    graph: &mut RegularGraph,
    config: &DesignerConfig,
    label: Label,
) -> Result<ImproveStats> {
    let edges_per_vertex = graph.edges_per_vertex();
    let mut involved: Vec<VertexId> = graph.remove_vertex_by_label(label)?.into_keys().collect();
    involved.sort_unstable();

    // too few vertices left for a regular graph, the rest is fully connected
    if graph.len() <= edges_per_vertex {
        return Ok(ImproveStats::default());
    }

    let mut new_edges: Vec<(VertexId, VertexId, f32)> = Vec::new();
    let mut groups = ReachabilityAnalyzer::analyze(graph, &involved);

    attach_isolated(graph, &mut groups, &mut new_edges);
    let remaining = connect_groups(graph, groups, &mut new_edges)?;
    pair_deficient(graph, &remaining, &mut new_edges);
    rewire_deficient(graph, &remaining, &mut new_edges)?;

    for &vertex in &involved {
        let degree = graph.vertex(vertex).map(|v| v.degree()).unwrap_or(0);
        if degree != edges_per_vertex {
            tracing::error!(label, vertex, degree, "degree not restored after removal");
            return Err(GraphError::Inconsistent(format!(
                "vertex {} has {} edges after removing label {}, expected {}",
                vertex, degree, label, edges_per_vertex
            )));
        }
    }

    let mut stats = ImproveStats::default();
    if config.improve_after_remove && config.improve_k > 0 {
        new_edges.sort_by(|a, b| b.2.total_cmp(&a.2));
        for (a, b, weight) in new_edges {
            if graph.edge_weight(a, b) != Some(weight) {
                continue;
            }
            stats.tries += 1;
            if improve_edge(graph, config, a, b, weight) {
                stats.improved += 1;
            }
        }
    }
    Ok(stats)
}

fn add_edge(
    graph: &mut RegularGraph,
    new_edges: &mut Vec<(VertexId, VertexId, f32)>,
    a: VertexId,
    b: VertexId,
    weight: f32,
) {
    if graph.add_undirected_edge(a, b, weight) {
        new_edges.push((a, b, weight));
    }
}

/// Connect every isolated vertex to the closest missing-edge vertex of a
/// group that can spare an edge.
fn attach_isolated(
    graph: &mut RegularGraph,
    groups: &mut Vec<ReachableGroup>,
    new_edges: &mut Vec<(VertexId, VertexId, f32)>,
) {
    let isolated: Vec<VertexId> = groups
        .iter()
        .filter(|g| g.size() == 1)
        .map(|g| g.vertex())
        .collect();

    for vertex in isolated {
        let Some(position) = groups.iter().position(|g| g.vertex() == vertex) else {
            continue;
        };
        if groups[position].size() > 1 {
            continue;
        }

        let mut best: Option<(usize, VertexId, f32)> = None;
        for (index, group) in groups.iter().enumerate() {
            if index == position || group.missing_edges().len() <= 2 {
                continue;
            }
            for &candidate in group.missing_edges() {
                if graph.has_edge(vertex, candidate) {
                    continue;
                }
                let distance = graph.distance(vertex, candidate);
                if best.map_or(true, |(_, _, d)| distance < d) {
                    best = Some((index, candidate, distance));
                }
            }
        }

        let Some((index, candidate, distance)) = best else {
            continue;
        };
        add_edge(graph, new_edges, vertex, candidate, distance);

        let mut isolated_group = groups.remove(position);
        isolated_group.has_edge(vertex);
        let target = if index > position { index - 1 } else { index };
        groups[target].has_edge(candidate);
        groups[target].merge(isolated_group);
    }
}

/// Chain all groups into one by connecting the closest missing-edge pair of
/// the two smallest groups until one group is left. Returns the missing-edge
/// vertices of that group.
fn connect_groups(
    graph: &mut RegularGraph,
    mut groups: Vec<ReachableGroup>,
    new_edges: &mut Vec<(VertexId, VertexId, f32)>,
) -> Result<Vec<VertexId>> {
    groups.sort_by(|a, b| b.size().cmp(&a.size()).then(a.vertex().cmp(&b.vertex())));

    while groups.len() >= 2 {
        let Some(mut smallest) = groups.pop() else {
            break;
        };
        let Some(other) = groups.last_mut() else {
            break;
        };

        let mut best: Option<(VertexId, VertexId, f32)> = None;
        for &a in smallest.missing_edges() {
            for &b in other.missing_edges() {
                if a == b || graph.has_edge(a, b) {
                    continue;
                }
                let distance = graph.distance(a, b);
                if best.map_or(true, |(_, _, d)| distance < d) {
                    best = Some((a, b, distance));
                }
            }
        }

        let Some((a, b, distance)) = best else {
            return Err(GraphError::Inconsistent(format!(
                "cannot connect group of vertex {} to group of vertex {}",
                smallest.vertex(),
                other.vertex()
            )));
        };
        add_edge(graph, new_edges, a, b, distance);
        smallest.has_edge(a);
        other.has_edge(b);
        other.merge(smallest);
    }

    Ok(groups
        .pop()
        .map(|g| g.missing_edges().iter().copied().collect())
        .unwrap_or_default())
}

fn is_deficient(graph: &RegularGraph, vertex: VertexId) -> bool {
    graph
        .vertex(vertex)
        .map_or(false, |v| v.degree() < graph.edges_per_vertex())
}

/// Connect deficient vertices to the closest later deficient vertex they are
/// not adjacent to.
fn pair_deficient(
    graph: &mut RegularGraph,
    remaining: &[VertexId],
    new_edges: &mut Vec<(VertexId, VertexId, f32)>,
) {
    for (i, &a) in remaining.iter().enumerate() {
        if !is_deficient(graph, a) {
            continue;
        }

        let mut best: Option<(VertexId, f32)> = None;
        for &b in &remaining[i + 1..] {
            if !is_deficient(graph, b) || graph.has_edge(a, b) {
                continue;
            }
            let distance = graph.distance(a, b);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((b, distance));
            }
        }

        if let Some((b, distance)) = best {
            add_edge(graph, new_edges, a, b, distance);
        }
    }
}

/// Deficient vertices left at this point are adjacent to each other. For a
/// deficient pair (A, C), find B near A and an edge (B, D) with D near C,
/// then replace (B, D) by (A, B) and (C, D).
fn rewire_deficient(
    graph: &mut RegularGraph,
    remaining: &[VertexId],
    new_edges: &mut Vec<(VertexId, VertexId, f32)>,
) -> Result<()> {
    for (i, &a) in remaining.iter().enumerate() {
        if !is_deficient(graph, a) {
            continue;
        }

        // closest neighbor of a neighbor of A which A is not adjacent to
        let mut vertex_b: Option<(VertexId, f32)> = None;
        if let Some(vertex) = graph.vertex(a) {
            for neighbor in vertex.edges().ids() {
                let Some(neighbor_vertex) = graph.vertex(neighbor) else {
                    continue;
                };
                for candidate in neighbor_vertex.edges().ids() {
                    if candidate == a || graph.has_edge(a, candidate) {
                        continue;
                    }
                    let distance = graph.distance(a, candidate);
                    if vertex_b.map_or(true, |(_, d)| distance < d) {
                        vertex_b = Some((candidate, distance));
                    }
                }
            }
        }

        let Some(&c) = remaining[i + 1..].iter().find(|&&c| is_deficient(graph, c)) else {
            continue;
        };
        // an earlier rewire may have freed the direct edge
        if !graph.has_edge(a, c) {
            let distance = graph.distance(a, c);
            add_edge(graph, new_edges, a, c, distance);
            continue;
        }
        let Some((b, weight_ab)) = vertex_b else {
            return Err(GraphError::Inconsistent(format!(
                "no rewiring candidate for vertex {}",
                a
            )));
        };

        let mut vertex_d: Option<(VertexId, f32)> = None;
        if let Some(vertex) = graph.vertex(b) {
            for candidate in vertex.edges().ids() {
                if candidate == a || candidate == c || graph.has_edge(c, candidate) {
                    continue;
                }
                let distance = graph.distance(c, candidate);
                if vertex_d.map_or(true, |(_, d)| distance < d) {
                    vertex_d = Some((candidate, distance));
                }
            }
        }
        let Some((d, weight_cd)) = vertex_d else {
            return Err(GraphError::Inconsistent(format!(
                "no edge of vertex {} can be rewired to vertex {}",
                b, c
            )));
        };

        graph.remove_undirected_edge(b, d);
        add_edge(graph, new_edges, a, b, weight_ab);
        add_edge(graph, new_edges, c, d, weight_cd);
    }
    Ok(())
}
