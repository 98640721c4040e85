//! Layering.
//!
//! `initial_rank` numbers every node by longest path from the sources, counting down from a large
//! start value: a node is ranked once all of its incoming edges have been scanned, one below its
//! lowest source. Ranks are then shifted so the lowest used rank is 0; the roots end up on the
//! highest rank. `fix_ranks` fills the rank lists and gives every edge spanning more than one rank
//! a placeholder on each rank in between.

use crate::model::{Cell, EdgeId, HierarchyModel, NodeId, Stage};
use std::collections::VecDeque;

const SOURCE_SCAN_START_RANK: i64 = 100_000_000;

/// Ranks the model and builds its rank lists. Returns the nodes the ranking scan could not
/// resolve; they are ranked from whatever sources were known.
pub fn run(model: &mut HierarchyModel, tighten_to_source: bool) -> Vec<NodeId> {
    let _span = tracing::debug_span!("layering", nodes = model.nodes.len()).entered();

    let unresolved = initial_rank(model, tighten_to_source);
    if !unresolved.is_empty() {
        let ids: Vec<&str> = unresolved
            .iter()
            .map(|n| model.nodes[n.0].vertex.as_str())
            .collect();
        tracing::warn!(
            count = unresolved.len(),
            vertices = ?ids,
            "rank scan stalled; ranking unresolved vertices from known sources"
        );
    }
    fix_ranks(model);
    model.build_adjacency();

    debug_assert!(
        !unresolved.is_empty() || model.edges.iter().all(|e| e.max_rank > e.min_rank),
        "edge spans no rank after layering"
    );
    model.advance(Stage::CyclesRemoved, Stage::Ranked);
    unresolved
}

/// Nodes the scan starts from: the roots, then any other node without incoming edges.
fn seeds(model: &HierarchyModel) -> Vec<NodeId> {
    let mut seeds = model.roots.clone();
    for (i, node) in model.nodes.iter().enumerate() {
        if node.connects_as_target.is_empty() && !seeds.contains(&NodeId(i)) {
            seeds.push(NodeId(i));
        }
    }
    seeds
}

/// Assigns `rank` on every node and sets `max_rank`. Returns the unresolved nodes.
pub fn initial_rank(model: &mut HierarchyModel, tighten_to_source: bool) -> Vec<NodeId> {
    let n = model.nodes.len();
    let mut rank: Vec<Option<i64>> = vec![None; n];
    let mut queued = vec![false; n];
    let mut scanned = vec![false; model.edges.len()];

    let seeds = seeds(model);
    let mut worklist: VecDeque<NodeId> = VecDeque::new();
    for &seed in &seeds {
        queued[seed.0] = true;
        worklist.push_back(seed);
    }

    let mut min_rank = SOURCE_SCAN_START_RANK;
    let mut deferred_in_a_row = 0usize;
    while let Some(&node) = worklist.front() {
        let lowest_source = lowest_scanned_source(model, &rank, &scanned, node);
        match lowest_source {
            Some(layer) => {
                worklist.pop_front();
                deferred_in_a_row = 0;
                rank[node.0] = Some(layer);
                min_rank = min_rank.min(layer);
                for &e in &model.nodes[node.0].connects_as_source {
                    scanned[e.0] = true;
                    let target = model.edges[e.0].target;
                    if !queued[target.0] {
                        queued[target.0] = true;
                        worklist.push_back(target);
                    }
                }
            }
            None => {
                worklist.rotate_left(1);
                deferred_in_a_row += 1;
                if deferred_in_a_row >= worklist.len() {
                    break;
                }
            }
        }
    }

    let mut unresolved: Vec<NodeId> = Vec::new();
    for node in worklist.iter().copied().chain((0..n).map(NodeId)) {
        if rank[node.0].is_none() && !unresolved.contains(&node) {
            unresolved.push(node);
        }
    }
    for &node in &unresolved {
        let layer = model.nodes[node.0]
            .connects_as_target
            .iter()
            .filter_map(|e| rank[model.edges[e.0].source.0].map(|r| r - 1))
            .min()
            .unwrap_or(SOURCE_SCAN_START_RANK);
        rank[node.0] = Some(layer);
        min_rank = min_rank.min(layer);
    }

    for (i, node) in model.nodes.iter_mut().enumerate() {
        let r = rank[i].unwrap_or(SOURCE_SCAN_START_RANK);
        node.rank = usize::try_from(r - min_rank).unwrap_or(0);
    }

    if tighten_to_source {
        for &seed in &seeds {
            let mut current_max = 0usize;
            let outgoing = model.nodes[seed.0].connects_as_source.clone();
            for e in outgoing {
                let target = model.edges[e.0].target;
                let candidate = current_max.max(model.nodes[target.0].rank + 1);
                model.nodes[seed.0].rank = candidate;
                current_max = candidate;
            }
        }
    }

    model.max_rank = model.nodes.iter().map(|n| n.rank).max().unwrap_or(0);
    unresolved
}

/// One below the lowest source rank once every incoming edge has been scanned; the start rank
/// for nodes without incoming edges.
fn lowest_scanned_source(
    model: &HierarchyModel,
    rank: &[Option<i64>],
    scanned: &[bool],
    node: NodeId,
) -> Option<i64> {
    let mut lowest = SOURCE_SCAN_START_RANK;
    for &e in &model.nodes[node.0].connects_as_target {
        if !scanned[e.0] {
            return None;
        }
        let source = model.edges[e.0].source;
        lowest = lowest.min(rank[source.0]? - 1);
    }
    Some(lowest)
}

/// Fills `model.ranks` in depth-first discovery order and inserts edge placeholders.
pub fn fix_ranks(model: &mut HierarchyModel) {
    model.ranks = vec![Vec::new(); model.max_rank + 1];
    let mut placed = vec![false; model.nodes.len()];

    let mut starts = seeds(model);
    starts.extend((0..model.nodes.len()).map(NodeId));
    for start in starts {
        if !placed[start.0] {
            place_from(model, &mut placed, start);
        }
    }
}

/// Depth-first placement from `start`, with an explicit stack of (node, outgoing edges, next index).
fn place_from(model: &mut HierarchyModel, placed: &mut [bool], start: NodeId) {
    let mut stack: Vec<(NodeId, Vec<EdgeId>, usize)> = Vec::new();
    if let Some(outgoing) = place(model, placed, None, start, None) {
        stack.push((start, outgoing, 0));
    }
    while let Some(frame) = stack.last_mut() {
        let (parent, index) = (frame.0, frame.2);
        let Some(&edge) = frame.1.get(index) else {
            stack.pop();
            continue;
        };
        frame.2 += 1;
        let target = model.edges[edge.0].target;
        if let Some(outgoing) = place(model, placed, Some(parent), target, Some(edge)) {
            stack.push((target, outgoing, 0));
        }
    }
}

/// Puts `node` on its rank list on a first visit and gives `via` its placeholders. Returns the
/// edges to follow on a first visit.
fn place(
    model: &mut HierarchyModel,
    placed: &mut [bool],
    parent: Option<NodeId>,
    node: NodeId,
    via: Option<EdgeId>,
) -> Option<Vec<EdgeId>> {
    let first_visit = !placed[node.0];
    if first_visit {
        placed[node.0] = true;
        let rank = model.nodes[node.0].rank;
        model.nodes[node.0].order = model.ranks[rank].len();
        model.ranks[rank].push(Cell::Node(node));
    }

    if let (Some(parent), Some(edge)) = (parent, via) {
        let top = model.nodes[parent.0].rank;
        // Only ranks from a stalled scan can put a target above its source; such an edge spans
        // no rank.
        let bottom = model.nodes[node.0].rank.min(top);
        model.edges[edge.0].reset_ranks(bottom, top);
        for rank in bottom + 1..top {
            let slot = model.ranks[rank].len();
            model.ranks[rank].push(Cell::Edge(edge));
            model.set_order(Cell::Edge(edge), rank, slot);
        }
    }

    first_visit.then(|| model.nodes[node.0].connects_as_source.clone())
}
