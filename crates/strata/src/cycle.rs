//! Cycle removal.
//!
//! A depth-first search from the roots inverts every edge that leads back to a node on the
//! current search path. Path membership is answered with ancestry fingerprints: a node's
//! fingerprint is its parent's plus the index of the edge it was reached through, and a node is
//! on the path of another exactly when its fingerprint is a proper prefix of the other's.

use crate::model::{EdgeId, HierarchyModel, NodeId, Stage};
use std::rc::Rc;

#[derive(Debug)]
struct Segment {
    value: usize,
    run: usize,
    depth: usize,
    parent: Option<Rc<Segment>>,
}

impl Drop for Segment {
    // Unlinks uniquely owned ancestors one at a time; deep search paths would otherwise drop
    // recursively.
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(segment) = parent {
            parent = match Rc::try_unwrap(segment) {
                Ok(mut owned) => owned.parent.take(),
                Err(_) => None,
            };
        }
    }
}

/// Immutable, structurally shared ancestry fingerprint.
#[derive(Debug, Clone)]
pub struct Fingerprint(Rc<Segment>);

impl Fingerprint {
    /// Fingerprint `[run, index]` of the `index`-th root of DFS run `run`.
    pub fn root(run: usize, index: usize) -> Self {
        let head = Rc::new(Segment {
            value: run,
            run,
            depth: 1,
            parent: None,
        });
        Fingerprint(head).child(index)
    }

    pub fn child(&self, index: usize) -> Self {
        Fingerprint(Rc::new(Segment {
            value: index,
            run: self.0.run,
            depth: self.0.depth + 1,
            parent: Some(Rc::clone(&self.0)),
        }))
    }

    pub fn len(&self) -> usize {
        self.0.depth
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn run(&self) -> usize {
        self.0.run
    }

    pub fn to_vec(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = Some(&self.0);
        while let Some(seg) = cursor {
            out.push(seg.value);
            cursor = seg.parent.as_ref();
        }
        out.reverse();
        out
    }

    /// True when `self` is a proper prefix of `other`.
    pub fn is_ancestor_of(&self, other: &Fingerprint) -> bool {
        if self.len() >= other.len() {
            return false;
        }
        let mut theirs = &other.0;
        while theirs.depth > self.0.depth {
            match theirs.parent.as_ref() {
                Some(p) => theirs = p,
                None => return false,
            }
        }
        let mut ours = &self.0;
        loop {
            if Rc::ptr_eq(ours, theirs) {
                return true;
            }
            if ours.value != theirs.value {
                return false;
            }
            match (ours.parent.as_ref(), theirs.parent.as_ref()) {
                (Some(a), Some(b)) => {
                    ours = a;
                    theirs = b;
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

struct Search {
    fingerprints: Vec<Option<Fingerprint>>,
    seen: Vec<bool>,
    run: usize,
    inverted: usize,
}

/// Inverts back edges so the model becomes acyclic. Returns the number of inverted edges.
pub fn run(model: &mut HierarchyModel) -> usize {
    let _span = tracing::debug_span!("cycle_removal", nodes = model.nodes.len()).entered();

    let n = model.nodes.len();
    let mut search = Search {
        fingerprints: vec![None; n],
        seen: vec![false; n],
        run: 0,
        inverted: 0,
    };

    let roots = model.roots.clone();
    for (i, &root) in roots.iter().enumerate() {
        search.fingerprints[root.0] = Some(Fingerprint::root(search.run, i));
        dfs(model, &mut search, root, i);
    }

    // Whatever the roots did not reach is swept from the first unseen node onwards.
    let unseen: Vec<NodeId> = (0..n).filter(|&i| !search.seen[i]).map(NodeId).collect();
    if !unseen.is_empty() {
        search.run += 1;
        for (i, &node) in unseen.iter().enumerate() {
            if search.seen[node.0] {
                continue;
            }
            search.fingerprints[node.0] = Some(Fingerprint::root(search.run, i));
            dfs(model, &mut search, node, i);
        }
    }

    debug_assert!(is_acyclic(model), "cycle removal left a cycle behind");
    tracing::debug!(inverted = search.inverted, "cycles removed");
    model.advance(Stage::Built, Stage::CyclesRemoved);
    search.inverted
}

/// Depth-first search from `start`, with an explicit stack of (node, outgoing edges, next index).
fn dfs(model: &mut HierarchyModel, search: &mut Search, start: NodeId, start_index: usize) {
    let mut stack: Vec<(NodeId, Vec<EdgeId>, usize)> = Vec::new();
    if let Some(outgoing) = enter(model, search, None, start, None, start_index) {
        stack.push((start, outgoing, 0));
    }
    while let Some(frame) = stack.last_mut() {
        let (parent, child_index) = (frame.0, frame.2);
        let Some(&edge) = frame.1.get(child_index) else {
            stack.pop();
            continue;
        };
        frame.2 += 1;
        let target = model.edges[edge.0].target;
        let outgoing = enter(model, search, Some(parent), target, Some(edge), child_index);
        if let Some(outgoing) = outgoing {
            stack.push((target, outgoing, 0));
        }
    }
}

/// Reaches `node` through `via`: refreshes its fingerprint, inverts `via` when it closes a cycle,
/// and returns the edges to follow on a first visit.
fn enter(
    model: &mut HierarchyModel,
    search: &mut Search,
    parent: Option<NodeId>,
    node: NodeId,
    via: Option<EdgeId>,
    child_index: usize,
) -> Option<Vec<EdgeId>> {
    if let Some(parent) = parent {
        let stale = search.fingerprints[node.0]
            .as_ref()
            .is_none_or(|fp| fp.run() != search.run);
        if stale {
            search.fingerprints[node.0] = search.fingerprints[parent.0]
                .as_ref()
                .map(|fp| fp.child(child_index));
        }
    }

    let first_visit = !search.seen[node.0];
    search.seen[node.0] = true;

    if let (Some(parent), Some(edge)) = (parent, via) {
        let back_edge = match (
            search.fingerprints[node.0].as_ref(),
            search.fingerprints[parent.0].as_ref(),
        ) {
            (Some(ours), Some(theirs)) => ours.is_ancestor_of(theirs),
            _ => false,
        };
        if back_edge {
            invert(model, parent, node, edge);
            search.inverted += 1;
        }
    }

    first_visit.then(|| model.nodes[node.0].connects_as_source.clone())
}

fn invert(model: &mut HierarchyModel, parent: NodeId, node: NodeId, edge: EdgeId) {
    model.edges[edge.0].invert();
    let p = &mut model.nodes[parent.0];
    p.connects_as_source.retain(|&e| e != edge);
    p.connects_as_target.push(edge);
    let c = &mut model.nodes[node.0];
    c.connects_as_target.retain(|&e| e != edge);
    c.connects_as_source.push(edge);
}

/// Kahn check over the current edge directions.
pub fn is_acyclic(model: &HierarchyModel) -> bool {
    let mut in_degree: Vec<usize> = vec![0; model.nodes.len()];
    for edge in &model.edges {
        in_degree[edge.target.0] += 1;
    }
    let mut ready: Vec<usize> = (0..model.nodes.len())
        .filter(|&i| in_degree[i] == 0)
        .collect();
    let mut done = 0;
    while let Some(n) = ready.pop() {
        done += 1;
        for &e in &model.nodes[n].connects_as_source {
            let t = model.edges[e.0].target.0;
            in_degree[t] -= 1;
            if in_degree[t] == 0 {
                ready.push(t);
            }
        }
    }
    done == model.nodes.len()
}
