//! Per-pass view of the host diagram.
//!
//! Resolves which edges a vertex takes part in and which visible vertex each edge end attaches
//! to, honouring collapsed groups, hidden cells and ports. Answers are cached for the lifetime of
//! one pass and dropped with it.

use crate::host::LayoutHost;
use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;

pub struct HostFacade<'h, H: LayoutHost + ?Sized> {
    host: &'h H,
    parent: Option<String>,
    traverse_ancestors: bool,
    edge_cache: RefCell<FxHashMap<String, Vec<String>>>,
    terminal_cache: RefCell<FxHashMap<(String, bool), Option<String>>>,
}

impl<'h, H: LayoutHost + ?Sized> HostFacade<'h, H> {
    pub fn new(host: &'h H, parent: Option<&str>, traverse_ancestors: bool) -> Self {
        Self {
            host,
            parent: parent.map(str::to_string),
            traverse_ancestors,
            edge_cache: RefCell::new(FxHashMap::default()),
            terminal_cache: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn host(&self) -> &'h H {
        self.host
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Visible vertex at one end of `edge`, after collapsed-group and port promotion.
    pub fn visible_terminal(&self, edge: &str, source: bool) -> Option<String> {
        let key = (edge.to_string(), source);
        if let Some(cached) = self.terminal_cache.borrow().get(&key) {
            return cached.clone();
        }
        let resolved = self.resolve_terminal(edge, source);
        self.terminal_cache.borrow_mut().insert(key, resolved.clone());
        resolved
    }

    fn resolve_terminal(&self, edge: &str, source: bool) -> Option<String> {
        let terminal = self.host.terminal(edge, source)?;

        let mut best = terminal;
        let mut cursor = Some(terminal);
        while let Some(cell) = cursor {
            if !self.host.is_visible(best) || self.host.is_collapsed(cell) {
                best = cell;
            }
            cursor = self.host.parent(cell);
        }
        // The top-most container never stands in for an edge end.
        self.host.parent(best)?;

        if self.host.is_port(best) {
            return self.host.parent(best).map(str::to_string);
        }
        Some(best.to_string())
    }

    /// Whether `child` lies inside `parent`: anywhere below it, or directly below it when
    /// ancestors are not traversed.
    pub fn is_ancestor(&self, parent: &str, child: Option<&str>) -> bool {
        let Some(child) = child else {
            return false;
        };
        if !self.traverse_ancestors {
            return self.host.parent(child) == Some(parent);
        }
        if child == parent {
            return false;
        }
        let mut cursor = Some(child);
        while let Some(cell) = cursor {
            if cell == parent {
                return true;
            }
            cursor = self.host.parent(cell);
        }
        false
    }

    /// Edges the layout considers attached to `cell`: its own, its ports', and those of hidden or
    /// collapsed children. Edges leaving the layout parent are dropped; loops are kept.
    pub fn edges(&self, cell: &str) -> Vec<String> {
        if let Some(cached) = self.edge_cache.borrow().get(cell) {
            return cached.clone();
        }

        let collapsed = self.host.is_collapsed(cell);
        let mut candidates: Vec<&str> = Vec::new();
        for child in self.host.children(cell) {
            if self.host.is_port(child) || collapsed || !self.host.is_visible(child) {
                candidates.extend(self.host.connected_edges(child));
            }
        }
        candidates.extend(self.host.connected_edges(cell));

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut result: Vec<String> = Vec::new();
        for edge in candidates {
            if !seen.insert(edge) {
                continue;
            }
            let source = self.visible_terminal(edge, true);
            let target = self.visible_terminal(edge, false);
            let keep = source == target
                || (target.as_deref() == Some(cell) && self.inside_parent(source.as_deref()))
                || (source.as_deref() == Some(cell) && self.inside_parent(target.as_deref()));
            if keep {
                result.push(edge.to_string());
            }
        }

        self.edge_cache
            .borrow_mut()
            .insert(cell.to_string(), result.clone());
        result
    }

    fn inside_parent(&self, cell: Option<&str>) -> bool {
        match self.parent.as_deref() {
            None => true,
            Some(parent) => self.is_ancestor(parent, cell),
        }
    }

    /// Edges from `source` to `target`, plus the reverse direction when `directed` is false.
    pub fn edges_between(&self, source: &str, target: &str, directed: bool) -> Vec<String> {
        self.edges(source)
            .into_iter()
            .filter(|edge| {
                let src = self.visible_terminal(edge, true);
                let trg = self.visible_terminal(edge, false);
                let forward = src.as_deref() == Some(source) && trg.as_deref() == Some(target);
                let backward =
                    !directed && src.as_deref() == Some(target) && trg.as_deref() == Some(source);
                forward || backward
            })
            .collect()
    }

    /// Visible, non-port vertices below `cell`, in host order.
    pub fn filter_descendants(&self, cell: &str, result: &mut IndexSet<String>) {
        let visible = self.host.is_visible(cell);
        if self.host.is_vertex(cell) && self.parent.as_deref() != Some(cell) && visible {
            result.insert(cell.to_string());
        }
        if self.traverse_ancestors || (self.parent.as_deref() == Some(cell) && visible) {
            for child in self.host.children(cell) {
                if !self.host.is_port(child) {
                    self.filter_descendants(child, result);
                }
            }
        }
    }

    /// Sources (no incoming, some outgoing edges) among `vertices`; when there are none, the
    /// single vertex with the greatest out-minus-in degree.
    pub fn find_roots(&self, vertices: &IndexSet<String>) -> Vec<String> {
        let mut roots: Vec<String> = Vec::new();
        let mut best: Option<&str> = None;
        let mut max_diff = i64::MIN;

        for cell in vertices {
            if !self.host.is_vertex(cell) || !self.host.is_visible(cell) {
                continue;
            }
            let mut fan_out: i64 = 0;
            let mut fan_in: i64 = 0;
            for edge in self.edges(cell) {
                if self.visible_terminal(&edge, true).as_deref() == Some(cell.as_str()) {
                    fan_out += 1;
                } else {
                    fan_in += 1;
                }
            }
            if fan_in == 0 && fan_out > 0 {
                roots.push(cell.clone());
            }
            let diff = fan_out - fan_in;
            if diff > max_diff {
                max_diff = diff;
                best = Some(cell.as_str());
            }
        }

        if roots.is_empty() {
            if let Some(best) = best {
                roots.push(best.to_string());
            }
        }
        roots
    }

    /// Splits the graph into independently laid out hierarchies.
    ///
    /// Starting from each root, follows edges whose net direction (same-direction parallels minus
    /// opposite ones) is not negative. Traversals that run into an earlier hierarchy absorb it.
    pub fn hierarchies(
        &self,
        roots: &[String],
        filled: Option<IndexSet<String>>,
    ) -> Vec<IndexSet<String>> {
        let mut traversal = Traversal {
            all: FxHashSet::default(),
            components: Vec::new(),
            current: 0,
            filled,
        };
        for root in roots {
            traversal.components.push(IndexSet::new());
            traversal.current = traversal.components.len() - 1;
            self.traverse(root, &mut traversal);
        }
        traversal.components.retain(|c| !c.is_empty());
        traversal.components
    }

    /// Finds roots batch by batch among `candidates` until every candidate belongs to a
    /// hierarchy. Returns the hierarchies and all roots found, in discovery order.
    pub fn hierarchies_from_candidates(
        &self,
        candidates: IndexSet<String>,
    ) -> (Vec<IndexSet<String>>, Vec<String>) {
        let mut traversal = Traversal {
            all: FxHashSet::default(),
            components: Vec::new(),
            current: 0,
            filled: Some(candidates),
        };
        let mut roots: Vec<String> = Vec::new();

        loop {
            let remaining = match traversal.filled.as_ref() {
                Some(filled) if !filled.is_empty() => filled.clone(),
                _ => break,
            };
            let batch = self.find_roots(&remaining);
            if batch.is_empty() {
                break;
            }
            for root in &batch {
                traversal.components.push(IndexSet::new());
                traversal.current = traversal.components.len() - 1;
                self.traverse(root, &mut traversal);
            }
            let progressed = traversal
                .filled
                .as_ref()
                .is_some_and(|f| f.len() < remaining.len());
            roots.extend(batch);
            if !progressed {
                break;
            }
        }

        traversal.components.retain(|c| !c.is_empty());
        (traversal.components, roots)
    }

    /// Depth-first walk from `root` over the vertices it reaches along non-negative edges.
    fn traverse(&self, root: &str, traversal: &mut Traversal) {
        let mut stack: Vec<std::vec::IntoIter<String>> = Vec::new();
        if let Some(next) = self.visit(root, traversal) {
            stack.push(next.into_iter());
        }
        while let Some(frame) = stack.last_mut() {
            match frame.next() {
                Some(vertex) => {
                    if let Some(next) = self.visit(&vertex, traversal) {
                        stack.push(next.into_iter());
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }
    }

    /// Adds `vertex` to the current component and returns the vertices to continue with. A vertex
    /// already owned by another component merges that component into the current one instead.
    fn visit(&self, vertex: &str, traversal: &mut Traversal) -> Option<Vec<String>> {
        let allowed = traversal
            .filled
            .as_ref()
            .is_none_or(|filled| filled.contains(vertex));

        if !traversal.all.contains(vertex) && allowed {
            traversal.components[traversal.current].insert(vertex.to_string());
            traversal.all.insert(vertex.to_string());
            if let Some(filled) = traversal.filled.as_mut() {
                filled.shift_remove(vertex);
            }

            let edges = self.edges(vertex);
            let is_source: Vec<bool> = edges
                .iter()
                .map(|e| self.visible_terminal(e, true).as_deref() == Some(vertex))
                .collect();
            let far_ends: Vec<Option<String>> = edges
                .iter()
                .zip(&is_source)
                .map(|(e, &src)| self.visible_terminal(e, !src))
                .collect();

            let mut next = Vec::new();
            for i in 0..edges.len() {
                if !is_source[i] {
                    continue;
                }
                let Some(far) = far_ends[i].as_deref() else {
                    continue;
                };
                let mut net_count: i64 = 1;
                for j in 0..edges.len() {
                    if j != i && far_ends[j].as_deref() == Some(far) {
                        net_count += if is_source[j] { 1 } else { -1 };
                    }
                }
                if net_count >= 0 {
                    next.push(far.to_string());
                }
            }
            return Some(next);
        }

        if !traversal.components[traversal.current].contains(vertex) {
            let owner = traversal
                .components
                .iter()
                .position(|comp| comp.contains(vertex));
            if let Some(k) = owner {
                let absorbed = traversal.components.remove(k);
                if k < traversal.current {
                    traversal.current -= 1;
                }
                traversal.components[traversal.current].extend(absorbed);
            }
        }
        None
    }
}

struct Traversal {
    all: FxHashSet<String>,
    components: Vec<IndexSet<String>>,
    current: usize,
    filled: Option<IndexSet<String>>,
}
