use super::CoordinateAssignment;
use crate::model::{Cell, EdgeId, HierarchyModel};

impl CoordinateAssignment<'_> {
    /// Straightens the placeholder chains of long edges.
    ///
    /// Each chain is walked upwards and downwards, carrying the current x along as long as the
    /// rank-mates leave room for it. The direction that lines up more segments is applied if it
    /// beats the chain as it stands; equal counts leave the chain alone.
    pub(super) fn min_path(&self, model: &mut HierarchyModel) {
        for e in 0..model.edges.len() {
            let dummies = model.edges[e].dummy_count();
            if dummies < 2 {
                continue;
            }
            let cell = Cell::Edge(EdgeId(e));
            let min_rank = model.edges[e].min_rank;
            let xs = model.edges[e].x.clone();

            let mut reference = xs[0];
            let mut straight = true;
            let mut current_segments = 0;
            for &x in &xs[1..] {
                if x != reference {
                    straight = false;
                    reference = x;
                } else {
                    current_segments += 1;
                }
            }
            if straight {
                continue;
            }

            // Slot `s` sits on rank `min_rank + 1 + s`.
            let mut up = vec![0.0; dummies - 1];
            let mut up_segments = 0;
            let mut carried = xs[0];
            for s in 0..dummies - 1 {
                let next = xs[s + 1];
                if carried == next || self.reposition_valid(model, cell, min_rank + 2 + s, carried) {
                    up[s] = carried;
                    up_segments += 1;
                } else {
                    up[s] = next;
                    carried = next;
                }
            }

            let mut down = vec![0.0; dummies - 1];
            let mut down_segments = 0;
            carried = xs[dummies - 1];
            for s in (1..dummies).rev() {
                let next = xs[s - 1];
                if carried == next || self.reposition_valid(model, cell, min_rank + s, carried) {
                    down[s - 1] = carried;
                    down_segments += 1;
                } else {
                    down[s - 1] = next;
                    carried = next;
                }
            }

            let edge = &mut model.edges[e];
            if down_segments > up_segments && down_segments > current_segments {
                edge.x[..dummies - 1].copy_from_slice(&down);
            } else if up_segments > down_segments && up_segments > current_segments {
                edge.x[1..].copy_from_slice(&up);
            }
        }
    }

    /// Whether `cell` may move to `position` on `rank` without closing in on its rank-mates.
    fn reposition_valid(
        &self,
        model: &HierarchyModel,
        cell: Cell,
        rank: usize,
        position: f64,
    ) -> bool {
        let cells = &model.ranks[rank];
        let Some(index) = cells.iter().position(|&c| c == cell) else {
            return false;
        };
        let current = model.x(cell, rank);
        let spacing = self.config.intra_cell_spacing;
        let width = model.width(cell);

        if position < current {
            let Some(&left) = index.checked_sub(1).and_then(|i| cells.get(i)) else {
                return true;
            };
            let limit = model.x(left, rank) + model.width(left) / 2.0 + spacing + width / 2.0;
            limit <= position
        } else if position > current {
            let Some(&right) = cells.get(index + 1) else {
                return true;
            };
            let limit = model.x(right, rank) - model.width(right) / 2.0 - spacing - width / 2.0;
            limit >= position
        } else {
            true
        }
    }
}
