use super::CoordinateAssignment;
use crate::model::{Cell, HierarchyModel};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Cells are left alone when they are this close to their median.
const TOLERANCE: f64 = 1.0;
const UNBOUNDED: f64 = 100_000_000.0;

impl CoordinateAssignment<'_> {
    /// Moves cells towards the median of their neighbours on both adjacent ranks without
    /// overlapping their rank-mates. A cell that moves requeues its neighbours. Returns how many
    /// queue entries were processed; at most one more than ten per cell.
    pub(super) fn min_node(&self, model: &mut HierarchyModel) -> usize {
        let mut entries: Vec<(Cell, usize, usize)> = Vec::new();
        let mut lookup: FxHashMap<(Cell, usize), usize> = FxHashMap::default();
        for (r, rank) in model.ranks.iter().enumerate() {
            for (index, &cell) in rank.iter().enumerate() {
                lookup.insert((cell, r), entries.len());
                entries.push((cell, r, index));
            }
        }

        let mut queued = vec![true; entries.len()];
        let mut queue: VecDeque<usize> = (0..entries.len()).collect();
        let max_tries = entries.len() * 10;
        let mut tries = 0;
        let spacing = self.config.intra_cell_spacing;

        while tries <= max_tries {
            let Some(entry) = queue.pop_front() else {
                break;
            };
            let (cell, rank, index) = entries[entry];

            let next = model.next_layer_cells(cell, rank).to_vec();
            let previous = if rank == 0 {
                Vec::new()
            } else {
                model.previous_layer_cells(cell, rank).to_vec()
            };
            let connected = next.len() + previous.len();
            let current = model.work_x(cell, rank);
            let median = if connected > 0 {
                let above = median_x_value(model, &next, rank + 1);
                let below = median_x_value(model, &previous, rank.saturating_sub(1));
                (above * next.len() as f64 + below * previous.len() as f64) / connected as f64
            } else {
                current
            };

            let width = model.width(cell);
            let rank_len = model.ranks[rank].len();
            let mut target = None;
            if median < current - TOLERANCE {
                if index == 0 {
                    target = Some(median);
                } else {
                    let left = model.ranks[rank][index - 1];
                    let limit =
                        model.work_x(left, rank) + model.width(left) / 2.0 + spacing + width / 2.0;
                    if limit < median {
                        target = Some(median);
                    } else if limit < current - TOLERANCE {
                        target = Some(limit);
                    }
                }
            } else if median > current + TOLERANCE {
                if index + 1 == rank_len {
                    target = Some(median);
                } else {
                    let right = model.ranks[rank][index + 1];
                    let limit =
                        model.work_x(right, rank) - model.width(right) / 2.0 - spacing - width / 2.0;
                    if limit > median {
                        target = Some(median);
                    } else if limit > current + TOLERANCE {
                        target = Some(limit);
                    }
                }
            }

            if let Some(x) = target {
                model.set_work_x(cell, rank, x);
                let neighbours = next
                    .iter()
                    .map(|&c| (c, rank + 1))
                    .chain(previous.iter().map(|&c| (c, rank - 1)));
                for key in neighbours {
                    if let Some(&other) = lookup.get(&key) {
                        if !queued[other] {
                            queued[other] = true;
                            queue.push_back(other);
                        }
                    }
                }
            }

            queued[entry] = false;
            tries += 1;
        }
        tries
    }

    /// One median sweep over all ranks: downwards on even iterations, upwards on odd ones.
    pub(super) fn median_pos(&mut self, model: &mut HierarchyModel, iteration: usize) {
        if iteration % 2 == 0 {
            for reference in (1..=model.max_rank).rev() {
                self.rank_median_position(model, reference - 1, reference);
            }
        } else {
            for reference in 0..model.max_rank.saturating_sub(1) {
                self.rank_median_position(model, reference + 1, reference);
            }
        }
    }

    /// Moves the cells of `rank` towards the median of their neighbours on `reference`.
    ///
    /// Heavier cells go first and bound the ones placed after them; whatever a cell could not
    /// cover adds to the iteration's displacement.
    fn rank_median_position(&mut self, model: &mut HierarchyModel, rank: usize, reference: usize) {
        let cells = model.ranks[rank].clone();
        let spacing = self.config.intra_cell_spacing;
        let neighbours_of = |model: &HierarchyModel, cell: Cell| -> Vec<Cell> {
            if reference < rank {
                model.previous_layer_cells(cell, rank).to_vec()
            } else {
                model.next_layer_cells(cell, rank).to_vec()
            }
        };

        let mut priority: Vec<(usize, u32)> = cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| (i, weighted_value(model, cell, &neighbours_of(model, cell))))
            .collect();
        priority.sort_by(|a, b| b.1.cmp(&a.1));

        let mut placed = vec![false; cells.len()];
        for (index, _) in priority {
            let cell = cells[index];
            let neighbours = neighbours_of(model, cell);
            let median = if neighbours.is_empty() {
                model.work_x(cell, rank)
            } else {
                median_x_value(model, &neighbours, reference)
            };
            let width = model.width(cell);

            let mut left_limit = -UNBOUNDED;
            let mut buffer = 0.0;
            for j in (0..index).rev() {
                let left = cells[j];
                if placed[j] {
                    left_limit = model.work_x(left, rank)
                        + model.width(left) / 2.0
                        + spacing
                        + buffer
                        + width / 2.0;
                    break;
                }
                buffer += model.width(left) + spacing;
            }

            let mut right_limit = UNBOUNDED;
            let mut buffer = 0.0;
            for j in index + 1..cells.len() {
                let right = cells[j];
                if placed[j] {
                    right_limit = model.work_x(right, rank)
                        - model.width(right) / 2.0
                        - spacing
                        - buffer
                        - width / 2.0;
                    break;
                }
                buffer += model.width(right) + spacing;
            }

            if median >= left_limit && median <= right_limit {
                model.set_work_x(cell, rank, median);
            } else if median < left_limit {
                model.set_work_x(cell, rank, left_limit);
                self.current_x_delta += left_limit - median;
            } else {
                model.set_work_x(cell, rank, right_limit);
                self.current_x_delta += median - right_limit;
            }
            placed[index] = true;
        }
    }
}

/// Placement priority: placeholder-to-placeholder links weigh most, so long edges stay straight.
pub(super) fn weighted_value(model: &HierarchyModel, cell: Cell, neighbours: &[Cell]) -> u32 {
    neighbours
        .iter()
        .map(|&other| match (model.is_vertex(cell), model.is_vertex(other)) {
            (true, true) => 1,
            (false, false) => 8,
            _ => 2,
        })
        .sum()
}

/// Median working x of `cells` on `rank`; the mean of the middle two for an even count.
fn median_x_value(model: &HierarchyModel, cells: &[Cell], rank: usize) -> f64 {
    if cells.is_empty() {
        return 0.0;
    }
    let mut values: Vec<f64> = cells.iter().map(|&c| model.work_x(c, rank)).collect();
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}
