//! Crossing reduction.
//!
//! Alternating weighted-median sweeps followed by adjacent-pair transposition, keeping the best
//! ordering seen. The rank lists always hold the best ordering between iterations; in-rank
//! positions being tried live on the cells.

mod cross_count;

pub use cross_count::{calculate_crossings, rank_crossings};

use crate::model::{Cell, HierarchyModel, Stage};

const MAX_TRANSPOSE_PASSES: usize = 10;

/// Crossing counts before and after reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Crossings {
    pub before: usize,
    pub after: usize,
}

/// Reorders every rank to reduce edge crossings.
pub fn run(model: &mut HierarchyModel, max_iterations: usize, max_no_improvement: usize) -> Crossings {
    let _span = tracing::debug_span!("crossing_reduction", ranks = model.ranks.len()).entered();

    let before = calculate_crossings(model);
    let mut best = before;
    let mut stale = 0;

    for iteration in 0..max_iterations {
        if stale >= max_no_improvement || best == 0 {
            break;
        }
        weighted_median(model, iteration);
        transpose(model, iteration);

        let candidate = calculate_crossings(model);
        if candidate < best {
            best = candidate;
            stale = 0;
            store_best(model);
        } else {
            stale += 1;
            restore_best(model);
        }
    }

    tracing::debug!(before, after = best, "crossings reduced");
    model.advance(Stage::Ranked, Stage::Ordered);
    Crossings {
        before,
        after: best,
    }
}

/// Re-sorts the rank lists by the positions currently on the cells.
fn store_best(model: &mut HierarchyModel) {
    let mut ranks = std::mem::take(&mut model.ranks);
    for (r, rank) in ranks.iter_mut().enumerate() {
        rank.sort_by_key(|&cell| model.order(cell, r));
        for (position, &cell) in rank.iter().enumerate() {
            model.set_order(cell, r, position);
        }
    }
    model.ranks = ranks;
}

/// Puts the positions of the best ordering back on the cells.
fn restore_best(model: &mut HierarchyModel) {
    let ranks = std::mem::take(&mut model.ranks);
    for (r, rank) in ranks.iter().enumerate() {
        for (position, &cell) in rank.iter().enumerate() {
            model.set_order(cell, r, position);
        }
    }
    model.ranks = ranks;
}

/// One median sweep: downwards on even iterations, upwards on odd ones.
pub fn weighted_median(model: &mut HierarchyModel, iteration: usize) {
    if model.max_rank == 0 {
        return;
    }
    if iteration % 2 == 0 {
        for rank in (0..model.max_rank).rev() {
            median_rank(model, rank, true);
        }
    } else {
        for rank in 1..model.max_rank {
            median_rank(model, rank, false);
        }
    }
}

fn median_rank(model: &mut HierarchyModel, rank: usize, downward: bool) {
    let cells = model.ranks[rank].clone();
    let mut reserved = vec![false; cells.len()];
    let mut medians: Vec<(f64, Cell)> = Vec::with_capacity(cells.len());

    for &cell in &cells {
        let (neighbours, neighbour_rank) = if downward {
            (model.next_layer_cells(cell, rank), rank + 1)
        } else {
            (model.previous_layer_cells(cell, rank), rank - 1)
        };
        if neighbours.is_empty() {
            if let Some(slot) = reserved.get_mut(model.order(cell, rank)) {
                *slot = true;
            }
            continue;
        }
        let mut positions: Vec<f64> = neighbours
            .iter()
            .map(|&c| model.order(c, neighbour_rank) as f64)
            .collect();
        medians.push((median_value(&mut positions), cell));
    }

    medians.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut medians = medians.into_iter();
    for (position, taken) in reserved.into_iter().enumerate() {
        if taken {
            continue;
        }
        if let Some((_, cell)) = medians.next() {
            model.set_order(cell, rank, position);
        }
    }
}

/// Weighted median of neighbour positions. Sorts `positions` in place.
///
/// An even count above two is weighted towards the side whose positions are packed tighter.
pub fn median_value(positions: &mut [f64]) -> f64 {
    positions.sort_by(f64::total_cmp);
    let count = positions.len();
    match count {
        0 => -1.0,
        _ if count % 2 == 1 => positions[count / 2],
        2 => (positions[0] + positions[1]) / 2.0,
        _ => {
            let mid = count / 2;
            let left = positions[mid - 1] - positions[0];
            let right = positions[count - 1] - positions[mid];
            if left + right == 0.0 {
                return (positions[mid - 1] + positions[mid]) / 2.0;
            }
            (positions[mid - 1] * right + positions[mid] * left) / (left + right)
        }
    }
}

/// Neighbour positions of `cell` on the rank above and the rank below.
fn neighbour_positions(model: &HierarchyModel, cell: Cell, rank: usize) -> (Vec<usize>, Vec<usize>) {
    let above = model
        .next_layer_cells(cell, rank)
        .iter()
        .map(|&c| model.order(c, rank + 1))
        .collect();
    let below = if rank == 0 {
        Vec::new()
    } else {
        model
            .previous_layer_cells(cell, rank)
            .iter()
            .map(|&c| model.order(c, rank - 1))
            .collect()
    };
    (above, below)
}

/// Counts the crossings a left/right pair causes as it stands and swapped.
fn pair_crossings(left: &[usize], right: &[usize]) -> (usize, usize) {
    let mut current = 0;
    let mut swapped = 0;
    for &l in left {
        for &r in right {
            if l > r {
                current += 1;
            }
            if l < r {
                swapped += 1;
            }
        }
    }
    (current, swapped)
}

/// Swaps adjacent cells while that lowers the crossings they take part in.
///
/// On odd iterations every other pass also swaps pairs whose swap is neutral, to get out of
/// plateaus; such swaps do not count as an improvement.
pub fn transpose(model: &mut HierarchyModel, iteration: usize) {
    let mut improved = true;
    let mut pass = 0;
    while improved && pass < MAX_TRANSPOSE_PASSES {
        pass += 1;
        let nudge = iteration % 2 == 1 && pass % 2 == 1;
        improved = false;

        for rank in 0..model.ranks.len() {
            let cells = &model.ranks[rank];
            let mut ordered: Vec<Option<Cell>> = vec![None; cells.len()];
            for &cell in cells {
                if let Some(slot) = ordered.get_mut(model.order(cell, rank)) {
                    *slot = Some(cell);
                }
            }
            let ordered: Vec<Cell> = ordered.into_iter().flatten().collect();
            if ordered.len() < 2 {
                continue;
            }

            let mut left = ordered[0];
            let mut left_positions = neighbour_positions(model, left, rank);
            for &right_cell in &ordered[1..] {
                let mut right = right_cell;
                let mut right_positions = neighbour_positions(model, right, rank);

                let (above_current, above_swapped) =
                    pair_crossings(&left_positions.0, &right_positions.0);
                let (below_current, below_swapped) =
                    pair_crossings(&left_positions.1, &right_positions.1);
                let current = above_current + below_current;
                let swapped = above_swapped + below_swapped;

                if swapped < current || (swapped == current && nudge) {
                    let left_order = model.order(left, rank);
                    let right_order = model.order(right, rank);
                    model.set_order(left, rank, right_order);
                    model.set_order(right, rank, left_order);
                    // The moved cell stays the left one of the next pair.
                    right = left;
                    right_positions = left_positions;
                    if !nudge {
                        improved = true;
                    }
                }

                left = right;
                left_positions = right_positions;
            }
        }
    }
}
