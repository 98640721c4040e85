use crate::model::HierarchyModel;

/// Total crossings between every pair of adjacent ranks, for the current in-rank positions.
pub fn calculate_crossings(model: &HierarchyModel) -> usize {
    (1..model.ranks.len())
        .map(|i| rank_crossings(model, i))
        .sum()
}

/// Crossings between rank `i` and rank `i - 1`, counted as inversions with an accumulation
/// tree over the lower rank's positions.
pub fn rank_crossings(model: &HierarchyModel, i: usize) -> usize {
    let rank = &model.ranks[i];
    let lower_len = model.ranks[i - 1].len();

    let mut by_position: Vec<Vec<usize>> = vec![Vec::new(); rank.len()];
    for &cell in rank {
        let position = model.order(cell, i);
        let mut lower: Vec<usize> = model
            .previous_layer_cells(cell, i)
            .iter()
            .map(|&c| model.order(c, i - 1))
            .collect();
        lower.sort_unstable();
        if let Some(slot) = by_position.get_mut(position) {
            *slot = lower;
        }
    }

    let mut first_index: usize = 1;
    while first_index < lower_len {
        first_index <<= 1;
    }
    let tree_size = 2 * first_index - 1;
    first_index -= 1;
    let mut tree: Vec<usize> = vec![0; tree_size];

    let mut crossings = 0;
    for index in by_position.into_iter().flatten() {
        let mut tree_index = index + first_index;
        if tree_index >= tree_size {
            continue;
        }
        tree[tree_index] += 1;
        while tree_index > 0 {
            if tree_index % 2 == 1 {
                crossings += tree[tree_index + 1];
            }
            tree_index = (tree_index - 1) >> 1;
            tree[tree_index] += 1;
        }
    }
    crossings
}
