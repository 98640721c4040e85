use strata::facade::HostFacade;
use strata::graphlib::Graph;
use strata::model::{Cell, HierarchyModel, Stage};
use strata::{cycle, layering, order};

fn ranked(g: &Graph, vertices: &[&str], roots: &[&str]) -> HierarchyModel {
    let facade = HostFacade::new(g, Some(Graph::ROOT), true);
    let vertices: Vec<String> = vertices.iter().map(|s| s.to_string()).collect();
    let roots: Vec<String> = roots.iter().map(|s| s.to_string()).collect();
    let mut model = HierarchyModel::build(&facade, &vertices, &roots);
    cycle::run(&mut model);
    layering::run(&mut model, true);
    model
}

/// Two sources over three sinks where the first-found order crosses once:
/// `a` reaches `d` and `c`, `b` reaches `d` and `e`.
fn crossing_graph() -> Graph {
    let mut g = Graph::new();
    for id in ["a", "b", "c", "d", "e"] {
        g.add_vertex(id, 40.0, 20.0);
    }
    g.connect("ad", "a", "d")
        .connect("ac", "a", "c")
        .connect("bd", "b", "d")
        .connect("be", "b", "e");
    g
}

fn rank_names(model: &HierarchyModel, rank: usize) -> Vec<String> {
    let mut cells: Vec<Cell> = model.ranks[rank].clone();
    cells.sort_by_key(|&c| model.order(c, rank));
    cells
        .into_iter()
        .map(|c| match c {
            Cell::Node(n) => model.node(n).vertex.clone(),
            Cell::Edge(e) => format!("~{}", model.edge(e).edges[0].id),
        })
        .collect()
}

#[test]
fn order_counts_crossings_between_adjacent_ranks() {
    let g = crossing_graph();
    let model = ranked(&g, &["a", "b", "c", "d", "e"], &["a", "b"]);

    assert_eq!(rank_names(&model, 0), vec!["d", "c", "e"]);
    assert_eq!(order::rank_crossings(&model, 1), 1);
    assert_eq!(order::calculate_crossings(&model), 1);
}

#[test]
fn order_removes_an_avoidable_crossing() {
    let g = crossing_graph();
    let mut model = ranked(&g, &["a", "b", "c", "d", "e"], &["a", "b"]);

    let crossings = order::run(&mut model, 24, 2);
    assert_eq!(crossings.before, 1);
    assert_eq!(crossings.after, 0);
    assert_eq!(order::calculate_crossings(&model), 0);
    assert_eq!(rank_names(&model, 0), vec!["c", "d", "e"]);
    assert_eq!(model.stage(), Stage::Ordered);
}

#[test]
fn order_keeps_rank_lists_sorted_by_position() {
    let g = crossing_graph();
    let mut model = ranked(&g, &["a", "b", "c", "d", "e"], &["a", "b"]);
    order::run(&mut model, 24, 2);

    for (r, rank) in model.ranks.iter().enumerate() {
        for (position, &cell) in rank.iter().enumerate() {
            assert_eq!(model.order(cell, r), position);
        }
    }
}

#[test]
fn order_leaves_a_crossing_free_model_alone() {
    let mut g = Graph::new();
    g.add_vertex("a", 1.0, 1.0)
        .add_vertex("b", 1.0, 1.0)
        .add_vertex("c", 1.0, 1.0)
        .add_vertex("d", 1.0, 1.0)
        .connect("ab", "a", "b")
        .connect("ac", "a", "c")
        .connect("bd", "b", "d")
        .connect("cd", "c", "d");
    let mut model = ranked(&g, &["a", "b", "c", "d"], &["a"]);
    let before = rank_names(&model, 1);

    let crossings = order::run(&mut model, 24, 2);
    assert_eq!(crossings, order::Crossings { before: 0, after: 0 });
    assert_eq!(rank_names(&model, 1), before);
}

#[test]
fn order_never_reports_more_crossings_than_it_started_with() {
    let mut g = Graph::new();
    let ids = ["s1", "s2", "s3", "t1", "t2", "t3", "t4"];
    for id in ids {
        g.add_vertex(id, 10.0, 10.0);
    }
    for (source, target) in [
        ("s1", "t4"),
        ("s1", "t2"),
        ("s2", "t1"),
        ("s2", "t3"),
        ("s3", "t1"),
        ("s3", "t4"),
    ] {
        g.connect(format!("{source}{target}"), source, target);
    }
    let mut model = ranked(&g, &ids, &["s1", "s2", "s3"]);

    let crossings = order::run(&mut model, 24, 2);
    assert!(crossings.after <= crossings.before);
    assert_eq!(order::calculate_crossings(&model), crossings.after);
}

#[test]
fn transpose_swaps_a_pair_that_crosses_less_when_exchanged() {
    let g = crossing_graph();
    let mut model = ranked(&g, &["a", "b", "c", "d", "e"], &["a", "b"]);

    order::transpose(&mut model, 0);
    assert_eq!(rank_names(&model, 0), vec!["c", "d", "e"]);
    assert_eq!(order::calculate_crossings(&model), 0);
}

#[test]
fn median_value_of_no_positions_is_negative() {
    assert_eq!(order::median_value(&mut []), -1.0);
}

#[test]
fn median_value_takes_the_middle_of_an_odd_count() {
    assert_eq!(order::median_value(&mut [4.0, 0.0, 2.0]), 2.0);
}

#[test]
fn median_value_averages_two_positions() {
    assert_eq!(order::median_value(&mut [3.0, 1.0]), 2.0);
}

#[test]
fn median_value_leans_towards_the_tighter_side() {
    assert_eq!(order::median_value(&mut [5.0, 0.0, 2.0, 1.0]), 1.25);
}

#[test]
fn median_value_of_identical_positions_is_that_position() {
    assert_eq!(order::median_value(&mut [1.0, 1.0, 1.0, 1.0]), 1.0);
}
