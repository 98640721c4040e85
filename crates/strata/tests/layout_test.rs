use strata::graphlib::{Geometry, Graph, Point};
use strata::{EdgeStyle, Error, HierarchicalLayout, LayoutConfig, layout};

fn geometry(g: &Graph, id: &str) -> Geometry {
    g.vertex(id)
        .and_then(|v| v.geometry)
        .unwrap_or_else(|| panic!("{id} has no geometry"))
}

fn points(g: &Graph, id: &str) -> Vec<Point> {
    g.edge(id).map(|e| e.points.clone()).unwrap_or_default()
}

fn chain() -> Graph {
    let mut g = Graph::new();
    g.add_vertex("a", 40.0, 20.0)
        .add_vertex("b", 40.0, 20.0)
        .add_vertex("c", 40.0, 20.0)
        .connect("ab", "a", "b")
        .connect("bc", "b", "c")
        .connect("ac", "a", "c");
    g
}

#[test]
fn layout_places_a_chain_top_down() {
    let mut g = chain();
    let report = layout(&mut g, &LayoutConfig::default()).unwrap();

    assert_eq!(report.hierarchies.len(), 1);
    assert_eq!(report.layer_of("a"), Some(0));
    assert_eq!(report.layer_of("b"), Some(1));
    assert_eq!(report.layer_of("c"), Some(2));
    assert_eq!(report.crossings(), 0);
    assert_eq!(geometry(&g, "a").y, 0.0);
    assert_eq!(geometry(&g, "b").y, 120.0);
    assert_eq!(geometry(&g, "c").y, 240.0);
    assert_eq!(geometry(&g, "a").width, 40.0);
}

#[test]
fn layout_layers_a_diamond() {
    let mut g = Graph::new();
    for id in ["a", "b", "c", "d"] {
        g.add_vertex(id, 30.0, 30.0);
    }
    g.connect("ab", "a", "b")
        .connect("ac", "a", "c")
        .connect("bd", "b", "d")
        .connect("cd", "c", "d");
    let report = layout(&mut g, &LayoutConfig::default()).unwrap();

    assert_eq!(report.layer_of("a"), Some(0));
    assert_eq!(report.layer_of("b"), Some(1));
    assert_eq!(report.layer_of("c"), Some(1));
    assert_eq!(report.layer_of("d"), Some(2));
    assert_eq!(report.crossings(), 0);
    assert_eq!(geometry(&g, "b").y, geometry(&g, "c").y);
    assert_ne!(geometry(&g, "b").x, geometry(&g, "c").x);
}

#[test]
fn layout_routes_both_edges_of_a_two_cycle_from_their_own_source() {
    let mut g = Graph::new();
    g.add_vertex("a", 40.0, 20.0)
        .add_vertex("b", 40.0, 20.0)
        .connect("e1", "a", "b")
        .connect("e2", "b", "a");
    layout(&mut g, &LayoutConfig::default()).unwrap();

    let forward = points(&g, "e1");
    assert_eq!(forward.len(), 2);
    assert_eq!(forward[0].y, 32.0);
    assert_eq!(forward[1].y, 108.0);

    let backward = points(&g, "e2");
    assert_eq!(backward.len(), 2);
    assert_eq!(backward[0].y, 108.0);
    assert_eq!(backward[1].y, 32.0);
}

#[test]
fn layout_reduces_crossings_from_explicit_roots() {
    let mut g = Graph::new();
    for id in ["a", "b", "c", "d", "e"] {
        g.add_vertex(id, 40.0, 20.0);
    }
    g.connect("ad", "a", "d")
        .connect("ac", "a", "c")
        .connect("bd", "b", "d")
        .connect("be", "b", "e");
    let report = HierarchicalLayout::new(LayoutConfig::default())
        .execute(&mut g, Some(Graph::ROOT), Some(&["a", "b"]))
        .unwrap();

    assert_eq!(report.hierarchies.len(), 1);
    let hierarchy = &report.hierarchies[0];
    assert_eq!(hierarchy.crossings_before, 1);
    assert_eq!(hierarchy.crossings_after, 0);
    assert!(geometry(&g, "c").x < geometry(&g, "d").x);
    assert!(geometry(&g, "d").x < geometry(&g, "e").x);
}

#[test]
fn layout_tightens_sources_onto_their_targets_unless_disabled() {
    let build = || {
        let mut g = Graph::new();
        for id in ["r1", "x", "y", "r2"] {
            g.add_vertex(id, 20.0, 20.0);
        }
        g.connect("r1x", "r1", "x")
            .connect("xy", "x", "y")
            .connect("r2y", "r2", "y");
        g
    };

    let mut g = build();
    let tight = layout(&mut g, &LayoutConfig::default()).unwrap();
    assert_eq!(tight.layer_of("r2"), Some(1));
    assert_eq!(geometry(&g, "r2").y, geometry(&g, "x").y);

    let mut g = build();
    let config = LayoutConfig {
        tighten_to_source: false,
        ..LayoutConfig::default()
    };
    let loose = layout(&mut g, &config).unwrap();
    assert_eq!(loose.layer_of("r2"), Some(0));
    assert_eq!(geometry(&g, "r2").y, geometry(&g, "r1").y);
}

#[test]
fn layout_packs_disconnected_hierarchies_side_by_side() {
    let mut g = Graph::new();
    for id in ["a", "b", "c", "d"] {
        g.add_vertex(id, 40.0, 20.0);
    }
    g.connect("ab", "a", "b").connect("cd", "c", "d");
    let report = layout(&mut g, &LayoutConfig::default()).unwrap();

    assert_eq!(report.hierarchies.len(), 2);
    assert_eq!(geometry(&g, "a").x, 0.0);
    assert_eq!(geometry(&g, "c").x, 100.0);
    assert_eq!(report.hierarchies[0].limit_x, 40.0);
}

#[test]
fn layout_lays_out_isolated_vertices() {
    let mut g = Graph::new();
    g.add_vertex("a", 40.0, 20.0)
        .add_vertex("b", 40.0, 20.0)
        .add_vertex("z", 40.0, 20.0)
        .connect("ab", "a", "b");
    let report = layout(&mut g, &LayoutConfig::default()).unwrap();

    assert_eq!(report.hierarchies.len(), 2);
    assert_eq!(report.layer_of("z"), Some(0));
    assert_eq!(geometry(&g, "z").x, 100.0);
}

#[test]
fn layout_stays_inside_the_given_parent() {
    let mut g = Graph::new();
    g.add_vertex("box", 200.0, 200.0)
        .add_vertex("x", 40.0, 20.0)
        .add_vertex("y", 40.0, 20.0)
        .add_vertex("z", 40.0, 20.0)
        .set_parent("x", "box")
        .set_parent("y", "box")
        .connect("xy", "x", "y");
    g.set_location("z", 999.0, 999.0);
    let report = HierarchicalLayout::new(LayoutConfig::default())
        .execute(&mut g, Some("box"), None)
        .unwrap();

    assert_eq!(report.layer_of("x"), Some(0));
    assert_eq!(report.layer_of("y"), Some(1));
    assert_eq!(report.layer_of("z"), None);
    assert_eq!(report.layer_of("box"), None);
    assert_eq!(geometry(&g, "z").x, 999.0);
}

#[test]
fn layout_attaches_edges_to_their_ports() {
    let mut g = Graph::new();
    g.add_vertex("a", 40.0, 20.0)
        .add_vertex("b", 40.0, 20.0)
        .add_port("p", "a", 1.0, 0.5)
        .connect("pb", "p", "b");
    layout(&mut g, &LayoutConfig::default()).unwrap();

    let route = points(&g, "pb");
    assert!(!route.is_empty());
    assert_eq!(route[0].x, geometry(&g, "a").x + 40.0);
}

#[test]
fn layout_fans_parallel_edges_out_across_their_channel() {
    let mut g = Graph::new();
    for id in ["a", "m", "b"] {
        g.add_vertex(id, 40.0, 20.0);
    }
    g.connect("e1", "a", "b")
        .connect("e2", "a", "b")
        .connect("e3", "a", "b")
        .connect("am", "a", "m")
        .connect("mb", "m", "b");
    layout(&mut g, &LayoutConfig::default()).unwrap();

    let routes: Vec<Vec<Point>> = ["e1", "e2", "e3"].iter().map(|e| points(&g, e)).collect();
    for route in &routes {
        assert_eq!(route.len(), 4);
    }
    let offset = |i: usize| routes[i][1].x - routes[0][1].x;
    assert!((offset(1) - 10.0).abs() < 1e-9, "{}", offset(1));
    assert!((offset(2) + 10.0).abs() < 1e-9, "{}", offset(2));
}

#[test]
fn layout_alternates_parallel_offsets_around_the_first_edge() {
    let mut g = Graph::new();
    for id in ["a", "m", "b"] {
        g.add_vertex(id, 40.0, 20.0);
    }
    for id in ["e1", "e2", "e3", "e4"] {
        g.connect(id, "a", "b");
    }
    g.connect("am", "a", "m").connect("mb", "m", "b");
    let config = LayoutConfig {
        parallel_edge_spacing: 15.0,
        ..LayoutConfig::default()
    };
    layout(&mut g, &config).unwrap();

    let first = points(&g, "e1");
    assert_eq!(first.len(), 4);
    for (id, expected) in [("e2", 15.0), ("e3", -15.0), ("e4", 30.0)] {
        let route = points(&g, id);
        assert_eq!(route.len(), 4, "{id}");
        for k in 1..3 {
            let offset = route[k].x - first[k].x;
            assert!((offset - expected).abs() < 1e-9, "{id}[{k}]: {offset}");
        }
    }
}

#[test]
fn layout_lays_out_a_long_chain_without_exhausting_the_stack() {
    const LEN: usize = 5000;
    let mut g = Graph::new();
    let ids: Vec<String> = (0..LEN).map(|i| format!("v{i}")).collect();
    for id in &ids {
        g.add_vertex(id, 20.0, 10.0);
    }
    for pair in ids.windows(2) {
        g.connect(&format!("{}-{}", pair[0], pair[1]), &pair[0], &pair[1]);
    }
    let report = layout(&mut g, &LayoutConfig::default()).unwrap();

    assert_eq!(report.hierarchies.len(), 1);
    assert_eq!(report.layer_of("v0"), Some(0));
    assert_eq!(report.layer_of(&ids[LEN - 1]), Some(LEN - 1));
    for pair in ids.windows(2) {
        assert!(geometry(&g, &pair[0]).y < geometry(&g, &pair[1]).y);
    }
}

/// Small linear congruential generator so the generated graphs are the same on every run.
struct Lcg(u64);

impl Lcg {
    fn below(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

fn generated(seed: u64) -> (Graph, Vec<String>) {
    let mut rng = Lcg(seed);
    let mut g = Graph::new();
    let count = 8 + rng.below(13);
    let ids: Vec<String> = (0..count).map(|i| format!("n{i}")).collect();
    for id in &ids {
        let width = [20.0, 40.0, 70.0][rng.below(3)];
        g.add_vertex(id, width, 20.0);
    }
    for (i, id) in ids.iter().enumerate().skip(1) {
        let from = rng.below(i);
        g.connect(&format!("t{i}"), &ids[from], id);
    }
    for k in 0..count / 2 {
        let (a, b) = (rng.below(count), rng.below(count));
        if a != b {
            g.connect(&format!("x{k}"), &ids[a], &ids[b]);
        }
    }
    (g, ids)
}

#[test]
fn layout_keeps_rank_mates_apart_on_generated_graphs() {
    let config = LayoutConfig::default();
    for seed in 1..=20u64 {
        let (mut g, ids) = generated(seed);
        let report = layout(&mut g, &config).unwrap();

        for hierarchy in &report.hierarchies {
            let mut by_layer: Vec<Vec<Geometry>> = Vec::new();
            for (vertex, &layer) in &hierarchy.layers {
                if by_layer.len() <= layer {
                    by_layer.resize(layer + 1, Vec::new());
                }
                by_layer[layer].push(geometry(&g, vertex));
            }
            for layer in &mut by_layer {
                layer.sort_by(|a, b| a.x.total_cmp(&b.x));
                for pair in layer.windows(2) {
                    let gap = pair[1].x - (pair[0].x + pair[0].width);
                    assert!(
                        gap >= config.intra_cell_spacing - 1e-6,
                        "seed {seed}: gap {gap} between rank mates"
                    );
                }
            }
        }
        assert!(ids.iter().all(|id| report.layer_of(id).is_some()), "seed {seed}");

        let again = layout(&mut g, &config).unwrap();
        assert_eq!(report.crossings(), again.crossings(), "seed {seed}");
    }
}

#[test]
fn layout_skips_jetties_for_straight_edges() {
    let mut g = chain();
    let config = LayoutConfig {
        edge_style: EdgeStyle::Straight,
        ..LayoutConfig::default()
    };
    layout(&mut g, &config).unwrap();

    assert!(points(&g, "ab").is_empty());
    assert_eq!(points(&g, "ac").len(), 2);
}

#[test]
fn layout_doubles_jetties_for_curved_edges() {
    let mut g = chain();
    let config = LayoutConfig {
        edge_style: EdgeStyle::Curve,
        ..LayoutConfig::default()
    };
    layout(&mut g, &config).unwrap();

    assert_eq!(points(&g, "ab").len(), 4);
    assert_eq!(points(&g, "ac").len(), 6);
}

#[test]
fn layout_takes_over_edge_styling_and_labels() {
    let mut g = chain();
    g.edge_mut("ab").unwrap().label_offset = Some(Point::new(5.0, 5.0));
    g.edge_mut("ab").unwrap().points = vec![Point::new(-1.0, -1.0); 7];
    layout(&mut g, &LayoutConfig::default()).unwrap();

    let edge = g.edge("ab").unwrap();
    assert!(edge.layout_managed);
    assert_eq!(edge.label_offset, None);
    assert_eq!(edge.points.len(), 2);
}

#[test]
fn layout_keeps_labels_when_asked() {
    let mut g = chain();
    g.edge_mut("ab").unwrap().label_offset = Some(Point::new(5.0, 5.0));
    let config = LayoutConfig {
        reset_edge_labels: false,
        disable_edge_style: false,
        ..LayoutConfig::default()
    };
    layout(&mut g, &config).unwrap();

    let edge = g.edge("ab").unwrap();
    assert!(!edge.layout_managed);
    assert_eq!(edge.label_offset, Some(Point::new(5.0, 5.0)));
}

#[test]
fn layout_without_scope_changes_nothing() {
    let mut g = chain();
    g.set_location("a", 7.0, 9.0);

    let engine = HierarchicalLayout::new(LayoutConfig::default());
    assert_eq!(engine.execute(&mut g, None, None), Err(Error::MissingScope));
    assert_eq!(engine.execute(&mut g, None, Some(&[])), Err(Error::MissingScope));
    assert_eq!(geometry(&g, "a"), Geometry::new(7.0, 9.0, 40.0, 20.0));
    assert!(points(&g, "ab").is_empty());
}

#[test]
fn layout_rejects_unknown_cells() {
    let mut g = chain();
    let engine = HierarchicalLayout::new(LayoutConfig::default());

    assert_eq!(
        engine.execute(&mut g, Some("nope"), None),
        Err(Error::UnknownCell("nope".to_string()))
    );
    assert_eq!(
        engine.execute(&mut g, None, Some(&["a", "nope"])),
        Err(Error::UnknownCell("nope".to_string()))
    );
}

#[test]
fn layout_rejects_an_invalid_config_before_touching_the_graph() {
    let mut g = chain();
    g.set_location("a", 7.0, 9.0);
    let config = LayoutConfig {
        intra_cell_spacing: -1.0,
        ..LayoutConfig::default()
    };

    assert!(matches!(
        layout(&mut g, &config),
        Err(Error::InvalidConfig { .. })
    ));
    assert_eq!(geometry(&g, "a").x, 7.0);
}

#[test]
fn layout_reports_vertices_without_bounds() {
    let mut g = chain();
    g.vertex_mut("b").unwrap().geometry = None;
    let report = layout(&mut g, &LayoutConfig::default()).unwrap();

    assert_eq!(report.missing_bounds, vec!["b".to_string()]);
    assert_eq!(report.layer_of("b"), Some(1));
}

#[test]
fn layout_is_stable_across_runs() {
    let mut g = chain();
    let first = layout(&mut g, &LayoutConfig::default()).unwrap();
    let placed: Vec<Geometry> = ["a", "b", "c"].iter().map(|id| geometry(&g, id)).collect();

    let second = layout(&mut g, &LayoutConfig::default()).unwrap();
    assert_eq!(first, second);
    let again: Vec<Geometry> = ["a", "b", "c"].iter().map(|id| geometry(&g, id)).collect();
    assert_eq!(placed, again);
}

#[test]
fn layout_report_serializes_in_camel_case() {
    let mut g = chain();
    let report = layout(&mut g, &LayoutConfig::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["hierarchies"][0]["layers"]["c"], 2);
    assert_eq!(json["hierarchies"][0]["crossingsAfter"], 0);
    assert!(json["missingBounds"].as_array().unwrap().is_empty());
}
