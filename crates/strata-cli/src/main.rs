use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Read;
use strata::graphlib::{Graph, Vertex};
use strata::{EdgeStyle, HierarchicalLayout, LayoutConfig, LayoutReport, Orientation};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "STRATA_LOG";

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Json(serde_json::Error),
    Input(String),
    Layout(strata::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Input(msg) => write!(f, "invalid diagram: {msg}"),
            CliError::Layout(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<strata::Error> for CliError {
    fn from(value: strata::Error) -> Self {
        Self::Layout(value)
    }
}

#[derive(Debug, Default)]
struct Args {
    input: Option<String>,
    pretty: bool,
    orientation: Option<Orientation>,
    edge_style: Option<EdgeStyle>,
    config: Option<String>,
    out: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramIn {
    #[serde(default)]
    vertices: Vec<VertexIn>,
    #[serde(default)]
    ports: Vec<PortIn>,
    #[serde(default)]
    edges: Vec<EdgeIn>,
    roots: Option<Vec<String>>,
    parent: Option<String>,
    config: Option<LayoutConfig>,
}

#[derive(Debug, Deserialize)]
struct VertexIn {
    id: String,
    width: Option<f64>,
    height: Option<f64>,
    parent: Option<String>,
    #[serde(default = "visible_by_default")]
    visible: bool,
    #[serde(default)]
    collapsed: bool,
}

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct PortIn {
    id: String,
    parent: String,
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct EdgeIn {
    id: String,
    source: String,
    target: String,
}

#[derive(Serialize)]
struct BoundsOut {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

#[derive(Serialize)]
struct PointOut {
    x: f64,
    y: f64,
}

#[derive(Serialize)]
struct LayoutOut<'a> {
    vertices: IndexMap<&'a str, BoundsOut>,
    edges: IndexMap<&'a str, Vec<PointOut>>,
    report: &'a LayoutReport,
}

fn usage() -> &'static str {
    "strata-cli\n\
\n\
USAGE:\n\
  strata-cli [layout] [--pretty] [--orientation n|s|e|w] [--edge-style orthogonal|polyline|straight|curve] [--config <file.json>] [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the diagram is read from stdin.\n\
  - --config replaces the config embedded in the diagram; --orientation and --edge-style apply on top.\n\
  - Set STRATA_LOG (e.g. STRATA_LOG=debug) to control diagnostics on stderr.\n\
"
}

fn parse_orientation(value: &str) -> Option<Orientation> {
    match value.trim().to_ascii_lowercase().as_str() {
        "n" | "north" => Some(Orientation::North),
        "s" | "south" => Some(Orientation::South),
        "e" | "east" => Some(Orientation::East),
        "w" | "west" => Some(Orientation::West),
        _ => None,
    }
}

fn parse_edge_style(value: &str) -> Option<EdgeStyle> {
    match value.trim().to_ascii_lowercase().as_str() {
        "orthogonal" => Some(EdgeStyle::Orthogonal),
        "polyline" => Some(EdgeStyle::Polyline),
        "straight" => Some(EdgeStyle::Straight),
        "curve" => Some(EdgeStyle::Curve),
        _ => None,
    }
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "layout" => {}
            "--pretty" => args.pretty = true,
            "--orientation" => {
                let Some(value) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.orientation =
                    Some(parse_orientation(value).ok_or(CliError::Usage(usage()))?);
            }
            "--edge-style" => {
                let Some(value) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.edge_style = Some(parse_edge_style(value).ok_or(CliError::Usage(usage()))?);
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn build_graph(diagram: &DiagramIn) -> Result<Graph, CliError> {
    let mut graph = Graph::new();
    for v in &diagram.vertices {
        if graph.has_vertex(&v.id) {
            return Err(CliError::Input(format!("duplicate vertex `{}`", v.id)));
        }
        let mut vertex = match (v.width, v.height) {
            (Some(width), Some(height)) => Vertex::sized(width, height),
            _ => Vertex::default(),
        };
        vertex.visible = v.visible;
        vertex.collapsed = v.collapsed;
        graph.set_vertex(v.id.clone(), vertex);
    }
    for v in &diagram.vertices {
        if let Some(parent) = &v.parent {
            if !graph.has_vertex(parent) {
                return Err(CliError::Input(format!(
                    "vertex `{}` has unknown parent `{parent}`",
                    v.id
                )));
            }
            graph.set_parent(v.id.clone(), parent.clone());
        }
    }
    for port in &diagram.ports {
        if !graph.has_vertex(&port.parent) {
            return Err(CliError::Input(format!(
                "port `{}` has unknown parent `{}`",
                port.id, port.parent
            )));
        }
        if graph.has_vertex(&port.id) {
            return Err(CliError::Input(format!("duplicate vertex `{}`", port.id)));
        }
        graph.add_port(port.id.clone(), port.parent.clone(), port.x, port.y);
    }
    for e in &diagram.edges {
        if graph.has_edge(&e.id) {
            return Err(CliError::Input(format!("duplicate edge `{}`", e.id)));
        }
        graph.connect(e.id.clone(), e.source.clone(), e.target.clone());
    }
    Ok(graph)
}

fn resolve_config(args: &Args, diagram: &mut DiagramIn) -> Result<LayoutConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => diagram.config.take().unwrap_or_default(),
    };
    if let Some(orientation) = args.orientation {
        config.orientation = orientation;
    }
    if let Some(edge_style) = args.edge_style {
        config.edge_style = edge_style;
    }
    Ok(config)
}

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    match out {
        None | Some("-") => println!("{text}"),
        Some(path) => std::fs::write(path, text)?,
    }
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let mut diagram: DiagramIn = serde_json::from_str(&text)?;
    let config = resolve_config(&args, &mut diagram)?;
    let mut graph = build_graph(&diagram)?;

    let roots: Option<Vec<&str>> = diagram
        .roots
        .as_ref()
        .map(|r| r.iter().map(String::as_str).collect());
    let parent = match (&diagram.parent, &roots) {
        (Some(parent), _) => Some(parent.as_str()),
        (None, None) => Some(Graph::ROOT),
        (None, Some(_)) => None,
    };
    tracing::debug!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        parent,
        "diagram loaded"
    );

    let report = HierarchicalLayout::new(config).execute(&mut graph, parent, roots.as_deref())?;

    let vertices = graph
        .vertices()
        .filter_map(|id| {
            let vertex = graph.vertex(id)?;
            if vertex.is_port() {
                return None;
            }
            let geometry = vertex.geometry.unwrap_or_default();
            Some((
                id,
                BoundsOut {
                    x: geometry.x,
                    y: geometry.y,
                    width: geometry.width,
                    height: geometry.height,
                },
            ))
        })
        .collect();
    let edges = graph
        .edges()
        .filter_map(|id| {
            let edge = graph.edge(id)?;
            let points = edge
                .points
                .iter()
                .map(|p| PointOut { x: p.x, y: p.y })
                .collect();
            Some((id, points))
        })
        .collect();

    write_json(
        &LayoutOut {
            vertices,
            edges,
            report: &report,
        },
        args.pretty,
        args.out.as_deref(),
    )
}

type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn install_subscriber(filter: EnvFilter) -> Result<(), InitError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Err(err) = install_subscriber(filter) {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
