//! Command-line tools for stored connection graphs.
//!
//! Provides the `wiregraph` binary. A stored graph is either a JSON object of
//! keys (`.json`) or a SQLite database (`.db`, `.sqlite`, `.sqlite3`). Graphs
//! are loaded through [`LayoutFactory`], so any stored type name can be
//! inspected without registering node kinds.
//!
//! Log output goes to stderr and is controlled by `RUST_LOG`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wiregraph_core::{ContainerKind, Graph, GraphConfig, NodeId};
use wiregraph_store::{
    load, LayoutFactory, LoadError, LoadReport, MemoryStore, SqliteStore, StoreError,
};

/// Inspect, check and convert stored connection graphs.
#[derive(Parser)]
#[command(name = "wiregraph", about = "Inspect, check and convert stored connection graphs")]
struct Cli {
    /// JSON file with graph behavior switches (default: environment).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print the container tree with each node's inputs.
    Inspect {
        /// Stored graph file.
        file: PathBuf,

        /// Key prefix the graph was saved under.
        #[arg(short, long, default_value = "")]
        prefix: String,
    },

    /// Load a stored graph and report what could not be restored, as JSON.
    Check {
        /// Stored graph file.
        file: PathBuf,

        /// Key prefix the graph was saved under.
        #[arg(short, long, default_value = "")]
        prefix: String,
    },

    /// Copy every key of one stored graph file into another.
    Convert {
        /// Source file.
        from: PathBuf,

        /// Destination file. Existing keys are replaced.
        to: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("unrecognized file type '{}', expected .json, .db, .sqlite or .sqlite3", .0.display())]
    UnknownFormat(PathBuf),

    #[error("path is not valid UTF-8: '{}'", .0.display())]
    Path(PathBuf),
}

impl CliError {
    /// 2 = the file loaded but a reference is broken, 3 = I/O or format error.
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Load(_) => 2,
            _ => 3,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = read_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Inspect { file, prefix } => run_inspect(&file, &prefix, config),
        Commands::Check { file, prefix } => run_check(&file, &prefix, config),
        Commands::Convert { from, to } => run_convert(&from, &to),
    });

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn read_config(path: Option<&Path>) -> Result<GraphConfig, CliError> {
    match path {
        Some(path) => Ok(GraphConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(GraphConfig::from_env()),
    }
}

// ---------------------------------------------------------------------------
// Stored graph files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Sqlite,
}

impl Format {
    fn of(path: &Path) -> Result<Self, CliError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Format::Json),
            Some("db" | "sqlite" | "sqlite3") => Ok(Format::Sqlite),
            _ => Err(CliError::UnknownFormat(path.to_path_buf())),
        }
    }
}

fn sqlite_path(path: &Path) -> Result<&str, CliError> {
    path.to_str().ok_or_else(|| CliError::Path(path.to_path_buf()))
}

fn read_store(path: &Path) -> Result<MemoryStore, CliError> {
    match Format::of(path)? {
        Format::Json => Ok(MemoryStore::from_json(&fs::read_to_string(path)?)?),
        Format::Sqlite => Ok(SqliteStore::new(sqlite_path(path)?)?.snapshot()?),
    }
}

fn write_store(path: &Path, store: &MemoryStore) -> Result<(), CliError> {
    match Format::of(path)? {
        Format::Json => fs::write(path, store.to_json_pretty()?)?,
        Format::Sqlite => SqliteStore::new(sqlite_path(path)?)?.replace_all(store)?,
    }
    Ok(())
}

fn load_file(
    path: &Path,
    prefix: &str,
    config: GraphConfig,
) -> Result<(Graph, NodeId, LoadReport), CliError> {
    let store = read_store(path)?;
    let factory = LayoutFactory {
        max_port_count: config.max_port_count,
    };
    let mut graph = Graph::with_config(config);
    let root = graph.add_node(ContainerKind);
    let report = load(&mut graph, root, &store, prefix, &factory)?;
    Ok((graph, root, report))
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn run_inspect(path: &Path, prefix: &str, config: GraphConfig) -> Result<i32, CliError> {
    let (graph, root, _) = load_file(path, prefix, config)?;
    let mut out = String::new();
    render_tree(&graph, root, 0, &mut out);
    print!("{}", out);
    Ok(0)
}

/// One line per child, indented by depth:
/// `Type #id "description" <- [input, -, input]`.
fn render_tree(graph: &Graph, container: NodeId, depth: usize, out: &mut String) {
    for child in graph.children(container) {
        let Some(node) = graph.node(child) else {
            continue;
        };
        let _ = write!(out, "{}{} #{}", "  ".repeat(depth), node.type_name(), child);
        if !node.description().is_empty() {
            let _ = write!(out, " {:?}", node.description());
        }
        if !node.inputs().is_empty() {
            let inputs: Vec<String> = node
                .inputs()
                .slots()
                .iter()
                .map(|slot| slot.map_or_else(|| "-".to_string(), |id| id.to_string()))
                .collect();
            let _ = write!(out, " <- [{}]", inputs.join(", "));
        }
        out.push('\n');
        if node.is_container() {
            render_tree(graph, child, depth + 1, out);
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckSummary {
    objects: usize,
    has_cycle: bool,
    skipped: Vec<SkippedEntry>,
    unresolved_inputs: Vec<LinkEntry>,
    refused_connections: Vec<LinkEntry>,
}

#[derive(Debug, Serialize)]
struct SkippedEntry {
    prefix: String,
    type_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct LinkEntry {
    node: NodeId,
    slot: usize,
    input: NodeId,
}

impl CheckSummary {
    fn new(graph: &Graph, root: NodeId, report: &LoadReport) -> Self {
        CheckSummary {
            objects: graph.count(root, true),
            has_cycle: graph.has_cycle(root),
            skipped: report
                .skipped
                .iter()
                .map(|s| SkippedEntry {
                    prefix: s.prefix.clone(),
                    type_name: s.type_name.clone(),
                })
                .collect(),
            unresolved_inputs: report
                .unresolved_inputs
                .iter()
                .map(|u| LinkEntry {
                    node: u.node,
                    slot: u.slot,
                    input: u.id,
                })
                .collect(),
            refused_connections: report
                .refused_connections
                .iter()
                .map(|r| LinkEntry {
                    node: r.node,
                    slot: r.slot,
                    input: r.input,
                })
                .collect(),
        }
    }
}

/// Exit code 0 when everything was restored, 1 otherwise.
fn run_check(path: &Path, prefix: &str, config: GraphConfig) -> Result<i32, CliError> {
    let (graph, root, report) = load_file(path, prefix, config)?;
    let summary = CheckSummary::new(&graph, root, &report);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(if report.is_clean() { 0 } else { 1 })
}

fn run_convert(from: &Path, to: &Path) -> Result<i32, CliError> {
    let store = read_store(from)?;
    write_store(to, &store)?;
    info!(from = %from.display(), to = %to.display(), keys = store.len(), "store converted");
    Ok(0)
}
