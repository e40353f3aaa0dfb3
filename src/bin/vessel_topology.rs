//! Vessel Topology Binary
//!
//! Offline planning and export tool over a saved annotation session.
//!
//! Reads a session JSON document, rebuilds the branch tree and prints the
//! topology exports and the segmentation work unit plan as one JSON object
//! on stdout.
//!
//! ## Session format
//!
//! ```json
//! {
//!   "config": { "strategy": "one_per_branch" },
//!   "adjacency": [[null, "PortalVeinRoot"], ["PortalVeinRoot", "PortalVein"]],
//!   "positions": { "PortalVeinRoot": [0.0, 0.0, 0.0], "PortalVein": [1.0, 2.0, 3.0] }
//! }
//! ```
//!
//! `config` and `positions` are optional.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `VESSEL_TEMPLATE`: template override (portal, inferior_cava, empty)
//! - `VESSEL_STRATEGY`: pairing strategy override
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin vessel_topology -- session.json [--strategy one_per_branch]
//! ```

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vessel_branch_kernel::{
    from_adjacency_list, to_adjacency_list, to_adjacency_matrix, to_dgtal, to_placed_polyline,
    AdjacencyList, AdjacencyMatrix, DgtalGraph, Extractor, InMemoryPointSource, KernelConfig,
    PlacementWizard, PointSource, Position, PositionMap, StrategyKind, TopologySnapshot,
    VesselBranches, WorkUnit,
};

/// Initialize the tracing subscriber with JSON or pretty format.
///
/// Logs go to stderr so stdout stays a single JSON document.
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vessel_topology=info,vessel_branch_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Saved annotation session.
#[derive(Debug, Deserialize)]
struct Session {
    #[serde(default)]
    config: Option<KernelConfig>,
    adjacency: AdjacencyList,
    #[serde(default)]
    positions: PositionMap,
}

/// Work unit plan for one strategy.
#[derive(Debug, Serialize)]
struct Plan {
    strategy: StrategyKind,
    label: &'static str,
    units: Vec<WorkUnit>,
}

/// Everything printed on stdout.
#[derive(Debug, Serialize)]
struct Report {
    snapshot: TopologySnapshot,
    adjacency: AdjacencyList,
    matrix: AdjacencyMatrix,
    placed_node_count: usize,
    placement_finished: bool,
    polyline: Vec<Position>,
    dgtal: Option<DgtalGraph>,
    branches: VesselBranches,
    plan: Option<Plan>,
}

/// Export the topology of a saved annotation session and plan its work units
#[derive(Parser, Debug)]
#[command(name = "vessel_topology")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Session JSON document
    session: PathBuf,

    /// Pairing strategy, by name or menu label (overrides the session config)
    #[arg(short, long, env = "VESSEL_STRATEGY")]
    strategy: Option<StrategyKind>,
}

fn run(cli: Cli) -> Result<Report, Box<dyn Error>> {
    let raw = std::fs::read_to_string(&cli.session)?;
    let session: Session = serde_json::from_str(&raw)?;

    let mut config = session.config.unwrap_or_default();
    config.engine.validate()?;
    config.apply_env()?;
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }

    let tree = from_adjacency_list(&session.adjacency)?;
    let points = InMemoryPointSource::from_positions(session.positions.iter());
    let wizard = PlacementWizard::from_tree(points, tree, config.template);
    let tree = wizard.tree();
    let positions = wizard.points().positions();

    info!(
        session = %cli.session.display(),
        nodes = tree.len(),
        positions = positions.len(),
        strategy = %config.strategy,
        "session loaded"
    );

    let dgtal = to_dgtal(&positions, tree)
        .map_err(|e| warn!(error = %e, "dgtal export skipped"))
        .ok();
    let branches = wizard.vessel_branches();

    let strategy = config.strategy.strategy();
    let plan = Extractor::new(config.engine.clone())
        .plan(strategy.as_ref(), tree, &positions)
        .map_err(|e| warn!(error = %e, strategy = %config.strategy, "work unit plan skipped"))
        .ok()
        .map(|units| Plan {
            strategy: config.strategy,
            label: config.strategy.label(),
            units,
        });

    Ok(Report {
        snapshot: TopologySnapshot::compute_with_positions(tree, &positions)?,
        adjacency: to_adjacency_list(tree),
        matrix: to_adjacency_matrix(tree),
        placed_node_count: tree.placed_node_list().len(),
        placement_finished: wizard.is_placement_finished(),
        polyline: to_placed_polyline(tree, &positions),
        dgtal,
        branches,
        plan,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let report = match run(cli) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "vessel_topology failed");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize report");
            ExitCode::FAILURE
        }
    }
}
