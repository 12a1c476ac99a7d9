use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use qcasim::{layout, parse, SimulationConfig, Simulator};
use tracing::info;

/// Simulate a QCADesigner design and print its truth table
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Design file (.qca)
    design: PathBuf,

    /// Total number of clock cycles, shared between all input combinations
    #[arg(short, long, default_value_t = 10)]
    cycles: u32,

    /// Time between samples
    #[arg(short, long, default_value_t = 0.01)]
    step: f64,

    /// Only let clocked cells take on values during their active clock phase
    #[arg(long)]
    clock_gating: bool,

    /// Write the recognized graph in DOT format to this file
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Print the full simulation (truth table and trace) as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let cells = parse::parse_file(&cli.design)
        .with_context(|| format!("failed to read {}", cli.design.display()))?;
    info!(cells = cells.len(), "read design");

    let graph = layout::build_graph(cells).context("failed to build the cell graph")?;
    info!(
        nodes = graph.node_count(),
        connections = graph.connection_count(),
        "built graph"
    );

    if let Some(path) = &cli.dot {
        let f = std::fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        graph.to_graphviz(f)?;
    }

    let config = SimulationConfig {
        num_cycles: cli.cycles,
        step: cli.step,
        clock_gating: cli.clock_gating,
    };
    let simulation = Simulator::new(graph, config).simulate()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&simulation)?);
    } else {
        print!("{}", simulation.truth_table);
    }

    Ok(())
}
