use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use netforce::config::load_settings;
use netforce::scheduler::DEFAULT_FPS;
use netforce::{
    GraphDocument, IntervalScheduler, ManualScheduler, MemoryGraph, Simulation,
    SimulationSettings,
};

/// Force-directed layout for graph documents.
#[derive(Parser)]
#[command(name = "netforce")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out a graph document and write it back with positions
    Layout(LayoutArgs),
    /// Print the default simulation settings as YAML
    Settings,
}

#[derive(Args)]
struct LayoutArgs {
    /// Input graph document (.json)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file; the document is printed to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings file (.yaml, .yml or .json) overriding the defaults
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Give up after this many ticks even if the layout is still moving
    #[arg(long, default_value = "10000")]
    max_ticks: usize,

    /// Pace ticks like a display would instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Frame rate used with --realtime
    #[arg(long, default_value_t = DEFAULT_FPS)]
    fps: f64,
}

fn read_document(path: &Path) -> anyhow::Result<GraphDocument> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let document = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a graph document", path.display()))?;
    Ok(document)
}

fn layout(args: &LayoutArgs) -> anyhow::Result<()> {
    let document = read_document(&args.input)?;
    let settings = match &args.settings {
        Some(path) => load_settings(path)?,
        None => SimulationSettings::default(),
    };

    let graph = Rc::new(RefCell::new(MemoryGraph::from_document(document)));
    {
        let graph = graph.borrow();
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "laying out graph"
        );
    }

    let ticks = if args.realtime {
        let frames = Rc::new(IntervalScheduler::with_fps(args.fps));
        let sim = Simulation::new(Rc::clone(&graph), settings, frames.clone());
        sim.start()?;
        frames.run_until_idle(args.max_ticks);
        sim.stop();
        sim.tick_count() as usize
    } else {
        let sim = Simulation::new(Rc::clone(&graph), settings, Rc::new(ManualScheduler::new()));
        sim.run_to_convergence(args.max_ticks)?
    };
    info!(ticks, "layout finished");

    let json = serde_json::to_string_pretty(&graph.borrow().to_document())?;
    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("netforce=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layout(args) => layout(&args)?,
        Commands::Settings => {
            print!("{}", serde_yaml::to_string(&SimulationSettings::default())?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_layout_with_defaults() {
        let cli = Cli::try_parse_from(["netforce", "layout", "--input", "graph.json"]).unwrap();
        match cli.command {
            Commands::Layout(args) => {
                assert_eq!(args.input, PathBuf::from("graph.json"));
                assert!(args.output.is_none());
                assert!(args.settings.is_none());
                assert_eq!(args.max_ticks, 10_000);
                assert!(!args.realtime);
                assert_eq!(args.fps, DEFAULT_FPS);
            }
            _ => panic!("Expected Layout command"),
        }
    }

    #[test]
    fn cli_parses_layout_options() {
        let cli = Cli::try_parse_from([
            "netforce",
            "layout",
            "-i",
            "in.json",
            "-o",
            "out.json",
            "-s",
            "s.yaml",
            "--max-ticks",
            "50",
            "--realtime",
            "--fps",
            "30",
        ])
        .unwrap();
        match cli.command {
            Commands::Layout(args) => {
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
                assert_eq!(args.settings, Some(PathBuf::from("s.yaml")));
                assert_eq!(args.max_ticks, 50);
                assert!(args.realtime);
                assert_eq!(args.fps, 30.0);
            }
            _ => panic!("Expected Layout command"),
        }
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["netforce"]).is_err());
    }

    #[test]
    fn cli_parses_settings_subcommand() {
        let cli = Cli::try_parse_from(["netforce", "settings"]).unwrap();
        assert!(matches!(cli.command, Commands::Settings));
    }
}
