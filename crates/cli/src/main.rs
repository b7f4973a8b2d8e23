use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use orgtree_core::{
    EngineConfig, MutationService, RollupCalculator, TreeBuilder, VisibilityFlattener,
};
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod input;
mod render;

/// Exit code for a move the engine rejected
const EXIT_REJECTED: u8 = 2;

#[derive(Parser)]
#[command(name = "orgtree")]
#[command(about = "Build, roll up and inspect team hierarchies", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Engine config (TOML); overrides ORGTREE_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll up metrics and print the visible rows
    Rollup(RollupArgs),

    /// Validate moving a node (and its subtree) under a new parent
    Move(MoveArgs),

    /// Report repairs applied while building the hierarchy
    Check(CheckArgs),
}

#[derive(Args)]
struct RollupArgs {
    /// Record snapshot (JSON), `-` for stdin
    #[arg(long)]
    records: PathBuf,

    /// Expanded node id (repeatable)
    #[arg(long = "expand", value_name = "ID")]
    expand: Vec<String>,

    /// Expand every node that has children
    #[arg(long)]
    expand_all: bool,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MoveArgs {
    /// Record snapshot (JSON), `-` for stdin
    #[arg(long)]
    records: PathBuf,

    /// Node to move
    #[arg(long, value_name = "ID")]
    node: String,

    /// New parent; omit to promote the node to a root
    #[arg(long, value_name = "ID")]
    parent: Option<String>,

    /// Include the resulting record snapshot in the output
    #[arg(long)]
    print_records: bool,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CheckArgs {
    /// Record snapshot (JSON), `-` for stdin
    #[arg(long)]
    records: PathBuf,

    /// Fail when any repair was needed
    #[arg(long)]
    strict: bool,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<ExitCode> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    let json_output = match &cli.command {
        Commands::Rollup(args) => args.json,
        Commands::Move(args) => args.json,
        Commands::Check(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }
    init_logging(cli.verbose, cli.quiet);

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Rollup(args) => run_rollup(args, &config),
        Commands::Move(args) => run_move(args, &config),
        Commands::Check(args) => run_check(args, &config),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn run_rollup(args: RollupArgs, config: &EngineConfig) -> Result<ExitCode> {
    let records = input::read_records(&args.records)?;
    let forest = TreeBuilder::new(config.tree.clone()).build(&records);
    let calculator = RollupCalculator::new(config.metrics.clone())?;
    let rolled = calculator.rollup(&forest);

    let expanded: HashSet<String> = if args.expand_all {
        VisibilityFlattener::expand_all(&forest)
    } else {
        args.expand.into_iter().collect()
    };
    for id in &expanded {
        if !forest.contains(id) {
            log::warn!("Expanded id {} is not in the snapshot", id);
        }
    }

    let rows = VisibilityFlattener::flatten(&rolled, &expanded);
    let totals = rolled.totals();

    if args.json {
        render::print_json(&json!({
            "rows": rows,
            "totals": totals,
            "report": forest.report(),
        }))?;
    } else {
        render::print_stdout(&render::rows_table(&rows, calculator.spec(), &totals))?;
    }
    Ok(ExitCode::SUCCESS)
}

fn run_move(args: MoveArgs, config: &EngineConfig) -> Result<ExitCode> {
    let records = input::read_records(&args.records)?;
    let forest = TreeBuilder::new(config.tree.clone()).build(&records);

    match MutationService::reparent(&forest, &args.node, args.parent.as_deref()) {
        Ok(moved) => {
            if args.json {
                let mut out = json!({
                    "status": "accepted",
                    "change": moved.change,
                    "ancestry": moved.ancestry,
                });
                if args.print_records {
                    out["records"] = serde_json::to_value(moved.forest.to_records())?;
                }
                render::print_json(&out)?;
            } else {
                render::print_stdout(&render::move_summary(&moved))?;
                if args.print_records {
                    render::print_stdout(&serde_json::to_string_pretty(
                        &moved.forest.to_records(),
                    )?)?;
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            log::warn!("Move rejected: {}", err);
            if args.json {
                render::print_json(&json!({
                    "status": "rejected",
                    "error": err.report(),
                }))?;
            } else {
                eprintln!("move rejected: {err}");
            }
            Ok(ExitCode::from(EXIT_REJECTED))
        }
    }
}

fn run_check(args: CheckArgs, config: &EngineConfig) -> Result<ExitCode> {
    let records = input::read_records(&args.records)?;
    let forest = TreeBuilder::new(config.tree.clone()).build(&records);
    let stats = forest.stats();
    let report = forest.report();

    if args.json {
        render::print_json(&json!({
            "stats": stats,
            "report": report,
            "clean": report.is_clean(),
        }))?;
    } else {
        render::print_stdout(&render::check_summary(&stats, report))?;
    }

    if args.strict && !report.is_clean() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
