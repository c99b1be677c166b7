//! strgraph - CLI

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;

use strgraph::graph::{permute, CaseKind, Graph};
use strgraph::util::config::load_config;
use strgraph::util::logger;
use strgraph::{evaluate_with, EvalConfig, EvalRequest, NAME, VERSION};

/// Evaluate string computation graphs
#[derive(Parser, Debug)]
#[command(name = "strgraph")]
#[command(version = VERSION)]
#[command(about = "Evaluate string computation graphs", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./strgraph.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More logging; repeat for trace output
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a JSON request and print the resulting string
    Eval {
        /// Request file, or `-` for stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Evaluate this node instead of the request's output_node_index
        #[arg(long, value_name = "INDEX")]
        output: Option<usize>,

        /// Compute independent nodes on a thread pool
        #[arg(long)]
        parallel: bool,

        /// Worker threads for --parallel (0 = one per core)
        #[arg(long, value_name = "N")]
        threads: Option<usize>,

        /// Longest dependency chain to follow
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,
    },

    /// Run the built-in example, then replay it with shuffled indices
    Demo,

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    logger::init_with_level(config.log.level.raised_by(args.verbose));

    match args.command {
        Commands::Eval {
            file,
            output,
            parallel,
            threads,
            max_depth,
        } => {
            let mut eval = config.eval;
            if parallel {
                eval.parallel = true;
            }
            if let Some(threads) = threads {
                eval.threads = threads;
            }
            if let Some(max_depth) = max_depth {
                eval.max_depth = max_depth;
            }
            let value = eval_file(&file, output, &eval)?;
            println!("{}", value);
        }
        Commands::Demo => demo(&config.eval)?,
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}

fn eval_file(
    file: &Path,
    output: Option<usize>,
    config: &EvalConfig,
) -> Result<String> {
    let request = if file.as_os_str() == "-" {
        EvalRequest::from_reader(io::stdin().lock()).context("Failed to decode request from stdin")?
    } else {
        let reader = BufReader::new(
            File::open(file).with_context(|| format!("Failed to open: {}", file.display()))?,
        );
        EvalRequest::from_reader(reader)
            .with_context(|| format!("Failed to decode request: {}", file.display()))?
    };

    let output = output.unwrap_or(request.output_node_index);
    info!(nodes = request.nodes().len(), output, "evaluating");
    evaluate_with(request.nodes(), output, config).map_err(|err| {
        anyhow::anyhow!("error[{}]: {}", err.kind().code(), err)
    })
}

fn demo(config: &EvalConfig) -> Result<()> {
    let mut graph = Graph::new();
    let hello = graph.new_constant("Hello");
    let world = graph.new_constant("World");
    let upper = graph.new_case_conversion(world, CaseKind::Upper);
    let joined = graph.new_concatenation(&[hello, upper]);
    let llo = graph.new_constant("llo");
    let output = graph.new_replacement(joined, llo, joined);

    let value = evaluate_with(graph.nodes(), output.index(), config)?;
    println!("{}", value);

    // rotate every index by three positions
    let len = graph.len();
    let perm: Vec<usize> = (0..len).map(|i| (i + 3) % len).collect();
    let shuffled = permute(graph.nodes(), &perm).context("invalid permutation")?;
    let request = EvalRequest::new(shuffled, perm[output.index()]);
    println!("{}", request.to_json()?);

    let replay = evaluate_with(request.nodes(), request.output_node_index, config)?;
    println!("{}", replay);
    Ok(())
}
