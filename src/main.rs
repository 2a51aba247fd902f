mod cli;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use nnhdl::adder::AdderTopology;
use nnhdl::model::QuantizeMode;

#[derive(Parser)]
#[command(
    name = "nnhdl",
    version,
    about = "Lower feed-forward neural networks to floating-point HDL netlists"
)]
struct Cli {
    /// Log lowering details to stderr (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a netlist (.sv) from a model file
    Generate {
        /// Model interchange file (default: [project].model)
        model: Option<PathBuf>,
        /// Destination .sv file; its stem names the module
        dest: Option<PathBuf>,
        /// Float format: binary16, binary32, binary64
        #[arg(long)]
        float: Option<String>,
        /// Adder network for dense layers
        #[arg(long, value_enum)]
        adder: Option<AdderTopology>,
        /// Project file (default: nearest nnhdl.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Evaluate a model on concrete inputs
    Simulate {
        /// Model interchange file
        model: PathBuf,
        /// Comma-separated input values
        #[arg(long, allow_hyphen_values = true)]
        inputs: String,
        /// Refine incremental log layers step by step until saturated
        #[arg(long)]
        incremental: bool,
        /// Also propagate input intervals
        #[arg(long)]
        intervals: bool,
        /// Widen every input to [x - d, x + d] for interval propagation
        #[arg(long, default_value_t = 0.0)]
        artificial_interval: f64,
        /// Also generate the netlist and simulate it
        #[arg(long)]
        netlist: bool,
        /// Project file for --netlist (default: nearest nnhdl.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Log-quantize the dense layers of a model
    Quantize {
        /// Model interchange file
        model: PathBuf,
        /// Destination interchange file
        dest: PathBuf,
        /// Quantization precision (default: [quantize].precision)
        #[arg(long)]
        precision: Option<f64>,
        /// Which dense layers to convert
        #[arg(long, value_enum)]
        mode: Option<QuantizeMode>,
        /// Project file (default: nearest nnhdl.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Command::Generate {
            model,
            dest,
            float,
            adder,
            config,
        } => cli::generate::cmd_generate(model, dest, float, adder, config),
        Command::Simulate {
            model,
            inputs,
            incremental,
            intervals,
            artificial_interval,
            netlist,
            config,
        } => cli::simulate::cmd_simulate(
            model,
            &inputs,
            incremental,
            intervals,
            artificial_interval,
            netlist,
            config,
        ),
        Command::Quantize {
            model,
            dest,
            precision,
            mode,
            config,
        } => cli::quantize::cmd_quantize(model, dest, precision, mode, config),
    }
}
