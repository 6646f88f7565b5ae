use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wilco_sim::commands::{demo, g2, library, model, self_energy, verify};
use wilco_sim::{print_report, RunConfig, Session};

#[derive(Parser, Debug)]
#[command(name = "wilco-sim", about = "One-loop Wilson-coefficient matching for a toy gauge theory")]
struct Cli {
    /// Optional YAML run configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the model and its Feynman rules.
    Model,
    /// Compute and match the one-loop fermion self-energy.
    SelfEnergy,
    /// Compute the anomalous magnetic moment from the one-loop vertex.
    G2,
    /// Emit the C++ evaluation library.
    Library(LibraryArgs),
    /// Run every stage in order.
    Demo(DemoArgs),
    /// Randomized checks of round trip, determinism and canonical forms.
    Verify,
}

#[derive(ClapArgs, Debug)]
struct LibraryArgs {
    /// Output directory; defaults to the configured one.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct DemoArgs {
    /// Output directory of the library stage.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Wait for enter before each stage.
    #[arg(long)]
    pause: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).without_time())
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = RunConfig::load(cli.config.as_deref())?;
    let session = Session::new(config)?;
    match cli.command {
        Command::Model => print_report(&model::build_report(&session)?),
        Command::SelfEnergy => print_report(&self_energy::build_report(&session)?),
        Command::G2 => print_report(&g2::build_report(&session)?),
        Command::Library(args) => {
            let out = args.out.unwrap_or_else(|| session.config.library.out.clone());
            print_report(&library::build_report(&session, &out)?)
        }
        Command::Demo(args) => {
            let out = args.out.unwrap_or_else(|| session.config.library.out.clone());
            let stdin = io::stdin();
            let mut pacer = demo::Pacer::new(args.pause, stdin.lock(), io::stderr());
            print_report(&demo::build_report(&session, &out, &mut pacer)?)
        }
        Command::Verify => {
            let report = verify::build_report(&session)?;
            print_report(&report)?;
            if !report.passed {
                return Err("verification failed".into());
            }
            Ok(())
        }
    }
}
