use clap::{Parser, Subcommand};
use interval_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod terminal;

#[derive(Parser)]
#[command(name = "interval-cli", version, about = "Interval timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the work/rest timeline
    Timeline,
    /// Resolve elapsed seconds to a segment position
    Resolve {
        /// Seconds since the run started
        elapsed: f64,
    },
    /// Run the timer live in this terminal
    Run(commands::run::RunArgs),
    /// Replay a run on a simulated clock and print every cue
    Simulate(commands::simulate::SimulateArgs),
    /// Show the persisted run, if any, resolved against now
    Status,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();
    init_logging(&config);

    let result = match cli.command {
        Commands::Timeline => commands::timeline::show(),
        Commands::Resolve { elapsed } => commands::timeline::resolve(elapsed),
        Commands::Run(args) => commands::run::run(args, &config),
        Commands::Simulate(args) => commands::simulate::run(args, &config),
        Commands::Status => commands::status::run(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
