mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod pipeline;
mod quality;
mod queries;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands};

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ledger_migrate={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = cli.settings().and_then(|settings| match &cli.command {
        Commands::Init => cli::init::run(&settings),
        Commands::Transform { output } => cli::stages::transform(&settings, output),
        Commands::Validate { output } => cli::stages::validate(&settings, output),
        Commands::Summarize { output } => cli::stages::summarize(&settings, output),
        Commands::Report { .. } => cli::report::run(&settings),
        Commands::Run { .. } => cli::run::run(&settings),
        Commands::Status => cli::status::run(&settings),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(&settings),
            ConfigCommands::Init => cli::config::init(&settings, &cli.config_path()),
        },
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
