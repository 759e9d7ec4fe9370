use clap::Parser;
use colored::*;
use mycotax::cli::{output, Cli, Commands};
use mycotax::MycotaxError;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // MYCOTAX_LOG takes precedence over the -v count
    let log_level = std::env::var("MYCOTAX_LOG").unwrap_or_else(|_| cli.log_level().to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    output::init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<MycotaxError>() {
            Some(MycotaxError::Configuration(_)) => 2,
            Some(MycotaxError::Io(_)) => 3,
            Some(MycotaxError::Parse(_)) | Some(MycotaxError::InputType(_)) => 4,
            Some(MycotaxError::Tensor(_)) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init(args) => mycotax::cli::commands::init::run(args),
        Commands::Classify(args) => mycotax::cli::commands::classify::run(args),
        Commands::Latent(args) => mycotax::cli::commands::latent::run(args),
        Commands::Inspect(args) => mycotax::cli::commands::inspect::run(args),
    }
}
