pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mycotax",
    version,
    about = "Hierarchical taxonomic classification of fungal ITS sequences",
    long_about = "Mycotax predicts phylum, class, order, family, genus and species for fungal \
                  ITS barcodes with neural output heads, several of which guarantee predictions \
                  consistent with the reference taxonomy."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a model directory from a labelled reference FASTA
    Init(commands::init::InitArgs),

    /// Predict all six ranks for every sequence of a FASTA file
    Classify(commands::classify::ClassifyArgs),

    /// Export bottleneck features for every sequence of a FASTA file
    Latent(commands::latent::LatentArgs),

    /// Show the configuration of a model directory
    Inspect(commands::inspect::InspectArgs),
}

impl Cli {
    /// Log filter implied by the `-v` count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
