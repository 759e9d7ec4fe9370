use crate::cli::commands::open_output;
use crate::cli::output::{format_number, print_success, spinner};
use crate::model::ModelBundle;
use crate::report::{write_predictions, Format};
use candle_core::Device;
use clap::Args;
use mycotax_core::Rank;
use std::io::Write;
use std::path::PathBuf;

#[derive(Args)]
pub struct ClassifyArgs {
    /// Model directory created by `mycotax init`
    #[arg(short, long, value_name = "DIR")]
    pub model: PathBuf,

    /// Query FASTA (plain or gzipped)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Ranks to report as unknown (replaces the masked levels stored with the model)
    #[arg(long, value_delimiter = ',')]
    pub mask: Vec<String>,

    #[arg(short, long, value_enum, default_value = "tsv")]
    pub format: Format,

    /// Output file (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(args: ClassifyArgs) -> anyhow::Result<()> {
    let mut classifier = ModelBundle::load(&args.model, &Device::Cpu)?.into_classifier();
    if !args.mask.is_empty() {
        classifier.set_masked_levels(Rank::parse_list(args.mask.as_slice())?);
    }

    let pb = spinner(format!("Classifying {}...", args.input.display()));
    let table = classifier.classify(args.input.as_path())?;
    pb.finish_and_clear();

    let mut writer = open_output(args.output.as_deref())?;
    write_predictions(&table, args.format, &mut writer)?;
    writer.flush()?;

    print_success(&format!("Classified {} sequences", format_number(table.len())));
    Ok(())
}
