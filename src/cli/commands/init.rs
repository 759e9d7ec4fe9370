use crate::cli::output::{format_number, print_item, print_section, print_success, spinner};
use crate::model::{ModelBundle, ModelConfig};
use candle_core::Device;
use clap::Args;
use mycotax_bio::{SequenceData, TaxonEncoder};
use mycotax_core::{MycotaxError, Rank};
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Reference FASTA with UNITE-style lineages in the headers
    #[arg(short, long, value_name = "FILE")]
    pub reference: PathBuf,

    /// Model description (TOML with [backbone], [encoder] and [classifier])
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory to write the model to
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,
}

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ModelConfig::load(path)?,
        None => ModelConfig::default(),
    };
    config.train_ref = Some(args.reference.display().to_string());

    let pb = spinner(format!("Reading {}...", args.reference.display()));
    let reference = SequenceData::from_fasta(&args.reference, true)?;
    let lineages = reference.lineages.ok_or_else(|| {
        MycotaxError::Parse(format!(
            "{} has headers without a lineage",
            args.reference.display()
        ))
    })?;
    let taxonomy = TaxonEncoder::fit(lineages)?;
    pb.finish_and_clear();

    let bundle = ModelBundle::init(config, taxonomy, &Device::Cpu)?;
    bundle.save(&args.output)?;

    print_section("Model");
    let taxonomy = bundle.classifier().taxonomy();
    for rank in Rank::ALL {
        print_item(rank.name(), format_number(taxonomy.classes(rank)));
    }
    print_item("output head", bundle.classifier().head().kind());
    print_success(&format!("Model written to {}", args.output.display()));
    Ok(())
}
