use crate::cli::commands::open_output;
use crate::cli::output::{format_number, print_success, spinner};
use crate::model::ModelBundle;
use crate::report::write_latent_tsv;
use candle_core::Device;
use clap::Args;
use mycotax_bio::SequenceData;
use std::io::Write;
use std::path::PathBuf;

#[derive(Args)]
pub struct LatentArgs {
    /// Model directory created by `mycotax init`
    #[arg(short, long, value_name = "DIR")]
    pub model: PathBuf,

    /// Query FASTA (plain or gzipped)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output TSV (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(args: LatentArgs) -> anyhow::Result<()> {
    let classifier = ModelBundle::load(&args.model, &Device::Cpu)?.into_classifier();

    let pb = spinner(format!("Encoding {}...", args.input.display()));
    let data = SequenceData::from_fasta(&args.input, false)?;
    let ids = data.ids();
    let latent = classifier.latent_space(data)?;
    pb.finish_and_clear();

    let mut writer = open_output(args.output.as_deref())?;
    write_latent_tsv(&ids, &latent, &mut writer)?;
    writer.flush()?;

    print_success(&format!(
        "Wrote {}-dimensional features for {} sequences",
        latent.first().map(Vec::len).unwrap_or(0),
        format_number(ids.len())
    ));
    Ok(())
}
