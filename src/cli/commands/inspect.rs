use crate::cli::output::print_key_value_table;
use crate::model::ModelBundle;
use candle_core::Device;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct InspectArgs {
    /// Model directory created by `mycotax init`
    #[arg(short, long, value_name = "DIR")]
    pub model: PathBuf,

    /// Print the configuration as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let bundle = ModelBundle::load(&args.model, &Device::Cpu)?;
    let config = bundle.classifier().get_config();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let rows = config
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect();
    print_key_value_table(&format!("Model {}", args.model.display()), rows);
    Ok(())
}
