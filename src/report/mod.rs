//! Output formats for predictions and latent representations

pub mod table;

pub use table::PredictionTable;

use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Tsv,
    Json,
    Table,
}

/// Write a prediction table in the requested format
pub fn write_predictions<W: Write>(
    table: &PredictionTable,
    format: Format,
    mut writer: W,
) -> anyhow::Result<()> {
    match format {
        Format::Tsv => table.write_tsv(writer)?,
        Format::Json => writeln!(writer, "{}", table.to_json()?)?,
        Format::Table => writeln!(writer, "{}", table.render())?,
    }
    Ok(())
}

/// One TSV line per sequence: id followed by its latent coordinates
pub fn write_latent_tsv<W: Write>(ids: &[String], latent: &[Vec<f32>], mut writer: W) -> anyhow::Result<()> {
    if ids.len() != latent.len() {
        anyhow::bail!("{} ids for {} latent rows", ids.len(), latent.len());
    }
    let width = latent.first().map(Vec::len).unwrap_or(0);
    let header: Vec<String> = (0..width).map(|i| format!("z{}", i)).collect();
    writeln!(writer, "id\t{}", header.join("\t"))?;
    for (id, row) in ids.iter().zip(latent) {
        let values: Vec<String> = row.iter().map(|v| format!("{:.6}", v)).collect();
        writeln!(writer, "{}\t{}", id, values.join("\t"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latent_tsv() {
        let mut out = Vec::new();
        write_latent_tsv(&["a".to_string()], &[vec![0.5, -1.0]], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "id\tz0\tz1\na\t0.500000\t-1.000000\n");
    }

    #[test]
    fn test_latent_tsv_mismatch() {
        assert!(write_latent_tsv(&[], &[vec![1.0]], Vec::new()).is_err());
    }
}
