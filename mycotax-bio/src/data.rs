//! Labelled sequence collections and their encoded tensor form

use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use mycotax_core::{MycotaxError, MycotaxResult};

use crate::encoding::DnaEncoder;
use crate::formats::parse_fasta;
use crate::sequence::Sequence;
use crate::taxonomy::TaxonEncoder;

/// Raw sequences, optionally paired with their UNITE-style lineages.
#[derive(Debug, Clone, Default)]
pub struct SequenceData {
    pub sequences: Vec<Sequence>,
    pub lineages: Option<Vec<[String; 6]>>,
}

impl SequenceData {
    pub fn new(sequences: Vec<Sequence>) -> Self {
        Self {
            sequences,
            lineages: None,
        }
    }

    /// Read a (optionally gzipped) FASTA file. With `parse_lineages` set, every
    /// header must carry a lineage, otherwise the lineages are dropped.
    pub fn from_fasta<P: AsRef<Path>>(path: P, parse_lineages: bool) -> MycotaxResult<Self> {
        let sequences = parse_fasta(path.as_ref())?;
        let lineages = if parse_lineages {
            let parsed: Option<Vec<_>> = sequences.iter().map(Sequence::lineage).collect();
            if parsed.is_none() {
                tracing::warn!(
                    "Not every header in {} carries a lineage, continuing unlabelled",
                    path.as_ref().display()
                );
            }
            parsed
        } else {
            None
        };
        tracing::info!(
            "Loaded {} sequences from {}",
            sequences.len(),
            path.as_ref().display()
        );
        Ok(Self {
            sequences,
            lineages,
        })
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sequences.iter().map(|s| s.id.clone()).collect()
    }

    /// Encode inputs with `dna` and, when both lineages and a taxonomy are
    /// available, labels as a `[n, 6]` u32 tensor.
    pub fn encode_dataset(
        &self,
        dna: &dyn DnaEncoder,
        taxonomy: Option<&TaxonEncoder>,
        device: &Device,
    ) -> MycotaxResult<TensorData> {
        let inputs = dna.encode(&self.sequences, device)?;
        let labels = match (&self.lineages, taxonomy) {
            (Some(lineages), Some(taxonomy)) => encode_labels(lineages, taxonomy, device)?,
            _ => None,
        };
        TensorData::new(self.ids(), inputs, labels, dna.name())
    }
}

fn encode_labels(
    lineages: &[[String; 6]],
    taxonomy: &TaxonEncoder,
    device: &Device,
) -> MycotaxResult<Option<Tensor>> {
    let mut flat = Vec::with_capacity(lineages.len() * 6);
    for lineage in lineages {
        match taxonomy.encode(lineage) {
            Some(row) => flat.extend_from_slice(&row),
            None => {
                tracing::warn!(
                    "Lineage {:?} is unknown to the taxonomy, dataset left unlabelled",
                    lineage
                );
                return Ok(None);
            }
        }
    }
    Ok(Some(Tensor::from_vec(flat, (lineages.len(), 6), device)?))
}

/// Encoded dataset ready for the classifier.
#[derive(Debug, Clone)]
pub struct TensorData {
    ids: Vec<String>,
    inputs: Tensor,
    labels: Option<Tensor>,
    encoding: String,
}

impl TensorData {
    pub fn new(
        ids: Vec<String>,
        inputs: Tensor,
        labels: Option<Tensor>,
        encoding: impl Into<String>,
    ) -> MycotaxResult<Self> {
        let rows = inputs.dims().first().copied().unwrap_or(0);
        if rows != ids.len() {
            return Err(MycotaxError::InputType(format!(
                "{} ids for {} encoded rows",
                ids.len(),
                rows
            )));
        }
        if let Some(labels) = &labels {
            if labels.dims() != [rows, 6] {
                return Err(MycotaxError::InputType(format!(
                    "Labels must have shape [{}, 6], got {:?}",
                    rows,
                    labels.dims()
                )));
            }
        }
        Ok(Self {
            ids,
            inputs,
            labels,
            encoding: encoding.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn inputs(&self) -> &Tensor {
        &self.inputs
    }

    pub fn labels(&self) -> Option<&Tensor> {
        self.labels.as_ref()
    }

    /// Name of the DNA encoder that produced the inputs
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Consecutive `(inputs, labels)` slices of at most `batch_size` rows.
    pub fn batches(&self, batch_size: usize) -> Batches<'_> {
        Batches {
            inputs: &self.inputs,
            labels: self.labels.as_ref(),
            len: self.len(),
            batch_size: batch_size.max(1),
            start: 0,
        }
    }
}

pub struct Batches<'a> {
    inputs: &'a Tensor,
    labels: Option<&'a Tensor>,
    len: usize,
    batch_size: usize,
    start: usize,
}

impl Iterator for Batches<'_> {
    type Item = MycotaxResult<(Tensor, Option<Tensor>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.start >= self.len {
            return None;
        }
        let (start, size) = (self.start, self.batch_size.min(self.len - self.start));
        self.start += size;
        let slice = |t: &Tensor| t.narrow(0, start, size);
        let batch = slice(self.inputs).and_then(|inputs| {
            let labels = self.labels.map(slice).transpose()?;
            Ok((inputs, labels))
        });
        Some(batch.map_err(Into::into))
    }
}

/// Anything the classifier accepts as input.
#[derive(Debug, Clone)]
pub enum ClassifierInput {
    Path(PathBuf),
    Data(SequenceData),
    Encoded(TensorData),
}

impl From<&Path> for ClassifierInput {
    fn from(path: &Path) -> Self {
        ClassifierInput::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ClassifierInput {
    fn from(path: PathBuf) -> Self {
        ClassifierInput::Path(path)
    }
}

impl From<&str> for ClassifierInput {
    fn from(path: &str) -> Self {
        ClassifierInput::Path(PathBuf::from(path))
    }
}

impl From<SequenceData> for ClassifierInput {
    fn from(data: SequenceData) -> Self {
        ClassifierInput::Data(data)
    }
}

impl From<TensorData> for ClassifierInput {
    fn from(data: TensorData) -> Self {
        ClassifierInput::Encoded(data)
    }
}
