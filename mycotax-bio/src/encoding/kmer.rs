use candle_core::{Device, Tensor};
use mycotax_core::{ConfigMap, MycotaxResult};
use serde_json::json;

use super::{config_error, DnaEncoder};
use crate::sequence::Sequence;

const MAX_K: usize = 8;

/// Relative k-mer frequencies, one `4^k` vector per sequence.
/// Windows containing anything other than A, C, G or T are skipped.
#[derive(Debug, Clone)]
pub struct KmerSpectrum {
    k: usize,
}

impl KmerSpectrum {
    pub fn new(k: usize) -> MycotaxResult<Self> {
        if k == 0 || k > MAX_K {
            return Err(config_error(format!("k must lie in 1..={}, got {}", MAX_K, k)));
        }
        Ok(Self { k })
    }

    fn base_code(base: u8) -> Option<usize> {
        match base.to_ascii_uppercase() {
            b'A' => Some(0),
            b'C' => Some(1),
            b'G' => Some(2),
            b'T' | b'U' => Some(3),
            _ => None,
        }
    }

    fn spectrum(&self, sequence: &[u8]) -> Vec<f32> {
        let mut counts = vec![0f32; 4usize.pow(self.k as u32)];
        let mut total = 0f32;
        for window in sequence.windows(self.k) {
            let index = window
                .iter()
                .try_fold(0usize, |acc, &b| Self::base_code(b).map(|code| acc * 4 + code));
            if let Some(index) = index {
                counts[index] += 1.0;
                total += 1.0;
            }
        }
        if total > 0.0 {
            counts.iter_mut().for_each(|c| *c /= total);
        }
        counts
    }
}

impl DnaEncoder for KmerSpectrum {
    fn name(&self) -> &'static str {
        "kmer_spectrum"
    }

    fn row_shape(&self) -> Vec<usize> {
        vec![4usize.pow(self.k as u32)]
    }

    fn encode(&self, sequences: &[Sequence], device: &Device) -> MycotaxResult<Tensor> {
        let width = self.row_width();
        let data: Vec<f32> = sequences
            .iter()
            .flat_map(|seq| self.spectrum(&seq.sequence))
            .collect();
        Ok(Tensor::from_vec(data, (sequences.len(), width), device)?)
    }

    fn config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("type".to_string(), json!(self.name()));
        config.insert("k".to_string(), json!(self.k));
        config
    }
}
