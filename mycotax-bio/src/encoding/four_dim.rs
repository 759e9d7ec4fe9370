use candle_core::{Device, Tensor};
use mycotax_core::{ConfigMap, MycotaxResult};
use serde_json::json;

use super::{config_error, DnaEncoder};
use crate::sequence::Sequence;

/// One-hot style `[4, length]` encoding over A, C, G, T.
///
/// IUPAC ambiguity codes spread their weight evenly over the bases they stand
/// for. Longer sequences are truncated, shorter ones zero padded.
#[derive(Debug, Clone)]
pub struct FourDim {
    length: usize,
}

impl FourDim {
    pub fn new(length: usize) -> MycotaxResult<Self> {
        if length == 0 {
            return Err(config_error("FourDim length must be positive".to_string()));
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Channel weights (A, C, G, T) of one nucleotide code
    fn base_weights(base: u8) -> [f32; 4] {
        const THIRD: f32 = 1.0 / 3.0;
        match base.to_ascii_uppercase() {
            b'A' => [1.0, 0.0, 0.0, 0.0],
            b'C' => [0.0, 1.0, 0.0, 0.0],
            b'G' => [0.0, 0.0, 1.0, 0.0],
            b'T' | b'U' => [0.0, 0.0, 0.0, 1.0],
            b'R' => [0.5, 0.0, 0.5, 0.0],
            b'Y' => [0.0, 0.5, 0.0, 0.5],
            b'S' => [0.0, 0.5, 0.5, 0.0],
            b'W' => [0.5, 0.0, 0.0, 0.5],
            b'K' => [0.0, 0.0, 0.5, 0.5],
            b'M' => [0.5, 0.5, 0.0, 0.0],
            b'B' => [0.0, THIRD, THIRD, THIRD],
            b'D' => [THIRD, 0.0, THIRD, THIRD],
            b'H' => [THIRD, THIRD, 0.0, THIRD],
            b'V' => [THIRD, THIRD, THIRD, 0.0],
            b'N' => [0.25; 4],
            _ => [0.0; 4],
        }
    }
}

impl DnaEncoder for FourDim {
    fn name(&self) -> &'static str {
        "four_dim"
    }

    fn row_shape(&self) -> Vec<usize> {
        vec![4, self.length]
    }

    fn encode(&self, sequences: &[Sequence], device: &Device) -> MycotaxResult<Tensor> {
        let row = 4 * self.length;
        let mut data = vec![0f32; sequences.len() * row];
        for (i, seq) in sequences.iter().enumerate() {
            let offset = i * row;
            for (pos, &base) in seq.sequence.iter().take(self.length).enumerate() {
                for (channel, weight) in Self::base_weights(base).into_iter().enumerate() {
                    data[offset + channel * self.length + pos] = weight;
                }
            }
        }
        Ok(Tensor::from_vec(data, (sequences.len(), 4, self.length), device)?)
    }

    fn config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("type".to_string(), json!(self.name()));
        config.insert("length".to_string(), json!(self.length));
        config
    }
}
