//! DNA encoders turning raw sequences into model input tensors

pub mod four_dim;
pub mod kmer;

use candle_core::{Device, Tensor};
use mycotax_core::{ConfigMap, MycotaxError, MycotaxResult};
use serde::{Deserialize, Serialize};

use crate::sequence::Sequence;

pub use four_dim::FourDim;
pub use kmer::KmerSpectrum;

/// Turns a batch of sequences into a tensor with one row per sequence.
pub trait DnaEncoder: Send + Sync {
    /// Identifier stamped on every dataset this encoder produces
    fn name(&self) -> &'static str;

    /// Shape of a single encoded row, e.g. `[4, length]`
    fn row_shape(&self) -> Vec<usize>;

    fn encode(&self, sequences: &[Sequence], device: &Device) -> MycotaxResult<Tensor>;

    fn config(&self) -> ConfigMap;

    /// Number of values in one encoded row
    fn row_width(&self) -> usize {
        self.row_shape().iter().product()
    }
}

/// Serialisable choice of DNA encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DnaEncoderConfig {
    FourDim {
        #[serde(default = "default_length")]
        length: usize,
    },
    KmerSpectrum {
        #[serde(default = "default_k")]
        k: usize,
    },
}

fn default_length() -> usize { 1000 }
fn default_k() -> usize { 6 }

impl Default for DnaEncoderConfig {
    fn default() -> Self {
        DnaEncoderConfig::FourDim {
            length: default_length(),
        }
    }
}

impl DnaEncoderConfig {
    pub fn build(&self) -> MycotaxResult<Box<dyn DnaEncoder>> {
        match self {
            DnaEncoderConfig::FourDim { length } => Ok(Box::new(FourDim::new(*length)?)),
            DnaEncoderConfig::KmerSpectrum { k } => Ok(Box::new(KmerSpectrum::new(*k)?)),
        }
    }
}

pub(crate) fn config_error(message: String) -> MycotaxError {
    MycotaxError::Configuration(message)
}
