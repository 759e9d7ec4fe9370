//! Feature extractors sitting between the DNA encoding and the output head
//!
//! A backbone is either *standard* (one feature vector per sequence) or
//! *sequence conditioned* (one feature vector per position of a partial
//! target sequence). The mode is fixed when the backbone is built.

use candle_core::{DType, Module, Tensor};
use candle_nn::{Conv1d, Conv1dConfig, Embedding, Linear, VarBuilder};
use mycotax_core::{ConfigMap, MycotaxError, MycotaxResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Longest target buffer the decoder builds: start token plus one token per rank
pub const MAX_TARGET_LEN: usize = 7;

/// Maps a batch of encoded sequences to `[n, hidden_width]` features.
pub trait FeatureExtractor: Send + Sync {
    fn hidden_width(&self) -> usize;

    fn forward(&self, x: &Tensor) -> MycotaxResult<Tensor>;

    fn config(&self) -> ConfigMap;
}

/// Maps encoded sequences and a `[n, len]` u32 target buffer to
/// `[n, len, hidden_width]` features, one per target position.
pub trait TargetConditionedExtractor: Send + Sync {
    fn hidden_width(&self) -> usize;

    fn forward(&self, x: &Tensor, tgt: &Tensor) -> MycotaxResult<Tensor>;

    fn config(&self) -> ConfigMap;
}

pub enum Backbone {
    Standard(Box<dyn FeatureExtractor>),
    SequenceConditioned(Box<dyn TargetConditionedExtractor>),
}

impl Backbone {
    pub fn hidden_width(&self) -> usize {
        match self {
            Backbone::Standard(b) => b.hidden_width(),
            Backbone::SequenceConditioned(b) => b.hidden_width(),
        }
    }

    pub fn config(&self) -> ConfigMap {
        match self {
            Backbone::Standard(b) => b.config(),
            Backbone::SequenceConditioned(b) => b.config(),
        }
    }

    pub fn is_sequence_conditioned(&self) -> bool {
        matches!(self, Backbone::SequenceConditioned(_))
    }
}

impl std::fmt::Debug for Backbone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = if self.is_sequence_conditioned() {
            "SequenceConditioned"
        } else {
            "Standard"
        };
        f.debug_struct("Backbone")
            .field("mode", &mode)
            .field("hidden_width", &self.hidden_width())
            .finish()
    }
}

/// Serialisable backbone description, stored under `[backbone]` in `model.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackboneConfig {
    /// Flatten, one linear layer, relu
    Mlp { hidden: usize },
    /// Stacked `same`-padded convolutions with relu and stride-1 max pooling
    Cnn {
        #[serde(default = "default_first_kernel")]
        first_kernel: usize,
        conv_layers: Vec<usize>,
    },
    /// Target-conditioned decoder over learned token and position embeddings
    EncoderDecoder { d_model: usize },
}

fn default_first_kernel() -> usize { 5 }

impl Default for BackboneConfig {
    fn default() -> Self {
        BackboneConfig::Mlp { hidden: 128 }
    }
}

impl BackboneConfig {
    /// Build the backbone for inputs whose rows have shape `row_shape`.
    /// `vocab_size` sizes the target embedding of the encoder-decoder.
    pub fn build(
        &self,
        row_shape: &[usize],
        vocab_size: usize,
        vb: VarBuilder,
    ) -> MycotaxResult<Backbone> {
        let input_width: usize = row_shape.iter().product();
        match self {
            BackboneConfig::Mlp { hidden } => Ok(Backbone::Standard(Box::new(MlpBackbone::new(
                input_width,
                *hidden,
                vb,
            )?))),
            BackboneConfig::Cnn {
                first_kernel,
                conv_layers,
            } => Ok(Backbone::Standard(Box::new(CnnBackbone::new(
                row_shape,
                *first_kernel,
                conv_layers,
                vb,
            )?))),
            BackboneConfig::EncoderDecoder { d_model } => Ok(Backbone::SequenceConditioned(
                Box::new(TargetEmbeddingDecoder::new(input_width, vocab_size, *d_model, vb)?),
            )),
        }
    }
}

pub struct MlpBackbone {
    proj: Linear,
    hidden: usize,
}

impl MlpBackbone {
    pub fn new(input_width: usize, hidden: usize, vb: VarBuilder) -> MycotaxResult<Self> {
        if hidden == 0 {
            return Err(MycotaxError::Configuration(
                "MLP backbone needs a positive hidden width".to_string(),
            ));
        }
        let proj = candle_nn::linear(input_width, hidden, vb.pp("proj"))?;
        Ok(Self { proj, hidden })
    }
}

impl FeatureExtractor for MlpBackbone {
    fn hidden_width(&self) -> usize {
        self.hidden
    }

    fn forward(&self, x: &Tensor) -> MycotaxResult<Tensor> {
        let x = x.flatten_from(1)?;
        Ok(self.proj.forward(&x)?.relu()?)
    }

    fn config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("type".to_string(), json!("mlp"));
        config.insert("hidden".to_string(), json!(self.hidden));
        config
    }
}

/// Convolutional feature extractor over `[n, channels, length]` inputs.
pub struct CnnBackbone {
    convs: Vec<Conv1d>,
    first_kernel: usize,
    channels: Vec<usize>,
    hidden: usize,
}

impl CnnBackbone {
    const POOL: usize = 3;

    pub fn new(
        row_shape: &[usize],
        first_kernel: usize,
        conv_layers: &[usize],
        vb: VarBuilder,
    ) -> MycotaxResult<Self> {
        let [in_channels, length] = row_shape else {
            return Err(MycotaxError::Configuration(format!(
                "CNN backbone expects [channels, length] rows, got {:?}",
                row_shape
            )));
        };
        if first_kernel % 2 == 0 || conv_layers.is_empty() || conv_layers.contains(&0) {
            return Err(MycotaxError::Configuration(
                "CNN backbone needs an odd first kernel and non-empty positive conv layers"
                    .to_string(),
            ));
        }
        // Each pooling step shortens the sequence by POOL - 1
        let shrink = conv_layers.len() * (Self::POOL - 1);
        if *length <= shrink {
            return Err(MycotaxError::Configuration(format!(
                "Sequences of length {} are too short for {} conv layers",
                length,
                conv_layers.len()
            )));
        }

        let mut convs = Vec::with_capacity(conv_layers.len());
        let mut channels = *in_channels;
        for (i, &out) in conv_layers.iter().enumerate() {
            let kernel = if i == 0 { first_kernel } else { 3 };
            let cfg = Conv1dConfig {
                padding: kernel / 2,
                ..Default::default()
            };
            convs.push(candle_nn::conv1d(channels, out, kernel, cfg, vb.pp(format!("conv{}", i)))?);
            channels = out;
        }
        Ok(Self {
            convs,
            first_kernel,
            channels: conv_layers.to_vec(),
            hidden: channels * (length - shrink),
        })
    }
}

impl FeatureExtractor for CnnBackbone {
    fn hidden_width(&self) -> usize {
        self.hidden
    }

    fn forward(&self, x: &Tensor) -> MycotaxResult<Tensor> {
        let mut x = x.clone();
        for conv in &self.convs {
            let h = conv.forward(&x)?.relu()?;
            x = h
                .unsqueeze(2)?
                .max_pool2d_with_stride((1, Self::POOL), (1, 1))?
                .squeeze(2)?;
        }
        Ok(x.flatten_from(1)?)
    }

    fn config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("type".to_string(), json!("cnn"));
        config.insert("first_kernel".to_string(), json!(self.first_kernel));
        config.insert("conv_layers".to_string(), json!(self.channels));
        config
    }
}

/// Sequence-conditioned extractor: every target position mixes the projected
/// input with the embedding of its own token and position. Position `i` only
/// sees token `i`, so the feature for rank `r` depends on the tokens fed back
/// for ranks before `r` alone.
pub struct TargetEmbeddingDecoder {
    memory: Linear,
    tokens: Embedding,
    positions: Embedding,
    d_model: usize,
    vocab_size: usize,
}

impl TargetEmbeddingDecoder {
    pub fn new(
        input_width: usize,
        vocab_size: usize,
        d_model: usize,
        vb: VarBuilder,
    ) -> MycotaxResult<Self> {
        if d_model == 0 || vocab_size == 0 {
            return Err(MycotaxError::Configuration(
                "Encoder-decoder needs positive d_model and vocabulary".to_string(),
            ));
        }
        Ok(Self {
            memory: candle_nn::linear(input_width, d_model, vb.pp("memory"))?,
            tokens: candle_nn::embedding(vocab_size, d_model, vb.pp("tokens"))?,
            positions: candle_nn::embedding(MAX_TARGET_LEN, d_model, vb.pp("positions"))?,
            d_model,
            vocab_size,
        })
    }
}

impl TargetConditionedExtractor for TargetEmbeddingDecoder {
    fn hidden_width(&self) -> usize {
        self.d_model
    }

    fn forward(&self, x: &Tensor, tgt: &Tensor) -> MycotaxResult<Tensor> {
        let len = tgt.dim(1)?;
        if len > MAX_TARGET_LEN {
            return Err(MycotaxError::InvalidInput(format!(
                "Target buffer of length {} exceeds {}",
                len, MAX_TARGET_LEN
            )));
        }
        let memory = self.memory.forward(&x.flatten_from(1)?)?.relu()?.unsqueeze(1)?;
        let tokens = self.tokens.forward(&tgt.to_dtype(DType::U32)?)?;
        let positions = self
            .positions
            .forward(&Tensor::arange(0u32, len as u32, tgt.device())?)?;
        Ok(tokens
            .broadcast_add(&positions)?
            .broadcast_add(&memory)?
            .tanh()?)
    }

    fn config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("type".to_string(), json!("encoder_decoder"));
        config.insert("d_model".to_string(), json!(self.d_model));
        config.insert("vocab_size".to_string(), json!(self.vocab_size));
        config
    }
}
