//! Configuration types for Mycotax

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::types::{Rank, RankSet, PRED_BATCH_SIZE};
use crate::MycotaxError;

/// Flat key/value view of a model's configuration, used for reproducibility.
pub type ConfigMap = BTreeMap<String, serde_json::Value>;

/// The strategy turning a shared feature vector into per-rank scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadKind {
    Single,
    Multi,
    Chained,
    InferParent,
    InferSum,
    Tree,
}

impl HeadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadKind::Single => "single",
            HeadKind::Multi => "multi",
            HeadKind::Chained => "chained",
            HeadKind::InferParent => "infer_parent",
            HeadKind::InferSum => "infer_sum",
            HeadKind::Tree => "tree",
        }
    }

    /// Heads that read the taxonomy's parent tables at construction time
    pub fn requires_taxonomy(&self) -> bool {
        matches!(self, HeadKind::InferParent | HeadKind::InferSum | HeadKind::Tree)
    }
}

impl fmt::Display for HeadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeadKind {
    type Err = MycotaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(HeadKind::Single),
            "multi" => Ok(HeadKind::Multi),
            "chained" => Ok(HeadKind::Chained),
            "infer_parent" | "inference" => Ok(HeadKind::InferParent),
            "infer_sum" => Ok(HeadKind::InferSum),
            "tree" | "softmax_tree" => Ok(HeadKind::Tree),
            _ => Err(MycotaxError::Configuration(format!("Unknown output head: {}", s))),
        }
    }
}

/// Flags of the chained multi-head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainedConfig {
    /// Process species first and phylum last
    pub ascending: bool,
    /// Feed softmax probabilities rather than raw scores to the next rank
    pub use_probs: bool,
    /// Every rank sees all earlier representations, not only the previous one
    pub all_access: bool,
}

impl Default for ChainedConfig {
    fn default() -> Self {
        Self {
            ascending: false,
            use_probs: true,
            all_access: true,
        }
    }
}

impl ChainedConfig {
    /// Build from the `[ascending, use_probs, all_access]` triple
    pub fn from_flags(flags: &[bool]) -> Result<Self, MycotaxError> {
        match flags {
            [ascending, use_probs, all_access] => Ok(Self {
                ascending: *ascending,
                use_probs: *use_probs,
                all_access: *all_access,
            }),
            _ => Err(MycotaxError::Configuration(format!(
                "chained_config must hold exactly 3 flags (ascending, use_probs, all_access), got {}",
                flags.len()
            ))),
        }
    }

    pub fn to_flags(&self) -> [bool; 3] {
        [self.ascending, self.use_probs, self.all_access]
    }
}

/// Construction-time parameters of a classifier. Immutable once the model is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_output")]
    pub output: HeadKind,
    /// Widths of the fully connected layers between backbone and output head
    #[serde(default)]
    pub fcn_layers: Vec<usize>,
    #[serde(default)]
    pub dropout: f32,
    #[serde(default = "default_target_levels")]
    pub target_levels: Vec<Rank>,
    #[serde(default = "default_chained_config")]
    pub chained_config: Vec<bool>,
    /// Directly predicted rank of the inference heads
    #[serde(default = "default_base_level")]
    pub base_level: Rank,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub masked_levels: Vec<Rank>,
}

// Default value functions
fn default_output() -> HeadKind { HeadKind::InferParent }
fn default_target_levels() -> Vec<Rank> { Rank::ALL.to_vec() }
fn default_chained_config() -> Vec<bool> { ChainedConfig::default().to_flags().to_vec() }
fn default_base_level() -> Rank { Rank::Species }
fn default_batch_size() -> usize { PRED_BATCH_SIZE }

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            fcn_layers: Vec::new(),
            dropout: 0.0,
            target_levels: default_target_levels(),
            chained_config: default_chained_config(),
            base_level: default_base_level(),
            batch_size: default_batch_size(),
            masked_levels: Vec::new(),
        }
    }
}

impl ClassifierConfig {
    pub fn with_output(mut self, output: HeadKind) -> Self {
        self.output = output;
        self
    }

    pub fn with_fcn_layers(mut self, layers: Vec<usize>) -> Self {
        self.fcn_layers = layers;
        self
    }

    pub fn with_base_level(mut self, rank: Rank) -> Self {
        self.base_level = rank;
        self
    }

    pub fn with_target_levels(mut self, ranks: Vec<Rank>) -> Self {
        self.target_levels = ranks;
        self
    }

    pub fn with_chained(mut self, chained: ChainedConfig) -> Self {
        self.chained_config = chained.to_flags().to_vec();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn chained(&self) -> Result<ChainedConfig, MycotaxError> {
        ChainedConfig::from_flags(&self.chained_config)
    }

    pub fn target_set(&self) -> RankSet {
        self.target_levels.iter().copied().collect()
    }

    pub fn masked_set(&self) -> RankSet {
        self.masked_levels.iter().copied().collect()
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), MycotaxError> {
        self.chained()?;
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(MycotaxError::Configuration(format!(
                "dropout must lie in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.target_levels.is_empty() {
            return Err(MycotaxError::Configuration(
                "target_levels must name at least one rank".to_string(),
            ));
        }
        if self.fcn_layers.contains(&0) {
            return Err(MycotaxError::Configuration(
                "fcn_layers cannot contain a zero-width layer".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(MycotaxError::Configuration("batch_size must be positive".to_string()));
        }
        Ok(())
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClassifierConfig, MycotaxError> {
    let config: ClassifierConfig = load_toml(path)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &ClassifierConfig) -> Result<(), MycotaxError> {
    save_toml(path, config)
}

/// Read any TOML-backed configuration document
pub fn load_toml<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, MycotaxError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

pub fn save_toml<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<(), MycotaxError> {
    let contents = toml::to_string_pretty(value)?;
    std::fs::write(path, contents)?;
    Ok(())
}
