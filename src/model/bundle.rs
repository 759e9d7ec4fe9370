//! Model directories
//!
//! ```text
//! model_dir/
//! ├── model.toml            # [backbone], [encoder], [classifier]
//! ├── taxonomy.json         # fitted TaxonEncoder
//! └── weights.safetensors   # every variable of the VarMap
//! ```

use std::path::Path;

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use mycotax_bio::{DnaEncoderConfig, TaxonEncoder};
use mycotax_core::config::{load_toml, save_toml};
use mycotax_core::{ClassifierConfig, MycotaxError, MycotaxResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::backbone::BackboneConfig;
use super::classifier::Classifier;

pub const MODEL_CONFIG_FILE: &str = "model.toml";
pub const TAXONOMY_FILE: &str = "taxonomy.json";
pub const WEIGHTS_FILE: &str = "weights.safetensors";

/// Everything needed to rebuild a classifier's architecture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backbone: BackboneConfig,
    #[serde(default)]
    pub encoder: DnaEncoderConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Reference dataset the taxonomy was fitted on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_ref: Option<String>,
}

impl ModelConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> MycotaxResult<Self> {
        let config: ModelConfig = load_toml(path)?;
        config.classifier.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> MycotaxResult<()> {
        save_toml(path, self)
    }
}

/// A classifier together with the variable store backing its weights
pub struct ModelBundle {
    config: ModelConfig,
    classifier: Classifier,
    varmap: VarMap,
}

impl ModelBundle {
    /// Build a freshly initialised model for `taxonomy`
    pub fn init(config: ModelConfig, taxonomy: TaxonEncoder, device: &Device) -> MycotaxResult<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);

        let dna_encoder = config.encoder.build()?;
        let backbone = config.backbone.build(
            &dna_encoder.row_shape(),
            taxonomy.vocab_size(),
            vb.pp("backbone"),
        )?;
        let mut classifier = Classifier::new(
            backbone,
            dna_encoder,
            taxonomy,
            config.classifier.clone(),
            vb,
            device.clone(),
        )?;
        if let Some(train_ref) = &config.train_ref {
            classifier.set_train_ref(train_ref.clone());
        }
        Ok(Self {
            config,
            classifier,
            varmap,
        })
    }

    /// Write the model directory, creating it if needed.
    ///
    /// The current masked levels are stored with the classifier configuration.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> MycotaxResult<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut config = self.config.clone();
        config.classifier.masked_levels = self.classifier.masked_levels().to_vec();
        config.train_ref = self.classifier.train_ref().map(str::to_string);
        config.save(dir.join(MODEL_CONFIG_FILE))?;
        self.classifier.taxonomy().save(dir.join(TAXONOMY_FILE))?;
        self.varmap.save(dir.join(WEIGHTS_FILE))?;

        info!(
            "Saved model ({} weight tensors) to {}",
            self.varmap.all_vars().len(),
            dir.display()
        );
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(dir: P, device: &Device) -> MycotaxResult<Self> {
        let dir = dir.as_ref();
        for file in [MODEL_CONFIG_FILE, TAXONOMY_FILE, WEIGHTS_FILE] {
            if !dir.join(file).exists() {
                return Err(MycotaxError::NotFound(format!(
                    "{} in model directory {}",
                    file,
                    dir.display()
                )));
            }
        }

        let config = ModelConfig::load(dir.join(MODEL_CONFIG_FILE))?;
        let taxonomy = TaxonEncoder::load(dir.join(TAXONOMY_FILE))?;
        let mut bundle = Self::init(config, taxonomy, device)?;
        bundle.varmap.load(dir.join(WEIGHTS_FILE))?;

        info!("Loaded model from {}", dir.display());
        Ok(bundle)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut Classifier {
        &mut self.classifier
    }

    pub fn into_classifier(self) -> Classifier {
        self.classifier
    }
}
