//! The classifier: DNA encoder, backbone, FCN stack and output head wired together
//!
//! Standard backbones run `backbone -> dropout -> fcn -> head` in one pass.
//! Sequence-conditioned backbones hand the same per-rank pipeline to the
//! [`SequentialDecoder`], which scores one rank at a time.

use candle_core::{Device, Tensor, D};
use candle_nn::{Dropout, VarBuilder};
use mycotax_bio::{ClassifierInput, DnaEncoder, SequenceData, TaxonEncoder, TensorData};
use mycotax_core::{
    ClassifierConfig, ConfigMap, HeadKind, MycotaxError, MycotaxResult, Rank, RankSet,
};
use serde_json::json;
use tracing::{debug, info, warn};

use super::backbone::Backbone;
use super::decoder::{SequentialDecoder, TokenSource};
use super::fcn::FcnStack;
use super::heads::OutputHead;
use crate::report::PredictionTable;

/// Argmax class indices per row, with the true labels when requested
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    pub rows: Vec<[u32; 6]>,
    pub labels: Option<Vec<[u32; 6]>>,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Predicted indices of one rank, in row order
    pub fn column(&self, rank: Rank) -> Vec<u32> {
        self.rows.iter().map(|row| row[rank.index()]).collect()
    }
}

pub struct Classifier {
    backbone: Backbone,
    dna_encoder: Box<dyn DnaEncoder>,
    taxonomy: TaxonEncoder,
    fcn: FcnStack,
    dropout: Dropout,
    head: OutputHead,
    config: ClassifierConfig,
    masked: RankSet,
    training: bool,
    train_ref: Option<String>,
    device: Device,
}

impl Classifier {
    /// Assemble a classifier around an already built backbone.
    ///
    /// FCN weights are read from `vb.pp("fcn")` and head weights from
    /// `vb.pp("output")`. Sequence-conditioned backbones only pair with a
    /// multi head targeting every rank.
    pub fn new(
        backbone: Backbone,
        dna_encoder: Box<dyn DnaEncoder>,
        taxonomy: TaxonEncoder,
        config: ClassifierConfig,
        vb: VarBuilder,
        device: Device,
    ) -> MycotaxResult<Self> {
        config.validate()?;
        if backbone.is_sequence_conditioned() {
            if config.output != HeadKind::Multi {
                return Err(MycotaxError::Configuration(format!(
                    "Sequence-conditioned backbones require a multi output head, got '{}'",
                    config.output
                )));
            }
            if config.target_set() != RankSet::all() {
                return Err(MycotaxError::Configuration(
                    "Sequence-conditioned backbones decode every rank, target_levels must list all six"
                        .to_string(),
                ));
            }
        }

        let fcn = FcnStack::new(backbone.hidden_width(), &config.fcn_layers, vb.pp("fcn"))?;
        let head = OutputHead::build(
            &config,
            fcn.output_width(),
            taxonomy.class_counts(),
            Some(&taxonomy),
            &device,
            vb.pp("output"),
        )?;
        info!(
            "Built classifier: {:?}, encoder {}, fcn {:?}, {} head",
            backbone,
            dna_encoder.name(),
            config.fcn_layers,
            head.kind()
        );

        Ok(Self {
            dropout: Dropout::new(config.dropout),
            masked: config.masked_set(),
            backbone,
            dna_encoder,
            taxonomy,
            fcn,
            head,
            config,
            training: false,
            train_ref: None,
            device,
        })
    }

    /// Six score tensors for a batch of encoded inputs.
    ///
    /// `labels` (`[n, 6]` u32) switch a sequence-conditioned backbone to
    /// teacher forcing; standard backbones ignore them.
    pub fn forward(&self, x: &Tensor, labels: Option<&Tensor>) -> MycotaxResult<Vec<Tensor>> {
        match &self.backbone {
            Backbone::Standard(backbone) => {
                let h = backbone.forward(x)?;
                let h = self.dropout.forward(&h, self.training)?;
                let h = self.fcn.forward(&h)?;
                self.head.forward(&h)
            }
            Backbone::SequenceConditioned(backbone) => {
                let decoder = SequentialDecoder::new(backbone.as_ref(), &self.taxonomy);
                decoder.run(x, TokenSource::from_labels(labels), |h, rank| {
                    let h = self.dropout.forward(h, self.training)?;
                    let h = self.fcn.forward(&h)?;
                    self.head
                        .forward_levels(&h, &[rank])?
                        .pop()
                        .ok_or_else(|| {
                            MycotaxError::Other(format!("No scores produced for {}", rank))
                        })
                })
            }
        }
    }

    /// Argmax predictions over `data`, batched by the configured batch size.
    pub fn predict(&self, data: &TensorData, return_labels: bool) -> MycotaxResult<Predictions> {
        self.predict_batched(data, self.config.batch_size, return_labels)
    }

    pub fn predict_batched(
        &self,
        data: &TensorData,
        batch_size: usize,
        return_labels: bool,
    ) -> MycotaxResult<Predictions> {
        if return_labels && data.labels().is_none() {
            return Err(MycotaxError::InputType(
                "True labels requested for an unlabelled dataset".to_string(),
            ));
        }

        let mut rows = Vec::with_capacity(data.len());
        let mut labels = return_labels.then(|| Vec::with_capacity(data.len()));
        for (i, batch) in data.batches(batch_size).enumerate() {
            let (inputs, batch_labels) = batch?;
            let scores = self.forward(&inputs, None)?;
            let columns = scores
                .iter()
                .map(|s| Ok(s.argmax(D::Minus1)?.to_vec1::<u32>()?))
                .collect::<MycotaxResult<Vec<_>>>()?;
            let n = inputs.dim(0)?;
            rows.extend((0..n).map(|row| std::array::from_fn(|r| columns[r][row])));

            if let (Some(labels), Some(batch_labels)) = (labels.as_mut(), batch_labels) {
                for row in batch_labels.to_vec2::<u32>()? {
                    labels.push(label_row(&row)?);
                }
            }
            debug!("Predicted batch {} ({} rows)", i, n);
        }
        Ok(Predictions { rows, labels })
    }

    /// Decoded taxon names for every input row, masked ranks set to the unknown label.
    pub fn classify(&self, input: impl Into<ClassifierInput>) -> MycotaxResult<PredictionTable> {
        let data = self.encode_input(input.into(), false)?;
        info!(
            "Classifying {} sequences in batches of {}",
            data.len(),
            self.config.batch_size
        );
        if data.is_empty() {
            warn!("Nothing to classify, input holds no sequences");
        }

        let predictions = self.predict(&data, false)?;
        let names = self.taxonomy.decode(&predictions.rows);
        let mask = self
            .masked
            .union(self.head.predicted_ranks().complement());
        Ok(PredictionTable::new(data.ids().to_vec(), names)?.with_masked(mask))
    }

    /// Bottleneck features for every input row.
    ///
    /// Runs the backbone and the FCN stack up to and including the linear map
    /// of its narrowest layer. Without FCN layers this is the backbone output.
    pub fn latent_space(&self, input: impl Into<ClassifierInput>) -> MycotaxResult<Vec<Vec<f32>>> {
        let Backbone::Standard(backbone) = &self.backbone else {
            return Err(MycotaxError::Configuration(
                "Latent space extraction needs a standard backbone".to_string(),
            ));
        };
        let data = self.encode_input(input.into(), false)?;
        info!(
            "Extracting {}-wide latent features for {} sequences",
            self.fcn.latent_width(),
            data.len()
        );

        let mut latent = Vec::with_capacity(data.len());
        for batch in data.batches(self.config.batch_size) {
            let (inputs, _) = batch?;
            let h = backbone.forward(&inputs)?;
            latent.extend(self.fcn.forward_until_bottleneck(&h)?.to_vec2::<f32>()?);
        }
        Ok(latent)
    }

    /// Normalise any accepted input form to a dataset encoded by this
    /// classifier's DNA encoder.
    pub fn encode_input(&self, input: ClassifierInput, with_labels: bool) -> MycotaxResult<TensorData> {
        let data = match input {
            ClassifierInput::Path(path) => SequenceData::from_fasta(&path, with_labels)?
                .encode_dataset(self.dna_encoder.as_ref(), Some(&self.taxonomy), &self.device)?,
            ClassifierInput::Data(data) => {
                data.encode_dataset(self.dna_encoder.as_ref(), Some(&self.taxonomy), &self.device)?
            }
            ClassifierInput::Encoded(data) => data,
        };

        if data.encoding() != self.dna_encoder.name() {
            return Err(MycotaxError::InputType(format!(
                "Dataset encoded with '{}', classifier expects '{}'",
                data.encoding(),
                self.dna_encoder.name()
            )));
        }
        let row_shape = &data.inputs().dims()[1..];
        if row_shape != self.dna_encoder.row_shape().as_slice() {
            return Err(MycotaxError::InputType(format!(
                "Encoded rows have shape {:?}, classifier expects {:?}",
                row_shape,
                self.dna_encoder.row_shape()
            )));
        }
        Ok(data)
    }

    /// Ranks always reported as unknown, replacing any previous set
    pub fn set_masked_levels(&mut self, ranks: impl IntoIterator<Item = Rank>) {
        self.masked = ranks.into_iter().collect();
        debug!("Masked levels set to {}", self.masked);
    }

    pub fn masked_levels(&self) -> RankSet {
        self.masked
    }

    /// Flat configuration of every component, for reproducibility
    pub fn get_config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        for (key, value) in self.backbone.config() {
            config.insert(format!("base_arch_{}", key), value);
        }
        for (key, value) in self.dna_encoder.config() {
            config.insert(format!("dna_encoder_{}", key), value);
        }
        config.insert("fcn".to_string(), json!(self.fcn.widths()));
        config.insert("dropout".to_string(), json!(self.config.dropout));
        config.insert(
            "target_levels".to_string(),
            json!(self
                .config
                .target_levels
                .iter()
                .map(|r| r.name())
                .collect::<Vec<_>>()),
        );
        config.extend(self.head.config());
        config.insert("train_ref".to_string(), json!(self.train_ref));
        config
    }

    /// Enable dropout for subsequent forward passes
    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    /// Record the reference dataset the weights were fitted on
    pub fn set_train_ref(&mut self, train_ref: impl Into<String>) {
        self.train_ref = Some(train_ref.into());
    }

    pub fn train_ref(&self) -> Option<&str> {
        self.train_ref.as_deref()
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn taxonomy(&self) -> &TaxonEncoder {
        &self.taxonomy
    }

    pub fn head(&self) -> &OutputHead {
        &self.head
    }

    pub fn backbone(&self) -> &Backbone {
        &self.backbone
    }

    pub fn dna_encoder(&self) -> &dyn DnaEncoder {
        self.dna_encoder.as_ref()
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

fn label_row(row: &[u32]) -> MycotaxResult<[u32; 6]> {
    row.try_into().map_err(|_| {
        MycotaxError::InputType(format!("Label rows must hold 6 ranks, got {}", row.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::backbone::BackboneConfig;
    use mycotax_bio::FourDim;
    use mycotax_test::tensors::random_var_builder;
    use mycotax_test::toy_encoder;

    fn build(config: ClassifierConfig, backbone: BackboneConfig) -> MycotaxResult<Classifier> {
        let device = Device::Cpu;
        let (_, vb) = random_var_builder(&device);
        let taxonomy = toy_encoder();
        let dna = FourDim::new(12)?;
        let backbone = backbone.build(&dna.row_shape(), taxonomy.vocab_size(), vb.pp("backbone"))?;
        Classifier::new(backbone, Box::new(dna), taxonomy, config, vb, device)
    }

    #[test]
    fn test_encoder_decoder_needs_multi_head() {
        let result = build(
            ClassifierConfig::default().with_output(HeadKind::Chained),
            BackboneConfig::EncoderDecoder { d_model: 8 },
        );
        assert!(matches!(result, Err(MycotaxError::Configuration(_))));

        let result = build(
            ClassifierConfig::default()
                .with_output(HeadKind::Multi)
                .with_target_levels(vec![Rank::Genus]),
            BackboneConfig::EncoderDecoder { d_model: 8 },
        );
        assert!(matches!(result, Err(MycotaxError::Configuration(_))));
    }

    #[test]
    fn test_forward_shapes_for_both_modes() {
        let x = Tensor::randn(0f32, 1.0, (3, 4, 12), &Device::Cpu).unwrap();
        for backbone in [
            BackboneConfig::Mlp { hidden: 16 },
            BackboneConfig::EncoderDecoder { d_model: 8 },
        ] {
            let classifier = build(
                ClassifierConfig::default()
                    .with_output(HeadKind::Multi)
                    .with_fcn_layers(vec![6]),
                backbone,
            )
            .unwrap();
            let scores = classifier.forward(&x, None).unwrap();
            let dims: Vec<_> = scores.iter().map(|s| s.dims().to_vec()).collect();
            assert_eq!(
                dims,
                vec![vec![3, 2], vec![3, 4], vec![3, 4], vec![3, 4], vec![3, 4], vec![3, 4]]
            );
        }
    }

    #[test]
    fn test_latent_space_rejects_sequence_conditioned() {
        let classifier = build(
            ClassifierConfig::default().with_output(HeadKind::Multi),
            BackboneConfig::EncoderDecoder { d_model: 8 },
        )
        .unwrap();
        let result = classifier.latent_space(SequenceData::default());
        assert!(matches!(result, Err(MycotaxError::Configuration(_))));
    }

    #[test]
    fn test_predict_labels_require_labelled_data() {
        let classifier = build(ClassifierConfig::default(), BackboneConfig::default()).unwrap();
        let inputs = Tensor::zeros((2, 4, 12), candle_core::DType::F32, &Device::Cpu).unwrap();
        let data = TensorData::new(vec!["a".into(), "b".into()], inputs, None, "four_dim").unwrap();

        assert!(matches!(
            classifier.predict(&data, true),
            Err(MycotaxError::InputType(_))
        ));
        assert_eq!(classifier.predict(&data, false).unwrap().len(), 2);
    }

    #[test]
    fn test_train_ref_in_config() {
        let mut classifier = build(ClassifierConfig::default(), BackboneConfig::default()).unwrap();
        assert_eq!(classifier.get_config()["train_ref"], serde_json::Value::Null);
        classifier.set_train_ref("unite_v9.fasta");
        assert_eq!(classifier.get_config()["train_ref"], json!("unite_v9.fasta"));
    }
}
