//! Shared setup for the model integration tests
#![allow(dead_code)]

use candle_core::{Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use mycotax::model::{Backbone, BackboneConfig, Classifier, FeatureExtractor};
use mycotax_bio::{parse_fasta_from_bytes, DnaEncoder, FourDim, Sequence, SequenceData};
use mycotax_core::{ClassifierConfig, ConfigMap, MycotaxResult};
use mycotax_test::{create_test_fasta, labelled_sequences, random_var_builder, toy_encoder};
use serde_json::json;

/// Length every test sequence is encoded to
pub const SEQ_LEN: usize = 24;

/// Passes the encoded input through unchanged, flattened to `[n, width]`
pub struct IdentityBackbone {
    pub width: usize,
}

impl FeatureExtractor for IdentityBackbone {
    fn hidden_width(&self) -> usize {
        self.width
    }

    fn forward(&self, x: &Tensor) -> MycotaxResult<Tensor> {
        Ok(x.flatten_from(1)?)
    }

    fn config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("type".to_string(), json!("identity"));
        config
    }
}

/// Randomly initialised classifier over the toy taxonomy and `FourDim(SEQ_LEN)`
pub fn classifier(config: ClassifierConfig, backbone: BackboneConfig) -> (VarMap, Classifier) {
    let device = Device::Cpu;
    let (varmap, vb) = random_var_builder(&device);
    let taxonomy = toy_encoder();
    let dna = FourDim::new(SEQ_LEN).unwrap();
    let backbone = backbone
        .build(&dna.row_shape(), taxonomy.vocab_size(), vb.pp("backbone"))
        .unwrap();
    let classifier = Classifier::new(backbone, Box::new(dna), taxonomy, config, vb, device).unwrap();
    (varmap, classifier)
}

/// Classifier whose features are the raw one-hot encoding
pub fn identity_classifier(config: ClassifierConfig, vb: VarBuilder) -> Classifier {
    let backbone = Backbone::Standard(Box::new(IdentityBackbone { width: 4 * SEQ_LEN }));
    Classifier::new(
        backbone,
        Box::new(FourDim::new(SEQ_LEN).unwrap()),
        toy_encoder(),
        config,
        vb,
        Device::Cpu,
    )
    .unwrap()
}

/// `count` random sequences labelled round-robin with the toy taxonomy's species
pub fn labelled_data(count: usize) -> SequenceData {
    let fasta = create_test_fasta(&labelled_sequences(&toy_encoder(), count, SEQ_LEN));
    let sequences = parse_fasta_from_bytes(fasta.as_bytes()).unwrap();
    let lineages = sequences.iter().map(Sequence::lineage).collect();
    SequenceData {
        sequences,
        lineages,
    }
}

/// Random `[n, 4, SEQ_LEN]` input batch
pub fn random_inputs(n: usize) -> Tensor {
    Tensor::randn(0f32, 1.0, (n, 4, SEQ_LEN), &Device::Cpu).unwrap()
}
