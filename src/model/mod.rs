//! Neural model: backbones, FCN stack, output heads, sequential decoding and
//! the classifier tying them together

pub mod backbone;
pub mod bundle;
pub mod classifier;
pub mod decoder;
pub mod fcn;
pub mod heads;

pub use backbone::{Backbone, BackboneConfig, FeatureExtractor, TargetConditionedExtractor};
pub use bundle::{ModelBundle, ModelConfig};
pub use classifier::{Classifier, Predictions};
pub use decoder::{Decoded, SequentialDecoder, TokenSource};
pub use fcn::FcnStack;
pub use heads::OutputHead;
