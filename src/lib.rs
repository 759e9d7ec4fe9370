//! Hierarchical taxonomic classification of fungal ITS sequences
//!
//! A [`Classifier`] encodes DNA, extracts features with a backbone, and scores
//! all six ranks (phylum to species) through one of several output heads,
//! some of which guarantee predictions consistent with the taxonomy.

pub mod cli;
pub mod model;
pub mod report;

pub use model::{
    Backbone, BackboneConfig, Classifier, ModelBundle, ModelConfig, OutputHead, Predictions,
    SequentialDecoder, TokenSource,
};
pub use report::PredictionTable;

pub use mycotax_bio::{ClassifierInput, SequenceData, TaxonEncoder, TaxonHierarchy, TensorData};
pub use mycotax_core::{
    ClassifierConfig, HeadKind, MycotaxError, MycotaxResult, Rank, RankSet, UNKNOWN_STR,
};
