//! Sequence handling for Mycotax: FASTA parsing, UNITE lineages, taxon
//! encoding and DNA encoders

pub mod data;
pub mod encoding;
pub mod formats;
pub mod sequence;
pub mod taxonomy;

// Re-export commonly used types
pub use data::{ClassifierInput, SequenceData, TensorData};
pub use encoding::{DnaEncoder, DnaEncoderConfig, FourDim, KmerSpectrum};
pub use formats::{parse_fasta, parse_fasta_from_bytes};
pub use sequence::Sequence;
pub use taxonomy::{TaxonEncoder, TaxonHierarchy};
