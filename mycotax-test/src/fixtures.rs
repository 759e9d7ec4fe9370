//! Test fixtures and data generators
//!
//! Toy taxonomies and UNITE-style sequences shared across the workspace.

use mycotax_bio::{TaxonEncoder, TaxonHierarchy};
use mycotax_core::{Rank, LEVELS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Test sequence with an optional six-rank lineage
#[derive(Debug, Clone)]
pub struct TestSequence {
    pub id: String,
    pub sequence: String,
    pub lineage: Option<[String; 6]>,
}

impl TestSequence {
    pub fn new(id: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.into(),
            lineage: None,
        }
    }

    pub fn with_lineage(mut self, lineage: [String; 6]) -> Self {
        self.lineage = Some(lineage);
        self
    }

    /// Convert to FASTA with a UNITE-style header
    pub fn to_fasta(&self) -> String {
        let header = match &self.lineage {
            Some(lineage) => {
                let ranks: Vec<String> = LEVELS
                    .iter()
                    .zip(lineage.iter())
                    .map(|(level, name)| format!("{}__{}", &level[..1], name))
                    .collect();
                format!(">{}|SH0000|reps|k__Fungi;{}", self.id, ranks.join(";"))
            }
            None => format!(">{}", self.id),
        };
        format!("{}\n{}\n", header, self.sequence)
    }
}

/// Generate random DNA sequences
pub fn generate_sequences(count: usize, length: usize) -> Vec<TestSequence> {
    let mut rng = StdRng::seed_from_u64(42); // Deterministic for tests
    (0..count)
        .map(|i| TestSequence::new(format!("seq_{}", i), random_dna(&mut rng, length)))
        .collect()
}

/// Sequences labelled with lineages drawn round-robin from the species of `encoder`
pub fn labelled_sequences(encoder: &TaxonEncoder, count: usize, length: usize) -> Vec<TestSequence> {
    let mut rng = StdRng::seed_from_u64(7);
    let species = encoder.classes(Rank::Species) as u32;
    (0..count)
        .map(|i| {
            let leaf = i as u32 % species;
            let lineage = std::array::from_fn(|r| {
                let rank = Rank::ALL[r];
                let index = encoder
                    .hierarchy()
                    .ancestor(Rank::Species, leaf, rank)
                    .unwrap_or(0);
                encoder.name(rank, index).to_string()
            });
            TestSequence::new(format!("seq_{}", i), random_dna(&mut rng, length)).with_lineage(lineage)
        })
        .collect()
}

fn random_dna(rng: &mut StdRng, length: usize) -> String {
    (0..length).map(|_| BASES[rng.gen_range(0..4)]).collect()
}

/// Create a test FASTA file content
pub fn create_test_fasta(sequences: &[TestSequence]) -> String {
    sequences.iter().map(TestSequence::to_fasta).collect()
}

/// Two phyla over four classes (`[0, 0, 1, 1]`), one-to-one below class
pub fn toy_hierarchy() -> TaxonHierarchy {
    let identity: Vec<u32> = (0..4).collect();
    TaxonHierarchy::new(
        [2, 4, 4, 4, 4, 4],
        vec![
            vec![0, 0, 1, 1],
            identity.clone(),
            identity.clone(),
            identity.clone(),
            identity,
        ],
    )
    .expect("toy hierarchy is valid")
}

pub fn toy_encoder() -> TaxonEncoder {
    TaxonEncoder::synthetic(toy_hierarchy())
}

/// Two phyla over three classes (`[0, 0, 1]`), one-to-one below class
pub fn infer_sum_hierarchy() -> TaxonHierarchy {
    let identity: Vec<u32> = (0..3).collect();
    TaxonHierarchy::new(
        [2, 3, 3, 3, 3, 3],
        vec![
            vec![0, 0, 1],
            identity.clone(),
            identity.clone(),
            identity.clone(),
            identity,
        ],
    )
    .expect("infer-sum hierarchy is valid")
}

/// Small UNITE excerpt with two complete lineages and one unidentified species
pub const UNITE_FASTA: &str = "\
>Fusarium_oxysporum|MH855123|SH1.08FU|reps|k__Fungi;p__Ascomycota;c__Sordariomycetes;o__Hypocreales;f__Nectriaceae;g__Fusarium;s__Fusarium_oxysporum
CATTACCGAGTTTACAACTCCCAAACCCCTGTGAACATACCTATTGTTGCTTCGGCGGATCAGCC
>Amanita_muscaria|AB015676|SH2.08FU|reps|k__Fungi;p__Basidiomycota;c__Agaricomycetes;o__Agaricales;f__Amanitaceae;g__Amanita;s__Amanita_muscaria
GAAGTAAAAGTCGTAACAAGGTTTCCGTAGGTGAACCTGC
>Mortierella_sp|KX123456|SH3.08FU|reps|k__Fungi;p__Mortierellomycota;c__Mortierellomycetes;o__Mortierellales;f__Mortierellaceae;g__Mortierella;s__unidentified
TTGAACGCACATTGCGCCCT
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_generation() {
        let sequences = generate_sequences(10, 100);
        assert_eq!(sequences.len(), 10);
        assert_eq!(sequences[0].sequence.len(), 100);

        // Should be deterministic
        let sequences2 = generate_sequences(10, 100);
        assert_eq!(sequences[0].sequence, sequences2[0].sequence);
    }

    #[test]
    fn test_labelled_sequences_follow_hierarchy() {
        let encoder = toy_encoder();
        let sequences = labelled_sequences(&encoder, 8, 20);
        for seq in &sequences {
            let lineage = seq.lineage.as_ref().unwrap();
            let row = encoder.encode(lineage).unwrap();
            assert!(encoder.hierarchy().is_consistent(&row));
        }
    }

    #[test]
    fn test_fasta_header_carries_lineage() {
        let encoder = toy_encoder();
        let fasta = create_test_fasta(&labelled_sequences(&encoder, 1, 10));
        assert!(fasta.starts_with(">seq_0|SH0000|reps|k__Fungi;p__"));
        assert!(fasta.contains(";s__"));
    }
}
