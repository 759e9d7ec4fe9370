use serde::{Deserialize, Serialize};
use std::fmt;

use crate::taxonomy::parse_unite_lineage;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub description: Option<String>,
    pub sequence: Vec<u8>,
}

impl Sequence {
    pub fn new(id: String, sequence: Vec<u8>) -> Self {
        Self {
            id,
            description: None,
            sequence,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn header(&self) -> String {
        match &self.description {
            Some(desc) => format!(">{} {}", self.id, desc),
            None => format!(">{}", self.id),
        }
    }

    /// Six-rank lineage from a UNITE-style header, if the header carries one
    pub fn lineage(&self) -> Option<[String; 6]> {
        parse_unite_lineage(&self.id).or_else(|| {
            self.description
                .as_deref()
                .and_then(parse_unite_lineage)
        })
    }

    /// Fraction of bases outside the unambiguous ACGT alphabet
    pub fn ambiguity_fraction(&self) -> f64 {
        if self.sequence.is_empty() {
            return 0.0;
        }
        let ambiguous = self
            .sequence
            .iter()
            .filter(|&&b| !matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T'))
            .count();
        ambiguous as f64 / self.sequence.len() as f64
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header())?;
        write!(f, "{}", String::from_utf8_lossy(&self.sequence))
    }
}
