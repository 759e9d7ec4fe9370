//! Label encoder mapping taxon names to per-rank class indices

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use mycotax_core::{MycotaxError, MycotaxResult, Rank, UNKNOWN_STR};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::hierarchy::TaxonHierarchy;
use super::lineage::is_complete;

/// Encodes six-rank lineages as class indices and back.
///
/// Besides the per-rank name tables it owns the [`TaxonHierarchy`] observed
/// while fitting, and defines the flat label space used as decoder vocabulary:
/// rank `r` class `i` has flat label `i + sum(classes[..r])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EncoderRepr", into = "EncoderRepr")]
pub struct TaxonEncoder {
    names: Vec<Vec<String>>,
    hierarchy: TaxonHierarchy,
    lookup: Vec<HashMap<String, u32>>,
}

#[derive(Serialize, Deserialize)]
struct EncoderRepr {
    names: Vec<Vec<String>>,
    hierarchy: TaxonHierarchy,
}

impl TryFrom<EncoderRepr> for TaxonEncoder {
    type Error = MycotaxError;

    fn try_from(repr: EncoderRepr) -> Result<Self, Self::Error> {
        TaxonEncoder::from_parts(repr.names, repr.hierarchy)
    }
}

impl From<TaxonEncoder> for EncoderRepr {
    fn from(encoder: TaxonEncoder) -> Self {
        EncoderRepr {
            names: encoder.names,
            hierarchy: encoder.hierarchy,
        }
    }
}

impl TaxonEncoder {
    /// Learn class tables and parent links from labelled lineages.
    ///
    /// Lineages with an unknown rank are skipped. When a name is seen under
    /// more than one parent the first parent wins.
    pub fn fit<I>(lineages: I) -> MycotaxResult<Self>
    where
        I: IntoIterator<Item = [String; 6]>,
    {
        let complete: Vec<[String; 6]> = lineages.into_iter().filter(is_complete).collect();
        if complete.is_empty() {
            return Err(MycotaxError::InvalidInput(
                "No fully labelled lineage to fit a taxon encoder on".to_string(),
            ));
        }

        let mut distinct: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); Rank::COUNT];
        for lineage in &complete {
            for (set, name) in distinct.iter_mut().zip(lineage.iter()) {
                set.insert(name.as_str());
            }
        }
        let names: Vec<Vec<String>> = distinct
            .iter()
            .map(|set| set.iter().map(|s| s.to_string()).collect())
            .collect();
        let lookup = build_lookup(&names);

        let mut parents: Vec<Vec<Option<u32>>> = Rank::ALL[1..]
            .iter()
            .map(|rank| vec![None; names[rank.index()].len()])
            .collect();
        let mut conflicts = 0usize;
        for lineage in &complete {
            for rank in &Rank::ALL[1..] {
                let r = rank.index();
                let child = lookup[r][&lineage[r]];
                let parent = lookup[r - 1][&lineage[r - 1]];
                match parents[r - 1][child as usize] {
                    None => parents[r - 1][child as usize] = Some(parent),
                    Some(existing) if existing != parent => {
                        conflicts += 1;
                        debug!(
                            "{} '{}' also listed under '{}', keeping '{}'",
                            rank,
                            lineage[r],
                            lineage[r - 1],
                            names[r - 1][existing as usize]
                        );
                    }
                    Some(_) => {}
                }
            }
        }
        if conflicts > 0 {
            warn!("{} lineage entries disagreed with an earlier parent assignment", conflicts);
        }

        let parents: Vec<Vec<u32>> = parents
            .into_iter()
            .map(|table| table.into_iter().map(|p| p.unwrap_or(0)).collect())
            .collect();
        let class_counts = std::array::from_fn(|r| names[r].len());
        let hierarchy = TaxonHierarchy::new(class_counts, parents)?;

        info!(
            "Fitted taxon encoder on {} lineages: {:?} classes per rank",
            complete.len(),
            class_counts
        );
        Ok(Self {
            names,
            hierarchy,
            lookup,
        })
    }

    /// Assemble an encoder from explicit name tables and a matching hierarchy
    pub fn from_parts(names: Vec<Vec<String>>, hierarchy: TaxonHierarchy) -> MycotaxResult<Self> {
        if names.len() != Rank::COUNT {
            return Err(MycotaxError::Configuration(format!(
                "Expected name tables for {} ranks, got {}",
                Rank::COUNT,
                names.len()
            )));
        }
        for rank in Rank::ALL {
            if names[rank.index()].len() != hierarchy.class_count(rank) {
                return Err(MycotaxError::Configuration(format!(
                    "{} has {} names but the hierarchy declares {} classes",
                    rank,
                    names[rank.index()].len(),
                    hierarchy.class_count(rank)
                )));
            }
        }
        let lookup = build_lookup(&names);
        if let Some(rank) = Rank::ALL
            .iter()
            .find(|r| lookup[r.index()].len() != names[r.index()].len())
        {
            return Err(MycotaxError::Configuration(format!(
                "Duplicate class names at rank {}",
                rank
            )));
        }
        Ok(Self {
            names,
            hierarchy,
            lookup,
        })
    }

    /// Encoder over a hand-built hierarchy with generated names such as `genus_3`
    pub fn synthetic(hierarchy: TaxonHierarchy) -> Self {
        let names: Vec<Vec<String>> = Rank::ALL
            .iter()
            .map(|rank| {
                (0..hierarchy.class_count(*rank))
                    .map(|i| format!("{}_{}", rank, i))
                    .collect()
            })
            .collect();
        let lookup = build_lookup(&names);
        Self {
            names,
            hierarchy,
            lookup,
        }
    }

    pub fn hierarchy(&self) -> &TaxonHierarchy {
        &self.hierarchy
    }

    /// Number of classes at `rank`
    pub fn classes(&self, rank: Rank) -> usize {
        self.hierarchy.class_count(rank)
    }

    pub fn class_counts(&self) -> [usize; 6] {
        self.hierarchy.class_counts()
    }

    /// Parent of class `child` at `rank`, one rank up
    pub fn parent_index(&self, rank: Rank, child: u32) -> Option<u32> {
        self.hierarchy.parent(rank, child)
    }

    pub fn ancestor_index(&self, from: Rank, child: u32, to: Rank) -> Option<u32> {
        self.hierarchy.ancestor(from, child, to)
    }

    /// See [`TaxonHierarchy::descendant_matrix`]
    pub fn descendant_matrix(&self, from: Rank, to: Rank, device: &Device) -> MycotaxResult<Tensor> {
        self.hierarchy.descendant_matrix(from, to, device)
    }

    pub fn encode_name(&self, rank: Rank, name: &str) -> Option<u32> {
        self.lookup[rank.index()].get(name).copied()
    }

    /// Class indices of a lineage, `None` if any rank is unknown to the encoder
    pub fn encode(&self, lineage: &[String; 6]) -> Option<[u32; 6]> {
        let mut row = [0u32; 6];
        for rank in Rank::ALL {
            row[rank.index()] = self.encode_name(rank, &lineage[rank.index()])?;
        }
        Some(row)
    }

    /// Name of class `index` at `rank`; out-of-range indices decode to the unknown label
    pub fn name(&self, rank: Rank, index: u32) -> &str {
        self.names[rank.index()]
            .get(index as usize)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_STR)
    }

    /// Decode an index matrix with one row per sequence and one column per rank
    pub fn decode(&self, rows: &[[u32; 6]]) -> Vec<[String; 6]> {
        rows.iter()
            .map(|row| std::array::from_fn(|r| self.name(Rank::ALL[r], row[r]).to_string()))
            .collect()
    }

    /// First flat label of `rank`
    pub fn flat_offset(&self, rank: Rank) -> u32 {
        self.class_counts()[..rank.index()].iter().sum::<usize>() as u32
    }

    pub fn flat_label(&self, index: u32, rank: Rank) -> u32 {
        index + self.flat_offset(rank)
    }

    /// Inverse of [`flat_label`](Self::flat_label)
    pub fn unflatten_label(&self, flat: u32) -> Option<(Rank, u32)> {
        let mut offset = 0u32;
        for rank in Rank::ALL {
            let count = self.classes(rank) as u32;
            if flat < offset + count {
                return Some((rank, flat - offset));
            }
            offset += count;
        }
        None
    }

    /// Flat labels for a tensor of class indices at `rank`
    pub fn flat_labels(&self, indices: &Tensor, rank: Rank) -> MycotaxResult<Tensor> {
        let offset = Tensor::new(self.flat_offset(rank), indices.device())?;
        Ok(indices.to_dtype(DType::U32)?.broadcast_add(&offset)?)
    }

    /// Size of the flat label space plus one reserved start-of-sequence token
    pub fn vocab_size(&self) -> usize {
        self.class_counts().iter().sum::<usize>() + 1
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> MycotaxResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> MycotaxResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MycotaxError::NotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            MycotaxError::Configuration(format!("Invalid taxonomy {}: {}", path.display(), e))
        })
    }
}

fn build_lookup(names: &[Vec<String>]) -> Vec<HashMap<String, u32>> {
    names
        .iter()
        .map(|table| {
            table
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i as u32))
                .collect()
        })
        .collect()
}
