//! Fixed six-level rank structure with child→parent index tables

use candle_core::{Device, Tensor};
use mycotax_core::{MycotaxError, MycotaxResult, Rank};
use serde::{Deserialize, Serialize};

/// Class counts per rank plus, for every rank below phylum, the parent index
/// (at the next coarser rank) of each class.
///
/// The parent tables are total: `parents[r]` has exactly `class_counts[r]`
/// entries, each a valid index at rank `r - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HierarchyRepr", into = "HierarchyRepr")]
pub struct TaxonHierarchy {
    class_counts: [usize; 6],
    parents: Vec<Vec<u32>>,
}

/// Unchecked on-disk form; every load goes back through [`TaxonHierarchy::new`]
#[derive(Serialize, Deserialize)]
struct HierarchyRepr {
    class_counts: [usize; 6],
    parents: Vec<Vec<u32>>,
}

impl TryFrom<HierarchyRepr> for TaxonHierarchy {
    type Error = MycotaxError;

    fn try_from(repr: HierarchyRepr) -> Result<Self, Self::Error> {
        TaxonHierarchy::new(repr.class_counts, repr.parents)
    }
}

impl From<TaxonHierarchy> for HierarchyRepr {
    fn from(hierarchy: TaxonHierarchy) -> Self {
        HierarchyRepr {
            class_counts: hierarchy.class_counts,
            parents: hierarchy.parents,
        }
    }
}

impl TaxonHierarchy {
    /// Build a hierarchy from the five parent tables, class → phylum first and
    /// species → genus last
    pub fn new(class_counts: [usize; 6], parents: Vec<Vec<u32>>) -> MycotaxResult<Self> {
        if parents.len() != Rank::COUNT - 1 {
            return Err(MycotaxError::Configuration(format!(
                "Expected {} parent tables, got {}",
                Rank::COUNT - 1,
                parents.len()
            )));
        }
        if let Some(rank) = Rank::ALL.iter().find(|r| class_counts[r.index()] == 0) {
            return Err(MycotaxError::Configuration(format!(
                "Rank {} has no classes",
                rank
            )));
        }

        for (i, table) in parents.iter().enumerate() {
            let child = Rank::ALL[i + 1];
            let parent_count = class_counts[i];
            if table.len() != class_counts[child.index()] {
                return Err(MycotaxError::Configuration(format!(
                    "Parent table for {} covers {} classes, expected {}",
                    child,
                    table.len(),
                    class_counts[child.index()]
                )));
            }
            if let Some((c, p)) = table
                .iter()
                .enumerate()
                .find(|&(_, &p)| p as usize >= parent_count)
            {
                return Err(MycotaxError::Configuration(format!(
                    "{} class {} maps to parent {} but only {} parents exist",
                    child, c, p, parent_count
                )));
            }
        }

        Ok(Self {
            class_counts,
            parents,
        })
    }

    pub fn class_counts(&self) -> [usize; 6] {
        self.class_counts
    }

    pub fn class_count(&self, rank: Rank) -> usize {
        self.class_counts[rank.index()]
    }

    /// Parent of `child` (a class at `rank`) at the next coarser rank
    pub fn parent(&self, rank: Rank, child: u32) -> Option<u32> {
        let table = self.parents.get(rank.index().checked_sub(1)?)?;
        table.get(child as usize).copied()
    }

    /// Ancestor of `child` (a class at `from`) at rank `to`, which must not be finer than `from`
    pub fn ancestor(&self, from: Rank, child: u32, to: Rank) -> Option<u32> {
        if to > from || child as usize >= self.class_count(from) {
            return None;
        }
        let mut rank = from;
        let mut index = child;
        while rank > to {
            index = self.parent(rank, index)?;
            rank = rank.parent()?;
            if index as usize >= self.class_count(rank) {
                return None;
            }
        }
        Some(index)
    }

    /// Classes at `rank + 1` whose parent is `parent`
    pub fn children(&self, rank: Rank, parent: u32) -> Vec<u32> {
        let Some(table) = self.parents.get(rank.index()) else {
            return Vec::new();
        };
        table
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p == parent)
            .map(|(c, _)| c as u32)
            .collect()
    }

    /// 0/1 matrix of shape `[classes(from), classes(to)]` with a one at
    /// `[c, ancestor(c)]`. Multiplying base-rank scores by it aggregates them per ancestor.
    pub fn descendant_matrix(&self, from: Rank, to: Rank, device: &Device) -> MycotaxResult<Tensor> {
        if to > from {
            return Err(MycotaxError::Configuration(format!(
                "Cannot map {} classes onto finer rank {}",
                from, to
            )));
        }
        let rows = self.class_count(from);
        let cols = self.class_count(to);
        let mut data = vec![0f32; rows * cols];
        for c in 0..rows {
            let a = self
                .ancestor(from, c as u32, to)
                .ok_or_else(|| {
                    MycotaxError::Configuration(format!("{} class {} has no ancestor at {}", from, c, to))
                })?;
            data[c * cols + a as usize] = 1.0;
        }
        Ok(Tensor::from_vec(data, (rows, cols), device)?)
    }

    /// Whether a predicted row respects every parent link
    pub fn is_consistent(&self, row: &[u32; 6]) -> bool {
        Rank::ALL[1..]
            .iter()
            .all(|&rank| self.parent(rank, row[rank.index()]) == Some(row[rank.index() - 1]))
    }

    /// Number of (row, rank) pairs whose prediction disagrees with the rank above it
    pub fn count_violations(&self, rows: &[[u32; 6]]) -> usize {
        rows.iter()
            .map(|row| {
                Rank::ALL[1..]
                    .iter()
                    .filter(|&&rank| {
                        self.parent(rank, row[rank.index()]) != Some(row[rank.index() - 1])
                    })
                    .count()
            })
            .sum()
    }
}
