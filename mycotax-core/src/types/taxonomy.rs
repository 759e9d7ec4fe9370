/// Taxonomy-related types used throughout Mycotax
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MycotaxError, MycotaxResult};

/// Names of the six predicted ranks, coarse to fine.
pub const LEVELS: [&str; 6] = ["phylum", "class", "order", "family", "genus", "species"];

/// Label written for ranks that are unknown or deliberately not reported.
pub const UNKNOWN_STR: &str = "?";

/// Default number of rows per forward pass during batched prediction.
pub const PRED_BATCH_SIZE: usize = 64;

/// One of the six nested taxonomic levels predicted by a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    pub const ALL: [Rank; 6] = [
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    pub const COUNT: usize = 6;

    /// Position of the rank, 0 for phylum through 5 for species
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The next coarser rank, `None` for phylum
    pub fn parent(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// The next finer rank, `None` for species
    pub fn child(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn name(self) -> &'static str {
        LEVELS[self.index()]
    }

    /// Ranks strictly coarser than this one, nearest first
    pub fn ancestors(self) -> impl Iterator<Item = Rank> {
        Self::ALL.into_iter().take(self.index()).rev()
    }

    /// Parse a list of rank names, e.g. from a `--mask` argument
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> MycotaxResult<Vec<Rank>> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Rank {
    type Err = MycotaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        LEVELS
            .iter()
            .position(|level| *level == lowered)
            .and_then(Rank::from_index)
            .ok_or_else(|| MycotaxError::InvalidInput(format!("Unknown taxonomic rank: {}", s)))
    }
}

/// Small set of ranks, stored as a bitmask.
///
/// Serialises as an ordered list of rank names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Rank>", into = "Vec<Rank>")]
pub struct RankSet(u8);

impl RankSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Self(0b11_1111)
    }

    pub fn insert(&mut self, rank: Rank) {
        self.0 |= 1 << rank.index();
    }

    pub fn remove(&mut self, rank: Rank) {
        self.0 &= !(1 << rank.index());
    }

    pub fn contains(&self, rank: Rank) -> bool {
        self.0 & (1 << rank.index()) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: RankSet) -> RankSet {
        Self(self.0 | other.0)
    }

    pub fn complement(self) -> RankSet {
        Self(!self.0 & Self::all().0)
    }

    /// Members in rank order, phylum first
    pub fn iter(&self) -> impl Iterator<Item = Rank> + '_ {
        Rank::ALL.into_iter().filter(move |rank| self.contains(*rank))
    }

    pub fn finest(&self) -> Option<Rank> {
        self.iter().last()
    }

    pub fn to_vec(&self) -> Vec<Rank> {
        self.iter().collect()
    }
}

impl FromIterator<Rank> for RankSet {
    fn from_iter<I: IntoIterator<Item = Rank>>(iter: I) -> Self {
        let mut set = RankSet::empty();
        for rank in iter {
            set.insert(rank);
        }
        set
    }
}

impl From<Vec<Rank>> for RankSet {
    fn from(ranks: Vec<Rank>) -> Self {
        ranks.into_iter().collect()
    }
}

impl From<RankSet> for Vec<Rank> {
    fn from(set: RankSet) -> Self {
        set.to_vec()
    }
}

impl fmt::Display for RankSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Rank::name).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
