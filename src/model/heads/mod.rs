//! Output heads turning a shared feature vector into per-rank class scores
//!
//! Every head answers `forward` with six score tensors in rank order, shaped
//! `[n, classes(rank)]`. Ranks a head does not score come back as zeros and are
//! listed by [`OutputHead::predicted_ranks`].
//!
//! | Kind | Scores |
//! |------|--------|
//! | `single` | logits for the finest target rank |
//! | `multi` | independent logits per target rank |
//! | `chained` | logits per target rank, each conditioned on the ranks before it |
//! | `infer_parent` | base-rank logits, coarser ranks one-hot at the ancestor of the base argmax |
//! | `infer_sum` | base-rank probabilities, coarser ranks summed over children |
//! | `tree` | hierarchical softmax probabilities at every rank |

pub mod chained;
pub mod infer;
pub mod multi;
pub mod single;
pub mod tree;

pub use chained::ChainedMultiHead;
pub use infer::{InferParent, InferSum};
pub use multi::MultiHead;
pub use single::SingleHead;
pub use tree::SoftmaxTree;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use mycotax_bio::TaxonEncoder;
use mycotax_core::{ClassifierConfig, ConfigMap, HeadKind, MycotaxError, MycotaxResult, Rank, RankSet};
use serde_json::json;

pub enum OutputHead {
    Single(SingleHead),
    Multi(MultiHead),
    Chained(ChainedMultiHead),
    InferParent(InferParent),
    InferSum(InferSum),
    Tree(SoftmaxTree),
}

impl OutputHead {
    /// Build the head named by `config.output` on top of `input_width` features.
    ///
    /// Inference heads and the softmax tree read the parent tables of
    /// `taxonomy` and fail with a configuration error without one.
    pub fn build(
        config: &ClassifierConfig,
        input_width: usize,
        class_counts: [usize; 6],
        taxonomy: Option<&TaxonEncoder>,
        device: &Device,
        vb: VarBuilder,
    ) -> MycotaxResult<Self> {
        let targets = config.target_set();
        let hierarchy = taxonomy.map(TaxonEncoder::hierarchy);

        let head = match (config.output, hierarchy) {
            (HeadKind::Single, _) => {
                let rank = targets.finest().ok_or_else(no_targets)?;
                OutputHead::Single(SingleHead::new(input_width, class_counts, rank, vb)?)
            }
            (HeadKind::Multi, _) => {
                OutputHead::Multi(MultiHead::new(input_width, class_counts, targets, vb)?)
            }
            (HeadKind::Chained, _) => OutputHead::Chained(ChainedMultiHead::new(
                input_width,
                class_counts,
                targets,
                config.chained()?,
                vb,
            )?),
            (HeadKind::InferParent, Some(hierarchy)) => OutputHead::InferParent(InferParent::new(
                input_width,
                hierarchy,
                config.base_level,
                device,
                vb,
            )?),
            (HeadKind::InferSum, Some(hierarchy)) => OutputHead::InferSum(InferSum::new(
                input_width,
                hierarchy,
                config.base_level,
                device,
                vb,
            )?),
            (HeadKind::Tree, Some(hierarchy)) => {
                OutputHead::Tree(SoftmaxTree::new(input_width, hierarchy, device, vb)?)
            }
            (kind, None) => {
                return Err(MycotaxError::Configuration(format!(
                    "Output head '{}' needs a taxon encoder",
                    kind
                )))
            }
        };
        tracing::debug!(
            "Built {} output head on {} features, scoring {}",
            head.kind(),
            input_width,
            head.predicted_ranks()
        );
        Ok(head)
    }

    pub fn kind(&self) -> HeadKind {
        match self {
            OutputHead::Single(_) => HeadKind::Single,
            OutputHead::Multi(_) => HeadKind::Multi,
            OutputHead::Chained(_) => HeadKind::Chained,
            OutputHead::InferParent(_) => HeadKind::InferParent,
            OutputHead::InferSum(_) => HeadKind::InferSum,
            OutputHead::Tree(_) => HeadKind::Tree,
        }
    }

    /// Six score tensors in rank order
    pub fn forward(&self, x: &Tensor) -> MycotaxResult<Vec<Tensor>> {
        match self {
            OutputHead::Single(h) => h.forward(x),
            OutputHead::Multi(h) => h.forward(x),
            OutputHead::Chained(h) => h.forward(x),
            OutputHead::InferParent(h) => h.forward(x),
            OutputHead::InferSum(h) => h.forward(x),
            OutputHead::Tree(h) => h.forward(x),
        }
    }

    /// Scores for `ranks` only, in the order given.
    ///
    /// Only heads whose ranks are scored independently of each other support this.
    pub fn forward_levels(&self, x: &Tensor, ranks: &[Rank]) -> MycotaxResult<Vec<Tensor>> {
        match self {
            OutputHead::Multi(h) => h.forward_levels(x, ranks),
            other => Err(MycotaxError::Configuration(format!(
                "Output head '{}' cannot score ranks in isolation",
                other.kind()
            ))),
        }
    }

    /// Ranks that carry real scores
    pub fn predicted_ranks(&self) -> RankSet {
        match self {
            OutputHead::Single(h) => RankSet::from_iter([h.rank()]),
            OutputHead::Multi(h) => h.targets(),
            OutputHead::Chained(h) => h.targets(),
            OutputHead::InferParent(h) => h.scored_ranks(),
            OutputHead::InferSum(h) => h.scored_ranks(),
            OutputHead::Tree(_) => RankSet::all(),
        }
    }

    /// `output_*` entries of the classifier configuration
    pub fn config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("output_type".to_string(), json!(self.kind().as_str()));
        let chained = match self {
            OutputHead::Chained(h) => Some(h.chained()),
            _ => None,
        };
        config.insert(
            "output_chained_ascending".to_string(),
            json!(chained.map(|c| c.ascending)),
        );
        config.insert(
            "output_chained_use_probs".to_string(),
            json!(chained.map(|c| c.use_probs)),
        );
        config.insert(
            "output_chained_allaccess".to_string(),
            json!(chained.map(|c| c.all_access)),
        );
        let base_level = match self {
            OutputHead::InferParent(h) => Some(h.base_level()),
            OutputHead::InferSum(h) => Some(h.base_level()),
            _ => None,
        };
        config.insert(
            "output_base_level".to_string(),
            json!(base_level.map(Rank::name)),
        );
        config
    }
}

impl std::fmt::Debug for OutputHead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputHead")
            .field("kind", &self.kind())
            .field("predicted_ranks", &self.predicted_ranks().to_vec())
            .finish()
    }
}

fn no_targets() -> MycotaxError {
    MycotaxError::Configuration("No target levels configured".to_string())
}

/// `[n, classes]` zeros standing in for a rank the head does not score
pub(crate) fn unscored(n: usize, classes: usize, device: &Device) -> MycotaxResult<Tensor> {
    Ok(Tensor::zeros((n, classes), DType::F32, device)?)
}

/// Collect per-rank scores into rank order, filling gaps with zeros.
pub(crate) fn assemble(
    mut scores: [Option<Tensor>; 6],
    class_counts: [usize; 6],
    n: usize,
    device: &Device,
) -> MycotaxResult<Vec<Tensor>> {
    Rank::ALL
        .iter()
        .map(|rank| match scores[rank.index()].take() {
            Some(score) => Ok(score),
            None => unscored(n, class_counts[rank.index()], device),
        })
        .collect()
}
