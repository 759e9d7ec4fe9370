use candle_core::{Module, Tensor};
use candle_nn::{Linear, VarBuilder};
use mycotax_core::{MycotaxError, MycotaxResult, Rank, RankSet};

use super::assemble;

/// One independent linear projection per target rank.
pub struct MultiHead {
    layers: [Option<Linear>; 6],
    class_counts: [usize; 6],
}

impl MultiHead {
    pub fn new(
        input_width: usize,
        class_counts: [usize; 6],
        targets: RankSet,
        vb: VarBuilder,
    ) -> MycotaxResult<Self> {
        let mut layers: [Option<Linear>; 6] = Default::default();
        for rank in targets.iter() {
            layers[rank.index()] = Some(candle_nn::linear(
                input_width,
                class_counts[rank.index()],
                vb.pp(rank.name()),
            )?);
        }
        Ok(Self {
            layers,
            class_counts,
        })
    }

    pub fn targets(&self) -> RankSet {
        Rank::ALL
            .into_iter()
            .filter(|rank| self.layers[rank.index()].is_some())
            .collect()
    }

    pub fn forward(&self, x: &Tensor) -> MycotaxResult<Vec<Tensor>> {
        let mut scores: [Option<Tensor>; 6] = Default::default();
        for (slot, layer) in scores.iter_mut().zip(&self.layers) {
            if let Some(layer) = layer {
                *slot = Some(layer.forward(x)?);
            }
        }
        assemble(scores, self.class_counts, x.dim(0)?, x.device())
    }

    pub fn forward_levels(&self, x: &Tensor, ranks: &[Rank]) -> MycotaxResult<Vec<Tensor>> {
        ranks
            .iter()
            .map(|rank| match &self.layers[rank.index()] {
                Some(layer) => Ok(layer.forward(x)?),
                None => Err(MycotaxError::Configuration(format!(
                    "{} is not a target level of this head",
                    rank
                ))),
            })
            .collect()
    }
}
