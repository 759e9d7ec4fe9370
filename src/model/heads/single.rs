use candle_core::{Module, Tensor};
use candle_nn::{Linear, VarBuilder};
use mycotax_core::{MycotaxResult, Rank};

use super::assemble;

/// One linear projection onto a single rank; the hierarchy is ignored.
pub struct SingleHead {
    layer: Linear,
    rank: Rank,
    class_counts: [usize; 6],
}

impl SingleHead {
    pub fn new(
        input_width: usize,
        class_counts: [usize; 6],
        rank: Rank,
        vb: VarBuilder,
    ) -> MycotaxResult<Self> {
        let layer = candle_nn::linear(input_width, class_counts[rank.index()], vb.pp(rank.name()))?;
        Ok(Self {
            layer,
            rank,
            class_counts,
        })
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn forward(&self, x: &Tensor) -> MycotaxResult<Vec<Tensor>> {
        let mut scores: [Option<Tensor>; 6] = Default::default();
        scores[self.rank.index()] = Some(self.layer.forward(x)?);
        assemble(scores, self.class_counts, x.dim(0)?, x.device())
    }
}
