//! Heads that predict one base rank and derive every coarser rank from it
//!
//! Both keep a descendant matrix `M_r` of shape `[classes(base), classes(r)]`
//! per coarser rank, with a one at `[c, ancestor_r(c)]`. Ranks finer than the
//! base level are not scored.

use candle_core::{Device, Module, Tensor, D};
use candle_nn::{ops, Linear, VarBuilder};
use mycotax_bio::TaxonHierarchy;
use mycotax_core::{MycotaxResult, Rank, RankSet};

use super::assemble;

struct BaseProjection {
    layer: Linear,
    base_level: Rank,
    /// `M_r` for every rank coarser than the base level, phylum first
    descendants: Vec<Tensor>,
    class_counts: [usize; 6],
}

impl BaseProjection {
    fn new(
        input_width: usize,
        hierarchy: &TaxonHierarchy,
        base_level: Rank,
        device: &Device,
        vb: VarBuilder,
    ) -> MycotaxResult<Self> {
        let class_counts = hierarchy.class_counts();
        let layer = candle_nn::linear(input_width, class_counts[base_level.index()], vb.pp("base"))?;
        let descendants = Rank::ALL[..base_level.index()]
            .iter()
            .map(|&rank| hierarchy.descendant_matrix(base_level, rank, device))
            .collect::<MycotaxResult<Vec<_>>>()?;
        Ok(Self {
            layer,
            base_level,
            descendants,
            class_counts,
        })
    }

    fn scored_ranks(&self) -> RankSet {
        Rank::ALL[..=self.base_level.index()].iter().copied().collect()
    }

    /// Finer ranks were never filled and come back as zeros
    fn assemble(&self, x: &Tensor, scores: [Option<Tensor>; 6]) -> MycotaxResult<Vec<Tensor>> {
        assemble(scores, self.class_counts, x.dim(0)?, x.device())
    }
}

/// Coarser ranks are the ancestors of the base-level argmax.
///
/// The inferred score of rank `r` is one-hot at `ancestor_r(argmax)` scaled by
/// the top base-level probability, so argmax on any inferred rank reproduces
/// the hierarchy exactly.
pub struct InferParent {
    base: BaseProjection,
}

impl InferParent {
    pub fn new(
        input_width: usize,
        hierarchy: &TaxonHierarchy,
        base_level: Rank,
        device: &Device,
        vb: VarBuilder,
    ) -> MycotaxResult<Self> {
        Ok(Self {
            base: BaseProjection::new(input_width, hierarchy, base_level, device, vb)?,
        })
    }

    pub fn base_level(&self) -> Rank {
        self.base.base_level
    }

    pub fn scored_ranks(&self) -> RankSet {
        self.base.scored_ranks()
    }

    pub fn forward(&self, x: &Tensor) -> MycotaxResult<Vec<Tensor>> {
        let logits = self.base.layer.forward(x)?;
        let best = logits.argmax(D::Minus1)?;
        let confidence = ops::softmax_last_dim(&logits)?.max_keepdim(D::Minus1)?;

        let mut scores: [Option<Tensor>; 6] = Default::default();
        for (slot, matrix) in scores.iter_mut().zip(&self.base.descendants) {
            let one_hot = matrix.index_select(&best, 0)?;
            *slot = Some(one_hot.broadcast_mul(&confidence)?);
        }
        scores[self.base.base_level.index()] = Some(logits);
        self.base.assemble(x, scores)
    }
}

/// Coarser ranks aggregate the base-level probabilities of their descendants,
/// so a parent's score is the combined evidence of all its children.
pub struct InferSum {
    base: BaseProjection,
}

impl InferSum {
    pub fn new(
        input_width: usize,
        hierarchy: &TaxonHierarchy,
        base_level: Rank,
        device: &Device,
        vb: VarBuilder,
    ) -> MycotaxResult<Self> {
        Ok(Self {
            base: BaseProjection::new(input_width, hierarchy, base_level, device, vb)?,
        })
    }

    pub fn base_level(&self) -> Rank {
        self.base.base_level
    }

    pub fn scored_ranks(&self) -> RankSet {
        self.base.scored_ranks()
    }

    pub fn forward(&self, x: &Tensor) -> MycotaxResult<Vec<Tensor>> {
        let probs = ops::softmax_last_dim(&self.base.layer.forward(x)?)?;

        let mut scores: [Option<Tensor>; 6] = Default::default();
        for (slot, matrix) in scores.iter_mut().zip(&self.base.descendants) {
            *slot = Some(probs.matmul(matrix)?);
        }
        scores[self.base.base_level.index()] = Some(probs);
        self.base.assemble(x, scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use mycotax_test::assertions::{assert_probability_rows, assert_tensors_close};
    use mycotax_test::tensors::{identity, matrix, var_builder};
    use mycotax_test::{infer_sum_hierarchy, toy_hierarchy};

    fn identity_weights(classes: usize, device: &Device) -> VarBuilder<'static> {
        var_builder(
            vec![
                ("base.weight", identity(classes, device)),
                ("base.bias", Tensor::zeros(classes, DType::F32, device).unwrap()),
            ],
            device,
        )
    }

    fn argmax(t: &Tensor) -> Vec<u32> {
        t.argmax(D::Minus1).unwrap().to_vec1().unwrap()
    }

    #[test]
    fn test_infer_parent_scenario() {
        let device = Device::Cpu;
        let head = InferParent::new(
            4,
            &toy_hierarchy(),
            Rank::Class,
            &device,
            identity_weights(4, &device),
        )
        .unwrap();
        let logits = matrix(&[&[5.0, 1.0, 0.0, 0.0], &[0.0, 0.0, 1.0, 5.0]], &device);
        let scores = head.forward(&logits).unwrap();

        assert_eq!(argmax(&scores[0]), vec![0, 1]);
        assert_eq!(argmax(&scores[1]), vec![0, 3]);
        // Finer than the base level: unscored
        assert_eq!(scores[2].sum_all().unwrap().to_scalar::<f32>().unwrap(), 0.0);
        assert_eq!(head.scored_ranks().to_vec(), vec![Rank::Phylum, Rank::Class]);
    }

    #[test]
    fn test_infer_sum_children_sums() {
        let device = Device::Cpu;
        let head = InferSum::new(
            3,
            &infer_sum_hierarchy(),
            Rank::Class,
            &device,
            identity_weights(3, &device),
        )
        .unwrap();
        let logits = matrix(&[&[2.0, 0.5, 1.0], &[-1.0, 0.0, 3.0]], &device);
        let scores = head.forward(&logits).unwrap();

        let probs: Vec<Vec<f32>> = scores[1].to_vec2().unwrap();
        let expected: Vec<f32> = probs
            .iter()
            .flat_map(|p| [p[0] + p[1], p[2]])
            .collect();
        let expected = Tensor::from_vec(expected, (2, 2), &device).unwrap();
        assert_tensors_close(&scores[0], &expected, 1e-6);
        assert_probability_rows(&scores[0], 1e-5);
        assert_probability_rows(&scores[1], 1e-5);
    }

    #[test]
    fn test_species_base_infers_all_ranks() {
        let device = Device::Cpu;
        let head = InferSum::new(
            3,
            &infer_sum_hierarchy(),
            Rank::Species,
            &device,
            identity_weights(3, &device),
        )
        .unwrap();
        let scores = head.forward(&matrix(&[&[0.0, 0.0, 4.0]], &device)).unwrap();
        assert_eq!(head.scored_ranks(), RankSet::all());
        assert_eq!(argmax(&scores[0]), vec![1]);
        assert_eq!(argmax(&scores[4]), vec![2]);
    }
}
