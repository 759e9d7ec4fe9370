use candle_core::{Device, Module, Tensor, D};
use candle_nn::{ops, Linear, VarBuilder};
use mycotax_bio::TaxonHierarchy;
use mycotax_core::{MycotaxResult, Rank};

/// Hierarchical softmax over the taxonomy.
///
/// Phylum gets a plain softmax. Every finer class gets a softmax restricted to
/// its siblings (the children of the same parent), multiplied by the
/// probability of that parent, so each class probability is the product of
/// the conditionals along its root-to-leaf path. All six outputs are
/// probabilities.
pub struct SoftmaxTree {
    layers: Vec<Linear>,
    /// Child-to-parent membership `[classes(r), classes(r - 1)]` and its transpose, for ranks 1..6
    membership: Vec<(Tensor, Tensor)>,
}

impl SoftmaxTree {
    pub fn new(
        input_width: usize,
        hierarchy: &TaxonHierarchy,
        device: &Device,
        vb: VarBuilder,
    ) -> MycotaxResult<Self> {
        let layers = Rank::ALL
            .iter()
            .map(|rank| {
                candle_nn::linear(input_width, hierarchy.class_count(*rank), vb.pp(rank.name()))
            })
            .collect::<candle_core::Result<Vec<_>>>()?;

        let mut membership = Vec::with_capacity(5);
        for (&rank, &parent) in Rank::ALL[1..].iter().zip(&Rank::ALL[..5]) {
            let m = hierarchy.descendant_matrix(rank, parent, device)?;
            let t = m.t()?.contiguous()?;
            membership.push((m, t));
        }
        Ok(Self { layers, membership })
    }

    pub fn forward(&self, x: &Tensor) -> MycotaxResult<Vec<Tensor>> {
        let mut outputs = Vec::with_capacity(6);
        let mut parent_probs = ops::softmax_last_dim(&self.layers[0].forward(x)?)?;
        outputs.push(parent_probs.clone());

        for (layer, (m, m_t)) in self.layers[1..].iter().zip(&self.membership) {
            let logits = layer.forward(x)?;
            let shifted = logits.broadcast_sub(&logits.max_keepdim(D::Minus1)?)?;
            let exp = shifted.exp()?;
            // Sum of exp over each class's sibling group, spread back to the class
            let sibling_sums = exp.matmul(m)?.matmul(m_t)?;
            let conditional = exp.div(&sibling_sums.maximum(1e-30)?)?;
            let probs = conditional.mul(&parent_probs.matmul(m_t)?)?;
            outputs.push(probs.clone());
            parent_probs = probs;
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use mycotax_test::assertions::{assert_probability_rows, assert_tensors_close};
    use mycotax_test::tensors::random_var_builder;
    use mycotax_test::toy_hierarchy;

    #[test]
    fn test_every_rank_is_a_distribution() {
        let device = Device::Cpu;
        let (_, vb) = random_var_builder(&device);
        let tree = SoftmaxTree::new(6, &toy_hierarchy(), &device, vb).unwrap();
        let x = Tensor::randn(0f32, 1.0, (4, 6), &device).unwrap();
        let outputs = tree.forward(&x).unwrap();
        assert_eq!(outputs.len(), 6);
        for probs in &outputs {
            assert_probability_rows(probs, 1e-4);
        }
    }

    #[test]
    fn test_children_sum_to_parent() {
        let device = Device::Cpu;
        let (_, vb) = random_var_builder(&device);
        let hierarchy = toy_hierarchy();
        let tree = SoftmaxTree::new(6, &hierarchy, &device, vb).unwrap();
        let x = Tensor::randn(0f32, 1.0, (3, 6), &device).unwrap();
        let outputs = tree.forward(&x).unwrap();

        for (&rank, &parent) in Rank::ALL[1..].iter().zip(&Rank::ALL[..5]) {
            let m = hierarchy.descendant_matrix(rank, parent, &device).unwrap();
            let summed = outputs[rank.index()].matmul(&m).unwrap();
            assert_tensors_close(&summed, &outputs[parent.index()], 1e-5);
        }
    }

    #[test]
    fn test_single_child_inherits_parent_probability() {
        let device = Device::Cpu;
        let (_, vb) = random_var_builder(&device);
        let tree = SoftmaxTree::new(2, &toy_hierarchy(), &device, vb).unwrap();
        let x = Tensor::ones((1, 2), DType::F32, &device).unwrap();
        let outputs = tree.forward(&x).unwrap();
        // Below class every parent has exactly one child
        assert_tensors_close(&outputs[2], &outputs[1], 1e-6);
        assert_tensors_close(&outputs[5], &outputs[1], 1e-6);
    }
}
