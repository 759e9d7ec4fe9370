use candle_core::{Module, Tensor};
use candle_nn::{ops, Linear, VarBuilder};
use mycotax_core::{ChainedConfig, MycotaxError, MycotaxResult, Rank, RankSet};

use super::assemble;

/// Target ranks scored one after another, each step seeing the features
/// concatenated with the representations of earlier steps.
///
/// With `ascending` the chain runs species to phylum, otherwise phylum to
/// species. `use_probs` passes softmax probabilities instead of raw scores,
/// and `all_access` hands every earlier representation to each step rather
/// than only the preceding one.
pub struct ChainedMultiHead {
    steps: Vec<(Rank, Linear)>,
    chained: ChainedConfig,
    class_counts: [usize; 6],
}

impl ChainedMultiHead {
    pub fn new(
        input_width: usize,
        class_counts: [usize; 6],
        targets: RankSet,
        chained: ChainedConfig,
        vb: VarBuilder,
    ) -> MycotaxResult<Self> {
        let mut order = targets.to_vec();
        if order.is_empty() {
            return Err(MycotaxError::Configuration(
                "Chained head needs at least one target level".to_string(),
            ));
        }
        if chained.ascending {
            order.reverse();
        }

        let mut steps = Vec::with_capacity(order.len());
        let mut seen_width = 0;
        let mut last_width = 0;
        for rank in order {
            let extra = if chained.all_access { seen_width } else { last_width };
            let classes = class_counts[rank.index()];
            let layer = candle_nn::linear(input_width + extra, classes, vb.pp(rank.name()))?;
            steps.push((rank, layer));
            seen_width += classes;
            last_width = classes;
        }
        Ok(Self {
            steps,
            chained,
            class_counts,
        })
    }

    pub fn chained(&self) -> ChainedConfig {
        self.chained
    }

    pub fn targets(&self) -> RankSet {
        self.steps.iter().map(|(rank, _)| *rank).collect()
    }

    /// Ranks in the order they are scored
    pub fn processing_order(&self) -> Vec<Rank> {
        self.steps.iter().map(|(rank, _)| *rank).collect()
    }

    pub fn forward(&self, x: &Tensor) -> MycotaxResult<Vec<Tensor>> {
        let mut scores: [Option<Tensor>; 6] = Default::default();
        let mut reps: Vec<Tensor> = Vec::with_capacity(self.steps.len());

        for (rank, layer) in &self.steps {
            let input = match reps.last() {
                None => x.clone(),
                Some(last) if !self.chained.all_access => Tensor::cat(&[x, last], 1)?,
                Some(_) => {
                    let mut parts: Vec<&Tensor> = vec![x];
                    parts.extend(reps.iter());
                    Tensor::cat(&parts, 1)?
                }
            };
            let score = layer.forward(&input)?;
            let rep = if self.chained.use_probs {
                ops::softmax_last_dim(&score)?
            } else {
                score.clone()
            };
            reps.push(rep);
            scores[rank.index()] = Some(score);
        }
        assemble(scores, self.class_counts, x.dim(0)?, x.device())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use candle_nn::VarMap;
    use rstest::rstest;

    const COUNTS: [usize; 6] = [2, 3, 4, 5, 6, 7];

    fn build(chained: ChainedConfig) -> (VarMap, ChainedMultiHead) {
        let device = Device::Cpu;
        let (varmap, vb) = mycotax_test::random_var_builder(&device);
        let head = ChainedMultiHead::new(8, COUNTS, RankSet::all(), chained, vb).unwrap();
        (varmap, head)
    }

    #[rstest]
    #[case(false, Rank::Phylum, Rank::Species)]
    #[case(true, Rank::Species, Rank::Phylum)]
    fn test_processing_order(#[case] ascending: bool, #[case] first: Rank, #[case] last: Rank) {
        let (_, head) = build(ChainedConfig {
            ascending,
            use_probs: true,
            all_access: true,
        });
        let order = head.processing_order();
        assert_eq!(order.first(), Some(&first));
        assert_eq!(order.last(), Some(&last));
    }

    #[rstest]
    #[case(true, 8 + 2 + 3 + 4 + 5 + 6)]
    #[case(false, 8 + 6)]
    fn test_species_step_input_width(#[case] all_access: bool, #[case] width: usize) {
        let (varmap, _) = build(ChainedConfig {
            ascending: false,
            use_probs: false,
            all_access,
        });
        let data = varmap.data().lock().unwrap();
        let weight = data.get("species.weight").unwrap();
        assert_eq!(weight.dims(), &[7, width]);
    }

    #[test]
    fn test_shapes_independent_of_direction() {
        let x = Tensor::randn(0f32, 1.0, (3, 8), &Device::Cpu).unwrap();
        let shapes = |ascending| -> Vec<Vec<usize>> {
            let (_, head) = build(ChainedConfig {
                ascending,
                use_probs: true,
                all_access: false,
            });
            head.forward(&x)
                .unwrap()
                .iter()
                .map(|t| t.dims().to_vec())
                .collect()
        };
        assert_eq!(shapes(true), shapes(false));
    }

    /// Phylum scores `[x, 0]`; class scores copy the phylum representation
    fn hand_set(use_probs: bool) -> ChainedMultiHead {
        use mycotax_test::tensors::{matrix, var_builder};
        let device = Device::Cpu;
        let vb = var_builder(
            vec![
                ("phylum.weight", matrix(&[&[1.0], &[0.0]], &device)),
                ("phylum.bias", Tensor::zeros(2, candle_core::DType::F32, &device).unwrap()),
                (
                    "class.weight",
                    matrix(&[&[0.0, 1.0, 0.0], &[0.0, 0.0, 1.0], &[0.0, 0.0, 0.0]], &device),
                ),
                ("class.bias", Tensor::zeros(3, candle_core::DType::F32, &device).unwrap()),
            ],
            &device,
        );
        let chained = ChainedConfig {
            ascending: false,
            use_probs,
            all_access: false,
        };
        let targets = RankSet::from_iter([Rank::Phylum, Rank::Class]);
        ChainedMultiHead::new(1, COUNTS, targets, chained, vb).unwrap()
    }

    #[rstest]
    #[case::raw_scores(false, [3f32.ln(), 0.0, 0.0])]
    #[case::probabilities(true, [0.75, 0.25, 0.0])]
    fn test_next_step_receives_scores_or_probs(#[case] use_probs: bool, #[case] expected: [f32; 3]) {
        let x = Tensor::new(&[[3f32.ln()]], &Device::Cpu).unwrap();
        let scores = hand_set(use_probs).forward(&x).unwrap();

        let class: Vec<Vec<f32>> = scores[Rank::Class.index()].to_vec2().unwrap();
        for (got, want) in class[0].iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{:?} != {:?}", class[0], expected);
        }
        let phylum: Vec<Vec<f32>> = scores[Rank::Phylum.index()].to_vec2().unwrap();
        assert!((phylum[0][0] - 3f32.ln()).abs() < 1e-6);
    }
}
