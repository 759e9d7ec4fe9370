use candle_core::{Device, Tensor, D};
use mycotax::model::heads::{ChainedMultiHead, InferParent, InferSum, OutputHead};
use mycotax::{ClassifierConfig, HeadKind, Rank, RankSet};
use mycotax_bio::{TaxonEncoder, TaxonHierarchy};
use mycotax_core::ChainedConfig;
use mycotax_test::assertions::{assert_hierarchy_consistent, assert_tensors_close};
use mycotax_test::tensors::{identity, matrix, random_var_builder, var_builder};
use mycotax_test::{infer_sum_hierarchy, toy_encoder};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

fn argmax_rows(scores: &[Tensor]) -> Vec<[u32; 6]> {
    let columns: Vec<Vec<u32>> = scores
        .iter()
        .map(|s| s.argmax(D::Minus1).unwrap().to_vec1().unwrap())
        .collect();
    (0..columns[0].len())
        .map(|row| std::array::from_fn(|r| columns[r][row]))
        .collect()
}

/// Linear layer at `base` that passes a `width`-wide input through unchanged
fn pass_through(width: usize, device: &Device) -> candle_nn::VarBuilder<'static> {
    var_builder(
        vec![
            ("base.weight", identity(width, device)),
            ("base.bias", Tensor::zeros(width, candle_core::DType::F32, device).unwrap()),
        ],
        device,
    )
}

#[test]
fn test_infer_parent_two_phyla_scenario() {
    let device = Device::Cpu;
    let encoder = toy_encoder();
    let config = ClassifierConfig::default()
        .with_output(HeadKind::InferParent)
        .with_base_level(Rank::Class);
    let head = OutputHead::build(
        &config,
        4,
        encoder.class_counts(),
        Some(&encoder),
        &device,
        pass_through(4, &device),
    )
    .unwrap();

    let logits = matrix(&[&[5.0, 1.0, 0.0, 0.0], &[0.0, 0.0, 1.0, 5.0]], &device);
    let scores = head.forward(&logits).unwrap();

    let phylum: Vec<u32> = scores[0].argmax(D::Minus1).unwrap().to_vec1().unwrap();
    let class: Vec<u32> = scores[1].argmax(D::Minus1).unwrap().to_vec1().unwrap();
    assert_eq!(phylum, vec![0, 1]);
    assert_eq!(class, vec![0, 3]);
    assert_eq!(
        head.predicted_ranks(),
        RankSet::from_iter([Rank::Phylum, Rank::Class])
    );
}

#[test]
fn test_infer_sum_parent_is_sum_of_children() {
    let device = Device::Cpu;
    let hierarchy = infer_sum_hierarchy();
    let head = InferSum::new(3, &hierarchy, Rank::Class, &device, pass_through(3, &device)).unwrap();

    let x = matrix(&[&[2.0, 0.5, -1.0], &[0.0, 0.0, 3.0], &[1.0, 1.0, 1.0]], &device);
    let scores = head.forward(&x).unwrap();
    let base: Vec<Vec<f32>> = scores[1].to_vec2().unwrap();
    let phylum: Vec<Vec<f32>> = scores[0].to_vec2().unwrap();

    // Parent 0 has children {0, 1}, parent 1 has child {2}
    for (b, p) in base.iter().zip(&phylum) {
        assert!((p[0] - (b[0] + b[1])).abs() < 1e-6);
        assert!((p[1] - b[2]).abs() < 1e-6);
    }
}

#[rstest]
#[case::all_access_probs(true, true)]
#[case::last_only_probs(true, false)]
#[case::all_access_scores(false, true)]
#[case::last_only_scores(false, false)]
fn test_chained_direction_reverses_order_only(#[case] use_probs: bool, #[case] all_access: bool) {
    let device = Device::Cpu;
    let encoder = toy_encoder();
    let x = Tensor::randn(0f32, 1.0, (5, 6), &device).unwrap();

    let build = |ascending| {
        let (_, vb) = random_var_builder(&device);
        let chained = ChainedConfig {
            ascending,
            use_probs,
            all_access,
        };
        ChainedMultiHead::new(6, encoder.class_counts(), RankSet::all(), chained, vb).unwrap()
    };
    let descending = build(false);
    let ascending = build(true);

    let mut reversed = descending.processing_order();
    reversed.reverse();
    assert_eq!(ascending.processing_order(), reversed);
    assert_eq!(descending.processing_order().first(), Some(&Rank::Phylum));

    let a = ascending.forward(&x).unwrap();
    let d = descending.forward(&x).unwrap();
    let shapes = |scores: &[Tensor]| scores.iter().map(|s| s.dims().to_vec()).collect::<Vec<_>>();
    assert_eq!(shapes(&a), shapes(&d));
}

#[test]
fn test_tree_scores_are_probabilities_at_every_rank() {
    let device = Device::Cpu;
    let encoder = toy_encoder();
    let (_, vb) = random_var_builder(&device);
    let config = ClassifierConfig::default().with_output(HeadKind::Tree);
    let head = OutputHead::build(&config, 6, encoder.class_counts(), Some(&encoder), &device, vb)
        .unwrap();

    let scores = head.forward(&Tensor::randn(0f32, 2.0, (4, 6), &device).unwrap()).unwrap();
    let ones = Tensor::ones(4, candle_core::DType::F32, &device).unwrap();
    for score in &scores {
        assert_tensors_close(&score.sum(D::Minus1).unwrap(), &ones, 1e-5);
    }
}

/// Hierarchy with counts `[2, 3, 4, 5, 6, 8]` and arbitrary parent links
fn random_hierarchy() -> impl Strategy<Value = TaxonHierarchy> {
    let counts = [2usize, 3, 4, 5, 6, 8];
    let tables: Vec<_> = (1..6)
        .map(|r| prop::collection::vec(0..counts[r - 1] as u32, counts[r]))
        .collect();
    tables.prop_map(move |parents| TaxonHierarchy::new(counts, parents).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_infer_parent_never_violates_hierarchy(
        hierarchy in random_hierarchy(),
        features in prop::collection::vec(-3.0f32..3.0, 10 * 7),
    ) {
        let device = Device::Cpu;
        let (_, vb) = random_var_builder(&device);
        let head = InferParent::new(7, &hierarchy, Rank::Species, &device, vb).unwrap();

        let x = Tensor::from_vec(features, (10, 7), &device).unwrap();
        let rows = argmax_rows(&head.forward(&x).unwrap());
        prop_assert_eq!(hierarchy.count_violations(&rows), 0);
        assert_hierarchy_consistent(&hierarchy, &rows);
    }

    #[test]
    fn prop_infer_sum_rank_totals_are_one(
        hierarchy in random_hierarchy(),
        features in prop::collection::vec(-3.0f32..3.0, 6 * 5),
    ) {
        let device = Device::Cpu;
        let encoder = TaxonEncoder::synthetic(hierarchy);
        let (_, vb) = random_var_builder(&device);
        let config = ClassifierConfig::default()
            .with_output(HeadKind::InferSum)
            .with_base_level(Rank::Species);
        let head = OutputHead::build(&config, 5, encoder.class_counts(), Some(&encoder), &device, vb)
            .unwrap();

        let x = Tensor::from_vec(features, (6, 5), &device).unwrap();
        for score in head.forward(&x).unwrap() {
            let totals: Vec<f32> = score.sum(D::Minus1).unwrap().to_vec1().unwrap();
            prop_assert!(totals.iter().all(|t| (t - 1.0).abs() < 1e-5));
        }
    }
}
