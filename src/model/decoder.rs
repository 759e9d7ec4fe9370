//! Rank-by-rank decoding for sequence-conditioned backbones
//!
//! The target buffer starts as a single start token (0) per row. For each rank
//! the backbone reads the inputs together with the buffer, the slice at the
//! current rank is scored, and one token per row is appended: the flat label
//! of the chosen class shifted by one, since 0 is reserved for the start.
//! Both modes share this loop and differ only in where the chosen class comes
//! from.

use candle_core::{DType, IndexOp, Tensor, D};
use mycotax_bio::TaxonEncoder;
use mycotax_core::{MycotaxError, MycotaxResult, Rank};
use tracing::debug;

use super::backbone::TargetConditionedExtractor;

/// Where the token fed back after each rank comes from
#[derive(Debug, Clone, Copy)]
pub enum TokenSource<'a> {
    /// Argmax of the scores just produced (inference)
    Predicted,
    /// Column `rank` of a `[n, 6]` label matrix (teacher forcing)
    TrueLabels(&'a Tensor),
}

impl<'a> TokenSource<'a> {
    /// Autoregressive without labels, teacher forcing with them
    pub fn from_labels(labels: Option<&'a Tensor>) -> Self {
        match labels {
            Some(labels) => TokenSource::TrueLabels(labels),
            None => TokenSource::Predicted,
        }
    }

    fn classes(&self, scores: &Tensor, rank: Rank) -> MycotaxResult<Tensor> {
        match self {
            TokenSource::Predicted => Ok(scores.argmax(D::Minus1)?),
            TokenSource::TrueLabels(labels) => {
                Ok(labels.i((.., rank.index()))?.to_dtype(DType::U32)?)
            }
        }
    }
}

/// Scores and the final target buffer of one decoding run
pub struct Decoded {
    pub scores: Vec<Tensor>,
    /// `[n, 7]`: start token plus one token per rank
    pub targets: Tensor,
}

pub struct SequentialDecoder<'a> {
    backbone: &'a dyn TargetConditionedExtractor,
    taxonomy: &'a TaxonEncoder,
}

impl<'a> SequentialDecoder<'a> {
    pub fn new(backbone: &'a dyn TargetConditionedExtractor, taxonomy: &'a TaxonEncoder) -> Self {
        Self { backbone, taxonomy }
    }

    /// Decode all six ranks; `step` turns the backbone features of one rank
    /// into that rank's scores.
    pub fn run<F>(&self, x: &Tensor, source: TokenSource<'_>, step: F) -> MycotaxResult<Vec<Tensor>>
    where
        F: FnMut(&Tensor, Rank) -> MycotaxResult<Tensor>,
    {
        Ok(self.decode(x, source, step)?.scores)
    }

    /// Like [`run`](Self::run) but keeps the target buffer
    pub fn decode<F>(&self, x: &Tensor, source: TokenSource<'_>, mut step: F) -> MycotaxResult<Decoded>
    where
        F: FnMut(&Tensor, Rank) -> MycotaxResult<Tensor>,
    {
        let n = x.dim(0)?;
        if let TokenSource::TrueLabels(labels) = source {
            if labels.dims() != [n, Rank::COUNT] {
                return Err(MycotaxError::InputType(format!(
                    "Teacher forcing needs [{}, 6] labels, got {:?}",
                    n,
                    labels.dims()
                )));
            }
            self.check_label_range(labels)?;
        }

        let device = x.device();
        let shift = Tensor::new(1u32, device)?;
        let mut targets = Tensor::zeros((n, 1), DType::U32, device)?;
        let mut scores = Vec::with_capacity(Rank::COUNT);

        for rank in Rank::ALL {
            let features = self
                .backbone
                .forward(x, &targets)?
                .i((.., rank.index()))?
                .contiguous()?;
            let rank_scores = step(&features, rank)?;

            let classes = source.classes(&rank_scores, rank)?;
            let tokens = self
                .taxonomy
                .flat_labels(&classes, rank)?
                .broadcast_add(&shift)?;
            targets = Tensor::cat(&[&targets, &tokens.unsqueeze(1)?], 1)?;
            debug!("Decoded {} for {} rows", rank, n);
            scores.push(rank_scores);
        }
        Ok(Decoded { scores, targets })
    }

    /// Every label must name a class of its own rank, otherwise its flat
    /// token would land in the next rank's range.
    fn check_label_range(&self, labels: &Tensor) -> MycotaxResult<()> {
        let rows: Vec<Vec<u32>> = labels.to_dtype(DType::U32)?.to_vec2()?;
        for (i, row) in rows.iter().enumerate() {
            for rank in Rank::ALL {
                let label = row[rank.index()];
                let classes = self.taxonomy.classes(rank);
                if label as usize >= classes {
                    return Err(MycotaxError::InputType(format!(
                        "Label {} for {} in row {} is outside the {} known classes",
                        label, rank, i, classes
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::backbone::{BackboneConfig, Backbone};
    use crate::model::heads::MultiHead;
    use candle_core::Device;
    use mycotax_core::RankSet;
    use mycotax_test::tensors::random_var_builder;
    use mycotax_test::toy_encoder;

    fn decoder_parts() -> (Box<dyn TargetConditionedExtractor>, MultiHead, TaxonEncoder) {
        let device = Device::Cpu;
        let encoder = toy_encoder();
        let (_, vb) = random_var_builder(&device);
        let backbone = BackboneConfig::EncoderDecoder { d_model: 8 }
            .build(&[10], encoder.vocab_size(), vb.pp("backbone"))
            .unwrap();
        let Backbone::SequenceConditioned(backbone) = backbone else {
            panic!("expected a sequence-conditioned backbone");
        };
        let head = MultiHead::new(8, encoder.class_counts(), RankSet::all(), vb.pp("head")).unwrap();
        (backbone, head, encoder)
    }

    #[test]
    fn test_target_buffer_tokens() {
        let (backbone, head, encoder) = decoder_parts();
        let decoder = SequentialDecoder::new(backbone.as_ref(), &encoder);
        let x = Tensor::randn(0f32, 1.0, (3, 10), &Device::Cpu).unwrap();
        let labels = Tensor::new(&[[1u32, 2, 2, 2, 2, 2]; 3], &Device::Cpu).unwrap();

        let decoded = decoder
            .decode(&x, TokenSource::TrueLabels(&labels), |h, rank| {
                Ok(head.forward_levels(h, &[rank])?.remove(0))
            })
            .unwrap();
        let targets: Vec<Vec<u32>> = decoded.targets.to_vec2().unwrap();
        // Offsets of the toy taxonomy are 0, 2, 6, 10, 14, 18
        assert_eq!(targets[0], vec![0, 2, 5, 9, 13, 17, 21]);
        assert!(targets.iter().all(|row| row[1..].iter().all(|&t| t >= 1)));
    }

    #[test]
    fn test_label_shape_checked() {
        let (backbone, head, encoder) = decoder_parts();
        let decoder = SequentialDecoder::new(backbone.as_ref(), &encoder);
        let x = Tensor::randn(0f32, 1.0, (2, 10), &Device::Cpu).unwrap();
        let labels = Tensor::zeros((2, 5), DType::U32, &Device::Cpu).unwrap();
        let result = decoder.run(&x, TokenSource::TrueLabels(&labels), |h, rank| {
            Ok(head.forward_levels(h, &[rank])?.remove(0))
        });
        assert!(matches!(result, Err(MycotaxError::InputType(_))));
    }

    #[test]
    fn test_out_of_range_label_rejected() {
        let (backbone, head, encoder) = decoder_parts();
        let decoder = SequentialDecoder::new(backbone.as_ref(), &encoder);
        let x = Tensor::randn(0f32, 1.0, (2, 10), &Device::Cpu).unwrap();
        // The toy taxonomy has two phyla
        let labels = Tensor::new(&[[0u32, 0, 0, 0, 0, 0], [3, 0, 0, 0, 0, 0]], &Device::Cpu).unwrap();
        let result = decoder.run(&x, TokenSource::TrueLabels(&labels), |h, rank| {
            Ok(head.forward_levels(h, &[rank])?.remove(0))
        });
        assert!(matches!(result, Err(MycotaxError::InputType(_))));
    }
}
