use candle_core::{Module, Tensor};
use candle_nn::{Linear, VarBuilder};
use mycotax_core::{MycotaxError, MycotaxResult};

/// Fully connected layers (linear + relu) between backbone and output head.
///
/// The narrowest layer is the bottleneck; ties go to the first occurrence.
pub struct FcnStack {
    layers: Vec<Linear>,
    widths: Vec<usize>,
    input_width: usize,
    bottleneck: Option<usize>,
}

impl FcnStack {
    pub fn new(input_width: usize, widths: &[usize], vb: VarBuilder) -> MycotaxResult<Self> {
        if widths.contains(&0) {
            return Err(MycotaxError::Configuration(
                "FCN layers must have positive width".to_string(),
            ));
        }
        let mut layers = Vec::with_capacity(widths.len());
        let mut width = input_width;
        for (i, &out) in widths.iter().enumerate() {
            layers.push(candle_nn::linear(width, out, vb.pp(i.to_string()))?);
            width = out;
        }
        Ok(Self {
            layers,
            widths: widths.to_vec(),
            input_width,
            bottleneck: bottleneck_index(widths),
        })
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    /// Width of what the output head receives
    pub fn output_width(&self) -> usize {
        self.widths.last().copied().unwrap_or(self.input_width)
    }

    pub fn bottleneck(&self) -> Option<usize> {
        self.bottleneck
    }

    /// Width of the latent representation
    pub fn latent_width(&self) -> usize {
        self.bottleneck
            .map(|i| self.widths[i])
            .unwrap_or(self.input_width)
    }

    pub fn forward(&self, x: &Tensor) -> MycotaxResult<Tensor> {
        let mut x = x.clone();
        for layer in &self.layers {
            x = layer.forward(&x)?.relu()?;
        }
        Ok(x)
    }

    /// Layers before the bottleneck with their activation, then the bottleneck's
    /// linear map without it. Identity for an empty stack.
    pub fn forward_until_bottleneck(&self, x: &Tensor) -> MycotaxResult<Tensor> {
        let Some(bottleneck) = self.bottleneck else {
            return Ok(x.clone());
        };
        let mut x = x.clone();
        for layer in &self.layers[..bottleneck] {
            x = layer.forward(&x)?.relu()?;
        }
        Ok(self.layers[bottleneck].forward(&x)?)
    }
}

/// Index of the first minimum width
pub fn bottleneck_index(widths: &[usize]) -> Option<usize> {
    widths
        .iter()
        .enumerate()
        .min_by_key(|&(i, &w)| (w, i))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use mycotax_test::tensors::{identity, matrix, var_builder};

    #[test]
    fn test_bottleneck_index() {
        assert_eq!(bottleneck_index(&[]), None);
        assert_eq!(bottleneck_index(&[64, 8, 32]), Some(1));
        assert_eq!(bottleneck_index(&[16, 4, 4, 8]), Some(1));
    }

    #[test]
    fn test_latent_skips_bottleneck_activation() {
        let device = Device::Cpu;
        let negate = identity(2, &device).neg().unwrap();
        let zeros = Tensor::zeros(2, DType::F32, &device).unwrap();
        let vb = var_builder(
            vec![
                ("0.weight", negate.clone()),
                ("0.bias", zeros.clone()),
                ("1.weight", negate),
                ("1.bias", zeros),
            ],
            &device,
        );
        let stack = FcnStack::new(2, &[2, 2], vb).unwrap();
        assert_eq!(stack.bottleneck(), Some(0));

        let x = matrix(&[&[1.0, -2.0]], &device);
        let latent: Vec<Vec<f32>> = stack.forward_until_bottleneck(&x).unwrap().to_vec2().unwrap();
        assert_eq!(latent, vec![vec![-1.0, 2.0]]);

        let full: Vec<Vec<f32>> = stack.forward(&x).unwrap().to_vec2().unwrap();
        // relu(-relu(-x))
        assert_eq!(full, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn test_empty_stack_is_identity() {
        let device = Device::Cpu;
        let stack = FcnStack::new(3, &[], var_builder(vec![], &device)).unwrap();
        let x = matrix(&[&[1.0, 2.0, 3.0]], &device);
        assert_eq!(stack.output_width(), 3);
        assert_eq!(stack.latent_width(), 3);
        let y: Vec<Vec<f32>> = stack.forward_until_bottleneck(&x).unwrap().to_vec2().unwrap();
        assert_eq!(y, vec![vec![1.0, 2.0, 3.0]]);
    }
}
