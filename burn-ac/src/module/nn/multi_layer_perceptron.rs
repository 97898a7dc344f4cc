use burn::module::Module;
use burn::nn::Linear;
use burn::prelude::*;
use nn::{LeakyRelu, LeakyReluConfig, LinearConfig};

use crate::Error;

#[derive(Config)]
pub struct MultiLayerPerceptronConfig {
    /// Layer widths: input size, hidden sizes..., output size.
    sizes: Vec<usize>,
}

/// Stack of linear layers with leaky ReLU between them. Layers apply to the last axis,
/// so inputs may carry any number of leading batch or time axes.
#[derive(Module, Debug)]
pub struct MultiLayerPerceptron<B: Backend> {
    linear_layers: Vec<Linear<B>>,
    activation: LeakyRelu,
}

impl MultiLayerPerceptronConfig {
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> crate::Result<MultiLayerPerceptron<B>> {
        if self.sizes.len() < 2 || self.sizes.contains(&0) {
            return Err(Error::InvalidConfig(format!(
                "Unable to construct MLP. Expected non-zero (input size, hidden size, ..., output size), got {:?}",
                self.sizes
            )));
        }
        let linear_layers = self
            .sizes
            .windows(2)
            .map(|w| LinearConfig::new(w[0], w[1]).init(device))
            .collect();
        Ok(MultiLayerPerceptron {
            linear_layers,
            activation: LeakyReluConfig::new().init(),
        })
    }
}

impl<B: Backend> MultiLayerPerceptron<B> {
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let mut x = input;

        match self.linear_layers.split_last() {
            Some((last, hidden)) => {
                for layer in hidden {
                    x = layer.forward(x);
                    x = self.activation.forward(x);
                }
                last.forward(x)
            }
            None => x,
        }
    }
}

#[cfg(test)]
mod tests {

    use burn::{
        backend::NdArray,
        tensor::{Shape, Tensor},
    };

    use super::MultiLayerPerceptronConfig;

    #[test]
    fn test_multi_layer_perceptron() {
        let device = &Default::default();
        for n_hidden_layers in 0..2 {
            let mut sizes = vec![4];
            for i in 0..n_hidden_layers {
                sizes.push(32 * (i + 1));
            }
            sizes.push(3);
            let model = MultiLayerPerceptronConfig::new(sizes)
                .init::<NdArray>(device)
                .unwrap();
            let x = Tensor::<NdArray, 3>::ones([2, 5, 4], device);
            assert_eq!(model.forward(x).shape(), Shape::new([2, 5, 3]));
        }
    }

    #[test]
    fn test_multi_layer_perceptron_rejects_sizes() {
        let device = &Default::default();
        assert!(MultiLayerPerceptronConfig::new(vec![4])
            .init::<NdArray>(device)
            .is_err());
        assert!(MultiLayerPerceptronConfig::new(vec![4, 0, 2])
            .init::<NdArray>(device)
            .is_err());
    }
}
