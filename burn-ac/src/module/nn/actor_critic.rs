use burn::prelude::*;

use super::multi_layer_perceptron::{MultiLayerPerceptron, MultiLayerPerceptronConfig};
use crate::module::component::{Actor, Value};

/// Layer layout shared by the policy and value networks. Both networks get the same hidden
/// stack, so their leading layers line up and can be shared.
#[derive(Config)]
pub struct ActorCriticNetworkConfig {
    pub observation_size: usize,
    pub n_actions: usize,
    #[config(default = "vec![64, 64]")]
    pub hidden_sizes: Vec<usize>,
}

impl ActorCriticNetworkConfig {
    fn sizes(&self, output_size: usize) -> Vec<usize> {
        std::iter::once(self.observation_size)
            .chain(self.hidden_sizes.iter().copied())
            .chain(std::iter::once(output_size))
            .collect()
    }

    pub fn init_value<B: Backend>(&self, device: &B::Device) -> crate::Result<ValueNetwork<B>> {
        Ok(ValueNetwork {
            model: MultiLayerPerceptronConfig::new(self.sizes(1)).init(device)?,
        })
    }

    pub fn init_policy<B: Backend>(&self, device: &B::Device) -> crate::Result<PolicyNetwork<B>> {
        Ok(PolicyNetwork {
            model: MultiLayerPerceptronConfig::new(self.sizes(self.n_actions)).init(device)?,
        })
    }
}

#[derive(Module, Debug)]
pub struct ValueNetwork<B: Backend> {
    model: MultiLayerPerceptron<B>,
}

impl<B: Backend> Value<B> for ValueNetwork<B> {
    fn v_batch(&self, observations: Tensor<B, 3>) -> Tensor<B, 3> {
        self.model.forward(observations)
    }
}

#[derive(Module, Debug)]
pub struct PolicyNetwork<B: Backend> {
    model: MultiLayerPerceptron<B>,
}

impl<B: Backend> Actor<B> for PolicyNetwork<B> {
    fn logits_batch(&self, observations: Tensor<B, 3>) -> Tensor<B, 3> {
        self.model.forward(observations)
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use expect_test::expect;

    use super::*;

    #[test]
    fn test_network_shapes() {
        let device = &Default::default();
        let config = ActorCriticNetworkConfig::new(3, 2).with_hidden_sizes(vec![8]);
        let value = config.init_value::<NdArray>(device).unwrap();
        let policy = config.init_policy::<NdArray>(device).unwrap();
        let observations = Tensor::<NdArray, 3>::ones([2, 4, 3], device);

        expect![["[2, 4, 1]"]].assert_eq(&format!("{:?}", value.v_batch(observations.clone()).dims()));
        expect![["[2, 4, 2]"]].assert_eq(&format!("{:?}", policy.logits_batch(observations.clone()).dims()));

        let actions = Tensor::<NdArray, 2, Int>::from_ints([[0, 1, 1, 0], [1, 1, 1, 1]], device);
        let log_probs = policy.log_prob_batch(observations, actions);
        assert_eq!(log_probs.dims(), [2, 4]);
        let probs = log_probs.exp().into_data().to_vec::<f32>().unwrap();
        assert!(probs.iter().all(|p| *p > 0.0 && *p <= 1.0));
    }

    #[test]
    fn test_log_probs_normalise() {
        let device = &Default::default();
        let policy = ActorCriticNetworkConfig::new(3, 2)
            .init_policy::<NdArray>(device)
            .unwrap();
        let observations = Tensor::<NdArray, 3>::ones([1, 1, 3], device);
        let first = policy.log_prob_batch(observations.clone(), Tensor::from_ints([[0]], device));
        let second = policy.log_prob_batch(observations, Tensor::from_ints([[1]], device));
        let total = (first.exp() + second.exp()).into_scalar();
        assert!((total - 1.0).abs() < 1e-5);
    }
}
