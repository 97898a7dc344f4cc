use std::marker::PhantomData;

use burn::{module::AutodiffModule, prelude::*, tensor::backend::AutodiffBackend};

use crate::{module::component::Value, Error, Result};

/// Inference-only copy of a value model, living on the inner (non-differentiable) backend.
pub struct ValueEvaluator<B: AutodiffBackend, V: AutodiffModule<B>> {
    model: V::InnerModule,
    backend: PhantomData<B>,
}

impl<B, V> ValueEvaluator<B, V>
where
    B: AutodiffBackend,
    V: AutodiffModule<B>,
    V::InnerModule: Value<B::InnerBackend>,
{
    pub fn new(value_model: &V) -> Self {
        Self {
            model: value_model.valid(),
            backend: PhantomData,
        }
    }

    /// Replaces the held parameters with those of `value_model`.
    pub fn refresh(&mut self, value_model: &V) {
        self.model = value_model.valid();
    }

    /// Value estimates `[batch, slice_length]` for observations `[batch, slice_length, _]`.
    /// The result carries no gradient.
    pub fn evaluate(
        &self,
        observations: Tensor<B, 3>,
        batch_size: usize,
        slice_length: usize,
    ) -> Result<Tensor<B, 2>> {
        let values = self.model.v_batch(observations.inner());
        check_value_shape(values.dims(), [batch_size, slice_length, 1])?;
        Ok(Tensor::from_inner(values.squeeze(2)))
    }
}

pub fn check_value_shape(actual: [usize; 3], expected: [usize; 3]) -> Result<()> {
    match actual == expected {
        true => Ok(()),
        false => Err(Error::ValueShape {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::{Linear, LinearConfig};

    use super::*;
    use crate::module::nn::actor_critic::{ActorCriticNetworkConfig, ValueNetwork};

    type TestBackend = Autodiff<NdArray>;

    #[derive(Module, Debug)]
    struct TwoHeadedValue<B: Backend> {
        linear: Linear<B>,
    }

    impl<B: Backend> Value<B> for TwoHeadedValue<B> {
        fn v_batch(&self, observations: Tensor<B, 3>) -> Tensor<B, 3> {
            self.linear.forward(observations)
        }
    }

    fn value_network(device: &<TestBackend as Backend>::Device) -> ValueNetwork<TestBackend> {
        ActorCriticNetworkConfig::new(3, 2)
            .with_hidden_sizes(vec![4])
            .init_value(device)
            .unwrap()
    }

    #[test]
    fn test_evaluate() {
        let device = &Default::default();
        let model = value_network(device);
        let evaluator = ValueEvaluator::new(&model);
        let observations = Tensor::<TestBackend, 3>::ones([2, 4, 3], device);
        let values = evaluator.evaluate(observations.clone(), 2, 4).unwrap();
        assert_eq!(values.dims(), [2, 4]);
        assert!(!values.is_require_grad());

        let expected = model.v_batch(observations).squeeze::<2>(2);
        values.into_data().assert_approx_eq(&expected.into_data(), 5);
    }

    #[test]
    fn test_evaluate_rejects_wide_output() {
        let device = &Default::default();
        let model = TwoHeadedValue::<TestBackend> {
            linear: LinearConfig::new(3, 2).init(device),
        };
        let evaluator = ValueEvaluator::new(&model);
        let observations = Tensor::<TestBackend, 3>::ones([2, 4, 3], device);
        let result = evaluator.evaluate(observations, 2, 4);
        match result {
            Err(Error::ValueShape { expected, actual }) => {
                assert_eq!(expected, vec![2, 4, 1]);
                assert_eq!(actual, vec![2, 4, 2]);
            }
            other => panic!("expected a shape error, got {:?}", other.map(|v| v.dims())),
        }
    }

    #[test]
    fn test_evaluate_rejects_wrong_length() {
        let device = &Default::default();
        let evaluator = ValueEvaluator::new(&value_network(device));
        let observations = Tensor::<TestBackend, 3>::ones([2, 3, 3], device);
        assert!(matches!(
            evaluator.evaluate(observations, 2, 4),
            Err(Error::ValueShape { .. })
        ));
    }

    #[test]
    fn test_refresh() {
        let device = &Default::default();
        let first = value_network(device);
        let second = value_network(device);
        let mut evaluator = ValueEvaluator::new(&first);
        let observations = Tensor::<TestBackend, 3>::ones([1, 2, 3], device);
        evaluator.refresh(&second);
        let values = evaluator.evaluate(observations.clone(), 1, 2).unwrap();
        let expected = second.v_batch(observations).squeeze::<2>(2);
        values.into_data().assert_approx_eq(&expected.into_data(), 5);
    }
}
