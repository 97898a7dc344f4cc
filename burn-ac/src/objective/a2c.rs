//! Advantage actor-critic.
//!
//! Advantages are the sampled returns minus the value estimates of the same timesteps. The
//! bootstrap timestep at the end of the slice only serves the other derivers and is dropped.

use burn::prelude::*;

use super::{masked_mean, window_length, PolicyBatch, PolicyInputDeriver};
use crate::{data::trajectory::TrajectorySlice, Result};

/// Scales the log-likelihood of each action by `return − value`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdvantageActorCritic;

#[derive(Clone, Debug)]
pub struct AdvantageBatch<B: Backend> {
    pub observations: Tensor<B, 3>,
    pub actions: Tensor<B, 2, Int>,
    pub advantages: Tensor<B, 2>,
    pub mask: Tensor<B, 2>,
}

impl<B: Backend> PolicyBatch<B> for AdvantageBatch<B> {
    fn observations(&self) -> Tensor<B, 3> {
        self.observations.clone()
    }

    fn actions(&self) -> Tensor<B, 2, Int> {
        self.actions.clone()
    }

    fn mask(&self) -> Tensor<B, 2> {
        self.mask.clone()
    }
}

/// `return − value` over the first `L` timesteps of an `L + 1` slice. Every other field of the
/// slice is truncated to the same window so the batch stays aligned.
pub(crate) fn advantages<B: Backend>(
    slice: TrajectorySlice<B>,
    values: Tensor<B, 2>,
) -> Result<(TrajectorySlice<B>, Tensor<B, 2>)> {
    let length = window_length(&slice, &values)?;
    let slice = slice.truncate_last();
    let advantages = slice.returns.clone() - values.narrow(1, 0, length);
    Ok((slice, advantages))
}

impl<B: Backend> PolicyInputDeriver<B> for AdvantageActorCritic {
    type Batch = AdvantageBatch<B>;

    fn derive(
        &self,
        slice: TrajectorySlice<B>,
        values: Tensor<B, 2>,
    ) -> Result<AdvantageBatch<B>> {
        let (slice, advantages) = advantages(slice, values)?;
        Ok(AdvantageBatch {
            observations: slice.observations,
            actions: slice.actions,
            advantages,
            mask: slice.mask,
        })
    }

    fn loss(&self, log_probs: Tensor<B, 2>, batch: AdvantageBatch<B>) -> Tensor<B, 1> {
        masked_mean(log_probs * batch.advantages, batch.mask).neg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::tests::{slice, values, TestBackend};

    #[test]
    fn test_advantages() {
        let slice = slice(
            [[0.0; 4]; 2],
            [[3.0, 2.0, 1.0, 0.0], [1.0, 1.0, 1.0, 1.0]],
            [[0.0; 4]; 2],
        );
        let values = values([[1.0, 1.0, 1.0, 9.0], [0.5, 2.0, 1.0, -9.0]]);
        let batch = AdvantageActorCritic.derive(slice, values).unwrap();

        // Observations and actions are cut to the advantage window.
        assert_eq!(batch.observations.dims(), [2, 3, 3]);
        assert_eq!(batch.actions.dims(), [2, 3]);
        assert_eq!(batch.mask.dims(), [2, 3]);
        batch.advantages.into_data().assert_approx_eq(
            &TensorData::from([[2.0f32, 1.0, 0.0], [0.5, -1.0, 0.0]]),
            5,
        );
    }

    #[test]
    fn test_advantage_loss() {
        let device = &Default::default();
        let slice = slice(
            [[0.0; 4]; 2],
            [[2.0, 2.0, 2.0, 0.0], [1.0, 1.0, 1.0, 0.0]],
            [[0.0; 4]; 2],
        );
        let batch = AdvantageActorCritic
            .derive(slice, values([[0.0; 4]; 2]))
            .unwrap();
        let log_probs = Tensor::<TestBackend, 2>::from_floats([[-1.0; 3], [-1.0; 3]], device);
        // Masked steps: three with advantage 2 and two with advantage 1.
        let loss = AdvantageActorCritic.loss(log_probs, batch).into_scalar();
        assert!((loss - 8.0 / 5.0).abs() < 1e-5);
    }
}
