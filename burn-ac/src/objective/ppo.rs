//! Proximal policy optimisation with the clipped surrogate objective.

use burn::prelude::*;

use super::{a2c::advantages, masked_mean, PolicyBatch, PolicyInputDeriver};
use crate::{data::trajectory::TrajectorySlice, Error};

#[derive(Config)]
pub struct PpoConfig {
    /// Half-width of the interval the probability ratio is clipped to.
    #[config(default = 0.2)]
    pub ppo_eps: f64,
}

impl PpoConfig {
    pub fn init(&self) -> crate::Result<Ppo> {
        if !(self.ppo_eps > 0.0 && self.ppo_eps < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "The PPO clip range should be in the interval (0,1). got {}",
                self.ppo_eps
            )));
        }
        Ok(Ppo {
            ppo_eps: self.ppo_eps,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Ppo {
    ppo_eps: f64,
}

#[derive(Clone, Debug)]
pub struct PpoBatch<B: Backend> {
    pub observations: Tensor<B, 3>,
    pub actions: Tensor<B, 2, Int>,
    pub advantages: Tensor<B, 2>,
    /// Log-probabilities recorded by the behaviour policy at collection time.
    pub old_log_probs: Tensor<B, 2>,
    pub mask: Tensor<B, 2>,
}

impl<B: Backend> PolicyBatch<B> for PpoBatch<B> {
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

/// Per-timestep `min(ratio·A, clip(ratio, 1−ε, 1+ε)·A)` with `ratio = exp(new − old)`.
pub fn ppo_objective<B: Backend, const D: usize>(
    new_log_probs: Tensor<B, D>,
    advantages: Tensor<B, D>,
    old_log_probs: Tensor<B, D>,
    ppo_eps: f64,
) -> Tensor<B, D> {
    let ratio = (new_log_probs - old_log_probs).exp();
    let unclipped = ratio.clone() * advantages.clone();
    let clipped = ratio.clamp(1.0 - ppo_eps, 1.0 + ppo_eps) * advantages;
    unclipped.min_pair(clipped)
}

impl Ppo {
    pub fn ppo_eps(&self) -> f64 {
        self.ppo_eps
    }
}

impl<B: Backend> PolicyInputDeriver<B> for Ppo {
    type Batch = PpoBatch<B>;

    fn derive(
        &self,
        slice: TrajectorySlice<B>,
        values: Tensor<B, 2>,
    ) -> crate::Result<PpoBatch<B>> {
        let (slice, advantages) = advantages(slice, values)?;
        Ok(PpoBatch {
            observations: slice.observations,
            actions: slice.actions,
            advantages,
            old_log_probs: slice.log_probs,
            mask: slice.mask,
        })
    }

    fn loss(&self, log_probs: Tensor<B, 2>, batch: PpoBatch<B>) -> Tensor<B, 1> {
        let objective = ppo_objective(
            log_probs,
            batch.advantages,
            batch.old_log_probs,
            self.ppo_eps,
        );
        masked_mean(objective, batch.mask).neg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::tests::{slice, values, TestBackend};

    fn objective(new_log_prob: f32, advantage: f32, old_log_prob: f32) -> f32 {
        let device = &Default::default();
        ppo_objective(
            Tensor::<TestBackend, 1>::from_floats([new_log_prob], device),
            Tensor::<TestBackend, 1>::from_floats([advantage], device),
            Tensor::<TestBackend, 1>::from_floats([old_log_prob], device),
            0.2,
        )
        .into_scalar()
    }

    #[test]
    fn test_ppo_inputs() {
        let slice = slice(
            [[0.0; 4]; 2],
            [[1.0, 2.0, 3.0, 4.0], [0.0; 4]],
            [[-0.1, -0.2, -0.3, -0.4], [-1.0, -2.0, -3.0, -4.0]],
        );
        let batch = Ppo { ppo_eps: 0.2 }
            .derive(slice, values([[1.0; 4], [1.0; 4]]))
            .unwrap();
        assert_eq!(batch.observations.dims(), [2, 3, 3]);
        batch.advantages.into_data().assert_approx_eq(
            &TensorData::from([[0.0f32, 1.0, 2.0], [-1.0, -1.0, -1.0]]),
            5,
        );
        batch.old_log_probs.into_data().assert_approx_eq(
            &TensorData::from([[-0.1f32, -0.2, -0.3], [-1.0, -2.0, -3.0]]),
            5,
        );
    }

    #[test]
    fn test_unit_ratio_objective() {
        for advantage in [-2.0, 0.5, 3.0] {
            let value = objective(-1.3, advantage, -1.3);
            assert!((value - advantage).abs() < 1e-6);
        }
    }

    #[test]
    fn test_large_log_probabilities_stay_finite() {
        // exp(-200) underflows on its own, the difference does not.
        let value = objective(-200.0, 1.0, -200.1);
        assert!((value - 0.1f32.exp()).abs() < 1e-5);
    }

    #[test]
    fn test_objective_is_clipped() {
        // Positive advantage: growing the ratio beyond 1 + eps stops paying off.
        let mut previous = f32::NEG_INFINITY;
        for ratio in [1.0f32, 1.1, 1.2, 1.5, 3.0, 10.0] {
            let value = objective(ratio.ln(), 1.0, 0.0);
            assert!(value >= previous - 1e-6);
            assert!(value <= 1.2 + 1e-5);
            previous = value;
        }
        assert!((objective(10f32.ln(), 1.0, 0.0) - 1.2).abs() < 1e-5);

        // Negative advantage: shrinking the ratio below 1 - eps stops paying off.
        let mut previous = f32::NEG_INFINITY;
        for ratio in [1.0f32, 0.9, 0.8, 0.5, 0.1] {
            let value = objective(ratio.ln(), -1.0, 0.0);
            assert!(value >= previous - 1e-6);
            assert!(value <= -0.8 + 1e-5);
            previous = value;
        }
        // The pessimistic bound keeps the unclipped term when it is worse.
        assert!((objective(3f32.ln(), -1.0, 0.0) + 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_ppo_loss() {
        let device = &Default::default();
        let slice = slice([[0.0; 4]; 2], [[1.0; 4]; 2], [[-0.5; 4]; 2]);
        let ppo = PpoConfig::new().init().unwrap();
        let batch = ppo.derive(slice, values([[0.0; 4]; 2])).unwrap();
        let log_probs = Tensor::<TestBackend, 2>::from_floats([[-0.5; 3]; 2], device);
        let loss = ppo.loss(log_probs, batch).into_scalar();
        assert!((loss + 1.0).abs() < 1e-5);
        assert!(PpoConfig::new().with_ppo_eps(1.5).init().is_err());
    }
}
