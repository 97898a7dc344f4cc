//! Advantage weighted regression.
//!
//! The policy regresses onto the recorded actions, weighted by the exponentiated one-step
//! temporal difference advantage. Weights are clipped at `w_max` since the exponential
//! grows without bound for large advantages.

use burn::prelude::*;

use super::{
    masked_mean, temporal_difference::temporal_difference, window_length, PolicyBatch,
    PolicyInputDeriver,
};
use crate::{data::trajectory::TrajectorySlice, Error};

#[derive(Config)]
pub struct AwrConfig {
    /// Temperature of the exponential advantage weights.
    #[config(default = 1.0)]
    pub beta: f64,
    #[config(default = 20.0)]
    pub w_max: f64,
    #[config(default = 0.99)]
    pub discount_factor: f64,
}

impl AwrConfig {
    pub fn init(&self) -> crate::Result<Awr> {
        self.validate()?;
        Ok(Awr {
            beta: self.beta,
            w_max: self.w_max,
            discount_factor: self.discount_factor,
        })
    }

    fn validate(&self) -> crate::Result<()> {
        if !(self.beta > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "AWR beta should be positive, got {}",
                self.beta
            )));
        }
        if !(self.w_max > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "AWR w_max should be positive, got {}",
                self.w_max
            )));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(Error::InvalidConfig(format!(
                "The discount factor should be in the interval [0,1]. got {}",
                self.discount_factor
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Awr {
    beta: f64,
    w_max: f64,
    discount_factor: f64,
}

#[derive(Clone, Debug)]
pub struct AwrBatch<B: Backend> {
    pub observations: Tensor<B, 3>,
    pub actions: Tensor<B, 2, Int>,
    pub weights: Tensor<B, 2>,
    pub mask: Tensor<B, 2>,
}

impl<B: Backend> PolicyBatch<B> for AwrBatch<B> {
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

impl Awr {
    pub fn weights<B: Backend>(&self, td_advantage: Tensor<B, 2>) -> Tensor<B, 2> {
        (td_advantage / self.beta).exp().clamp_max(self.w_max)
    }
}

impl<B: Backend> PolicyInputDeriver<B> for Awr {
    type Batch = AwrBatch<B>;

    fn derive(
        &self,
        slice: TrajectorySlice<B>,
        values: Tensor<B, 2>,
    ) -> crate::Result<AwrBatch<B>> {
        let length = window_length(&slice, &values)?;
        let next_values = values.clone().narrow(1, 1, length);
        let values = values.narrow(1, 0, length);
        let slice = slice.truncate_last();
        let td_advantage =
            temporal_difference(slice.rewards, values, next_values, self.discount_factor);
        Ok(AwrBatch {
            observations: slice.observations,
            actions: slice.actions,
            weights: self.weights(td_advantage),
            mask: slice.mask,
        })
    }

    fn loss(&self, log_probs: Tensor<B, 2>, batch: AwrBatch<B>) -> Tensor<B, 1> {
        masked_mean(log_probs * batch.weights, batch.mask).neg()
    }

    /// Advantage weighted regression reuses every retained trajectory.
    fn on_policy(&self, _configured: bool) -> bool {
        false
    }

    fn discount_factor(&self) -> Option<f64> {
        Some(self.discount_factor)
    }
}
