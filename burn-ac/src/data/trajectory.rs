use burn::prelude::*;

use crate::Result;

/// One transition recorded while acting in an environment.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeStep {
    pub observation: Vec<f32>,
    pub action: i64,
    pub reward: f32,
    /// Log-probability of `action` under the policy that collected it.
    pub log_prob: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub steps: Vec<TimeStep>,
    /// Observation reached after the last recorded action.
    pub final_observation: Vec<f32>,
}

impl Trajectory {
    pub fn new(steps: Vec<TimeStep>, final_observation: Vec<f32>) -> Self {
        Self {
            steps,
            final_observation,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn total_reward(&self) -> f32 {
        self.steps.iter().map(|s| s.reward).sum()
    }

    /// Discounted reward-to-go for every step. The final state has return zero.
    pub fn returns(&self, discount_factor: f64) -> Vec<f32> {
        let mut returns = vec![0.0; self.steps.len()];
        let mut running = 0.0f64;
        for (i, step) in self.steps.iter().enumerate().rev() {
            running = step.reward as f64 + discount_factor * running;
            returns[i] = running as f32;
        }
        returns
    }
}

/// Which collection epochs a sample may draw trajectories from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpochFilter {
    /// Only the most recently collected epoch.
    Latest,
    All,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SliceRequest {
    pub batch_size: usize,
    pub slice_length: usize,
    pub epochs: EpochFilter,
    pub include_final_state: bool,
    /// Pick every trajectory with equal probability instead of proportionally to its length.
    pub sample_uniformly: bool,
}

/// A batch of equally long trajectory windows, laid out as `[batch, time, ...]`.
#[derive(Clone, Debug)]
pub struct TrajectorySlice<B: Backend> {
    pub observations: Tensor<B, 3>,
    pub actions: Tensor<B, 2, Int>,
    pub rewards: Tensor<B, 2>,
    pub returns: Tensor<B, 2>,
    pub log_probs: Tensor<B, 2>,
    /// 1.0 on real transitions, 0.0 on padding and on the action-less final state.
    pub mask: Tensor<B, 2>,
}

impl<B: Backend> TrajectorySlice<B> {
    pub fn batch_size(&self) -> usize {
        self.mask.dims()[0]
    }

    pub fn slice_length(&self) -> usize {
        self.mask.dims()[1]
    }

    /// Drops the trailing timestep of every field.
    pub fn truncate_last(self) -> Self {
        let length = self.slice_length().saturating_sub(1);
        Self {
            observations: self.observations.narrow(1, 0, length),
            actions: self.actions.narrow(1, 0, length),
            rewards: self.rewards.narrow(1, 0, length),
            returns: self.returns.narrow(1, 0, length),
            log_probs: self.log_probs.narrow(1, 0, length),
            mask: self.mask.narrow(1, 0, length),
        }
    }
}

pub trait TrajectorySource<B: Backend> {
    fn sample(&mut self, request: &SliceRequest, device: &B::Device)
        -> Result<TrajectorySlice<B>>;

    /// Discount factor the sampled returns were computed with.
    fn discount_factor(&self) -> f64;
}
