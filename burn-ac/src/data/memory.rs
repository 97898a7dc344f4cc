use burn::prelude::*;
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};
use ringbuffer::{AllocRingBuffer, RingBuffer};
use tracing::debug;

use super::trajectory::{EpochFilter, SliceRequest, Trajectory, TrajectorySlice, TrajectorySource};
use crate::{Error, Result};

/// Keeps the trajectories of the last `max_epochs` collection epochs.
pub struct TrajectoryMemory<R: Rng> {
    rng: R,
    epochs: AllocRingBuffer<Vec<Trajectory>>,
    discount_factor: f64,
    observation_size: Option<usize>,
}

impl<R: Rng> TrajectoryMemory<R> {
    pub fn new(max_epochs: usize, discount_factor: f64, rng: R) -> TrajectoryMemory<R> {
        TrajectoryMemory {
            rng,
            epochs: AllocRingBuffer::new(max_epochs),
            discount_factor,
            observation_size: None,
        }
    }

    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    pub fn n_epochs(&self) -> usize {
        self.epochs.len()
    }

    pub fn n_trajectories(&self) -> usize {
        self.epochs.iter().map(|e| e.len()).sum()
    }

    /// Stores the trajectories of a new collection epoch, evicting the oldest one when full.
    pub fn push_epoch(&mut self, trajectories: Vec<Trajectory>) -> Result<()> {
        for trajectory in trajectories.iter() {
            let observations = trajectory
                .steps
                .iter()
                .map(|s| &s.observation)
                .chain(std::iter::once(&trajectory.final_observation));
            for observation in observations {
                let expected = *self.observation_size.get_or_insert(observation.len());
                if observation.len() != expected {
                    return Err(Error::ObservationSize {
                        expected,
                        actual: observation.len(),
                    });
                }
            }
        }
        debug!(
            n_trajectories = trajectories.len(),
            epoch = self.epochs.len(),
            "Stored collection epoch"
        );
        self.epochs.push(trajectories);
        Ok(())
    }
}

fn n_timesteps(trajectory: &Trajectory, include_final_state: bool) -> usize {
    trajectory.len() + usize::from(include_final_state)
}

fn candidates(
    epochs: &AllocRingBuffer<Vec<Trajectory>>,
    filter: EpochFilter,
    include_final_state: bool,
) -> Vec<&Trajectory> {
    let usable = |t: &&Trajectory| include_final_state || !t.is_empty();
    match filter {
        EpochFilter::Latest => epochs
            .iter()
            .last()
            .map(|e| e.iter().filter(usable).collect())
            .unwrap_or_default(),
        EpochFilter::All => epochs.iter().flatten().filter(usable).collect(),
    }
}

impl<B: Backend, R: Rng> TrajectorySource<B> for TrajectoryMemory<R> {
    fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    fn sample(
        &mut self,
        request: &SliceRequest,
        device: &B::Device,
    ) -> Result<TrajectorySlice<B>> {
        let candidates = candidates(&self.epochs, request.epochs, request.include_final_state);
        let observation_size = self.observation_size.ok_or(Error::EmptyMemory)?;
        if candidates.is_empty() {
            return Err(Error::EmptyMemory);
        }
        let weights: Vec<usize> = match request.sample_uniformly {
            true => vec![1; candidates.len()],
            false => candidates
                .iter()
                .map(|t| n_timesteps(t, request.include_final_state))
                .collect(),
        };
        let chooser = WeightedIndex::new(&weights).map_err(|_| Error::EmptyMemory)?;

        let (batch, length) = (request.batch_size, request.slice_length);
        let mut observations = vec![0.0f32; batch * length * observation_size];
        let mut actions = vec![0i64; batch * length];
        let mut rewards = vec![0.0f32; batch * length];
        let mut returns = vec![0.0f32; batch * length];
        let mut log_probs = vec![0.0f32; batch * length];
        let mut mask = vec![0.0f32; batch * length];

        for row in 0..batch {
            let trajectory = candidates[chooser.sample(&mut self.rng)];
            let n = n_timesteps(trajectory, request.include_final_state);
            let start = match n > length {
                true => self.rng.gen_range(0..=n - length),
                false => 0,
            };
            let trajectory_returns = trajectory.returns(self.discount_factor);
            for (offset, t) in (start..n.min(start + length)).enumerate() {
                let i = row * length + offset;
                let observation = match trajectory.steps.get(t) {
                    Some(step) => {
                        actions[i] = step.action;
                        rewards[i] = step.reward;
                        returns[i] = trajectory_returns[t];
                        log_probs[i] = step.log_prob;
                        mask[i] = 1.0;
                        &step.observation
                    }
                    None => &trajectory.final_observation,
                };
                observations[i * observation_size..(i + 1) * observation_size]
                    .copy_from_slice(observation);
            }
        }

        Ok(TrajectorySlice {
            observations: Tensor::from_data(
                TensorData::new(observations, [batch, length, observation_size]),
                device,
            ),
            actions: Tensor::from_data(TensorData::new(actions, [batch, length]), device),
            rewards: Tensor::from_data(TensorData::new(rewards, [batch, length]), device),
            returns: Tensor::from_data(TensorData::new(returns, [batch, length]), device),
            log_probs: Tensor::from_data(TensorData::new(log_probs, [batch, length]), device),
            mask: Tensor::from_data(TensorData::new(mask, [batch, length]), device),
        })
    }
}
