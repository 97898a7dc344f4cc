//! Training targets for the value and policy models.
//!
//! A [`PolicyInputDeriver`] turns a trajectory slice that is one timestep longer than the
//! training window, together with the value estimates for every timestep of it, into the
//! batch the policy model is trained on, and owns the loss computed on that batch.

use std::convert::Infallible;

use burn::prelude::*;

use crate::{data::trajectory::TrajectorySlice, Error, Result};

pub mod a2c;
pub mod awr;
pub mod ppo;
pub mod temporal_difference;
pub mod value;

pub trait PolicyBatch<B: Backend> {
    fn observations(&self) -> Tensor<B, 3>;
    fn actions(&self) -> Tensor<B, 2, Int>;
    fn mask(&self) -> Tensor<B, 2>;
}

pub trait PolicyInputDeriver<B: Backend> {
    type Batch: PolicyBatch<B>;

    /// Builds a policy batch of length `L` from a slice and values of length `L + 1`.
    fn derive(&self, slice: TrajectorySlice<B>, values: Tensor<B, 2>) -> Result<Self::Batch>;

    /// Loss given the policy's log-probabilities of the batch actions, shaped `[batch, L]`.
    fn loss(&self, log_probs: Tensor<B, 2>, batch: Self::Batch) -> Tensor<B, 1>;

    /// False for placeholders that cannot derive anything, so callers can fail before
    /// sampling.
    fn is_configured(&self) -> bool {
        true
    }

    /// Whether policy batches are restricted to the latest collection epoch.
    fn on_policy(&self, configured: bool) -> bool {
        configured
    }

    /// Discount factor the deriver bootstraps with, if it uses one. It has to match the
    /// discount factor of the trajectory source's returns.
    fn discount_factor(&self) -> Option<f64> {
        None
    }
}

/// Stand-in for trainers constructed without an algorithm. Every derivation fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct MissingDeriver;

impl<B: Backend> PolicyBatch<B> for Infallible {
    fn observations(&self) -> Tensor<B, 3> {
        match *self {}
    }

    fn actions(&self) -> Tensor<B, 2, Int> {
        match *self {}
    }

    fn mask(&self) -> Tensor<B, 2> {
        match *self {}
    }
}

impl<B: Backend> PolicyInputDeriver<B> for MissingDeriver {
    type Batch = Infallible;

    fn derive(&self, _slice: TrajectorySlice<B>, _values: Tensor<B, 2>) -> Result<Infallible> {
        Err(Error::MissingPolicyInputs)
    }

    fn loss(&self, _log_probs: Tensor<B, 2>, batch: Infallible) -> Tensor<B, 1> {
        match batch {}
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Mean of `values` over the entries where `mask` is set.
pub fn masked_mean<B: Backend, const D: usize>(
    values: Tensor<B, D>,
    mask: Tensor<B, D>,
) -> Tensor<B, 1> {
    (values * mask.clone()).sum() / mask.sum().clamp_min(1.0)
}

/// Returns the training window length `L` for a slice of `L + 1` timesteps.
pub(crate) fn window_length<B: Backend>(
    slice: &TrajectorySlice<B>,
    values: &Tensor<B, 2>,
) -> Result<usize> {
    let expected = [slice.batch_size(), slice.slice_length()];
    if values.dims() != expected {
        return Err(Error::ValueShape {
            expected: expected.to_vec(),
            actual: values.dims().to_vec(),
        });
    }
    match expected[1] {
        0 | 1 => Err(Error::InvalidConfig(format!(
            "policy slices need at least two timesteps, got {}",
            expected[1]
        ))),
        n => Ok(n - 1),
    }
}
