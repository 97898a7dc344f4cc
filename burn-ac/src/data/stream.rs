//! Pull-based batch streams feeding the value and policy trainers.
//!
//! Both streams are infinite and hold their trajectory source by mutable borrow, so each has a
//! single consumer and cannot be restarted; build a new stream to sample again.

use burn::{module::AutodiffModule, prelude::*, tensor::backend::AutodiffBackend};

use super::trajectory::{EpochFilter, SliceRequest, TrajectorySlice, TrajectorySource};
use crate::{
    module::{component::Value, evaluator::ValueEvaluator},
    objective::PolicyInputDeriver,
    Error, Result,
};

/// Regression example for the value model. Targets and mask carry a trailing singleton axis
/// so they match the `[batch, time, 1]` model output.
#[derive(Clone, Debug)]
pub struct ValueBatch<B: Backend> {
    pub observations: Tensor<B, 3>,
    pub returns: Tensor<B, 3>,
    pub mask: Tensor<B, 3>,
}

impl<B: Backend> From<TrajectorySlice<B>> for ValueBatch<B> {
    fn from(slice: TrajectorySlice<B>) -> Self {
        ValueBatch {
            observations: slice.observations,
            returns: slice.returns.unsqueeze_dim(2),
            mask: slice.mask.unsqueeze_dim(2),
        }
    }
}

pub struct ValueBatchStream<'a, B: Backend, S: TrajectorySource<B>> {
    source: &'a mut S,
    request: SliceRequest,
    device: B::Device,
}

impl<'a, B: Backend, S: TrajectorySource<B>> ValueBatchStream<'a, B, S> {
    pub fn new(
        source: &'a mut S,
        batch_size: usize,
        max_slice_length: usize,
        device: B::Device,
    ) -> Self {
        Self {
            source,
            request: SliceRequest {
                batch_size,
                slice_length: max_slice_length,
                epochs: EpochFilter::All,
                include_final_state: false,
                sample_uniformly: false,
            },
            device,
        }
    }
}

impl<B: Backend, S: TrajectorySource<B>> Iterator for ValueBatchStream<'_, B, S> {
    type Item = Result<ValueBatch<B>>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(
            self.source
                .sample(&self.request, &self.device)
                .map(ValueBatch::from),
        )
    }
}

pub struct PolicyBatchStream<'a, B, S, V, D>
where
    B: AutodiffBackend,
    S: TrajectorySource<B>,
    V: AutodiffModule<B>,
    D: PolicyInputDeriver<B>,
{
    source: &'a mut S,
    evaluator: &'a mut ValueEvaluator<B, V>,
    value_model: &'a V,
    deriver: &'a D,
    request: SliceRequest,
    device: B::Device,
}

impl<'a, B, S, V, D> PolicyBatchStream<'a, B, S, V, D>
where
    B: AutodiffBackend,
    S: TrajectorySource<B>,
    V: AutodiffModule<B>,
    V::InnerModule: Value<B::InnerBackend>,
    D: PolicyInputDeriver<B>,
{
    /// Slices are one timestep longer than `max_slice_length` and end with the final state
    /// where they reach it, so every kept timestep has a successor value to bootstrap from.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: &'a mut S,
        evaluator: &'a mut ValueEvaluator<B, V>,
        value_model: &'a V,
        deriver: &'a D,
        batch_size: usize,
        max_slice_length: usize,
        on_policy: bool,
        device: B::Device,
    ) -> Self {
        let epochs = match deriver.on_policy(on_policy) {
            true => EpochFilter::Latest,
            false => EpochFilter::All,
        };
        Self {
            source,
            evaluator,
            value_model,
            deriver,
            request: SliceRequest {
                batch_size,
                slice_length: max_slice_length + 1,
                epochs,
                include_final_state: true,
                sample_uniformly: true,
            },
            device,
        }
    }

    pub fn request(&self) -> &SliceRequest {
        &self.request
    }

    fn produce(&mut self) -> Result<D::Batch> {
        if !self.deriver.is_configured() {
            return Err(Error::MissingPolicyInputs);
        }
        self.evaluator.refresh(self.value_model);
        let slice = self.source.sample(&self.request, &self.device)?;
        let values = self.evaluator.evaluate(
            slice.observations.clone(),
            self.request.batch_size,
            self.request.slice_length,
        )?;
        self.deriver.derive(slice, values)
    }
}

impl<B, S, V, D> Iterator for PolicyBatchStream<'_, B, S, V, D>
where
    B: AutodiffBackend,
    S: TrajectorySource<B>,
    V: AutodiffModule<B>,
    V::InnerModule: Value<B::InnerBackend>,
    D: PolicyInputDeriver<B>,
{
    type Item = Result<D::Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.produce())
    }
}
