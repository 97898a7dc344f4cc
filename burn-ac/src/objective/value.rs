use burn::prelude::*;

use super::masked_mean;

/// Squared error between value predictions and regression targets, averaged over unmasked
/// timesteps. All three tensors are shaped `[batch, time, 1]`.
pub fn masked_l2_loss<B: Backend>(
    predictions: Tensor<B, 3>,
    targets: Tensor<B, 3>,
    mask: Tensor<B, 3>,
) -> Tensor<B, 1> {
    masked_mean((predictions - targets).powf_scalar(2.0), mask)
}
