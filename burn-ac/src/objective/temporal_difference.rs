use burn::prelude::*;

/// One-step temporal difference `reward + γ·V(s') − V(s)`.
pub fn temporal_difference<B: Backend, const D: usize>(
    reward: Tensor<B, D>,
    value: Tensor<B, D>,
    next_value: Tensor<B, D>,
    discount_factor: f64,
) -> Tensor<B, D> {
    reward + next_value * discount_factor - value
}
