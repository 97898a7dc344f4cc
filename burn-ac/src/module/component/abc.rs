use burn::{prelude::*, tensor::activation::log_softmax};

/// State-value function over a batch of observation sequences.
pub trait Value<B: Backend> {
    /// Maps `[batch, time, observation]` to `[batch, time, 1]`.
    fn v_batch(&self, observations: Tensor<B, 3>) -> Tensor<B, 3>;
}

/// Policy with a categorical action distribution.
pub trait Actor<B: Backend> {
    /// Maps `[batch, time, observation]` to unnormalised `[batch, time, action]` logits.
    fn logits_batch(&self, observations: Tensor<B, 3>) -> Tensor<B, 3>;

    /// Log-probability of each taken action, `[batch, time]`.
    fn log_prob_batch(
        &self,
        observations: Tensor<B, 3>,
        actions: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        log_softmax(self.logits_batch(observations), 2)
            .gather(2, actions.unsqueeze_dim(2))
            .squeeze(2)
    }
}
