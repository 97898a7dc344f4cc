pub mod actor_critic;
pub mod multi_layer_perceptron;
pub mod shared_prefix;
