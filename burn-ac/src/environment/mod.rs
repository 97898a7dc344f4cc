pub type Reward = f32;
pub type Done = bool;

/// Episodic environment with vector observations and a discrete action set.
pub trait Environment {
    fn observation_size(&self) -> usize;

    fn n_actions(&self) -> usize;

    fn reset(&mut self, seed: Option<u64>) -> Vec<f32>;

    fn step(&mut self, action: usize) -> (Vec<f32>, Reward, Done);
}

pub mod corridor;
