use super::{Done, Environment, Reward};

/// A line of cells. The agent starts in the first cell, moves left (action 0) or right
/// (action 1) and is rewarded on reaching the last cell, which ends the episode. Episodes
/// are also cut after `max_steps`.
#[derive(Clone, Debug)]
pub struct Corridor {
    length: usize,
    max_steps: usize,
    position: usize,
    steps: usize,
}

impl Corridor {
    pub fn new(length: usize, max_steps: usize) -> Self {
        Self {
            length: length.max(2),
            max_steps,
            position: 0,
            steps: 0,
        }
    }

    fn observation(&self) -> Vec<f32> {
        let mut observation = vec![0.0; self.length];
        observation[self.position] = 1.0;
        observation
    }
}

impl Environment for Corridor {
    fn observation_size(&self) -> usize {
        self.length
    }

    fn n_actions(&self) -> usize {
        2
    }

    fn reset(&mut self, _seed: Option<u64>) -> Vec<f32> {
        self.position = 0;
        self.steps = 0;
        self.observation()
    }

    fn step(&mut self, action: usize) -> (Vec<f32>, Reward, Done) {
        self.steps += 1;
        self.position = match action {
            0 => self.position.saturating_sub(1),
            _ => (self.position + 1).min(self.length - 1),
        };
        let goal = self.position == self.length - 1;
        let reward = if goal { 1.0 } else { 0.0 };
        (self.observation(), reward, goal || self.steps >= self.max_steps)
    }
}
