use burn::{prelude::*, tensor::activation::softmax};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

use super::trajectory::{TimeStep, Trajectory};
use crate::{environment::Environment, module::component::Actor, Error, Result};

/// Samples an action from the actor's categorical distribution over a single observation.
/// Returns the action together with its log-probability.
pub fn sample_action<B: Backend, A: Actor<B>, R: Rng>(
    actor: &A,
    observation: &[f32],
    rng: &mut R,
    device: &B::Device,
) -> Result<(usize, f32)> {
    let input = Tensor::<B, 1>::from_floats(observation, device).reshape([1, 1, observation.len()]);
    let probs = softmax(actor.logits_batch(input), 2)
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| Error::InvalidConfig(format!("{:?}", e)))?;
    let dist = WeightedIndex::new(&probs).map_err(|e| {
        Error::InvalidConfig(format!("policy produced invalid probabilities: {}", e))
    })?;
    let action = dist.sample(rng);
    Ok((action, probs[action].ln()))
}

/// Runs `n_episodes` episodes with the actor's stochastic policy, recording behaviour
/// log-probabilities for every step.
pub fn collect_trajectories<B, E, A, R>(
    env: &mut E,
    actor: &A,
    n_episodes: usize,
    rng: &mut R,
    device: &B::Device,
) -> Result<Vec<Trajectory>>
where
    B: Backend,
    E: Environment,
    A: Actor<B>,
    R: Rng,
{
    let mut result = Vec::with_capacity(n_episodes);
    for _ in 0..n_episodes {
        let mut before = env.reset(Some(rng.next_u64()));
        let mut steps = Vec::new();
        loop {
            let (action, log_prob) = sample_action(actor, &before, rng, device)?;
            let (after, reward, done) = env.step(action);
            steps.push(TimeStep {
                observation: before,
                action: action as i64,
                reward,
                log_prob,
            });
            before = after;
            if done {
                break;
            }
        }
        result.push(Trajectory::new(steps, before));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        environment::corridor::Corridor, module::nn::actor_critic::ActorCriticNetworkConfig,
    };

    #[test]
    fn test_collect_trajectories() {
        let device = &Default::default();
        let mut env = Corridor::new(3, 6);
        let actor = ActorCriticNetworkConfig::new(3, 2)
            .with_hidden_sizes(vec![4])
            .init_policy::<NdArray>(device)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let trajectories = collect_trajectories(&mut env, &actor, 4, &mut rng, device).unwrap();

        assert_eq!(trajectories.len(), 4);
        for trajectory in trajectories.iter() {
            assert!(!trajectory.is_empty() && trajectory.len() <= 6);
            assert_eq!(trajectory.steps[0].observation, vec![1.0, 0.0, 0.0]);
            assert_eq!(trajectory.final_observation.len(), 3);
            for step in trajectory.steps.iter() {
                assert!(step.log_prob <= 0.0 && step.log_prob.is_finite());
                assert!(step.action == 0 || step.action == 1);
            }
            let reached_goal = trajectory.final_observation[2] == 1.0;
            assert_eq!(trajectory.total_reward() == 1.0, reached_goal);
        }
    }
}
