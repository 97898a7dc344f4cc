use burn::{prelude::*, tensor::ElementConversion};

use crate::{environment::Environment, module::component::Actor};

/// Total reward of one episode under `policy`.
pub fn evaluate_episode<E: Environment, P: FnMut(&[f32]) -> usize>(
    env: &mut E,
    policy: &mut P,
    seed: u64,
) -> f32 {
    let mut episode_reward = 0.0;
    let mut before = env.reset(Some(seed));
    let mut not_done = true;
    while not_done {
        let action = policy(&before);
        let (after, reward, done) = env.step(action);
        episode_reward += reward;
        before = after;
        not_done = !done;
    }
    episode_reward
}

/// Most likely action of the actor for a single observation.
pub fn greedy_action<B: Backend, A: Actor<B>>(
    actor: &A,
    observation: &[f32],
    device: &B::Device,
) -> usize {
    let input = Tensor::<B, 1>::from_floats(observation, device).reshape([1, 1, observation.len()]);
    let action = actor.logits_batch(input).argmax(2).into_scalar();
    action.elem::<i64>() as usize
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;
    use crate::{
        environment::corridor::Corridor, module::nn::actor_critic::ActorCriticNetworkConfig,
    };

    #[test]
    fn test_evaluate_episode() {
        let mut env = Corridor::new(4, 20);
        assert_eq!(evaluate_episode(&mut env, &mut |_| 1, 0), 1.0);
        assert_eq!(evaluate_episode(&mut env, &mut |_| 0, 0), 0.0);
    }

    #[test]
    fn test_greedy_action() {
        let device = &Default::default();
        let actor = ActorCriticNetworkConfig::new(4, 3)
            .init_policy::<NdArray>(device)
            .unwrap();
        let action = greedy_action(&actor, &[0.0, 1.0, 0.0, 0.0], device);
        assert!(action < 3);
    }
}
