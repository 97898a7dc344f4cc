use burn::{
    backend::{Autodiff, NdArray},
    lr_scheduler::constant::ConstantLr,
    module::AutodiffModule,
    optim::AdamConfig,
    tensor::backend::AutodiffBackend,
};
use burn_ac::{
    data::{collect::collect_trajectories, TrajectoryMemory},
    environment::{corridor::Corridor, Environment},
    logging::{evaluate_episode, greedy_action},
    module::nn::actor_critic::ActorCriticNetworkConfig,
    objective::{a2c::AdvantageActorCritic, awr::AwrConfig, ppo::PpoConfig, PolicyInputDeriver},
};
use burn_ac_agents::{actor_critic::ActorCriticConfig, trainer::ModelTrainer};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tqdm::tqdm;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DISCOUNT_FACTOR: f64 = 0.99;
const N_EPOCHS: usize = 50;
const EPISODES_PER_EPOCH: usize = 16;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let algorithm = std::env::args().nth(1).unwrap_or_else(|| "ppo".to_string());
    let output_dir = std::env::args().nth(2);
    info!(%algorithm, "Running actor-critic agent on the corridor environment");
    match algorithm.as_str() {
        "awr" => run(
            AwrConfig::new().with_discount_factor(DISCOUNT_FACTOR).init()?,
            output_dir,
        ),
        "a2c" => run(AdvantageActorCritic, output_dir),
        "ppo" => run(PpoConfig::new().init()?, output_dir),
        other => anyhow::bail!("Unknown algorithm {other:?}, expected one of awr, a2c, ppo"),
    }
}

fn run<D>(deriver: D, output_dir: Option<String>) -> anyhow::Result<()>
where
    D: PolicyInputDeriver<Autodiff<NdArray>>,
{
    type B = Autodiff<NdArray>;
    let device: <B as burn::prelude::Backend>::Device = Default::default();
    let mut rng = StdRng::seed_from_u64(0);
    let mut env = Corridor::new(6, 30);
    let mut eval_env = env.clone();

    let networks = ActorCriticNetworkConfig::new(env.observation_size(), env.n_actions())
        .with_hidden_sizes(vec![32, 32]);
    let value = ModelTrainer::<B, _, _, _>::new(
        networks.init_value::<B>(&device)?,
        AdamConfig::new().init(),
        ConstantLr::from(1e-3),
    );
    let policy = ModelTrainer::<B, _, _, _>::new(
        networks.init_policy::<B>(&device)?,
        AdamConfig::new().init(),
        ConstantLr::from(1e-3),
    );
    let memory = TrajectoryMemory::new(4, DISCOUNT_FACTOR, StdRng::from_seed(rng.gen()));

    let mut config = ActorCriticConfig::new(8)
        .with_value_batch_size(16)
        .with_value_train_steps_per_epoch(20)
        .with_policy_batch_size(16)
        .with_policy_train_steps_per_epoch(20)
        .with_n_shared_layers(2);
    config.output_dir = output_dir;
    let mut agent = config.init(memory, deriver, value, policy, device.clone())?;

    let mut evaluation_statistics = Vec::new();
    for _ in tqdm(0..N_EPOCHS) {
        let actor = agent.policy_model().valid();
        let trajectories = collect_trajectories::<<B as AutodiffBackend>::InnerBackend, _, _, _>(
            &mut env,
            &actor,
            EPISODES_PER_EPOCH,
            &mut rng,
            &device,
        )?;
        agent.source_mut().push_epoch(trajectories)?;

        let summary = agent.train_epoch()?;
        agent.checkpoint()?;

        let episode_reward = evaluate_episode(
            &mut eval_env,
            &mut |o: &[f32]| greedy_action(&actor, o, &device),
            summary.epoch as u64,
        );
        evaluation_statistics.push(episode_reward);
    }

    info!(?evaluation_statistics, "Training finished");
    Ok(())
}
