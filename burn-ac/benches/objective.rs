use burn::backend::{Autodiff, NdArray};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{Device, Distribution, Int, Tensor};
use burn::prelude::Backend;
use burn_ac::{
    data::TrajectorySlice,
    objective::{awr::AwrConfig, ppo::PpoConfig, PolicyInputDeriver},
};
use criterion::{criterion_group, criterion_main, Criterion};

const BATCH_SIZE: usize = 64;
const SLICE_LENGTH: usize = 32;

fn prepare_slice<B: Backend>(device: &Device<B>) -> (TrajectorySlice<B>, Tensor<B, 2>) {
    let shape = [BATCH_SIZE, SLICE_LENGTH + 1];
    let slice = TrajectorySlice {
        observations: Tensor::random([BATCH_SIZE, SLICE_LENGTH + 1, 8], Distribution::Default, device),
        actions: Tensor::<B, 2, Int>::random(shape, Distribution::Uniform(0.0, 4.0), device),
        rewards: Tensor::random(shape, Distribution::Default, device),
        returns: Tensor::random(shape, Distribution::Default, device),
        log_probs: Tensor::random(shape, Distribution::Uniform(-3.0, 0.0), device),
        mask: Tensor::ones(shape, device),
    };
    let values = Tensor::random(shape, Distribution::Default, device);
    (slice, values)
}

fn ppo_loss_fn<B: AutodiffBackend>(slice: &TrajectorySlice<B>, values: &Tensor<B, 2>) {
    let ppo = PpoConfig::new().init().unwrap();
    let batch = ppo.derive(slice.clone(), values.clone()).unwrap();
    let new_log_probs = batch.old_log_probs.clone().require_grad() * 0.9;
    ppo.loss(new_log_probs, batch).backward();
}

pub fn objective_benchmark(c: &mut Criterion) {
    let device: &Device<NdArray> = &Default::default();
    let (slice, values) = prepare_slice::<NdArray>(device);
    let awr = AwrConfig::new().init().unwrap();
    c.bench_function("awr derive ndarray", |b| {
        b.iter(|| awr.derive(slice.clone(), values.clone()).unwrap())
    });

    type B = Autodiff<NdArray>;
    let device: &Device<B> = &Default::default();
    let (slice, values) = prepare_slice::<B>(device);
    c.bench_function("ppo loss autodiff ndarray", |b| {
        b.iter(|| ppo_loss_fn(&slice, &values))
    });
}

criterion_group!(benches, objective_benchmark);
criterion_main!(benches);
