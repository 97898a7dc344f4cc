use std::{marker::PhantomData, path::Path};

use burn::{
    lr_scheduler::LrScheduler,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    record::CompactRecorder,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use burn_ac::{Error, Result};
use tracing::debug;

/// Owns one model together with its optimizer and learning rate schedule, and fits it on
/// batches pulled from a stream.
pub struct ModelTrainer<B, M, O, S>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
    S: LrScheduler,
{
    model: M,
    optim: O,
    scheduler: S,
    steps: usize,
    _phantom: PhantomData<B>,
}

impl<B, M, O, S> ModelTrainer<B, M, O, S>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
    S: LrScheduler,
{
    pub fn new(model: M, optim: O, scheduler: S) -> Self {
        Self {
            model,
            optim,
            scheduler,
            steps: 0,
            _phantom: Default::default(),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn set_model(&mut self, model: M) {
        self.model = model;
    }

    /// Optimisation steps taken over the trainer's lifetime.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Takes `n_steps` optimizer steps, one per pulled batch, and returns the mean loss.
    pub fn train_epoch<T, I, F>(&mut self, n_steps: usize, batches: I, mut loss_fn: F) -> Result<f64>
    where
        I: IntoIterator<Item = Result<T>>,
        F: FnMut(&M, T) -> Result<Tensor<B, 1>>,
    {
        let mut batches = batches.into_iter();
        let mut total_loss = 0.0;
        for step in 0..n_steps {
            let batch = batches.next().ok_or(Error::StreamExhausted(step))??;
            let loss = loss_fn(&self.model, batch)?;
            let loss_value = loss.clone().into_scalar().elem::<f64>();

            let grads = GradientsParams::from_grads(loss.backward(), &self.model);
            let lr = self.scheduler.step();
            self.model = self.optim.step(lr, self.model.clone(), grads);

            self.steps += 1;
            total_loss += loss_value;
            debug!(step = self.steps, loss = loss_value, lr, "Optimizer step");
        }
        Ok(match n_steps {
            0 => 0.0,
            n => total_loss / n as f64,
        })
    }

    /// Writes the model parameters with burn's compact recorder.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.model
            .clone()
            .save_file(path.as_ref().to_path_buf(), &CompactRecorder::new())
            .map_err(Error::Recorder)
    }
}
