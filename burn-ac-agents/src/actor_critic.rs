use std::path::PathBuf;

use burn::{
    config::Config, lr_scheduler::LrScheduler, module::AutodiffModule, optim::Optimizer,
    tensor::backend::AutodiffBackend,
};
use burn_ac::{
    data::{
        stream::{PolicyBatchStream, ValueBatch, ValueBatchStream},
        TrajectorySource,
    },
    module::{
        component::{Actor, Value},
        evaluator::{check_value_shape, ValueEvaluator},
        nn::shared_prefix::splice_prefix,
    },
    objective::{value::masked_l2_loss, PolicyBatch, PolicyInputDeriver},
    Error,
};
use tracing::{info, instrument};

use crate::trainer::ModelTrainer;

#[derive(Config)]
pub struct ActorCriticConfig {
    /// Length `L` of value training slices. Policy slices are `L + 1` long.
    pub max_slice_length: usize,
    #[config(default = 64)]
    pub value_batch_size: usize,
    #[config(default = 500)]
    pub value_train_steps_per_epoch: usize,
    #[config(default = 64)]
    pub policy_batch_size: usize,
    #[config(default = 100)]
    pub policy_train_steps_per_epoch: usize,
    /// Leading layers (weight and bias of each) kept in sync between the value and policy
    /// models.
    #[config(default = 0)]
    pub n_shared_layers: usize,
    /// Restrict policy batches to the most recent collection epoch.
    #[config(default = true)]
    pub on_policy: bool,
    pub output_dir: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub value_loss: f64,
    pub policy_loss: f64,
}

/// Alternates value regression and policy optimisation, one epoch of each per
/// [`ActorCritic::train_epoch`] call.
pub struct ActorCritic<B, T, D, V, P, VO, PO, VS, PS>
where
    B: AutodiffBackend,
    T: TrajectorySource<B>,
    D: PolicyInputDeriver<B>,
    V: AutodiffModule<B> + Value<B>,
    P: AutodiffModule<B> + Actor<B>,
    VO: Optimizer<V, B>,
    PO: Optimizer<P, B>,
    VS: LrScheduler,
    PS: LrScheduler,
{
    config: ActorCriticConfig,
    source: T,
    deriver: D,
    value: ModelTrainer<B, V, VO, VS>,
    policy: ModelTrainer<B, P, PO, PS>,
    evaluator: ValueEvaluator<B, V>,
    epoch: usize,
    device: B::Device,
}

impl ActorCriticConfig {
    pub fn init<B, T, D, V, P, VO, PO, VS, PS>(
        &self,
        source: T,
        deriver: D,
        value: ModelTrainer<B, V, VO, VS>,
        policy: ModelTrainer<B, P, PO, PS>,
        device: B::Device,
    ) -> burn_ac::Result<ActorCritic<B, T, D, V, P, VO, PO, VS, PS>>
    where
        B: AutodiffBackend,
        T: TrajectorySource<B>,
        D: PolicyInputDeriver<B>,
        V: AutodiffModule<B> + Value<B>,
        V::InnerModule: Value<B::InnerBackend>,
        P: AutodiffModule<B> + Actor<B>,
        VO: Optimizer<V, B>,
        PO: Optimizer<P, B>,
        VS: LrScheduler,
        PS: LrScheduler,
    {
        self.validate()?;
        let source_discount = source.discount_factor();
        if let Some(discount) = deriver.discount_factor() {
            if (discount - source_discount).abs() > f64::EPSILON {
                return Err(Error::InvalidConfig(format!(
                    "policy objective discounts with {} but returns are discounted with {}",
                    discount, source_discount
                )));
            }
        }
        Ok(ActorCritic {
            config: self.clone(),
            source,
            deriver,
            evaluator: ValueEvaluator::new(value.model()),
            value,
            policy,
            epoch: 0,
            device,
        })
    }

    fn validate(&self) -> burn_ac::Result<()> {
        let sizes = [
            ("max_slice_length", self.max_slice_length),
            ("value_batch_size", self.value_batch_size),
            ("policy_batch_size", self.policy_batch_size),
        ];
        for (name, size) in sizes {
            if size == 0 {
                return Err(Error::InvalidConfig(format!("{} should be positive", name)));
            }
        }
        Ok(())
    }
}

impl<B, T, D, V, P, VO, PO, VS, PS> ActorCritic<B, T, D, V, P, VO, PO, VS, PS>
where
    B: AutodiffBackend,
    T: TrajectorySource<B>,
    D: PolicyInputDeriver<B>,
    V: AutodiffModule<B> + Value<B>,
    V::InnerModule: Value<B::InnerBackend>,
    P: AutodiffModule<B> + Actor<B>,
    VO: Optimizer<V, B>,
    PO: Optimizer<P, B>,
    VS: LrScheduler,
    PS: LrScheduler,
{
    /// Runs one value epoch, then one policy epoch against the refreshed value estimates.
    /// With shared layers the prefix is handed to the policy before its epoch and back to the
    /// value model after it.
    #[instrument(skip(self), fields(epoch = self.epoch))]
    pub fn train_epoch(&mut self) -> burn_ac::Result<EpochSummary> {
        let config = &self.config;

        let value_batches = ValueBatchStream::new(
            &mut self.source,
            config.value_batch_size,
            config.max_slice_length,
            self.device.clone(),
        );
        let value_loss = self.value.train_epoch(
            config.value_train_steps_per_epoch,
            value_batches,
            |model, batch: ValueBatch<B>| {
                let predictions = model.v_batch(batch.observations);
                check_value_shape(predictions.dims(), batch.returns.dims())?;
                Ok(masked_l2_loss(predictions, batch.returns, batch.mask))
            },
        )?;

        if config.n_shared_layers > 0 {
            let policy = splice_prefix(
                self.value.model(),
                self.policy.model().clone(),
                config.n_shared_layers,
            )?;
            self.policy.set_model(policy);
        }

        let policy_batches = PolicyBatchStream::new(
            &mut self.source,
            &mut self.evaluator,
            self.value.model(),
            &self.deriver,
            config.policy_batch_size,
            config.max_slice_length,
            config.on_policy,
            self.device.clone(),
        );
        let deriver = &self.deriver;
        let policy_loss = self.policy.train_epoch(
            config.policy_train_steps_per_epoch,
            policy_batches,
            |model, batch| {
                let log_probs = model.log_prob_batch(batch.observations(), batch.actions());
                Ok(deriver.loss(log_probs, batch))
            },
        )?;

        if config.n_shared_layers > 0 {
            let value = splice_prefix(
                self.policy.model(),
                self.value.model().clone(),
                config.n_shared_layers,
            )?;
            self.value.set_model(value);
        }

        let summary = EpochSummary {
            epoch: self.epoch,
            value_loss,
            policy_loss,
        };
        info!(value_loss, policy_loss, "Finished actor-critic epoch");
        self.epoch += 1;
        Ok(summary)
    }

    /// Saves the configuration and both models under `output_dir`, if one is configured.
    pub fn checkpoint(&self) -> burn_ac::Result<()> {
        let Some(output_dir) = &self.config.output_dir else {
            return Ok(());
        };
        let output_dir = PathBuf::from(output_dir);
        let name = format!("epoch-{}", self.epoch);
        std::fs::create_dir_all(output_dir.join("value"))?;
        std::fs::create_dir_all(output_dir.join("policy"))?;
        self.config.save(output_dir.join("config.json"))?;
        self.value.save(output_dir.join("value").join(&name))?;
        self.policy.save(output_dir.join("policy").join(&name))?;
        info!(path = %output_dir.display(), epoch = self.epoch, "Saved checkpoint");
        Ok(())
    }

    pub fn config(&self) -> &ActorCriticConfig {
        &self.config
    }

    /// Completed epochs.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn source(&self) -> &T {
        &self.source
    }

    /// Access to the trajectory source between epochs, e.g. to store new trajectories.
    pub fn source_mut(&mut self) -> &mut T {
        &mut self.source
    }

    pub fn value_model(&self) -> &V {
        self.value.model()
    }

    pub fn policy_model(&self) -> &P {
        self.policy.model()
    }
}
