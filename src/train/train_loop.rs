//! Single-threaded training loop
//!
//! The loop owns the alternation: each iteration asks the caller to
//! recompute forward passes and losses (repopulating gradients), records
//! the fresh losses on the train ops, and executes one global step. There
//! is no background work; every op runs to completion before the next
//! begins.

use tracing::info;

use crate::config::StackGanConfig;
use crate::error::Result;
use crate::loss::{DiscriminatorLoss, GeneratorLoss};
use crate::optim::ExponentialDecayLR;

use super::metrics::StackGanStats;
use super::ops::GanTrainOps;
use super::TrainSteps;

const LOG_EVERY: u64 = 1000;

/// Losses computed by one refresh of the forward passes
#[derive(Debug, Clone)]
pub struct StepLosses {
    /// The single combined generator loss
    pub generator: GeneratorLoss,
    /// One discriminator loss per stage, in stage order
    pub discriminators: Vec<DiscriminatorLoss>,
}

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainSummary {
    /// Global steps executed
    pub steps_run: u64,
    /// Generator loss at the final step
    pub final_generator_loss: f32,
    /// Per-stage discriminator losses at the final step
    pub final_discriminator_losses: Vec<f32>,
    /// Rolling loss history
    pub stats: StackGanStats,
}

/// Run the training loop to `config.max_steps`.
///
/// `refresh` is called once per global step with the current step number;
/// it must rerun the forward passes in train mode and return the resulting
/// losses. An error from `refresh` stops training and propagates.
pub fn gan_train<F>(
    config: &StackGanConfig,
    ops: &mut GanTrainOps,
    steps: &TrainSteps,
    mut refresh: F,
) -> Result<TrainSummary>
where
    F: FnMut(u64) -> Result<StepLosses>,
{
    config.validate()?;

    // Decay applies to the generator's learning rate only; the
    // discriminators keep their configured rate for the whole run.
    let mut generator_decay = config.do_lr_decay.then(|| {
        ExponentialDecayLR::new(config.generator_lr, config.decay_steps, config.decay_rate)
    });

    let mut stats = StackGanStats::new(ops.stack_depth());

    info!(
        max_steps = config.max_steps,
        stack_depth = ops.stack_depth(),
        log_dir = %config.log_dir.display(),
        "starting stack training"
    );

    while ops.global_step() < config.max_steps {
        let step = ops.global_step();

        if let Some(decay) = &mut generator_decay {
            decay.set_step(step);
            decay.apply(ops.generator_mut().optimizer_mut());
        }

        let losses = refresh(step)?;
        ops.set_losses(losses.generator, &losses.discriminators)?;
        ops.run_step(steps);

        stats.record_step(ops.generator_loss(), &ops.discriminator_losses());

        if step % LOG_EVERY == 0 {
            info!(
                step,
                generator_loss = f64::from(ops.generator_loss()),
                avg_generator_loss = f64::from(stats.avg_generator_loss()),
                "training progress"
            );
            for (stage, loss) in ops.discriminator_losses().iter().enumerate() {
                info!(step, stage, discriminator_loss = f64::from(*loss), "stage progress");
            }
        }
    }

    info!(steps_run = ops.global_step(), "training finished");

    Ok(TrainSummary {
        steps_run: ops.global_step(),
        final_generator_loss: ops.generator_loss(),
        final_discriminator_losses: ops.discriminator_losses(),
        stats,
    })
}
