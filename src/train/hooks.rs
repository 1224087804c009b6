//! Alternation schedule for the two optimization sides

use crate::error::{Result, StackGanError};

/// How many optimizer sub-steps each side takes per global step.
///
/// The default 1/1 alternation is the standard GAN schedule; Wasserstein
/// training typically raises the discriminator count to keep the critic
/// ahead of the generator. Counts are private and validated at
/// construction, so a schedule that skips a side cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainSteps {
    generator_train_steps: usize,
    discriminator_train_steps: usize,
}

impl Default for TrainSteps {
    fn default() -> Self {
        Self {
            generator_train_steps: 1,
            discriminator_train_steps: 1,
        }
    }
}

impl TrainSteps {
    /// Create a schedule, rejecting zero sub-step counts (a side that
    /// never trains deadlocks the adversarial game).
    pub fn new(generator_train_steps: usize, discriminator_train_steps: usize) -> Result<Self> {
        if generator_train_steps == 0 || discriminator_train_steps == 0 {
            return Err(StackGanError::InvalidConfiguration(format!(
                "train steps must be positive, got generator={generator_train_steps} \
                 discriminator={discriminator_train_steps}"
            )));
        }
        Ok(Self {
            generator_train_steps,
            discriminator_train_steps,
        })
    }

    /// Generator sub-steps per global step
    #[must_use]
    pub fn generator_train_steps(&self) -> usize {
        self.generator_train_steps
    }

    /// Per-discriminator sub-steps per global step
    #[must_use]
    pub fn discriminator_train_steps(&self) -> usize {
        self.discriminator_train_steps
    }

    /// Total op executions per global step for a given stack depth
    #[must_use]
    pub fn ops_per_step(&self, stack_depth: usize) -> usize {
        stack_depth * self.discriminator_train_steps + self.generator_train_steps
    }
}
