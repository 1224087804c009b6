//! Learning rate schedulers

use super::Optimizer;

/// Learning rate scheduler trait
pub trait LRScheduler {
    /// Get the current learning rate
    fn get_lr(&self) -> f32;

    /// Step the scheduler (called once per training step)
    fn step(&mut self);
}

/// Exponential staircase decay.
///
/// Formula: `lr_t = lr_0 * decay_rate ^ floor(t / decay_steps)`
///
/// The rate is held constant within each `decay_steps`-sized window and
/// drops by `decay_rate` at the window boundary, driven by the shared
/// global step.
pub struct ExponentialDecayLR {
    initial_lr: f32,
    decay_steps: u64,
    decay_rate: f32,
    current_step: u64,
}

impl ExponentialDecayLR {
    /// Create a new exponential decay scheduler
    #[must_use]
    pub fn new(initial_lr: f32, decay_steps: u64, decay_rate: f32) -> Self {
        assert!(decay_steps > 0, "decay_steps must be positive");
        Self {
            initial_lr,
            decay_steps,
            decay_rate,
            current_step: 0,
        }
    }

    /// Jump the scheduler to an absolute step (checkpoint resume)
    pub fn set_step(&mut self, step: u64) {
        self.current_step = step;
    }

    /// Apply the current learning rate to an optimizer
    pub fn apply<O: Optimizer + ?Sized>(&self, optimizer: &mut O) {
        optimizer.set_lr(self.get_lr());
    }
}

impl LRScheduler for ExponentialDecayLR {
    fn get_lr(&self) -> f32 {
        let exponent = (self.current_step / self.decay_steps) as i32;
        self.initial_lr * self.decay_rate.powi(exponent)
    }

    fn step(&mut self) {
        self.current_step += 1;
    }
}
