//! Stack GAN configuration
//!
//! One explicit configuration struct, constructed once and passed down to
//! every component. Defaults follow a 3-stage 32/64/128 CIFAR-style setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StackGanError};

/// Configuration for building and training a GAN stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackGanConfig {
    /// Number of (generator, discriminator) stages
    pub stack_depth: usize,
    /// Number of samples per batch
    pub batch_size: usize,
    /// Dimension of the noise input to the first generator stage
    pub noise_dim: usize,
    /// Dimension of the raw conditioning signal (e.g. text embedding)
    pub embedding_dim: usize,
    /// Dimension of the augmented conditioning vector
    pub conditioning_dim: usize,
    /// Spatial resolution of the first stage's output; each later stage
    /// doubles it
    pub base_resolution: usize,
    /// Generator learning rate
    pub generator_lr: f32,
    /// Discriminator learning rate
    pub discriminator_lr: f32,
    /// Whether to exponentially decay the generator learning rate
    pub do_lr_decay: bool,
    /// Decay the learning rate after this many steps
    pub decay_steps: u64,
    /// Fraction of the learning rate retained per decay
    pub decay_rate: f32,
    /// Weight of the cross-stage color-consistency loss
    pub color_loss_weight: f32,
    /// Weight of the Wasserstein gradient penalty
    pub gradient_penalty_weight: f32,
    /// Whether networks should apply batch normalization
    pub apply_batch_norm: bool,
    /// Maximum number of gradient steps
    pub max_steps: u64,
    /// Directory for training logs
    pub log_dir: PathBuf,
}

impl Default for StackGanConfig {
    fn default() -> Self {
        Self {
            stack_depth: 3,
            batch_size: 8,
            noise_dim: 64,
            embedding_dim: 128,
            conditioning_dim: 64,
            base_resolution: 32,
            generator_lr: 0.0001,
            discriminator_lr: 0.0001,
            do_lr_decay: true,
            decay_steps: 100_000,
            decay_rate: 0.9,
            color_loss_weight: 50.0,
            gradient_penalty_weight: 1.0,
            apply_batch_norm: false,
            max_steps: 1_000_000,
            log_dir: PathBuf::from("/tmp/stackgan"),
        }
    }
}

impl StackGanConfig {
    /// Check the configuration for values that would make a stack build
    /// fail later.
    pub fn validate(&self) -> Result<()> {
        if self.stack_depth < 1 {
            return Err(StackGanError::InvalidConfiguration(
                "stack_depth must be at least 1".to_string(),
            ));
        }
        if self.batch_size < 1 {
            return Err(StackGanError::InvalidConfiguration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.noise_dim < 1 || self.embedding_dim < 1 || self.conditioning_dim < 1 {
            return Err(StackGanError::InvalidConfiguration(
                "noise_dim, embedding_dim and conditioning_dim must be at least 1".to_string(),
            ));
        }
        if !self.base_resolution.is_power_of_two() || self.base_resolution < 8 {
            return Err(StackGanError::InvalidConfiguration(format!(
                "base_resolution ({}) must be a power of 2 and at least 8",
                self.base_resolution
            )));
        }
        if self.generator_lr <= 0.0 || self.discriminator_lr <= 0.0 {
            return Err(StackGanError::InvalidConfiguration(
                "learning rates must be positive".to_string(),
            ));
        }
        if self.do_lr_decay
            && (self.decay_steps == 0 || self.decay_rate <= 0.0 || self.decay_rate > 1.0)
        {
            return Err(StackGanError::InvalidConfiguration(
                "decay_steps must be positive and decay_rate within (0, 1]".to_string(),
            ));
        }
        if self.color_loss_weight < 0.0 {
            return Err(StackGanError::InvalidConfiguration(
                "color_loss_weight must be non-negative".to_string(),
            ));
        }
        if self.gradient_penalty_weight < 0.0 {
            return Err(StackGanError::InvalidConfiguration(
                "gradient_penalty_weight must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Output resolution of a stage on the canonical doubling ladder
    #[must_use]
    pub fn resolution_for_stage(&self, stage: usize) -> usize {
        self.base_resolution << stage
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StackGanError::InvalidConfiguration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            StackGanError::InvalidConfiguration(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }
}
