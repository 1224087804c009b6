//! Stack-wide loss construction
//!
//! Per-stage adversarial losses, the cross-stage color-consistency term,
//! and the aggregation rules: one discriminator loss per stage, exactly
//! one combined generator loss for the stack.

mod adversarial;
mod aggregate;
mod color;

pub use adversarial::{sigmoid, AdversarialLoss, NonSaturatingLoss, WassersteinLoss};
pub use aggregate::{
    discriminator_loss, generator_loss, AuxLossConfig, DiscriminatorLoss, GeneratorLoss,
};
pub use color::{color_consistency_loss, mean_covariance, ChannelStatistics};
