//! Optimizers and learning rate schedules

mod adam;
mod decay;
mod optimizer;

pub use adam::Adam;
pub use decay::{ExponentialDecayLR, LRScheduler};
pub use optimizer::Optimizer;
