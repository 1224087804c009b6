//! Train-op scheduling and the training loop
//!
//! Training alternates strictly within each global step: every stage's
//! discriminator op runs first (in stage order), then the single generator
//! op. A shared global step counter advances once per alternation round.

mod hooks;
mod metrics;
mod ops;
mod train_loop;

pub use hooks::TrainSteps;
pub use metrics::StackGanStats;
pub use ops::{DiscriminatorTrainOp, GanTrainOps, GeneratorTrainOp, TrainOpKind};
pub use train_loop::{gan_train, StepLosses, TrainSummary};
