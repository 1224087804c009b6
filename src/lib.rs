//! Multi-stage (stacked) GAN orchestration
//!
//! Builds a stack of (generator, discriminator) pairs over a doubling
//! resolution ladder, where:
//! - Generators form one jointly-optimized chain: every stage's parameters
//!   live under a single shared super-scope, and each stage consumes the
//!   previous stage's hidden code
//! - Discriminators are independent per stage, each judging samples at its
//!   own resolution
//!
//! The crate supplies the orchestration around caller-provided network
//! functions: conditioning augmentation, stack assembly with explicit
//! parameter-scope handles, cross-stage loss aggregation (including the
//! color-consistency term that couples adjacent resolutions), and
//! alternating train-op scheduling under a shared global step.
//!
//! # Example
//!
//! ```no_run
//! use std::rc::Rc;
//!
//! use apilar::{
//!     build_stack, Mode, RealData, StackGanConfig, StackScopes, Tensor,
//! };
//! # use apilar::{GeneratorFn, DiscriminatorFn};
//! # fn networks() -> (Rc<dyn GeneratorFn>, Rc<dyn DiscriminatorFn>) { unimplemented!() }
//!
//! # fn main() -> apilar::Result<()> {
//! let config = StackGanConfig::default();
//! let scopes = StackScopes::new(config.stack_depth);
//! let (generator, discriminator) = networks();
//!
//! let mut rng = rand::rng();
//! let embedding = Tensor::randn(&[config.batch_size, config.embedding_dim], &mut rng);
//! let real = RealData::PerStage(
//!     (0..config.stack_depth)
//!         .map(|stage| {
//!             let res = config.resolution_for_stage(stage);
//!             Tensor::zeros_shaped(&[config.batch_size, res, res, 3], false)
//!         })
//!         .collect(),
//! );
//!
//! let models = build_stack(
//!     &config, &scopes, generator, discriminator, real, &embedding, Mode::Train, &mut rng,
//! )?;
//! assert_eq!(models.len(), config.stack_depth);
//! # Ok(())
//! # }
//! ```

pub mod augment;
pub mod config;
pub mod error;
pub mod loss;
pub mod model;
pub mod optim;
pub mod scope;
pub mod tensor;
pub mod train;

#[cfg(test)]
pub(crate) mod testing;

pub use augment::{AugmentedConditioning, ConditioningAugmenter};
pub use config::StackGanConfig;
pub use error::{Result, StackGanError};
pub use model::{
    build_prediction, build_stack, DiscriminatorFn, GeneratorFn, GeneratorInput, GeneratorOutput,
    Mode, PredictionModel, RealData, StackScopes, StageModel, GENERATOR_SCOPE,
};
pub use scope::ParamScope;
pub use tensor::Tensor;
