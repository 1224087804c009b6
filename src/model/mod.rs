//! Stage models and stack assembly
//!
//! A stack is an ordered sequence of [`StageModel`]s: one (generator,
//! discriminator) pair per stage, with every generator sharing one
//! super-scope parameter set and each discriminator owning its own.

mod stack;
mod stage;


pub use stack::{build_prediction, build_stack, StackScopes, GENERATOR_SCOPE};
pub use stage::{
    DiscriminatorFn, GeneratorFn, GeneratorInput, GeneratorOutput, Mode, PredictionModel,
    RealData, StageModel,
};
