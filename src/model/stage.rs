//! Per-stage model records and pluggable network contracts

use std::rc::Rc;

use crate::error::Result;
use crate::scope::ParamScope;
use crate::tensor::Tensor;

/// Execution mode, always passed explicitly to network functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Training: networks populate parameter gradients on forward
    Train,
    /// Evaluation: forward passes only, no gradient population
    Eval,
    /// Prediction: generator-only, no real data, no discriminators
    Predict,
}

/// Input to a generator stage.
///
/// The first stage consumes noise; every later stage consumes the previous
/// stage's hidden code. Both carry the shared conditioning sample.
#[derive(Debug, Clone)]
pub enum GeneratorInput {
    /// Stage 0: `z ~ N(0, I)` plus conditioning
    Init {
        noise: Tensor,
        conditioning: Tensor,
    },
    /// Stage i > 0: hidden code of stage i-1 plus conditioning
    Stacked {
        hidden_code: Tensor,
        conditioning: Tensor,
    },
}

impl GeneratorInput {
    /// The conditioning component, common to both variants
    #[must_use]
    pub fn conditioning(&self) -> &Tensor {
        match self {
            Self::Init { conditioning, .. } | Self::Stacked { conditioning, .. } => conditioning,
        }
    }

    /// The hidden code threaded in from the previous stage, if any
    #[must_use]
    pub fn hidden_code(&self) -> Option<&Tensor> {
        match self {
            Self::Init { .. } => None,
            Self::Stacked { hidden_code, .. } => Some(hidden_code),
        }
    }
}

/// Output of one generator stage
#[derive(Debug, Clone)]
pub struct GeneratorOutput {
    /// Sample from the generator distribution, shape
    /// `[batch, size, size, channels]`
    pub data: Tensor,
    /// Pre-final-layer activation, fed to the next stage as input
    pub hidden_code: Tensor,
}

/// Generator network function, supplied by the caller.
///
/// Parameters must be declared through `scope` (so the stack assembler
/// controls ownership), and in [`Mode::Train`] the implementation is
/// responsible for populating gradients on those parameters during the
/// forward pass. `final_size` is the spatial resolution the stage must
/// produce.
pub trait GeneratorFn {
    fn call(
        &self,
        scope: &ParamScope,
        inputs: &GeneratorInput,
        final_size: usize,
        apply_batch_norm: bool,
        mode: Mode,
    ) -> Result<GeneratorOutput>;
}

/// Discriminator network function, supplied by the caller.
///
/// Returns unbounded realness scores of shape `[batch]`. The same
/// gradient-population contract as [`GeneratorFn`] applies.
pub trait DiscriminatorFn {
    fn call(
        &self,
        scope: &ParamScope,
        data: &Tensor,
        conditioning: &Tensor,
        apply_batch_norm: bool,
        mode: Mode,
    ) -> Result<Tensor>;
}

/// Real data supplied to a stack build.
///
/// A depth-1 stack takes a single tensor rather than a one-element ladder;
/// prediction-mode builds take `None`.
#[derive(Debug, Clone)]
pub enum RealData {
    /// Single-stage stack: one tensor, not indexed by stage
    Single(Tensor),
    /// Multi-stage stack: one tensor per stage, ordered by resolution
    PerStage(Vec<Tensor>),
    /// No real data (prediction mode only)
    None,
}

/// One (generator, discriminator) stage of a built stack.
///
/// Immutable after construction. `generator_scope` is the same handle in
/// every stage of a stack, and `generator_params` the same shared set;
/// `discriminator_scope` and `discriminator_params` are exclusive to this
/// stage.
#[derive(Clone)]
pub struct StageModel {
    /// Stage index, 0-based
    pub stage: usize,
    /// Inputs this stage's generator consumed
    pub generator_inputs: GeneratorInput,
    /// Sample from the generator distribution at this stage's resolution
    pub generated_data: Tensor,
    /// Pre-final-layer activation, input to stage `stage + 1`
    pub generator_hidden_code: Tensor,
    /// All generator parameters of the stack (super-scope set)
    pub generator_params: Vec<Tensor>,
    /// Shared generator super-scope handle
    pub generator_scope: ParamScope,
    /// The generator network function
    pub generator_fn: Rc<dyn GeneratorFn>,
    /// Real data at this stage's resolution
    pub real_data: Tensor,
    /// Discriminator scores on real data
    pub discriminator_real_outputs: Tensor,
    /// Discriminator scores on generated data
    pub discriminator_gen_outputs: Tensor,
    /// This stage's discriminator parameters
    pub discriminator_params: Vec<Tensor>,
    /// This stage's private discriminator scope
    pub discriminator_scope: ParamScope,
    /// The discriminator network function
    pub discriminator_fn: Rc<dyn DiscriminatorFn>,
    /// Conditioning distribution mean, shared across the stack
    pub mu: Tensor,
    /// Conditioning distribution log-variance, shared across the stack
    pub logvar: Tensor,
}

impl std::fmt::Debug for StageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageModel")
            .field("stage", &self.stage)
            .field("generated_shape", &self.generated_data.shape())
            .field("generator_params", &self.generator_params.len())
            .field("discriminator_params", &self.discriminator_params.len())
            .finish()
    }
}

/// Generator-only model produced by a prediction-mode build.
///
/// A distinct record rather than a `StageModel` with suppressed fields:
/// there is no discriminator side to represent.
#[derive(Clone)]
pub struct PredictionModel {
    /// Sample at the final stage's resolution
    pub generated_data: Tensor,
    /// Final stage's hidden code
    pub generator_hidden_code: Tensor,
    /// All generator parameters of the stack
    pub generator_params: Vec<Tensor>,
    /// Shared generator super-scope handle
    pub generator_scope: ParamScope,
    /// Conditioning distribution mean
    pub mu: Tensor,
    /// Conditioning distribution log-variance
    pub logvar: Tensor,
}

impl std::fmt::Debug for PredictionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionModel")
            .field("generated_shape", &self.generated_data.shape())
            .field("generator_params", &self.generator_params.len())
            .finish()
    }
}
