//! Train ops over scope-owned parameter sets
//!
//! A train op binds one optimizer to the parameters and update ops of one
//! scope subtree. The generator op owns the whole super-scope, so a single
//! run steps every stage's generator parameters together; each
//! discriminator op owns exactly its stage's scope.

use crate::error::{Result, StackGanError};
use crate::loss::{DiscriminatorLoss, GeneratorLoss};
use crate::optim::Optimizer;
use crate::scope::{ParamScope, UpdateOp};
use crate::tensor::Tensor;

/// One entry in a train step's execution journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainOpKind {
    /// A discriminator op ran for the given stage
    Discriminator { stage: usize },
    /// The generator op ran
    Generator,
}

/// Train op for the shared generator super-scope
pub struct GeneratorTrainOp {
    params: Vec<Tensor>,
    update_ops: Vec<UpdateOp>,
    optimizer: Box<dyn Optimizer>,
    loss: f32,
    runs: u64,
}

impl GeneratorTrainOp {
    /// Bind an optimizer to the generator super-scope's parameters and
    /// update ops.
    pub fn new(scope: &ParamScope, optimizer: Box<dyn Optimizer>) -> Result<Self> {
        let params = scope.trainable_params();
        if params.is_empty() {
            return Err(StackGanError::InvalidConfiguration(format!(
                "scope '{}' has no trainable parameters; build the stack first",
                scope.path()
            )));
        }
        Ok(Self {
            params,
            update_ops: scope.update_ops(),
            optimizer,
            loss: 0.0,
            runs: 0,
        })
    }

    /// Record the current combined generator loss
    pub fn set_loss(&mut self, loss: GeneratorLoss) {
        self.loss = loss.value;
    }

    /// Last recorded loss value
    #[must_use]
    pub fn loss(&self) -> f32 {
        self.loss
    }

    /// Number of parameters this op steps
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Number of times this op has run
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// The op's optimizer, for learning-rate scheduling
    pub fn optimizer_mut(&mut self) -> &mut dyn Optimizer {
        &mut *self.optimizer
    }

    /// Run the op: non-gradient updates first, then the optimizer step,
    /// then gradient reset for the next forward pass.
    pub fn run(&mut self) {
        for op in &self.update_ops {
            op.run();
        }
        self.optimizer.step(&mut self.params);
        self.optimizer.zero_grad(&mut self.params);
        self.runs += 1;
    }
}

/// Train op for one stage's discriminator scope
pub struct DiscriminatorTrainOp {
    stage: usize,
    params: Vec<Tensor>,
    update_ops: Vec<UpdateOp>,
    optimizer: Box<dyn Optimizer>,
    loss: f32,
    runs: u64,
}

impl DiscriminatorTrainOp {
    /// Bind an optimizer to one stage's discriminator scope
    pub fn new(stage: usize, scope: &ParamScope, optimizer: Box<dyn Optimizer>) -> Result<Self> {
        let params = scope.trainable_params();
        if params.is_empty() {
            return Err(StackGanError::InvalidConfiguration(format!(
                "scope '{}' has no trainable parameters; build the stack first",
                scope.path()
            )));
        }
        Ok(Self {
            stage,
            params,
            update_ops: scope.update_ops(),
            optimizer,
            loss: 0.0,
            runs: 0,
        })
    }

    /// Stage this op trains
    #[must_use]
    pub fn stage(&self) -> usize {
        self.stage
    }

    /// Record this stage's current discriminator loss
    pub fn set_loss(&mut self, loss: DiscriminatorLoss) -> Result<()> {
        if loss.stage != self.stage {
            return Err(StackGanError::InvalidConfiguration(format!(
                "loss for stage {} assigned to stage {} train op",
                loss.stage, self.stage
            )));
        }
        self.loss = loss.value;
        Ok(())
    }

    /// Last recorded loss value
    #[must_use]
    pub fn loss(&self) -> f32 {
        self.loss
    }

    /// Number of times this op has run
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// The op's optimizer, for learning-rate scheduling
    pub fn optimizer_mut(&mut self) -> &mut dyn Optimizer {
        &mut *self.optimizer
    }

    /// Run the op
    pub fn run(&mut self) {
        for op in &self.update_ops {
            op.run();
        }
        self.optimizer.step(&mut self.params);
        self.optimizer.zero_grad(&mut self.params);
        self.runs += 1;
    }
}

/// The full set of train ops for a stack, plus the shared global step.
///
/// One global step trains every discriminator (in stage order) and then
/// the generator once; the two sides are never interleaved within a step.
pub struct GanTrainOps {
    generator: GeneratorTrainOp,
    discriminators: Vec<DiscriminatorTrainOp>,
    global_step: u64,
}

impl GanTrainOps {
    /// Assemble the op set. Discriminator ops must cover stages
    /// `0..stack_depth` in order, one per stage.
    pub fn new(
        generator: GeneratorTrainOp,
        discriminators: Vec<DiscriminatorTrainOp>,
    ) -> Result<Self> {
        if discriminators.is_empty() {
            return Err(StackGanError::InvalidConfiguration(
                "train ops need at least one discriminator stage".to_string(),
            ));
        }
        for (i, op) in discriminators.iter().enumerate() {
            if op.stage != i {
                return Err(StackGanError::InvalidConfiguration(format!(
                    "discriminator op at position {i} trains stage {}",
                    op.stage
                )));
            }
        }
        Ok(Self {
            generator,
            discriminators,
            global_step: 0,
        })
    }

    /// The shared global step, incremented once per [`run_step`](Self::run_step)
    #[must_use]
    pub fn global_step(&self) -> u64 {
        self.global_step
    }

    /// Number of discriminator stages
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.discriminators.len()
    }

    /// The generator train op
    pub fn generator_mut(&mut self) -> &mut GeneratorTrainOp {
        &mut self.generator
    }

    /// A stage's discriminator train op, or `None` for a stage the stack
    /// does not have
    pub fn discriminator_mut(&mut self, stage: usize) -> Option<&mut DiscriminatorTrainOp> {
        self.discriminators.get_mut(stage)
    }

    /// Record freshly computed losses for every op
    pub fn set_losses(
        &mut self,
        generator: GeneratorLoss,
        discriminators: &[DiscriminatorLoss],
    ) -> Result<()> {
        if discriminators.len() != self.discriminators.len() {
            return Err(StackGanError::InvalidConfiguration(format!(
                "expected {} discriminator losses, got {}",
                self.discriminators.len(),
                discriminators.len()
            )));
        }
        self.generator.set_loss(generator);
        for (op, loss) in self.discriminators.iter_mut().zip(discriminators) {
            op.set_loss(*loss)?;
        }
        Ok(())
    }

    /// Last recorded generator loss
    #[must_use]
    pub fn generator_loss(&self) -> f32 {
        self.generator.loss()
    }

    /// Last recorded per-stage discriminator losses
    #[must_use]
    pub fn discriminator_losses(&self) -> Vec<f32> {
        self.discriminators.iter().map(|op| op.loss()).collect()
    }

    /// Execute one global step: every discriminator op in stage order,
    /// `discriminator_train_steps` times each, then the generator op
    /// `generator_train_steps` times. Returns the execution journal.
    pub fn run_step(&mut self, steps: &super::TrainSteps) -> Vec<TrainOpKind> {
        let mut journal = Vec::with_capacity(steps.ops_per_step(self.discriminators.len()));
        for op in &mut self.discriminators {
            for _ in 0..steps.discriminator_train_steps() {
                op.run();
                journal.push(TrainOpKind::Discriminator { stage: op.stage });
            }
        }
        for _ in 0..steps.generator_train_steps() {
            self.generator.run();
            journal.push(TrainOpKind::Generator);
        }
        self.global_step += 1;
        journal
    }
}
