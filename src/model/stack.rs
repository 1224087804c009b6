//! Stack assembly
//!
//! Drives the per-stage model builder across all stack depths. The
//! generator super-scope is created once (in [`StackScopes`]) and handed
//! into every stage's generator call, so all generator-stage parameters
//! (and the conditioning augmenter's) form one jointly-optimized set,
//! while each discriminator gets a root scope of its own. Rebuilding with
//! the same scopes (e.g. an eval build after a train build) reuses the
//! existing parameters through the scopes' idempotent lookup.

use std::rc::Rc;

use rand::Rng;

use crate::augment::ConditioningAugmenter;
use crate::config::StackGanConfig;
use crate::error::{Result, StackGanError};
use crate::scope::ParamScope;
use crate::tensor::Tensor;

use super::stage::{
    DiscriminatorFn, GeneratorFn, GeneratorInput, GeneratorOutput, Mode, PredictionModel,
    RealData, StageModel,
};

/// Name of the shared generator super-scope
pub const GENERATOR_SCOPE: &str = "generator";

/// The parameter-ownership handles for one stack: a single shared
/// generator super-scope and one private root scope per discriminator
/// stage. Created once, passed by reference into every build.
#[derive(Debug, Clone)]
pub struct StackScopes {
    /// Shared super-scope owning all generator-stage parameters
    pub generator: ParamScope,
    /// One independent scope per discriminator stage
    pub discriminators: Vec<ParamScope>,
}

impl StackScopes {
    /// Create scopes for a stack of the given depth
    #[must_use]
    pub fn new(stack_depth: usize) -> Self {
        Self {
            generator: ParamScope::root(GENERATOR_SCOPE),
            discriminators: (0..stack_depth)
                .map(|stage| ParamScope::root(&format!("discriminator_stage_{stage}")))
                .collect(),
        }
    }
}

/// Build a full training or evaluation stack.
///
/// Returns exactly `config.stack_depth` stage models with strictly
/// increasing stage indices. Fails fast on the first malformed stage: the
/// generator scopes are interdependent, so no partial stack is usable.
pub fn build_stack<R: Rng>(
    config: &StackGanConfig,
    scopes: &StackScopes,
    generator_fn: Rc<dyn GeneratorFn>,
    discriminator_fn: Rc<dyn DiscriminatorFn>,
    real_data: RealData,
    embedding: &Tensor,
    mode: Mode,
    rng: &mut R,
) -> Result<Vec<StageModel>> {
    config.validate()?;
    if mode == Mode::Predict {
        return Err(StackGanError::ModeViolation(
            "prediction-mode stacks are generator-only; use build_prediction".to_string(),
        ));
    }
    if scopes.discriminators.len() != config.stack_depth {
        return Err(StackGanError::InvalidConfiguration(format!(
            "scopes hold {} discriminator stages for stack_depth {}",
            scopes.discriminators.len(),
            config.stack_depth
        )));
    }
    let real_per_stage = resolve_real_data(config.stack_depth, real_data)?;

    let super_scope = &scopes.generator;
    let augmented = ConditioningAugmenter::new(config.embedding_dim, config.conditioning_dim)
        .augment(
            &super_scope.subscope("conditioning_augmenter"),
            embedding,
            rng,
        )?;
    let noise = Tensor::randn(&[config.batch_size, config.noise_dim], rng);

    let mut models = Vec::with_capacity(config.stack_depth);
    let mut prev_hidden: Option<Tensor> = None;

    for stage in 0..config.stack_depth {
        let inputs = stage_inputs(stage, &noise, &prev_hidden, &augmented.conditioning);
        let output = run_generator_stage(
            super_scope,
            generator_fn.as_ref(),
            stage,
            &inputs,
            config,
            mode,
        )?;

        let real = real_per_stage[stage].clone();
        if output.data.shape() != real.shape() {
            return Err(StackGanError::ShapeMismatch {
                stage,
                generated: output.data.shape(),
                real: real.shape(),
            });
        }

        let dis_scope = scopes.discriminators[stage].clone();
        let dis_gen_outputs = discriminator_fn.call(
            &dis_scope,
            &output.data,
            &augmented.mu,
            config.apply_batch_norm,
            mode,
        )?;
        let dis_real_outputs = discriminator_fn.call(
            &dis_scope,
            &real,
            &augmented.mu,
            config.apply_batch_norm,
            mode,
        )?;

        prev_hidden = Some(output.hidden_code.clone());
        models.push(StageModel {
            stage,
            generator_inputs: inputs,
            generated_data: output.data,
            generator_hidden_code: output.hidden_code,
            generator_params: Vec::new(), // filled once all stages exist
            generator_scope: super_scope.clone(),
            generator_fn: Rc::clone(&generator_fn),
            real_data: real,
            discriminator_real_outputs: dis_real_outputs,
            discriminator_gen_outputs: dis_gen_outputs,
            discriminator_params: dis_scope.trainable_params(),
            discriminator_scope: dis_scope,
            discriminator_fn: Rc::clone(&discriminator_fn),
            mu: augmented.mu.clone(),
            logvar: augmented.logvar.clone(),
        });
    }

    // Every stage owns the identical super-scope parameter set.
    let generator_params = super_scope.trainable_params();
    for model in &mut models {
        model.generator_params = generator_params.clone();
    }
    Ok(models)
}

/// Build a prediction-mode model: generator stages only, no real data, no
/// discriminators. Returns the final stage's outputs.
pub fn build_prediction<R: Rng>(
    config: &StackGanConfig,
    scopes: &StackScopes,
    generator_fn: Rc<dyn GeneratorFn>,
    real_data: RealData,
    embedding: &Tensor,
    rng: &mut R,
) -> Result<PredictionModel> {
    config.validate()?;
    if !matches!(real_data, RealData::None) {
        return Err(StackGanError::ModeViolation(
            "real data must be absent in prediction mode".to_string(),
        ));
    }

    let super_scope = &scopes.generator;
    let augmented = ConditioningAugmenter::new(config.embedding_dim, config.conditioning_dim)
        .augment(
            &super_scope.subscope("conditioning_augmenter"),
            embedding,
            rng,
        )?;
    let noise = Tensor::randn(&[config.batch_size, config.noise_dim], rng);

    let mut prev_hidden: Option<Tensor> = None;
    let mut last: Option<GeneratorOutput> = None;
    for stage in 0..config.stack_depth {
        let inputs = stage_inputs(stage, &noise, &prev_hidden, &augmented.conditioning);
        let output = run_generator_stage(
            super_scope,
            generator_fn.as_ref(),
            stage,
            &inputs,
            config,
            Mode::Predict,
        )?;
        prev_hidden = Some(output.hidden_code.clone());
        last = Some(output);
    }

    // stack_depth >= 1 is enforced by validate(), so `last` is set.
    let output = last.ok_or_else(|| {
        StackGanError::InvalidConfiguration("stack produced no stages".to_string())
    })?;
    Ok(PredictionModel {
        generated_data: output.data,
        generator_hidden_code: output.hidden_code,
        generator_params: super_scope.trainable_params(),
        generator_scope: super_scope.clone(),
        mu: augmented.mu,
        logvar: augmented.logvar,
    })
}

fn stage_inputs(
    stage: usize,
    noise: &Tensor,
    prev_hidden: &Option<Tensor>,
    conditioning: &Tensor,
) -> GeneratorInput {
    match prev_hidden {
        Some(hidden_code) if stage > 0 => GeneratorInput::Stacked {
            hidden_code: hidden_code.clone(),
            conditioning: conditioning.clone(),
        },
        _ => GeneratorInput::Init {
            noise: noise.clone(),
            conditioning: conditioning.clone(),
        },
    }
}

fn run_generator_stage(
    super_scope: &ParamScope,
    generator_fn: &dyn GeneratorFn,
    stage: usize,
    inputs: &GeneratorInput,
    config: &StackGanConfig,
    mode: Mode,
) -> Result<GeneratorOutput> {
    // Nested per-stage scope inside the shared super-scope: joint
    // ownership with per-stage variable namespacing.
    let stage_scope = super_scope.subscope(&format!("stage_{stage}"));
    generator_fn.call(
        &stage_scope,
        inputs,
        config.resolution_for_stage(stage),
        config.apply_batch_norm,
        mode,
    )
}

fn resolve_real_data(stack_depth: usize, real_data: RealData) -> Result<Vec<Tensor>> {
    match real_data {
        RealData::None => Err(StackGanError::ModeViolation(
            "real data is required in train/eval mode".to_string(),
        )),
        RealData::Single(tensor) => {
            if stack_depth != 1 {
                return Err(StackGanError::InvalidConfiguration(format!(
                    "single real-data tensor requires stack_depth 1, got {stack_depth}"
                )));
            }
            Ok(vec![tensor])
        }
        RealData::PerStage(tensors) => {
            if stack_depth == 1 {
                return Err(StackGanError::InvalidConfiguration(
                    "stack_depth 1 takes RealData::Single, not a per-stage ladder".to_string(),
                ));
            }
            if tensors.len() != stack_depth {
                return Err(StackGanError::InvalidConfiguration(format!(
                    "real data ladder has {} entries for stack_depth {stack_depth}",
                    tensors.len()
                )));
            }
            Ok(tensors)
        }
    }
}
