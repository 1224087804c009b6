//! Loss aggregation across a stack
//!
//! Discriminator losses are independent, one per stage. The generator
//! loss is a single combined value for the whole stack: the generator is
//! optimized once per step against a stack-wide objective, while each
//! discriminator is optimized against its own stage alone.

use rand::Rng;

use crate::error::{Result, StackGanError};
use crate::model::{Mode, StageModel};
use crate::tensor::Tensor;

use super::adversarial::AdversarialLoss;
use super::color::color_consistency_loss;

/// Scalar discriminator loss for one stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscriminatorLoss {
    /// Stage the loss belongs to
    pub stage: usize,
    /// Loss value, including penalties and regularization
    pub value: f32,
}

/// The single combined generator loss for a whole stack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorLoss {
    /// Loss value, including color consistency and regularization
    pub value: f32,
}

/// Auxiliary loss configuration.
///
/// Mutual-information and auxiliary-classifier weights exist on the
/// surface for parity with richer GAN variants, but this model variant
/// does not carry the heads they require; supplying them is an error.
#[derive(Debug, Clone)]
pub struct AuxLossConfig {
    /// Wasserstein gradient penalty weight, `None` to disable
    pub gradient_penalty_weight: Option<f32>,
    /// Numerical-stability epsilon for the gradient penalty norm
    pub gradient_penalty_epsilon: f32,
    /// InfoGAN mutual-information penalty weight (unsupported variant)
    pub mutual_information_penalty_weight: Option<f32>,
    /// ACGAN generator classification weight (unsupported variant)
    pub aux_cond_generator_weight: Option<f32>,
    /// ACGAN discriminator classification weight (unsupported variant)
    pub aux_cond_discriminator_weight: Option<f32>,
}

impl Default for AuxLossConfig {
    fn default() -> Self {
        Self {
            gradient_penalty_weight: None,
            gradient_penalty_epsilon: 1e-10,
            mutual_information_penalty_weight: None,
            aux_cond_generator_weight: None,
            aux_cond_discriminator_weight: None,
        }
    }
}

impl AuxLossConfig {
    /// Enable the gradient penalty with the given weight
    #[must_use]
    pub fn with_gradient_penalty(weight: f32) -> Self {
        Self {
            gradient_penalty_weight: Some(weight),
            ..Default::default()
        }
    }
}

fn validate_aux_weight(weight: Option<f32>, name: &str) -> Result<Option<f32>> {
    match weight {
        Some(w) if w < 0.0 => Err(StackGanError::InvalidConfiguration(format!(
            "{name} must be non-negative, got {w}"
        ))),
        other => Ok(other),
    }
}

fn use_aux_loss(weight: Option<f32>) -> bool {
    matches!(weight, Some(w) if w > 0.0)
}

/// Compute the discriminator loss for one stage: base adversarial loss,
/// optional gradient penalty, and the stage scope's weight-regularization
/// loss.
pub fn discriminator_loss<R: Rng>(
    model: &StageModel,
    loss_fn: &dyn AdversarialLoss,
    aux: &AuxLossConfig,
    rng: &mut R,
) -> Result<DiscriminatorLoss> {
    let gradient_penalty_weight =
        validate_aux_weight(aux.gradient_penalty_weight, "gradient_penalty_weight")?;
    let mutual_information_weight = validate_aux_weight(
        aux.mutual_information_penalty_weight,
        "mutual_information_penalty_weight",
    )?;
    let aux_gen_weight =
        validate_aux_weight(aux.aux_cond_generator_weight, "aux_cond_generator_weight")?;
    let aux_dis_weight = validate_aux_weight(
        aux.aux_cond_discriminator_weight,
        "aux_cond_discriminator_weight",
    )?;

    if use_aux_loss(mutual_information_weight) {
        return Err(StackGanError::InvalidConfiguration(
            "mutual_information_penalty_weight requires an InfoGAN-style model variant"
                .to_string(),
        ));
    }
    if use_aux_loss(aux_gen_weight) || use_aux_loss(aux_dis_weight) {
        return Err(StackGanError::InvalidConfiguration(
            "auxiliary-classifier weights require an ACGAN-style model variant".to_string(),
        ));
    }

    let mut value = loss_fn.discriminator_loss(model);
    if let Some(weight) = gradient_penalty_weight.filter(|w| *w > 0.0) {
        value += weight * wasserstein_gradient_penalty(model, aux.gradient_penalty_epsilon, rng)?;
    }
    value += model.discriminator_scope.regularization_loss();

    Ok(DiscriminatorLoss {
        stage: model.stage,
        value,
    })
}

/// Compute the single combined generator loss across the whole stack:
/// per-stage adversarial terms, the cross-stage color-consistency loss,
/// and the generator super-scope's weight-regularization loss.
pub fn generator_loss(
    models: &[StageModel],
    loss_fn: &dyn AdversarialLoss,
    color_loss_weight: f32,
) -> Result<GeneratorLoss> {
    if models.is_empty() {
        return Err(StackGanError::InvalidConfiguration(
            "generator loss needs at least one stage model".to_string(),
        ));
    }
    if color_loss_weight < 0.0 {
        return Err(StackGanError::InvalidConfiguration(format!(
            "color_loss_weight must be non-negative, got {color_loss_weight}"
        )));
    }

    let mut value = color_consistency_loss(models, color_loss_weight)?;
    for model in models {
        value += loss_fn.generator_loss(model);
    }
    // Scope handles are identical across stages; the last stage's is used
    // for symmetry with the per-stage discriminator path.
    let last = &models[models.len() - 1];
    value += last.generator_scope.regularization_loss();

    Ok(GeneratorLoss { value })
}

/// Estimate the WGAN-GP term: `mean((||grad D(x_hat)|| - 1)^2)` over
/// interpolates `x_hat` between real and generated samples.
///
/// Without an autodiff graph over the pluggable discriminator, the
/// gradient norm along the real-to-generated direction (the direction the
/// Lipschitz constraint matters for) is estimated with a central finite
/// difference. Probes run the discriminator in eval configuration.
fn wasserstein_gradient_penalty<R: Rng>(
    model: &StageModel,
    epsilon: f32,
    rng: &mut R,
) -> Result<f32> {
    const PROBE_DELTA: f32 = 1e-3;

    let shape = model.real_data.shape();
    let batch = shape[0];
    let per_sample = model.real_data.len() / batch;

    let real = model.real_data.data();
    let fake = model.generated_data.data();

    let mut plus = vec![0.0f32; real.len()];
    let mut minus = vec![0.0f32; real.len()];

    for n in 0..batch {
        let alpha: f32 = rng.random();
        let start = n * per_sample;
        let mut norm_sq = 0.0f32;
        for i in start..start + per_sample {
            let diff = real[i] - fake[i];
            norm_sq += diff * diff;
        }
        let norm = (norm_sq + epsilon).sqrt();
        for i in start..start + per_sample {
            let interpolate = alpha * real[i] + (1.0 - alpha) * fake[i];
            let unit = (real[i] - fake[i]) / norm;
            plus[i] = interpolate + PROBE_DELTA * unit;
            minus[i] = interpolate - PROBE_DELTA * unit;
        }
    }
    drop(real);
    drop(fake);

    let plus_scores = model.discriminator_fn.call(
        &model.discriminator_scope,
        &Tensor::from_shape_vec(&shape, plus, false),
        &model.mu,
        false,
        Mode::Eval,
    )?;
    let minus_scores = model.discriminator_fn.call(
        &model.discriminator_scope,
        &Tensor::from_shape_vec(&shape, minus, false),
        &model.mu,
        false,
        Mode::Eval,
    )?;

    let plus_data = plus_scores.data();
    let minus_data = minus_scores.data();
    let mut penalty = 0.0f32;
    for n in 0..batch {
        let grad_norm = ((plus_data[n] - minus_data[n]) / (2.0 * PROBE_DELTA)).abs();
        penalty += (grad_norm - 1.0) * (grad_norm - 1.0);
    }
    Ok(penalty / batch as f32)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use approx::assert_relative_eq;
    use rand::SeedableRng;

    use crate::config::StackGanConfig;
    use crate::loss::{NonSaturatingLoss, WassersteinLoss};
    use crate::model::{build_stack, Mode, RealData, StackScopes};
    use crate::testing::{ToyDiscriminator, ToyGenerator, CHANNELS};

    use super::*;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(7)
    }

    fn build_models(stack_depth: usize) -> Vec<StageModel> {
        let config = StackGanConfig {
            stack_depth,
            batch_size: 2,
            noise_dim: 8,
            embedding_dim: 8,
            conditioning_dim: 4,
            base_resolution: 8,
            ..Default::default()
        };
        let scopes = StackScopes::new(stack_depth);
        let mut rng = rng();
        let embedding = Tensor::randn(&[2, 8], &mut rng);
        let real: Vec<Tensor> = (0..stack_depth)
            .map(|stage| {
                let res = config.resolution_for_stage(stage);
                Tensor::randn(&[2, res, res, CHANNELS], &mut rng)
            })
            .collect();
        let real = if stack_depth == 1 {
            RealData::Single(real.into_iter().next().unwrap())
        } else {
            RealData::PerStage(real)
        };
        build_stack(
            &config,
            &scopes,
            Rc::new(ToyGenerator::new()),
            Rc::new(ToyDiscriminator::new()),
            real,
            &embedding,
            Mode::Train,
            &mut rng,
        )
        .unwrap()
    }

    #[test]
    fn test_one_discriminator_loss_per_stage() {
        let models = build_models(3);
        let aux = AuxLossConfig::default();
        let mut rng = rng();
        for model in &models {
            let loss = discriminator_loss(model, &WassersteinLoss, &aux, &mut rng).unwrap();
            assert_eq!(loss.stage, model.stage);
            assert!(loss.value.is_finite());
        }
    }

    #[test]
    fn test_generator_loss_is_single_combined_value() {
        let models = build_models(3);
        let loss = generator_loss(&models, &WassersteinLoss, 50.0).unwrap();
        assert!(loss.value.is_finite());

        // Combined value decomposes into per-stage terms + color + reg.
        let per_stage: f32 = models
            .iter()
            .map(|m| WassersteinLoss.generator_loss(m))
            .sum();
        let color = color_consistency_loss(&models, 50.0).unwrap();
        let reg = models[0].generator_scope.regularization_loss();
        assert_relative_eq!(loss.value, per_stage + color + reg, epsilon = 1e-5);
    }

    #[test]
    fn test_color_loss_zero_for_single_stage() {
        let models = build_models(1);
        assert_eq!(color_consistency_loss(&models, 50.0).unwrap(), 0.0);
    }

    #[test]
    fn test_color_loss_zero_for_identical_statistics() {
        let mut models = build_models(2);
        // Same constant channel values at both resolutions: identical
        // per-channel means and (zero) covariances.
        let values = [0.1f32, 0.4, -0.2];
        for (model, size) in models.iter_mut().zip([8usize, 16]) {
            let mut data = vec![0.0f32; 2 * size * size * 3];
            for n in 0..2 {
                for p in 0..size * size {
                    for (c, &v) in values.iter().enumerate() {
                        data[(n * size * size + p) * 3 + c] = v;
                    }
                }
            }
            model.generated_data = Tensor::from_shape_vec(&[2, size, size, 3], data, false);
        }
        assert_relative_eq!(
            color_consistency_loss(&models, 50.0).unwrap(),
            0.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_color_loss_positive_for_diverging_statistics() {
        let mut models = build_models(2);
        let size = 8;
        models[0].generated_data =
            Tensor::from_shape_vec(&[2, size, size, 3], vec![0.0; 2 * size * size * 3], false);
        let size = 16;
        models[1].generated_data =
            Tensor::from_shape_vec(&[2, size, size, 3], vec![0.9; 2 * size * size * 3], false);
        assert!(color_consistency_loss(&models, 50.0).unwrap() > 0.0);
    }

    #[test]
    fn test_malformed_generated_data_is_an_error() {
        let mut models = build_models(2);
        // Flattened data loses the image layout the color loss depends on.
        models[1].generated_data = Tensor::from_vec(vec![0.0; 2 * 16 * 16 * 3], false);
        let err = generator_loss(&models, &WassersteinLoss, 50.0);
        assert!(matches!(err, Err(StackGanError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_non_saturating_losses_are_positive() {
        let models = build_models(2);
        let mut rng = rng();

        let gen = generator_loss(&models, &NonSaturatingLoss, 0.0).unwrap();
        assert!(gen.value > 0.0);

        let dis = discriminator_loss(
            &models[0],
            &NonSaturatingLoss,
            &AuxLossConfig::default(),
            &mut rng,
        )
        .unwrap();
        assert!(dis.value > 0.0);
    }

    #[test]
    fn test_negative_gradient_penalty_weight_rejected() {
        let models = build_models(1);
        let aux = AuxLossConfig::with_gradient_penalty(-1.0);
        let mut rng = rng();
        let err = discriminator_loss(&models[0], &WassersteinLoss, &aux, &mut rng);
        assert!(matches!(err, Err(StackGanError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_mutual_information_weight_unsupported() {
        let models = build_models(1);
        let aux = AuxLossConfig {
            mutual_information_penalty_weight: Some(1.0),
            ..Default::default()
        };
        let mut rng = rng();
        let err = discriminator_loss(&models[0], &WassersteinLoss, &aux, &mut rng);
        assert!(matches!(err, Err(StackGanError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_aux_classifier_weights_unsupported() {
        let models = build_models(1);
        let mut rng = rng();
        for aux in [
            AuxLossConfig {
                aux_cond_generator_weight: Some(0.5),
                ..Default::default()
            },
            AuxLossConfig {
                aux_cond_discriminator_weight: Some(0.5),
                ..Default::default()
            },
        ] {
            let err = discriminator_loss(&models[0], &WassersteinLoss, &aux, &mut rng);
            assert!(matches!(err, Err(StackGanError::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn test_gradient_penalty_only_increases_loss() {
        let models = build_models(1);
        let mut rng = rng();
        let base =
            discriminator_loss(&models[0], &WassersteinLoss, &AuxLossConfig::default(), &mut rng)
                .unwrap();
        let penalized = discriminator_loss(
            &models[0],
            &WassersteinLoss,
            &AuxLossConfig::with_gradient_penalty(1.0),
            &mut rng,
        )
        .unwrap();
        assert!(penalized.value >= base.value);
        assert!(penalized.value.is_finite());
    }

    #[test]
    fn test_discriminator_loss_includes_regularization() {
        let models = build_models(1);
        let mut rng = rng();
        let loss =
            discriminator_loss(&models[0], &WassersteinLoss, &AuxLossConfig::default(), &mut rng)
                .unwrap();
        let base = WassersteinLoss.discriminator_loss(&models[0]);
        let reg = models[0].discriminator_scope.regularization_loss();
        assert!(reg > 0.0);
        assert_relative_eq!(loss.value, base + reg, epsilon = 1e-6);
    }

    #[test]
    fn test_negative_color_weight_rejected() {
        let models = build_models(2);
        let err = generator_loss(&models, &WassersteinLoss, -1.0);
        assert!(matches!(err, Err(StackGanError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_empty_model_list_rejected() {
        let err = generator_loss(&[], &WassersteinLoss, 0.0);
        assert!(matches!(err, Err(StackGanError::InvalidConfiguration(_))));
    }
}
