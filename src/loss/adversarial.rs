//! Base adversarial loss functions over a single stage

use crate::model::StageModel;
use crate::tensor::Tensor;

fn mean(t: &Tensor) -> f32 {
    if t.is_empty() {
        return 0.0;
    }
    t.data().iter().sum::<f32>() / t.len() as f32
}

/// Numerically stable logistic sigmoid
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Per-stage adversarial loss over discriminator scores.
///
/// Takes one [`StageModel`]; aggregation across stages is the loss
/// aggregator's job.
pub trait AdversarialLoss {
    /// Loss minimized by the discriminator at this stage
    fn discriminator_loss(&self, model: &StageModel) -> f32;

    /// This stage's contribution to the combined generator loss
    fn generator_loss(&self, model: &StageModel) -> f32;

    /// Name of the loss function
    fn name(&self) -> &str;
}

/// Wasserstein critic loss: `D` scores real data high and generated data
/// low; the generator maximizes the critic's score on generated data.
#[derive(Debug, Clone, Copy, Default)]
pub struct WassersteinLoss;

impl AdversarialLoss for WassersteinLoss {
    fn discriminator_loss(&self, model: &StageModel) -> f32 {
        mean(&model.discriminator_gen_outputs) - mean(&model.discriminator_real_outputs)
    }

    fn generator_loss(&self, model: &StageModel) -> f32 {
        -mean(&model.discriminator_gen_outputs)
    }

    fn name(&self) -> &str {
        "wasserstein"
    }
}

/// Non-saturating GAN loss: binary cross-entropy on sigmoid-squashed
/// scores, with the generator maximizing `log D(G(z))` instead of
/// minimizing `log(1 - D(G(z)))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonSaturatingLoss;

impl AdversarialLoss for NonSaturatingLoss {
    fn discriminator_loss(&self, model: &StageModel) -> f32 {
        let real: f32 = model
            .discriminator_real_outputs
            .data()
            .iter()
            .map(|&s| -sigmoid(s).max(1e-7).ln())
            .sum::<f32>()
            / model.discriminator_real_outputs.len() as f32;
        let gen: f32 = model
            .discriminator_gen_outputs
            .data()
            .iter()
            .map(|&s| -(1.0 - sigmoid(s)).max(1e-7).ln())
            .sum::<f32>()
            / model.discriminator_gen_outputs.len() as f32;
        real + gen
    }

    fn generator_loss(&self, model: &StageModel) -> f32 {
        model
            .discriminator_gen_outputs
            .data()
            .iter()
            .map(|&s| -sigmoid(s).max(1e-7).ln())
            .sum::<f32>()
            / model.discriminator_gen_outputs.len() as f32
    }

    fn name(&self) -> &str {
        "non_saturating"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_bounds() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 0.001);
    }

    #[test]
    fn test_sigmoid_symmetry() {
        for x in [-3.0f32, -0.5, 0.0, 0.5, 3.0] {
            assert_relative_eq!(sigmoid(x) + sigmoid(-x), 1.0, epsilon = 1e-6);
        }
    }
}
