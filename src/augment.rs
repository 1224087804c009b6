//! Conditioning augmentation
//!
//! Projects the raw conditioning signal (e.g. a text embedding) to a
//! Gaussian over conditioning space and draws one reparameterized sample:
//! `c = mu + exp(logvar / 2) * eps`, with `eps ~ N(0, I)`. The sample and
//! its distribution parameters are computed once per stack build and
//! shared by every stage, which keeps conditioning consistent across
//! resolutions.

use rand::Rng;

use crate::error::{Result, StackGanError};
use crate::scope::ParamScope;
use crate::tensor::Tensor;

/// Augmented conditioning sample plus its distribution parameters
#[derive(Debug, Clone)]
pub struct AugmentedConditioning {
    /// Reparameterized sample, shape `[batch, conditioning_dim]`
    pub conditioning: Tensor,
    /// Gaussian mean, shape `[batch, conditioning_dim]`
    pub mu: Tensor,
    /// Gaussian log-variance, shape `[batch, conditioning_dim]`
    pub logvar: Tensor,
}

/// Derives the shared conditioning vector for a stack
#[derive(Debug, Clone)]
pub struct ConditioningAugmenter {
    embedding_dim: usize,
    conditioning_dim: usize,
}

impl ConditioningAugmenter {
    /// Create an augmenter mapping `embedding_dim` inputs to
    /// `conditioning_dim` outputs
    #[must_use]
    pub fn new(embedding_dim: usize, conditioning_dim: usize) -> Self {
        Self {
            embedding_dim,
            conditioning_dim,
        }
    }

    /// Augment a batch of embeddings, creating the projection parameters
    /// under `scope` on first use.
    ///
    /// `embedding` must have shape `[batch, embedding_dim]`.
    pub fn augment<R: Rng>(
        &self,
        scope: &ParamScope,
        embedding: &Tensor,
        rng: &mut R,
    ) -> Result<AugmentedConditioning> {
        let shape = embedding.shape();
        if shape.len() != 2 || shape[1] != self.embedding_dim {
            return Err(StackGanError::InvalidConfiguration(format!(
                "conditioning embedding must have shape [batch, {}], got {shape:?}",
                self.embedding_dim
            )));
        }
        let batch = shape[0];

        let w_mu = self.projection(scope, "w_mu", rng);
        let b_mu = scope.get_or_create("b_mu", || Tensor::zeros(self.conditioning_dim, true));
        let w_logvar = self.projection(scope, "w_logvar", rng);
        let b_logvar =
            scope.get_or_create("b_logvar", || Tensor::zeros(self.conditioning_dim, true));

        let mu = self.dense(embedding, &w_mu, &b_mu, batch);
        let logvar = self.dense(embedding, &w_logvar, &b_logvar, batch);

        let eps = Tensor::randn(&[batch, self.conditioning_dim], rng);
        let sample: Vec<f32> = {
            let mu_data = mu.data();
            let lv_data = logvar.data();
            let eps_data = eps.data();
            mu_data
                .iter()
                .zip(lv_data.iter())
                .zip(eps_data.iter())
                .map(|((m, lv), e)| m + (0.5 * lv).exp() * e)
                .collect()
        };
        let conditioning = Tensor::from_shape_vec(&[batch, self.conditioning_dim], sample, false);

        Ok(AugmentedConditioning {
            conditioning,
            mu,
            logvar,
        })
    }

    fn projection<R: Rng>(&self, scope: &ParamScope, name: &str, rng: &mut R) -> Tensor {
        let rows = self.embedding_dim;
        let cols = self.conditioning_dim;
        scope.get_or_create(name, || {
            let scale = 1.0 / (rows as f32).sqrt();
            let init = Tensor::randn(&[rows, cols], rng);
            let data: Vec<f32> = init.data().iter().map(|v| v * scale).collect();
            Tensor::from_shape_vec(&[rows, cols], data, true)
        })
    }

    fn dense(&self, x: &Tensor, w: &Tensor, b: &Tensor, batch: usize) -> Tensor {
        let rows = self.embedding_dim;
        let cols = self.conditioning_dim;
        let x_data = x.data();
        let w_data = w.data();
        let b_data = b.data();

        let mut out = vec![0.0f32; batch * cols];
        for n in 0..batch {
            for j in 0..cols {
                let mut acc = b_data[j];
                for i in 0..rows {
                    acc += x_data[n * rows + i] * w_data[i * cols + j];
                }
                out[n * cols + j] = acc;
            }
        }
        Tensor::from_shape_vec(&[batch, cols], out, false)
    }
}
