//! Cross-stage color-consistency loss
//!
//! The one loss term that couples stages together: it penalizes drift of
//! per-channel pixel statistics (mean and covariance) between each pair of
//! adjacent resolutions, so upscaled stages keep the color distribution of
//! the stage below them.

use crate::error::{Result, StackGanError};
use crate::model::StageModel;
use crate::tensor::Tensor;

/// Per-sample channel statistics of an image batch
#[derive(Debug, Clone)]
pub struct ChannelStatistics {
    /// Per-channel pixel means, flattened `[batch, channels]`
    pub mean: Vec<f32>,
    /// Per-channel pixel covariances, flattened `[batch, channels, channels]`
    pub covariance: Vec<f32>,
}

/// Compute per-sample channel mean and covariance for an image tensor of
/// shape `[batch, height, width, channels]`.
pub fn mean_covariance(images: &Tensor) -> Result<ChannelStatistics> {
    let shape = images.shape();
    if shape.len() != 4 {
        return Err(StackGanError::InvalidConfiguration(format!(
            "channel statistics need [batch, height, width, channels] data, got {shape:?}"
        )));
    }
    let (batch, height, width, channels) = (shape[0], shape[1], shape[2], shape[3]);
    let pixels = height * width;
    let data = images.data();

    let mut mean = vec![0.0f32; batch * channels];
    for n in 0..batch {
        for p in 0..pixels {
            for c in 0..channels {
                mean[n * channels + c] += data[(n * pixels + p) * channels + c];
            }
        }
        for c in 0..channels {
            mean[n * channels + c] /= pixels as f32;
        }
    }

    let mut covariance = vec![0.0f32; batch * channels * channels];
    for n in 0..batch {
        for p in 0..pixels {
            for ci in 0..channels {
                let di = data[(n * pixels + p) * channels + ci] - mean[n * channels + ci];
                for cj in 0..channels {
                    let dj = data[(n * pixels + p) * channels + cj] - mean[n * channels + cj];
                    covariance[(n * channels + ci) * channels + cj] += di * dj;
                }
            }
        }
        for entry in covariance[n * channels * channels..(n + 1) * channels * channels].iter_mut()
        {
            *entry /= pixels as f32;
        }
    }

    Ok(ChannelStatistics { mean, covariance })
}

fn mse(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    if a.is_empty() {
        return 0.0;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        / a.len() as f32
}

/// Color-consistency loss across a stack.
///
/// For each adjacent stage pair (i, i+1), accumulates
/// `weight * mse(mean_i, mean_{i+1}) + 5 * weight * mse(cov_i, cov_{i+1})`
/// over generated-data statistics. A single-stage stack has no adjacent
/// pairs and contributes zero.
pub fn color_consistency_loss(models: &[StageModel], weight: f32) -> Result<f32> {
    if models.len() < 2 || weight == 0.0 {
        return Ok(0.0);
    }

    let stats: Vec<ChannelStatistics> = models
        .iter()
        .map(|m| mean_covariance(&m.generated_data))
        .collect::<Result<_>>()?;

    let mut total = 0.0;
    for pair in stats.windows(2) {
        let like_mu = weight * mse(&pair[0].mean, &pair[1].mean);
        let like_cov = weight * 5.0 * mse(&pair[0].covariance, &pair[1].covariance);
        total += like_mu + like_cov;
    }
    Ok(total)
}
