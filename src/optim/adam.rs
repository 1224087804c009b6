//! Adam optimizer

use ndarray::Array1;

use super::Optimizer;
use crate::tensor::Tensor;

/// Adam optimizer with bias-corrected first and second moments.
///
/// `gan_params` uses `beta1 = 0.5`: the usual 0.9 momentum is too sticky
/// for adversarial training, where the loss surface moves under the
/// optimizer every step.
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
    m: Vec<Option<Array1<f32>>>,
    v: Vec<Option<Array1<f32>>>,
}

impl Adam {
    /// Create a new Adam optimizer
    #[must_use]
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Create Adam with the standard parameters (beta1 = 0.9)
    #[must_use]
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    /// Create Adam with adversarial-training parameters (beta1 = 0.5)
    #[must_use]
    pub fn gan_params(lr: f32) -> Self {
        Self::new(lr, 0.5, 0.999, 1e-8)
    }

    fn ensure_moments(&mut self, count: usize) {
        if self.m.len() < count {
            self.m.resize(count, None);
            self.v.resize(count, None);
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_moments(params.len());
        self.t += 1;

        // Bias correction folded into the step size
        let lr_t = self.lr
            * ((1.0 - self.beta2.powi(self.t as i32)).sqrt()
                / (1.0 - self.beta1.powi(self.t as i32)));

        for (i, param) in params.iter_mut().enumerate() {
            if let Some(grad) = param.grad() {
                // m_t = β1 * m_{t-1} + (1 - β1) * g
                let m_t = if let Some(m) = &self.m[i] {
                    m * self.beta1 + &grad * (1.0 - self.beta1)
                } else {
                    &grad * (1.0 - self.beta1)
                };

                // v_t = β2 * v_{t-1} + (1 - β2) * g²
                let grad_sq = &grad * &grad;
                let v_t = if let Some(v) = &self.v[i] {
                    v * self.beta2 + &grad_sq * (1.0 - self.beta2)
                } else {
                    &grad_sq * (1.0 - self.beta2)
                };

                let update = &m_t / &(v_t.mapv(f32::sqrt) + self.epsilon) * lr_t;
                {
                    let mut data = param.data_mut();
                    *data = &*data - &update;
                }

                self.m[i] = Some(m_t);
                self.v[i] = Some(v_t);
            }
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}
