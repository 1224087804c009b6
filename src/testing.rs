//! Toy network functions for unit tests
//!
//! Cheap stand-ins for real convolutional blocks: they honor the
//! [`GeneratorFn`]/[`DiscriminatorFn`] contracts (scoped parameters,
//! gradient population in train mode, update-op registration under batch
//! norm) without doing any real network math.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use ndarray::Array1;

use crate::error::Result;
use crate::model::{DiscriminatorFn, GeneratorFn, GeneratorInput, GeneratorOutput, Mode};
use crate::scope::ParamScope;
use crate::tensor::Tensor;

pub(crate) const CHANNELS: usize = 3;
pub(crate) const HIDDEN_CHANNELS: usize = 4;

fn sample_means(t: &Tensor) -> Vec<f32> {
    let shape = t.shape();
    let batch = shape[0];
    let per_sample = t.len() / batch;
    let data = t.data();
    (0..batch)
        .map(|n| {
            data.iter()
                .skip(n * per_sample)
                .take(per_sample)
                .sum::<f32>()
                / per_sample as f32
        })
        .collect()
}

/// Generator that emits `tanh(w_c + input mean)` at the requested
/// resolution and a hidden code carrying the per-sample input means.
pub(crate) struct ToyGenerator {
    registered_updates: RefCell<HashSet<String>>,
    /// Number of times a registered batch-norm update op has run
    pub bn_updates: Rc<Cell<usize>>,
}

impl ToyGenerator {
    pub fn new() -> Self {
        Self {
            registered_updates: RefCell::new(HashSet::new()),
            bn_updates: Rc::new(Cell::new(0)),
        }
    }
}

impl GeneratorFn for ToyGenerator {
    fn call(
        &self,
        scope: &ParamScope,
        inputs: &GeneratorInput,
        final_size: usize,
        apply_batch_norm: bool,
        mode: Mode,
    ) -> Result<GeneratorOutput> {
        let source = match inputs {
            GeneratorInput::Init { noise, .. } => noise,
            GeneratorInput::Stacked { hidden_code, .. } => hidden_code,
        };
        let batch = source.shape()[0];
        let means = sample_means(source);
        let cond_means = sample_means(inputs.conditioning());

        let w = scope.get_or_create_regularized("w", 1e-4, || {
            Tensor::from_vec((0..CHANNELS).map(|c| 0.05 * (c + 1) as f32).collect(), true)
        });

        let mut data = vec![0.0f32; batch * final_size * final_size * CHANNELS];
        {
            let w_data = w.data();
            for n in 0..batch {
                let base = 0.1 * means[n] + 0.05 * cond_means[n];
                for p in 0..final_size * final_size {
                    for c in 0..CHANNELS {
                        data[(n * final_size * final_size + p) * CHANNELS + c] =
                            (base + w_data[c]).tanh();
                    }
                }
            }
        }
        let generated = Tensor::from_shape_vec(
            &[batch, final_size, final_size, CHANNELS],
            data,
            false,
        );

        let mut hidden = vec![0.0f32; batch * final_size * final_size * HIDDEN_CHANNELS];
        for n in 0..batch {
            for i in 0..final_size * final_size * HIDDEN_CHANNELS {
                hidden[n * final_size * final_size * HIDDEN_CHANNELS + i] = means[n];
            }
        }
        let hidden_code = Tensor::from_shape_vec(
            &[batch, final_size, final_size, HIDDEN_CHANNELS],
            hidden,
            false,
        );

        if apply_batch_norm {
            let key = scope.path().to_string();
            if self.registered_updates.borrow_mut().insert(key) {
                let counter = Rc::clone(&self.bn_updates);
                scope.register_update_op("moving_stats", move || {
                    counter.set(counter.get() + 1);
                });
            }
        }
        if mode == Mode::Train {
            w.accumulate_grad(&Array1::from_elem(CHANNELS, 0.1));
        }

        Ok(GeneratorOutput {
            data: generated,
            hidden_code,
        })
    }
}

/// Discriminator scoring `w * mean(data) + mean(conditioning)` per sample
pub(crate) struct ToyDiscriminator {
    registered_updates: RefCell<HashSet<String>>,
    /// Number of times a registered batch-norm update op has run
    pub bn_updates: Rc<Cell<usize>>,
}

impl ToyDiscriminator {
    pub fn new() -> Self {
        Self {
            registered_updates: RefCell::new(HashSet::new()),
            bn_updates: Rc::new(Cell::new(0)),
        }
    }
}

impl DiscriminatorFn for ToyDiscriminator {
    fn call(
        &self,
        scope: &ParamScope,
        data: &Tensor,
        conditioning: &Tensor,
        apply_batch_norm: bool,
        mode: Mode,
    ) -> Result<Tensor> {
        let batch = data.shape()[0];
        let w = scope.get_or_create_regularized("w", 1e-4, || Tensor::from_vec(vec![1.0], true));

        let means = sample_means(data);
        let cond_means = sample_means(conditioning);
        let scores: Vec<f32> = {
            let w_data = w.data();
            (0..batch)
                .map(|n| w_data[0] * means[n] + 0.1 * cond_means[n])
                .collect()
        };

        if apply_batch_norm {
            let key = scope.path().to_string();
            if self.registered_updates.borrow_mut().insert(key) {
                let counter = Rc::clone(&self.bn_updates);
                scope.register_update_op("moving_stats", move || {
                    counter.set(counter.get() + 1);
                });
            }
        }
        if mode == Mode::Train {
            w.accumulate_grad(&Array1::from_elem(1, 0.05));
        }

        Ok(Tensor::from_shape_vec(&[batch], scores, false))
    }
}

/// Generator that ignores `final_size` and always emits `size`-resolution
/// output, for shape-mismatch tests.
pub(crate) struct FixedSizeGenerator {
    pub size: usize,
    inner: ToyGenerator,
}

impl FixedSizeGenerator {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            inner: ToyGenerator::new(),
        }
    }
}

impl GeneratorFn for FixedSizeGenerator {
    fn call(
        &self,
        scope: &ParamScope,
        inputs: &GeneratorInput,
        _final_size: usize,
        apply_batch_norm: bool,
        mode: Mode,
    ) -> Result<GeneratorOutput> {
        self.inner
            .call(scope, inputs, self.size, apply_batch_norm, mode)
    }
}
