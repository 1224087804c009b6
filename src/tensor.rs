//! Shared-handle tensor with shape metadata and a gradient slot
//!
//! Cloning a `Tensor` is cheap and shares storage. This is what makes the
//! generator super-scope work: every stage holds the same parameter
//! handles, and one optimizer step is visible to the whole stack.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use ndarray::Array1;
use rand::Rng;

#[derive(Debug)]
struct TensorInner {
    data: Array1<f32>,
    shape: Vec<usize>,
    grad: Option<Array1<f32>>,
    requires_grad: bool,
}

/// N-dimensional tensor stored as a flat `Array1<f32>` plus explicit shape.
#[derive(Debug, Clone)]
pub struct Tensor(Rc<RefCell<TensorInner>>);

impl Tensor {
    /// Create a 1-D tensor from a vector
    #[must_use]
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        let shape = vec![data.len()];
        Self::from_shape_vec(&shape, data, requires_grad)
    }

    /// Create a tensor with an explicit shape; `data.len()` must equal the
    /// product of the shape dimensions.
    #[must_use]
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>, requires_grad: bool) -> Self {
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "shape {shape:?} does not match data length {}",
            data.len()
        );
        Self(Rc::new(RefCell::new(TensorInner {
            data: Array1::from_vec(data),
            shape: shape.to_vec(),
            grad: None,
            requires_grad,
        })))
    }

    /// Create a zero-filled 1-D tensor
    #[must_use]
    pub fn zeros(len: usize, requires_grad: bool) -> Self {
        Self::from_vec(vec![0.0; len], requires_grad)
    }

    /// Create a zero-filled tensor with an explicit shape
    #[must_use]
    pub fn zeros_shaped(shape: &[usize], requires_grad: bool) -> Self {
        Self::from_shape_vec(shape, vec![0.0; shape.iter().product()], requires_grad)
    }

    /// Sample a tensor from the standard normal distribution using the
    /// Box-Muller transform.
    pub fn randn<R: Rng>(shape: &[usize], rng: &mut R) -> Self {
        let len = shape.iter().product();
        let data: Vec<f32> = (0..len)
            .map(|_| {
                let u1: f64 = rng.random::<f64>().max(1e-10);
                let u2: f64 = rng.random::<f64>();
                ((-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()) as f32
            })
            .collect();
        Self::from_shape_vec(shape, data, false)
    }

    /// Borrow the flat data
    pub fn data(&self) -> Ref<'_, Array1<f32>> {
        Ref::map(self.0.borrow(), |inner| &inner.data)
    }

    /// Mutably borrow the flat data
    pub fn data_mut(&self) -> RefMut<'_, Array1<f32>> {
        RefMut::map(self.0.borrow_mut(), |inner| &mut inner.data)
    }

    /// Copy the data out as a vector
    #[must_use]
    pub fn to_vec(&self) -> Vec<f32> {
        self.0.borrow().data.to_vec()
    }

    /// Tensor shape
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.0.borrow().shape.clone()
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().data.len()
    }

    /// Whether the tensor holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this tensor participates in optimization
    #[must_use]
    pub fn requires_grad(&self) -> bool {
        self.0.borrow().requires_grad
    }

    /// Current gradient, if one has been populated
    #[must_use]
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.0.borrow().grad.clone()
    }

    /// Replace the gradient
    pub fn set_grad(&self, grad: Array1<f32>) {
        assert_eq!(grad.len(), self.len(), "gradient length must match tensor");
        self.0.borrow_mut().grad = Some(grad);
    }

    /// Add into the gradient, initializing it if absent
    pub fn accumulate_grad(&self, grad: &Array1<f32>) {
        assert_eq!(grad.len(), self.len(), "gradient length must match tensor");
        let mut inner = self.0.borrow_mut();
        match &mut inner.grad {
            Some(g) => *g += grad,
            None => inner.grad = Some(grad.clone()),
        }
    }

    /// Clear the gradient
    pub fn zero_grad(&self) {
        self.0.borrow_mut().grad = None;
    }

    /// Whether two handles share the same storage
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
