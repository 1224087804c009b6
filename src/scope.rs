//! Explicit parameter-scope handles
//!
//! A `ParamScope` is a named ownership boundary for parameters and update
//! ops. The generator super-scope is created once and passed by handle into
//! every stage's generator construction call; each discriminator gets its
//! own root scope with an independent store. There is no ambient or global
//! scope lookup: whoever holds the handle owns the parameters.
//!
//! `get_or_create` is idempotent per path, so rebuilding a stage (for
//! example in eval mode after training) reuses the existing parameters
//! instead of creating fresh ones.

use std::cell::RefCell;
use std::rc::Rc;

use crate::tensor::Tensor;

struct ScopeEntry {
    path: String,
    tensor: Tensor,
    l2_weight: f32,
}

/// A deferred non-gradient update (e.g. batch-norm moving statistics),
/// registered under a scope path and run by the train op that owns that
/// scope subtree.
#[derive(Clone)]
pub struct UpdateOp {
    path: String,
    op: Rc<RefCell<dyn FnMut()>>,
}

impl UpdateOp {
    /// Scope path this op was registered under
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Execute the update
    pub fn run(&self) {
        (self.op.borrow_mut())();
    }
}

#[derive(Default)]
struct ScopeStore {
    entries: Vec<ScopeEntry>,
    update_ops: Vec<UpdateOp>,
}

/// Handle to a parameter scope: a path prefix into a shared store.
///
/// Subscopes share their parent's store, so parameters declared at any
/// depth are discoverable from the root handle as one set. Scopes created
/// with [`ParamScope::root`] own independent stores.
#[derive(Clone)]
pub struct ParamScope {
    path: String,
    store: Rc<RefCell<ScopeStore>>,
}

impl ParamScope {
    /// Create a new root scope with its own parameter store
    #[must_use]
    pub fn root(name: &str) -> Self {
        Self {
            path: name.to_string(),
            store: Rc::new(RefCell::new(ScopeStore::default())),
        }
    }

    /// Create a nested scope sharing this scope's store
    #[must_use]
    pub fn subscope(&self, name: &str) -> Self {
        Self {
            path: format!("{}/{}", self.path, name),
            store: Rc::clone(&self.store),
        }
    }

    /// Full path of this scope
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether two handles name the same scope in the same store
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store) && self.path == other.path
    }

    /// Whether two handles share one underlying store (possibly at
    /// different paths)
    #[must_use]
    pub fn shares_store(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }

    /// Look up a parameter by name, creating it via `init` on first use.
    ///
    /// Repeated calls with the same name return the same handle.
    pub fn get_or_create<F>(&self, name: &str, init: F) -> Tensor
    where
        F: FnOnce() -> Tensor,
    {
        self.get_or_create_regularized(name, 0.0, init)
    }

    /// Like [`get_or_create`](Self::get_or_create), with an L2 penalty
    /// weight that [`regularization_loss`](Self::regularization_loss)
    /// accounts for.
    pub fn get_or_create_regularized<F>(&self, name: &str, l2_weight: f32, init: F) -> Tensor
    where
        F: FnOnce() -> Tensor,
    {
        let full_path = format!("{}/{}", self.path, name);
        {
            let store = self.store.borrow();
            if let Some(entry) = store.entries.iter().find(|e| e.path == full_path) {
                return entry.tensor.clone();
            }
        }
        let tensor = init();
        self.store.borrow_mut().entries.push(ScopeEntry {
            path: full_path,
            tensor: tensor.clone(),
            l2_weight,
        });
        tensor
    }

    /// Register a deferred update op under this scope
    pub fn register_update_op<F>(&self, name: &str, op: F)
    where
        F: FnMut() + 'static,
    {
        let path = format!("{}/{}", self.path, name);
        self.store.borrow_mut().update_ops.push(UpdateOp {
            path,
            op: Rc::new(RefCell::new(op)),
        });
    }

    fn contains_path(&self, path: &str) -> bool {
        path == self.path || path.starts_with(&format!("{}/", self.path))
    }

    /// All trainable parameters declared under this scope (inclusive of
    /// subscopes), in declaration order.
    #[must_use]
    pub fn trainable_params(&self) -> Vec<Tensor> {
        self.store
            .borrow()
            .entries
            .iter()
            .filter(|e| self.contains_path(&e.path) && e.tensor.requires_grad())
            .map(|e| e.tensor.clone())
            .collect()
    }

    /// Update ops registered under this scope subtree, in registration
    /// order. Ops outside the subtree are never returned, which is what
    /// keeps discriminator-side updates out of the generator train step.
    #[must_use]
    pub fn update_ops(&self) -> Vec<UpdateOp> {
        self.store
            .borrow()
            .update_ops
            .iter()
            .filter(|op| self.contains_path(&op.path))
            .cloned()
            .collect()
    }

    /// Weight-regularization loss for this scope subtree:
    /// `sum(l2_weight * ||w||^2)` over regularized parameters.
    #[must_use]
    pub fn regularization_loss(&self) -> f32 {
        self.store
            .borrow()
            .entries
            .iter()
            .filter(|e| self.contains_path(&e.path) && e.l2_weight > 0.0)
            .map(|e| e.l2_weight * e.tensor.data().iter().map(|w| w * w).sum::<f32>())
            .sum()
    }
}

impl std::fmt::Debug for ParamScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamScope")
            .field("path", &self.path)
            .field("entries", &self.store.borrow().entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let scope = ParamScope::root("generator");
        let a = scope.get_or_create("w", || Tensor::zeros(4, true));
        let b = scope.get_or_create("w", || Tensor::from_vec(vec![9.0; 4], true));
        assert!(a.ptr_eq(&b));
        assert_eq!(b.data()[0], 0.0);
    }

    #[test]
    fn test_subscope_params_visible_from_root() {
        let root = ParamScope::root("generator");
        let s0 = root.subscope("stage_0");
        let s1 = root.subscope("stage_1");
        s0.get_or_create("w", || Tensor::zeros(2, true));
        s1.get_or_create("w", || Tensor::zeros(3, true));

        assert_eq!(root.trainable_params().len(), 2);
        assert_eq!(s0.trainable_params().len(), 1);
        assert!(root.shares_store(&s0));
        assert!(!root.ptr_eq(&s0));
    }

    #[test]
    fn test_prefix_matching_respects_path_boundaries() {
        let root = ParamScope::root("generator");
        let a = root.subscope("stage_1");
        let b = root.subscope("stage_10");
        a.get_or_create("w", || Tensor::zeros(1, true));
        b.get_or_create("w", || Tensor::zeros(1, true));

        assert_eq!(a.trainable_params().len(), 1);
        assert_eq!(b.trainable_params().len(), 1);
    }

    #[test]
    fn test_non_trainable_params_excluded() {
        let scope = ParamScope::root("generator");
        scope.get_or_create("w", || Tensor::zeros(2, true));
        scope.get_or_create("buffer", || Tensor::zeros(2, false));
        assert_eq!(scope.trainable_params().len(), 1);
    }

    #[test]
    fn test_separate_roots_are_disjoint() {
        let d0 = ParamScope::root("discriminator_stage_0");
        let d1 = ParamScope::root("discriminator_stage_1");
        d0.get_or_create("w", || Tensor::zeros(2, true));
        d1.get_or_create("w", || Tensor::zeros(2, true));

        assert!(!d0.shares_store(&d1));
        let p0 = d0.trainable_params();
        let p1 = d1.trainable_params();
        assert!(!p0[0].ptr_eq(&p1[0]));
    }

    #[test]
    fn test_update_ops_are_scope_filtered() {
        let gen = ParamScope::root("generator");
        let dis = ParamScope::root("discriminator_stage_0");
        let counter = Rc::new(RefCell::new(0));

        let c = Rc::clone(&counter);
        gen.subscope("stage_0")
            .register_update_op("bn_stats", move || *c.borrow_mut() += 1);
        let c = Rc::clone(&counter);
        dis.register_update_op("bn_stats", move || *c.borrow_mut() += 100);

        let gen_ops = gen.update_ops();
        assert_eq!(gen_ops.len(), 1);
        for op in &gen_ops {
            op.run();
        }
        assert_eq!(*counter.borrow(), 1);
    }

    #[test]
    fn test_regularization_loss() {
        let scope = ParamScope::root("discriminator_stage_0");
        scope.get_or_create_regularized("w", 0.5, || Tensor::from_vec(vec![2.0, 2.0], true));
        scope.get_or_create("b", || Tensor::from_vec(vec![10.0], true));

        // 0.5 * (4 + 4); unregularized b contributes nothing.
        assert!((scope.regularization_loss() - 4.0).abs() < 1e-6);
    }
}
