//! Error types for stack construction and loss configuration

use thiserror::Error;

/// Errors raised while building a GAN stack or its losses and train ops.
///
/// Every variant is fatal at build time: generator scopes are
/// interdependent across stages, so no partial stack is usable.
#[derive(Debug, Error)]
pub enum StackGanError {
    /// A loss weight or configuration value is unusable: negative aux-loss
    /// weights, aux weights for a model variant that does not support them,
    /// or a real-data ladder that does not match the stack depth.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Generated data shape does not match the real data shape for a stage.
    #[error("shape mismatch at stage {stage}: generated {generated:?} vs real {real:?}")]
    ShapeMismatch {
        stage: usize,
        generated: Vec<usize>,
        real: Vec<usize>,
    },

    /// Real data supplied in prediction mode, or absent in train/eval mode.
    #[error("mode violation: {0}")]
    ModeViolation(String),
}

/// Result type for stack operations
pub type Result<T> = std::result::Result<T, StackGanError>;
