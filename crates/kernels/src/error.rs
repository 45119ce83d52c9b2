//! Typed errors for kernel contract violations.

use thiserror::Error;

/// Contract violations raised by the attention kernels.
///
/// Every variant is a programmer-facing precondition failure: fatal to the
/// call that raised it, never retried, and no partial output survives.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Two matrix extents disagree: a product's contraction dimensions, a
    /// caller-supplied destination, or head outputs with ragged row counts
    /// at concatenation. The `lhs_*` fields hold the expected extents and
    /// the `rhs_*` fields the offending ones.
    #[error("dimension mismatch: lhs {lhs_rows}x{lhs_cols} vs rhs {rhs_rows}x{rhs_cols}")]
    DimensionMismatch {
        lhs_rows: usize,
        lhs_cols: usize,
        rhs_rows: usize,
        rhs_cols: usize,
    },

    /// `num_heads` does not evenly divide `d_model`.
    #[error("d_model {d_model} is not divisible by num_heads {num_heads}")]
    InvalidHeadCount { d_model: usize, num_heads: usize },

    /// Temporary or output storage could not be obtained.
    #[error("buffer allocation failed: {0}")]
    AllocationFailure(String),
}
