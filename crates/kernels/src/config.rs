//! Attention problem descriptors.

use crate::error::KernelError;
use serde::{Deserialize, Serialize};

/// Dimensions of one multi-head attention forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttentionShape {
    pub seq_len: usize,
    pub d_model: usize,
    pub num_heads: usize,
}

impl AttentionShape {
    pub fn new(seq_len: usize, d_model: usize, num_heads: usize) -> Self {
        Self {
            seq_len,
            d_model,
            num_heads,
        }
    }

    /// Per-head subspace width.
    pub fn d_k(&self) -> usize {
        self.d_model / self.num_heads
    }

    pub fn validate(&self) -> Result<(), KernelError> {
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            return Err(KernelError::InvalidHeadCount {
                d_model: self.d_model,
                num_heads: self.num_heads,
            });
        }
        Ok(())
    }

    /// Forward-pass flop estimate: four d_model projections plus the score
    /// and weighted-sum products across all heads.
    pub fn flops(&self) -> f64 {
        let s = self.seq_len as f64;
        let d = self.d_model as f64;
        8.0 * s * d * d + 4.0 * s * s * d
    }
}
