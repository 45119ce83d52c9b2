//! Scaled dot-product attention for a single head.

use crate::error::KernelError;
use crate::matmul::MatmulKernel;
use crate::softmax::softmax_inplace;
use ndarray::{Array2, ArrayView2};

/// Computes `softmax(Q · Kᵀ / dk_sqrt) · V`.
///
/// `query` is (s_q × d_k), `key` is (s_k × d_k), `value` is (s_k × d_v);
/// the output is (s_q × d_v). The softmax weights are non-negative and sum
/// to one per row, so every output row is a convex combination of `value`'s
/// rows. The scores temporary is dropped on every path, including the
/// dimension-mismatch early returns.
pub fn scaled_dot_product_attention(
    query: ArrayView2<'_, f32>,
    key: ArrayView2<'_, f32>,
    value: ArrayView2<'_, f32>,
    kernel: &dyn MatmulKernel,
    dk_sqrt: f32,
) -> Result<Array2<f32>, KernelError> {
    let mut scores = kernel.run(query, key.t())?;
    scores /= dk_sqrt;
    softmax_inplace(scores.view_mut());
    kernel.run(scores.view(), value)
}
