//! Multi-head attention composition.
//!
//! Projects Q/K/V into `d_model` space, slices each projection into
//! `num_heads` column subspaces, runs scaled dot-product attention per head,
//! concatenates the head outputs in head order, and applies the output
//! projection.

use crate::attention::scaled_dot_product_attention;
use crate::config::AttentionShape;
use crate::error::KernelError;
use crate::matmul::MatmulKernel;
use crate::utils::try_zeroed;
use ndarray::{s, Array1, Array2, ArrayView2};
use rayon::prelude::*;
use tracing::debug;

/// Projection weights and biases for one attention block.
///
/// The bias vectors mirror the call interface but are not applied to any
/// projection; [`multi_head_attention`] accepts and ignores them.
#[derive(Debug, Clone)]
pub struct ProjectionWeights {
    pub wq: Array2<f32>,
    pub wk: Array2<f32>,
    pub wv: Array2<f32>,
    pub wo: Array2<f32>,
    pub bq: Array1<f32>,
    pub bk: Array1<f32>,
    pub bv: Array1<f32>,
    pub bo: Array1<f32>,
}

impl ProjectionWeights {
    pub fn new(wq: Array2<f32>, wk: Array2<f32>, wv: Array2<f32>, wo: Array2<f32>) -> Self {
        let d_model = wq.ncols();
        Self {
            wq,
            wk,
            wv,
            wo,
            bq: Array1::zeros(d_model),
            bk: Array1::zeros(d_model),
            bv: Array1::zeros(d_model),
            bo: Array1::zeros(d_model),
        }
    }

    pub fn with_biases(
        mut self,
        bq: Array1<f32>,
        bk: Array1<f32>,
        bv: Array1<f32>,
        bo: Array1<f32>,
    ) -> Self {
        self.bq = bq;
        self.bk = bk;
        self.bv = bv;
        self.bo = bo;
        self
    }

    /// Identity projections, useful for isolating the attention core.
    pub fn identity(d_model: usize) -> Self {
        Self::new(
            Array2::eye(d_model),
            Array2::eye(d_model),
            Array2::eye(d_model),
            Array2::eye(d_model),
        )
    }
}

/// Runs one multi-head attention forward pass and returns the
/// (seq_len × d_model) output.
///
/// Fails with [`KernelError::InvalidHeadCount`] before any computation when
/// `num_heads` does not divide `query.ncols()`. All intermediate buffers are
/// dropped before return on every path.
pub fn multi_head_attention(
    query: ArrayView2<'_, f32>,
    key: ArrayView2<'_, f32>,
    value: ArrayView2<'_, f32>,
    weights: &ProjectionWeights,
    num_heads: usize,
    kernel: &dyn MatmulKernel,
) -> Result<Array2<f32>, KernelError> {
    let shape = AttentionShape::new(query.nrows(), query.ncols(), num_heads);
    shape.validate()?;
    let d_k = shape.d_k();
    debug!(
        seq_len = shape.seq_len,
        d_model = shape.d_model,
        num_heads = shape.num_heads,
        d_k,
        kernel = kernel.name(),
        "multi-head attention forward pass"
    );

    let q_proj = kernel.run(query, weights.wq.view())?;
    let k_proj = kernel.run(key, weights.wk.view())?;
    let v_proj = kernel.run(value, weights.wv.view())?;

    let head_outputs = attend_heads(
        q_proj.view(),
        k_proj.view(),
        v_proj.view(),
        num_heads,
        d_k,
        kernel,
    )?;
    let concatenated = concat_heads(&head_outputs)?;

    kernel.run(concatenated.view(), weights.wo.view())
}

/// Runs scaled dot-product attention over each head's column slice of the
/// projected inputs.
///
/// Heads read disjoint slices and write private outputs, so they run as
/// parallel rayon tasks joined before the caller concatenates.
pub fn attend_heads(
    q_proj: ArrayView2<'_, f32>,
    k_proj: ArrayView2<'_, f32>,
    v_proj: ArrayView2<'_, f32>,
    num_heads: usize,
    d_k: usize,
    kernel: &dyn MatmulKernel,
) -> Result<Vec<Array2<f32>>, KernelError> {
    (0..num_heads)
        .into_par_iter()
        .map(|head| {
            let cols = head * d_k..(head + 1) * d_k;
            scaled_dot_product_attention(
                q_proj.slice(s![.., cols.clone()]),
                k_proj.slice(s![.., cols.clone()]),
                v_proj.slice(s![.., cols]),
                kernel,
                (d_k as f32).sqrt(),
            )
        })
        .collect()
}

/// Column-wise concatenation in head-index order: head 0 occupies columns
/// [0, d_k), head 1 occupies [d_k, 2·d_k), and so on.
///
/// Ragged inputs fail with [`KernelError::DimensionMismatch`] before any
/// allocation; the `lhs_*` fields carry the leading head's extents and the
/// `rhs_*` fields the offending head's.
pub fn concat_heads(heads: &[Array2<f32>]) -> Result<Array2<f32>, KernelError> {
    let (rows, head_cols) = heads.first().map_or((0, 0), |h| (h.nrows(), h.ncols()));
    for head in heads {
        if head.nrows() != rows {
            return Err(KernelError::DimensionMismatch {
                lhs_rows: rows,
                lhs_cols: head_cols,
                rhs_rows: head.nrows(),
                rhs_cols: head.ncols(),
            });
        }
    }

    let total_cols: usize = heads.iter().map(Array2::ncols).sum();
    let mut out = try_zeroed(rows, total_cols)?;
    let mut offset = 0;
    for head in heads {
        out.slice_mut(s![.., offset..offset + head.ncols()]).assign(head);
        offset += head.ncols();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matmul::ReferenceMatmul;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn sample_inputs(seq_len: usize, d_model: usize) -> (Array2<f32>, Array2<f32>, Array2<f32>) {
        let q = Array2::from_shape_fn((seq_len, d_model), |(i, j)| ((i * 7 + j) % 5) as f32 * 0.2);
        let k = Array2::from_shape_fn((seq_len, d_model), |(i, j)| ((i * 3 + j) % 7) as f32 * 0.15);
        let v = Array2::from_shape_fn((seq_len, d_model), |(i, j)| ((i + j * 2) % 4) as f32 * 0.25);
        (q, k, v)
    }

    #[test]
    fn uneven_head_count_fails_before_computation() {
        let (q, k, v) = sample_inputs(4, 8);
        let weights = ProjectionWeights::identity(8);
        let err = multi_head_attention(q.view(), k.view(), v.view(), &weights, 3, &ReferenceMatmul::new())
            .unwrap_err();
        assert!(matches!(
            err,
            KernelError::InvalidHeadCount {
                d_model: 8,
                num_heads: 3
            }
        ));
    }

    #[test]
    fn heads_concatenate_in_index_order() {
        let (q, k, v) = sample_inputs(4, 8);
        let kernel = ReferenceMatmul::new();
        let d_k = 4;

        let head0 = scaled_dot_product_attention(
            q.slice(s![.., 0..d_k]),
            k.slice(s![.., 0..d_k]),
            v.slice(s![.., 0..d_k]),
            &kernel,
            (d_k as f32).sqrt(),
        )
        .expect("head 0");
        let head1 = scaled_dot_product_attention(
            q.slice(s![.., d_k..2 * d_k]),
            k.slice(s![.., d_k..2 * d_k]),
            v.slice(s![.., d_k..2 * d_k]),
            &kernel,
            (d_k as f32).sqrt(),
        )
        .expect("head 1");

        let heads = attend_heads(q.view(), k.view(), v.view(), 2, d_k, &kernel).expect("heads");
        let concatenated = concat_heads(&heads).expect("concat");

        assert_eq!(concatenated.slice(s![.., 0..d_k]), head0);
        assert_eq!(concatenated.slice(s![.., d_k..2 * d_k]), head1);

        // With identity projections the end-to-end output is exactly the
        // concatenated per-head result.
        let weights = ProjectionWeights::identity(8);
        let output = multi_head_attention(q.view(), k.view(), v.view(), &weights, 2, &kernel)
            .expect("forward pass");
        for (a, b) in output.iter().zip(concatenated.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn ragged_head_outputs_fail_concatenation() {
        let heads = vec![Array2::<f32>::zeros((4, 2)), Array2::<f32>::zeros((3, 2))];
        let err = concat_heads(&heads).unwrap_err();
        assert!(matches!(
            err,
            KernelError::DimensionMismatch {
                lhs_rows: 4,
                lhs_cols: 2,
                rhs_rows: 3,
                rhs_cols: 2
            }
        ));
    }

    #[test]
    fn all_ones_inputs_with_identity_weights_yield_ones() {
        // Every score row is constant, so the weights are uniform and each
        // output row averages identical value rows.
        let q = Array2::from_elem((4, 8), 1.0f32);
        let weights = ProjectionWeights::identity(8);
        let output = multi_head_attention(
            q.view(),
            q.view(),
            q.view(),
            &weights,
            2,
            &ReferenceMatmul::new(),
        )
        .expect("forward pass");

        assert_eq!(output.dim(), (4, 8));
        for &x in output.iter() {
            assert_abs_diff_eq!(x, 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn forward_pass_is_bit_reproducible() {
        let (q, k, v) = sample_inputs(6, 8);
        let weights = ProjectionWeights::new(
            Array2::from_shape_fn((8, 8), |(i, j)| ((i * j) % 3) as f32 * 0.4),
            Array2::from_shape_fn((8, 8), |(i, j)| ((i + j) % 5) as f32 * 0.3),
            Array2::from_shape_fn((8, 8), |(i, j)| ((i * 2 + j) % 7) as f32 * 0.2),
            Array2::from_shape_fn((8, 8), |(i, j)| ((i + j * 3) % 4) as f32 * 0.1),
        );
        let kernel = ReferenceMatmul::new();

        let first = multi_head_attention(q.view(), k.view(), v.view(), &weights, 2, &kernel)
            .expect("first run");
        let second = multi_head_attention(q.view(), k.view(), v.view(), &weights, 2, &kernel)
            .expect("second run");

        assert_eq!(first, second);
    }

    #[test]
    fn biases_are_accepted_but_not_applied() {
        let (q, k, v) = sample_inputs(4, 8);
        let kernel = ReferenceMatmul::new();
        let plain = ProjectionWeights::identity(8);
        let biased = ProjectionWeights::identity(8).with_biases(
            Array1::from_elem(8, 5.0),
            Array1::from_elem(8, -3.0),
            Array1::from_elem(8, 0.7),
            Array1::from_elem(8, 9.9),
        );

        let without = multi_head_attention(q.view(), k.view(), v.view(), &plain, 2, &kernel)
            .expect("without biases");
        let with = multi_head_attention(q.view(), k.view(), v.view(), &biased, 2, &kernel)
            .expect("with biases");

        assert_eq!(without, with);
    }
}
