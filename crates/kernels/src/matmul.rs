//! Dense matrix multiplication kernels.
//!
//! The attention pipeline treats the dense multiply as a replaceable
//! primitive behind [`MatmulKernel`]; everything above it composes kernels
//! without caring which implementation runs.

use crate::error::KernelError;
use crate::utils::{try_zeroed, validate_matmul_inputs, validate_product_extents};
use ndarray::linalg::general_mat_mul;
use ndarray::{Array2, ArrayView2, ArrayViewMut2, Axis};
use rayon::prelude::*;
use std::sync::Arc;

pub trait MatmulKernel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Computes `lhs · rhs` into a freshly allocated output.
    fn run(
        &self,
        lhs: ArrayView2<'_, f32>,
        rhs: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>, KernelError>;

    /// Computes `lhs · rhs` into a caller-supplied destination, overwriting
    /// every element without reading prior contents. The destination extents
    /// must equal the product shape.
    fn run_into(
        &self,
        lhs: ArrayView2<'_, f32>,
        rhs: ArrayView2<'_, f32>,
        mut dst: ArrayViewMut2<'_, f32>,
    ) -> Result<(), KernelError> {
        validate_product_extents(&lhs, &rhs, dst.nrows(), dst.ncols())?;
        let out = self.run(lhs, rhs)?;
        dst.assign(&out);
        Ok(())
    }
}

pub type DynMatmulKernel = Arc<dyn MatmulKernel>;

/// Delegates to ndarray's optimized dense product.
#[derive(Default)]
pub struct ReferenceMatmul;

impl ReferenceMatmul {
    pub fn new() -> Self {
        Self
    }
}

impl MatmulKernel for ReferenceMatmul {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn run(
        &self,
        lhs: ArrayView2<'_, f32>,
        rhs: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>, KernelError> {
        validate_matmul_inputs(&lhs, &rhs)?;
        Ok(lhs.dot(&rhs))
    }

    fn run_into(
        &self,
        lhs: ArrayView2<'_, f32>,
        rhs: ArrayView2<'_, f32>,
        mut dst: ArrayViewMut2<'_, f32>,
    ) -> Result<(), KernelError> {
        validate_product_extents(&lhs, &rhs, dst.nrows(), dst.ncols())?;
        // beta = 0 overwrites dst without reading it.
        general_mat_mul(1.0, &lhs, &rhs, 0.0, &mut dst);
        Ok(())
    }
}

/// Row-parallel multiply over rayon.
#[derive(Default)]
pub struct ParallelMatmul;

impl ParallelMatmul {
    pub fn new() -> Self {
        Self
    }
}

impl MatmulKernel for ParallelMatmul {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn run(
        &self,
        lhs: ArrayView2<'_, f32>,
        rhs: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>, KernelError> {
        validate_matmul_inputs(&lhs, &rhs)?;

        let mut output = try_zeroed(lhs.nrows(), rhs.ncols())?;
        output
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row_idx, mut row)| {
                let lhs_row = lhs.row(row_idx);
                for (col_idx, value) in row.iter_mut().enumerate() {
                    *value = lhs_row.dot(&rhs.column(col_idx));
                }
            });

        Ok(output)
    }
}
