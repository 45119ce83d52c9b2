//! Shared helpers for kernel implementations.

use crate::error::KernelError;
use ndarray::{Array2, ArrayView2};

pub fn validate_matmul_inputs(
    lhs: &ArrayView2<'_, f32>,
    rhs: &ArrayView2<'_, f32>,
) -> Result<(), KernelError> {
    if lhs.ncols() != rhs.nrows() {
        return Err(KernelError::DimensionMismatch {
            lhs_rows: lhs.nrows(),
            lhs_cols: lhs.ncols(),
            rhs_rows: rhs.nrows(),
            rhs_cols: rhs.ncols(),
        });
    }
    Ok(())
}

pub fn validate_product_extents(
    lhs: &ArrayView2<'_, f32>,
    rhs: &ArrayView2<'_, f32>,
    dst_rows: usize,
    dst_cols: usize,
) -> Result<(), KernelError> {
    validate_matmul_inputs(lhs, rhs)?;
    if dst_rows != lhs.nrows() || dst_cols != rhs.ncols() {
        return Err(KernelError::DimensionMismatch {
            lhs_rows: lhs.nrows(),
            lhs_cols: rhs.ncols(),
            rhs_rows: dst_rows,
            rhs_cols: dst_cols,
        });
    }
    Ok(())
}

/// Fallibly allocates a zeroed row-major matrix.
///
/// Uses `try_reserve_exact` so an exhausted allocator surfaces as
/// [`KernelError::AllocationFailure`] instead of an abort.
pub fn try_zeroed(rows: usize, cols: usize) -> Result<Array2<f32>, KernelError> {
    let len = rows
        .checked_mul(cols)
        .ok_or_else(|| KernelError::AllocationFailure(format!("{rows}x{cols} overflows usize")))?;
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|err| KernelError::AllocationFailure(err.to_string()))?;
    data.resize(len, 0.0f32);
    Array2::from_shape_vec((rows, cols), data)
        .map_err(|err| KernelError::AllocationFailure(err.to_string()))
}
