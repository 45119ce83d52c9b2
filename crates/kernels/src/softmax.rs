//! Row-wise softmax.

use ndarray::{ArrayViewMut2, Axis};
use rayon::prelude::*;

/// Replaces each row with its softmax, in place.
///
/// The row maximum is subtracted before any exponentiation so large
/// pre-activations cannot overflow. A row of bit-identical values maps to
/// the exactly uniform distribution, since every shifted entry is zero and
/// every exponential is exactly one.
pub fn softmax_inplace(mut scores: ArrayViewMut2<'_, f32>) {
    scores
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|mut row| {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            row -= max;
            row.mapv_inplace(|x| x.exp());
            let sum = row.sum();
            row /= sum.max(f32::EPSILON);
        });
}
