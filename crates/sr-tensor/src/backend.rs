use std::fmt::Debug;

use crate::error::Result;

/// Numeric kernels used by evaluator plugins.
///
/// All operations work on f32 slices and return owned vectors. Matrices are
/// row-major.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Matrix multiplication: C = A @ B.
    ///
    /// - `a`: row-major data of shape [m, k]
    /// - `b`: row-major data of shape [k, n]
    /// - Returns: row-major data of shape [m, n]
    fn matmul(&self, a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Result<Vec<f32>>;

    /// Element-wise addition: result[i] = a[i] + b[i].
    fn add(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>>;

    /// result[i] = max(x[i], 0).
    fn relu(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Logistic function: result[i] = 1 / (1 + exp(-x[i])).
    fn sigmoid(&self, x: &[f32]) -> Result<Vec<f32>>;

    fn tanh(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// SiLU activation: result[i] = x[i] * sigmoid(x[i]).
    fn silu(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Softmax over consecutive rows of `row_len` elements.
    ///
    /// For each row: result[i] = exp(x[i] - max(x)) / sum(exp(x[j] - max(x)))
    fn softmax(&self, x: &[f32], row_len: usize) -> Result<Vec<f32>>;
}
