use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};

/// Pure-Rust CPU compute backend.
///
/// Straightforward loops, no SIMD. Stateless, so one instance can be shared
/// by any number of concurrent evaluations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

fn same_len(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(TensorError::ShapeMismatch {
            expected: vec![a.len()],
            got: vec![b.len()],
        });
    }
    Ok(())
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

impl ComputeBackend for CpuBackend {
    fn matmul(&self, a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Result<Vec<f32>> {
        if m.checked_mul(k) != Some(a.len()) {
            return Err(TensorError::ShapeMismatch {
                expected: vec![m, k],
                got: vec![a.len()],
            });
        }
        if k.checked_mul(n) != Some(b.len()) {
            return Err(TensorError::ShapeMismatch {
                expected: vec![k, n],
                got: vec![b.len()],
            });
        }
        let len = m
            .checked_mul(n)
            .ok_or_else(|| TensorError::Other(format!("matmul output [{m}, {n}] is too large")))?;

        let mut c = vec![0.0f32; len];
        for i in 0..m {
            let row = &a[i * k..(i + 1) * k];
            let out = &mut c[i * n..(i + 1) * n];
            for (p, &av) in row.iter().enumerate() {
                let b_row = &b[p * n..(p + 1) * n];
                for (o, &bv) in out.iter_mut().zip(b_row) {
                    *o += av * bv;
                }
            }
        }
        Ok(c)
    }

    fn add(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        same_len(a, b)?;
        Ok(a.iter().zip(b).map(|(x, y)| x + y).collect())
    }

    fn relu(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(x.iter().map(|&v| v.max(0.0)).collect())
    }

    fn sigmoid(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(x.iter().map(|&v| sigmoid(v)).collect())
    }

    fn tanh(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(x.iter().map(|v| v.tanh()).collect())
    }

    fn silu(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(x.iter().map(|&v| v * sigmoid(v)).collect())
    }

    fn softmax(&self, x: &[f32], row_len: usize) -> Result<Vec<f32>> {
        if row_len == 0 || x.len() % row_len != 0 {
            return Err(TensorError::Other(format!(
                "softmax: x.len()={} is not a multiple of row_len={}",
                x.len(),
                row_len
            )));
        }

        let mut result = Vec::with_capacity(x.len());
        for row in x.chunks(row_len) {
            // Subtract the max for numerical stability
            let max_val = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exps: Vec<f32> = row.iter().map(|v| (v - max_val).exp()).collect();
            let sum: f32 = exps.iter().sum();
            result.extend(exps.into_iter().map(|e| e / sum));
        }
        Ok(result)
    }
}
