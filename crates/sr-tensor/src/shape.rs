use std::fmt;

use crate::error::{Result, TensorError};

/// Ordered dimension sizes of a tensor, outermost first.
///
/// The empty shape is a scalar and covers exactly one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// The rank-0 shape.
    pub fn scalar() -> Self {
        Shape::default()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Rank.
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Element count; 1 for a scalar, 0 if any dimension is 0.
    ///
    /// Saturates at `usize::MAX` for shapes too large to address.
    pub fn numel(&self) -> usize {
        self.checked_numel().unwrap_or(usize::MAX)
    }

    /// Element count, or `None` when the product overflows `usize`.
    pub fn checked_numel(&self) -> Option<usize> {
        if self.dims.contains(&0) {
            return Some(0);
        }
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// The same dims with every size-1 dimension removed.
    pub fn squeeze(&self) -> Shape {
        Shape::new(self.dims.iter().copied().filter(|&d| d != 1).collect())
    }

    /// Outermost dimension, which is the batch dimension for batched inputs.
    pub fn leading_dim(&self) -> Option<usize> {
        self.dims.first().copied()
    }

    /// Row-major strides, e.g. `[12, 4, 1]` for `[2, 3, 4]`.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides: Vec<usize> = self
            .dims
            .iter()
            .rev()
            .scan(1usize, |acc, &d| {
                let stride = *acc;
                *acc = acc.saturating_mul(d);
                Some(stride)
            })
            .collect();
        strides.reverse();
        strides
    }

    /// Row-major flat offset of a multi-dimensional index.
    pub fn flat_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.ndim() {
            return Err(TensorError::RankMismatch {
                expected: self.ndim(),
                got: index.len(),
            });
        }
        index
            .iter()
            .zip(&self.dims)
            .zip(self.strides())
            .try_fold(0, |offset, ((&i, &len), stride)| {
                if i < len {
                    Ok(offset + i * stride)
                } else {
                    Err(TensorError::IndexOutOfBounds { index: i, len })
                }
            })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        write!(f, "[{}]", dims.join(", "))
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::new(dims.to_vec())
    }
}
