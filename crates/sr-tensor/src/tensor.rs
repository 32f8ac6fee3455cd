use std::sync::Arc;

use half::f16;

use crate::dtype::DataType;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::{Element, Scalar, TensorData};

/// An immutable, typed, multi-dimensional array.
///
/// The buffer is shared behind an `Arc`, so clones are cheap and a tensor can
/// be handed to concurrent evaluations without copying. Nothing mutates a
/// tensor after construction; reshaping produces a new value.
#[derive(Debug, Clone)]
pub struct Tensor {
    storage: Arc<TensorData>,
    shape: Shape,
}

impl Tensor {
    /// Create a tensor from a declared dtype, a shape and a buffer.
    ///
    /// Fails when the buffer's element kind disagrees with `dtype` or when
    /// `shape.numel() != data.len()`.
    pub fn new(dtype: DataType, shape: impl Into<Shape>, data: TensorData) -> Result<Tensor> {
        if data.dtype() != dtype {
            return Err(TensorError::DTypeMismatch {
                expected: dtype,
                got: data.dtype(),
            });
        }
        Self::from_data(shape, data)
    }

    /// Create a tensor whose dtype is inferred from the buffer.
    pub fn from_data(shape: impl Into<Shape>, data: TensorData) -> Result<Tensor> {
        let shape = shape.into();
        if shape.checked_numel() != Some(data.len()) {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor {
            storage: Arc::new(data),
            shape,
        })
    }

    /// 1-D tensor of shape `[values.len()]`.
    pub fn from_vec<T: Element>(values: Vec<T>) -> Tensor {
        let shape = Shape::new(vec![values.len()]);
        Tensor {
            storage: Arc::new(T::into_data(values)),
            shape,
        }
    }

    /// N-D tensor; fails if the shape does not cover exactly `values.len()` elements.
    pub fn from_shape_vec<T: Element>(shape: impl Into<Shape>, values: Vec<T>) -> Result<Tensor> {
        Self::from_data(shape, T::into_data(values))
    }

    /// Rank-0 tensor holding a single element.
    pub fn scalar<T: Element>(value: T) -> Tensor {
        Tensor {
            storage: Arc::new(T::into_data(vec![value])),
            shape: Shape::scalar(),
        }
    }

    pub fn from_bool_data(values: Vec<bool>) -> Tensor {
        Self::from_vec(values)
    }

    pub fn from_i8_data(values: Vec<i8>) -> Tensor {
        Self::from_vec(values)
    }

    pub fn from_i16_data(values: Vec<i16>) -> Tensor {
        Self::from_vec(values)
    }

    pub fn from_i32_data(values: Vec<i32>) -> Tensor {
        Self::from_vec(values)
    }

    pub fn from_i64_data(values: Vec<i64>) -> Tensor {
        Self::from_vec(values)
    }

    pub fn from_f16_data(values: Vec<f16>) -> Tensor {
        Self::from_vec(values)
    }

    pub fn from_f32_data(values: Vec<f32>) -> Tensor {
        Self::from_vec(values)
    }

    pub fn from_f64_data(values: Vec<f64>) -> Tensor {
        Self::from_vec(values)
    }

    pub fn from_string_data<S: Into<String>>(values: Vec<S>) -> Tensor {
        Self::from_vec(values.into_iter().map(Into::into).collect::<Vec<String>>())
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DataType {
        self.storage.dtype()
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Read-only view of the underlying buffer.
    pub fn data(&self) -> &TensorData {
        &self.storage
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.storage.len()
    }

    /// Typed view of the buffer.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        T::slice(&self.storage).ok_or(TensorError::DTypeMismatch {
            expected: T::DTYPE,
            got: self.dtype(),
        })
    }

    /// Element at a row-major flat offset.
    pub fn get(&self, index: usize) -> Result<Scalar> {
        self.storage.get(index).ok_or(TensorError::IndexOutOfBounds {
            index,
            len: self.numel(),
        })
    }

    /// Element at a multi-dimensional index.
    pub fn get_at(&self, index: &[usize]) -> Result<Scalar> {
        let flat = self.shape.flat_index(index)?;
        self.get(flat)
    }

    /// A new tensor sharing this buffer under a different shape.
    ///
    /// One dimension may be negative, in which case it is inferred from the
    /// element count. The total number of elements must remain the same.
    pub fn reshape(&self, dims: &[i64]) -> Result<Tensor> {
        let error = || TensorError::Reshape {
            from: self.shape.dims().to_vec(),
            into: dims.to_vec(),
        };
        let mut inferred = None;
        let mut resolved = Vec::with_capacity(dims.len());
        for (axis, &d) in dims.iter().enumerate() {
            match usize::try_from(d) {
                Ok(d) => resolved.push(d),
                Err(_) if inferred.is_none() => {
                    inferred = Some(axis);
                    resolved.push(1);
                }
                Err(_) => return Err(error()),
            }
        }
        if let Some(axis) = inferred {
            let known = Shape::new(resolved.clone())
                .checked_numel()
                .ok_or_else(error)?;
            if known == 0 || self.numel() % known != 0 {
                return Err(error());
            }
            resolved[axis] = self.numel() / known;
        }

        let shape = Shape::new(resolved);
        if shape.checked_numel() != Some(self.numel()) {
            return Err(error());
        }
        Ok(Tensor {
            storage: Arc::clone(&self.storage),
            shape,
        })
    }

    /// The same elements as a 1-D tensor.
    pub fn flatten(&self) -> Tensor {
        Tensor {
            storage: Arc::clone(&self.storage),
            shape: Shape::new(vec![self.numel()]),
        }
    }

    /// The same elements with every size-1 dimension dropped.
    pub fn squeeze(&self) -> Tensor {
        Tensor {
            storage: Arc::clone(&self.storage),
            shape: self.shape.squeeze(),
        }
    }

    /// Copy out the block starting at `begin` and spanning `size`.
    ///
    /// Both need one entry per dimension, and each `begin` must fall inside
    /// its dimension.
    pub fn slice(&self, begin: &[usize], size: &[usize]) -> Result<Tensor> {
        let dims = self.shape.dims();
        for got in [begin.len(), size.len()] {
            if got != dims.len() {
                return Err(TensorError::RankMismatch {
                    expected: dims.len(),
                    got,
                });
            }
        }
        if dims.is_empty() {
            return Err(TensorError::Other("cannot slice a scalar tensor".into()));
        }
        for ((&b, &s), &len) in begin.iter().zip(size).zip(dims) {
            if b >= len {
                return Err(TensorError::IndexOutOfBounds { index: b, len });
            }
            match b.checked_add(s) {
                Some(end) if end <= len => {}
                _ => {
                    return Err(TensorError::IndexOutOfBounds {
                        index: b.saturating_add(s) - 1,
                        len,
                    })
                }
            }
        }

        let shape = Shape::new(size.to_vec());
        let src_strides = self.shape.strides();
        let out_strides = shape.strides();
        let indices: Vec<usize> = (0..shape.numel())
            .map(|flat| {
                out_strides
                    .iter()
                    .zip(&src_strides)
                    .zip(begin.iter().zip(size))
                    .map(|((&os, &ss), (&b, &s))| (b + flat / os % s) * ss)
                    .sum::<usize>()
            })
            .collect();
        Ok(Tensor {
            storage: Arc::new(self.storage.gather(&indices)),
            shape,
        })
    }

    /// Join `other` after `self` along `axis`.
    ///
    /// Scalars count as `[1]`. Every dimension except `axis` must match.
    pub fn concat(&self, other: &Tensor, axis: usize) -> Result<Tensor> {
        let dtype_mismatch = || TensorError::DTypeMismatch {
            expected: self.dtype(),
            got: other.dtype(),
        };
        if self.dtype() != other.dtype() {
            return Err(dtype_mismatch());
        }
        let a = self.dims_at_least_1d();
        let b = other.dims_at_least_1d();
        if a.len() != b.len() {
            return Err(TensorError::RankMismatch {
                expected: a.len(),
                got: b.len(),
            });
        }
        if axis >= a.len() {
            return Err(TensorError::IndexOutOfBounds {
                index: axis,
                len: a.len(),
            });
        }
        let shape_mismatch = || TensorError::ShapeMismatch {
            expected: a.clone(),
            got: b.clone(),
        };
        let differs = a
            .iter()
            .zip(&b)
            .enumerate()
            .any(|(i, (x, y))| i != axis && x != y);
        if differs {
            return Err(shape_mismatch());
        }

        let mut dims = a.clone();
        dims[axis] = a[axis].checked_add(b[axis]).ok_or_else(shape_mismatch)?;
        let shape = Shape::new(dims);
        let total = shape.checked_numel().ok_or_else(shape_mismatch)?;
        let data = if total == 0 {
            TensorData::from_scalars(self.dtype(), Vec::new())?
        } else {
            // Every dim is non-zero here, so the prefix product cannot overflow.
            let outer: usize = a[..axis].iter().product();
            self.storage
                .interleave(&other.storage, outer, self.numel() / outer, other.numel() / outer)
                .ok_or_else(dtype_mismatch)?
        };
        Ok(Tensor {
            storage: Arc::new(data),
            shape,
        })
    }

    fn dims_at_least_1d(&self) -> Vec<usize> {
        if self.shape.is_scalar() {
            vec![1]
        } else {
            self.shape.dims().to_vec()
        }
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.storage == other.storage
    }
}
