use half::f16;

use crate::dtype::DataType;
use crate::error::{Result, TensorError};

/// Homogeneous, contiguous, row-major element buffer.
///
/// One variant per `DataType`, so a buffer's element kind is always known
/// without runtime casts.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float16(Vec<f16>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
}

/// A single owned tensor element.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float16(f16),
    Float32(f32),
    Float64(f64),
    String(String),
}

/// Dispatches `$body` over every variant of a `TensorData`, binding the
/// inner vector to `$v`.
macro_rules! each_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            TensorData::Bool($v) => $body,
            TensorData::Int8($v) => $body,
            TensorData::Int16($v) => $body,
            TensorData::Int32($v) => $body,
            TensorData::Int64($v) => $body,
            TensorData::Float16($v) => $body,
            TensorData::Float32($v) => $body,
            TensorData::Float64($v) => $body,
            TensorData::String($v) => $body,
        }
    };
}

/// Like `each_variant!`, but rebuilds the same variant from `$body`.
macro_rules! map_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            TensorData::Bool($v) => TensorData::Bool($body),
            TensorData::Int8($v) => TensorData::Int8($body),
            TensorData::Int16($v) => TensorData::Int16($body),
            TensorData::Int32($v) => TensorData::Int32($body),
            TensorData::Int64($v) => TensorData::Int64($body),
            TensorData::Float16($v) => TensorData::Float16($body),
            TensorData::Float32($v) => TensorData::Float32($body),
            TensorData::Float64($v) => TensorData::Float64($body),
            TensorData::String($v) => TensorData::String($body),
        }
    };
}

/// Pairs two buffers of the same variant; `None` when the variants differ.
macro_rules! zip_variants {
    ($a:expr, $b:expr, ($x:ident, $y:ident) => $body:expr) => {
        match ($a, $b) {
            (TensorData::Bool($x), TensorData::Bool($y)) => Some(TensorData::Bool($body)),
            (TensorData::Int8($x), TensorData::Int8($y)) => Some(TensorData::Int8($body)),
            (TensorData::Int16($x), TensorData::Int16($y)) => Some(TensorData::Int16($body)),
            (TensorData::Int32($x), TensorData::Int32($y)) => Some(TensorData::Int32($body)),
            (TensorData::Int64($x), TensorData::Int64($y)) => Some(TensorData::Int64($body)),
            (TensorData::Float16($x), TensorData::Float16($y)) => Some(TensorData::Float16($body)),
            (TensorData::Float32($x), TensorData::Float32($y)) => Some(TensorData::Float32($body)),
            (TensorData::Float64($x), TensorData::Float64($y)) => Some(TensorData::Float64($body)),
            (TensorData::String($x), TensorData::String($y)) => Some(TensorData::String($body)),
            _ => None,
        }
    };
}

impl TensorData {
    /// Number of elements in this buffer.
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    /// Returns true if the buffer contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the dtype of this buffer.
    pub fn dtype(&self) -> DataType {
        match self {
            TensorData::Bool(_) => DataType::Bool,
            TensorData::Int8(_) => DataType::Int8,
            TensorData::Int16(_) => DataType::Int16,
            TensorData::Int32(_) => DataType::Int32,
            TensorData::Int64(_) => DataType::Int64,
            TensorData::Float16(_) => DataType::Float16,
            TensorData::Float32(_) => DataType::Float32,
            TensorData::Float64(_) => DataType::Float64,
            TensorData::String(_) => DataType::String,
        }
    }

    /// Element at flat offset `i`, or `None` when out of range.
    pub fn get(&self, i: usize) -> Option<Scalar> {
        match self {
            TensorData::Bool(v) => v.get(i).copied().map(Scalar::Bool),
            TensorData::Int8(v) => v.get(i).copied().map(Scalar::Int8),
            TensorData::Int16(v) => v.get(i).copied().map(Scalar::Int16),
            TensorData::Int32(v) => v.get(i).copied().map(Scalar::Int32),
            TensorData::Int64(v) => v.get(i).copied().map(Scalar::Int64),
            TensorData::Float16(v) => v.get(i).copied().map(Scalar::Float16),
            TensorData::Float32(v) => v.get(i).copied().map(Scalar::Float32),
            TensorData::Float64(v) => v.get(i).copied().map(Scalar::Float64),
            TensorData::String(v) => v.get(i).cloned().map(Scalar::String),
        }
    }

    /// Iterate over all elements as owned scalars.
    pub fn scalars(&self) -> impl Iterator<Item = Scalar> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// A new buffer holding the elements at `indices`, in that order.
    ///
    /// Every index must be in range.
    pub(crate) fn gather(&self, indices: &[usize]) -> TensorData {
        map_variant!(self, v => indices.iter().map(|&i| v[i].clone()).collect())
    }

    /// Alternate `outer` chunks of `a_chunk` elements from `self` with chunks
    /// of `b_chunk` elements from `other`.
    ///
    /// Returns `None` when the buffers hold different dtypes. Both buffers
    /// must hold exactly `outer` chunks.
    pub(crate) fn interleave(
        &self,
        other: &TensorData,
        outer: usize,
        a_chunk: usize,
        b_chunk: usize,
    ) -> Option<TensorData> {
        zip_variants!(self, other, (x, y) => {
            let mut out = Vec::with_capacity(x.len() + y.len());
            for o in 0..outer {
                out.extend_from_slice(&x[o * a_chunk..(o + 1) * a_chunk]);
                out.extend_from_slice(&y[o * b_chunk..(o + 1) * b_chunk]);
            }
            out
        })
    }

    /// Numeric elements widened to f64, or `None` for bool and string buffers.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            TensorData::Int8(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TensorData::Int16(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TensorData::Int32(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TensorData::Int64(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TensorData::Float16(v) => Some(v.iter().map(|x| x.to_f64()).collect()),
            TensorData::Float32(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TensorData::Float64(v) => Some(v.clone()),
            TensorData::Bool(_) | TensorData::String(_) => None,
        }
    }

    /// Build a buffer of `dtype` from owned scalars.
    ///
    /// Every scalar must already be of `dtype`.
    pub fn from_scalars(dtype: DataType, values: Vec<Scalar>) -> Result<TensorData> {
        fn collect<T>(
            dtype: DataType,
            values: Vec<Scalar>,
            pick: impl Fn(Scalar) -> std::result::Result<T, Scalar>,
        ) -> Result<Vec<T>> {
            values
                .into_iter()
                .map(|s| {
                    pick(s).map_err(|other| TensorError::DTypeMismatch {
                        expected: dtype,
                        got: other.dtype(),
                    })
                })
                .collect()
        }

        Ok(match dtype {
            DataType::Bool => TensorData::Bool(collect(dtype, values, |s| match s {
                Scalar::Bool(v) => Ok(v),
                other => Err(other),
            })?),
            DataType::Int8 => TensorData::Int8(collect(dtype, values, |s| match s {
                Scalar::Int8(v) => Ok(v),
                other => Err(other),
            })?),
            DataType::Int16 => TensorData::Int16(collect(dtype, values, |s| match s {
                Scalar::Int16(v) => Ok(v),
                other => Err(other),
            })?),
            DataType::Int32 => TensorData::Int32(collect(dtype, values, |s| match s {
                Scalar::Int32(v) => Ok(v),
                other => Err(other),
            })?),
            DataType::Int64 => TensorData::Int64(collect(dtype, values, |s| match s {
                Scalar::Int64(v) => Ok(v),
                other => Err(other),
            })?),
            DataType::Float16 => TensorData::Float16(collect(dtype, values, |s| match s {
                Scalar::Float16(v) => Ok(v),
                other => Err(other),
            })?),
            DataType::Float32 => TensorData::Float32(collect(dtype, values, |s| match s {
                Scalar::Float32(v) => Ok(v),
                other => Err(other),
            })?),
            DataType::Float64 => TensorData::Float64(collect(dtype, values, |s| match s {
                Scalar::Float64(v) => Ok(v),
                other => Err(other),
            })?),
            DataType::String => TensorData::String(collect(dtype, values, |s| match s {
                Scalar::String(v) => Ok(v),
                other => Err(other),
            })?),
        })
    }
}

impl Scalar {
    pub fn dtype(&self) -> DataType {
        match self {
            Scalar::Bool(_) => DataType::Bool,
            Scalar::Int8(_) => DataType::Int8,
            Scalar::Int16(_) => DataType::Int16,
            Scalar::Int32(_) => DataType::Int32,
            Scalar::Int64(_) => DataType::Int64,
            Scalar::Float16(_) => DataType::Float16,
            Scalar::Float32(_) => DataType::Float32,
            Scalar::Float64(_) => DataType::Float64,
            Scalar::String(_) => DataType::String,
        }
    }
}

/// Host element types that map one-to-one onto a `DataType`.
pub trait Element: Clone + Send + Sync + 'static {
    const DTYPE: DataType;

    fn into_data(values: Vec<Self>) -> TensorData;

    fn slice(data: &TensorData) -> Option<&[Self]>;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DataType = DataType::$variant;

            fn into_data(values: Vec<Self>) -> TensorData {
                TensorData::$variant(values)
            }

            fn slice(data: &TensorData) -> Option<&[Self]> {
                match data {
                    TensorData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }
        }

        impl From<Vec<$ty>> for TensorData {
            fn from(values: Vec<$ty>) -> Self {
                TensorData::$variant(values)
            }
        }
    };
}

impl_element!(bool, Bool);
impl_element!(i8, Int8);
impl_element!(i16, Int16);
impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(f16, Float16);
impl_element!(f32, Float32);
impl_element!(f64, Float64);
impl_element!(String, String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_dtype() {
        let d = TensorData::from(vec![1i16, 2, 3]);
        assert_eq!(d.len(), 3);
        assert!(!d.is_empty());
        assert_eq!(d.dtype(), DataType::Int16);
        assert!(TensorData::String(vec![]).is_empty());
    }

    #[test]
    fn test_get() {
        let d = TensorData::from(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(d.get(1), Some(Scalar::String("b".into())));
        assert_eq!(d.get(2), None);
    }

    #[test]
    fn test_slice_by_element() {
        let d = TensorData::from(vec![1.5f32, 2.5]);
        assert_eq!(f32::slice(&d), Some(&[1.5f32, 2.5][..]));
        assert_eq!(f64::slice(&d), None);
    }

    #[test]
    fn test_from_scalars() {
        let d = TensorData::from_scalars(DataType::Int64, vec![Scalar::Int64(1), Scalar::Int64(2)])
            .unwrap();
        assert_eq!(d, TensorData::Int64(vec![1, 2]));

        let err = TensorData::from_scalars(DataType::Int64, vec![Scalar::Int32(1)]).unwrap_err();
        assert_eq!(
            err,
            TensorError::DTypeMismatch {
                expected: DataType::Int64,
                got: DataType::Int32
            }
        );
    }

    #[test]
    fn test_gather_and_interleave() {
        let a = TensorData::from(vec![1i32, 2, 3, 4]);
        assert_eq!(a.gather(&[3, 0]), TensorData::Int32(vec![4, 1]));

        let b = TensorData::from(vec![9i32, 8]);
        assert_eq!(
            a.interleave(&b, 2, 2, 1),
            Some(TensorData::Int32(vec![1, 2, 9, 3, 4, 8]))
        );
        assert_eq!(a.interleave(&TensorData::Int64(vec![9, 8]), 2, 2, 1), None);
    }

    #[test]
    fn test_to_f64_vec() {
        let d = TensorData::from(vec![f16::from_f32(0.5), f16::from_f32(2.0)]);
        assert_eq!(d.to_f64_vec(), Some(vec![0.5, 2.0]));
        assert_eq!(TensorData::Bool(vec![true]).to_f64_vec(), None);
    }
}
