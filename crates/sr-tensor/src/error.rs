use thiserror::Error;

use crate::dtype::DataType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DataType, got: DataType },
    #[error("index {index} out of bounds for dimension of size {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("cannot reshape {from:?} into {into:?}")]
    Reshape { from: Vec<usize>, into: Vec<i64> },
    #[error("expected {expected} indices, got {got}")]
    RankMismatch { expected: usize, got: usize },
    #[error("unknown data type: {0}")]
    UnknownDataType(String),
    #[error("tensor not found: {0}")]
    NotFound(String),
    #[error("duplicate tensor name: {0}")]
    DuplicateName(String),
    #[error("cannot convert to table: {0}")]
    Conversion(String),
    #[error("not all columns have the same length: {lengths:?}")]
    DifferentColumnLength { lengths: Vec<(String, usize)> },
    #[error("expected column '{column}' to hold {dtype} values, found {found}")]
    UnexpectedCell {
        column: String,
        dtype: DataType,
        found: String,
    },
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;
