//! `sr-tensor` - Typed tensor values for serving-runtime.
//!
//! This crate provides:
//! - A closed `DataType` set and the `Tensor` value built on it
//! - `TensorIO`, the named, ordered collection flowing through evaluators
//! - Conversion between `TensorIO` and a simple row/column `Table`
//! - A `ComputeBackend` trait with a reference `CpuBackend`

pub mod backend;
pub mod cpu;
pub mod dtype;
pub mod error;
pub mod io;
pub mod shape;
pub mod storage;
pub mod table;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use cpu::CpuBackend;
pub use dtype::DataType;
pub use error::{Result, TensorError};
pub use io::TensorIO;
pub use shape::Shape;
pub use storage::{Element, Scalar, TensorData};
pub use table::{Cell, Column, Table};
pub use tensor::Tensor;
