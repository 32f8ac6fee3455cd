use std::fmt;

use crate::dtype::DataType;
use crate::error::{Result, TensorError};
use crate::storage::{Scalar, TensorData};

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Bool(v) => write!(f, "{}", v),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(v) => write!(f, "{:?}", v),
        }
    }
}

/// A named, typed column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: DataType,
    cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: DataType, cells: Vec<Cell>) -> Self {
        Column {
            name: name.into(),
            dtype,
            cells,
        }
    }

    /// Render a buffer as a column, one cell per element.
    pub fn from_data(name: impl Into<String>, data: &TensorData) -> Result<Self> {
        let dtype = data.dtype();
        let cells = data
            .scalars()
            .map(|s| dtype.format_cell(&s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Column::new(name, dtype, cells))
    }

    /// Parse every cell back into a buffer of the column's dtype.
    pub fn to_data(&self) -> Result<TensorData> {
        let scalars = self
            .cells
            .iter()
            .map(|c| self.dtype.parse_cell(&self.name, c))
            .collect::<Result<Vec<Scalar>>>()?;
        TensorData::from_scalars(self.dtype, scalars)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Row/column tabular value: uniquely named columns of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(TensorError::DuplicateName(column.name.clone()));
            }
        }

        if let Some(first) = columns.first() {
            if columns.iter().any(|c| c.len() != first.len()) {
                return Err(TensorError::DifferentColumnLength {
                    lengths: columns.iter().map(|c| (c.name.clone(), c.len())).collect(),
                });
            }
        }

        Ok(Table { columns })
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| TensorError::NotFound(name.to_string()))
    }

    /// Cells of row `i`, in column order.
    pub fn row(&self, i: usize) -> Result<Vec<&Cell>> {
        if i >= self.row_count() {
            return Err(TensorError::IndexOutOfBounds {
                index: i,
                len: self.row_count(),
            });
        }
        Ok(self.columns.iter().map(|c| &c.cells[i]).collect())
    }
}
