use std::fmt;
use std::str::FromStr;

use half::f16;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TensorError};
use crate::storage::Scalar;
use crate::table::Cell;

/// Element kinds a tensor can hold.
///
/// The set is closed: every tensor buffer is exactly one of these, and no
/// coercion is stored. Coercion only happens when parsing table cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    /// IEEE 754 half precision, via the `half` crate.
    Float16,
    Float32,
    Float64,
    String,
}

impl DataType {
    pub const ALL: [DataType; 9] = [
        DataType::Bool,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Float16,
        DataType::Float32,
        DataType::Float64,
        DataType::String,
    ];

    /// Size in bytes of one element, or `None` for variable-width strings.
    pub fn size_in_bytes(&self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Int8 => Some(1),
            DataType::Int16 | DataType::Float16 => Some(2),
            DataType::Int32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::Float64 => Some(8),
            DataType::String => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            DataType::Float16 | DataType::Float32 | DataType::Float64
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Canonical lowercase name, used for display and serialization.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float16 => "float16",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::String => "string",
        }
    }

    /// Render one element as a table cell.
    ///
    /// Integers become `Cell::Int`, floats `Cell::Float`, strings `Cell::Text`.
    pub fn format_cell(&self, value: &Scalar) -> Result<Cell> {
        if value.dtype() != *self {
            return Err(TensorError::DTypeMismatch {
                expected: *self,
                got: value.dtype(),
            });
        }
        Ok(match value {
            Scalar::Bool(v) => Cell::Bool(*v),
            Scalar::Int8(v) => Cell::Int(*v as i64),
            Scalar::Int16(v) => Cell::Int(*v as i64),
            Scalar::Int32(v) => Cell::Int(*v as i64),
            Scalar::Int64(v) => Cell::Int(*v),
            Scalar::Float16(v) => Cell::Float(v.to_f64()),
            Scalar::Float32(v) => Cell::Float(*v as f64),
            Scalar::Float64(v) => Cell::Float(*v),
            Scalar::String(v) => Cell::Text(v.clone()),
        })
    }

    /// Parse one table cell into an element of this dtype.
    ///
    /// Text cells are parsed, integer cells widen into float columns, and
    /// anything else that does not fit is an `UnexpectedCell` error.
    pub fn parse_cell(&self, column: &str, cell: &Cell) -> Result<Scalar> {
        let unexpected = || TensorError::UnexpectedCell {
            column: column.to_string(),
            dtype: *self,
            found: cell.to_string(),
        };

        let value = match (self, cell) {
            (DataType::Bool, Cell::Bool(v)) => Scalar::Bool(*v),
            (DataType::Bool, Cell::Text(s)) => {
                Scalar::Bool(s.trim().parse::<bool>().map_err(|_| unexpected())?)
            }
            (DataType::String, Cell::Text(s)) => Scalar::String(s.clone()),
            (dtype, _) if dtype.is_integer() => {
                let wide = match cell {
                    Cell::Int(v) => *v,
                    Cell::Text(s) => s.trim().parse::<i64>().map_err(|_| unexpected())?,
                    _ => return Err(unexpected()),
                };
                match dtype {
                    DataType::Int8 => Scalar::Int8(i8::try_from(wide).map_err(|_| unexpected())?),
                    DataType::Int16 => {
                        Scalar::Int16(i16::try_from(wide).map_err(|_| unexpected())?)
                    }
                    DataType::Int32 => {
                        Scalar::Int32(i32::try_from(wide).map_err(|_| unexpected())?)
                    }
                    _ => Scalar::Int64(wide),
                }
            }
            (dtype, _) if dtype.is_float() => {
                let wide = match cell {
                    Cell::Float(v) => *v,
                    Cell::Int(v) => *v as f64,
                    Cell::Text(s) => s.trim().parse::<f64>().map_err(|_| unexpected())?,
                    _ => return Err(unexpected()),
                };
                match dtype {
                    DataType::Float16 => Scalar::Float16(f16::from_f64(wide)),
                    DataType::Float32 => Scalar::Float32(wide as f32),
                    _ => Scalar::Float64(wide),
                }
            }
            _ => return Err(unexpected()),
        };
        Ok(value)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DataType {
    type Err = TensorError;

    /// Accepts canonical names plus the legacy manifest spellings
    /// (`boolean`, `int`, `integer`, `long`, `half`, `float`, `double`),
    /// ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(DataType::Bool),
            "int8" => Ok(DataType::Int8),
            "int16" => Ok(DataType::Int16),
            "int32" | "int" | "integer" => Ok(DataType::Int32),
            "int64" | "long" => Ok(DataType::Int64),
            "float16" | "half" => Ok(DataType::Float16),
            "float32" | "float" => Ok(DataType::Float32),
            "float64" | "double" => Ok(DataType::Float64),
            "string" => Ok(DataType::String),
            _ => Err(TensorError::UnknownDataType(s.to_string())),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = TensorError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(dtype: DataType) -> Self {
        dtype.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_in_bytes() {
        assert_eq!(DataType::Bool.size_in_bytes(), Some(1));
        assert_eq!(DataType::Int16.size_in_bytes(), Some(2));
        assert_eq!(DataType::Float16.size_in_bytes(), Some(2));
        assert_eq!(DataType::Int32.size_in_bytes(), Some(4));
        assert_eq!(DataType::Float64.size_in_bytes(), Some(8));
        assert_eq!(DataType::String.size_in_bytes(), None);
    }

    #[test]
    fn test_name_parse_roundtrip() {
        for dtype in DataType::ALL {
            assert_eq!(dtype.name().parse::<DataType>().unwrap(), dtype);
        }
    }

    #[test]
    fn test_legacy_names() {
        assert_eq!("integer".parse::<DataType>().unwrap(), DataType::Int32);
        assert_eq!("long".parse::<DataType>().unwrap(), DataType::Int64);
        assert_eq!("float".parse::<DataType>().unwrap(), DataType::Float32);
        assert_eq!("double".parse::<DataType>().unwrap(), DataType::Float64);
        assert_eq!("boolean".parse::<DataType>().unwrap(), DataType::Bool);
        assert_eq!("DOUBLE".parse::<DataType>().unwrap(), DataType::Float64);
        assert_eq!("Float".parse::<DataType>().unwrap(), DataType::Float32);
        assert_eq!(
            "Complex".parse::<DataType>(),
            Err(TensorError::UnknownDataType("Complex".into()))
        );
        assert!("date".parse::<DataType>().is_err());
    }

    #[test]
    fn test_format_cell() {
        let cell = DataType::Int16.format_cell(&Scalar::Int16(-4)).unwrap();
        assert_eq!(cell, Cell::Int(-4));
        let cell = DataType::String.format_cell(&Scalar::String("a".into())).unwrap();
        assert_eq!(cell, Cell::Text("a".into()));
        assert!(DataType::Int32.format_cell(&Scalar::Int64(1)).is_err());
    }

    #[test]
    fn test_parse_cell_coercions() {
        assert_eq!(
            DataType::Float64.parse_cell("c", &Cell::Int(3)).unwrap(),
            Scalar::Float64(3.0)
        );
        assert_eq!(
            DataType::Int32.parse_cell("c", &Cell::Text(" 42 ".into())).unwrap(),
            Scalar::Int32(42)
        );
        assert_eq!(
            DataType::Bool.parse_cell("c", &Cell::Text("true".into())).unwrap(),
            Scalar::Bool(true)
        );
    }

    #[test]
    fn test_parse_cell_rejects() {
        assert!(matches!(
            DataType::Int64.parse_cell("c", &Cell::Float(1.5)),
            Err(TensorError::UnexpectedCell { .. })
        ));
        assert!(DataType::Int8.parse_cell("c", &Cell::Int(300)).is_err());
        assert!(DataType::String.parse_cell("c", &Cell::Int(1)).is_err());
    }
}
