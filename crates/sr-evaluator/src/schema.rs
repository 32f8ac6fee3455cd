use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sr_tensor::{DataType, Shape, Tensor, TensorIO};

use crate::error::{EvaluatorError, Result};

/// Expected shape of a declared tensor.
///
/// In manifests a shape is a list of dimensions where a negative number or
/// `null` marks a dynamic dimension, e.g. `[-1, 4]`. An absent shape accepts
/// any tensor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ShapePattern {
    #[default]
    Any,
    Dims(Vec<Option<usize>>),
}

impl ShapePattern {
    /// A pattern with every dimension fixed.
    pub fn fixed(dims: &[usize]) -> Self {
        ShapePattern::Dims(dims.iter().copied().map(Some).collect())
    }

    /// Number of dimensions, or `None` for `Any`.
    pub fn rank(&self) -> Option<usize> {
        match self {
            ShapePattern::Any => None,
            ShapePattern::Dims(dims) => Some(dims.len()),
        }
    }

    /// Equal rank and equal fixed dimensions.
    pub fn matches(&self, shape: &Shape) -> bool {
        match self {
            ShapePattern::Any => true,
            ShapePattern::Dims(dims) => {
                dims.len() == shape.ndim()
                    && dims
                        .iter()
                        .zip(shape.dims())
                        .all(|(want, &got)| want.map_or(true, |w| w == got))
            }
        }
    }
}

impl fmt::Display for ShapePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapePattern::Any => write!(f, "any"),
            ShapePattern::Dims(dims) => {
                write!(f, "[")?;
                for (i, d) in dims.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match d {
                        Some(d) => write!(f, "{}", d)?,
                        None => write!(f, "?")?,
                    }
                }
                write!(f, "]")
            }
        }
    }
}

impl<'de> Deserialize<'de> for ShapePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw: Option<Vec<Option<i64>>> = Option::deserialize(deserializer)?;
        Ok(match raw {
            None => ShapePattern::Any,
            Some(dims) => ShapePattern::Dims(
                dims.into_iter()
                    .map(|d| d.and_then(|d| usize::try_from(d).ok()))
                    .collect(),
            ),
        })
    }
}

impl Serialize for ShapePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ShapePattern::Any => serializer.serialize_none(),
            ShapePattern::Dims(dims) => {
                let raw: Vec<i64> = dims
                    .iter()
                    .map(|d| d.map_or(-1, |d| d as i64))
                    .collect();
                raw.serialize(serializer)
            }
        }
    }
}

fn default_required() -> bool {
    true
}

/// One declared input or output tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorField {
    pub name: String,
    #[serde(rename = "type")]
    pub dtype: DataType,
    #[serde(default)]
    pub shape: ShapePattern,
    #[serde(default = "default_required")]
    pub required: bool,
}

impl TensorField {
    pub fn new(name: impl Into<String>, dtype: DataType, shape: ShapePattern) -> Self {
        TensorField {
            name: name.into(),
            dtype,
            shape,
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Exact dtype match and a shape the pattern accepts.
    pub fn check(&self, tensor: &Tensor) -> Result<()> {
        if tensor.dtype() != self.dtype {
            return Err(EvaluatorError::DTypeMismatch {
                name: self.name.clone(),
                expected: self.dtype,
                got: tensor.dtype(),
            });
        }
        if !self.shape.matches(tensor.shape()) {
            return Err(EvaluatorError::ShapeMismatch {
                name: self.name.clone(),
                expected: self.shape.clone(),
                got: tensor.shape().clone(),
            });
        }
        Ok(())
    }
}

/// Declared inputs and outputs of an evaluator, in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub inputs: Vec<TensorField>,
    #[serde(default)]
    pub outputs: Vec<TensorField>,
}

impl Schema {
    pub fn new(inputs: Vec<TensorField>, outputs: Vec<TensorField>) -> Self {
        Schema { inputs, outputs }
    }

    pub fn input(&self, name: &str) -> Option<&TensorField> {
        self.inputs.iter().find(|f| f.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&TensorField> {
        self.outputs.iter().find(|f| f.name == name)
    }

    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|f| f.name.clone()).collect()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.outputs.iter().map(|f| f.name.clone()).collect()
    }

    /// Check `io` against the declared inputs.
    ///
    /// Returns only the declared inputs, in declaration order. Undeclared
    /// entries are dropped; an absent optional input is skipped.
    pub fn validate_inputs(&self, io: &TensorIO) -> Result<TensorIO> {
        let mut restricted = TensorIO::empty();
        for field in &self.inputs {
            match io.get(&field.name) {
                Ok(tensor) => {
                    field.check(tensor)?;
                    restricted = restricted.with(field.name.clone(), tensor.clone())?;
                }
                Err(_) if !field.required => {}
                Err(_) => {
                    return Err(EvaluatorError::MissingInput {
                        name: field.name.clone(),
                    })
                }
            }
        }
        Ok(restricted)
    }

    /// Check what a backend produced against the declared outputs.
    ///
    /// Every produced name must be declared and every required output must be
    /// present. The result is reordered to declaration order.
    pub fn validate_outputs(&self, io: &TensorIO) -> Result<TensorIO> {
        if let Some(name) = io.names().find(|n| self.output(n).is_none()) {
            return Err(EvaluatorError::UndeclaredOutput {
                name: name.to_string(),
            });
        }

        let mut ordered = TensorIO::empty();
        for field in &self.outputs {
            match io.get(&field.name) {
                Ok(tensor) => {
                    field.check(tensor)?;
                    ordered = ordered.with(field.name.clone(), tensor.clone())?;
                }
                Err(_) if !field.required => {}
                Err(_) => {
                    return Err(EvaluatorError::MissingOutput {
                        name: field.name.clone(),
                    })
                }
            }
        }
        Ok(ordered)
    }
}
