use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use sr_evaluator::{
    from_fields, BackendError, Evaluator, EvaluatorError, EvaluatorManifest, Registry, Result,
    Schema, TensorField,
};
use sr_tensor::{DataType, Tensor, TensorIO};

pub const KIND: &str = "standard_scaler";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
}

/// Standardization `z = (x - mean) / std`, one mean/std per input.
///
/// Inputs and outputs are paired by position; an output may reuse its
/// input's name. Outputs are always float64.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StandardScalerManifest {
    pub mean_std_map: BTreeMap<String, MeanStd>,
    pub inputs: Vec<TensorField>,
    pub outputs: Vec<TensorField>,
}

pub(crate) fn parse(_: &Registry, fields: Value) -> Result<Box<dyn EvaluatorManifest>> {
    Ok(Box::new(from_fields::<StandardScalerManifest>(KIND, fields)?))
}

impl EvaluatorManifest for StandardScalerManifest {
    fn kind(&self) -> &str {
        KIND
    }

    fn create(&self, _artifact_dir: &Path) -> Result<Box<dyn Evaluator>> {
        if self.inputs.len() != self.outputs.len() {
            return Err(EvaluatorError::invalid_manifest(
                KIND,
                format!(
                    "{} inputs but {} outputs",
                    self.inputs.len(),
                    self.outputs.len()
                ),
            ));
        }

        let mut columns = Vec::with_capacity(self.inputs.len());
        for (input, output) in self.inputs.iter().zip(&self.outputs) {
            let params = self.mean_std_map.get(&input.name).ok_or_else(|| {
                EvaluatorError::invalid_manifest(
                    KIND,
                    format!("mean and standard deviation are missing to scale '{}'", input.name),
                )
            })?;
            if params.std == 0.0 || !params.std.is_finite() {
                return Err(EvaluatorError::invalid_manifest(
                    KIND,
                    format!("standard deviation of '{}' must be finite and non-zero", input.name),
                ));
            }
            if !input.dtype.is_numeric() {
                return Err(EvaluatorError::invalid_manifest(
                    KIND,
                    format!("'{}' must be numeric, got {}", input.name, input.dtype),
                ));
            }
            if output.dtype != DataType::Float64 {
                return Err(EvaluatorError::invalid_manifest(
                    KIND,
                    format!("'{}' must be float64, got {}", output.name, output.dtype),
                ));
            }
            columns.push(ScaledColumn {
                input: input.name.clone(),
                output: output.name.clone(),
                params: *params,
            });
        }

        Ok(Box::new(StandardScaler {
            schema: Schema::new(self.inputs.clone(), self.outputs.clone()),
            columns,
        }))
    }
}

struct ScaledColumn {
    input: String,
    output: String,
    params: MeanStd,
}

struct StandardScaler {
    schema: Schema,
    columns: Vec<ScaledColumn>,
}

impl Evaluator for StandardScaler {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn evaluate(&self, inputs: &TensorIO) -> std::result::Result<TensorIO, BackendError> {
        let mut outputs = TensorIO::empty();
        for column in &self.columns {
            // Optional inputs may be absent.
            let Ok(tensor) = inputs.get(&column.input) else {
                continue;
            };
            let values = tensor
                .data()
                .to_f64_vec()
                .ok_or_else(|| format!("'{}' is not numeric", column.input))?;
            let MeanStd { mean, std } = column.params;
            let scaled: Vec<f64> = values.into_iter().map(|x| (x - mean) / std).collect();
            let scaled = Tensor::from_shape_vec(tensor.shape().clone(), scaled)?;
            outputs = outputs.with(column.output.clone(), scaled)?;
        }
        Ok(outputs)
    }
}
