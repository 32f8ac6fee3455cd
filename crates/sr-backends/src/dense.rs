//! A single fully connected layer: `y = act(W·x + b)`.
//!
//! The artifact is a flat little-endian f32 file holding the `[M, N]`
//! row-major weight matrix followed by the `M` biases, where `N` is the last
//! dimension of the declared input and `M` the last dimension of the declared
//! output.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use serde::Deserialize;
use serde_json::Value;
use sr_evaluator::{
    from_fields, BackendError, Evaluator, EvaluatorError, EvaluatorManifest, Registry, Result,
    Schema, ShapePattern, TensorField,
};
use sr_tensor::{ComputeBackend, CpuBackend, DataType, Tensor, TensorIO};
use tracing::debug;

pub const KIND: &str = "dense";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    None,
    Relu,
    Sigmoid,
    Tanh,
    Silu,
    /// Softmax over each output row.
    Softmax,
}

impl Activation {
    fn apply(
        &self,
        backend: &dyn ComputeBackend,
        x: Vec<f32>,
        row_len: usize,
    ) -> sr_tensor::Result<Vec<f32>> {
        match self {
            Activation::None => Ok(x),
            Activation::Relu => backend.relu(&x),
            Activation::Sigmoid => backend.sigmoid(&x),
            Activation::Tanh => backend.tanh(&x),
            Activation::Silu => backend.silu(&x),
            Activation::Softmax => backend.softmax(&x, row_len),
        }
    }
}

fn default_weights() -> PathBuf {
    PathBuf::from("weights.bin")
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DenseManifest {
    /// Weights file, relative to the artifact directory.
    #[serde(default = "default_weights")]
    pub weights: PathBuf,
    #[serde(default)]
    pub activation: Activation,
    pub inputs: Vec<TensorField>,
    pub outputs: Vec<TensorField>,
}

/// Layer dimensions taken from the declared shapes.
#[derive(Debug, Clone, Copy)]
struct Layout {
    n: usize,
    m: usize,
    /// `M * N` weights followed by `M` biases.
    values: usize,
}

impl DenseManifest {
    fn layout(&self) -> Result<Layout> {
        let (input, output) = match (self.inputs.as_slice(), self.outputs.as_slice()) {
            ([input], [output]) => (input, output),
            _ => {
                return Err(EvaluatorError::invalid_manifest(
                    KIND,
                    "expected exactly one input and one output",
                ))
            }
        };
        let n = feature_dim(input)?;
        let m = feature_dim(output)?;
        if input.shape.rank() != output.shape.rank() {
            return Err(EvaluatorError::invalid_manifest(
                KIND,
                format!(
                    "input shape {} and output shape {} differ in rank",
                    input.shape, output.shape
                ),
            ));
        }
        // The artifact must also be addressable in bytes.
        let values = n
            .checked_mul(m)
            .and_then(|w| w.checked_add(m))
            .filter(|v| v.checked_mul(4).is_some())
            .ok_or_else(|| {
                EvaluatorError::invalid_manifest(
                    KIND,
                    format!("a [{m}, {n}] layer is too large to load"),
                )
            })?;
        Ok(Layout { n, m, values })
    }
}

/// Fixed trailing dimension of a `[N]` or `[B, N]` float32 field.
fn feature_dim(field: &TensorField) -> Result<usize> {
    if field.dtype != DataType::Float32 {
        return Err(EvaluatorError::invalid_manifest(
            KIND,
            format!("'{}' must be float32, got {}", field.name, field.dtype),
        ));
    }
    match &field.shape {
        ShapePattern::Dims(dims) if matches!(dims.len(), 1 | 2) => match dims.last() {
            Some(Some(n)) if *n > 0 => Ok(*n),
            _ => Err(EvaluatorError::invalid_manifest(
                KIND,
                format!("'{}' needs a fixed, non-zero last dimension", field.name),
            )),
        },
        other => Err(EvaluatorError::invalid_manifest(
            KIND,
            format!("'{}' shape {} is not [N] or [B, N]", field.name, other),
        )),
    }
}

pub(crate) fn parse(_: &Registry, fields: Value) -> Result<Box<dyn EvaluatorManifest>> {
    let manifest: DenseManifest = from_fields(KIND, fields)?;
    manifest.layout()?;
    Ok(Box::new(manifest))
}

impl EvaluatorManifest for DenseManifest {
    fn kind(&self) -> &str {
        KIND
    }

    fn create(&self, artifact_dir: &Path) -> Result<Box<dyn Evaluator>> {
        let Layout { n, m, values } = self.layout()?;
        let path = artifact_dir.join(&self.weights);
        if !path.is_file() {
            return Err(EvaluatorError::MissingArtifact {
                kind: KIND.to_string(),
                path,
            });
        }

        let values = read_f32_file(&path, values)?;
        let (weights, bias) = values.split_at(m * n);

        // Store W transposed so a batch [B, N] multiplies straight into [B, M].
        let mut weights_t = vec![0.0f32; n * m];
        for j in 0..m {
            for p in 0..n {
                weights_t[p * m + j] = weights[j * n + p];
            }
        }

        debug!(path = %path.display(), n, m, activation = ?self.activation, "loaded dense weights");
        Ok(Box::new(DenseEvaluator {
            schema: Schema::new(self.inputs.clone(), self.outputs.clone()),
            weights_t,
            bias: bias.to_vec(),
            n,
            m,
            activation: self.activation,
            backend: CpuBackend::new(),
        }))
    }
}

/// Map `path` and decode exactly `count` little-endian f32 values.
fn read_f32_file(path: &Path, count: usize) -> Result<Vec<f32>> {
    let file = File::open(path).map_err(|e| EvaluatorError::load(KIND, e))?;
    let len = file
        .metadata()
        .map_err(|e| EvaluatorError::load(KIND, e))?
        .len();
    let expected = count.checked_mul(4).ok_or_else(|| {
        EvaluatorError::load(KIND, format!("{count} f32 values do not fit in memory"))
    })?;
    if len != expected as u64 {
        return Err(EvaluatorError::load(
            KIND,
            format!(
                "{} holds {} bytes, expected {} ({} f32 values)",
                path.display(),
                len,
                expected,
                count
            ),
        ));
    }

    // SAFETY: the file is opened read-only and the map does not outlive this call.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| EvaluatorError::load(KIND, e))?;
    Ok(mmap
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

struct DenseEvaluator {
    schema: Schema,
    weights_t: Vec<f32>,
    bias: Vec<f32>,
    n: usize,
    m: usize,
    activation: Activation,
    backend: CpuBackend,
}

impl Evaluator for DenseEvaluator {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn evaluate(&self, inputs: &TensorIO) -> std::result::Result<TensorIO, BackendError> {
        let x = inputs.get(&self.schema.inputs[0].name)?;
        let (rows, batched) = match x.shape().dims() {
            [rows, _] => (*rows, true),
            _ => (1, false),
        };

        let y = self
            .backend
            .matmul(x.as_slice::<f32>()?, &self.weights_t, rows, self.n, self.m)?;
        let bias: Vec<f32> = self.bias.iter().copied().cycle().take(y.len()).collect();
        let y = self.backend.add(&y, &bias)?;
        let y = self.activation.apply(&self.backend, y, self.m)?;

        let shape = if batched {
            vec![rows, self.m]
        } else {
            vec![self.m]
        };
        let output = Tensor::from_shape_vec(shape, y)?;
        Ok(TensorIO::new([(self.schema.outputs[0].name.clone(), output)])?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn write_weights(dir: &Path, values: &[f32]) {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        fs::write(dir.join("weights.bin"), bytes).unwrap();
    }

    fn manifest(activation: &str, input_shape: Value, output_shape: Value) -> Value {
        json!({
            "type": "dense",
            "activation": activation,
            "inputs": [{"name": "x", "type": "float32", "shape": input_shape}],
            "outputs": [{"name": "y", "type": "float32", "shape": output_shape}]
        })
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(KIND, parse).unwrap();
        registry
    }

    #[test]
    fn test_identity_layer_batched() {
        let dir = tempfile::tempdir().unwrap();
        // W = [[1, 0, 0], [0, 2, 0]], b = [0.5, -1]
        write_weights(dir.path(), &[1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.5, -1.0]);
        let evaluator = registry()
            .parse_value(manifest("none", json!([-1, 3]), json!([-1, 2])))
            .unwrap()
            .create(dir.path())
            .unwrap();

        let x = Tensor::from_shape_vec([2, 3], vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let out = evaluator
            .evaluate(&TensorIO::new([("x", x)]).unwrap())
            .unwrap();
        let y = out.get("y").unwrap();
        assert_eq!(y.shape().dims(), &[2, 2]);
        assert_eq!(y.as_slice::<f32>().unwrap(), &[1.5, 3.0, 4.5, 9.0]);
    }

    #[test]
    fn test_relu() {
        let dir = tempfile::tempdir().unwrap();
        write_weights(dir.path(), &[1.0, -1.0, 0.0, 0.0]);
        let evaluator = registry()
            .parse_value(manifest("relu", json!([1]), json!([2])))
            .unwrap()
            .create(dir.path())
            .unwrap();
        let out = evaluator
            .evaluate(&TensorIO::new([("x", Tensor::from_f32_data(vec![3.0]))]).unwrap())
            .unwrap();
        assert_eq!(out.get("y").unwrap().as_slice::<f32>().unwrap(), &[3.0, 0.0]);
    }

    #[test]
    fn test_bad_manifests() {
        for bad in [
            manifest("none", json!([-1]), json!([2])),
            manifest("none", json!(null), json!([2])),
            manifest("none", json!([2, 2, 2]), json!([2])),
            manifest("gelu", json!([2]), json!([2])),
            manifest("none", json!([8_589_934_592u64]), json!([8_589_934_592u64])),
            manifest("none", json!([-1, 1u64 << 62]), json!([-1, 2])),
            json!({"type": "dense", "inputs": [], "outputs": []}),
        ] {
            let err = registry().parse_value(bad).unwrap_err();
            assert!(
                matches!(err, EvaluatorError::InvalidManifest { .. }),
                "unexpected error: {err}"
            );
        }
    }

    #[test]
    fn test_truncated_weights() {
        let dir = tempfile::tempdir().unwrap();
        write_weights(dir.path(), &[1.0, 2.0]);
        let err = registry()
            .parse_value(manifest("none", json!([2]), json!([2])))
            .unwrap()
            .create(dir.path())
            .unwrap_err();
        assert!(matches!(err, EvaluatorError::Load { ref kind, .. } if kind == "dense"));
    }
}
