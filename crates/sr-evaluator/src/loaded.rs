use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sr_tensor::TensorIO;
use tracing::{debug, info};

use crate::error::{EvaluatorError, Result};
use crate::evaluator::Evaluator;
use crate::schema::Schema;

/// A ready evaluator.
///
/// Owns the backend and enforces the schema around every call: inputs are
/// validated before the backend runs and outputs are validated before they
/// are returned. Safe to share across threads; dropping it releases the
/// backend.
pub struct LoadedEvaluator {
    kind: String,
    artifact_dir: PathBuf,
    evaluator: Box<dyn Evaluator>,
    evaluations: AtomicU64,
}

impl LoadedEvaluator {
    pub fn new(kind: impl Into<String>, artifact_dir: &Path, evaluator: Box<dyn Evaluator>) -> Self {
        LoadedEvaluator {
            kind: kind.into(),
            artifact_dir: artifact_dir.to_path_buf(),
            evaluator,
            evaluations: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn schema(&self) -> &Schema {
        self.evaluator.schema()
    }

    /// Rows evaluated successfully so far.
    ///
    /// Each call adds the batch size of its outputs, so a scalar or 1-D
    /// output of length `n` counts `1` or `n` rows respectively.
    pub fn evaluation_count(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Run the backend on `inputs`.
    ///
    /// Fails with a schema error, without calling the backend, when a
    /// required input is missing or mismatched. A backend failure is wrapped
    /// as [`EvaluatorError::Evaluation`]. Outputs contain exactly the
    /// declared names, in declaration order.
    pub fn evaluate(&self, inputs: &TensorIO) -> Result<TensorIO> {
        let schema = self.schema();
        let restricted = schema.validate_inputs(inputs)?;
        let names: Vec<String> = restricted.names().map(String::from).collect();
        debug!(kind = %self.kind, inputs = ?names, batch = restricted.batch_size(), "evaluating");

        let produced = self
            .evaluator
            .evaluate(&restricted)
            .map_err(|source| EvaluatorError::Evaluation {
                kind: self.kind.clone(),
                inputs: names,
                source,
            })?;
        let outputs = schema.validate_outputs(&produced)?;

        self.evaluations
            .fetch_add(outputs.batch_size() as u64, Ordering::Relaxed);
        Ok(outputs)
    }

    /// Release the backend now rather than at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LoadedEvaluator {
    fn drop(&mut self) {
        info!(
            kind = %self.kind,
            artifact_dir = %self.artifact_dir.display(),
            evaluations = self.evaluation_count(),
            "released evaluator"
        );
    }
}

impl fmt::Debug for LoadedEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedEvaluator")
            .field("kind", &self.kind)
            .field("artifact_dir", &self.artifact_dir)
            .field("schema", self.schema())
            .field("evaluations", &self.evaluation_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use sr_tensor::{DataType, Tensor};

    use super::*;
    use crate::error::{BackendError, ErrorCategory};
    use crate::schema::{ShapePattern, TensorField};

    /// Doubles `x` into `y` and records how often it ran.
    struct Recording {
        schema: Schema,
        calls: Arc<AtomicUsize>,
        dropped: Arc<AtomicUsize>,
        extra_output: bool,
        fail: bool,
    }

    impl Recording {
        fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let dropped = Arc::new(AtomicUsize::new(0));
            let schema = Schema::new(
                vec![TensorField::new("x", DataType::Float64, ShapePattern::fixed(&[2]))],
                vec![TensorField::new("y", DataType::Float64, ShapePattern::fixed(&[2]))],
            );
            let rec = Recording {
                schema,
                calls: calls.clone(),
                dropped: dropped.clone(),
                extra_output: false,
                fail: false,
            };
            (rec, calls, dropped)
        }
    }

    impl Evaluator for Recording {
        fn schema(&self) -> &Schema {
            &self.schema
        }

        fn evaluate(&self, inputs: &TensorIO) -> std::result::Result<TensorIO, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("numeric failure".into());
            }
            assert_eq!(inputs.names().collect::<Vec<_>>(), vec!["x"]);
            let x = inputs.get("x")?.as_slice::<f64>()?;
            let y = Tensor::from_f64_data(x.iter().map(|v| v * 2.0).collect());
            let mut out = TensorIO::new([("y", y)])?;
            if self.extra_output {
                out = out.with("debug", Tensor::from_bool_data(vec![true]))?;
            }
            Ok(out)
        }
    }

    impl Drop for Recording {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn input() -> TensorIO {
        TensorIO::new([
            ("x", Tensor::from_f64_data(vec![1.0, 2.5])),
            ("ignored", Tensor::from_i32_data(vec![1])),
        ])
        .unwrap()
    }

    #[test]
    fn test_evaluate() {
        let (rec, calls, _) = Recording::new();
        let loaded = LoadedEvaluator::new("recording", Path::new("."), Box::new(rec));
        let out = loaded.evaluate(&input()).unwrap();
        assert_eq!(out.get("y").unwrap().as_slice::<f64>().unwrap(), &[2.0, 5.0]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(loaded.evaluation_count(), 2);
    }

    #[test]
    fn test_count_follows_batch_size() {
        let (rec, _, _) = Recording::new();
        let loaded = LoadedEvaluator::new("recording", Path::new("."), Box::new(rec));
        for _ in 0..3 {
            loaded.evaluate(&input()).unwrap();
        }
        assert_eq!(loaded.evaluation_count(), 6);
    }

    #[test]
    fn test_missing_input_does_not_invoke_backend() {
        let (rec, calls, _) = Recording::new();
        let loaded = LoadedEvaluator::new("recording", Path::new("."), Box::new(rec));
        let err = loaded.evaluate(&TensorIO::empty()).unwrap_err();
        assert!(matches!(err, EvaluatorError::MissingInput { ref name } if name == "x"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(loaded.evaluation_count(), 0);
    }

    #[test]
    fn test_mismatched_input_does_not_invoke_backend() {
        let (rec, calls, _) = Recording::new();
        let loaded = LoadedEvaluator::new("recording", Path::new("."), Box::new(rec));
        let io = TensorIO::new([("x", Tensor::from_f32_data(vec![1.0, 2.0]))]).unwrap();
        assert!(matches!(
            loaded.evaluate(&io),
            Err(EvaluatorError::DTypeMismatch { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_undeclared_output_rejected() {
        let (mut rec, _, _) = Recording::new();
        rec.extra_output = true;
        let loaded = LoadedEvaluator::new("recording", Path::new("."), Box::new(rec));
        let err = loaded.evaluate(&input()).unwrap_err();
        assert!(matches!(err, EvaluatorError::UndeclaredOutput { ref name } if name == "debug"));
    }

    #[test]
    fn test_backend_failure_is_wrapped() {
        let (mut rec, _, _) = Recording::new();
        rec.fail = true;
        let loaded = LoadedEvaluator::new("recording", Path::new("."), Box::new(rec));
        let err = loaded.evaluate(&input()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Evaluation);
        match err {
            EvaluatorError::Evaluation { kind, inputs, source } => {
                assert_eq!(kind, "recording");
                assert_eq!(inputs, vec!["x".to_string()]);
                assert_eq!(source.to_string(), "numeric failure");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(loaded.evaluation_count(), 0);
    }

    #[test]
    fn test_release_drops_backend() {
        let (rec, _, dropped) = Recording::new();
        let loaded = LoadedEvaluator::new("recording", Path::new("."), Box::new(rec));
        assert!(loaded.evaluate(&TensorIO::empty()).is_err());
        loaded.release();
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }
}
