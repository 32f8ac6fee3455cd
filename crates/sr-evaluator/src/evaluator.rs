use sr_tensor::TensorIO;

use crate::error::BackendError;
use crate::schema::Schema;

/// A loaded backend: the seam at which model runtimes plug in.
///
/// Implementations are built by an [`EvaluatorManifest`](crate::EvaluatorManifest)
/// and are only ever called through a [`LoadedEvaluator`](crate::LoadedEvaluator),
/// which validates inputs against `schema()` before `evaluate` runs and
/// validates outputs after. `evaluate` receives exactly the declared inputs.
///
/// `evaluate` takes `&self` and may be called from many threads at once. A
/// backend that is not internally thread-safe must serialize its own access.
/// Native resources are released by `Drop`.
pub trait Evaluator: Send + Sync {
    fn schema(&self) -> &Schema;

    fn evaluate(&self, inputs: &TensorIO) -> Result<TensorIO, BackendError>;
}
