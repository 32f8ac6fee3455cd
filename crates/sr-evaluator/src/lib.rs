//! `sr-evaluator` - Manifest-driven evaluator contract for serving-runtime.
//!
//! A JSON manifest names a backend kind through its `type` field. The
//! [`Registry`] resolves that kind to a typed [`EvaluatorManifest`] without
//! touching the filesystem; [`Manifest::create`] then loads the backend from
//! an artifact directory and returns a [`LoadedEvaluator`] that enforces the
//! declared [`Schema`] around every evaluation.

pub mod error;
pub mod evaluator;
pub mod flow;
pub mod loaded;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod schema;

pub use error::{BackendError, ErrorCategory, EvaluatorError, Result};
pub use evaluator::Evaluator;
pub use flow::FlowManifest;
pub use loaded::LoadedEvaluator;
pub use loader::{load_from_dir, load_manifest_file, MANIFEST_FILE};
pub use manifest::{EvaluatorManifest, Manifest};
pub use registry::{from_fields, ManifestParser, Registry};
pub use schema::{Schema, ShapePattern, TensorField};
