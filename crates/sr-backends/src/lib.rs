//! `sr-backends` - Built-in evaluator plugins for serving-runtime.
//!
//! - `dense`: one fully connected layer over memory-mapped f32 weights
//! - `standard_scaler`: per-column standardization, no artifacts
//!
//! [`register`] adds both kinds to a registry; [`default_registry`] is a
//! process-wide registry holding them plus the built-in `flow` kind.

pub mod dense;
pub mod scaler;

use once_cell::sync::OnceCell;
use sr_evaluator::{ManifestParser, Registry, Result};

pub use dense::{Activation, DenseManifest};
pub use scaler::{MeanStd, StandardScalerManifest};

const KINDS: [(&str, ManifestParser); 2] = [
    (dense::KIND, dense::parse),
    (scaler::KIND, scaler::parse),
];

/// Add every kind this crate provides to `registry`.
pub fn register(registry: &mut Registry) -> Result<()> {
    KINDS
        .into_iter()
        .try_for_each(|(kind, parser)| registry.register(kind, parser))
}

static DEFAULT_REGISTRY: OnceCell<Registry> = OnceCell::new();

/// Shared registry with `flow`, `dense` and `standard_scaler`, built on
/// first use.
pub fn default_registry() -> &'static Registry {
    DEFAULT_REGISTRY.get_or_init(|| Registry::with_kinds(KINDS))
}
