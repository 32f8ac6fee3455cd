//! The built-in `flow` kind: a sequence of evaluators run as one.
//!
//! ```json
//! {
//!   "type": "flow",
//!   "evaluator_manifests": [ { "type": "...", ... }, { "type": "...", ... } ],
//!   "outputs": ["label"]
//! }
//! ```
//!
//! Each stage sees the caller's inputs merged with every earlier stage's
//! outputs. The flow's inputs are the stage inputs no earlier stage
//! produces. Its outputs are `outputs`, or the last stage's outputs when
//! that list is empty.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use sr_tensor::TensorIO;

use crate::error::{BackendError, EvaluatorError, Result};
use crate::evaluator::Evaluator;
use crate::loaded::LoadedEvaluator;
use crate::manifest::{EvaluatorManifest, Manifest};
use crate::registry::{from_fields, Registry};
use crate::schema::{Schema, TensorField};

pub const KIND: &str = "flow";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FlowFields {
    evaluator_manifests: Vec<Value>,
    #[serde(default)]
    outputs: Vec<String>,
}

#[derive(Debug)]
pub struct FlowManifest {
    stages: Vec<Manifest>,
    outputs: Vec<String>,
}

impl FlowManifest {
    pub fn stages(&self) -> &[Manifest] {
        &self.stages
    }
}

/// Nested manifests go through the same registry, so an unknown stage kind
/// fails the whole flow at parse time.
pub(crate) fn parse(registry: &Registry, fields: Value) -> Result<Box<dyn EvaluatorManifest>> {
    let fields: FlowFields = from_fields(KIND, fields)?;
    if fields.evaluator_manifests.is_empty() {
        return Err(EvaluatorError::invalid_manifest(
            KIND,
            "evaluator_manifests must not be empty",
        ));
    }
    let stages = fields
        .evaluator_manifests
        .into_iter()
        .map(|stage| registry.parse_value(stage))
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(FlowManifest {
        stages,
        outputs: fields.outputs,
    }))
}

impl EvaluatorManifest for FlowManifest {
    fn kind(&self) -> &str {
        KIND
    }

    fn create(&self, artifact_dir: &Path) -> Result<Box<dyn Evaluator>> {
        let stages = self
            .stages
            .iter()
            .map(|stage| stage.create(artifact_dir))
            .collect::<Result<Vec<_>>>()?;
        let schema = flow_schema(&stages, &self.outputs)?;
        Ok(Box::new(FlowEvaluator { stages, schema }))
    }
}

fn flow_schema(stages: &[LoadedEvaluator], declared: &[String]) -> Result<Schema> {
    let mut inputs: Vec<TensorField> = Vec::new();
    let mut produced: Vec<TensorField> = Vec::new();

    for stage in stages {
        for field in &stage.schema().inputs {
            let known = produced.iter().chain(&inputs).any(|f| f.name == field.name);
            if !known {
                inputs.push(field.clone());
            }
        }
        for field in &stage.schema().outputs {
            produced.retain(|f| f.name != field.name);
            produced.push(field.clone());
        }
    }

    let outputs = if declared.is_empty() {
        stages
            .last()
            .map(|s| s.schema().outputs.clone())
            .unwrap_or_default()
    } else {
        declared
            .iter()
            .map(|name| {
                produced
                    .iter()
                    .find(|f| &f.name == name)
                    .cloned()
                    .ok_or_else(|| {
                        EvaluatorError::invalid_manifest(
                            KIND,
                            format!("output '{}' is not produced by any stage", name),
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?
    };

    Ok(Schema::new(inputs, outputs))
}

struct FlowEvaluator {
    stages: Vec<LoadedEvaluator>,
    schema: Schema,
}

impl Evaluator for FlowEvaluator {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn evaluate(&self, inputs: &TensorIO) -> std::result::Result<TensorIO, BackendError> {
        let mut running = inputs.clone();
        for stage in &self.stages {
            let produced = stage.evaluate(&running)?;
            running = running.merge(&produced);
        }
        Ok(running.retain(&self.schema.output_names()))
    }
}
