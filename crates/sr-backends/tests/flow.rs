use std::fs;

use approx::assert_abs_diff_eq;
use serde_json::json;
use sr_backends::default_registry;
use sr_evaluator::load_from_dir;
use sr_tensor::{Tensor, TensorIO};

/// Scale two raw features, then feed the first through a one-unit sigmoid layer.
fn write_pipeline(dir: &std::path::Path) {
    // W = [[1.0]], b = [0.0]
    let weights: Vec<u8> = [1.0f32, 0.0].iter().flat_map(|v| v.to_le_bytes()).collect();
    fs::write(dir.join("weights.bin"), weights).unwrap();

    let manifest = json!({
        "type": "flow",
        "evaluator_manifests": [
            {
                "type": "standard_scaler",
                "mean_std_map": {"age": {"mean": 30.0, "std": 10.0}},
                "inputs": [{"name": "age", "type": "long", "shape": [-1]}],
                "outputs": [{"name": "age_scaled", "type": "double", "shape": [-1]}]
            },
            {
                "type": "dense",
                "activation": "sigmoid",
                "inputs": [{"name": "features", "type": "float32", "shape": [-1, 1]}],
                "outputs": [{"name": "score", "type": "float32", "shape": [-1, 1]}]
            }
        ],
        "outputs": ["age_scaled", "score"]
    });
    fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
}

#[test]
fn flow_runs_stages_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write_pipeline(dir.path());
    let flow = load_from_dir(default_registry(), dir.path()).unwrap();

    assert_eq!(flow.kind(), "flow");
    assert_eq!(flow.schema().input_names(), vec!["age", "features"]);
    assert_eq!(flow.schema().output_names(), vec!["age_scaled", "score"]);

    let features = Tensor::from_shape_vec([2, 1], vec![0.0f32, 2.0]).unwrap();
    let io = TensorIO::new([
        ("age", Tensor::from_i64_data(vec![20, 45])),
        ("features", features),
    ])
    .unwrap();
    let out = flow.evaluate(&io).unwrap();

    assert_eq!(
        out.get("age_scaled").unwrap().as_slice::<f64>().unwrap(),
        &[-1.0, 1.5]
    );
    let score = out.get("score").unwrap();
    assert_eq!(score.shape().dims(), &[2, 1]);
    let score = score.as_slice::<f32>().unwrap();
    assert_abs_diff_eq!(score[0], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(score[1], 0.880_797_1, epsilon = 1e-6);
}

#[test]
fn flow_missing_input_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    write_pipeline(dir.path());
    let flow = load_from_dir(default_registry(), dir.path()).unwrap();

    let io = TensorIO::new([("age", Tensor::from_i64_data(vec![20]))]).unwrap();
    let err = flow.evaluate(&io).unwrap_err();
    assert_eq!(err.category(), sr_evaluator::ErrorCategory::Schema);
    assert_eq!(flow.evaluation_count(), 0);
}
