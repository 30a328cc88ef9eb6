//! End-to-end runs with the built-in GBDT model.

use std::sync::Arc;

use ndarray::{Array1, Array2};

use racoon::config::{load_config, CvConfig};
use racoon::dataset::TableDataset;
use racoon::metrics::Metric;
use racoon::models::factory::{build_model, build_model_by_name};
use racoon::models::FitParams;
use racoon::progress::{CapturingSink, ProgressSink};
use racoon::target::TargetType;
use racoon::{ModelSet, Runner};

/// 24 rows; the label is 1 when the second feature is positive.
fn separable() -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((24, 3), |(i, j)| match j {
        0 => i as f64 * 0.1,
        1 => if i % 2 == 0 { 1.0 + i as f64 * 0.01 } else { -1.0 - i as f64 * 0.01 },
        _ => 5.0,
    });
    let y = Array1::from_shape_fn(24, |i| if i % 2 == 0 { 1.0 } else { 0.0 });
    (x, y)
}

fn capturing_runner(dataset: TableDataset, sink: &Arc<CapturingSink>) -> Runner {
    let sink: Arc<dyn ProgressSink> = sink.clone();
    Runner::new(Arc::new(dataset)).with_sink(sink)
}

#[test]
fn gbdt_binary_cross_validation() {
    let (x, y) = separable();
    let cv = CvConfig {
        n_splits: 3,
        stratified: true,
        ..CvConfig::default()
    };
    let dataset = TableDataset::from_cv_config(x.clone(), y, &cv)
        .unwrap()
        .with_test(x.slice(ndarray::s![..4, ..]).to_owned())
        .unwrap();
    assert_eq!(dataset.type_of_target(), TargetType::Binary);

    let sink = Arc::new(CapturingSink::new());
    let runner = capturing_runner(dataset, &sink).with_metric(Metric::from_name("auc").unwrap());

    let mut fit_params = FitParams::new();
    fit_params.insert("num_boost_round".to_string(), serde_json::json!(5));
    fit_params.insert("max_depth".to_string(), serde_json::json!(3));
    let model_set = ModelSet::new(build_model_by_name("gbdt", 0.1).unwrap()).with_fit_params(fit_params);

    let (result, models) = runner.fit_evaluate(&model_set).unwrap();
    assert_eq!(models.len(), 3);
    assert_eq!(result.model_name.as_deref(), Some("GBDT"));
    assert_eq!(result.oof.shape(), vec![24]);
    assert!(result.oof.iter().all(|p| (0.0..=1.0).contains(p)));

    let test = result.test_probas.as_ref().unwrap();
    assert_eq!(test.shape(), vec![4]);
    assert!(test.iter().all(|p| (0.0..=1.0).contains(p)));

    let overall = result.overall_score.unwrap();
    assert!((0.0..=1.0).contains(&overall));
    assert_eq!(sink.fold_scores().len(), 3);
    assert_eq!(sink.overall_scores(), vec![overall]);
}

#[test]
fn gbdt_regression_cross_validation() {
    let x = Array2::from_shape_fn((12, 2), |(i, j)| (i + j) as f64);
    let y = Array1::from_shape_fn(12, |i| i as f64 * 0.5 + 0.25);
    let cv = CvConfig {
        n_splits: 3,
        ..CvConfig::default()
    };
    let dataset = TableDataset::from_cv_config(x, y, &cv).unwrap();
    assert_eq!(dataset.type_of_target(), TargetType::Continuous);

    let sink = Arc::new(CapturingSink::new());
    let runner = capturing_runner(dataset, &sink).with_metric(Metric::from_name("rmse").unwrap());
    let model_set = ModelSet::new(build_model_by_name("gbdt-regression", 0.1).unwrap());

    let (result, _) = runner.fit_evaluate(&model_set).unwrap();
    assert_eq!(result.oof.shape(), vec![12]);
    assert!(result.oof.iter().all(|v| v.is_finite()));
    assert!(result.overall_score.unwrap() >= 0.0);
}

#[test]
fn harness_config_drives_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("harness.json");
    std::fs::write(
        &path,
        r#"{
            "runner": {"parallel_folds": true, "metric": "log_loss"},
            "cv": {"n_splits": 2, "stratified": true, "seed": 7},
            "model": {
                "learning_rate": 0.2,
                "GBDT": {
                    "max_depth": 3,
                    "num_boost_round": 4,
                    "debug": false,
                    "training_optimization_level": 2,
                    "loss_type": "LogLikelyhood"
                }
            }
        }"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert!(config.runner.parallel_folds);
    assert_eq!(config.cv.n_splits, 2);

    let (x, y) = separable();
    let dataset = TableDataset::from_cv_config(x, y, &config.cv).unwrap();
    let sink = Arc::new(CapturingSink::new());
    let runner = capturing_runner(dataset, &sink)
        .with_config(config.runner.clone())
        .unwrap();
    assert_eq!(runner.metric().unwrap().name(), "log_loss");

    let model_set = ModelSet::new(build_model(config.model).unwrap());
    let (result, _) = runner.fit_evaluate(&model_set).unwrap();
    assert!(result.overall_score.unwrap().is_finite());
    assert_eq!(sink.fold_scores().iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_config(dir.path().join("nope.json")).is_err());
}
