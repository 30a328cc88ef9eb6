use std::sync::Arc;

use anyhow::{Context, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use racoon::config::CvConfig;
use racoon::dataset::TableDataset;
use racoon::experiment::ExpManager;
use racoon::io::{read_features_csv, read_labels_csv};
use racoon::logging::init_logging;
use racoon::metrics::Metric;
use racoon::models::factory::build_model_by_name;
use racoon::{ModelSet, Runner};

/// Two noisy Gaussian blobs, labels 0/1.
fn synthetic(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = Array2::zeros((n, 4));
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let label = (i % 2) as f64;
        let shift = if label == 1.0 { 1.0 } else { -1.0 };
        for j in 0..4 {
            x[[i, j]] = shift * (j as f64 + 1.0) * 0.5 + rng.gen_range(-1.5..1.5);
        }
        y[i] = label;
    }
    (x, y)
}

/// Usage: `gbdt_cross_validation [features.csv labels.csv]`
fn main() -> Result<()> {
    init_logging("error,racoon=info");

    let cv = CvConfig {
        n_splits: 5,
        stratified: true,
        ..CvConfig::default()
    };
    let args: Vec<String> = std::env::args().collect();
    let dataset = match (args.get(1), args.get(2)) {
        (Some(features), Some(labels)) => TableDataset::from_cv_config(
            read_features_csv(features, false).context("Failed to load features")?,
            read_labels_csv(labels, false).context("Failed to load labels")?,
            &cv,
        )?,
        _ => {
            let (x, y) = synthetic(400, 42);
            let (test_x, _) = synthetic(50, 7);
            TableDataset::from_cv_config(x, y, &cv)?.with_test(test_x)?
        }
    };
    let runner = Runner::new(Arc::new(dataset)).with_metric(
        Metric::from_name("auc").context("auc metric is built in")?,
    );

    let model_set = ModelSet::new(build_model_by_name("gbdt", 0.1)?).with_name("gbdt-baseline");
    let (result, models) = runner.fit_evaluate(&model_set)?;
    log::info!("Trained {} fold models", models.len());
    println!("{}", result);

    let root = std::env::temp_dir().join("racoon-demo");
    let manager = ExpManager::new(Some(root))?;
    for path in manager.save_eval_result(&result)? {
        println!("wrote {}", path.display());
    }
    Ok(())
}
