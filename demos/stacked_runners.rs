use std::sync::Arc;

use anyhow::{Context, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use racoon::config::{CvConfig, ModelConfig, ModelType, RunnerConfig};
use racoon::dataset::TableDataset;
use racoon::logging::init_logging;
use racoon::models::factory::build_model;
use racoon::runner::stack_features;
use racoon::{ModelSet, Runner, RunnerSet, StackedRunner};

fn synthetic(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = Array2::from_shape_fn((n, 5), |_| rng.gen_range(-2.0..2.0));
    let y = x
        .rows()
        .into_iter()
        .map(|row| if row[0] * row[1] + 0.5 * row[2] > 0.0 { 1.0 } else { 0.0 })
        .collect();
    (x, y)
}

fn gbdt(max_depth: u32, num_boost_round: u32) -> ModelConfig {
    ModelConfig::new(
        0.1,
        ModelType::GBDT {
            max_depth,
            num_boost_round,
            debug: false,
            training_optimization_level: 2,
            loss_type: "LogLikelyhood".to_string(),
        },
    )
}

fn main() -> Result<()> {
    init_logging("error,racoon=info");

    let (x, y) = synthetic(300, 11);
    let (test_x, _) = synthetic(60, 12);
    let cv = CvConfig {
        stratified: true,
        ..CvConfig::default()
    };
    let dataset = Arc::new(TableDataset::from_cv_config(x, y.clone(), &cv)?.with_test(test_x)?);

    let runner_config = RunnerConfig {
        parallel_folds: true,
        metric: Some("auc".to_string()),
        ..RunnerConfig::default()
    };
    let runner = || Runner::new(Arc::clone(&dataset)).with_config(runner_config.clone());

    let sets = vec![
        RunnerSet::new(
            ModelSet::new(build_model(gbdt(2, 20))?).with_name("gbdt-shallow"),
            runner()?,
        ),
        RunnerSet::new(
            ModelSet::new(build_model(gbdt(6, 40))?).with_name("gbdt-deep"),
            runner()?,
        ),
    ];

    let stacked = StackedRunner::new().parallel(true);
    let first_level = stacked.fit_evaluate(&sets)?;
    let results: Vec<_> = first_level.into_iter().map(|(result, _)| result).collect();
    for result in &results {
        println!("{}\n", result);
    }

    // Second level: a GBDT trained on the out-of-fold probabilities.
    let (train_meta, test_meta) = stack_features(&results)?;
    let test_meta = test_meta.context("every first-level run has test predictions")?;
    let meta_dataset = TableDataset::from_cv_config(train_meta, y, &cv)?.with_test(test_meta)?;
    let meta_runner = Runner::new(Arc::new(meta_dataset)).with_config(runner_config)?;
    let (meta_result, _) =
        meta_runner.fit_evaluate(&ModelSet::new(build_model(gbdt(2, 10))?).with_name("meta"))?;
    println!("{}", meta_result);
    Ok(())
}
