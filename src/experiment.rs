//! Versioned experiment directories.
//!
//! Each [`ExpManager`] claims a fresh `exp-<N>` directory under a root, with
//! `features/` and `output/` sub-directories. Evaluation results can be
//! written to `output/` as CSV predictions plus a JSON summary.
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::evaluator::{EvalResult, EvalSummary};
use crate::io::write_prediction_csv;

const EXP_PREFIX: &str = "exp-";

/// Which experiment sub-directory [`ExpManager::sweep`] empties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTarget {
    Features,
    Output,
}

#[derive(Debug, Clone)]
pub struct ExpManager {
    root_exp_dir: PathBuf,
    version: u32,
    exp_dir: PathBuf,
    features_dir: PathBuf,
    output_dir: PathBuf,
}

/// Summary file written next to the saved predictions.
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedRun {
    pub experiment: String,
    pub saved_at: String,
    #[serde(flatten)]
    pub summary: EvalSummary,
}

impl ExpManager {
    /// Create the next experiment directory under `root_exp_dir`, or under
    /// the current directory when `None`.
    pub fn new(root_exp_dir: Option<PathBuf>) -> Result<Self> {
        let root_exp_dir = match root_exp_dir {
            Some(root) => root,
            None => std::env::current_dir().context("Failed to resolve the current directory")?,
        };
        fs::create_dir_all(&root_exp_dir)
            .with_context(|| format!("Failed to create experiment root: {:?}", root_exp_dir))?;

        let version = next_version(&root_exp_dir)?;
        let exp_dir = root_exp_dir.join(format!("{}{}", EXP_PREFIX, version));
        let features_dir = exp_dir.join("features");
        let output_dir = exp_dir.join("output");
        for dir in [&features_dir, &output_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }
        log::info!("Experiment directory: {:?}", exp_dir);

        Ok(ExpManager {
            root_exp_dir,
            version,
            exp_dir,
            features_dir,
            output_dir,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn root_exp_dir(&self) -> &Path {
        &self.root_exp_dir
    }

    pub fn exp_dir(&self) -> &Path {
        &self.exp_dir
    }

    pub fn features_dir(&self) -> &Path {
        &self.features_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Delete everything in the chosen sub-directory, leaving it empty.
    pub fn sweep(&self, target: SweepTarget) -> Result<()> {
        let dir = match target {
            SweepTarget::Features => &self.features_dir,
            SweepTarget::Output => &self.output_dir,
        };
        if dir.exists() {
            fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {:?}", dir))?;
        }
        fs::create_dir(dir).with_context(|| format!("Failed to recreate {:?}", dir))?;
        match target {
            SweepTarget::Features => log::info!("[Swept Features Directory]"),
            SweepTarget::Output => log::info!("[Swept Output Directory]"),
        }
        Ok(())
    }

    /// Write `<name>_oof.csv`, `<name>_test.csv` (when test predictions
    /// exist) and `<name>_summary.json` into the output directory. The name
    /// is the result's model name, `model` when it has none. Returns the
    /// written paths.
    pub fn save_eval_result(&self, result: &EvalResult) -> Result<Vec<PathBuf>> {
        let name = file_stem(result.model_name.as_deref().unwrap_or("model"));
        let mut written = Vec::with_capacity(3);

        let oof_path = self.output_dir.join(format!("{}_oof.csv", name));
        write_prediction_csv(&oof_path, &result.oof)?;
        written.push(oof_path);

        if let Some(test) = &result.test_probas {
            let test_path = self.output_dir.join(format!("{}_test.csv", name));
            write_prediction_csv(&test_path, test)?;
            written.push(test_path);
        }

        let saved = SavedRun {
            experiment: format!("{}{}", EXP_PREFIX, self.version),
            saved_at: Local::now().to_rfc3339(),
            summary: result.summary(),
        };
        let summary_path = self.output_dir.join(format!("{}_summary.json", name));
        let json = serde_json::to_string_pretty(&saved)?;
        fs::write(&summary_path, json)
            .with_context(|| format!("Failed to write summary: {:?}", summary_path))?;
        written.push(summary_path);

        log::info!("[Save Result]: {} ({} files)", name, written.len());
        Ok(written)
    }
}

impl fmt::Display for ExpManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "root experiment directory: {}", self.root_exp_dir.display())?;
        writeln!(f, "experiment version: {}{}", EXP_PREFIX, self.version)?;
        writeln!(f, "features directory: {}", self.features_dir.display())?;
        write!(f, "output directory: {}", self.output_dir.display())
    }
}

/// One more than the highest `exp-<N>` directory under `root`, 0 if none.
/// Entries whose suffix is not a number are ignored.
fn next_version(root: &Path) -> Result<u32> {
    let mut highest: Option<u32> = None;
    for entry in fs::read_dir(root).with_context(|| format!("Failed to list {:?}", root))? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let version = name
            .to_str()
            .and_then(|n| n.strip_prefix(EXP_PREFIX))
            .and_then(|v| v.parse::<u32>().ok());
        if let Some(v) = version {
            highest = Some(highest.map_or(v, |h| h.max(v)));
        }
    }
    Ok(highest.map_or(0, |h| h + 1))
}

/// Keep file names portable: anything outside `[A-Za-z0-9_.-]` becomes `_`.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
