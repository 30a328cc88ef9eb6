use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use ndarray::{Array1, Array2};

use crate::prediction::Prediction;

/// `\t` for `.tsv` files, `,` otherwise.
fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("tsv") => b'\t',
        _ => b',',
    }
}

fn parse_field(field: &str, row: usize, path: &Path) -> Result<f64> {
    field
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid number {:?} on row {} of {:?}", field, row, path))
}

/// Read a numeric feature table. Every row must have the same width.
pub fn read_features_csv<P: AsRef<Path>>(path: P, has_headers: bool) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .delimiter(delimiter_for(path))
        .from_path(path)
        .with_context(|| format!("Failed to open features file: {:?}", path))?;

    let mut data = Vec::new();
    let mut n_features = None;
    let mut n_samples = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read row {} of {:?}", row, path))?;
        match n_features {
            None => n_features = Some(record.len()),
            Some(n) if n != record.len() => {
                bail!("Row {} of {:?} has {} fields, expected {}", row, path, record.len(), n)
            }
            Some(_) => {}
        }
        for field in record.iter() {
            data.push(parse_field(field, row, path)?);
        }
        n_samples += 1;
    }

    let n_features = n_features.unwrap_or(0);
    Array2::from_shape_vec((n_samples, n_features), data)
        .with_context(|| format!("Failed to build feature matrix from {:?}", path))
}

/// Read the first column of a table as labels.
pub fn read_labels_csv<P: AsRef<Path>>(path: P, has_headers: bool) -> Result<Array1<f64>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .delimiter(delimiter_for(path))
        .from_path(path)
        .with_context(|| format!("Failed to open labels file: {:?}", path))?;

    let labels = reader
        .records()
        .enumerate()
        .map(|(row, record)| {
            let record = record.with_context(|| format!("Failed to read row {} of {:?}", row, path))?;
            let value = record
                .get(0)
                .with_context(|| format!("Empty row {} in {:?}", row, path))?;
            parse_field(value, row, path)
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(Array1::from_vec(labels))
}

/// Write predictions with a header row: `prediction` for vectors,
/// `class_0 .. class_{k-1}` for matrices.
pub fn write_prediction_csv<P: AsRef<Path>>(path: P, prediction: &Prediction) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter_for(path))
        .from_writer(BufWriter::new(file));

    let columns = prediction.to_columns();
    let header: Vec<String> = match prediction {
        Prediction::Vector(_) => vec!["prediction".to_string()],
        Prediction::Matrix(m) => (0..m.ncols()).map(|j| format!("class_{}", j)).collect(),
    };
    writer.write_record(&header)?;
    for row in columns.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}
