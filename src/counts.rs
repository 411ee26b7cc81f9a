use crate::error::{RnaSeqError, Result};
use crate::types::{CountTable, RowIndex, SAMPLE_COLUMN};
use log::{debug, info};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Counts read from a single per-sample file
#[derive(Debug, Clone, PartialEq)]
pub struct SampleCounts {
    pub sample: String,
    pub path: PathBuf,
    /// (feature, count) pairs in file order
    pub features: Vec<(String, f64)>,
}

/// Derives a sample identifier from a count file name.
///
/// The identifier is the first `len` characters of the file stem, so
/// `GSM3533230_CGND-HRA-00013_counts.txt` becomes `GSM3533230` and
/// `sample001.txt` becomes `sample001`.
///
/// # Errors
/// * Returns `RnaSeqError::InvalidSampleId` if the name is not UTF-8 or the identifier would be empty
pub fn sample_id(path: &Path, len: usize) -> Result<String> {
    let id: String = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.chars().take(len).collect())
        .unwrap_or_default();

    if id.is_empty() {
        return Err(RnaSeqError::InvalidSampleId(path.to_path_buf()));
    }
    Ok(id)
}

/// Lists the regular files directly inside `dir` whose extension is `extension`,
/// sorted by file name.
pub fn list_count_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads a two-column, tab-separated count file.
///
/// The first line is a header and is discarded. Every following non-blank line
/// must be `<feature>\t<count>` with a numeric count.
///
/// # Errors
/// * Returns `RnaSeqError::InvalidFileFormat` for a missing header, a wrong field count or an empty feature
/// * Returns `RnaSeqError::InvalidCount` if a count is not numeric
/// * Returns `RnaSeqError::DuplicateFeature` if a feature is listed twice
/// * Returns `std::io::Error` for file reading issues
pub fn read_count_file(path: &Path) -> Result<Vec<(String, f64)>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut lines = reader.lines();
    if lines.next().transpose()?.is_none() {
        return Err(RnaSeqError::invalid_format(path, 1, "missing header line"));
    }

    let mut seen = HashSet::new();
    let mut features = Vec::new();

    for (idx, line) in lines.enumerate() {
        let line = line?;
        let line_no = idx + 2;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 2 {
            return Err(RnaSeqError::invalid_format(
                path,
                line_no,
                format!("expected 2 tab-separated fields, found {}", fields.len()),
            ));
        }

        let feature = fields[0].trim();
        if feature.is_empty() {
            return Err(RnaSeqError::invalid_format(path, line_no, "empty feature id"));
        }

        let count = fields[1]
            .trim()
            .parse::<f64>()
            .map_err(|_| RnaSeqError::InvalidCount {
                path: path.to_path_buf(),
                line: line_no,
                feature: feature.to_string(),
                value: fields[1].to_string(),
            })?;

        if !seen.insert(feature.to_string()) {
            return Err(RnaSeqError::DuplicateFeature {
                path: path.to_path_buf(),
                feature: feature.to_string(),
            });
        }
        features.push((feature.to_string(), count));
    }

    Ok(features)
}

/// Reads every count file in `dir`, failing on the first malformed file or on
/// two files mapping to the same sample id.
pub fn read_count_dir(dir: &Path, extension: &str, id_len: usize) -> Result<Vec<SampleCounts>> {
    let mut origins: HashMap<String, PathBuf> = HashMap::new();
    let mut samples = Vec::new();

    for path in list_count_files(dir, extension)? {
        let sample = sample_id(&path, id_len)?;
        if let Some(first) = origins.get(&sample) {
            return Err(RnaSeqError::DuplicateSample {
                id: sample,
                first: first.clone(),
                second: path,
            });
        }

        let features = read_count_file(&path)?;
        debug!(
            "Read {} features for sample {} from {}",
            features.len(),
            sample,
            path.display()
        );

        origins.insert(sample.clone(), path.clone());
        samples.push(SampleCounts {
            sample,
            path,
            features,
        });
    }

    Ok(samples)
}

/// Stacks per-sample counts into one table, one row per sample.
///
/// Feature columns follow first-seen order; a feature missing from a sample is null in that row.
///
/// # Returns
/// * `Result<(CountTable, RowIndex)>` - The table and the row of each sample id
///
/// # Errors
/// * Returns `RnaSeqError::ReservedColumn` if a feature is named like the sample column
/// * Returns `RnaSeqError::DuplicateSample` if two entries share a sample id
pub fn stack_counts(samples: &[SampleCounts]) -> Result<(CountTable, RowIndex)> {
    let n_samples = samples.len();
    let mut index = RowIndex::with_capacity(n_samples);
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut names: Vec<&str> = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = Vec::new();

    for (row, sample) in samples.iter().enumerate() {
        if let Some(&first) = index.get(&sample.sample) {
            return Err(RnaSeqError::DuplicateSample {
                id: sample.sample.clone(),
                first: samples[first].path.clone(),
                second: sample.path.clone(),
            });
        }
        index.insert(sample.sample.clone(), row);

        for (feature, count) in &sample.features {
            if feature == SAMPLE_COLUMN {
                return Err(RnaSeqError::ReservedColumn(feature.clone()));
            }
            let pos = *positions.entry(feature.as_str()).or_insert_with(|| {
                names.push(feature.as_str());
                values.push(vec![None; n_samples]);
                names.len() - 1
            });
            values[pos][row] = Some(*count);
        }
    }

    let ids: Vec<&str> = samples.iter().map(|s| s.sample.as_str()).collect();
    let mut columns = Vec::with_capacity(names.len() + 1);
    columns.push(Column::new(SAMPLE_COLUMN.into(), ids));
    for (name, column) in names.into_iter().zip(values) {
        columns.push(Column::new(name.into(), column));
    }

    let df = DataFrame::new(columns).map_err(|e| RnaSeqError::DataError(e.to_string()))?;
    Ok((df, index))
}

/// Loads the count table from every count file directly inside `dir`.
pub fn load_counts(dir: &Path, extension: &str, id_len: usize) -> Result<(CountTable, RowIndex)> {
    let samples = read_count_dir(dir, extension, id_len)?;
    let (df, index) = stack_counts(&samples)?;
    info!(
        "Loaded count table from {}: {} samples x {} features",
        dir.display(),
        df.height(),
        df.width().saturating_sub(1)
    );
    Ok((df, index))
}
