use crate::error::{RnaSeqError, Result};
use crate::types::{CountTable, Statistic, FEATURE_COLUMN, SAMPLE_COLUMN};
use polars::prelude::*;
use statrs::statistics::{Data, Median, Statistics};

/// Applies `statistic` to a set of non-null values.
///
/// Mean and median of no values are NaN, as is the standard deviation of fewer than two.
/// The standard deviation is the sample (n - 1) estimate.
pub fn aggregate(values: &[f64], statistic: Statistic) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    match statistic {
        Statistic::Mean => values.iter().mean(),
        Statistic::Median => Data::new(values.to_vec()).median(),
        Statistic::StdDev => values.iter().std_dev(),
    }
}

/// Computes `statistic` for every feature column of a count table.
///
/// # Arguments
/// * `counts` - Count table (a "sample" column followed by feature columns)
/// * `statistic` - Aggregate to compute over the rows of `counts`
///
/// # Returns
/// * `Result<DataFrame>` - A DataFrame with one row per feature:
///   - "feature": The feature identifier
///   - The statistic label ("Means", "Medians" or "Standard Deviations"): The aggregate value
///
/// # Errors
/// * Returns `RnaSeqError::DataError` if a feature column is not numeric or DataFrame creation fails
pub fn summarize(counts: &CountTable, statistic: Statistic) -> Result<DataFrame> {
    let mut features: Vec<&str> = Vec::with_capacity(counts.width());
    let mut results: Vec<f64> = Vec::with_capacity(counts.width());

    for column in counts.get_columns() {
        if column.name().as_str() == SAMPLE_COLUMN {
            continue;
        }
        let values: Vec<f64> = column
            .f64()
            .map_err(|e| RnaSeqError::DataError(e.to_string()))?
            .into_iter()
            .flatten()
            .collect();

        features.push(column.name().as_str());
        results.push(aggregate(&values, statistic));
    }

    let df = DataFrame::new(vec![
        Column::new(FEATURE_COLUMN.into(), features),
        Column::new(statistic.label().into(), results),
    ])
    .map_err(|e| RnaSeqError::DataError(e.to_string()))?;

    Ok(df)
}
