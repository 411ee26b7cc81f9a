use crate::annotations::load_annotations;
use crate::config::{DatasetConfig, UnknownGroupPolicy};
use crate::counts::load_counts;
use crate::error::{RnaSeqError, Result};
use crate::stats::summarize;
use crate::types::{
    AnnotationTable, CountTable, Item, Lookup, RowIndex, SampleGroup, Statistic, SAMPLE_COLUMN,
    SAMPLE_GROUP,
};
use log::{debug, info, warn};
use polars::lazy::dsl::*;
use polars::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;

/// Count and annotation tables of one dataset, loaded together and read-only afterwards.
///
/// Every sample in the count table is guaranteed to have an annotation row;
/// construction fails otherwise.
///
/// # Example
/// ```ignore
/// use rna_sequences::RnaSequences;
///
/// let data = RnaSequences::new("Data/").unwrap();
/// let als_means = data.mean(Some("ALS")).unwrap();
/// println!("{:?}", als_means);
/// ```
#[derive(Debug, Clone)]
pub struct RnaSequences {
    config: DatasetConfig,
    counts: CountTable,
    count_rows: RowIndex,
    annotations: AnnotationTable,
    annotation_rows: RowIndex,
}

/// Fails with the sorted list of count samples that have no annotation row.
pub fn check_alignment(count_rows: &RowIndex, annotation_rows: &RowIndex) -> Result<()> {
    let mut missing: Vec<String> = count_rows
        .keys()
        .filter(|sample| !annotation_rows.contains_key(*sample))
        .cloned()
        .collect();

    if missing.is_empty() {
        return Ok(());
    }
    missing.sort();
    Err(RnaSeqError::UnannotatedSamples(missing))
}

fn ordered_ids(index: &RowIndex) -> Vec<&str> {
    let mut ids: Vec<(&str, usize)> = index.iter().map(|(id, &row)| (id.as_str(), row)).collect();
    ids.sort_by_key(|&(_, row)| row);
    ids.into_iter().map(|(id, _)| id).collect()
}

impl RnaSequences {
    /// Loads every count file in `data_dir` and the MINiML document next to them,
    /// using default settings otherwise.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::from_config(DatasetConfig::new(data_dir))
    }

    /// Loads from the default `Data/` directory.
    pub fn open_default() -> Result<Self> {
        Self::from_config(DatasetConfig::default())
    }

    /// Loads both tables and checks that every counted sample is annotated.
    ///
    /// # Errors
    /// * Any count file or metadata error, see [`crate::counts`] and [`crate::annotations`]
    /// * Returns `RnaSeqError::UnannotatedSamples` if the alignment check fails
    pub fn from_config(config: DatasetConfig) -> Result<Self> {
        let (counts, count_rows) = load_counts(
            &config.data_dir,
            &config.count_extension,
            config.sample_id_len,
        )?;
        let (annotations, annotation_rows) =
            load_annotations(&config.metadata_path(), &config.channel_layout)?;

        check_alignment(&count_rows, &annotation_rows)?;

        let unmeasured = annotation_rows.len().saturating_sub(count_rows.len());
        if unmeasured > 0 {
            debug!("{} annotated samples have no count file", unmeasured);
        }
        info!(
            "Aligned {} counted samples with {} annotations",
            count_rows.len(),
            annotation_rows.len()
        );

        Ok(Self {
            config,
            counts,
            count_rows,
            annotations,
            annotation_rows,
        })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Full count table
    pub fn get_counts(&self) -> &CountTable {
        &self.counts
    }

    /// Full annotation table
    pub fn get_annotations(&self) -> &AnnotationTable {
        &self.annotations
    }

    /// Sample ids of the count table, in row order
    pub fn sample_ids(&self) -> Vec<&str> {
        ordered_ids(&self.count_rows)
    }

    /// Sample ids of the annotation table, in row order
    pub fn annotated_ids(&self) -> Vec<&str> {
        ordered_ids(&self.annotation_rows)
    }

    /// Feature ids, in column order
    pub fn feature_ids(&self) -> Vec<&str> {
        self.counts
            .get_column_names_str()
            .into_iter()
            .filter(|name| *name != SAMPLE_COLUMN)
            .collect()
    }

    pub fn n_samples(&self) -> usize {
        self.counts.height()
    }

    pub fn n_features(&self) -> usize {
        self.counts.width().saturating_sub(1)
    }

    fn count_row(&self, sample: &str) -> Result<usize> {
        self.count_rows
            .get(sample)
            .copied()
            .ok_or_else(|| RnaSeqError::UnknownSample(sample.to_string()))
    }

    fn annotation_row(&self, sample: &str) -> Result<usize> {
        self.annotation_rows
            .get(sample)
            .copied()
            .ok_or_else(|| RnaSeqError::UnknownSample(sample.to_string()))
    }

    /// Counts of one feature across all samples
    pub fn count_column(&self, feature: &str) -> Result<Column> {
        Ok(self.counts.column(feature)?.clone())
    }

    /// Count of one feature in one sample; `None` if the sample's file did not list the feature
    pub fn count_cell(&self, sample: &str, feature: &str) -> Result<Option<f64>> {
        let row = self.count_row(sample)?;
        Ok(self.counts.column(feature)?.f64()?.get(row))
    }

    /// One annotation field across all samples
    pub fn annotation_column(&self, field: &str) -> Result<Column> {
        Ok(self.annotations.column(field)?.clone())
    }

    /// One annotation field of one sample
    pub fn annotation_cell(&self, sample: &str, field: &str) -> Result<String> {
        let row = self.annotation_row(sample)?;
        self.annotations
            .column(field)?
            .str()?
            .get(row)
            .map(str::to_string)
            .ok_or_else(|| RnaSeqError::DataError(format!("{sample}: no value for '{field}'")))
    }

    pub fn get_count(&self, item: Item) -> Result<Lookup> {
        match item {
            Item::Column(feature) => self.count_column(feature).map(Lookup::Column),
            Item::Cell { sample, column } => self.count_cell(sample, column).map(Lookup::Count),
        }
    }

    pub fn get_annotation(&self, item: Item) -> Result<Lookup> {
        match item {
            Item::Column(field) => self.annotation_column(field).map(Lookup::Column),
            Item::Cell { sample, column } => self.annotation_cell(sample, column).map(Lookup::Text),
        }
    }

    /// Annotation rows of one group, or all rows for `None`.
    pub fn get_group(&self, group: Option<SampleGroup>) -> Result<AnnotationTable> {
        match group {
            None => Ok(self.annotations.clone()),
            Some(group) => Ok(self
                .annotations
                .clone()
                .lazy()
                .filter(col(SAMPLE_GROUP).eq(lit(group.label())))
                .collect()?),
        }
    }

    /// Annotation rows selected by "ALS", "Control" or "Other"; all rows for `None`.
    ///
    /// Any other selector returns all rows under the permissive policy and
    /// fails with `RnaSeqError::UnknownGroup` under the strict one.
    pub fn get_sample(&self, group: Option<&str>) -> Result<AnnotationTable> {
        let selected = match group {
            None => None,
            Some(selector) => match SampleGroup::from_selector(selector) {
                Some(group) => Some(group),
                None => match self.config.unknown_group {
                    UnknownGroupPolicy::Permissive => {
                        warn!("Unknown sample group '{}', selecting all samples", selector);
                        None
                    }
                    UnknownGroupPolicy::Strict => {
                        return Err(RnaSeqError::UnknownGroup(selector.to_string()))
                    }
                },
            },
        };
        self.get_group(selected)
    }

    /// Count rows of the samples selected by [`Self::get_sample`], in count table order.
    pub fn get_sample_count(&self, group: Option<&str>) -> Result<CountTable> {
        let selected = self.get_sample(group)?;
        let ids: HashSet<&str> = selected
            .column(SAMPLE_COLUMN)?
            .str()?
            .into_iter()
            .flatten()
            .collect();

        let mask: BooleanChunked = self
            .counts
            .column(SAMPLE_COLUMN)?
            .str()?
            .into_iter()
            .map(|sample| sample.is_some_and(|s| ids.contains(s)))
            .collect();

        Ok(self.counts.filter(&mask)?)
    }

    /// Per-feature `statistic` over the samples of `group`.
    pub fn summarize(&self, group: Option<&str>, statistic: Statistic) -> Result<DataFrame> {
        summarize(&self.get_sample_count(group)?, statistic)
    }

    /// Per-feature mean, column "Means"
    pub fn mean(&self, group: Option<&str>) -> Result<DataFrame> {
        self.summarize(group, Statistic::Mean)
    }

    /// Per-feature median, column "Medians"
    pub fn median(&self, group: Option<&str>) -> Result<DataFrame> {
        self.summarize(group, Statistic::Median)
    }

    /// Per-feature sample standard deviation, column "Standard Deviations"
    pub fn std(&self, group: Option<&str>) -> Result<DataFrame> {
        self.summarize(group, Statistic::StdDev)
    }
}
