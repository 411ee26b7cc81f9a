use phf::phf_map;
use polars::prelude::*;
use std::collections::HashMap;

/// Per-sample feature counts
/// Stored as a DataFrame with a leading "sample" column followed by one f64 column per feature
pub type CountTable = DataFrame;

/// Per-sample metadata
/// Stored as a DataFrame with columns sample, Subject ID, Sample Group, CNS Subregion
pub type AnnotationTable = DataFrame;

/// Row position of each sample id within a table
pub type RowIndex = HashMap<String, usize>;

/// Name of the column holding sample identifiers in every table
pub const SAMPLE_COLUMN: &str = "sample";

/// Name of the column holding feature identifiers in statistic tables
pub const FEATURE_COLUMN: &str = "feature";

pub const SUBJECT_ID: &str = "Subject ID";
pub const SAMPLE_GROUP: &str = "Sample Group";
pub const CNS_SUBREGION: &str = "CNS Subregion";

/// Annotation columns in table order
pub const ANNOTATION_FIELDS: [&str; 3] = [SUBJECT_ID, SAMPLE_GROUP, CNS_SUBREGION];

static GROUP_LABELS: phf::Map<&'static str, &'static str> = phf_map! {
    "ALS" => "ALS Spectrum MND",
    "Control" => "Non-Neurological Control",
    "Other" => "Other Neurological Disorders",
};

/// Clinical sample group selectable by short name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleGroup {
    Als,
    Control,
    Other,
}

impl SampleGroup {
    pub const ALL: [SampleGroup; 3] = [SampleGroup::Als, SampleGroup::Control, SampleGroup::Other];

    /// Short selector name ("ALS", "Control", "Other")
    pub fn selector(self) -> &'static str {
        match self {
            SampleGroup::Als => "ALS",
            SampleGroup::Control => "Control",
            SampleGroup::Other => "Other",
        }
    }

    /// Value of the Sample Group annotation for this group
    pub fn label(self) -> &'static str {
        GROUP_LABELS[self.selector()]
    }

    /// Parses a short selector name. Matching is exact.
    pub fn from_selector(selector: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.selector() == selector)
    }
}

/// What to look up in a table: a whole column, or a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item<'a> {
    Column(&'a str),
    Cell { sample: &'a str, column: &'a str },
}

/// Result of an [`Item`] lookup
#[derive(Debug, Clone)]
pub enum Lookup {
    Column(Column),
    Count(Option<f64>),
    Text(String),
}

/// Per-feature aggregate computed over a group of samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Median,
    StdDev,
}

impl Statistic {
    /// Column label of the resulting statistic table
    pub fn label(self) -> &'static str {
        match self {
            Statistic::Mean => "Means",
            Statistic::Median => "Medians",
            Statistic::StdDev => "Standard Deviations",
        }
    }
}
