use polars::prelude::PolarsError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RnaSeqError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid file format in {path} at line {line}: {message}")]
    InvalidFileFormat {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Invalid count '{value}' for feature '{feature}' in {path} at line {line}")]
    InvalidCount {
        path: PathBuf,
        line: usize,
        feature: String,
        value: String,
    },

    #[error("Sample id '{id}' derived from both {first} and {second}")]
    DuplicateSample {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Feature '{feature}' appears more than once in {path}")]
    DuplicateFeature { path: PathBuf, feature: String },

    #[error("Cannot derive a sample id from {0}")]
    InvalidSampleId(PathBuf),

    #[error("'{0}' is reserved for the sample index column")]
    ReservedColumn(String),

    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    #[error("Sample {sample}: channel has no usable '{field}' field")]
    MissingField { sample: String, field: String },

    #[error("{} sample(s) in the count table have no annotation: {}", .0.len(), .0.join(", "))]
    UnannotatedSamples(Vec<String>),

    #[error("Unknown sample: {0}")]
    UnknownSample(String),

    #[error("Unknown sample group '{0}' (expected ALS, Control or Other)")]
    UnknownGroup(String),

    #[error("Data error: {0}")]
    DataError(String),
}

/// Type alias for Result with RnaSeqError
pub type Result<T> = std::result::Result<T, RnaSeqError>;

impl RnaSeqError {
    /// Create a new InvalidFileFormat error
    pub fn invalid_format(path: &Path, line: usize, message: impl Into<String>) -> Self {
        RnaSeqError::InvalidFileFormat {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    /// Create a new MissingAttribute error
    pub fn missing_attribute(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        RnaSeqError::MissingAttribute {
            element: element.into(),
            attribute: attribute.into(),
        }
    }

    /// Create a new MissingField error
    pub fn missing_field(sample: impl Into<String>, field: impl Into<String>) -> Self {
        RnaSeqError::MissingField {
            sample: sample.into(),
            field: field.into(),
        }
    }
}
