//! Load per-sample RNA-seq count files and GEO MINiML sample annotations into aligned Polars tables

pub mod annotations;
pub mod config;
pub mod counts;
pub mod dataset;
pub mod error;
pub mod stats;
pub mod types;

pub use config::{ChannelLayout, DatasetConfig, UnknownGroupPolicy};
pub use dataset::RnaSequences;
pub use error::{RnaSeqError, Result};
pub use types::{Item, Lookup, SampleGroup, Statistic};
