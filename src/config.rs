//! Dataset configuration.
//!
//! Defaults reproduce the GSE124439 layout: count files and the MINiML family
//! document both live in `Data/`. A TOML file can override any of them:
//!
//! ```toml
//! data_dir = "Data/"
//! metadata_file = "GSE124439_family.xml"
//! count_extension = "txt"
//! sample_id_len = 10
//! unknown_group = "strict"
//!
//! [channel_layout]
//! sample_group = 4
//! sample_group_tag = "sample group"
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "Data/";
pub const DEFAULT_METADATA_FILE: &str = "GSE124439_family.xml";

/// How `get_sample` treats a selector other than ALS, Control or Other
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownGroupPolicy {
    /// Return every annotated sample
    #[default]
    Permissive,
    /// Fail with `RnaSeqError::UnknownGroup`
    Strict,
}

/// Where each annotation field sits inside a MINiML `Channel` element.
///
/// Fields are matched by the `tag` attribute of `Characteristics` children first;
/// the zero-based child position is used only when no child carries the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelLayout {
    pub subject_id: usize,
    pub sample_group: usize,
    pub cns_subregion: usize,
    pub subject_id_tag: String,
    pub sample_group_tag: String,
    pub cns_subregion_tag: String,
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self {
            subject_id: 3,
            sample_group: 4,
            cns_subregion: 5,
            subject_id_tag: "subject id".into(),
            sample_group_tag: "sample group".into(),
            cns_subregion_tag: "cns subregion".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory scanned (non-recursively) for count files
    pub data_dir: PathBuf,
    /// MINiML document; relative paths are resolved against `data_dir`
    pub metadata_file: PathBuf,
    /// Extension of count files, without the dot
    pub count_extension: String,
    /// Number of leading filename characters forming the sample id
    pub sample_id_len: usize,
    pub channel_layout: ChannelLayout,
    pub unknown_group: UnknownGroupPolicy,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            metadata_file: PathBuf::from(DEFAULT_METADATA_FILE),
            count_extension: "txt".into(),
            sample_id_len: 10,
            channel_layout: ChannelLayout::default(),
            unknown_group: UnknownGroupPolicy::default(),
        }
    }
}

impl DatasetConfig {
    /// Default configuration reading from `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_metadata_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_file = path.into();
        self
    }

    pub fn with_count_extension(mut self, extension: impl Into<String>) -> Self {
        self.count_extension = extension.into();
        self
    }

    pub fn with_sample_id_len(mut self, len: usize) -> Self {
        self.sample_id_len = len;
        self
    }

    pub fn with_channel_layout(mut self, layout: ChannelLayout) -> Self {
        self.channel_layout = layout;
        self
    }

    pub fn with_unknown_group(mut self, policy: UnknownGroupPolicy) -> Self {
        self.unknown_group = policy;
        self
    }

    /// Path of the MINiML document
    pub fn metadata_path(&self) -> PathBuf {
        if self.metadata_file.is_absolute() {
            self.metadata_file.clone()
        } else {
            self.data_dir.join(&self.metadata_file)
        }
    }
}
