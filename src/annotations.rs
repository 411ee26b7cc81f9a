//! Sample annotations from a GEO MINiML family document.
//!
//! Each `<Sample iid="...">` directly under the document root contributes one row.
//! Its `<Channel>` elements carry the fields as `<Characteristics tag="...">` children.
//! When a sample has several channels the last one wins.

use crate::config::ChannelLayout;
use crate::error::{RnaSeqError, Result};
use crate::types::{
    AnnotationTable, RowIndex, CNS_SUBREGION, SAMPLE_COLUMN, SAMPLE_GROUP, SUBJECT_ID,
};
use log::{debug, info, warn};
use polars::prelude::*;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub const MINIML_NAMESPACE: &str = "http://www.ncbi.nlm.nih.gov/geo/info/MINiML";

/// Annotation fields of one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub subject_id: String,
    pub sample_group: String,
    pub cns_subregion: String,
}

/// A direct child element of a Channel
#[derive(Debug, Default)]
struct ChannelChild {
    tag: Option<String>,
    text: Option<String>,
}

fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| RnaSeqError::Xml(quick_xml::Error::from(e)))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = std::str::from_utf8(&attr.value)?.to_string();
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn sample_iid(e: &BytesStart) -> Result<String> {
    get_attribute(e, "iid")?.ok_or_else(|| RnaSeqError::missing_attribute("Sample", "iid"))
}

/// Picks the child tagged `tag`, else the child at `position`, and returns its trimmed text.
fn channel_field(
    sample: &str,
    children: &[ChannelChild],
    field: &str,
    tag: &str,
    position: usize,
) -> Result<String> {
    children
        .iter()
        .find(|child| {
            child
                .tag
                .as_deref()
                .is_some_and(|t| t.trim().eq_ignore_ascii_case(tag))
        })
        .or_else(|| children.get(position))
        .and_then(|child| child.text.as_deref())
        .map(|text| text.trim().to_string())
        .ok_or_else(|| RnaSeqError::missing_field(sample, field))
}

fn resolve_channel(
    sample: &str,
    children: &[ChannelChild],
    layout: &ChannelLayout,
) -> Result<Annotation> {
    Ok(Annotation {
        subject_id: channel_field(
            sample,
            children,
            SUBJECT_ID,
            &layout.subject_id_tag,
            layout.subject_id,
        )?,
        sample_group: channel_field(
            sample,
            children,
            SAMPLE_GROUP,
            &layout.sample_group_tag,
            layout.sample_group,
        )?,
        cns_subregion: channel_field(
            sample,
            children,
            CNS_SUBREGION,
            &layout.cns_subregion_tag,
            layout.cns_subregion,
        )?,
    })
}

/// Keeps first-seen sample order while letting later channels overwrite earlier ones
#[derive(Debug, Default)]
struct Annotations {
    rows: Vec<(String, Annotation)>,
    positions: HashMap<String, usize>,
}

impl Annotations {
    fn upsert(&mut self, sample: &str, annotation: Annotation) {
        match self.positions.get(sample) {
            Some(&pos) => self.rows[pos].1 = annotation,
            None => {
                self.positions.insert(sample.to_string(), self.rows.len());
                self.rows.push((sample.to_string(), annotation));
            }
        }
    }
}

/// Parses MINiML from any buffered reader.
///
/// # Returns
/// * `Result<Vec<(String, Annotation)>>` - One entry per annotated sample, in document order
///
/// # Errors
/// * Returns `RnaSeqError::Xml` for malformed XML
/// * Returns `RnaSeqError::MissingAttribute` if a Sample has no `iid`
/// * Returns `RnaSeqError::MissingField` if a Channel lacks one of the three fields
pub fn parse_annotations<R: BufRead>(
    reader: R,
    layout: &ChannelLayout,
) -> Result<Vec<(String, Annotation)>> {
    let mut reader = NsReader::from_reader(reader);
    let mut buf = Vec::new();
    let mut annotations = Annotations::default();

    let mut depth = 0usize;
    // (iid, depth of the Sample element)
    let mut sample: Option<(String, usize)> = None;
    // (depth of the Channel element, its direct children)
    let mut channel: Option<(usize, Vec<ChannelChild>)> = None;

    loop {
        buf.clear();
        let (ns, event) = reader.read_resolved_event_into(&mut buf)?;
        let in_ns = matches!(
            ns,
            ResolveResult::Bound(Namespace(n)) if n == MINIML_NAMESPACE.as_bytes()
        );

        match event {
            Event::Start(ref e) => {
                depth += 1;
                if let Some((channel_depth, children)) = channel.as_mut() {
                    if depth == *channel_depth + 1 {
                        children.push(ChannelChild {
                            tag: get_attribute(e, "tag")?,
                            text: None,
                        });
                    }
                } else if sample.is_some() {
                    if in_ns && e.local_name().as_ref() == b"Channel" {
                        channel = Some((depth, Vec::new()));
                    }
                } else if in_ns && depth == 2 && e.local_name().as_ref() == b"Sample" {
                    sample = Some((sample_iid(e)?, depth));
                }
            }
            Event::Empty(ref e) => {
                if let Some((channel_depth, children)) = channel.as_mut() {
                    if depth == *channel_depth {
                        children.push(ChannelChild {
                            tag: get_attribute(e, "tag")?,
                            text: None,
                        });
                    }
                } else if let Some((id, _)) = sample.as_ref() {
                    if in_ns && e.local_name().as_ref() == b"Channel" {
                        return Err(RnaSeqError::missing_field(id.as_str(), SUBJECT_ID));
                    }
                } else if in_ns && depth == 1 && e.local_name().as_ref() == b"Sample" {
                    let id = sample_iid(e)?;
                    debug!("Sample {} has no channels", id);
                }
            }
            Event::Text(ref t) => {
                if let Some((channel_depth, children)) = channel.as_mut() {
                    if depth == *channel_depth + 1 {
                        if let Some(child) = children.last_mut() {
                            let text = t.unescape()?;
                            child.text.get_or_insert_with(String::new).push_str(&text);
                        }
                    }
                }
            }
            Event::CData(ref c) => {
                if let Some((channel_depth, children)) = channel.as_mut() {
                    if depth == *channel_depth + 1 {
                        if let Some(child) = children.last_mut() {
                            let text = std::str::from_utf8(c)?;
                            child.text.get_or_insert_with(String::new).push_str(text);
                        }
                    }
                }
            }
            Event::End(_) => {
                if channel.as_ref().is_some_and(|(d, _)| *d == depth) {
                    if let (Some((_, children)), Some((id, _))) = (channel.take(), sample.as_ref()) {
                        let annotation = resolve_channel(id, &children, layout)?;
                        debug!("Sample {}: {:?}", id, annotation);
                        annotations.upsert(id, annotation);
                    }
                } else if sample.as_ref().is_some_and(|(_, d)| *d == depth) {
                    sample = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(annotations.rows)
}

/// Reads annotations from a MINiML file.
pub fn read_annotations(path: &Path, layout: &ChannelLayout) -> Result<Vec<(String, Annotation)>> {
    let file = File::open(path)?;
    let rows = parse_annotations(BufReader::new(file), layout)?;
    if rows.is_empty() {
        warn!("No annotated samples found in {}", path.display());
    }
    Ok(rows)
}

/// Builds the annotation table, one row per sample.
///
/// # Returns
/// * `Result<(AnnotationTable, RowIndex)>` - A DataFrame with columns:
///   - "sample": The sample identifier (`iid`)
///   - "Subject ID", "Sample Group", "CNS Subregion": The trimmed channel fields
pub fn annotation_table(rows: &[(String, Annotation)]) -> Result<(AnnotationTable, RowIndex)> {
    let mut index = RowIndex::with_capacity(rows.len());
    for (row, (sample, _)) in rows.iter().enumerate() {
        if index.insert(sample.clone(), row).is_some() {
            return Err(RnaSeqError::DataError(format!(
                "sample '{}' annotated more than once",
                sample
            )));
        }
    }

    let df = DataFrame::new(vec![
        Column::new(
            SAMPLE_COLUMN.into(),
            rows.iter().map(|(s, _)| s.as_str()).collect::<Vec<&str>>(),
        ),
        Column::new(
            SUBJECT_ID.into(),
            rows.iter()
                .map(|(_, a)| a.subject_id.as_str())
                .collect::<Vec<&str>>(),
        ),
        Column::new(
            SAMPLE_GROUP.into(),
            rows.iter()
                .map(|(_, a)| a.sample_group.as_str())
                .collect::<Vec<&str>>(),
        ),
        Column::new(
            CNS_SUBREGION.into(),
            rows.iter()
                .map(|(_, a)| a.cns_subregion.as_str())
                .collect::<Vec<&str>>(),
        ),
    ])
    .map_err(|e| RnaSeqError::DataError(e.to_string()))?;

    Ok((df, index))
}

/// Loads the annotation table from a MINiML file.
pub fn load_annotations(path: &Path, layout: &ChannelLayout) -> Result<(AnnotationTable, RowIndex)> {
    let rows = read_annotations(path, layout)?;
    let (df, index) = annotation_table(&rows)?;
    info!("Loaded {} sample annotations from {}", df.height(), path.display());
    Ok((df, index))
}
