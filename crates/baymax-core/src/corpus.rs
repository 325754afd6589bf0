//! Corpus normalizer: turns the two knowledge files into flat passages.
//!
//! - `kb.json`: `{"knowledge_base": [topic, ...]}`, each topic holding
//!   `data: {section: payload}`. One passage per section, headed by
//!   `[<topic_name> / <section>]`.
//! - `mb.json`: `[{"chunk_text": ..., "metadata": {...}}, ...]`, passed through.
//!
//! A missing or unparsable file contributes zero passages and a warning.
//! Malformed records are skipped per record and reported, see [`SkipPolicy`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::sources::normalize_sources;
use crate::types::{Attribution, Passage};

const KB_ROOT_KEY: &str = "knowledge_base";
const MISSING_TOPIC_NAME: &str = "-";

/// Why a record contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAnObject,
    DataNotObject,
    MissingText,
    EmptyText,
    NonStringText,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotAnObject => "record is not an object",
            Self::DataNotObject => "topic data is not an object",
            Self::MissingText => "chunk_text is missing",
            Self::EmptyText => "chunk_text is empty",
            Self::NonStringText => "chunk_text is not a string",
        };
        f.write_str(s)
    }
}

/// What to do with a malformed record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SkipPolicy {
    /// Drop it and keep a note in the report.
    #[default]
    Skip,
    /// Abort normalization with [`Error::Skipped`].
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Structured,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub source: SourceKind,
    /// Position of the record within its file.
    pub index: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub passages: Vec<Passage>,
    pub skipped: Vec<SkippedRecord>,
    /// Files that could not be read or parsed.
    pub unavailable: Vec<PathBuf>,
}

impl NormalizeReport {
    pub fn skipped_count(&self, source: SourceKind) -> usize {
        self.skipped.iter().filter(|s| s.source == source).count()
    }
}

#[derive(Debug, Clone)]
pub struct CorpusPaths {
    pub kb_file: PathBuf,
    pub mb_file: PathBuf,
}

#[derive(Debug, Default)]
pub struct CorpusNormalizer {
    policy: SkipPolicy,
}

impl CorpusNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: SkipPolicy) -> Self {
        Self { policy }
    }

    /// Reads both files. Unavailable files are logged and skipped, so this only
    /// fails under [`SkipPolicy::Fail`].
    pub fn process_files(&self, paths: &CorpusPaths) -> Result<NormalizeReport> {
        let mut report = NormalizeReport::default();

        let topics = match load_structured(&paths.kb_file) {
            Ok(t) => t,
            Err(e) => {
                warn!("{e}; no structured knowledge will be loaded");
                report.unavailable.push(paths.kb_file.clone());
                Vec::new()
            }
        };
        let chunks = match load_flat(&paths.mb_file) {
            Ok(c) => c,
            Err(e) => {
                warn!("{e}; no flat knowledge will be loaded");
                report.unavailable.push(paths.mb_file.clone());
                Vec::new()
            }
        };

        self.process_values(&topics, &chunks, &mut report)?;
        info!(
            "Normalized {} passages ({} structured skips, {} flat skips)",
            report.passages.len(),
            report.skipped_count(SourceKind::Structured),
            report.skipped_count(SourceKind::Flat)
        );
        Ok(report)
    }

    /// Normalizes already-parsed records, structured first.
    pub fn process_values(&self, topics: &[Value], chunks: &[Value], report: &mut NormalizeReport) -> Result<()> {
        for (index, topic) in topics.iter().enumerate() {
            match flatten_topic(topic) {
                Ok(passages) => report.passages.extend(passages),
                Err(reason) => self.skip(report, SourceKind::Structured, index, reason)?,
            }
        }
        for (index, chunk) in chunks.iter().enumerate() {
            match flatten_chunk(chunk) {
                Ok(passage) => report.passages.push(passage),
                Err(reason) => self.skip(report, SourceKind::Flat, index, reason)?,
            }
        }
        Ok(())
    }

    fn skip(&self, report: &mut NormalizeReport, source: SourceKind, index: usize, reason: SkipReason) -> Result<()> {
        debug!("Skipping {:?} record {}: {}", source, index, reason);
        if self.policy == SkipPolicy::Fail {
            return Err(Error::Skipped(reason));
        }
        report.skipped.push(SkippedRecord { source, index, reason });
        Ok(())
    }
}

/// Topic array from `kb.json`. A missing `knowledge_base` key is an empty corpus.
pub fn load_structured(path: &Path) -> Result<Vec<Value>> {
    let root = read_json(path)?;
    match root {
        Value::Object(mut map) => match map.remove(KB_ROOT_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(topics)) => Ok(topics),
            Some(_) => Err(unavailable(path, format!("'{KB_ROOT_KEY}' is not a JSON list"))),
        },
        _ => Err(unavailable(path, "top level is not a JSON object")),
    }
}

/// Record array from `mb.json`.
pub fn load_flat(path: &Path) -> Result<Vec<Value>> {
    match read_json(path)? {
        Value::Array(records) => Ok(records),
        _ => Err(unavailable(path, "top level is not a JSON list")),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(unavailable(path, "file does not exist"));
    }
    let raw = fs::read_to_string(path).map_err(|e| unavailable(path, e))?;
    serde_json::from_str(&raw).map_err(|e| unavailable(path, e))
}

fn unavailable(path: &Path, reason: impl fmt::Display) -> Error {
    Error::SourceUnavailable { path: path.to_path_buf(), reason: reason.to_string() }
}

/// One passage per section of a structured topic.
pub fn flatten_topic(topic: &Value) -> std::result::Result<Vec<Passage>, SkipReason> {
    let topic = topic.as_object().ok_or(SkipReason::NotAnObject)?;
    let data = match topic.get("data") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(data)) => data,
        Some(_) => return Err(SkipReason::DataNotObject),
    };

    let topic_id = optional_text(topic, "topic_id");
    let topic_name = optional_text(topic, "topic_name");
    let sources = normalize_sources(topic.get("sources"));
    let label = topic_name.as_deref().or(topic_id.as_deref()).unwrap_or(MISSING_TOPIC_NAME);

    let passages = data
        .iter()
        .map(|(section, payload)| {
            let header = section_header(label, section);
            let lines = section_lines(payload);
            let text = if lines.is_empty() { header } else { format!("{header}\n{}", lines.join("\n")) };
            Passage {
                text,
                metadata: Attribution {
                    topic_id: topic_id.clone(),
                    topic_name: topic_name.clone(),
                    section: Some(section.clone()),
                    sources: sources.clone(),
                },
            }
        })
        .collect();
    Ok(passages)
}

/// A pre-chunked record; `chunk_text` passes through verbatim.
pub fn flatten_chunk(record: &Value) -> std::result::Result<Passage, SkipReason> {
    let record = record.as_object().ok_or(SkipReason::NotAnObject)?;
    let text = match record.get("chunk_text") {
        None | Some(Value::Null) => return Err(SkipReason::MissingText),
        Some(Value::String(s)) if s.is_empty() => return Err(SkipReason::EmptyText),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(SkipReason::NonStringText),
    };
    let empty = Map::new();
    let meta = record.get("metadata").and_then(Value::as_object).unwrap_or(&empty);
    Ok(Passage {
        text,
        metadata: Attribution {
            topic_id: optional_text(meta, "topic_id"),
            topic_name: optional_text(meta, "topic_name"),
            section: optional_text(meta, "section"),
            sources: normalize_sources(meta.get("sources")),
        },
    })
}

pub fn section_header(topic_name: &str, section: &str) -> String {
    format!("[{topic_name} / {section}]")
}

/// Readable lines for one section payload.
///
/// mapping: `key: value`, one line per element when the value is a list;
/// list: one line per element; anything else: a single line.
pub fn section_lines(payload: &Value) -> Vec<String> {
    match payload {
        Value::Object(map) => map
            .iter()
            .flat_map(|(key, value)| match value {
                Value::Array(items) => items.iter().map(|item| format!("{key}: {}", render_scalar(item))).collect::<Vec<_>>(),
                other => vec![format!("{key}: {}", render_scalar(other))],
            })
            .collect(),
        Value::Array(items) => items.iter().map(render_scalar).collect(),
        scalar => vec![render_scalar(scalar)],
    }
}

/// Strings verbatim, everything else as compact JSON text.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested @ (Value::Array(_) | Value::Object(_)) => nested.to_string(),
    }
}

fn optional_text(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(render_scalar(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_payload_is_one_line() {
        assert_eq!(section_lines(&json!("Istirahat cukup")), vec!["Istirahat cukup"]);
        assert_eq!(section_lines(&json!(3)), vec!["3"]);
    }

    #[test]
    fn list_payload_is_line_per_item() {
        assert_eq!(section_lines(&json!(["a", 1, true])), vec!["a", "1", "true"]);
    }

    #[test]
    fn nested_values_render_as_json() {
        let lines = section_lines(&json!({"dosis": [{"usia": "anak"}]}));
        assert_eq!(lines, vec![r#"dosis: {"usia":"anak"}"#]);
    }

    #[test]
    fn mapping_keeps_file_order() {
        let payload: Value = serde_json::from_str(r#"{"z": "last?", "a": "first?"}"#).unwrap();
        assert_eq!(section_lines(&payload), vec!["z: last?", "a: first?"]);
    }
}
