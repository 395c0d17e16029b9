//! Corpus file reading: one JSON array of records per work.

use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::VerseRecord;

#[derive(Debug, thiserror::Error)]
pub enum CorpusLoadError {
    #[error("corpus root {} does not exist or is not a directory", .path.display())]
    RootMissing { path: PathBuf },

    #[error("failed to list corpus root {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read corpus file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corpus file {} is not a valid JSON record array: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A single record that could not be indexed. Never fatal.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: record #{index}: {reason}", .file.display())]
pub struct RecordParseError {
    pub file: PathBuf,
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

impl NumberOrText {
    fn to_u32(&self) -> Option<u32> {
        match self {
            Self::Number(n) => u32::try_from(*n).ok(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "chapterNumber")]
    chapter: Option<NumberOrText>,
    #[serde(rename = "verseNumber")]
    verse: Option<NumberOrText>,
    value: Option<String>,
}

/// Everything read from one work file.
#[derive(Debug)]
pub(crate) struct WorkFile {
    /// File stem with original case, e.g. `1_John`.
    pub stem: String,
    pub records: Vec<VerseRecord>,
    pub skipped_non_body: usize,
    pub malformed: Vec<RecordParseError>,
}

/// Canonical id for a file stem: lowercase, spaces as underscores.
pub fn work_id_for_stem(stem: &str) -> String {
    stem.trim().to_lowercase().replace(' ', "_")
}

/// `*.json` files directly under `root`, in file-name order.
pub(crate) fn work_files(root: &Path) -> Result<Vec<PathBuf>, CorpusLoadError> {
    if !root.is_dir() {
        return Err(CorpusLoadError::RootMissing {
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| CorpusLoadError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_json {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

pub(crate) fn read_work_file(path: &Path, body_record_type: &str) -> Result<WorkFile, CorpusLoadError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let work_id = work_id_for_stem(&stem);

    let content = std::fs::read_to_string(path).map_err(|source| CorpusLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let values: Vec<Value> = serde_json::from_str(&content).map_err(|source| CorpusLoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records = Vec::with_capacity(values.len());
    let mut skipped_non_body = 0;
    let mut malformed = Vec::new();

    for (index, value) in values.into_iter().enumerate() {
        let parsed = if !value.is_object() {
            Err("record is not an object".to_string())
        } else if value.get("type").and_then(Value::as_str) != Some(body_record_type) {
            skipped_non_body += 1;
            continue;
        } else {
            parse_record(&work_id, value)
        };

        match parsed {
            Ok(record) => records.push(record),
            Err(reason) => {
                let err = RecordParseError {
                    file: path.to_path_buf(),
                    index,
                    reason,
                };
                tracing::warn!(error = %err, "Skipping malformed corpus record");
                malformed.push(err);
            }
        }
    }

    Ok(WorkFile {
        stem,
        records,
        skipped_non_body,
        malformed,
    })
}

fn parse_record(work_id: &str, value: Value) -> Result<VerseRecord, String> {
    let raw: RawRecord = serde_json::from_value(value).map_err(|e| e.to_string())?;

    let chapter = raw
        .chapter
        .as_ref()
        .ok_or("missing chapterNumber")?
        .to_u32()
        .ok_or("chapterNumber is not a non-negative integer")?;
    let verse = raw
        .verse
        .as_ref()
        .ok_or("missing verseNumber")?
        .to_u32()
        .ok_or("verseNumber is not a non-negative integer")?;
    let text = raw.value.ok_or("missing value")?;

    Ok(VerseRecord {
        work_id: work_id.to_string(),
        chapter,
        verse,
        text,
    })
}
