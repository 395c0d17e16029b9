use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One verse of prose body text, keyed by (work_id, chapter, verse).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseRecord {
    /// Lowercase canonical identifier, e.g. `1_john`.
    pub work_id: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

/// A parsed `<work> <chapter>:<verse>[-<verse>]` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceQuery {
    /// Work name exactly as it appeared in the input.
    pub work_name_raw: String,
    pub chapter: u32,
    pub verse_start: u32,
    /// Always >= `verse_start`; equals it when no range was given.
    pub verse_end: u32,
}

impl ReferenceQuery {
    pub fn is_range(&self) -> bool {
        self.verse_end > self.verse_start
    }
}

impl fmt::Display for ReferenceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_range() {
            write!(
                f,
                "{} {}:{}-{}",
                self.work_name_raw, self.chapter, self.verse_start, self.verse_end
            )
        } else {
            write!(f, "{} {}:{}", self.work_name_raw, self.chapter, self.verse_start)
        }
    }
}

/// Location metadata attached to a retrieved passage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub work: String,
    pub chapter: Option<u32>,
    pub verse: Option<u32>,
}

/// A passage returned by the vector index, in similarity order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub score: f32,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, work: impl Into<String>, chapter: u32, verse: u32) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata {
                work: work.into(),
                chapter: Some(chapter),
                verse: Some(verse),
            },
            score: 0.0,
        }
    }

    /// `"<work> <chapter>:<verse>"`, with `?` for missing numbers.
    pub fn reference(&self) -> String {
        let chapter = self
            .metadata
            .chapter
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string());
        let verse = self
            .metadata
            .verse
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!("{} {}:{}", self.metadata.work.trim(), chapter, verse)
            .trim()
            .to_string()
    }
}

/// One question/answer exchange held in conversation memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub question: String,
    pub answer: String,
    pub recorded_at: DateTime<Utc>,
}

impl DialogueTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            recorded_at: Utc::now(),
        }
    }
}
