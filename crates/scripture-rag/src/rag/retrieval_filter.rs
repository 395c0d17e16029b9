//! Retrieval narrowing by work/chapter hints inferred from the question.
//!
//! The vector index returns passages by similarity alone. When the question
//! names a place ("john 3", "gospel of john", or a figure tied to one
//! passage) the ranked list is narrowed to that place, keeping rank order.
//! Narrowing never empties a non-empty list: if nothing matches the hint,
//! the unfiltered top passages are used instead.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::types::RetrievedDocument;

/// `<work> <chapter>` with an optional leading numeral, e.g. `1 john 4`.
static EXPLICIT_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:[1-3]\s?)?[a-z]+)\s+([0-9]{1,3})\b").expect("explicit hint regex is valid")
});

/// Phrases that name a work without a chapter.
pub const WORK_PHRASES: &[(&str, &str)] = &[
    ("gospel of john", "john"),
    ("book of john", "john"),
    ("john's gospel", "john"),
];

/// Figures tied to one passage: (phrase, work, chapter).
pub const ENTITY_SHORTCUTS: &[(&str, &str, u32)] = &[("nicodemus", "john", 3)];

/// A proper noun that points at one fixed passage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityShortcut {
    pub phrase: String,
    pub work: String,
    pub chapter: Option<u32>,
}

impl EntityShortcut {
    pub fn new(phrase: &str, work: &str, chapter: Option<u32>) -> Self {
        Self {
            phrase: phrase.to_lowercase(),
            work: normalize_work(work),
            chapter,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalHint {
    /// Normalized work name: lowercase, single spaces, no underscores.
    pub work: Option<String>,
    pub chapter: Option<u32>,
}

impl RetrievalHint {
    pub fn is_empty(&self) -> bool {
        self.work.is_none() && self.chapter.is_none()
    }

    fn matches(&self, doc: &RetrievedDocument) -> bool {
        if let Some(work) = &self.work {
            if normalize_work(&doc.metadata.work) != *work {
                return false;
            }
        }
        if let Some(chapter) = self.chapter {
            if doc.metadata.chapter != Some(chapter) {
                return false;
            }
        }
        true
    }
}

fn normalize_work(name: &str) -> String {
    name.replace('_', " ")
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct HintExtractor {
    work_phrases: Vec<(String, String)>,
    entities: Vec<EntityShortcut>,
}

impl Default for HintExtractor {
    fn default() -> Self {
        Self {
            work_phrases: WORK_PHRASES
                .iter()
                .map(|(phrase, work)| (phrase.to_string(), normalize_work(work)))
                .collect(),
            entities: ENTITY_SHORTCUTS
                .iter()
                .map(|(phrase, work, chapter)| EntityShortcut::new(phrase, work, Some(*chapter)))
                .collect(),
        }
    }
}

impl HintExtractor {
    pub fn with_entity(mut self, shortcut: EntityShortcut) -> Self {
        self.entities.push(shortcut);
        self
    }

    pub fn extract(&self, question: &str) -> RetrievalHint {
        let q = question.to_lowercase();
        let mut hint = RetrievalHint::default();

        if let Some(caps) = EXPLICIT_HINT_RE.captures(&q) {
            hint.work = caps.get(1).map(|m| normalize_work(m.as_str()));
            hint.chapter = caps.get(2).and_then(|m| m.as_str().parse().ok());
        }

        if hint.work.is_none() {
            if let Some((_, work)) = self.work_phrases.iter().find(|(phrase, _)| q.contains(phrase.as_str())) {
                hint.work = Some(work.clone());
            }
        }

        let entity = self.entities.iter().find(|e| {
            q.contains(e.phrase.as_str()) && hint.work.as_deref().map_or(true, |w| w == e.work)
        });
        if let Some(entity) = entity {
            hint.work = Some(entity.work.clone());
            hint.chapter = hint.chapter.or(entity.chapter);
        }

        hint
    }
}

/// Passages handed to answer synthesis, with their citation strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredPassages {
    pub documents: Vec<RetrievedDocument>,
    /// `"<work> <chapter>:<verse>"` per document; the only references the
    /// answer may cite.
    pub allowed_references: Vec<String>,
    /// A hint was present but matched nothing, so the unfiltered list was used.
    pub fell_back: bool,
}

impl FilteredPassages {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// One `"<reference> - <content>"` line per passage.
    pub fn context(&self) -> String {
        self.documents
            .iter()
            .zip(&self.allowed_references)
            .map(|(doc, reference)| format!("{} - {}", reference, doc.content.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct RetrievalFilter {
    top_n: usize,
}

impl RetrievalFilter {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn apply(&self, documents: Vec<RetrievedDocument>, hint: &RetrievalHint) -> FilteredPassages {
        let mut fell_back = false;

        let kept: Vec<RetrievedDocument> = if hint.is_empty() {
            documents.into_iter().take(self.top_n).collect()
        } else {
            let (matching, rest): (Vec<_>, Vec<_>) =
                documents.into_iter().partition(|doc| hint.matches(doc));
            if matching.is_empty() {
                fell_back = !rest.is_empty();
                rest.into_iter().take(self.top_n).collect()
            } else {
                matching.into_iter().take(self.top_n).collect()
            }
        };

        tracing::debug!(
            hint = ?hint,
            kept = kept.len(),
            fell_back = fell_back,
            "Retrieval filter applied"
        );

        let allowed_references = kept.iter().map(RetrievedDocument::reference).collect();
        FilteredPassages {
            documents: kept,
            allowed_references,
            fell_back,
        }
    }
}
