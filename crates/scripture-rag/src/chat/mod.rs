pub mod engine;

pub use engine::RoutingEngine;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rag::{Classification, ClassificationLabel};

/// Failures surfaced to the caller of `ask`/`respond`.
///
/// Everything recoverable (missing verse, unknown work, search outage)
/// degrades to a normal answer instead.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("answer synthesis failed: {0}")]
    Synthesis(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedAnswer {
    pub answer: String,
    pub classification: Classification,
    /// References the answer was built from: resolved verses for a lookup,
    /// the allow-list for a retrieval answer, empty otherwise.
    pub references: Vec<String>,
    /// The passage search failed and the answer fell back to general knowledge.
    pub retrieval_degraded: bool,
}

impl RoutedAnswer {
    pub fn label(&self) -> ClassificationLabel {
        self.classification.label
    }
}
