//! Query Classifier
//!
//! Layered routing decision; the first layer that fires wins:
//! 1. reference pattern (any length) -> reference lookup
//! 2. short input that closely matches a greeting -> small talk
//! 3. domain keyword or question phrase -> corpus question
//! 4. anything else -> corpus question

use serde::{Deserialize, Serialize};

use super::reference_parser::ReferenceParser;
use crate::config::ClassifierConfig;
use crate::fuzzy;

const DOMAIN_TERMS: &[&str] = &[
    "bible", "scripture", "verse", "passage", "god", "jesus", "holy spirit", "paul", "john",
    "gospel", "commandment", "sin", "grace", "salvation", "love", "faith", "hope", "spirit",
    "pray", "prayer", "wisdom", "proverb", "psalm", "law", "covenant", "testament", "nicodemus",
];

const QUESTION_PHRASES: &[&str] = &[
    "what does", "what do", "what is", "teach", "say about", "meaning of", "where does",
    "how does", "tell me about", "explain", "describe",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLabel {
    ReferenceLookup,
    CorpusQuestion,
    SmallTalk,
}

/// Which layer produced the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionLayer {
    ReferencePattern,
    Greeting,
    Keyword,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub label: ClassificationLabel,
    pub layer: DecisionLayer,
    /// Best greeting score when the greeting layer ran.
    pub greeting_score: Option<u8>,
}

pub struct QueryClassifier {
    config: ClassifierConfig,
    greetings: Vec<String>,
}

impl QueryClassifier {
    pub fn new(config: ClassifierConfig, greetings: Vec<String>) -> Self {
        Self { config, greetings }
    }

    pub fn classify(&self, query: &str) -> ClassificationLabel {
        self.explain(query).label
    }

    pub fn explain(&self, query: &str) -> Classification {
        let query_lower = query.trim().to_lowercase();

        if ReferenceParser::matches(&query_lower) {
            return Classification {
                label: ClassificationLabel::ReferenceLookup,
                layer: DecisionLayer::ReferencePattern,
                greeting_score: None,
            };
        }

        let mut greeting_score = None;
        if self.is_short(&query_lower) {
            let score = fuzzy::best_match(&query_lower, &self.greetings)
                .map(|m| m.score)
                .unwrap_or(0);
            greeting_score = Some(score);
            if score >= self.config.greeting_threshold {
                return Classification {
                    label: ClassificationLabel::SmallTalk,
                    layer: DecisionLayer::Greeting,
                    greeting_score,
                };
            }
        }

        let layer = if Self::has_corpus_signal(&query_lower) {
            DecisionLayer::Keyword
        } else {
            DecisionLayer::Default
        };

        Classification {
            label: ClassificationLabel::CorpusQuestion,
            layer,
            greeting_score,
        }
    }

    fn is_short(&self, query_lower: &str) -> bool {
        query_lower.split_whitespace().count() <= self.config.short_input_words
            || query_lower.chars().count() <= self.config.short_input_chars
    }

    fn has_corpus_signal(query_lower: &str) -> bool {
        QUESTION_PHRASES.iter().any(|p| query_lower.contains(p))
            || DOMAIN_TERMS.iter().any(|t| query_lower.contains(t))
    }
}
