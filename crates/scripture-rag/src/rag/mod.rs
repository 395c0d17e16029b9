//! Routing and retrieval building blocks - reference parsing, query
//! classification, retrieval narrowing, prompting and small talk.

pub mod prompts;
pub mod query_classifier;
pub mod reference_parser;
pub mod retrieval_filter;
pub mod small_talk;

// Re-export commonly used types
pub use prompts::{
    build_answer_prompt, build_general_prompt, build_lookup_prompt, tidy_answer, with_disclaimer,
    GENERAL_DISCLAIMER,
};
pub use query_classifier::{Classification, ClassificationLabel, DecisionLayer, QueryClassifier};
pub use reference_parser::ReferenceParser;
pub use retrieval_filter::{
    EntityShortcut, FilteredPassages, HintExtractor, RetrievalFilter, RetrievalHint,
};
pub use small_talk::{greeting_phrases, SmallTalk, FALLBACK_REPLY, GREETINGS};
