pub mod chat;
pub mod config;
pub mod corpus;
pub mod fuzzy;
pub mod llm;
pub mod memory;
pub mod rag;
pub mod search;
pub mod types;

// Re-export primary types for convenience
pub use chat::{RoutedAnswer, RoutingEngine, RoutingError};
pub use config::ScriptureConfig;
pub use corpus::{CorpusIndex, CorpusLoadError, LoadReport, PassageLookup, VerseLookup};
pub use memory::ConversationMemory;
pub use rag::{ClassificationLabel, QueryClassifier, ReferenceParser, RetrievalFilter};
pub use search::{VectorIndex, VerseTextIndex};
pub use types::{DialogueTurn, DocumentMetadata, ReferenceQuery, RetrievedDocument, VerseRecord};

// Re-export LLM types
pub use llm::{ApiProvider, ExternalProvider, GenerationConfig, LLMProvider};

// Re-export common types
pub use anyhow::{Error, Result};
