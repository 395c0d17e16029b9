use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::llm::GenerationConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptureConfig {
    pub corpus: CorpusConfig,
    pub classifier: ClassifierConfig,
    pub retrieval: RetrievalConfig,
    pub small_talk: SmallTalkConfig,
    pub memory: MemoryConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub root: PathBuf,
    /// Only records whose `type` equals this are indexed.
    pub body_record_type: String,
    /// Minimum similarity (0-100) for a work name to resolve.
    pub work_match_threshold: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub greeting_threshold: u8,
    pub short_input_words: usize,
    pub short_input_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates requested from the vector index.
    pub candidate_k: usize,
    /// Passages kept after filtering.
    pub top_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmallTalkConfig {
    /// A canned reply is used only when the best score is strictly above this.
    pub threshold: u8,
    pub candidate_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub window: usize,
}

impl ScriptureConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.corpus.body_record_type.trim().is_empty() {
            return Err("corpus.body_record_type must not be empty".into());
        }
        if self.corpus.work_match_threshold > 100 {
            return Err("corpus.work_match_threshold must be in [0, 100]".into());
        }
        if self.classifier.greeting_threshold > 100 {
            return Err("classifier.greeting_threshold must be in [0, 100]".into());
        }
        if self.small_talk.threshold > 100 {
            return Err("small_talk.threshold must be in [0, 100]".into());
        }
        if self.small_talk.candidate_limit == 0 {
            return Err("small_talk.candidate_limit must be > 0".into());
        }
        if self.retrieval.top_n == 0 {
            return Err("retrieval.top_n must be > 0".into());
        }
        if self.retrieval.candidate_k < self.retrieval.top_n {
            return Err("retrieval.candidate_k must be >= retrieval.top_n".into());
        }
        if self.memory.window == 0 {
            return Err("memory.window must be > 0".into());
        }
        if self.generation.max_tokens == 0 {
            return Err("generation.max_tokens must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// `SCRIPTURE_CORPUS` replaces the corpus root, `MAX_TOKENS` the generation budget.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("SCRIPTURE_CORPUS") {
            if !root.trim().is_empty() {
                self.corpus.root = PathBuf::from(root);
            }
        }
        if let Ok(raw) = std::env::var("MAX_TOKENS") {
            match raw.trim().parse::<usize>() {
                Ok(max_tokens) if max_tokens > 0 => self.generation.max_tokens = max_tokens,
                _ => tracing::warn!(value = %raw, "Ignoring invalid MAX_TOKENS"),
            }
        }
    }
}

impl Default for ScriptureConfig {
    fn default() -> Self {
        Self {
            corpus: CorpusConfig::default(),
            classifier: ClassifierConfig::default(),
            retrieval: RetrievalConfig::default(),
            small_talk: SmallTalkConfig::default(),
            memory: MemoryConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        let root = if Path::new("bible/bible_books").exists() {
            PathBuf::from("bible/bible_books")
        } else {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("scripture-rag")
                .join("corpus")
        };

        Self {
            root,
            body_record_type: "paragraph text".to_string(),
            work_match_threshold: 70,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            greeting_threshold: 90,
            short_input_words: 4,
            short_input_chars: 25,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_k: 10,
            top_n: 5,
        }
    }
}

impl Default for SmallTalkConfig {
    fn default() -> Self {
        Self {
            threshold: 75,
            candidate_limit: 3,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { window: 3 }
    }
}
