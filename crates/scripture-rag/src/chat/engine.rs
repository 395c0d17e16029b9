use std::sync::Arc;

use crate::config::{RetrievalConfig, ScriptureConfig};
use crate::corpus::{CorpusIndex, PassageLookup};
use crate::llm::{GenerationConfig, LLMProvider};
use crate::memory::ConversationMemory;
use crate::rag::{
    build_answer_prompt, build_general_prompt, build_lookup_prompt, greeting_phrases,
    tidy_answer, with_disclaimer, ClassificationLabel, HintExtractor, QueryClassifier,
    ReferenceParser, RetrievalFilter, SmallTalk,
};
use crate::search::VectorIndex;

use super::{RoutedAnswer, RoutingError};

pub const UNPARSED_REFERENCE_REPLY: &str = "I'm sorry, I couldn't understand the verse reference.";

/// One conversation: classify, dispatch to a branch, record the turn.
///
/// The corpus is shared read-only; the memory belongs to this engine.
pub struct RoutingEngine {
    corpus: Arc<CorpusIndex>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LLMProvider>,
    classifier: QueryClassifier,
    hints: HintExtractor,
    filter: RetrievalFilter,
    small_talk: SmallTalk,
    memory: ConversationMemory,
    retrieval: RetrievalConfig,
    generation: GenerationConfig,
}

struct BranchOutput {
    answer: String,
    references: Vec<String>,
    retrieval_degraded: bool,
}

impl BranchOutput {
    fn plain(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            references: Vec::new(),
            retrieval_degraded: false,
        }
    }
}

impl RoutingEngine {
    pub fn new(
        corpus: Arc<CorpusIndex>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LLMProvider>,
        config: ScriptureConfig,
    ) -> Self {
        Self {
            corpus,
            index,
            llm,
            classifier: QueryClassifier::new(config.classifier, greeting_phrases()),
            hints: HintExtractor::default(),
            filter: RetrievalFilter::new(config.retrieval.top_n),
            small_talk: SmallTalk::new(config.small_talk),
            memory: ConversationMemory::new(config.memory),
            retrieval: config.retrieval,
            generation: config.generation,
        }
    }

    /// Replace the hint extractor, e.g. to add entity shortcuts.
    pub fn with_hint_extractor(mut self, hints: HintExtractor) -> Self {
        self.hints = hints;
        self
    }

    pub async fn ask(&mut self, question: &str) -> Result<String, RoutingError> {
        self.respond(question).await.map(|routed| routed.answer)
    }

    /// Route one question and record the exchange.
    ///
    /// The turn is recorded exactly once for every answer produced; a
    /// synthesis failure produces no answer and records nothing.
    pub async fn respond(&mut self, question: &str) -> Result<RoutedAnswer, RoutingError> {
        let question = question.trim();
        let memory_context = self.memory.format();
        let classification = self.classifier.explain(question);

        tracing::info!(
            label = ?classification.label,
            layer = ?classification.layer,
            greeting_score = ?classification.greeting_score,
            "Query classified"
        );

        let output = match classification.label {
            ClassificationLabel::ReferenceLookup => self.lookup(question, &memory_context).await?,
            ClassificationLabel::CorpusQuestion => self.retrieve(question).await?,
            ClassificationLabel::SmallTalk => BranchOutput::plain(self.small_talk.respond(question)),
        };

        self.memory.append(question, output.answer.clone());

        Ok(RoutedAnswer {
            answer: output.answer,
            classification,
            references: output.references,
            retrieval_degraded: output.retrieval_degraded,
        })
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn reset(&mut self) {
        self.memory.clear();
    }

    async fn lookup(&self, question: &str, memory_context: &str) -> Result<BranchOutput, RoutingError> {
        let Some(reference) = ReferenceParser::parse(question) else {
            return Ok(BranchOutput::plain(UNPARSED_REFERENCE_REPLY));
        };

        let (lines, references, work_recognized) = match self.corpus.get_passage(
            &reference.work_name_raw,
            reference.chapter,
            reference.verse_start,
            reference.verse_end,
        ) {
            PassageLookup::Found { title, verses, .. } => {
                let references: Vec<String> = verses
                    .iter()
                    .map(|v| format!("{} {}:{}", title, v.chapter, v.verse))
                    .collect();
                let lines = verses
                    .iter()
                    .zip(&references)
                    .map(|(v, r)| format!("{} - {}", r, v.text))
                    .collect::<Vec<_>>();
                (lines, references, true)
            }
            PassageLookup::WorkNotRecognized => {
                tracing::warn!(work = %reference.work_name_raw, "Work name not recognized");
                (Vec::new(), Vec::new(), false)
            }
        };

        tracing::info!(
            reference = %reference,
            resolved = lines.len(),
            "Verse lookup"
        );

        let prompt = build_lookup_prompt(memory_context, &lines, question, work_recognized);
        let answer = self.generate(&prompt).await?;
        Ok(BranchOutput {
            answer,
            references,
            retrieval_degraded: false,
        })
    }

    async fn retrieve(&self, question: &str) -> Result<BranchOutput, RoutingError> {
        let (documents, retrieval_degraded) =
            match self.index.search(question, self.retrieval.candidate_k).await {
                Ok(documents) => (documents, false),
                Err(e) => {
                    tracing::warn!(index = %self.index.name(), error = %e, "Passage search failed, answering without passages");
                    (Vec::new(), true)
                }
            };
        let candidates = documents.len();

        let hint = self.hints.extract(question);
        let passages = self.filter.apply(documents, &hint);

        tracing::info!(
            candidates = candidates,
            kept = passages.documents.len(),
            work_hint = ?hint.work,
            chapter_hint = ?hint.chapter,
            fell_back = passages.fell_back,
            "Retrieval complete"
        );

        if passages.is_empty() {
            let answer = self.generate(&build_general_prompt(question)).await?;
            return Ok(BranchOutput {
                answer: with_disclaimer(&answer),
                references: Vec::new(),
                retrieval_degraded,
            });
        }

        let answer = self.generate(&build_answer_prompt(&passages, question)).await?;
        Ok(BranchOutput {
            answer,
            references: passages.allowed_references,
            retrieval_degraded,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, RoutingError> {
        let raw = self
            .llm
            .generate(prompt, &self.generation)
            .await
            .map_err(|e| {
                tracing::error!(provider = %self.llm.name(), error = %e, "Generation failed");
                RoutingError::Synthesis(e)
            })?;
        Ok(tidy_answer(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::{GENERAL_DISCLAIMER, GREETINGS};
    use crate::types::{RetrievedDocument, VerseRecord};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes a fixed answer and records every prompt it receives.
    struct RecordingProvider {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for RecordingProvider {
        async fn generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LLMProvider for FailingProvider {
        async fn generate(&self, _prompt: &str, _config: &GenerationConfig) -> Result<String> {
            Err(anyhow!("model offline"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct FixedIndex(Vec<RetrievedDocument>);

    #[async_trait]
    impl VectorIndex for FixedIndex {
        async fn search(&self, _query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
            Ok(self.0.iter().take(k).cloned().collect())
        }
    }

    struct BrokenIndex;

    #[async_trait]
    impl VectorIndex for BrokenIndex {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<RetrievedDocument>> {
            Err(anyhow!("index unavailable"))
        }
    }

    fn corpus() -> Arc<CorpusIndex> {
        let mut corpus = CorpusIndex::new(70);
        corpus.register_work("John");
        corpus.register_work("1_John");
        for (verse, text) in [
            (16, "For God so loved the world"),
            (17, "For God sent not his Son into the world to condemn the world"),
        ] {
            corpus.insert(VerseRecord {
                work_id: "john".to_string(),
                chapter: 3,
                verse,
                text: text.to_string(),
            });
        }
        Arc::new(corpus)
    }

    fn ranked() -> Vec<RetrievedDocument> {
        vec![
            RetrievedDocument::new("All things work together", "Romans", 8, 28),
            RetrievedDocument::new("Except a man be born again", "John", 3, 3),
            RetrievedDocument::new("God is love", "1 John", 4, 8),
            RetrievedDocument::new("Nicodemus came by night", "John", 3, 2),
            RetrievedDocument::new("In the beginning", "Genesis", 1, 1),
            RetrievedDocument::new("The Lord is my shepherd", "Psalms", 23, 1),
            RetrievedDocument::new("Brought myrrh and aloes", "John", 19, 39),
            RetrievedDocument::new("How can these things be", "John", 3, 9),
        ]
    }

    fn engine(index: Arc<dyn VectorIndex>, llm: Arc<dyn LLMProvider>) -> RoutingEngine {
        RoutingEngine::new(corpus(), index, llm, ScriptureConfig::default())
    }

    #[tokio::test]
    async fn test_small_talk_needs_no_model() {
        let llm = RecordingProvider::new("unused");
        let mut engine = engine(Arc::new(FixedIndex(ranked())), llm.clone());

        let routed = engine.respond("hi").await.unwrap();
        assert_eq!(routed.label(), ClassificationLabel::SmallTalk);
        assert_eq!(routed.answer, GREETINGS[1].1);
        assert!(llm.prompts().is_empty());
        assert_eq!(engine.memory().len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_sends_resolved_verses() {
        let llm = RecordingProvider::new("God loved the world.");
        let mut engine = engine(Arc::new(FixedIndex(ranked())), llm.clone());

        let routed = engine.respond("John 3:16-18").await.unwrap();
        assert_eq!(routed.label(), ClassificationLabel::ReferenceLookup);
        assert_eq!(routed.answer, "God loved the world.");
        // 3:18 is missing from the corpus and skipped.
        assert_eq!(routed.references, vec!["John 3:16", "John 3:17"]);

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("John 3:16 - For God so loved the world\nJohn 3:17 - For God sent"));
        assert!(!prompt.contains("not recognized"));
    }

    #[tokio::test]
    async fn test_lookup_of_unknown_work_still_answers() {
        let llm = RecordingProvider::new("That book is not in the corpus.");
        let mut engine = engine(Arc::new(FixedIndex(ranked())), llm.clone());

        let routed = engine.respond("Zorp 1:1").await.unwrap();
        assert!(routed.references.is_empty());
        assert!(llm.prompts()[0].contains("not recognized"));
        assert_eq!(engine.memory().len(), 1);
    }

    #[tokio::test]
    async fn test_unparsed_reference_makes_no_calls() {
        let llm = RecordingProvider::new("unused");
        let engine = engine(Arc::new(FixedIndex(ranked())), llm.clone());

        let output = engine.lookup("no reference here", "").await.unwrap();
        assert_eq!(output.answer, UNPARSED_REFERENCE_REPLY);
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_retrieval_narrows_to_hinted_chapter() {
        let llm = RecordingProvider::new("He was a Pharisee who visited Jesus at night.");
        let mut engine = engine(Arc::new(FixedIndex(ranked())), llm.clone());

        let routed = engine.respond("Who was Nicodemus?").await.unwrap();
        assert_eq!(routed.label(), ClassificationLabel::CorpusQuestion);
        assert_eq!(routed.references, vec!["John 3:3", "John 3:2", "John 3:9"]);
        assert!(!routed.retrieval_degraded);

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Allowed references (must ONLY cite from this set): John 3:3; John 3:2; John 3:9"));
        assert!(!prompt.contains("Romans 8:28"));
    }

    #[tokio::test]
    async fn test_search_failure_degrades_to_general_answer() {
        let llm = RecordingProvider::new("Grace is unmerited favour.");
        let mut engine = engine(Arc::new(BrokenIndex), llm.clone());

        let routed = engine.respond("what is grace").await.unwrap();
        assert!(routed.retrieval_degraded);
        assert!(routed.answer.starts_with("Grace is unmerited favour."));
        assert!(routed.answer.ends_with(GENERAL_DISCLAIMER));
        assert!(llm.prompts()[0].contains("No specific passages were retrieved"));
    }

    #[tokio::test]
    async fn test_empty_search_uses_disclaimer_without_degrading() {
        let llm = RecordingProvider::new("Answer.");
        let mut engine = engine(Arc::new(FixedIndex(Vec::new())), llm);

        let routed = engine.respond("explain the covenant").await.unwrap();
        assert!(!routed.retrieval_degraded);
        assert!(routed.answer.ends_with(GENERAL_DISCLAIMER));
    }

    #[tokio::test]
    async fn test_synthesis_failure_propagates_and_records_nothing() {
        let mut engine = engine(Arc::new(FixedIndex(ranked())), Arc::new(FailingProvider));

        let err = engine.ask("what is grace").await.unwrap_err();
        assert!(matches!(err, RoutingError::Synthesis(_)));
        assert!(err.to_string().contains("model offline"));
        assert!(engine.memory().is_empty());

        // Branches that need no model still work and record.
        assert!(engine.ask("hello").await.is_ok());
        assert_eq!(engine.memory().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_reaches_next_lookup_but_not_current() {
        let llm = RecordingProvider::new("Verse text.");
        let mut engine = engine(Arc::new(FixedIndex(ranked())), llm.clone());

        engine.ask("John 3:16").await.unwrap();
        engine.ask("John 3:17").await.unwrap();

        let prompts = llm.prompts();
        assert!(!prompts[0].contains("Q: John 3:16"));
        assert!(prompts[1].contains("Q: John 3:16\nA: Verse text."));
        assert!(!prompts[1].contains("Q: John 3:17"));
    }

    #[tokio::test]
    async fn test_memory_window_and_reset() {
        let llm = RecordingProvider::new("ok");
        let mut engine = engine(Arc::new(FixedIndex(ranked())), llm);

        for question in ["hi", "hello", "thanks", "shalom", "good morning"] {
            engine.ask(question).await.unwrap();
        }
        let questions: Vec<_> = engine.memory().turns().map(|t| t.question.clone()).collect();
        assert_eq!(questions, vec!["thanks", "shalom", "good morning"]);

        engine.reset();
        assert!(engine.memory().is_empty());
    }
}
