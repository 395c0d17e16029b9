use anyhow::{Context, Result};
use async_trait::async_trait;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{self, Schema, STORED, STRING, TEXT, Value as TantivyValue};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};

use super::VectorIndex;
use crate::corpus::CorpusIndex;
use crate::types::{DocumentMetadata, RetrievedDocument};

/// In-memory BM25 index over every loaded verse.
///
/// Stands in for an embedding index: same contract, lexical ranking.
pub struct VerseTextIndex {
    index: Index,
    reader: IndexReader,
    work_field: schema::Field,
    title_field: schema::Field,
    chapter_field: schema::Field,
    verse_field: schema::Field,
    text_field: schema::Field,
}

impl VerseTextIndex {
    /// `work` is STRING (exact id); `title` is tokenized so "romans" finds
    /// verses of Romans even when the word is absent from the text.
    fn build_schema() -> (Schema, [schema::Field; 5]) {
        let mut sb = Schema::builder();
        let work_field = sb.add_text_field("work", STRING | STORED);
        let title_field = sb.add_text_field("title", TEXT | STORED);
        let chapter_field = sb.add_u64_field("chapter", STORED);
        let verse_field = sb.add_u64_field("verse", STORED);
        let text_field = sb.add_text_field("text", TEXT | STORED);
        (
            sb.build(),
            [work_field, title_field, chapter_field, verse_field, text_field],
        )
    }

    pub fn build(corpus: &CorpusIndex) -> Result<Self> {
        let (schema, [work_field, title_field, chapter_field, verse_field, text_field]) =
            Self::build_schema();
        let index = Index::create_in_ram(schema);

        let mut writer: IndexWriter = index
            .writer(50_000_000)
            .context("Failed to create Tantivy writer")?;
        let mut indexed = 0usize;
        for record in corpus.records() {
            let title = corpus.title(&record.work_id).unwrap_or(record.work_id.as_str());
            writer.add_document(doc!(
                work_field => record.work_id.as_str(),
                title_field => title,
                chapter_field => u64::from(record.chapter),
                verse_field => u64::from(record.verse),
                text_field => record.text.as_str(),
            ))?;
            indexed += 1;
        }
        writer.commit().context("Tantivy commit failed")?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("Failed to create Tantivy reader")?;
        reader.reload()?;

        tracing::info!(verses = indexed, "Verse text index built");

        Ok(Self {
            index,
            reader,
            work_field,
            title_field,
            chapter_field,
            verse_field,
            text_field,
        })
    }

    pub fn count(&self) -> usize {
        self.reader.searcher().num_docs() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn search_sync(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let query_parser =
            QueryParser::for_index(&self.index, vec![self.text_field, self.title_field]);

        // Free text often carries query syntax (`:`, `?`, quotes); the lenient
        // parser drops what it cannot read instead of failing.
        let parsed_query = match query_parser.parse_query(query) {
            Ok(q) => q,
            Err(_) => query_parser.parse_query_lenient(query).0,
        };

        let top_docs = searcher.search(&parsed_query, &TopDocs::with_limit(k))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc = searcher.doc::<TantivyDocument>(doc_address)?;
            let text = |field| {
                doc.get_first(field)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string()
            };
            let number = |field| {
                doc.get_first(field)
                    .and_then(|v| v.as_u64())
                    .and_then(|n| u32::try_from(n).ok())
            };

            let title = text(self.title_field);
            let work = if title.is_empty() { text(self.work_field) } else { title };

            results.push(RetrievedDocument {
                content: text(self.text_field),
                metadata: DocumentMetadata {
                    work,
                    chapter: number(self.chapter_field),
                    verse: number(self.verse_field),
                },
                score,
            });
        }

        tracing::debug!(query = %query, k = k, hits = results.len(), "Verse text search");
        Ok(results)
    }
}

#[async_trait]
impl VectorIndex for VerseTextIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        self.search_sync(query, k)
    }

    fn name(&self) -> &str {
        "tantivy-bm25"
    }
}
