//! Passage search seam used by the retrieval branch.

pub mod text_search;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::RetrievedDocument;

pub use text_search::VerseTextIndex;

/// Ranked passage search. Results come back most similar first, at most `k`.
/// Errors are treated by the router as an empty result, never as fatal.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>>;

    fn name(&self) -> &str {
        "vector-index"
    }
}
