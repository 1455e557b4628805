use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::embedding::{cosine_similarity, Embedder, EmbeddingError, HashingEmbedder, InputKind};
use super::{FaqEntry, KnowledgeError};

/// A stored document returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDocument {
    pub question: String,
    pub answer: String,
    pub content: String,
    pub score: f32,
}

/// Nearest-neighbour lookup over the FAQ corpus.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize)
        -> Result<Vec<RetrievedDocument>, KnowledgeError>;
}

struct IndexedEntry {
    entry: FaqEntry,
    content: String,
    vector: Vec<f32>,
}

/// In-memory vector index built once at startup.
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<IndexedEntry>,
}

impl VectorIndex {
    /// Embed every entry through `embedder` in one batch.
    pub async fn build(
        entries: Vec<FaqEntry>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, EmbeddingError> {
        let contents: Vec<String> = entries.iter().map(FaqEntry::document_text).collect();
        let vectors = embedder.embed(&contents, InputKind::SearchDocument).await?;
        if vectors.len() != contents.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: contents.len(),
                actual: vectors.len(),
            });
        }

        let entries = entries
            .into_iter()
            .zip(contents)
            .zip(vectors)
            .map(|((entry, content), vector)| IndexedEntry {
                entry,
                content,
                vector,
            })
            .collect();
        Ok(Self { embedder, entries })
    }

    /// Index over the offline hashing embedder. Never touches the network.
    pub fn local(entries: Vec<FaqEntry>) -> Self {
        let embedder = HashingEmbedder::default();
        let entries = entries
            .into_iter()
            .map(|entry| {
                let content = entry.document_text();
                let vector = embedder.vector(&content);
                IndexedEntry {
                    entry,
                    content,
                    vector,
                }
            })
            .collect();
        Self {
            embedder: Arc::new(embedder),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, EmbeddingError> {
        let vectors = self
            .embedder
            .embed(&[query.to_string()], InputKind::SearchQuery)
            .await?;
        let [query_vector] = <[Vec<f32>; 1]>::try_from(vectors).map_err(|vectors: Vec<_>| {
            EmbeddingError::CountMismatch {
                expected: 1,
                actual: vectors.len(),
            }
        })?;
        Ok(self.rank(&query_vector, k))
    }

    fn rank(&self, query_vector: &[f32], k: usize) -> Vec<RetrievedDocument> {
        let mut scored: Vec<(f32, &IndexedEntry)> = self
            .entries
            .iter()
            .map(|indexed| (cosine_similarity(query_vector, &indexed.vector), indexed))
            .collect();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        scored
            .into_iter()
            .take(k)
            .map(|(score, indexed)| RetrievedDocument {
                question: indexed.entry.question.clone(),
                answer: indexed.entry.answer.clone(),
                content: indexed.content.clone(),
                score,
            })
            .collect()
    }
}

#[async_trait]
impl Retriever for VectorIndex {
    async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, KnowledgeError> {
        Ok(self.search(query, k).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn corpus() -> Vec<FaqEntry> {
        vec![
            FaqEntry::new(
                "What is the admission deadline?",
                "Applications close on 30 June.",
            ),
            FaqEntry::new("Is hostel accommodation available?", "Yes, for first years."),
            FaqEntry::new("What documents are required for admission?", "Result sheet and ID."),
        ]
    }

    /// Hashing vectors plus a count of calls, failing once `fail_after` calls were made.
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail_after: usize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(
            &self,
            texts: &[String],
            kind: InputKind,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
                return Err(EmbeddingError::Api {
                    status: 503,
                    message: "embedding service down".to_string(),
                });
            }
            HashingEmbedder::default().embed(texts, kind).await
        }
    }

    #[tokio::test]
    async fn returns_at_most_k_documents_best_first() {
        let index = VectorIndex::local(corpus());
        let hits = index.search("admission deadline", 2).await.expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].question, "What is the admission deadline?");
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(
            hits[0].content,
            "What is the admission deadline? - Applications close on 30 June."
        );
    }

    #[tokio::test]
    async fn small_corpus_returns_everything() {
        let index = VectorIndex::local(corpus());
        assert_eq!(index.search("anything", 10).await.expect("search").len(), 3);
        assert_eq!(index.len(), 3);
    }

    #[tokio::test]
    async fn corpus_is_embedded_in_one_batch() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            fail_after: usize::MAX,
        });
        let index = VectorIndex::build(corpus(), embedder.clone())
            .await
            .expect("index builds");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

        let hits = index.search("hostel", 1).await.expect("search");
        assert_eq!(hits[0].question, "Is hostel accommodation available?");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn query_embedding_failures_surface_as_knowledge_errors() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            fail_after: 1,
        });
        let index = VectorIndex::build(corpus(), embedder)
            .await
            .expect("index builds");
        let err = index.retrieve("hostel", 2).await.expect_err("query fails");
        assert!(matches!(
            err,
            KnowledgeError::Embedding(EmbeddingError::Api { status: 503, .. })
        ));
    }
}
