//! FAQ retrieval: corpus loading, similarity search and answer generation.
//!
//! Embedding, search and generation sit behind [`Embedder`], [`Retriever`]
//! and [`Generator`] so each collaborator can be swapped or mocked.

pub mod embedding;
pub mod generator;
pub mod index;

pub use embedding::{CohereEmbedder, Embedder, EmbeddingError, HashingEmbedder, InputKind};
pub use generator::{CohereGenerator, ExtractiveGenerator, Generator, GeneratorError};
pub use index::{RetrievedDocument, Retriever, VectorIndex};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Number of documents handed to the generator.
pub const DEFAULT_TOP_K: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Text that gets embedded and stuffed into the prompt.
    pub fn document_text(&self) -> String {
        format!("{} - {}", self.question, self.answer)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("failed to read FAQ corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid FAQ corpus {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("answer generation failed: {0}")]
    Generator(#[from] GeneratorError),
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Load a JSON array of `{question, answer}` objects.
pub async fn load_faq_entries(path: &Path) -> Result<Vec<FaqEntry>, KnowledgeError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|source| KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let entries = parse_faq_entries(&raw).map_err(|source| KnowledgeError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), entries = entries.len(), "faq corpus loaded");
    Ok(entries)
}

pub fn parse_faq_entries(raw: &[u8]) -> Result<Vec<FaqEntry>, serde_json::Error> {
    serde_json::from_slice(raw)
}

/// Answer plus the documents it was conditioned on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<RetrievedDocument>,
}

/// Retrieval-augmented "ask a question" tool for one FAQ domain.
#[derive(Clone)]
pub struct KnowledgeTool {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl KnowledgeTool {
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Build a tool over an offline hashing index of `entries`.
    pub fn from_entries(entries: Vec<FaqEntry>, generator: Arc<dyn Generator>) -> Self {
        Self::new(Arc::new(VectorIndex::local(entries)), generator)
    }

    /// Build a tool whose index is embedded by `embedder`.
    pub async fn embedded(
        entries: Vec<FaqEntry>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, KnowledgeError> {
        let index = VectorIndex::build(entries, embedder).await?;
        Ok(Self::new(Arc::new(index), generator))
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn ask(&self, question: &str) -> Result<Answer, KnowledgeError> {
        let sources = self.retriever.retrieve(question, self.top_k).await?;
        let answer = self.generator.generate(question, &sources).await?;
        Ok(Answer { answer, sources })
    }
}
