use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::KnowledgeConfig;

const COHERE_EMBED_URL: &str = "https://api.cohere.ai/v1/embed";
const COHERE_EMBED_MODEL: &str = "embed-english-v3.0";
const MAX_RETRIES: u32 = 3;

const DEFAULT_DIMENSIONS: usize = 384;
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Whether the text is stored in the index or used to search it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    SearchDocument,
    SearchQuery,
}

/// Turns text into fixed-width vectors for similarity search.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in input order.
    async fn embed(
        &self,
        texts: &[String],
        kind: InputKind,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("COHERE_API_KEY is not set")]
    MissingApiKey,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },
    #[error("expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("unknown embedding provider '{0}'")]
    UnknownProvider(String),
}

/// Feature-hashed bag of words, L2 normalised. Runs offline.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let hash = token.bytes().fold(FNV_OFFSET, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        });
        (hash % self.dimensions as u64) as usize
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| token.len() > 1)
        {
            vector[self.bucket(token)] += 1.0;
        }

        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|value| *value /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(
        &self,
        texts: &[String],
        _kind: InputKind,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: InputKind,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct CohereErrorBody {
    message: String,
}

/// Cohere `embed` endpoint with bounded retries on 429 and 5xx.
#[derive(Clone)]
pub struct CohereEmbedder {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

impl CohereEmbedder {
    pub fn new(api_key: Option<String>) -> Result<Self, EmbeddingError> {
        Self::with_endpoint(api_key, COHERE_EMBED_URL)
    }

    pub fn with_endpoint(
        api_key: Option<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.into(),
            model: COHERE_EMBED_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    async fn embed(
        &self,
        texts: &[String],
        kind: InputKind,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let api_key = self.api_key.as_deref().ok_or(EmbeddingError::MissingApiKey)?;
        let body = EmbedRequest {
            texts,
            model: &self.model,
            input_type: kind,
        };

        let mut last_error = None;
        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying embedding call");
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                last_error = Some(EmbeddingError::RateLimited {
                    retries: attempt + 1,
                });
                continue;
            }
            if status.is_server_error() {
                last_error = Some(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
                continue;
            }
            if !status.is_success() {
                let message = response
                    .json::<CohereErrorBody>()
                    .await
                    .map(|body| body.message)
                    .unwrap_or_else(|_| status.to_string());
                return Err(EmbeddingError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: EmbedResponse = response.json().await?;
            if parsed.embeddings.len() != texts.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: texts.len(),
                    actual: parsed.embeddings.len(),
                });
            }
            debug!(count = texts.len(), ?kind, "texts embedded");
            return Ok(parsed.embeddings);
        }

        Err(last_error.unwrap_or(EmbeddingError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Construct the configured embedding provider.
pub fn build(config: &KnowledgeConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.embedding_provider.trim().to_ascii_lowercase().as_str() {
        "local" | "hashing" => Ok(Arc::new(HashingEmbedder::default())),
        "cohere" => Ok(Arc::new(CohereEmbedder::new(config.api_key.clone())?)),
        other => Err(EmbeddingError::UnknownProvider(other.to_string())),
    }
}

pub(crate) fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm = left.iter().map(|v| v * v).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|v| v * v).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}
