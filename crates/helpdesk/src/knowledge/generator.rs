use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::index::RetrievedDocument;
use crate::config::KnowledgeConfig;

const COHERE_GENERATE_URL: &str = "https://api.cohere.ai/v1/generate";
const MAX_TOKENS: u32 = 256;
const TEMPERATURE: f32 = 0.75;
const MAX_RETRIES: u32 = 3;

/// Produces an answer conditioned on retrieved context.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        question: &str,
        context: &[RetrievedDocument],
    ) -> Result<String, GeneratorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("COHERE_API_KEY is not set")]
    MissingApiKey,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },
    #[error("generator returned no text")]
    EmptyContent,
    #[error("unknown generator provider '{0}'")]
    UnknownProvider(String),
}

/// "Stuff" prompt: every retrieved document goes into a single completion.
pub fn stuff_prompt(question: &str, context: &[RetrievedDocument]) -> String {
    let context = context
        .iter()
        .map(|document| document.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
{context}\n\nQuestion: {question}\nHelpful Answer:"
    )
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    generations: Vec<Generation>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    text: String,
}

#[derive(Debug, Deserialize)]
struct CohereErrorBody {
    message: String,
}

/// Cohere `generate` endpoint with bounded retries on 429 and 5xx.
#[derive(Clone)]
pub struct CohereGenerator {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl CohereGenerator {
    pub fn new(api_key: Option<String>) -> Result<Self, GeneratorError> {
        Self::with_endpoint(api_key, COHERE_GENERATE_URL)
    }

    pub fn with_endpoint(
        api_key: Option<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, GeneratorError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Generator for CohereGenerator {
    async fn generate(
        &self,
        question: &str,
        context: &[RetrievedDocument],
    ) -> Result<String, GeneratorError> {
        let api_key = self.api_key.as_deref().ok_or(GeneratorError::MissingApiKey)?;
        let prompt = stuff_prompt(question, context);
        let body = GenerateRequest {
            prompt: &prompt,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let mut last_error = None;
        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying generator call");
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
                last_error = Some(GeneratorError::RateLimited {
                    retries: attempt + 1,
                });
                continue;
            }
            if status.is_server_error() {
                last_error = Some(GeneratorError::Api {
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
                return Err(GeneratorError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: GenerateResponse = response.json().await?;
            let text = parsed
                .generations
                .into_iter()
                .map(|generation| generation.text.trim().to_string())
                .find(|text| !text.is_empty())
                .ok_or(GeneratorError::EmptyContent)?;
            debug!(chars = text.len(), "generator answered");
            return Ok(text);
        }

        Err(last_error.unwrap_or(GeneratorError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Offline provider: answers with the best-matching stored answer.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

#[async_trait]
impl Generator for ExtractiveGenerator {
    async fn generate(
        &self,
        _question: &str,
        context: &[RetrievedDocument],
    ) -> Result<String, GeneratorError> {
        Ok(context
            .iter()
            .find(|document| document.score > 0.0)
            .map(|document| document.answer.clone())
            .unwrap_or_else(|| "I don't know.".to_string()))
    }
}

/// Construct the configured provider.
pub fn build(config: &KnowledgeConfig) -> Result<std::sync::Arc<dyn Generator>, GeneratorError> {
    match config.provider.trim().to_ascii_lowercase().as_str() {
        "cohere" => Ok(std::sync::Arc::new(CohereGenerator::new(
            config.api_key.clone(),
        )?)),
        "extractive" | "offline" => Ok(std::sync::Arc::new(ExtractiveGenerator)),
        other => Err(GeneratorError::UnknownProvider(other.to_string())),
    }
}
