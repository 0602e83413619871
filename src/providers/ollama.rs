//! Ollama-compatible providers for embeddings and answer generation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{EmbeddingConfig, GenerationConfig};
use crate::error::{Error, Result};

use super::embedder::Embedder;
use super::generator::{Generator, Prompt};
use super::retry::RetryPolicy;

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Map a non-success provider response into a retryable upstream error.
async fn upstream_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::Upstream { status, body }
}

/// Embedding provider backed by an Ollama-compatible endpoint
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

impl OllamaEmbedder {
    /// Create a new embedder from config
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            retry: RetryPolicy::from(&config.retry),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let embedding = self
            .retry
            .run("embedding request", || {
                let request = EmbedRequest {
                    model: self.model.clone(),
                    prompt: text.to_string(),
                };
                let client = self.client.clone();
                let url = url.clone();

                async move {
                    let response = client.post(&url).json(&request).send().await?;
                    if !response.status().is_success() {
                        return Err(upstream_error(response).await);
                    }
                    let body: EmbedResponse = response.json().await?;
                    Ok(body.embedding)
                }
            })
            .await
            .map_err(|e| {
                tracing::error!("Embedding provider failed: {}", e);
                Error::embedding(format!("provider error after retries: {}", e.kind()))
            })?;

        if embedding.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "provider returned {} dimensions, expected {}",
                embedding.len(),
                self.dimensions
            )));
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Generation provider backed by an Ollama-compatible endpoint
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl OllamaGenerator {
    /// Create a new generator from config
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            retry: RetryPolicy::from(&config.retry),
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let rendered = prompt.render();

        tracing::debug!("Generating answer with model {}", self.model);

        self.retry
            .run("generation request", || {
                let request = GenerateRequest {
                    model: self.model.clone(),
                    prompt: rendered.clone(),
                    stream: false,
                    options: GenerateOptions {
                        temperature: self.temperature,
                    },
                };
                let client = self.client.clone();
                let url = url.clone();

                async move {
                    let response = client.post(&url).json(&request).send().await?;
                    if !response.status().is_success() {
                        return Err(upstream_error(response).await);
                    }
                    let body: GenerateResponse = response.json().await?;
                    Ok(body.response)
                }
            })
            .await
            .map_err(|e| {
                tracing::error!("Generation provider failed: {}", e);
                Error::generation(format!("provider error after retries: {}", e.kind()))
            })
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
