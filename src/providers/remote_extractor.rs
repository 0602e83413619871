//! Extractor implementation: in-process decoding for plain-text formats,
//! a remote OCR service for image-bearing ones

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::types::document::FileType;

use super::extractor::{Extraction, Extractor, TextBlock};
use super::retry::RetryPolicy;

/// Page result from the OCR service
#[derive(Debug, Deserialize)]
struct OcrPage {
    page: u32,
    status: OcrPageStatus,
    #[serde(default)]
    lines: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum OcrPageStatus {
    Ok,
    Failed,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    pages: Vec<OcrPage>,
}

/// Extractor combining local text decoding with a remote OCR service
pub struct RemoteExtractor {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RemoteExtractor {
    /// Create a new extractor from config
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            retry: RetryPolicy::from(&config.retry),
        })
    }

    /// Decode a plain-text format in-process
    fn extract_text(&self, data: &[u8]) -> Result<Extraction> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::extraction(format!("invalid UTF-8 in text document: {}", e)))?;

        Ok(Extraction {
            blocks: vec![TextBlock {
                page: None,
                text: text.to_string(),
            }],
            warnings: Vec::new(),
        })
    }

    /// Send the document to the OCR service and collect per-page blocks
    async fn extract_ocr(&self, data: &[u8], file_type: &FileType) -> Result<Extraction> {
        let url = format!(
            "{}/v1/extract?type={}",
            self.base_url,
            file_type.label()
        );

        let ocr: OcrResponse = self
            .retry
            .run("extraction request", || {
                let client = self.client.clone();
                let url = url.clone();
                let body = data.to_vec();

                async move {
                    let response = client
                        .post(&url)
                        .header("content-type", "application/octet-stream")
                        .body(body)
                        .send()
                        .await?;

                    if !response.status().is_success() {
                        let status = response.status().as_u16();
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::Upstream { status, body });
                    }

                    Ok(response.json::<OcrResponse>().await?)
                }
            })
            .await
            .map_err(|e| {
                tracing::error!("Extraction service failed: {}", e);
                Error::extraction(format!("service error after retries: {}", e.kind()))
            })?;

        let mut extraction = Extraction::default();
        for page in ocr.pages {
            match page.status {
                OcrPageStatus::Ok => extraction.blocks.push(TextBlock {
                    page: Some(page.page),
                    text: page.lines.join("\n"),
                }),
                // A failed page is skipped, not fatal for the document.
                OcrPageStatus::Failed => {
                    let reason = page.error.unwrap_or_else(|| "unknown OCR error".to_string());
                    tracing::warn!("OCR failed for page {}: {}", page.page, reason);
                    extraction
                        .warnings
                        .push(format!("page {} skipped: {}", page.page, reason));
                }
            }
        }

        Ok(extraction)
    }
}

#[async_trait]
impl Extractor for RemoteExtractor {
    async fn extract(&self, data: &[u8], file_type: &FileType) -> Result<Extraction> {
        match file_type {
            t if t.is_plain_text() => self.extract_text(data),
            FileType::Pdf | FileType::Docx | FileType::Image => {
                self.extract_ocr(data, file_type).await
            }
            FileType::Unknown => Err(Error::UnsupportedFileType("unknown".to_string())),
            other => Err(Error::UnsupportedFileType(other.label().to_string())),
        }
    }

    fn name(&self) -> &str {
        "remote-ocr"
    }
}
