use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::usecases::proof_verification::TextExtractor;

/// Client for the OCR sidecar. The engine never touches image bytes; it
/// hands over a storage reference and gets text back.
pub struct OcrHttpExtractor {
    client: reqwest::Client,
    base_url: String,
}

impl OcrHttpExtractor {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    image_ref: &'a str,
}

#[derive(Deserialize)]
struct ExtractResponse {
    text: String,
}

#[async_trait]
impl TextExtractor for OcrHttpExtractor {
    async fn extract_text(&self, image_ref: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/v1/extract", self.base_url))
            .json(&ExtractRequest { image_ref })
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("extraction service returned {}", response.status());
        }

        let body: ExtractResponse = response.json().await?;
        Ok(body.text)
    }
}
