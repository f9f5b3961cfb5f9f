//! OpenAI images-API client backing the image synthesis capability.

use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use crate::capabilities::{
    classify_status, classify_transport, CapabilityError, ImageRequest, ImageSynthesizer,
};
use crate::job::SynthesizedImage;

const API_URL: &str = "https://api.openai.com/v1/images/generations";

pub const DEFAULT_MODEL: &str = "dall-e-3";

/// Client for the OpenAI image generation API.
pub struct OpenAiImageClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
    #[serde(default)]
    seed: Option<u64>,
}

impl OpenAiImageClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl ImageSynthesizer for OpenAiImageClient {
    async fn synthesize(&self, request: &ImageRequest) -> Result<SynthesizedImage, CapabilityError> {
        let body = json!({
            "model": self.model,
            "prompt": request.prompt,
            "size": request.size.api_value(),
            "n": 1,
            "response_format": "b64_json",
        });

        let response = self
            .http
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: ImagesResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Fatal(format!("malformed images response: {e}")))?;

        let datum = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| CapabilityError::Fatal("no image returned".to_string()))?;

        let data = match &datum.b64_json {
            Some(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| CapabilityError::Fatal(format!("undecodable image payload: {e}")))?,
            None => Vec::new(),
        };

        if data.is_empty() && datum.url.is_none() {
            return Err(CapabilityError::Fatal("no image returned".to_string()));
        }

        Ok(SynthesizedImage {
            data,
            url: datum.url,
            revised_prompt: datum.revised_prompt,
            seed: datum.seed,
        })
    }
}
