//! Anthropic messages-API client backing the vision and text capabilities.

use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use crate::analysis::ProductAnalysis;
use crate::capabilities::{
    classify_status, classify_transport, Analyzer, CapabilityError, TextContext, TextSynthesizer,
};
use crate::job::{Catchcopy, ProductDescription, SeoText};
use crate::validation::ImageFormat;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Client for the Anthropic messages API. Implements both the vision
/// analysis and text synthesis capabilities.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Sends one user turn and returns the first text block of the reply.
    async fn complete(
        &self,
        system: &str,
        content: serde_json::Value,
        max_tokens: u32,
    ) -> Result<String, CapabilityError> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "system": system,
            "messages": [{"role": "user", "content": content}],
        });

        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Fatal(format!("malformed messages response: {e}")))?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| CapabilityError::Fatal("no text block returned".to_string()))
    }

    async fn complete_json<T: serde::de::DeserializeOwned>(
        &self,
        system: &str,
        prompt: String,
        max_tokens: u32,
    ) -> Result<T, CapabilityError> {
        let text = self
            .complete(system, json!([{"type": "text", "text": prompt}]), max_tokens)
            .await?;
        parse_json_reply(&text)
    }
}

#[async_trait::async_trait]
impl Analyzer for AnthropicClient {
    async fn analyze(&self, image: &[u8]) -> Result<ProductAnalysis, CapabilityError> {
        let format = ImageFormat::sniff(image)
            .ok_or_else(|| CapabilityError::BadImage("unrecognized image format".to_string()))?;

        let content = json!([
            {
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": format.mime(),
                    "data": base64::engine::general_purpose::STANDARD.encode(image),
                }
            },
            {"type": "text", "text": ANALYSIS_PROMPT}
        ]);

        let text = self.complete(ANALYSIS_SYSTEM, content, 1024).await?;
        let analysis: ProductAnalysis = parse_json_reply(&text)?;
        Ok(analysis.normalized())
    }
}

#[async_trait::async_trait]
impl TextSynthesizer for AnthropicClient {
    async fn description(&self, ctx: &TextContext) -> Result<ProductDescription, CapabilityError> {
        self.complete_json(TEXT_SYSTEM, description_prompt(ctx), 1024)
            .await
    }

    async fn catchcopy(&self, ctx: &TextContext) -> Result<Catchcopy, CapabilityError> {
        self.complete_json(TEXT_SYSTEM, catchcopy_prompt(ctx), 512)
            .await
    }

    async fn seo(&self, ctx: &TextContext) -> Result<SeoText, CapabilityError> {
        self.complete_json(TEXT_SYSTEM, seo_prompt(ctx), 512).await
    }
}

const ANALYSIS_SYSTEM: &str =
    "You are a product image analyst. Respond ONLY with valid JSON, no other text.";

const ANALYSIS_PROMPT: &str = r##"Analyze this product image and return JSON with exactly these fields:
{
  "category": "product category, e.g. beverage, cosmetics, food",
  "colors": {"primary": "#RRGGBB", "secondary": ["#RRGGBB"], "palette": ["#RRGGBB"]},
  "shape": {"kind": "rectangular|cylindrical|spherical|irregular|unknown",
            "dimensions": {"width": 0.0, "height": 0.0, "depth": 0.0}},
  "surface": "glossy|matte|metallic|rough|smooth|unknown",
  "confidence": 0.0
}
Dimensions are relative, largest axis 1.0. Confidence is in [0, 1]."##;

const TEXT_SYSTEM: &str =
    "You are a marketing copywriter. Respond ONLY with valid JSON, no other text.";

fn product_context(ctx: &TextContext) -> String {
    let mut lines = vec![format!("Category: {}", sanitize_for_prompt(&ctx.analysis.category))];
    lines.push(format!("Primary color: {}", ctx.analysis.colors.primary));
    if let Some(brand) = &ctx.brand_name {
        lines.push(format!("Brand: {}", sanitize_for_prompt(brand)));
    }
    if let Some(product) = &ctx.product_name {
        lines.push(format!("Product: {}", sanitize_for_prompt(product)));
    }
    if let Some(tone) = &ctx.tone {
        lines.push(format!("Tone: {}", sanitize_for_prompt(tone)));
    }
    if let Some(language) = &ctx.language {
        lines.push(format!("Language: {}", sanitize_for_prompt(language)));
    }
    lines.join("\n")
}

fn description_prompt(ctx: &TextContext) -> String {
    format!(
        "{}\n\nWrite product descriptions. Return JSON:\n{{\"long\": \"3-4 sentences\", \"short\": \"1 sentence\", \"bullets\": [\"3-5 selling points\"]}}",
        product_context(ctx)
    )
}

fn catchcopy_prompt(ctx: &TextContext) -> String {
    format!(
        "{}\n\nWrite advertising catchcopy. Return JSON:\n{{\"main\": \"one punchy headline\", \"variations\": [\"3 alternative headlines\"]}}",
        product_context(ctx)
    )
}

fn seo_prompt(ctx: &TextContext) -> String {
    format!(
        "{}\n\nWrite SEO metadata. Return JSON:\n{{\"title\": \"under 60 chars\", \"description\": \"under 160 chars\", \"keywords\": [\"5-10 keywords\"]}}",
        product_context(ctx)
    )
}

/// Neutralizes user-supplied strings before they are woven into a prompt:
/// control characters are stripped, role markers defused, and length capped.
fn sanitize_for_prompt(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control())
        .take(200)
        .collect();
    cleaned
        .replace("Human:", "Human -")
        .replace("Assistant:", "Assistant -")
        .replace("```", "'''")
}

/// Parses a JSON-shaped model reply, tolerating prose around the JSON
/// object. A reply that does not decode into the expected shape is a
/// `Fatal` error, not an exception surfacing through the executor.
fn parse_json_reply<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, CapabilityError> {
    let json = extract_json(text);
    serde_json::from_str(json)
        .map_err(|e| CapabilityError::Fatal(format!("unexpected response shape: {e}")))
}

/// Extracts the first balanced JSON object from a reply, tracking string
/// boundaries and escape sequences so braces inside strings don't
/// terminate early.
fn extract_json(response: &str) -> &str {
    let Some(start) = response.find('{') else {
        return response;
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return &response[start..start + i + 1];
                }
            }
            _ => {}
        }
    }

    &response[start..]
}
