//! Gemini REST client implementing both generation services.

use crate::auth::ApiKeyStore;
use crate::draft::{GenerationRequest, PerPlatformDraft, Platform, Tone};
use crate::error::ApiError;
use crate::image::{ImageReference, ImageRequestConfig};
use crate::provider::prompt::{build_image_prompt, build_text_prompt, parse_drafts, response_schema};
use crate::provider::{
    build_provider_http_client, error_from_response, map_http_error, ImageGenerationService,
    ProviderConfig, TextGenerationService,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

pub struct GeminiClient {
    client: Client,
    endpoint: String,
    text_model: String,
    image_model: String,
    keys: ApiKeyStore,
}

impl GeminiClient {
    pub fn new(config: &ProviderConfig, keys: ApiKeyStore) -> Result<Self, ApiError> {
        config.validate().map_err(ApiError::ConfigError)?;
        Ok(Self {
            client: build_provider_http_client(config)?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            keys,
        })
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<Value, ApiError> {
        let api_key = self.keys.get().ok_or_else(|| {
            ApiError::AuthorizationRequired("No API key has been selected".to_string())
        })?;

        let response = self
            .client
            .post(self.generate_url(model))
            .header("content-type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::ProviderResponseInvalid(format!("Failed to parse response: {}", e)))
    }
}

fn first_candidate_parts(response: &Value) -> Result<&Vec<Value>, ApiError> {
    if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
        return Err(ApiError::ProviderError(format!("Prompt blocked: {}", reason)));
    }
    response["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate["content"]["parts"].as_array())
        .ok_or(ApiError::ProviderEmptyResponse)
}

/// Concatenated text parts of the first candidate.
pub(crate) fn extract_text(response: &Value) -> Result<String, ApiError> {
    let text: String = first_candidate_parts(response)?
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();
    if text.trim().is_empty() {
        return Err(ApiError::ProviderEmptyResponse);
    }
    Ok(text)
}

/// First inline image of the first candidate, as a data URI.
pub(crate) fn extract_inline_image(response: &Value) -> Result<ImageReference, ApiError> {
    let parts = first_candidate_parts(response).map_err(|err| match err {
        ApiError::ProviderEmptyResponse => ApiError::NoImagePayload,
        other => other,
    })?;
    parts
        .iter()
        .find_map(|part| {
            let inline = &part["inlineData"];
            let data = inline["data"].as_str().filter(|d| !d.is_empty())?;
            let mime = inline["mimeType"].as_str().unwrap_or("image/png");
            Some(ImageReference::from_base64(mime, data))
        })
        .ok_or(ApiError::NoImagePayload)
}

#[async_trait]
impl TextGenerationService for GeminiClient {
    async fn generate(&self, idea: &str, tone: Tone) -> Result<PerPlatformDraft, ApiError> {
        let request = GenerationRequest::new(idea, tone)
            .ok_or_else(|| ApiError::InvalidInput("Idea cannot be empty".to_string()))?;
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_text_prompt(&request) }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            }
        });

        debug!(model = %self.text_model, tone = %tone, "Requesting drafts");
        let response = self.generate_content(&self.text_model, &body).await?;
        parse_drafts(&extract_text(&response)?)
    }
}

#[async_trait]
impl ImageGenerationService for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        platform: Platform,
        config: &ImageRequestConfig,
    ) -> Result<ImageReference, ApiError> {
        let resolved = config.resolve_for(platform);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_image_prompt(prompt, platform) }]
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": {
                    "aspectRatio": resolved.aspect_ratio,
                    "imageSize": resolved.image_size,
                }
            }
        });

        debug!(
            model = %self.image_model,
            platform = %platform.slug(),
            aspect_ratio = resolved.aspect_ratio,
            image_size = resolved.image_size,
            "Requesting image"
        );
        let response = self.generate_content(&self.image_model, &body).await?;
        extract_inline_image(&response)
    }
}
