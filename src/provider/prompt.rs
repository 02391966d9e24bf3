//! Prompt construction and structured response parsing for the text model.

use crate::draft::{GenerationRequest, PerPlatformDraft, Platform, PlatformDraft};
use crate::error::ApiError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Instruction sent to the text model for one request.
pub fn build_text_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "You are a social media strategist. Draft one post per platform for the idea below.\n\
         Idea: {}\n\
         Tone: {} ({})\n\
         Write every post in the same language as the idea.\n\n\
         Platform guidance:\n",
        request.idea(),
        request.tone(),
        request.tone().voice()
    );
    for platform in Platform::ALL {
        let profile = platform.profile();
        prompt.push_str(&format!("- {}: {}\n", profile.display_name, profile.style_guide));
    }
    prompt.push_str(
        "\nFor each platform also write `imagePrompt`: a vivid English description of an \
         illustration for that post, with no text in the image.",
    );
    prompt
}

fn draft_schema(with_hashtags: bool) -> Value {
    let mut properties = json!({
        "text": { "type": "STRING" },
        "imagePrompt": { "type": "STRING" },
    });
    let mut required = vec!["text", "imagePrompt"];
    if with_hashtags {
        properties["hashtags"] = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
        required.push("hashtags");
    }
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

/// JSON schema the text model must answer with.
pub fn response_schema() -> Value {
    let mut properties = serde_json::Map::new();
    for platform in Platform::ALL {
        properties.insert(
            platform.slug().to_string(),
            draft_schema(platform.profile().carries_hashtags),
        );
    }
    let required: Vec<&str> = Platform::ALL.iter().map(|p| p.slug()).collect();
    json!({
        "type": "OBJECT",
        "properties": Value::Object(properties),
        "required": required,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDraft {
    text: String,
    image_prompt: String,
    #[serde(default)]
    hashtags: Option<Vec<String>>,
}

/// Parse the model's JSON answer into one draft per platform.
pub fn parse_drafts(raw: &str) -> Result<PerPlatformDraft, ApiError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(ApiError::ProviderEmptyResponse);
    }
    let mut wire: BTreeMap<String, WireDraft> = serde_json::from_str(body)
        .map_err(|e| ApiError::ProviderResponseInvalid(format!("Drafts are not valid JSON: {}", e)))?;

    let mut drafts = BTreeMap::new();
    for platform in Platform::ALL {
        let draft = wire.remove(platform.slug()).ok_or_else(|| {
            ApiError::ProviderResponseInvalid(format!("Missing draft for {}", platform.slug()))
        })?;
        if draft.text.trim().is_empty() {
            return Err(ApiError::ProviderResponseInvalid(format!(
                "Empty draft for {}",
                platform.slug()
            )));
        }
        let hashtags = platform
            .profile()
            .carries_hashtags
            .then(|| draft.hashtags.unwrap_or_default());
        drafts.insert(
            platform,
            PlatformDraft {
                text: draft.text.trim().to_string(),
                image_prompt: draft.image_prompt.trim().to_string(),
                hashtags,
            },
        );
    }
    PerPlatformDraft::new(drafts).map_err(ApiError::ProviderResponseInvalid)
}

// Models occasionally wrap JSON in a markdown fence even in JSON mode
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Image instruction for one platform card.
pub fn build_image_prompt(image_prompt: &str, platform: Platform) -> String {
    format!(
        "{}\nStyle: high-quality social media visual for {}, no embedded text or logos.",
        image_prompt.trim(),
        platform.display_name()
    )
}
