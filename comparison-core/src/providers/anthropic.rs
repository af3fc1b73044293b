//! Claude models served through Bedrock's Anthropic messages schema.

use serde::{Deserialize, Serialize};

use super::InferenceParams;

#[derive(Debug, PartialEq, Serialize)]
pub struct AnthropicRequest<'a> {
    anthropic_version: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum AnthropicRole {
    User,
}

#[derive(Debug, PartialEq, Serialize)]
struct AnthropicMessage<'a> {
    role: AnthropicRole,
    content: &'a str,
}

impl<'a> AnthropicRequest<'a> {
    pub fn new(prompt: &'a str, params: &'a InferenceParams) -> Self {
        Self {
            anthropic_version: &params.anthropic_version,
            max_tokens: params.max_tokens,
            messages: vec![AnthropicMessage {
                role: AnthropicRole::User,
                content: prompt,
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicResponse {
    /// The answer is the text of the first content block.
    pub fn into_text(self) -> Result<String, String> {
        let first = self
            .content
            .into_iter()
            .next()
            .ok_or_else(|| "Response contained no content blocks".to_string())?;
        first
            .text
            .ok_or_else(|| "First content block has no `text` field".to_string())
    }
}
