//! Mistral models on Bedrock.

use serde::{Deserialize, Serialize};

use super::{InferenceParams, instruction_prompt};

#[derive(Debug, PartialEq, Serialize)]
pub struct MistralRequest {
    prompt: String,
    max_tokens: u32,
    temperature: f64,
}

impl MistralRequest {
    pub fn new(prompt: &str, params: &InferenceParams) -> Self {
        Self {
            prompt: instruction_prompt(prompt),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MistralResponse {
    outputs: Vec<MistralOutput>,
}

#[derive(Debug, Deserialize)]
struct MistralOutput {
    text: String,
}

impl MistralResponse {
    pub fn into_text(self) -> Result<String, String> {
        self.outputs
            .into_iter()
            .next()
            .map(|output| output.text)
            .ok_or_else(|| "Response contained no outputs".to_string())
    }
}
