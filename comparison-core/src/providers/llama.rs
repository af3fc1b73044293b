//! Meta Llama models on Bedrock.

use serde::{Deserialize, Serialize};

use super::{InferenceParams, instruction_prompt};

#[derive(Debug, PartialEq, Serialize)]
pub struct LlamaRequest {
    prompt: String,
    max_gen_len: u32,
    temperature: f64,
}

impl LlamaRequest {
    pub fn new(prompt: &str, params: &InferenceParams) -> Self {
        Self {
            prompt: instruction_prompt(prompt),
            max_gen_len: params.max_tokens,
            temperature: params.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlamaResponse {
    pub generation: String,
}
