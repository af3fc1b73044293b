//! Model families hosted on AWS Bedrock, and the transport used to invoke them.
//!
//! Each family owns the shape of its request body and the path to the answer text in its
//! response body. Identifiers are matched to a family once, when the configuration is loaded,
//! so the dispatcher only ever sees a [`ModelTarget`] with a known family.

use std::future::Future;

use serde::Deserialize;

use crate::error::{Error, ErrorDetails};

pub mod anthropic;
pub mod aws_bedrock;
pub mod aws_common;
pub mod dummy;
pub mod llama;
pub mod mistral;

pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Sends a serialized request body to a hosted model and returns the raw response body.
pub trait InvokeModel {
    fn invoke_model<'a>(
        &'a self,
        model_id: &'a str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>, Error>> + Send + 'a;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFamily {
    Anthropic,
    MetaLlama,
    Mistral,
}

impl ModelFamily {
    /// Matches an identifier against the known families, in order.
    pub fn from_model_id(model_id: &str) -> Result<Self, Error> {
        if model_id.contains("anthropic") {
            Ok(ModelFamily::Anthropic)
        } else if model_id.contains("meta.llama") {
            Ok(ModelFamily::MetaLlama)
        } else if model_id.contains("mistral") {
            Ok(ModelFamily::Mistral)
        } else {
            Err(Error::new(ErrorDetails::UnknownModelFamily {
                model_id: model_id.to_string(),
            }))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::Anthropic => "anthropic",
            ModelFamily::MetaLlama => "meta.llama",
            ModelFamily::Mistral => "mistral",
        }
    }

    pub fn make_body(
        self,
        prompt: &str,
        params: &InferenceParams,
    ) -> Result<serde_json::Value, Error> {
        let body = match self {
            ModelFamily::Anthropic => {
                serde_json::to_value(anthropic::AnthropicRequest::new(prompt, params))
            }
            ModelFamily::MetaLlama => serde_json::to_value(llama::LlamaRequest::new(prompt, params)),
            ModelFamily::Mistral => {
                serde_json::to_value(mistral::MistralRequest::new(prompt, params))
            }
        };
        body.map_err(|e| {
            Error::new(ErrorDetails::Serialization {
                message: format!("Failed to serialize `{}` request body: {e}", self.as_str()),
            })
        })
    }

    /// Extracts the answer text from a raw response body.
    pub fn parse_response(self, model_id: &str, raw_response: &[u8]) -> Result<String, Error> {
        let malformed = |message: String| {
            Error::new(ErrorDetails::MalformedResponse {
                message,
                model_id: model_id.to_string(),
                raw_response: Some(String::from_utf8_lossy(raw_response).into_owned()),
            })
        };
        match self {
            ModelFamily::Anthropic => {
                let response: anthropic::AnthropicResponse = deserialize(raw_response)
                    .map_err(|e| malformed(format!("Failed to parse response: {e}")))?;
                response.into_text().map_err(malformed)
            }
            ModelFamily::MetaLlama => {
                let response: llama::LlamaResponse = deserialize(raw_response)
                    .map_err(|e| malformed(format!("Failed to parse response: {e}")))?;
                Ok(response.generation)
            }
            ModelFamily::Mistral => {
                let response: mistral::MistralResponse = deserialize(raw_response)
                    .map_err(|e| malformed(format!("Failed to parse response: {e}")))?;
                response.into_text().map_err(malformed)
            }
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn deserialize<'de, T: Deserialize<'de>>(
    raw: &'de [u8],
) -> Result<T, serde_path_to_error::Error<serde_json::Error>> {
    let deserializer = &mut serde_json::Deserializer::from_slice(raw);
    serde_path_to_error::deserialize(deserializer)
}

/// Wraps a prompt in the instruction tags used by the Llama and Mistral families.
pub fn instruction_prompt(prompt: &str) -> String {
    format!("<s>[INST] {prompt} [/INST]")
}

/// A model identifier whose family was resolved when the configuration was loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelTarget {
    pub model_id: String,
    pub family: ModelFamily,
}

impl ModelTarget {
    pub fn new(model_id: String) -> Result<Self, Error> {
        let family = ModelFamily::from_model_id(&model_id)?;
        Ok(Self { model_id, family })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InferenceParams {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            anthropic_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
        }
    }
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_anthropic_version() -> String {
    DEFAULT_ANTHROPIC_VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_family_matching() {
        assert_eq!(
            ModelFamily::from_model_id("anthropic.claude-3-sonnet-20240229-v1:0").unwrap(),
            ModelFamily::Anthropic
        );
        assert_eq!(
            ModelFamily::from_model_id("us.anthropic.claude-3-haiku-20240307-v1:0").unwrap(),
            ModelFamily::Anthropic
        );
        assert_eq!(
            ModelFamily::from_model_id("meta.llama3-70b-instruct-v1:0").unwrap(),
            ModelFamily::MetaLlama
        );
        assert_eq!(
            ModelFamily::from_model_id("mistral.mistral-7b-instruct-v0:2").unwrap(),
            ModelFamily::Mistral
        );
        let err = ModelFamily::from_model_id("amazon.titan-text-express-v1").unwrap_err();
        assert_eq!(
            err.get_details(),
            &ErrorDetails::UnknownModelFamily {
                model_id: "amazon.titan-text-express-v1".to_string()
            }
        );
    }

    #[test]
    fn test_anthropic_body() {
        let body = ModelFamily::Anthropic
            .make_body("What is a cosmetic guidance?", &InferenceParams::default())
            .unwrap();
        assert_eq!(
            body,
            json!({
                "anthropic_version": "bedrock-2023-05-31",
                "max_tokens": 1000,
                "messages": [{"role": "user", "content": "What is a cosmetic guidance?"}]
            })
        );
    }

    #[test]
    fn test_llama_body() {
        let body = ModelFamily::MetaLlama
            .make_body("What is a cosmetic guidance?", &InferenceParams::default())
            .unwrap();
        assert_eq!(body["prompt"], "<s>[INST] What is a cosmetic guidance? [/INST]");
        assert_eq!(body["max_gen_len"], 1000);
        assert_eq!(body["temperature"], 0.7);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_mistral_body() {
        let body = ModelFamily::Mistral
            .make_body("What is a cosmetic guidance?", &InferenceParams::default())
            .unwrap();
        assert_eq!(body["prompt"], "<s>[INST] What is a cosmetic guidance? [/INST]");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["temperature"], 0.7);
        assert!(body.get("max_gen_len").is_none());
    }

    #[test]
    fn test_parse_response_per_family() {
        let anthropic = br#"{"id":"msg_1","type":"message","role":"assistant","content":[{"type":"text","text":"From Claude"}],"stop_reason":"end_turn"}"#;
        assert_eq!(
            ModelFamily::Anthropic
                .parse_response("anthropic.claude-3-haiku-20240307-v1:0", anthropic)
                .unwrap(),
            "From Claude"
        );

        let llama = br#"{"generation":"From Llama","prompt_token_count":12,"generation_token_count":3,"stop_reason":"stop"}"#;
        assert_eq!(
            ModelFamily::MetaLlama
                .parse_response("meta.llama3-70b-instruct-v1:0", llama)
                .unwrap(),
            "From Llama"
        );

        let mistral = br#"{"outputs":[{"text":"From Mistral","stop_reason":"stop"}]}"#;
        assert_eq!(
            ModelFamily::Mistral
                .parse_response("mistral.mistral-7b-instruct-v0:2", mistral)
                .unwrap(),
            "From Mistral"
        );
    }

    #[test]
    fn test_parse_response_wrong_shape() {
        let err = ModelFamily::MetaLlama
            .parse_response("meta.llama3-70b-instruct-v1:0", br#"{"outputs":[]}"#)
            .unwrap_err();
        let ErrorDetails::MalformedResponse {
            message,
            raw_response,
            ..
        } = err.get_details()
        else {
            panic!("Expected MalformedResponse, got {err:?}");
        };
        assert!(message.contains("generation"), "Unexpected message: {message}");
        assert_eq!(raw_response.as_deref(), Some(r#"{"outputs":[]}"#));

        let err = ModelFamily::Mistral
            .parse_response("mistral.mistral-7b-instruct-v0:2", br#"{"outputs":[]}"#)
            .unwrap_err();
        assert!(err.is_per_model());
    }
}
