//! An in-process stand-in for AWS Bedrock.
//!
//! The dummy invoker answers in the response shape of whichever family the model identifier
//! belongs to, and lets callers simulate failures through the identifier:
//! * identifiers containing `error` fail as if the remote call had failed
//! * identifiers containing `bad_response` succeed with a body missing the answer field
//!
//! Every request is recorded so callers can inspect the bodies that were sent.

use std::sync::Mutex;

use serde_json::{Value, json};

use super::{InvokeModel, ModelFamily};
use crate::error::{Error, ErrorDetails};

pub static DUMMY_INFER_RESPONSE_CONTENT: &str = "Cosmetic guidance is advice on the safe selection and use of cosmetic products.";

#[derive(Clone, Debug, PartialEq)]
pub struct DummyRequest {
    pub model_id: String,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct DummyInvoker {
    requests: Mutex<Vec<DummyRequest>>,
}

impl DummyInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every request received so far, in call order.
    pub fn requests(&self) -> Vec<DummyRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    fn record(&self, request: DummyRequest) {
        // Ignore poisoned lock, since we only ever append.
        let mut requests = match self.requests.lock() {
            Ok(requests) => requests,
            Err(e) => e.into_inner(),
        };
        requests.push(request);
    }
}

fn dummy_response(family: ModelFamily, text: &str) -> Value {
    match family {
        ModelFamily::Anthropic => json!({
            "id": "msg_dummy",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn",
        }),
        ModelFamily::MetaLlama => json!({
            "generation": text,
            "prompt_token_count": 10,
            "generation_token_count": 10,
            "stop_reason": "stop",
        }),
        ModelFamily::Mistral => json!({
            "outputs": [{"text": text, "stop_reason": "stop"}],
        }),
    }
}

impl InvokeModel for DummyInvoker {
    async fn invoke_model<'a>(
        &'a self,
        model_id: &'a str,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, Error> {
        let raw_request = String::from_utf8_lossy(&body).into_owned();
        let body: Value = serde_json::from_slice(&body).map_err(|e| {
            Error::new(ErrorDetails::InferenceServer {
                message: format!("Dummy provider received a non-JSON body: {e}"),
                model_id: model_id.to_string(),
                raw_request: Some(raw_request.clone()),
            })
        })?;
        self.record(DummyRequest {
            model_id: model_id.to_string(),
            body,
        });

        if model_id.contains("error") {
            return Err(Error::new(ErrorDetails::InferenceServer {
                message: "Error sending request to Dummy provider.".to_string(),
                model_id: model_id.to_string(),
                raw_request: None,
            }));
        }
        let response = if model_id.contains("bad_response") {
            json!({"unexpected": true})
        } else {
            let family = ModelFamily::from_model_id(model_id)?;
            dummy_response(family, DUMMY_INFER_RESPONSE_CONTENT)
        };
        serde_json::to_vec(&response).map_err(|e| {
            Error::new(ErrorDetails::Serialization {
                message: format!("Failed to serialize dummy response: {e}"),
            })
        })
    }
}
