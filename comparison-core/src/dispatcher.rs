//! Sends the configured prompt to each model in turn and collects one [`ResultRecord`] per model.
//!
//! Models are invoked strictly one after another, in configuration order. A failure while
//! shaping the request, invoking the model, or extracting the answer only affects that model's
//! record: the error is rendered into the `response` field with an `Error: ` prefix and the
//! batch moves on.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::error::{Error, ErrorDetails};
use crate::providers::{InferenceParams, InvokeModel, ModelTarget};

pub const ERROR_RESPONSE_PREFIX: &str = "Error: ";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRecord {
    pub model: String,
    pub prompt: String,
    /// The answer text, or the error rendered with [`ERROR_RESPONSE_PREFIX`].
    pub response: String,
    /// RFC 3339 timestamp taken when the model's call finished.
    pub timestamp: String,
}

pub struct Dispatcher<'a, I: InvokeModel> {
    invoker: &'a I,
    prompt: &'a str,
    params: &'a InferenceParams,
}

impl<'a, I: InvokeModel + Sync> Dispatcher<'a, I> {
    pub fn new(invoker: &'a I, prompt: &'a str, params: &'a InferenceParams) -> Self {
        Self {
            invoker,
            prompt,
            params,
        }
    }

    /// Returns exactly one record per target, in the order of `targets`.
    #[instrument(skip_all, fields(models = targets.len()))]
    pub async fn run(&self, targets: &[ModelTarget]) -> Vec<ResultRecord> {
        let mut records = Vec::with_capacity(targets.len());
        let mut failed = 0usize;
        for target in targets {
            let response = match self.invoke_one(target).await {
                Ok(text) => {
                    tracing::info!(model_id = %target.model_id, "Model responded");
                    text
                }
                // The error was already logged when it was constructed.
                Err(e) => {
                    failed += 1;
                    format!("{ERROR_RESPONSE_PREFIX}{e}")
                }
            };
            records.push(ResultRecord {
                model: target.model_id.clone(),
                prompt: self.prompt.to_string(),
                response,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            });
        }
        tracing::info!(
            succeeded = records.len() - failed,
            failed,
            "Finished dispatching prompt"
        );
        records
    }

    #[instrument(skip_all, fields(model_id = %target.model_id, family = %target.family))]
    async fn invoke_one(&self, target: &ModelTarget) -> Result<String, Error> {
        let body = target.family.make_body(self.prompt, self.params)?;
        let body = serde_json::to_vec(&body).map_err(|e| {
            Error::new(ErrorDetails::InferenceClient {
                message: format!("Failed to serialize request body: {e}"),
                model_id: target.model_id.clone(),
            })
        })?;
        let raw_response = self.invoker.invoke_model(&target.model_id, body).await?;
        target
            .family
            .parse_response(&target.model_id, &raw_response)
    }
}
