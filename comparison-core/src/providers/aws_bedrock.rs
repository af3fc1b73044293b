//! AWS Bedrock runtime transport using the `InvokeModel` API.

use std::time::{Duration, Instant};

use aws_config::Region;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_smithy_types::error::display::DisplayErrorContext;

use super::InvokeModel;
use super::aws_common;
use crate::error::{Error, ErrorDetails};

const CONTENT_TYPE_JSON: &str = "application/json";

// NB: If you add `Clone` someday, you'll need to wrap client in Arc
#[derive(Debug)]
pub struct AWSBedrockInvoker {
    client: aws_sdk_bedrockruntime::Client,
}

impl AWSBedrockInvoker {
    pub async fn new(region: Option<Region>) -> Result<Self, Error> {
        let config = aws_common::config_with_region(region).await?;
        Ok(Self::from_client(aws_sdk_bedrockruntime::Client::new(&config)))
    }

    pub fn from_client(client: aws_sdk_bedrockruntime::Client) -> Self {
        Self { client }
    }
}

impl InvokeModel for AWSBedrockInvoker {
    async fn invoke_model<'a>(
        &'a self,
        model_id: &'a str,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, Error> {
        let raw_request = String::from_utf8_lossy(&body).into_owned();
        let start_time = Instant::now();
        let output = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type(CONTENT_TYPE_JSON)
            .accept(CONTENT_TYPE_JSON)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| {
                Error::new(ErrorDetails::InferenceServer {
                    message: format!(
                        "Error sending request to AWS Bedrock: {}",
                        DisplayErrorContext(&e)
                    ),
                    model_id: model_id.to_string(),
                    raw_request: Some(raw_request),
                })
            })?;
        tracing::debug!(
            model_id,
            elapsed_ms = elapsed_millis(start_time.elapsed()),
            "AWS Bedrock responded"
        );
        Ok(output.body.into_inner())
    }
}

/// Milliseconds in `elapsed`, saturating at `u64::MAX`.
fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
