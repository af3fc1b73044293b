use std::sync::Arc;

use chrono::Utc;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, ErrorDetails};
use crate::providers::InvokeModel;
use crate::providers::aws_bedrock::AWSBedrockInvoker;
use crate::sink::ResultSink;

/// The payload returned to the serverless runtime after a successful invocation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ComparisonResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded [`ComparisonSummary`]
    pub body: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub message: String,
    pub results_count: usize,
}

impl ComparisonResponse {
    fn ok(summary: &ComparisonSummary) -> Result<Self, Error> {
        let body = serde_json::to_string(summary).map_err(|e| {
            Error::new(ErrorDetails::Serialization {
                message: format!("Failed to serialize comparison summary: {e}"),
            })
        })?;
        Ok(Self {
            status_code: 200,
            body,
        })
    }
}

/// Runs one comparison with the given clients: dispatch the prompt to every model,
/// then upload the resulting table.
pub async fn run_comparison<I: InvokeModel + Sync>(
    config: &Config,
    invoker: &I,
    store: Arc<dyn ObjectStore>,
) -> Result<ComparisonResponse, Error> {
    let records = Dispatcher::new(invoker, &config.prompt, &config.inference)
        .run(&config.models)
        .await;

    let sink = ResultSink::new(
        store,
        config.scratch_path.clone(),
        config.key_prefix.clone(),
    );
    let upload = sink.upload(&records, Utc::now()).await?;

    ComparisonResponse::ok(&ComparisonSummary {
        message: format!(
            "Comparison completed and saved to {}",
            config.object_storage.destination_url(&upload.key)
        ),
        results_count: upload.results_count,
    })
}

/// Handles one trigger event. The Bedrock client and the object store are created for this
/// invocation only and dropped when it returns.
#[instrument(skip_all, name = "comparison")]
pub async fn handle_invocation(config: &Config) -> Result<ComparisonResponse, Error> {
    let invoker = AWSBedrockInvoker::new(config.aws.region()).await?;
    let store = config.object_storage.build_store()?;
    run_comparison(config, &invoker, store).await
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;
    use object_store::path::Path as ObjectStorePath;

    use super::*;
    use crate::providers::dummy::DummyInvoker;

    fn test_config(scratch_path: std::path::PathBuf) -> Config {
        let mut config = Config::load(None).unwrap();
        config.scratch_path = scratch_path;
        config
    }

    #[tokio::test]
    async fn test_run_comparison_response() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().join("ai_comparison.csv"));
        let store = Arc::new(InMemory::new());
        let invoker = DummyInvoker::new();

        let response = run_comparison(&config, &invoker, store.clone())
            .await
            .unwrap();
        assert_eq!(response.status_code, 200);
        let summary: ComparisonSummary = serde_json::from_str(&response.body).unwrap();
        assert_eq!(summary.results_count, 4);
        let url = summary
            .message
            .strip_prefix("Comparison completed and saved to s3://awstestbedrockaidrt/")
            .unwrap_or_else(|| panic!("Unexpected message: {}", summary.message));
        assert!(url.starts_with("ai-comparisons/comparison_"));

        // The key in the message is the key that was written.
        store.head(&ObjectStorePath::from(url)).await.unwrap();
        assert!(!config.scratch_path.exists());
    }

    #[test]
    fn test_response_serialization() {
        let response = ComparisonResponse::ok(&ComparisonSummary {
            message: "Comparison completed and saved to s3://bucket/key.csv".to_string(),
            results_count: 4,
        })
        .unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "statusCode": 200,
                "body": r#"{"message":"Comparison completed and saved to s3://bucket/key.csv","results_count":4}"#
            })
        );
    }
}
