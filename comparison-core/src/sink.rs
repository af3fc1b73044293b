//! Writes the comparison table to a local scratch file and uploads it to the object store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, PutPayload};
use serde::Serialize;
use tracing::instrument;

use crate::dispatcher::ResultRecord;
use crate::error::{Error, ErrorDetails};
use crate::storage::storage_key;

pub const CSV_HEADER: [&str; 4] = ["model", "prompt", "response", "timestamp"];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UploadSummary {
    pub key: String,
    pub results_count: usize,
}

/// Writes a header row followed by one row per record, in order.
/// A partially written file is removed before the error is returned.
pub async fn write_table(records: &[ResultRecord], path: &Path) -> Result<(), Error> {
    let scratch_error = |message: String| {
        Error::new(ErrorDetails::ScratchFile {
            message,
            path: path.display().to_string(),
        })
    };
    let table = render_table(records)
        .map_err(|e| scratch_error(format!("Failed to encode comparison table: {e}")))?;
    if let Err(e) = tokio::fs::write(path, table).await {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            // The file was never created.
            Err(remove_err) if remove_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(remove_err) => tracing::warn!(
                "Failed to remove partial scratch file `{}`: {remove_err}",
                path.display()
            ),
        }
        return Err(scratch_error(format!(
            "Failed to write comparison table: {e}"
        )));
    }
    Ok(())
}

fn render_table(records: &[ResultRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record([
            record.model.as_str(),
            record.prompt.as_str(),
            record.response.as_str(),
            record.timestamp.as_str(),
        ])?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))
}

pub struct ResultSink {
    store: Arc<dyn ObjectStore>,
    scratch_path: PathBuf,
    key_prefix: String,
}

impl ResultSink {
    pub fn new(store: Arc<dyn ObjectStore>, scratch_path: PathBuf, key_prefix: String) -> Self {
        Self {
            store,
            scratch_path,
            key_prefix,
        }
    }

    /// Writes `records` to the scratch file and uploads it under a key derived from `now`.
    /// The scratch file is removed after the upload attempt, whether or not it succeeded.
    #[instrument(skip_all, fields(results_count = records.len()))]
    pub async fn upload(
        &self,
        records: &[ResultRecord],
        now: DateTime<Utc>,
    ) -> Result<UploadSummary, Error> {
        let key = storage_key(&self.key_prefix, now);
        write_table(records, &self.scratch_path).await?;

        let upload_result = self.put_scratch_file(&key).await;
        let remove_result = tokio::fs::remove_file(&self.scratch_path).await;
        upload_result?;
        remove_result.map_err(|e| {
            Error::new(ErrorDetails::ScratchFile {
                message: format!("Failed to remove scratch file after upload: {e}"),
                path: self.scratch_path.display().to_string(),
            })
        })?;

        tracing::info!(key, "Uploaded comparison table");
        Ok(UploadSummary {
            key,
            results_count: records.len(),
        })
    }

    async fn put_scratch_file(&self, key: &str) -> Result<(), Error> {
        let contents = tokio::fs::read(&self.scratch_path).await.map_err(|e| {
            Error::new(ErrorDetails::ScratchFile {
                message: format!("Failed to read comparison table: {e}"),
                path: self.scratch_path.display().to_string(),
            })
        })?;
        self.store
            .put(&ObjectStorePath::from(key), PutPayload::from(contents))
            .await
            .map_err(|e| {
                Error::new(ErrorDetails::ObjectStoreWrite {
                    message: e.to_string(),
                    key: key.to_string(),
                })
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use object_store::local::LocalFileSystem;
    use object_store::memory::InMemory;
    use tracing_test::traced_test;

    use super::*;

    fn record(model: &str, response: &str) -> ResultRecord {
        ResultRecord {
            model: model.to_string(),
            prompt: "What is a cosmetic guidance?".to_string(),
            response: response.to_string(),
            timestamp: "2024-06-14T09:30:15.000000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_write_table_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comparison.csv");
        let records = vec![
            record("anthropic.claude-3-haiku-20240307-v1:0", "An answer"),
            record("mistral.mistral-7b-instruct-v0:2", "Error: throttled"),
        ];
        write_table(&records, &path).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            [
                "model,prompt,response,timestamp",
                "anthropic.claude-3-haiku-20240307-v1:0,What is a cosmetic guidance?,An answer,2024-06-14T09:30:15.000000Z",
                "mistral.mistral-7b-instruct-v0:2,What is a cosmetic guidance?,Error: throttled,2024-06-14T09:30:15.000000Z",
            ]
        );
    }

    #[tokio::test]
    async fn test_write_table_quotes_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comparison.csv");
        let records = vec![record(
            "meta.llama3-70b-instruct-v1:0",
            "Line one, with a comma\nLine \"two\"",
        )];
        write_table(&records, &path).await.unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADER);
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][2], "Line one, with a comma\nLine \"two\"");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_write_table_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("comparison.csv");
        let err = write_table(&[record("m", "r")], &path).await.unwrap_err();
        assert!(matches!(
            err.get_details(),
            ErrorDetails::ScratchFile { .. }
        ));
        assert!(!path.exists());
        // Nothing was created, so there is nothing to clean up.
        assert!(!logs_contain("Failed to remove partial scratch file"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_write_table_logs_failed_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the scratch path can be neither written nor removed as a file.
        let path = dir.path().join("comparison.csv");
        std::fs::create_dir(&path).unwrap();
        let err = write_table(&[record("m", "r")], &path).await.unwrap_err();

        let ErrorDetails::ScratchFile { message, .. } = err.get_details() else {
            panic!("Expected ScratchFile, got {err:?}");
        };
        assert!(
            message.starts_with("Failed to write comparison table"),
            "Unexpected message: {message}"
        );
        assert!(logs_contain("Failed to remove partial scratch file"));
        assert!(logs_contain("comparison.csv"));
    }

    #[tokio::test]
    async fn test_upload_removes_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let scratch_path = dir.path().join("comparison.csv");
        let store = Arc::new(InMemory::new());
        let sink = ResultSink::new(
            store.clone(),
            scratch_path.clone(),
            "ai-comparisons".to_string(),
        );
        let now = Utc.with_ymd_and_hms(2024, 6, 14, 9, 30, 15).unwrap();
        let summary = sink
            .upload(&[record("m1", "r1"), record("m2", "r2")], now)
            .await
            .unwrap();

        assert_eq!(
            summary,
            UploadSummary {
                key: "ai-comparisons/comparison_20240614_093015.csv".to_string(),
                results_count: 2,
            }
        );
        assert!(!scratch_path.exists());
        let uploaded = store
            .get(&ObjectStorePath::from(summary.key.as_str()))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        let uploaded = String::from_utf8(uploaded.to_vec()).unwrap();
        assert!(uploaded.starts_with("model,prompt,response,timestamp\nm1,"));
        assert_eq!(uploaded.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_failed_upload_still_removes_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let scratch_path = dir.path().join("comparison.csv");
        let store_root = dir.path().join("store");
        std::fs::create_dir(&store_root).unwrap();
        // A plain file where the key prefix directory should be makes every put fail.
        std::fs::write(store_root.join("ai-comparisons"), "").unwrap();
        let store = LocalFileSystem::new_with_prefix(&store_root).unwrap();
        let sink = ResultSink::new(
            Arc::new(store),
            scratch_path.clone(),
            "ai-comparisons".to_string(),
        );
        let now = Utc.with_ymd_and_hms(2024, 6, 14, 9, 30, 15).unwrap();
        let err = sink.upload(&[record("m1", "r1")], now).await.unwrap_err();

        let ErrorDetails::ObjectStoreWrite { key, .. } = err.get_details() else {
            panic!("Expected ObjectStoreWrite, got {err:?}");
        };
        assert_eq!(key, "ai-comparisons/comparison_20240614_093015.csv");
        assert!(!scratch_path.exists());
    }
}
