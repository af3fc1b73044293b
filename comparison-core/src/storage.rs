use std::sync::Arc;

use chrono::{DateTime, Utc};
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use serde::Deserialize;

use crate::error::{Error, ErrorDetails};

pub const DEFAULT_BUCKET_NAME: &str = "awstestbedrockaidrt";

/// Where the comparison table is uploaded.
/// Production runs write to S3; the filesystem backend exists for local runs.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum StorageKind {
    S3Compatible {
        #[serde(default = "default_bucket_name")]
        bucket_name: String,
        region: Option<String>,
        endpoint: Option<String>,
        allow_http: Option<bool>,
    },
    Filesystem {
        path: String,
    },
}

impl Default for StorageKind {
    fn default() -> Self {
        StorageKind::S3Compatible {
            bucket_name: DEFAULT_BUCKET_NAME.to_string(),
            region: None,
            endpoint: None,
            allow_http: None,
        }
    }
}

fn default_bucket_name() -> String {
    DEFAULT_BUCKET_NAME.to_string()
}

impl StorageKind {
    pub fn build_store(&self) -> Result<Arc<dyn ObjectStore>, Error> {
        match self {
            StorageKind::Filesystem { path } => {
                std::fs::create_dir_all(path).map_err(|e| {
                    Error::new(ErrorDetails::Config {
                        message: format!("Failed to create directory `{path}` for filesystem object store: {e}"),
                    })
                })?;
                Ok(Arc::new(LocalFileSystem::new_with_prefix(path).map_err(
                    |e| {
                        Error::new(ErrorDetails::Config {
                            message: format!(
                                "Failed to create filesystem object store for path: {path}: {e}"
                            ),
                        })
                    },
                )?))
            }
            StorageKind::S3Compatible {
                bucket_name,
                region,
                endpoint,
                allow_http,
            } => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket_name);
                if let Some(region) = region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder.with_endpoint(endpoint);
                }
                if let Some(allow_http) = *allow_http {
                    if allow_http {
                        tracing::warn!("`[object_storage.allow_http]` is set to `true` - this is insecure, and should only be used when running a local S3-compatible object store");
                    }
                    builder = builder.with_allow_http(allow_http);
                }
                Ok(Arc::new(builder.build().map_err(|e| {
                    Error::new(ErrorDetails::Config {
                        message: format!(
                            "Failed to create S3-compatible object store with config `{self:?}`: {e}"
                        ),
                    })
                })?))
            }
        }
    }

    /// Human-readable location of `key`, used in the invocation summary.
    pub fn destination_url(&self, key: &str) -> String {
        match self {
            StorageKind::S3Compatible { bucket_name, .. } => format!("s3://{bucket_name}/{key}"),
            StorageKind::Filesystem { path } => {
                format!("{}/{key}", path.trim_end_matches('/'))
            }
        }
    }
}

/// Builds the object key for a comparison table written at `now`,
/// e.g. `ai-comparisons/comparison_20240614_093015.csv`.
pub fn storage_key(prefix: &str, now: DateTime<Utc>) -> String {
    let file_name = format!("comparison_{}.csv", now.format("%Y%m%d_%H%M%S"));
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        file_name
    } else {
        format!("{prefix}/{file_name}")
    }
}
