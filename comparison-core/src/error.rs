use std::fmt;

#[derive(Debug, PartialEq)]
// As long as the struct member is private, we force people to use the `new` method and log the error.
pub struct Error(ErrorDetails);

impl Error {
    pub fn new(details: ErrorDetails) -> Self {
        details.log();
        Error(details)
    }

    pub fn new_without_logging(details: ErrorDetails) -> Self {
        Error(details)
    }

    pub fn get_details(&self) -> &ErrorDetails {
        &self.0
    }

    pub fn get_owned_details(self) -> ErrorDetails {
        self.0
    }

    /// Whether this error only affects a single model's result, rather than the whole invocation.
    pub fn is_per_model(&self) -> bool {
        self.0.is_per_model()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<ErrorDetails> for Error {
    fn from(details: ErrorDetails) -> Self {
        Error::new(details)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, PartialEq)]
pub enum ErrorDetails {
    Config {
        message: String,
    },
    InferenceClient {
        message: String,
        model_id: String,
    },
    InferenceServer {
        message: String,
        model_id: String,
        raw_request: Option<String>,
    },
    MalformedResponse {
        message: String,
        model_id: String,
        raw_response: Option<String>,
    },
    ObjectStoreWrite {
        message: String,
        key: String,
    },
    Observability {
        message: String,
    },
    ScratchFile {
        message: String,
        path: String,
    },
    Serialization {
        message: String,
    },
    UnknownModelFamily {
        model_id: String,
    },
}

impl ErrorDetails {
    /// Defines the error level for logging this error
    fn level(&self) -> tracing::Level {
        match self {
            ErrorDetails::Config { .. } => tracing::Level::ERROR,
            ErrorDetails::InferenceClient { .. } => tracing::Level::WARN,
            ErrorDetails::InferenceServer { .. } => tracing::Level::WARN,
            ErrorDetails::MalformedResponse { .. } => tracing::Level::WARN,
            ErrorDetails::ObjectStoreWrite { .. } => tracing::Level::ERROR,
            ErrorDetails::Observability { .. } => tracing::Level::ERROR,
            ErrorDetails::ScratchFile { .. } => tracing::Level::ERROR,
            ErrorDetails::Serialization { .. } => tracing::Level::WARN,
            ErrorDetails::UnknownModelFamily { .. } => tracing::Level::ERROR,
        }
    }

    fn is_per_model(&self) -> bool {
        match self {
            ErrorDetails::InferenceClient { .. }
            | ErrorDetails::InferenceServer { .. }
            | ErrorDetails::MalformedResponse { .. }
            | ErrorDetails::Serialization { .. } => true,
            ErrorDetails::Config { .. }
            | ErrorDetails::ObjectStoreWrite { .. }
            | ErrorDetails::Observability { .. }
            | ErrorDetails::ScratchFile { .. }
            | ErrorDetails::UnknownModelFamily { .. } => false,
        }
    }

    /// Log the error using the `tracing` library
    pub fn log(&self) {
        match self.level() {
            tracing::Level::ERROR => tracing::error!("{self}"),
            tracing::Level::WARN => tracing::warn!("{self}"),
            tracing::Level::INFO => tracing::info!("{self}"),
            tracing::Level::DEBUG => tracing::debug!("{self}"),
            tracing::Level::TRACE => tracing::trace!("{self}"),
        }
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetails::Config { message } => write!(f, "{message}"),
            ErrorDetails::InferenceClient { message, model_id } => {
                write!(f, "Error preparing request for model `{model_id}`: {message}")
            }
            ErrorDetails::InferenceServer {
                message,
                model_id,
                raw_request,
            } => {
                write!(f, "Error from inference server for model `{model_id}`: {message}")?;
                if let Some(raw_request) = raw_request {
                    write!(f, " (raw request: {raw_request})")?;
                }
                Ok(())
            }
            ErrorDetails::MalformedResponse {
                message,
                model_id,
                raw_response,
            } => {
                write!(f, "Malformed response from model `{model_id}`: {message}")?;
                if let Some(raw_response) = raw_response {
                    write!(f, " (raw response: {raw_response})")?;
                }
                Ok(())
            }
            ErrorDetails::ObjectStoreWrite { message, key } => {
                write!(f, "Error writing `{key}` to object store: {message}")
            }
            ErrorDetails::Observability { message } => write!(f, "{message}"),
            ErrorDetails::ScratchFile { message, path } => {
                write!(f, "Error with scratch file `{path}`: {message}")
            }
            ErrorDetails::Serialization { message } => write!(f, "{message}"),
            ErrorDetails::UnknownModelFamily { model_id } => write!(
                f,
                "Model `{model_id}` does not belong to a known model family (expected an identifier containing `anthropic`, `meta.llama`, or `mistral`)"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_new_logs_error() {
        let err = Error::new(ErrorDetails::UnknownModelFamily {
            model_id: "cohere.command-r-v1:0".to_string(),
        });
        assert!(!err.is_per_model());
        assert!(logs_contain(
            "Model `cohere.command-r-v1:0` does not belong to a known model family"
        ));
    }

    #[test]
    #[traced_test]
    fn test_new_without_logging() {
        let err = Error::new_without_logging(ErrorDetails::Config {
            message: "quiet".to_string(),
        });
        assert_eq!(err.to_string(), "quiet");
        assert!(!logs_contain("quiet"));
    }

    #[test]
    fn test_per_model_classification() {
        let err = Error::new_without_logging(ErrorDetails::InferenceServer {
            message: "throttled".to_string(),
            model_id: "mistral.mistral-7b-instruct-v0:2".to_string(),
            raw_request: None,
        });
        assert!(err.is_per_model());
        assert_eq!(
            err.to_string(),
            "Error from inference server for model `mistral.mistral-7b-instruct-v0:2`: throttled"
        );
    }
}
