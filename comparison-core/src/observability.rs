use std::io::IsTerminal;

use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, ErrorDetails};

#[derive(Clone, Debug, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

const DEFAULT_LOG_FILTER: &str = "warn,comparison_core=info,comparison_lambda=info";

/// Set up logs for the whole process.
///
/// `RUST_LOG` takes precedence over the default filter. ANSI colors are only emitted
/// when stdout is a terminal, so that log collectors receive plain text.
pub fn setup_logs(log_format: LogFormat) -> Result<(), Error> {
    let log_level = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let log_layer = match log_format {
        LogFormat::Pretty => Box::new(
            tracing_subscriber::fmt::layer().with_ansi(std::io::stdout().is_terminal()),
        ) as Box<dyn Layer<_> + Send + Sync>,
        LogFormat::Json => Box::new(tracing_subscriber::fmt::layer().json()),
    };

    tracing_subscriber::registry()
        .with(log_layer.with_filter(log_level))
        .try_init()
        .map_err(|e| {
            Error::new(ErrorDetails::Observability {
                message: format!("Failed to initialize tracing subscriber: {e}"),
            })
        })
}
