use std::fmt::Display;
use std::path::PathBuf;

use clap::Parser;
use lambda_runtime::{LambdaEvent, service_fn};
use serde_json::Value;

use comparison_core::config::Config;
use comparison_core::handler::{self, ComparisonResponse};
use comparison_core::observability::{self, LogFormat};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to a TOML config file. The built-in prompt and models are used if omitted.
    #[arg(long, env = "COMPARISON_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Sets the log format used for all logs.
    #[arg(long)]
    #[arg(value_enum)]
    #[clap(default_value_t = LogFormat::default())]
    log_format: LogFormat,

    /// Run a single comparison outside the serverless runtime, print the response, then exit.
    #[arg(long)]
    run_once: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    // Set up logs immediately, so that we can use `tracing`.
    observability::setup_logs(args.log_format).expect_pretty("Failed to set up logs");

    // The config is loaded once per cold start. Clients are created per invocation.
    let config = Config::load(args.config_file.as_deref())
        .ok() // Don't print the error here, since it was already printed when it was constructed
        .expect_pretty("Failed to load config");
    tracing::info!(
        models = config.models.len(),
        "Loaded comparison config"
    );

    if args.run_once {
        let response = handler::handle_invocation(&config)
            .await
            .ok()
            .expect_pretty("Comparison failed");
        print_response(&response);
        return;
    }

    let config = &config;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_event(config, event).await
    }))
    .await
    .expect_pretty("Lambda runtime exited with an error");
}

async fn handle_event(
    config: &Config,
    event: LambdaEvent<Value>,
) -> Result<ComparisonResponse, lambda_runtime::Error> {
    // The event payload carries no parameters.
    tracing::info!(request_id = %event.context.request_id, "Received invocation");
    Ok(handler::handle_invocation(config).await?)
}

#[expect(clippy::print_stdout)]
fn print_response(response: &ComparisonResponse) {
    match serde_json::to_string_pretty(response) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!("Failed to serialize response: {e}"),
    }
}

trait ExpectPretty<T> {
    fn expect_pretty(self, msg: &str) -> T;
}

impl<T, E: Display> ExpectPretty<T> for Result<T, E> {
    fn expect_pretty(self, msg: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("{msg}: {err}");
                std::process::exit(1);
            }
        }
    }
}

impl<T> ExpectPretty<T> for Option<T> {
    fn expect_pretty(self, msg: &str) -> T {
        match self {
            Some(value) => value,
            None => {
                tracing::error!("{msg}");
                std::process::exit(1);
            }
        }
    }
}
