use lambda_runtime::{service_fn, Error, Runtime};
use std::env;
use tracing_subscriber::EnvFilter;

mod constants;
mod error;
mod handler;
mod propagation;
mod telemetry;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // CloudWatch adds its own timestamps, and ANSI escapes just clutter the
    // log stream.
    let env_var_name = if env::var("RUST_LOG").is_ok() {
        "RUST_LOG"
    } else {
        "AWS_LAMBDA_LOG_LEVEL"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var(env_var_name)
                .from_env_lossy(),
        )
        .with_target(false)
        .without_time()
        .with_ansi(false)
        .init();

    Runtime::new(service_fn(handler::function_handler)).run().await
}
