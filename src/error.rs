use thiserror::Error;

/// Configuration failures that abort the invocation before any span work
/// begins. These surface as Lambda invocation errors rather than HTTP
/// responses.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingEnv(&'static str),
}
