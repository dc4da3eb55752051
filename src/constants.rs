//! Constants for the sample function.
//!
//! This file centralizes all constants to ensure consistency across the
//! codebase and provide a single source of truth for configuration
//! parameters.

/// Environment variable names for configuration.
pub mod env_vars {
    /// New Relic license/insert key used to authenticate trace export.
    pub const INSERT_KEY: &str = "NEW_RELIC_INSERT_KEY";

    /// Override for the New Relic OTLP trace endpoint.
    pub const OTLP_ENDPOINT: &str = "NEW_RELIC_OTLP_ENDPOINT";

    /// Service name override for telemetry.
    pub const SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

    /// AWS Lambda function name (used as fallback service name).
    pub const AWS_LAMBDA_FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";
}

/// Default values for configuration parameters.
pub mod defaults {
    /// New Relic OTLP trace ingestion endpoint (US region).
    pub const OTLP_ENDPOINT: &str = "https://otlp.nr-data.net/v1/traces";

    /// Default service name if not provided.
    pub const SERVICE_NAME: &str = "unknown_service";

    /// Scheduled delay for the batching span processor.
    pub const SCHEDULE_DELAY_MILLIS: u64 = 500;

    /// Upper bound on a single export attempt during flush.
    pub const EXPORT_TIMEOUT_SECS: u64 = 3;

    /// Duration of the placeholder work measured by the `format` span.
    pub const FORMAT_WORK_MILLIS: u64 = 500;
}

/// HTTP header names and values used on the wire.
pub mod headers {
    /// Header carrying the insert key on export requests.
    pub const API_KEY: &str = "api-key";

    /// CORS allow-list so browsers may send trace propagation headers.
    pub const CORS_ALLOW_HEADERS: &str = "newrelic,traceparent,tracestate";
}
