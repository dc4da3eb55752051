//! Per-invocation OpenTelemetry setup.
//!
//! Each invocation builds its own tracer provider and OTLP exporter pair and
//! tears them down before the response is returned. Lambda may freeze or
//! recycle the process at any point after the handler returns, so nothing
//! here is installed as process-wide global state: the provider, tracer and
//! exporter are owned by [`InvocationTelemetry`] and dropped with it.
//!
//! The exporter targets New Relic's OTLP trace endpoint, authenticated by
//! the `api-key` header read from `NEW_RELIC_INSERT_KEY`. Spans flow through
//! a batching processor with a 500 ms scheduled delay and are drained
//! explicitly by [`InvocationTelemetry::complete`] before the handler
//! responds.

use crate::constants::{defaults, env_vars, headers};
use crate::error::ConfigError;
use lambda_runtime::Error;
use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::{
    trace::{BatchConfigBuilder, BatchSpanProcessor, SdkTracerProvider, SpanProcessor, Tracer},
    Resource,
};
use std::{collections::HashMap, env, time::Duration};

/// Owns the tracing pipeline for a single invocation.
pub struct InvocationTelemetry {
    provider: SdkTracerProvider,
    tracer: Tracer,
}

impl InvocationTelemetry {
    /// Build the tracing pipeline for this invocation.
    ///
    /// Reads `NEW_RELIC_INSERT_KEY` and fails fast with a [`ConfigError`] if
    /// it is absent, before any span work begins. The endpoint defaults to
    /// New Relic's US ingestion endpoint and can be overridden with
    /// `NEW_RELIC_OTLP_ENDPOINT`.
    pub fn init(function_name: &str) -> Result<Self, Error> {
        let insert_key = env::var(env_vars::INSERT_KEY)
            .map_err(|_| ConfigError::MissingEnv(env_vars::INSERT_KEY))?;
        let endpoint = env::var(env_vars::OTLP_ENDPOINT)
            .unwrap_or_else(|_| defaults::OTLP_ENDPOINT.to_string());

        // The batch processor exports from its own thread, which requires a
        // blocking client. Building one on a separate thread is required
        // under an async runtime since otel 0.28.
        let http_client = std::thread::spawn(|| reqwest::blocking::Client::builder().build())
            .join()
            .map_err(|_| Error::from("failed to build blocking HTTP client"))??;

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_http_client(http_client)
            .with_protocol(Protocol::HttpBinary)
            .with_endpoint(endpoint)
            .with_timeout(Duration::from_secs(defaults::EXPORT_TIMEOUT_SECS))
            .with_headers(HashMap::from([(
                headers::API_KEY.to_string(),
                insert_key,
            )]))
            .build()?;

        let processor = BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_scheduled_delay(Duration::from_millis(defaults::SCHEDULE_DELAY_MILLIS))
                    .build(),
            )
            .build();

        Ok(Self::with_processor(function_name, processor))
    }

    /// Build the pipeline around an already constructed span processor.
    pub fn with_processor<P>(function_name: &str, processor: P) -> Self
    where
        P: SpanProcessor + 'static,
    {
        let provider = SdkTracerProvider::builder()
            .with_span_processor(processor)
            .with_resource(invocation_resource(function_name))
            .build();
        let tracer = provider.tracer("root");
        Self { provider, tracer }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Drain buffered spans and shut the pipeline down before the response
    /// is returned. Export failures are logged and never affect the
    /// response.
    pub fn complete(self) {
        if let Err(e) = self.provider.force_flush() {
            tracing::warn!(error = ?e, "error flushing telemetry");
        }
        if let Err(e) = self.provider.shutdown() {
            tracing::warn!(error = ?e, "error shutting down tracer provider");
        }
    }
}

/// Resource attributes for this invocation's spans.
///
/// `service.name` binds the spans to the function's identity for the
/// downstream backend; `OTEL_SERVICE_NAME` overrides it when set.
fn invocation_resource(function_name: &str) -> Resource {
    let service_name = env::var(env_vars::SERVICE_NAME).ok().unwrap_or_else(|| {
        if function_name.is_empty() {
            defaults::SERVICE_NAME.to_string()
        } else {
            function_name.to_string()
        }
    });

    let mut attributes = Vec::new();
    if !function_name.is_empty() {
        attributes.push(KeyValue::new("faas.name", function_name.to_string()));
    }
    if let Ok(region) = env::var("AWS_REGION") {
        attributes.push(KeyValue::new("cloud.provider", "aws"));
        attributes.push(KeyValue::new("cloud.region", region));
    }
    if let Ok(version) = env::var("AWS_LAMBDA_FUNCTION_VERSION") {
        attributes.push(KeyValue::new("faas.version", version));
    }

    Resource::builder()
        .with_service_name(service_name)
        .with_attributes(attributes)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::Value;
    use serial_test::serial;

    fn cleanup_env() {
        env::remove_var(env_vars::INSERT_KEY);
        env::remove_var(env_vars::OTLP_ENDPOINT);
        env::remove_var(env_vars::SERVICE_NAME);
        env::remove_var("AWS_REGION");
        env::remove_var("AWS_LAMBDA_FUNCTION_VERSION");
    }

    #[test]
    #[serial]
    fn test_init_fails_without_insert_key() {
        cleanup_env();

        let result = InvocationTelemetry::init("my-function");
        let err = result.err().expect("init should fail without the key");
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert!(err.to_string().contains(env_vars::INSERT_KEY));
    }

    #[test]
    #[serial]
    fn test_init_with_insert_key() {
        cleanup_env();
        env::set_var(env_vars::INSERT_KEY, "test-key");

        let telemetry = InvocationTelemetry::init("my-function").expect("init should succeed");
        // No spans were recorded, so completing must not attempt any export.
        telemetry.complete();

        cleanup_env();
    }

    #[test]
    #[serial]
    fn test_resource_uses_function_name() {
        cleanup_env();
        env::set_var("AWS_REGION", "us-east-1");

        let resource = invocation_resource("my-function");
        assert_eq!(
            resource.get(&"service.name".into()),
            Some(Value::String("my-function".into()))
        );
        assert_eq!(
            resource.get(&"faas.name".into()),
            Some(Value::String("my-function".into()))
        );
        assert_eq!(
            resource.get(&"cloud.provider".into()),
            Some(Value::String("aws".into()))
        );

        cleanup_env();
    }

    #[test]
    #[serial]
    fn test_resource_service_name_override() {
        cleanup_env();
        env::set_var(env_vars::SERVICE_NAME, "custom-service");

        let resource = invocation_resource("my-function");
        assert_eq!(
            resource.get(&"service.name".into()),
            Some(Value::String("custom-service".into()))
        );

        cleanup_env();
    }

    #[test]
    #[serial]
    fn test_resource_fallback_service_name() {
        cleanup_env();

        let resource = invocation_resource("");
        assert_eq!(
            resource.get(&"service.name".into()),
            Some(Value::String(defaults::SERVICE_NAME.into()))
        );
        assert_eq!(resource.get(&"faas.name".into()), None);

        cleanup_env();
    }
}
