//! Inbound trace context extraction.
//!
//! Upstream callers propagate their trace identity through the W3C
//! `traceparent`/`tracestate` headers. A local propagator instance is used
//! here so invocations stay independent of process-wide state.

use aws_lambda_events::http::HeaderMap;
use opentelemetry::{propagation::TextMapPropagator, Context};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::collections::HashMap;

/// Extract the propagated trace context from the request headers.
///
/// Missing or malformed headers yield a context without an active span, so
/// the caller's span becomes a new root.
pub fn extract_parent_context(headers: &HeaderMap) -> Context {
    let carrier: HashMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect();

    TraceContextPropagator::new().extract(&carrier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_lambda_events::http::HeaderValue;
    use opentelemetry::trace::{TraceContextExt, TraceId};

    #[test]
    fn test_extract_valid_traceparent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
        );

        let context = extract_parent_context(&headers);
        let span = context.span();
        let span_context = span.span_context();
        assert!(span_context.is_valid());
        assert_eq!(
            span_context.trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
        );
    }

    #[test]
    fn test_extract_without_headers() {
        let headers = HeaderMap::new();

        let context = extract_parent_context(&headers);
        assert!(!context.span().span_context().is_valid());
    }

    #[test]
    fn test_extract_malformed_traceparent() {
        let mut headers = HeaderMap::new();
        headers.insert("traceparent", HeaderValue::from_static("not-a-traceparent"));

        let context = extract_parent_context(&headers);
        assert!(!context.span().span_context().is_valid());
    }
}
