//! HTTP request handler for the sample function.
//!
//! Each invocation wires up its own telemetry pipeline, opens a `format`
//! span under the caller's propagated trace context, resolves an optional
//! `name` from the query string or JSON body, flushes the spans, and returns
//! a greeting. The response is always 200 with one of two canned bodies;
//! the only fatal path is a missing insert key, which surfaces as an
//! invocation error before any span is started.

use crate::constants::{defaults, env_vars, headers};
use crate::propagation::extract_parent_context;
use crate::telemetry::InvocationTelemetry;
use aws_lambda_events::apigw::{ApiGatewayV2httpRequest, ApiGatewayV2httpResponse};
use aws_lambda_events::encodings::Body;
use aws_lambda_events::http::{HeaderMap, HeaderValue};
use base64::{engine::general_purpose, Engine as _};
use lambda_runtime::{Error, LambdaEvent};
use opentelemetry::trace::{Span, Tracer};
use opentelemetry::KeyValue;
use std::{env, time::Duration};

const FALLBACK_MESSAGE: &str = "This HTTP triggered function executed successfully. \
     Pass a name in the query string or in the request body for a personalized response.";

pub async fn function_handler(
    event: LambdaEvent<ApiGatewayV2httpRequest>,
) -> Result<ApiGatewayV2httpResponse, Error> {
    let function_name = env::var(env_vars::AWS_LAMBDA_FUNCTION_NAME).unwrap_or_default();
    let telemetry = InvocationTelemetry::init(&function_name)?;

    tracing::info!("HTTP trigger function processed a request");
    let name = format_span(&telemetry, &event).await;

    // Drain spans before responding; Lambda may freeze the process right
    // after the response is returned.
    telemetry.complete();

    Ok(build_response(name.as_deref()))
}

/// The traced unit of work: a `format` span parented to the inbound context
/// (or a new root), tagged with the invocation id and covering the full
/// duration of the work and the name resolution.
async fn format_span(
    telemetry: &InvocationTelemetry,
    event: &LambdaEvent<ApiGatewayV2httpRequest>,
) -> Option<String> {
    let parent_context = extract_parent_context(&event.payload.headers);
    let mut span = telemetry.tracer().start_with_context("format", &parent_context);
    span.set_attribute(KeyValue::new(
        "invocation.id",
        event.context.request_id.clone(),
    ));

    // Placeholder for real work; the span measures its full duration.
    tokio::time::sleep(Duration::from_millis(defaults::FORMAT_WORK_MILLIS)).await;
    let name = resolve_name(&event.payload);

    span.end();
    name
}

/// Resolve the caller's name from the query string, falling back to a JSON
/// body with a `name` field. Missing, malformed or empty input resolves to
/// `None`; it is never an error.
fn resolve_name(request: &ApiGatewayV2httpRequest) -> Option<String> {
    if let Some(name) = request.query_string_parameters.first("name") {
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    name_from_body(request)
}

fn name_from_body(request: &ApiGatewayV2httpRequest) -> Option<String> {
    let body = request.body.as_deref()?;
    let raw = if request.is_base64_encoded {
        let decoded = general_purpose::STANDARD.decode(body).ok()?;
        String::from_utf8(decoded).ok()?
    } else {
        body.to_string()
    };

    let json: serde_json::Value = serde_json::from_str(&raw).ok()?;
    json.get("name")
        .and_then(serde_json::Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn build_response(name: Option<&str>) -> ApiGatewayV2httpResponse {
    let body = match name {
        Some(name) => {
            format!("Hello, {name}. This HTTP triggered function executed successfully.")
        }
        None => FALLBACK_MESSAGE.to_string(),
    };

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static(headers::CORS_ALLOW_HEADERS),
    );
    response_headers.insert("Content-Type", HeaderValue::from_static("text/plain"));

    ApiGatewayV2httpResponse {
        status_code: 200,
        headers: response_headers,
        body: Some(Body::Text(body)),
        ..Default::default()
    }
}
