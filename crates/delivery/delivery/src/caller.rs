//! Single-attempt webhook caller.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use hookpulse_store::DeliveryStatus;

use crate::error::{redact_secret, DeliveryError, DeliveryResult};
use crate::payload::{CallOptions, DeliveryPayload, ResponseBody, TestResult};
use crate::signature::{PayloadSigner, SIGNATURE_VERSION};

const USER_AGENT: &str = concat!("hookpulse/", env!("CARGO_PKG_VERSION"));

/// Executes one signed HTTP delivery attempt with a hard deadline.
#[derive(Clone)]
pub struct WebhookCaller {
    client: reqwest::Client,
    no_redirect: reqwest::Client,
}

/// Raw response captured before classification.
struct Exchange {
    status: reqwest::StatusCode,
    headers: HashMap<String, String>,
    body: Option<ResponseBody>,
}

impl WebhookCaller {
    /// Creates a new caller.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .expect("HTTP client construction"),
            no_redirect: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("HTTP client construction"),
        }
    }

    /// Executes one POST to `url` and classifies the outcome.
    ///
    /// Validation failures reject before any network I/O. Network
    /// failures, timeouts, and non-2xx responses are returned as
    /// classified [`TestResult`]s, not errors.
    pub async fn call(
        &self,
        url: &str,
        secret: Option<&str>,
        payload: &DeliveryPayload,
        options: &CallOptions,
    ) -> DeliveryResult<TestResult> {
        let target = reqwest::Url::parse(url)
            .map_err(|e| DeliveryError::InvalidUrl(format!("{url}: {e}")))?;
        if target.scheme() != "http" && target.scheme() != "https" {
            return Err(DeliveryError::InvalidUrl(format!(
                "{url}: unsupported scheme '{}'",
                target.scheme()
            )));
        }
        if matches!(secret, Some(s) if s.is_empty()) {
            return Err(DeliveryError::MissingSecret(payload.webhook_id.clone()));
        }

        let body = serde_json::to_vec(payload)?;
        let payload_size = body.len() as u64;
        let request_headers = self.build_headers(payload, options, secret, &body);

        let client = if options.follow_redirects {
            &self.client
        } else {
            &self.no_redirect
        };
        let mut request = client.post(target);
        for (key, value) in &request_headers {
            request = request.header(key.as_str(), value.as_str());
        }
        let request = request.body(body);

        tracing::debug!(
            webhook_id = %payload.webhook_id,
            event_type = %payload.event_type,
            timeout_ms = options.timeout_ms,
            "dispatching webhook"
        );

        let started = Instant::now();
        let deadline = Duration::from_millis(options.timeout_ms);

        // Dropping the in-flight future on expiry aborts the connection.
        let outcome = tokio::time::timeout(deadline, execute(request)).await;
        let response_time_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Err(_) => timeout_result(response_time_ms, request_headers, payload_size),
            Ok(Err(e)) if e.is_timeout() => {
                timeout_result(response_time_ms, request_headers, payload_size)
            }
            Ok(Err(e)) => {
                let message = redact_secret(&e.to_string(), secret);
                tracing::warn!(
                    webhook_id = %payload.webhook_id,
                    error = %message,
                    "webhook delivery failed"
                );
                TestResult {
                    status: DeliveryStatus::Failed,
                    status_code: None,
                    response_time_ms,
                    response_body: None,
                    error_message: Some(message),
                    request_headers,
                    response_headers: None,
                    payload_size,
                }
            }
            Ok(Ok(exchange)) => {
                let code = exchange.status.as_u16();
                let error_message = if exchange.status.is_success() {
                    None
                } else {
                    Some(format!(
                        "HTTP {}: {}",
                        code,
                        exchange.status.canonical_reason().unwrap_or("Unknown")
                    ))
                };
                TestResult {
                    status: if exchange.status.is_success() {
                        DeliveryStatus::Success
                    } else {
                        DeliveryStatus::Failed
                    },
                    status_code: Some(code),
                    response_time_ms,
                    response_body: exchange.body,
                    error_message,
                    request_headers,
                    response_headers: Some(exchange.headers),
                    payload_size,
                }
            }
        };

        Ok(result)
    }

    fn build_headers(
        &self,
        payload: &DeliveryPayload,
        options: &CallOptions,
        secret: Option<&str>,
        body: &[u8],
    ) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("User-Agent".to_string(), USER_AGENT.to_string());
        headers.insert("X-Event-Type".to_string(), payload.event_type.clone());
        headers.insert("X-Webhook-ID".to_string(), payload.webhook_id.clone());
        headers.insert("X-Timestamp".to_string(), payload.timestamp.to_rfc3339());
        if options.test {
            headers.insert("X-Test".to_string(), "true".to_string());
        }
        if let Some(ref org) = payload.organization_id {
            headers.insert("X-Organization-ID".to_string(), org.clone());
        }
        if let Some(ref user) = payload.user_id {
            headers.insert("X-User-ID".to_string(), user.clone());
        }
        if let Some(secret) = secret {
            let signer = PayloadSigner::new(secret);
            headers.insert("X-Signature".to_string(), signer.sign(body));
            headers.insert(
                "X-Signature-Version".to_string(),
                SIGNATURE_VERSION.to_string(),
            );
        }
        headers
    }
}

impl Default for WebhookCaller {
    fn default() -> Self {
        Self::new()
    }
}

async fn execute(request: reqwest::RequestBuilder) -> Result<Exchange, reqwest::Error> {
    let response = request.send().await?;
    let status = response.status();
    let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .map(|(key, value)| {
            (
                key.to_string(),
                String::from_utf8_lossy(value.as_bytes()).to_string(),
            )
        })
        .collect();
    let content_type = headers
        .get("content-type")
        .cloned()
        .or_else(|| headers.get("Content-Type").cloned());

    // A body that fails to read is flagged, never treated as a network error.
    let body = match response.text().await {
        Ok(text) => classify_body(content_type.as_deref(), text),
        Err(_) => Some(ResponseBody::Unparsable),
    };

    Ok(Exchange {
        status,
        headers,
        body,
    })
}

fn classify_body(content_type: Option<&str>, text: String) -> Option<ResponseBody> {
    if text.is_empty() {
        return None;
    }
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);
    if is_json {
        match serde_json::from_str(&text) {
            Ok(value) => Some(ResponseBody::Json(value)),
            // Advertised JSON that does not parse is still captured.
            Err(_) => Some(ResponseBody::Text(text)),
        }
    } else {
        Some(ResponseBody::Text(text))
    }
}

fn timeout_result(
    response_time_ms: u64,
    request_headers: HashMap<String, String>,
    payload_size: u64,
) -> TestResult {
    TestResult {
        status: DeliveryStatus::Timeout,
        status_code: None,
        response_time_ms,
        response_body: None,
        error_message: Some("Request timed out".to_string()),
        request_headers,
        response_headers: None,
        payload_size,
    }
}
