//! Delivery runner tying the caller to the delivery log.

use std::sync::Arc;

use hookpulse_store::{DeliveryEvent, LogStore, WebhookEndpoint};

use crate::caller::WebhookCaller;
use crate::error::DeliveryResult;
use crate::payload::{CallOptions, DeliveryPayload, TestResult};
use crate::retry::{CallReport, ExponentialBackoff, RetryCoordinator, RetryPolicy, RetryStrategy};

/// Executes deliveries and records each attempt in the log store.
pub struct DeliveryRunner<R: RetryStrategy = ExponentialBackoff> {
    coordinator: RetryCoordinator<R>,
    store: Arc<dyn LogStore>,
}

impl DeliveryRunner<ExponentialBackoff> {
    /// Creates a runner with the default caller and backoff.
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self {
            coordinator: RetryCoordinator::new(WebhookCaller::new()),
            store,
        }
    }
}

impl<R: RetryStrategy> DeliveryRunner<R> {
    /// Creates a runner with a custom coordinator.
    pub fn with_coordinator(store: Arc<dyn LogStore>, coordinator: RetryCoordinator<R>) -> Self {
        Self { coordinator, store }
    }

    /// Delivers a payload and records the outcome.
    pub async fn deliver(
        &self,
        endpoint: &WebhookEndpoint,
        payload: &DeliveryPayload,
        options: &CallOptions,
    ) -> DeliveryResult<(TestResult, DeliveryEvent)> {
        self.run(endpoint, payload, options, RetryPolicy::TestCall)
            .await
    }

    /// Re-delivers a payload under the redelivery policy.
    ///
    /// Unlike [`deliver`](Self::deliver), completed non-2xx responses are
    /// retried within the options budget.
    pub async fn redeliver(
        &self,
        endpoint: &WebhookEndpoint,
        payload: &DeliveryPayload,
        options: &CallOptions,
    ) -> DeliveryResult<(TestResult, DeliveryEvent)> {
        self.run(endpoint, payload, options, RetryPolicy::Redelivery)
            .await
    }

    /// Sends a test payload (`X-Test: true`) and records the outcome.
    pub async fn test(
        &self,
        endpoint: &WebhookEndpoint,
        data: serde_json::Value,
    ) -> DeliveryResult<(TestResult, DeliveryEvent)> {
        let payload = DeliveryPayload::new("endpoint.test", &endpoint.id, data);
        let options = CallOptions::new().as_test();
        self.run(endpoint, &payload, &options, RetryPolicy::TestCall)
            .await
    }

    async fn run(
        &self,
        endpoint: &WebhookEndpoint,
        payload: &DeliveryPayload,
        options: &CallOptions,
        policy: RetryPolicy,
    ) -> DeliveryResult<(TestResult, DeliveryEvent)> {
        let report = self
            .coordinator
            .call_with_policy(
                &endpoint.url,
                endpoint.secret.as_deref(),
                payload,
                options,
                policy,
            )
            .await?;

        let event = event_from_report(&endpoint.id, &payload.event_type, &report);
        self.store.append(event.clone()).await?;

        tracing::info!(
            webhook_id = %endpoint.id,
            status = %event.status,
            attempts = report.attempts,
            response_time_ms = event.response_time_ms,
            "delivery recorded"
        );

        Ok((report.result, event))
    }

    /// Gets the log store.
    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }
}

fn event_from_report(webhook_id: &str, event_type: &str, report: &CallReport) -> DeliveryEvent {
    let result = &report.result;
    let mut event = DeliveryEvent::new(webhook_id, event_type, result.status)
        .with_response_time(result.response_time_ms)
        .with_payload_size(result.payload_size)
        .with_retry_count(report.attempts.saturating_sub(1));
    event.error_message = result.error_message.clone();
    event
}
