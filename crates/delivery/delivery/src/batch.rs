//! Batch execution with bounded parallelism.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::caller::WebhookCaller;
use crate::error::{DeliveryError, DeliveryResult};
use crate::payload::{CallOptions, DeliveryPayload, TestResult};

/// Default worker width for batch calls.
pub const DEFAULT_BATCH_WIDTH: usize = 4;

/// One entry in a batch call.
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Caller-chosen identifier echoed back in the outcome.
    pub id: String,
    /// Target URL.
    pub url: String,
    /// Signing secret, if the delivery is signed.
    pub secret: Option<String>,
    /// Payload to send.
    pub payload: DeliveryPayload,
}

/// Per-item outcome of a batch call.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Identifier from the matching [`BatchItem`].
    pub id: String,
    /// The classified result, or the error that rejected the item.
    pub result: DeliveryResult<TestResult>,
}

impl WebhookCaller {
    /// Calls every item with at most `width` requests in flight.
    ///
    /// Best-effort: one item failing never aborts its siblings. Outcomes
    /// are returned in input order.
    pub async fn call_batch(
        &self,
        items: Vec<BatchItem>,
        options: &CallOptions,
        width: usize,
    ) -> Vec<BatchOutcome> {
        let semaphore = Arc::new(Semaphore::new(width.max(1)));
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            let caller = self.clone();
            let options = options.clone();
            let semaphore = semaphore.clone();
            let id = item.id.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                let result = caller
                    .call(&item.url, item.secret.as_deref(), &item.payload, &options)
                    .await;
                BatchOutcome {
                    id: item.id,
                    result,
                }
            });
            handles.push((id, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push(BatchOutcome {
                    id,
                    result: Err(DeliveryError::Internal(format!("batch task failed: {e}"))),
                }),
            }
        }
        outcomes
    }
}
