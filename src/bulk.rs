//! Batched fan-out of one message to many recipients.
//!
//! Recipients are split into fixed-size chunks. Within a chunk every send is
//! issued concurrently and the whole chunk is awaited before moving on; a
//! fixed delay separates consecutive chunks. No delay runs before the first
//! chunk or after the last one. Failures are tallied per recipient; nothing
//! is retried.

use futures::future::join_all;
use std::time::Duration;
use tracing::{info, instrument};

use crate::gateway::SmsSender;

#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub recipient: String,
    pub receipt_id: Option<String>,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub total_sent: usize,
    pub total_failed: usize,
    pub outcomes: Vec<SendOutcome>,
}

#[instrument(skip_all, fields(recipients = recipients.len(), batch_size))]
pub async fn send_to_all(
    gateway: &dyn SmsSender,
    recipients: &[String],
    message: &str,
    batch_size: usize,
    batch_delay: Duration,
) -> BulkReport {
    let batch_size = batch_size.max(1);
    let mut report = BulkReport::default();

    for (index, batch) in recipients.chunks(batch_size).enumerate() {
        if index > 0 {
            tokio::time::sleep(batch_delay).await;
        }

        let results = join_all(batch.iter().map(|to| gateway.send_sms(to, message))).await;
        for (to, result) in batch.iter().zip(results) {
            match result {
                Ok(receipt) => {
                    report.total_sent += 1;
                    report.outcomes.push(SendOutcome {
                        recipient: to.clone(),
                        receipt_id: Some(receipt.id),
                        error: None,
                    });
                }
                Err(err) => {
                    report.total_failed += 1;
                    report.outcomes.push(SendOutcome {
                        recipient: to.clone(),
                        receipt_id: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        info!(
            batch = index + 1,
            sent = report.total_sent,
            failed = report.total_failed,
            "batch dispatched"
        );
    }

    report
}
