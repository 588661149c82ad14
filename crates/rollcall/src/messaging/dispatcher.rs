use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use super::gateway::{DeliveryError, MessageContent, MessagingGateway};
use crate::config::PacingConfig;

/// Outcome of a broadcast run. Every address is attempted exactly once;
/// `success_count + fail_count == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub success_count: usize,
    pub fail_count: usize,
    pub total: usize,
}

/// Paced, failure-isolated delivery through the shared gateway handle.
/// Every send checks readiness first and fails fast rather than blocking on
/// an unestablished platform session.
pub struct OutboundDispatcher {
    gateway: Arc<dyn MessagingGateway>,
    pacing: PacingConfig,
}

impl OutboundDispatcher {
    pub fn new(gateway: Arc<dyn MessagingGateway>, pacing: PacingConfig) -> Self {
        Self { gateway, pacing }
    }

    pub fn is_ready(&self) -> bool {
        self.gateway.is_ready()
    }

    /// One delivery attempt, no retry.
    pub async fn send_single(
        &self,
        address: &str,
        content: &MessageContent,
    ) -> Result<(), DeliveryError> {
        if !self.gateway.is_ready() {
            return Err(DeliveryError::NotReady);
        }
        self.gateway.send(address, content).await
    }

    /// Delivers `body` to every address, strictly sequentially with a
    /// humanized random pause between sends. Per-recipient failures are
    /// counted and never abort the remaining iteration. No cancellation or
    /// timeout applies to an in-flight broadcast.
    pub async fn send_broadcast(
        &self,
        addresses: &[String],
        body: &str,
    ) -> Result<BroadcastReport, DeliveryError> {
        if !self.gateway.is_ready() {
            return Err(DeliveryError::NotReady);
        }

        info!(recipients = addresses.len(), "broadcast starting");
        let content = MessageContent::Text(body.to_string());
        let mut success_count = 0;
        let mut fail_count = 0;
        for (index, address) in addresses.iter().enumerate() {
            match self.send_single(address, &content).await {
                Ok(()) => success_count += 1,
                Err(err) => {
                    fail_count += 1;
                    warn!(%address, error = %err, "broadcast delivery failed");
                }
            }
            if index + 1 < addresses.len() {
                self.pace().await;
            }
        }

        let report = BroadcastReport {
            success_count,
            fail_count,
            total: addresses.len(),
        };
        info!(
            success = report.success_count,
            failed = report.fail_count,
            "broadcast finished"
        );
        Ok(report)
    }

    /// Sleeps a uniform random interval from the configured pacing bounds.
    pub(crate) async fn pace(&self) {
        let millis = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.pacing.min_delay_ms..=self.pacing.max_delay_ms)
        };
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}
