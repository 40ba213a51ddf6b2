use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::application::notifier::{BillingNotifier, NotificationKind};

/// Notification sink that writes to the log stream. Deployments with a
/// real delivery channel implement `BillingNotifier` against their
/// provider and swap this out at wiring time.
pub struct LogNotifier;

#[async_trait]
impl BillingNotifier for LogNotifier {
    async fn notify(
        &self,
        customer_id: Uuid,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Result<()> {
        info!(
            %customer_id,
            kind = %kind,
            payload = %payload,
            "notification dispatched"
        );
        Ok(())
    }
}
