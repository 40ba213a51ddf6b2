use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::collection_jobs::InsertCollectionJobEntity;

/// Dunning schedule for suspended subscriptions. Cancellation and the
/// enhanced reactivation path clear whatever is still pending.
#[async_trait]
#[automock]
pub trait CollectionJobRepository {
    async fn schedule(&self, job: InsertCollectionJobEntity) -> Result<Uuid>;

    async fn cancel_pending_for_subscription(&self, subscription_id: Uuid) -> Result<u64>;
}
