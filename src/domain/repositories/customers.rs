use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::customers::CustomerEntity;

#[async_trait]
#[automock]
pub trait CustomerRepository {
    async fn find_by_id(&self, customer_id: Uuid) -> Result<Option<CustomerEntity>>;
}
