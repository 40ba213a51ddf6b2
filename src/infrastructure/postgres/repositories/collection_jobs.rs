use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::collection_jobs::InsertCollectionJobEntity,
        repositories::collection_jobs::CollectionJobRepository,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::collection_jobs},
};

pub struct CollectionJobPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CollectionJobPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CollectionJobRepository for CollectionJobPostgres {
    async fn schedule(&self, job: InsertCollectionJobEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let job_id = insert_into(collection_jobs::table)
            .values(&job)
            .returning(collection_jobs::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(job_id)
    }

    async fn cancel_pending_for_subscription(&self, subscription_id: Uuid) -> Result<u64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let cancelled = update(
            collection_jobs::table
                .filter(collection_jobs::subscription_id.eq(subscription_id))
                .filter(collection_jobs::status.eq("pending")),
        )
        .set(collection_jobs::status.eq("cancelled"))
        .execute(&mut conn)?;

        Ok(cancelled as u64)
    }
}
