use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use uuid::Uuid;

use crate::{
    domain::{entities::customers::CustomerEntity, repositories::customers::CustomerRepository},
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::customers},
};

pub struct CustomerPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CustomerPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CustomerRepository for CustomerPostgres {
    async fn find_by_id(&self, customer_id: Uuid) -> Result<Option<CustomerEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let customer = customers::table
            .filter(customers::id.eq(customer_id))
            .first::<CustomerEntity>(&mut conn)
            .optional()?;

        Ok(customer)
    }
}
