use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use uuid::Uuid;

use crate::{
    domain::{
        entities::payments::{InsertPaymentEntity, PaymentEntity},
        repositories::payments::PaymentRepository,
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{invoices, payments},
    },
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn record_payment(&self, payment: InsertPaymentEntity) -> Result<PaymentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = insert_into(payments::table)
            .values(&payment)
            .returning(PaymentEntity::as_returning())
            .get_result(&mut conn)?;

        Ok(row)
    }

    async fn list_active_by_customer(&self, customer_id: Uuid) -> Result<Vec<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = payments::table
            .inner_join(invoices::table)
            .filter(invoices::customer_id.eq(customer_id))
            .filter(invoices::archived.eq(false))
            .select(PaymentEntity::as_select())
            .load(&mut conn)?;

        Ok(rows)
    }
}
