use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{OptionalExtension, Queryable, RunQueryDsl, Selectable, prelude::*};
use tracing::warn;

use crate::{
    domain::{
        repositories::pricing::PricingConfigRepository, value_objects::pricing::PricingConfig,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::pricing_configs},
};

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = pricing_configs)]
struct PricingConfigRecord {
    #[allow(dead_code)]
    id: i32,
    config: serde_json::Value,
    #[allow(dead_code)]
    updated_at: DateTime<Utc>,
}

pub struct PricingConfigPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PricingConfigPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PricingConfigRepository for PricingConfigPostgres {
    async fn get_pricing_config(&self) -> Result<Option<PricingConfig>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let record = pricing_configs::table
            .order(pricing_configs::updated_at.desc())
            .first::<PricingConfigRecord>(&mut conn)
            .optional()?;

        let Some(record) = record else {
            return Ok(None);
        };

        match serde_json::from_value::<PricingConfig>(record.config) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                // A malformed record must not take billing down; callers
                // fall back to the documented defaults.
                warn!(error = %err, "pricing: stored config is malformed, ignoring");
                Ok(None)
            }
        }
    }
}
