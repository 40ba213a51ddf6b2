use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::customers;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = customers)]
pub struct CustomerEntity {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub wallet_account: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

