use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{OptionalExtension, PgConnection, QueryResult, RunQueryDsl, insert_into, prelude::*, update};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::{
        entities::invoices::{InsertInvoiceEntity, InvoiceEntity},
        repositories::invoices::InvoiceRepository,
        value_objects::{
            balances,
            enums::invoice_statuses::InvoiceStatus,
            invoices::InvoiceDraft,
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{invoices, payments},
    },
};

const OPEN_STATUSES: [&str; 3] = ["unpaid", "partially_paid", "overdue"];

pub struct InvoicePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl InvoicePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    /// Debits minus credits over non-archived invoices, evaluated inside
    /// the caller's transaction.
    fn balance_for_customer(conn: &mut PgConnection, customer_id: Uuid) -> QueryResult<Decimal> {
        use diesel::dsl::sum;

        let billed: Option<Decimal> = invoices::table
            .filter(invoices::customer_id.eq(customer_id))
            .filter(invoices::archived.eq(false))
            .select(sum(invoices::amount))
            .first(conn)?;

        let paid: Option<Decimal> = payments::table
            .inner_join(invoices::table)
            .filter(invoices::customer_id.eq(customer_id))
            .filter(invoices::archived.eq(false))
            .select(sum(payments::amount))
            .first(conn)?;

        Ok(billed.unwrap_or_default() - paid.unwrap_or_default())
    }

    fn insert_with_credit(
        conn: &mut PgConnection,
        draft: &InvoiceDraft,
    ) -> QueryResult<InvoiceEntity> {
        let balance = Self::balance_for_customer(conn, draft.customer_id)?;
        let split = balances::apply_credit(draft.base_amount, balance);

        // An invoice fully covered by credit is its own settlement record.
        let settled = split.final_amount == Decimal::ZERO;
        let status = if settled {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Unpaid
        };

        insert_into(invoices::table)
            .values(&InsertInvoiceEntity {
                invoice_number: draft.invoice_number.clone(),
                subscription_id: draft.subscription_id,
                customer_id: draft.customer_id,
                invoice_type: draft.invoice_type.as_str().to_string(),
                original_amount: split.original_amount,
                credit_applied: split.credit_applied,
                amount: split.final_amount,
                status: status.as_str().to_string(),
                due_date: draft.due_date,
                generated_date: draft.generated_date,
                late_fee_applied: false,
                late_fee_amount: Decimal::ZERO,
                archived: false,
                notes: draft.notes.clone(),
                paid_at: settled.then(Utc::now),
            })
            .returning(InvoiceEntity::as_returning())
            .get_result(conn)
    }
}

#[async_trait]
impl InvoiceRepository for InvoicePostgres {
    async fn find_by_id(&self, invoice_id: Uuid) -> Result<Option<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let invoice = invoices::table
            .filter(invoices::id.eq(invoice_id))
            .first::<InvoiceEntity>(&mut conn)
            .optional()?;

        Ok(invoice)
    }

    async fn list_active_by_customer(&self, customer_id: Uuid) -> Result<Vec<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = invoices::table
            .filter(invoices::customer_id.eq(customer_id))
            .filter(invoices::archived.eq(false))
            .order(invoices::created_at.asc())
            .load::<InvoiceEntity>(&mut conn)?;

        Ok(rows)
    }

    async fn create_credit_aware(&self, draft: InvoiceDraft) -> Result<InvoiceEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Serializable so two concurrent creations for one customer cannot
        // both read the same credit before either insert lands.
        let invoice = conn
            .build_transaction()
            .serializable()
            .run(|conn| Self::insert_with_credit(conn, &draft))?;

        Ok(invoice)
    }

    async fn create_cycle_guarded(&self, draft: InvoiceDraft) -> Result<Option<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let invoice = conn.build_transaction().serializable().run(|conn| {
            let open_count: i64 = invoices::table
                .filter(invoices::subscription_id.eq(draft.subscription_id))
                .filter(invoices::archived.eq(false))
                .filter(invoices::status.eq_any(OPEN_STATUSES))
                .count()
                .get_result(conn)?;
            if open_count > 0 {
                return Ok(None);
            }

            let today_count: i64 = invoices::table
                .filter(invoices::subscription_id.eq(draft.subscription_id))
                .filter(invoices::generated_date.eq(draft.generated_date))
                .count()
                .get_result(conn)?;
            if today_count > 0 {
                return Ok(None);
            }

            Self::insert_with_credit(conn, &draft).map(Some)
        })?;

        Ok(invoice)
    }

    async fn find_open_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let invoice = invoices::table
            .filter(invoices::subscription_id.eq(subscription_id))
            .filter(invoices::archived.eq(false))
            .filter(invoices::status.eq_any(OPEN_STATUSES))
            .order(invoices::created_at.desc())
            .first::<InvoiceEntity>(&mut conn)
            .optional()?;

        Ok(invoice)
    }

    async fn has_open_for_subscription(&self, subscription_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let count: i64 = invoices::table
            .filter(invoices::subscription_id.eq(subscription_id))
            .filter(invoices::archived.eq(false))
            .filter(invoices::status.eq_any(OPEN_STATUSES))
            .count()
            .get_result(&mut conn)?;

        Ok(count > 0)
    }

    async fn has_invoice_generated_on(
        &self,
        subscription_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let count: i64 = invoices::table
            .filter(invoices::subscription_id.eq(subscription_id))
            .filter(invoices::generated_date.eq(date))
            .count()
            .get_result(&mut conn)?;

        Ok(count > 0)
    }

    async fn list_late_fee_candidates(
        &self,
        due_before: DateTime<Utc>,
    ) -> Result<Vec<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = invoices::table
            .filter(invoices::invoice_type.eq("subscription"))
            .filter(invoices::status.eq_any(["unpaid", "overdue"]))
            .filter(invoices::due_date.lt(due_before))
            .filter(invoices::late_fee_applied.eq(false))
            .filter(invoices::archived.eq(false))
            .order(invoices::due_date.asc())
            .load::<InvoiceEntity>(&mut conn)?;

        Ok(rows)
    }

    async fn apply_late_fee(&self, invoice_id: Uuid, fee: Decimal, note: &str) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let applied = conn.transaction(|conn| {
            let invoice = invoices::table
                .filter(invoices::id.eq(invoice_id))
                .filter(invoices::late_fee_applied.eq(false))
                .for_update()
                .first::<InvoiceEntity>(conn)
                .optional()?;

            let Some(invoice) = invoice else {
                return QueryResult::Ok(false);
            };

            let notes = match invoice.notes {
                Some(previous) => format!("{previous} | {note}"),
                None => note.to_string(),
            };

            update(
                invoices::table
                    .filter(invoices::id.eq(invoice_id))
                    .filter(invoices::late_fee_applied.eq(false)),
            )
            .set((
                invoices::late_fee_applied.eq(true),
                invoices::late_fee_amount.eq(fee),
                invoices::amount.eq(invoice.amount + fee),
                invoices::notes.eq(Some(notes)),
            ))
            .execute(conn)?;

            Ok(true)
        })?;

        Ok(applied)
    }

    async fn mark_overdue_past_due(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(
            invoices::table
                .filter(invoices::status.eq(InvoiceStatus::Unpaid.as_str()))
                .filter(invoices::due_date.lt(now))
                .filter(invoices::archived.eq(false)),
        )
        .set(invoices::status.eq(InvoiceStatus::Overdue.as_str()))
        .execute(&mut conn)?;

        Ok(updated as u64)
    }

    async fn mark_settled(
        &self,
        invoice_id: Uuid,
        status: InvoiceStatus,
        paid_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(
            invoices::table
                .filter(invoices::id.eq(invoice_id))
                .filter(invoices::status.eq_any(OPEN_STATUSES)),
        )
        .set((
            invoices::status.eq(status.as_str()),
            invoices::paid_at.eq(Some(paid_at)),
        ))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn archive_unpaid_for_subscription(&self, subscription_id: Uuid) -> Result<u64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(
            invoices::table
                .filter(invoices::subscription_id.eq(subscription_id))
                .filter(invoices::archived.eq(false))
                .filter(invoices::status.eq_any(OPEN_STATUSES)),
        )
        .set(invoices::archived.eq(true))
        .execute(&mut conn)?;

        Ok(updated as u64)
    }
}
