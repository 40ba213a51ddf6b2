use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{OptionalExtension, RunQueryDsl, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::subscriptions::SubscriptionEntity,
        repositories::subscriptions::SubscriptionRepository,
        value_objects::enums::{
            billing_frequencies::BillingFrequency, payment_statuses::PaymentStatus,
            subscription_statuses::SubscriptionStatus,
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{plans, subscriptions},
    },
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription = subscriptions::table
            .filter(subscriptions::id.eq(subscription_id))
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(subscription)
    }

    async fn list_billable_monthly(&self, today: NaiveDate) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = subscriptions::table
            .inner_join(plans::table)
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
            .filter(subscriptions::billing_start_date.le(today))
            .filter(plans::billing_frequency.eq(BillingFrequency::Monthly.as_str()))
            .select(SubscriptionEntity::as_select())
            .load(&mut conn)?;

        Ok(rows)
    }

    async fn list_due_for_advance(&self, today: NaiveDate) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = subscriptions::table
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
            .filter(subscriptions::next_billing_date.le(today))
            .load::<SubscriptionEntity>(&mut conn)?;

        Ok(rows)
    }

    async fn suspend_past_grace(&self, now: DateTime<Utc>) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // The status predicate doubles as the suspended_at guard: an
        // active subscription has no suspension timestamp in its current
        // lifecycle (reactivation clears it).
        let rows = update(
            subscriptions::table
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
                .filter(subscriptions::grace_period_end.lt(now)),
        )
        .set((
            subscriptions::status.eq(SubscriptionStatus::Suspended.as_str()),
            subscriptions::suspended_at.eq(Some(now)),
        ))
        .returning(SubscriptionEntity::as_returning())
        .get_results(&mut conn)?;

        Ok(rows)
    }

    async fn cancel_suspended_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = update(
            subscriptions::table
                .filter(subscriptions::status.eq(SubscriptionStatus::Suspended.as_str()))
                .filter(subscriptions::suspended_at.lt(cutoff)),
        )
        .set((
            subscriptions::status.eq(SubscriptionStatus::Cancelled.as_str()),
            subscriptions::cancelled_at.eq(Some(now)),
        ))
        .returning(SubscriptionEntity::as_returning())
        .get_results(&mut conn)?;

        Ok(rows)
    }

    async fn advance_billing_date(
        &self,
        subscription_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(
            subscriptions::table
                .filter(subscriptions::id.eq(subscription_id))
                .filter(subscriptions::next_billing_date.eq(from)),
        )
        .set((
            subscriptions::next_billing_date.eq(to),
            subscriptions::billing_cycle_count.eq(subscriptions::billing_cycle_count + 1),
        ))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn begin_pending_cycle(
        &self,
        subscription_id: Uuid,
        grace_period_end: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(subscriptions::table.filter(subscriptions::id.eq(subscription_id)))
            .set((
                subscriptions::payment_status.eq(PaymentStatus::Pending.as_str()),
                subscriptions::grace_period_end.eq(Some(grace_period_end)),
            ))
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn mark_payment_received(&self, subscription_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(
            subscriptions::table
                .filter(subscriptions::id.eq(subscription_id))
                .filter(subscriptions::status.eq_any([
                    SubscriptionStatus::Active.as_str(),
                    SubscriptionStatus::PendingPayment.as_str(),
                ])),
        )
        .set((
            subscriptions::payment_status.eq(PaymentStatus::Paid.as_str()),
            subscriptions::status.eq(SubscriptionStatus::Active.as_str()),
        ))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn reactivate(
        &self,
        subscription_id: Uuid,
        now: DateTime<Utc>,
        billing_start_date: NaiveDate,
        next_billing_date: NaiveDate,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(
            subscriptions::table
                .filter(subscriptions::id.eq(subscription_id))
                .filter(subscriptions::status.eq_any([
                    SubscriptionStatus::Suspended.as_str(),
                    SubscriptionStatus::Cancelled.as_str(),
                ])),
        )
        .set((
            subscriptions::status.eq(SubscriptionStatus::PendingPayment.as_str()),
            subscriptions::payment_status.eq(PaymentStatus::Pending.as_str()),
            subscriptions::reactivated_at.eq(Some(now)),
            subscriptions::billing_start_date.eq(billing_start_date),
            subscriptions::next_billing_date.eq(next_billing_date),
            subscriptions::grace_period_end.eq(None::<DateTime<Utc>>),
            subscriptions::suspended_at.eq(None::<DateTime<Utc>>),
            subscriptions::cancelled_at.eq(None::<DateTime<Utc>>),
            subscriptions::billing_cycle_count.eq(0),
        ))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }
}
