//! Supplemented collaborator (SPEC_FULL §10.6): per-customer spending limits
//! consulted by `TransactionManager::check_transaction_limits` before `begin`
//! authorizes against the provider.

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

use crate::errors::EngineResult;
use crate::models::CustomerLimit;

pub struct CustomerLimitsService;

impl CustomerLimitsService {
    /// Returns whether `amount` in `currency` is within the customer's
    /// per-transaction and daily limits. A customer with no configured
    /// limits is unrestricted — limits are opt-in, not a default deny.
    pub async fn check(
        db: &DatabaseConnection,
        customer_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> EngineResult<bool> {
        let Some(limit) = CustomerLimit::find(db, customer_id, currency).await? else {
            return Ok(true);
        };

        if amount > limit.per_transaction_limit {
            return Ok(false);
        }

        let spent_today = Self::spent_today(db, customer_id, currency).await?;
        Ok(spent_today + amount <= limit.daily_limit)
    }

    async fn spent_today(db: &DatabaseConnection, customer_id: &str, currency: &str) -> EngineResult<Decimal> {
        use crate::models::_entities::prelude::Transactions;
        use crate::models::_entities::transactions;
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

        let start_of_day = chrono::Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap();

        let completed = Transactions::find()
            .filter(transactions::Column::CustomerId.eq(customer_id))
            .filter(transactions::Column::Currency.eq(currency))
            .filter(transactions::Column::Status.eq("COMPLETED"))
            .filter(transactions::Column::CreatedAt.gte(start_of_day))
            .all(db)
            .await?;

        Ok(completed.iter().map(|t| t.amount).sum())
    }
}
