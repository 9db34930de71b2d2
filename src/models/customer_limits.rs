use sea_orm::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EngineResult;
use crate::models::_entities::{customer_limits, prelude::*};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerLimit {
    pub customer_id: String,
    pub currency: String,
    pub daily_limit: rust_decimal::Decimal,
    pub per_transaction_limit: rust_decimal::Decimal,
}

impl From<customer_limits::Model> for CustomerLimit {
    fn from(model: customer_limits::Model) -> Self {
        Self {
            customer_id: model.customer_id,
            currency: model.currency,
            daily_limit: model.daily_limit,
            per_transaction_limit: model.per_transaction_limit,
        }
    }
}

impl CustomerLimit {
    pub async fn find(db: &DatabaseConnection, customer_id: &str, currency: &str) -> EngineResult<Option<CustomerLimit>> {
        let model = CustomerLimits::find()
            .filter(customer_limits::Column::CustomerId.eq(customer_id))
            .filter(customer_limits::Column::Currency.eq(currency))
            .one(db)
            .await?;
        Ok(model.map(CustomerLimit::from))
    }

    pub async fn upsert(
        db: &DatabaseConnection,
        customer_id: &str,
        currency: &str,
        daily_limit: rust_decimal::Decimal,
        per_transaction_limit: rust_decimal::Decimal,
    ) -> EngineResult<CustomerLimit> {
        let now = chrono::Utc::now().naive_utc();
        let existing = CustomerLimits::find()
            .filter(customer_limits::Column::CustomerId.eq(customer_id))
            .filter(customer_limits::Column::Currency.eq(currency))
            .one(db)
            .await?;

        let model = match existing {
            Some(model) => {
                let mut active: customer_limits::ActiveModel = model.into();
                active.daily_limit = Set(daily_limit);
                active.per_transaction_limit = Set(per_transaction_limit);
                active.updated_at = Set(now);
                active.update(db).await?
            }
            None => {
                let active = customer_limits::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(customer_id.to_string()),
                    currency: Set(currency.to_string()),
                    daily_limit: Set(daily_limit),
                    per_transaction_limit: Set(per_transaction_limit),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                active.insert(db).await?
            }
        };

        Ok(CustomerLimit::from(model))
    }
}
