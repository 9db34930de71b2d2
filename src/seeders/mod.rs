use loco_rs::prelude::*;
use rust_decimal::Decimal;
use sea_orm::*;
use std::str::FromStr;

use crate::models::_entities::{prelude::*, transactions};
use crate::models::{CreateTransactionRequest, CustomerLimit, Transaction, TransactionType};

pub struct DatabaseSeeder;

impl DatabaseSeeder {
    /// Seed the database with a handful of sample transactions and customer
    /// limits useful for exercising the retry/recovery/DLQ paths by hand.
    pub async fn seed_development(db: &DatabaseConnection) -> Result<()> {
        tracing::info!("starting development database seeding");

        Self::seed_customer_limits(db).await?;
        Self::seed_sample_transactions(db).await?;

        tracing::info!("development database seeding completed");
        Ok(())
    }

    async fn seed_customer_limits(db: &DatabaseConnection) -> Result<()> {
        let limits = [("C1", "USD", "5000.00", "1000.00"), ("C2", "USD", "1000.00", "250.00")];

        for (customer_id, currency, daily_limit, per_transaction_limit) in limits {
            CustomerLimit::upsert(
                db,
                customer_id,
                currency,
                Decimal::from_str(daily_limit).unwrap(),
                Decimal::from_str(per_transaction_limit).unwrap(),
            )
            .await
            .map_err(|e| Error::string(&e.to_string()))?;
        }

        Ok(())
    }

    async fn seed_sample_transactions(db: &DatabaseConnection) -> Result<()> {
        let samples = [
            ("C1", "PM-good-1", "idem-seed-0001", "100.00"),
            ("C1", "PM-good-2", "idem-seed-0002", "42.50"),
            ("C2", "PM-good-3", "idem-seed-0003", "19.99"),
        ];

        for (customer_id, payment_method_id, idempotency_key, amount) in samples {
            let req = CreateTransactionRequest {
                transaction_type: TransactionType::Payment,
                amount: Decimal::from_str(amount).unwrap(),
                currency: "USD".to_string(),
                customer_id: customer_id.to_string(),
                payment_method_id: payment_method_id.to_string(),
                idempotency_key: idempotency_key.to_string(),
                metadata: serde_json::json!({ "seeded": true }),
            };

            Transaction::insert_pending(db, &req).await.map_err(|e| Error::string(&e.to_string()))?;
        }

        Ok(())
    }

    pub async fn is_seeded(db: &DatabaseConnection) -> Result<bool> {
        let count = Transactions::find().count(db).await?;
        Ok(count > 0)
    }

    pub async fn clear_all(db: &DatabaseConnection) -> Result<()> {
        tracing::warn!("clearing all database data");
        transactions::Entity::delete_many().exec(db).await?;
        Ok(())
    }
}
