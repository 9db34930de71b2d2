use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_type: String,
    pub status: String,
    pub amount: rust_decimal::Decimal,
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    #[sea_orm(unique)]
    pub idempotency_key: String,
    pub retry_count: i32,
    pub metadata: Option<serde_json::Value>,
    pub error: Option<serde_json::Value>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
    pub completed_at: Option<chrono::NaiveDateTime>,
    pub failed_at: Option<chrono::NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::dead_letter::Entity")]
    DeadLetter,
}

impl Related<super::dead_letter::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeadLetter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
