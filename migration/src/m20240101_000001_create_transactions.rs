use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()".to_string()),
                    )
                    .col(ColumnDef::new(Transactions::TransactionType).string().not_null())
                    .col(ColumnDef::new(Transactions::Status).string().not_null().default("pending"))
                    .col(ColumnDef::new(Transactions::Amount).decimal_len(18, 2).not_null())
                    .col(ColumnDef::new(Transactions::Currency).char_len(3).not_null())
                    .col(ColumnDef::new(Transactions::CustomerId).string().not_null())
                    .col(ColumnDef::new(Transactions::PaymentMethodId).string().not_null())
                    .col(ColumnDef::new(Transactions::IdempotencyKey).string().not_null())
                    .col(ColumnDef::new(Transactions::RetryCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Transactions::Metadata).json())
                    .col(ColumnDef::new(Transactions::Error).json())
                    .col(ColumnDef::new(Transactions::CreatedAt).timestamp().not_null().extra("DEFAULT CURRENT_TIMESTAMP".to_string()))
                    .col(ColumnDef::new(Transactions::UpdatedAt).timestamp().not_null().extra("DEFAULT CURRENT_TIMESTAMP".to_string()))
                    .col(ColumnDef::new(Transactions::CompletedAt).timestamp())
                    .col(ColumnDef::new(Transactions::FailedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_idempotency_key")
                    .table(Transactions::Table)
                    .col(Transactions::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_customer_id")
                    .table(Transactions::Table)
                    .col(Transactions::CustomerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_status")
                    .table(Transactions::Table)
                    .col(Transactions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_created_at")
                    .table(Transactions::Table)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    TransactionType,
    Status,
    Amount,
    Currency,
    CustomerId,
    PaymentMethodId,
    IdempotencyKey,
    RetryCount,
    Metadata,
    Error,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
    FailedAt,
}
