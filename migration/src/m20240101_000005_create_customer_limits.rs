use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CustomerLimits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CustomerLimits::Id).uuid().not_null().primary_key().extra("DEFAULT gen_random_uuid()".to_string()))
                    .col(ColumnDef::new(CustomerLimits::CustomerId).string().not_null())
                    .col(ColumnDef::new(CustomerLimits::Currency).char_len(3).not_null())
                    .col(ColumnDef::new(CustomerLimits::DailyLimit).decimal_len(18, 2).not_null())
                    .col(ColumnDef::new(CustomerLimits::PerTransactionLimit).decimal_len(18, 2).not_null())
                    .col(ColumnDef::new(CustomerLimits::CreatedAt).timestamp().not_null().extra("DEFAULT CURRENT_TIMESTAMP".to_string()))
                    .col(ColumnDef::new(CustomerLimits::UpdatedAt).timestamp().not_null().extra("DEFAULT CURRENT_TIMESTAMP".to_string()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_customer_limits_customer_currency")
                    .table(CustomerLimits::Table)
                    .col(CustomerLimits::CustomerId)
                    .col(CustomerLimits::Currency)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CustomerLimits::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CustomerLimits {
    Table,
    Id,
    CustomerId,
    Currency,
    DailyLimit,
    PerTransactionLimit,
    CreatedAt,
    UpdatedAt,
}
