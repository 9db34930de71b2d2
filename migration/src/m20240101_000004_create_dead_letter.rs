use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeadLetter::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DeadLetter::TransactionId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(DeadLetter::Error).json().not_null())
                    .col(ColumnDef::new(DeadLetter::EnqueuedAt).timestamp().not_null().extra("DEFAULT CURRENT_TIMESTAMP".to_string()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_dead_letter_transaction_id")
                            .from(DeadLetter::Table, DeadLetter::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeadLetter::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeadLetter {
    Table,
    TransactionId,
    Error,
    EnqueuedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
}
