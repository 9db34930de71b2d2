use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Locks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Locks::Key).string().not_null().primary_key())
                    .col(ColumnDef::new(Locks::Token).string().not_null())
                    .col(ColumnDef::new(Locks::ExpiresAt).timestamp().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Locks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Locks {
    Table,
    Key,
    Token,
    ExpiresAt,
}
