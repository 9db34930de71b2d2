pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_transactions;
mod m20240101_000002_create_events;
mod m20240101_000003_create_locks;
mod m20240101_000004_create_dead_letter;
mod m20240101_000005_create_customer_limits;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_transactions::Migration),
            Box::new(m20240101_000002_create_events::Migration),
            Box::new(m20240101_000003_create_locks::Migration),
            Box::new(m20240101_000004_create_dead_letter::Migration),
            Box::new(m20240101_000005_create_customer_limits::Migration),
        ]
    }
}
