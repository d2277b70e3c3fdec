//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_site;
mod m20240101_000002_create_message;
mod m20240101_000003_create_ticket;
mod m20240101_000004_create_scope_user;
mod m20240101_000005_create_scoping_session;
mod m20240101_000006_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_site::Migration),
            Box::new(m20240101_000002_create_message::Migration),
            Box::new(m20240101_000003_create_ticket::Migration),
            Box::new(m20240101_000004_create_scope_user::Migration),
            Box::new(m20240101_000005_create_scoping_session::Migration),
            // Indexes should always be applied last
            Box::new(m20240101_000006_add_indexes::Migration),
        ]
    }
}
