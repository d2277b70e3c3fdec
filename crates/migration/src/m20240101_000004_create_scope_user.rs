//! Create `scope_user` table.
//!
//! One row per email seen by the scoping intake. `login_token` holds the
//! current magic-link grant; at most one live grant per email.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScopeUser::Table)
                    .if_not_exists()
                    .col(uuid(ScopeUser::Id).primary_key())
                    .col(string_len(ScopeUser::Email, 255).unique_key().not_null())
                    .col(string_len_null(ScopeUser::LoginToken, 64))
                    .col(timestamp_with_time_zone_null(ScopeUser::TokenExpiresAt))
                    .col(timestamp_with_time_zone(ScopeUser::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ScopeUser::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ScopeUser {
    Table,
    Id,
    Email,
    LoginToken,
    TokenExpiresAt,
    CreatedAt,
}
