//! Create `site` table.
//!
//! One row per authenticated client surface. The raw bearer token is never
//! stored; `token_hash` is the lookup key.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Site::Table)
                    .if_not_exists()
                    .col(uuid(Site::Id).primary_key())
                    .col(string_len(Site::SiteId, 64).unique_key().not_null())
                    .col(string_len(Site::Name, 128).not_null())
                    .col(string_len(Site::Domain, 255).not_null())
                    .col(string_len_null(Site::Repo, 255))
                    .col(string_len(Site::TokenHash, 64).unique_key().not_null())
                    .col(string_len(Site::ClientName, 128).not_null())
                    .col(string_len_null(Site::ClientEmail, 255))
                    .col(boolean(Site::Active).not_null())
                    .col(text_null(Site::SystemPrompt))
                    .col(timestamp_with_time_zone(Site::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Site::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Site {
    Table,
    Id,
    SiteId,
    Name,
    Domain,
    Repo,
    TokenHash,
    ClientName,
    ClientEmail,
    Active,
    SystemPrompt,
    CreatedAt,
}
