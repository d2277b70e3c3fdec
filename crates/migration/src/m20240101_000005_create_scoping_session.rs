//! Create `scoping_session` table.
//!
//! Tracks one intake conversation from first contact through delivery.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScopingSession::Table)
                    .if_not_exists()
                    .col(uuid(ScopingSession::Id).primary_key())
                    .col(string_len(ScopingSession::SessionId, 128).unique_key().not_null())
                    .col(string_len(ScopingSession::Status, 16).not_null())
                    .col(text_null(ScopingSession::BriefData))
                    .col(string_len_null(ScopingSession::Email, 255))
                    .col(string_len_null(ScopingSession::UserId, 64))
                    .col(text_null(ScopingSession::RejectionReason))
                    .col(uuid_null(ScopingSession::TicketId))
                    .col(text_null(ScopingSession::RepoUrl))
                    .col(text_null(ScopingSession::DeployUrl))
                    .col(string_len_null(ScopingSession::SiteId, 64))
                    .col(timestamp_with_time_zone(ScopingSession::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ScopingSession::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ScopingSession::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ScopingSession {
    Table,
    Id,
    SessionId,
    Status,
    BriefData,
    Email,
    UserId,
    RejectionReason,
    TicketId,
    RepoUrl,
    DeployUrl,
    SiteId,
    CreatedAt,
    UpdatedAt,
}
