//! Create `message` table (chat relay between a site and the agent).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Message::Table)
                    .if_not_exists()
                    .col(uuid(Message::Id).primary_key())
                    .col(string_len(Message::SiteId, 64).not_null())
                    .col(string_len(Message::Role, 16).not_null())
                    .col(string_len(Message::Content, 2048).not_null())
                    .col(string_len(Message::Status, 16).not_null())
                    .col(text_null(Message::Metadata))
                    .col(timestamp_with_time_zone(Message::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Message::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Message {
    Table,
    Id,
    SiteId,
    Role,
    Content,
    Status,
    Metadata,
    CreatedAt,
}
