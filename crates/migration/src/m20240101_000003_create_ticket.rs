//! Create `ticket` table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ticket::Table)
                    .if_not_exists()
                    .col(uuid(Ticket::Id).primary_key())
                    .col(string_len(Ticket::SiteId, 64).not_null())
                    .col(string_len(Ticket::Title, 255).not_null())
                    .col(text(Ticket::Description).not_null())
                    .col(string_len(Ticket::Kind, 32).not_null())
                    .col(string_len(Ticket::Priority, 16).not_null())
                    .col(string_len(Ticket::Status, 16).not_null())
                    .col(text_null(Ticket::PageUrl))
                    .col(text_null(Ticket::Screenshot))
                    .col(text_null(Ticket::Metadata))
                    .col(string_len(Ticket::ClientToken, 64).not_null())
                    .col(timestamp_with_time_zone(Ticket::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Ticket::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Ticket::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Ticket {
    Table,
    Id,
    SiteId,
    Title,
    Description,
    Kind,
    Priority,
    Status,
    PageUrl,
    Screenshot,
    Metadata,
    ClientToken,
    CreatedAt,
    UpdatedAt,
}
