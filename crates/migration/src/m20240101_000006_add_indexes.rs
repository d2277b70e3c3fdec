use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Message: index on site_id for per-site listing
        manager
            .create_index(
                Index::create()
                    .name("idx_message_site")
                    .table(Message::Table)
                    .col(Message::SiteId)
                    .to_owned(),
            )
            .await?;

        // Message: index on status for the agent pending queue
        manager
            .create_index(
                Index::create()
                    .name("idx_message_status")
                    .table(Message::Table)
                    .col(Message::Status)
                    .to_owned(),
            )
            .await?;

        // Ticket: index on site_id and on status
        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_site")
                    .table(Ticket::Table)
                    .col(Ticket::SiteId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_status")
                    .table(Ticket::Table)
                    .col(Ticket::Status)
                    .to_owned(),
            )
            .await?;

        // ScopingSession: index on status and on user_id for dashboard lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_session_status")
                    .table(ScopingSession::Table)
                    .col(ScopingSession::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_session_user")
                    .table(ScopingSession::Table)
                    .col(ScopingSession::UserId)
                    .to_owned(),
            )
            .await?;

        // ScopeUser: index on login_token for magic-link redemption
        manager
            .create_index(
                Index::create()
                    .name("idx_scope_user_token")
                    .table(ScopeUser::Table)
                    .col(ScopeUser::LoginToken)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_message_site").table(Message::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_message_status").table(Message::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_ticket_site").table(Ticket::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_ticket_status").table(Ticket::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_session_status").table(ScopingSession::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_session_user").table(ScopingSession::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_scope_user_token").table(ScopeUser::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Message { Table, SiteId, Status }

#[derive(DeriveIden)]
enum Ticket { Table, SiteId, Status }

#[derive(DeriveIden)]
enum ScopingSession { Table, Status, UserId }

#[derive(DeriveIden)]
enum ScopeUser { Table, LoginToken }
