//! Миграция: создание таблицы servers.

use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_create_servers"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Servers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Servers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Servers::Region).string().not_null())
                    .col(ColumnDef::new(Servers::City).string().not_null())
                    .col(
                        ColumnDef::new(Servers::Url)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Servers::Status)
                            .string()
                            .not_null()
                            .default("UNKNOWN"),
                    )
                    .col(
                        ColumnDef::new(Servers::Load)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Servers::LastPingAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Servers::LastLatencyMs).double().null())
                    .col(
                        ColumnDef::new(Servers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Servers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Выборка активных узлов идёт по статусу
        manager
            .create_index(
                Index::create()
                    .table(Servers::Table)
                    .col(Servers::Status)
                    .name("idx_servers_status")
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Servers::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Servers {
    Table,
    Id,
    Region,
    City,
    Url,
    Status,
    Load,
    LastPingAt,
    LastLatencyMs,
    CreatedAt,
    UpdatedAt,
}
