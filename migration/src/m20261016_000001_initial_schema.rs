//! Initial schema: owners, short_links, file_records

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Owners::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Owners::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Owners::DisplayName).string().null())
                    .col(ColumnDef::new(Owners::Handle).string().null())
                    .col(
                        ColumnDef::new(Owners::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Owners::IsBlocked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Owners::FilesCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Owners::LinksCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ShortLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortLinks::ShortCode)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShortLinks::OwnerId).big_integer().not_null())
                    .col(ColumnDef::new(ShortLinks::OriginalUrl).text().not_null())
                    .col(ColumnDef::new(ShortLinks::DomainLabel).string().null())
                    .col(
                        ColumnDef::new(ShortLinks::ClickCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ShortLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShortLinks::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_links_owner")
                    .table(ShortLinks::Table)
                    .col(ShortLinks::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FileRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FileRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FileRecords::FileRef)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(FileRecords::OwnerId).big_integer().not_null())
                    .col(ColumnDef::new(FileRecords::Name).text().not_null())
                    .col(ColumnDef::new(FileRecords::SizeBytes).big_integer().not_null())
                    .col(
                        ColumnDef::new(FileRecords::MediaType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FileRecords::SourceChatId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FileRecords::SourceMessageId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FileRecords::MirrorChatId).big_integer().null())
                    .col(
                        ColumnDef::new(FileRecords::MirrorMessageId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(FileRecords::DownloadCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(FileRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_file_records_file_ref")
                    .table(FileRecords::Table)
                    .col(FileRecords::FileRef)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // listByOwner: WHERE owner_id = ? ORDER BY created_at DESC
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_file_records_owner_created")
                    .table(FileRecords::Table)
                    .col(FileRecords::OwnerId)
                    .col(FileRecords::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_file_records_owner_created").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_file_records_file_ref").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FileRecords::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_short_links_owner").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ShortLinks::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Owners::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Owners {
    Table,
    Id,
    DisplayName,
    Handle,
    JoinedAt,
    IsBlocked,
    FilesCount,
    LinksCount,
}

#[derive(DeriveIden)]
enum ShortLinks {
    Table,
    ShortCode,
    OwnerId,
    OriginalUrl,
    DomainLabel,
    ClickCount,
    CreatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum FileRecords {
    Table,
    Id,
    FileRef,
    OwnerId,
    Name,
    SizeBytes,
    MediaType,
    SourceChatId,
    SourceMessageId,
    MirrorChatId,
    MirrorMessageId,
    DownloadCount,
    CreatedAt,
}
