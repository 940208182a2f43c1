use sea_orm::{ColumnTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QuerySelect};

use super::{SeaOrmStorage, retry};
use crate::errors::Result;
use crate::storage::models::Stats;

use migration::entities::{file_record, owner, short_link};

#[derive(Debug, FromQueryResult)]
struct LinkTotals {
    links: i64,
    clicks: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct FileTotals {
    files: i64,
    bytes: Option<i64>,
}

impl SeaOrmStorage {
    /// 全局统计（SeaORM DSL 聚合查询）
    pub async fn stats(&self) -> Result<Stats> {
        let db = &self.db;

        let owners = retry::with_retry("stats(owners)", self.retry_config, || async {
            owner::Entity::find().count(db).await
        })
        .await?;

        let links = retry::with_retry("stats(links)", self.retry_config, || async {
            short_link::Entity::find()
                .select_only()
                .column_as(short_link::Column::ShortCode.count(), "links")
                .column_as(short_link::Column::ClickCount.sum(), "clicks")
                .filter(short_link::Column::DeletedAt.is_null())
                .into_model::<LinkTotals>()
                .one(db)
                .await
        })
        .await?;

        let files = retry::with_retry("stats(files)", self.retry_config, || async {
            file_record::Entity::find()
                .select_only()
                .column_as(file_record::Column::Id.count(), "files")
                .column_as(file_record::Column::SizeBytes.sum(), "bytes")
                .into_model::<FileTotals>()
                .one(db)
                .await
        })
        .await?;

        let (links, clicks) = links
            .map(|t| (t.links.max(0) as u64, t.clicks.unwrap_or(0).max(0) as u64))
            .unwrap_or_default();
        let (files, stored_bytes) = files
            .map(|t| (t.files.max(0) as u64, t.bytes.unwrap_or(0).max(0) as u64))
            .unwrap_or_default();

        Ok(Stats {
            owners,
            links,
            files,
            clicks,
            stored_bytes,
        })
    }
}
