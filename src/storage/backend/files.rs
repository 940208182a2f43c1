//! File catalog operations for SeaOrmStorage

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ExprTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use tracing::info;

use super::converters::{model_to_file_record, new_file_to_active_model};
use super::owners::{adjust_counter, ensure_owner_row};
use super::{SeaOrmStorage, is_unique_violation, retry};
use crate::access::Requester;
use crate::errors::{LinkRelayError, Result};
use crate::services::FileCatalog;
use crate::storage::models::{FileRecord, NewFileRecord};
use crate::transport::MessageRef;

use migration::entities::{file_record, owner};

enum DeleteOutcome {
    Deleted(Box<file_record::Model>),
    Missing,
    Denied(i64),
}

impl SeaOrmStorage {
    /// 写入文件记录并递增 owner 的 files_count（同一事务）
    pub async fn insert_file(&self, record: &NewFileRecord) -> Result<FileRecord> {
        let db = &self.db;
        let created_at = Utc::now();

        let result = retry::with_retry(&format!("insert_file({})", record.file_ref), self.retry_config, || async move {
            let txn = db.begin().await?;

            ensure_owner_row(&txn, record.owner_id, created_at).await?;
            let model = new_file_to_active_model(record, created_at).insert(&txn).await?;
            adjust_counter(&txn, record.owner_id, owner::Column::FilesCount, 1).await?;

            txn.commit().await?;
            Ok(model)
        })
        .await;

        match result {
            Ok(model) => {
                info!(
                    "File cataloged: {} '{}' ({} bytes, owner {})",
                    model.file_ref, model.name, model.size_bytes, model.owner_id
                );
                Ok(model_to_file_record(model))
            }
            Err(e) if is_unique_violation(&e) => Err(LinkRelayError::validation(format!(
                "文件已存在: {}",
                record.file_ref
            ))),
            Err(e) => Err(LinkRelayError::database_operation(format!(
                "写入文件记录失败: {}",
                e
            ))),
        }
    }

    pub async fn find_file(&self, file_ref: &str) -> Result<Option<FileRecord>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("find_file({})", file_ref), self.retry_config, || async move {
            file_record::Entity::find()
                .filter(file_record::Column::FileRef.eq(file_ref))
                .one(db)
                .await
        })
        .await?;

        Ok(model.map(model_to_file_record))
    }

    /// 用户最近的文件，最新的在前，最多 `limit` 条
    pub async fn list_files_by_owner(&self, owner_id: i64, limit: u64) -> Result<Vec<FileRecord>> {
        let db = &self.db;
        let models = retry::with_retry(&format!("list_files({})", owner_id), self.retry_config, || async {
            file_record::Entity::find()
                .filter(file_record::Column::OwnerId.eq(owner_id))
                .order_by_desc(file_record::Column::CreatedAt)
                .order_by_desc(file_record::Column::Id)
                .limit(limit)
                .all(db)
                .await
        })
        .await?;

        Ok(models.into_iter().map(model_to_file_record).collect())
    }

    /// 删除目录行并递减 files_count；已经发出的副本不受影响
    pub async fn delete_file(&self, file_ref: &str, requester: &Requester) -> Result<FileRecord> {
        let db = &self.db;
        let requester = *requester;

        let outcome = retry::with_retry(&format!("delete_file({})", file_ref), self.retry_config, || async move {
            let txn = db.begin().await?;

            let Some(model) = file_record::Entity::find()
                .filter(file_record::Column::FileRef.eq(file_ref))
                .one(&txn)
                .await?
            else {
                return Ok(DeleteOutcome::Missing);
            };

            if !requester.may_manage(model.owner_id) {
                return Ok(DeleteOutcome::Denied(model.owner_id));
            }

            let deleted = file_record::Entity::delete_by_id(model.id).exec(&txn).await?;
            if deleted.rows_affected == 0 {
                return Ok(DeleteOutcome::Missing);
            }

            adjust_counter(&txn, model.owner_id, owner::Column::FilesCount, -1).await?;
            txn.commit().await?;
            Ok(DeleteOutcome::Deleted(Box::new(model)))
        })
        .await?;

        match outcome {
            DeleteOutcome::Deleted(model) => {
                info!("File deleted: {} (owner {}, by {})", file_ref, model.owner_id, requester.id);
                Ok(model_to_file_record(*model))
            }
            DeleteOutcome::Missing => {
                Err(LinkRelayError::not_found(format!("文件不存在: {}", file_ref)))
            }
            DeleteOutcome::Denied(owner_id) => Err(LinkRelayError::permission_denied(format!(
                "用户 {} 无权删除 {} 的文件 {}",
                requester.id, owner_id, file_ref
            ))),
        }
    }

    pub async fn attach_mirror(&self, file_ref: &str, mirror: MessageRef) -> Result<()> {
        let db = &self.db;
        let result = retry::with_retry(&format!("attach_mirror({})", file_ref), self.retry_config, || async move {
            file_record::Entity::update_many()
                .col_expr(file_record::Column::MirrorChatId, Expr::value(Some(mirror.chat.0)))
                .col_expr(
                    file_record::Column::MirrorMessageId,
                    Expr::value(Some(mirror.message.0)),
                )
                .filter(file_record::Column::FileRef.eq(file_ref))
                .exec(db)
                .await
        })
        .await?;

        if result.rows_affected == 0 {
            return Err(LinkRelayError::not_found(format!("文件不存在: {}", file_ref)));
        }
        Ok(())
    }

    /// 原地递增 download_count
    pub async fn increment_download(&self, file_ref: &str) -> Result<()> {
        let db = &self.db;
        let result = retry::with_retry(&format!("increment_download({})", file_ref), self.retry_config, || async move {
            file_record::Entity::update_many()
                .col_expr(
                    file_record::Column::DownloadCount,
                    Expr::col(file_record::Column::DownloadCount).add(1),
                )
                .filter(file_record::Column::FileRef.eq(file_ref))
                .exec(db)
                .await
        })
        .await?;

        if result.rows_affected == 0 {
            return Err(LinkRelayError::not_found(format!("文件不存在: {}", file_ref)));
        }
        Ok(())
    }
}

#[async_trait]
impl FileCatalog for SeaOrmStorage {
    async fn insert_file(&self, record: &NewFileRecord) -> Result<FileRecord> {
        SeaOrmStorage::insert_file(self, record).await
    }

    async fn attach_mirror(&self, file_ref: &str, mirror: MessageRef) -> Result<()> {
        SeaOrmStorage::attach_mirror(self, file_ref, mirror).await
    }
}
