//! Link registry operations for SeaOrmStorage
//!
//! Deleted links keep their row (`deleted_at` set) so their code stays taken.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, ExprTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{debug, info};

use super::converters::model_to_shortlink;
use super::owners::{adjust_counter, ensure_owner_row};
use super::{SeaOrmStorage, is_unique_violation, retry};
use crate::access::Requester;
use crate::errors::{LinkRelayError, Result};
use crate::services::CodeRegistry;
use crate::storage::models::{LinkStats, ShortLink};

use migration::entities::{owner, short_link};

#[derive(Debug, FromQueryResult)]
struct OwnerLinkStatsResult {
    links: i64,
    clicks: Option<i64>,
}

/// 删除事务的结果；权限判断在事务内完成
enum DeleteOutcome {
    Deleted(i64),
    Missing,
    Denied(i64),
}

impl SeaOrmStorage {
    /// 写入新链接并递增 owner 的 links_count（同一事务）
    ///
    /// `Ok(None)` 表示 code 已被占用（包括已删除的链接），调用方应重新分配。
    pub async fn insert_link(
        &self,
        owner_id: i64,
        code: &str,
        original_url: &str,
        domain_label: Option<&str>,
    ) -> Result<Option<ShortLink>> {
        let db = &self.db;
        let created_at = Utc::now();

        let result = retry::with_retry(&format!("insert_link({})", code), self.retry_config, || async move {
            let txn = db.begin().await?;

            ensure_owner_row(&txn, owner_id, created_at).await?;

            let model = short_link::ActiveModel {
                short_code: Set(code.to_string()),
                owner_id: Set(owner_id),
                original_url: Set(original_url.to_string()),
                domain_label: Set(domain_label.map(str::to_string)),
                click_count: Set(0),
                created_at: Set(created_at),
                deleted_at: Set(None),
            };
            short_link::Entity::insert(model).exec_without_returning(&txn).await?;

            adjust_counter(&txn, owner_id, owner::Column::LinksCount, 1).await?;
            txn.commit().await
        })
        .await;

        match result {
            Ok(()) => {
                info!("Short link created: {} -> {} (owner {})", code, original_url, owner_id);
                Ok(Some(ShortLink {
                    code: code.to_string(),
                    owner_id,
                    original_url: original_url.to_string(),
                    domain_label: domain_label.map(str::to_string),
                    click_count: 0,
                    created_at,
                }))
            }
            Err(e) if is_unique_violation(&e) => {
                debug!("Short code {} taken by a concurrent insert", code);
                Ok(None)
            }
            Err(e) => Err(LinkRelayError::database_operation(format!(
                "创建短链接失败: {}",
                e
            ))),
        }
    }

    /// 解析短码，并在同一事务内原地递增 click_count
    pub async fn resolve_link(&self, code: &str) -> Result<ShortLink> {
        let db = &self.db;

        let model = retry::with_retry(&format!("resolve({})", code), self.retry_config, || async move {
            let txn = db.begin().await?;

            let updated = short_link::Entity::update_many()
                .col_expr(
                    short_link::Column::ClickCount,
                    Expr::col(short_link::Column::ClickCount).add(1),
                )
                .filter(short_link::Column::ShortCode.eq(code))
                .filter(short_link::Column::DeletedAt.is_null())
                .exec(&txn)
                .await?;

            if updated.rows_affected == 0 {
                // 没有可更新的行，直接回滚
                return Ok(None);
            }

            let model = short_link::Entity::find_by_id(code.to_string()).one(&txn).await?;
            txn.commit().await?;
            Ok(model)
        })
        .await?;

        model
            .map(model_to_shortlink)
            .ok_or_else(|| LinkRelayError::not_found(format!("短链接不存在: {}", code)))
    }

    /// 只读查询，不计点击
    pub async fn get_link(&self, code: &str) -> Result<Option<ShortLink>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("get_link({})", code), self.retry_config, || async move {
            short_link::Entity::find_by_id(code.to_string())
                .filter(short_link::Column::DeletedAt.is_null())
                .one(db)
                .await
        })
        .await?;

        Ok(model.map(model_to_shortlink))
    }

    /// 软删除链接并递减 owner 的 links_count
    pub async fn delete_link(&self, code: &str, requester: &Requester) -> Result<()> {
        let db = &self.db;
        let requester = *requester;

        let outcome = retry::with_retry(&format!("delete_link({})", code), self.retry_config, || async move {
            let txn = db.begin().await?;

            // 已删除的行也参与权限判断，非所有者重复删除得到 PermissionDenied
            let Some(model) = short_link::Entity::find_by_id(code.to_string())
                .one(&txn)
                .await?
            else {
                return Ok(DeleteOutcome::Missing);
            };

            if !requester.may_manage(model.owner_id) {
                return Ok(DeleteOutcome::Denied(model.owner_id));
            }
            if model.deleted_at.is_some() {
                return Ok(DeleteOutcome::Missing);
            }

            let updated = short_link::Entity::update_many()
                .col_expr(short_link::Column::DeletedAt, Expr::value(Some(Utc::now())))
                .filter(short_link::Column::ShortCode.eq(code))
                .filter(short_link::Column::DeletedAt.is_null())
                .exec(&txn)
                .await?;
            if updated.rows_affected == 0 {
                return Ok(DeleteOutcome::Missing);
            }

            adjust_counter(&txn, model.owner_id, owner::Column::LinksCount, -1).await?;
            txn.commit().await?;
            Ok(DeleteOutcome::Deleted(model.owner_id))
        })
        .await?;

        match outcome {
            DeleteOutcome::Deleted(owner_id) => {
                info!("Short link deleted: {} (owner {}, by {})", code, owner_id, requester.id);
                Ok(())
            }
            DeleteOutcome::Missing => Err(LinkRelayError::not_found(format!(
                "短链接不存在: {}",
                code
            ))),
            DeleteOutcome::Denied(owner_id) => Err(LinkRelayError::permission_denied(format!(
                "用户 {} 无权删除 {} 的短链接 {}",
                requester.id, owner_id, code
            ))),
        }
    }

    /// 最近创建的在用链接，最新的在前
    pub async fn list_links_by_owner(&self, owner_id: i64, limit: u64) -> Result<Vec<ShortLink>> {
        let db = &self.db;
        let models = retry::with_retry(&format!("list_links({})", owner_id), self.retry_config, || async {
            short_link::Entity::find()
                .filter(short_link::Column::OwnerId.eq(owner_id))
                .filter(short_link::Column::DeletedAt.is_null())
                .order_by_desc(short_link::Column::CreatedAt)
                .order_by_desc(short_link::Column::ShortCode)
                .limit(limit)
                .all(db)
                .await
        })
        .await?;

        Ok(models.into_iter().map(model_to_shortlink).collect())
    }

    pub async fn owner_link_stats(&self, owner_id: i64) -> Result<LinkStats> {
        let db = &self.db;
        let stats = retry::with_retry(&format!("owner_link_stats({})", owner_id), self.retry_config, || async {
            short_link::Entity::find()
                .select_only()
                .column_as(short_link::Column::ShortCode.count(), "links")
                .column_as(short_link::Column::ClickCount.sum(), "clicks")
                .filter(short_link::Column::OwnerId.eq(owner_id))
                .filter(short_link::Column::DeletedAt.is_null())
                .into_model::<OwnerLinkStatsResult>()
                .one(db)
                .await
        })
        .await?;

        Ok(stats
            .map(|s| LinkStats {
                links: Ord::max(s.links, 0) as u64,
                clicks: Ord::max(s.clicks.unwrap_or(0), 0) as u64,
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl CodeRegistry for SeaOrmStorage {
    /// 包括已删除的链接：删除过的 code 永不复用
    async fn code_exists(&self, code: &str) -> Result<bool> {
        let db = &self.db;
        let found = retry::with_retry(&format!("code_exists({})", code), self.retry_config, || async move {
            short_link::Entity::find_by_id(code.to_string())
                .select_only()
                .column(short_link::Column::ShortCode)
                .into_tuple::<String>()
                .one(db)
                .await
        })
        .await?;

        Ok(found.is_some())
    }
}
