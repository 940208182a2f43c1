//! Owner registry operations
//!
//! Counter columns are never written from here except through
//! [`adjust_counter`], which child writes call inside their own transaction.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ExprTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::model_to_owner;
use super::retry;
use crate::errors::{LinkRelayError, Result};
use crate::storage::models::{Owner, OwnerProfile};

use migration::entities::owner;

/// 确保 owner 行存在（已存在时不改动任何列）
pub(super) async fn ensure_owner_row<C: ConnectionTrait>(
    conn: &C,
    owner_id: i64,
    now: DateTime<Utc>,
) -> std::result::Result<(), DbErr> {
    let stmt = Query::insert()
        .into_table(owner::Entity)
        .columns([
            owner::Column::Id,
            owner::Column::JoinedAt,
            owner::Column::IsBlocked,
            owner::Column::FilesCount,
            owner::Column::LinksCount,
        ])
        .values([
            owner_id.into(),
            now.into(),
            false.into(),
            0i64.into(),
            0i64.into(),
        ])
        .map_err(|e| DbErr::Custom(e.to_string()))?
        // 冲突时把 id 写回自身，等价于 DO NOTHING 且三种后端都支持
        .on_conflict(
            OnConflict::column(owner::Column::Id)
                .update_column(owner::Column::Id)
                .to_owned(),
        )
        .to_owned();

    conn.execute(&stmt).await?;
    Ok(())
}

/// 原地增减计数器（`col = col + delta`），必须在子记录写入的同一事务里调用
pub(super) async fn adjust_counter<C: ConnectionTrait>(
    conn: &C,
    owner_id: i64,
    column: owner::Column,
    delta: i64,
) -> std::result::Result<(), DbErr> {
    let result = owner::Entity::update_many()
        .col_expr(column, Expr::col(column).add(delta))
        .filter(owner::Column::Id.eq(owner_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(retry::missing_owner(owner_id));
    }
    Ok(())
}

impl SeaOrmStorage {
    /// 注册或更新用户资料，不动计数器和封禁状态
    pub async fn register_owner(&self, profile: &OwnerProfile) -> Result<Owner> {
        let db = &self.db;
        let now = Utc::now();

        let stmt = Query::insert()
            .into_table(owner::Entity)
            .columns([
                owner::Column::Id,
                owner::Column::DisplayName,
                owner::Column::Handle,
                owner::Column::JoinedAt,
                owner::Column::IsBlocked,
                owner::Column::FilesCount,
                owner::Column::LinksCount,
            ])
            .values([
                profile.id.into(),
                profile.display_name.clone().into(),
                profile.handle.clone().into(),
                now.into(),
                false.into(),
                0i64.into(),
                0i64.into(),
            ])
            .map_err(|e| LinkRelayError::database_operation(format!("构建用户写入语句失败: {}", e)))?
            .on_conflict(
                OnConflict::column(owner::Column::Id)
                    .update_columns([owner::Column::DisplayName, owner::Column::Handle])
                    .to_owned(),
            )
            .to_owned();
        let stmt_ref = &stmt;

        retry::with_retry(&format!("register_owner({})", profile.id), self.retry_config, || async {
            db.execute(stmt_ref).await
        })
        .await
        .map_err(|e| LinkRelayError::database_operation(format!("写入用户失败: {}", e)))?;

        self.get_owner(profile.id)
            .await?
            .ok_or_else(|| LinkRelayError::database_operation(format!("用户 {} 写入后不可见", profile.id)))
    }

    pub async fn get_owner(&self, owner_id: i64) -> Result<Option<Owner>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("get_owner({})", owner_id), self.retry_config, || async {
            owner::Entity::find_by_id(owner_id).one(db).await
        })
        .await?;

        Ok(model.map(model_to_owner))
    }

    pub async fn set_blocked(&self, owner_id: i64, blocked: bool) -> Result<()> {
        let db = &self.db;
        let result = retry::with_retry(&format!("set_blocked({})", owner_id), self.retry_config, || async {
            owner::Entity::update_many()
                .col_expr(owner::Column::IsBlocked, Expr::value(blocked))
                .filter(owner::Column::Id.eq(owner_id))
                .exec(db)
                .await
        })
        .await?;

        if result.rows_affected == 0 {
            return Err(LinkRelayError::not_found(format!("用户不存在: {}", owner_id)));
        }

        info!("Owner {} blocked = {}", owner_id, blocked);
        Ok(())
    }

    /// 所有未封禁用户的 id（广播收件人）
    pub async fn list_active_owner_ids(&self) -> Result<Vec<i64>> {
        let db = &self.db;
        let ids = retry::with_retry("list_active_owner_ids", self.retry_config, || async {
            owner::Entity::find()
                .select_only()
                .column(owner::Column::Id)
                .filter(owner::Column::IsBlocked.eq(false))
                .order_by_asc(owner::Column::Id)
                .into_tuple::<i64>()
                .all(db)
                .await
        })
        .await?;

        Ok(ids)
    }
}
