//! Catalog entity for relayed files

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "file_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Opaque transport identifier, unique across the catalog
    #[sea_orm(unique)]
    pub file_ref: String,
    pub owner_id: i64,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    pub size_bytes: i64,
    pub media_type: String,
    pub source_chat_id: i64,
    pub source_message_id: i64,
    pub mirror_chat_id: Option<i64>,
    pub mirror_message_id: Option<i64>,
    pub download_count: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
