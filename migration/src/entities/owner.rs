//! Owner entity: one row per chat user, with denormalized child counters

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "owners")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub display_name: Option<String>,
    pub handle: Option<String>,
    pub joined_at: DateTimeUtc,
    pub is_blocked: bool,
    /// Mirrors COUNT(file_records) for this owner; only changed inside the child write transaction
    pub files_count: i64,
    /// Mirrors COUNT(live short_links) for this owner
    pub links_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
