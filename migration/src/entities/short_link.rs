use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "short_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub short_code: String,
    pub owner_id: i64,
    #[sea_orm(column_type = "Text")]
    pub original_url: String,
    pub domain_label: Option<String>,
    pub click_count: i64,
    pub created_at: DateTimeUtc,
    /// Set on delete; the row stays so the code is never handed out again
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
