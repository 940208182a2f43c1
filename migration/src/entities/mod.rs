pub mod file_record;
pub mod owner;
pub mod short_link;

pub use file_record::Entity as FileRecordEntity;
pub use owner::Entity as OwnerEntity;
pub use short_link::Entity as ShortLinkEntity;
