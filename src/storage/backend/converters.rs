use crate::storage::models::{FileRecord, MediaType, NewFileRecord, Owner, ShortLink};
use crate::transport::MessageRef;
use migration::entities::{file_record, owner, short_link};

/// 将 Sea-ORM Model 转换为 ShortLink
pub fn model_to_shortlink(model: short_link::Model) -> ShortLink {
    ShortLink {
        code: model.short_code,
        owner_id: model.owner_id,
        original_url: model.original_url,
        domain_label: model.domain_label,
        click_count: model.click_count.max(0) as u64,
        created_at: model.created_at,
    }
}

pub fn model_to_file_record(model: file_record::Model) -> FileRecord {
    let mirror = match (model.mirror_chat_id, model.mirror_message_id) {
        (Some(chat), Some(message)) => Some(MessageRef::new(chat, message)),
        _ => None,
    };

    FileRecord {
        id: model.id,
        file_ref: model.file_ref,
        owner_id: model.owner_id,
        name: model.name,
        size_bytes: model.size_bytes.max(0) as u64,
        // 未知分类按普通文件处理，不让一条脏数据挡住整个列表
        media_type: model.media_type.parse().unwrap_or_default(),
        source: MessageRef::new(model.source_chat_id, model.source_message_id),
        mirror,
        download_count: model.download_count.max(0) as u64,
        created_at: model.created_at,
    }
}

pub fn model_to_owner(model: owner::Model) -> Owner {
    Owner {
        id: model.id,
        display_name: model.display_name,
        handle: model.handle,
        joined_at: model.joined_at,
        is_blocked: model.is_blocked,
        files_count: model.files_count.max(0) as u64,
        links_count: model.links_count.max(0) as u64,
    }
}

/// 将 NewFileRecord 转换为 ActiveModel（id 由数据库分配）
pub fn new_file_to_active_model(
    record: &NewFileRecord,
    created_at: chrono::DateTime<chrono::Utc>,
) -> file_record::ActiveModel {
    use sea_orm::ActiveValue::*;

    file_record::ActiveModel {
        id: NotSet,
        file_ref: Set(record.file_ref.clone()),
        owner_id: Set(record.owner_id),
        name: Set(record.name.clone()),
        size_bytes: Set(record.size_bytes as i64),
        media_type: Set(record.media_type.to_string()),
        source_chat_id: Set(record.source.chat.0),
        source_message_id: Set(record.source.message.0),
        mirror_chat_id: Set(None),
        mirror_message_id: Set(None),
        download_count: Set(0),
        created_at: Set(created_at),
    }
}
