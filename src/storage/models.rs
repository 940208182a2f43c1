use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

use crate::transport::MessageRef;

/// 短链接记录（只包含未删除的链接）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    pub code: String,
    pub owner_id: i64,
    pub original_url: String,
    pub domain_label: Option<String>,
    pub click_count: u64,
    pub created_at: DateTime<Utc>,
}

/// 文件分类
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, AsRefStr, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    #[default]
    File,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "ogg", "wma", "m4a"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "rtf", "odt"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz"];

impl MediaType {
    /// 按扩展名分类，未知或无扩展名时为 `File`
    pub fn from_file_name(name: &str) -> Self {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return MediaType::File;
        };
        let ext = ext.to_ascii_lowercase();
        let ext = ext.as_str();

        if IMAGE_EXTENSIONS.contains(&ext) {
            MediaType::Image
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            MediaType::Video
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            MediaType::Audio
        } else if DOCUMENT_EXTENSIONS.contains(&ext) {
            MediaType::Document
        } else if ARCHIVE_EXTENSIONS.contains(&ext) {
            MediaType::Archive
        } else {
            MediaType::File
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "document" => Ok(Self::Document),
            "archive" => Ok(Self::Archive),
            "file" => Ok(Self::File),
            _ => Err(format!(
                "Invalid media type: '{}'. Valid: image, video, audio, document, archive, file",
                s
            )),
        }
    }
}

/// 目录中的一条文件记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub file_ref: String,
    pub owner_id: i64,
    pub name: String,
    pub size_bytes: u64,
    pub media_type: MediaType,
    pub source: MessageRef,
    pub mirror: Option<MessageRef>,
    pub download_count: u64,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Where a relay should copy from: the mirror when one exists, the original message otherwise
    pub fn relay_source(&self) -> MessageRef {
        self.mirror.unwrap_or(self.source)
    }
}

/// 待插入的文件记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileRecord {
    pub file_ref: String,
    pub owner_id: i64,
    pub name: String,
    pub size_bytes: u64,
    pub media_type: MediaType,
    pub source: MessageRef,
}

/// 用户资料（注册 / 更新时使用，不含计数器）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub id: i64,
    pub display_name: Option<String>,
    pub handle: Option<String>,
}

impl OwnerProfile {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub display_name: Option<String>,
    pub handle: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub is_blocked: bool,
    pub files_count: u64,
    pub links_count: u64,
}

/// 单个用户的链接统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    pub links: u64,
    pub clicks: u64,
}

/// 全局统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub owners: u64,
    pub links: u64,
    pub files: u64,
    pub clicks: u64,
    pub stored_bytes: u64,
}
