//! Link management service
//!
//! Shortening pipeline: normalize, validate, allocate a code, persist, then
//! compose the public short URL from the configured redirect domain.

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use super::code_allocator::{CodeAllocator, CodeRegistry};
use crate::access::Requester;
use crate::config::ShortenerConfig;
use crate::errors::{LinkRelayError, Result};
use crate::storage::{LinkStats, SeaOrmStorage, ShortLink};
use crate::utils::is_valid_short_code;
use crate::utils::url_validator::{self, normalize_and_validate};

/// Insert races tolerated before giving up on one shorten request
const MAX_INSERT_RACES: usize = 8;

/// Largest page `list_by_owner` returns
pub const MAX_LIST_LIMIT: u64 = 100;

/// A freshly created short link and its public form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenResult {
    pub link: ShortLink,
    pub short_url: String,
}

/// Service for link management operations
pub struct LinkService {
    storage: Arc<SeaOrmStorage>,
    allocator: CodeAllocator,
    config: ShortenerConfig,
}

impl LinkService {
    pub fn new(storage: Arc<SeaOrmStorage>, config: &ShortenerConfig) -> Self {
        let registry: Arc<dyn CodeRegistry> = storage.clone();
        Self {
            allocator: CodeAllocator::new(registry, config),
            storage,
            config: config.clone(),
        }
    }

    /// `{base_url}/{code}`
    pub fn compose_short_url(&self, code: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), code)
    }

    fn domain_label(&self) -> Option<String> {
        Url::parse(&self.config.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    /// Create a short link owned by `owner_id`
    pub async fn shorten(&self, owner_id: i64, raw_url: &str) -> Result<ShortenResult> {
        let original_url = normalize_and_validate(raw_url).map_err(|e| {
            LinkRelayError::validation(format!(
                "{}: {}",
                url_validator::validation_error_message(&e),
                e
            ))
        })?;
        let domain_label = self.domain_label();

        for _ in 0..MAX_INSERT_RACES {
            let code = self.allocator.allocate(self.config.code_length).await?;
            match self
                .storage
                .insert_link(owner_id, &code, &original_url, domain_label.as_deref())
                .await?
            {
                Some(link) => {
                    let short_url = self.compose_short_url(&link.code);
                    info!("LinkService: {} -> {}", short_url, link.original_url);
                    return Ok(ShortenResult { link, short_url });
                }
                None => warn!("LinkService: code {} lost an insert race, reallocating", code),
            }
        }

        Err(LinkRelayError::database_operation(format!(
            "could not persist a short link after {} allocation races",
            MAX_INSERT_RACES
        )))
    }

    /// Shorten every http(s) URL found in `text`, in order of appearance
    pub async fn shorten_text(&self, owner_id: i64, text: &str) -> Result<Vec<ShortenResult>> {
        let mut results = Vec::new();
        for url in self.extract_urls(text) {
            results.push(self.shorten(owner_id, &url).await?);
        }
        Ok(results)
    }

    pub fn extract_urls(&self, text: &str) -> Vec<String> {
        url_validator::extract_urls(text)
    }

    /// Resolve a code to its link, counting one click
    pub async fn resolve(&self, code: &str) -> Result<ShortLink> {
        if !is_valid_short_code(code) {
            return Err(LinkRelayError::not_found(format!("短链接不存在: {}", code)));
        }
        self.storage.resolve_link(code).await
    }

    /// Look a link up without counting a click
    pub async fn get(&self, code: &str) -> Result<Option<ShortLink>> {
        if !is_valid_short_code(code) {
            return Ok(None);
        }
        self.storage.get_link(code).await
    }

    pub async fn delete(&self, code: &str, requester: &Requester) -> Result<()> {
        if !is_valid_short_code(code) {
            return Err(LinkRelayError::not_found(format!("短链接不存在: {}", code)));
        }
        self.storage.delete_link(code, requester).await
    }

    /// Most recent links first; `limit` is clamped to 1..=100
    pub async fn list_by_owner(&self, owner_id: i64, limit: u64) -> Result<Vec<ShortLink>> {
        self.storage
            .list_links_by_owner(owner_id, limit.clamp(1, MAX_LIST_LIMIT))
            .await
    }

    pub async fn owner_stats(&self, owner_id: i64) -> Result<LinkStats> {
        self.storage.owner_link_stats(owner_id).await
    }
}
