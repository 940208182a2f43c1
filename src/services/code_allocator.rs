//! Short code allocation
//!
//! Candidates are drawn at random and checked against the registry. After
//! `max_attempts` collisions at one length the allocator moves on to codes
//! one character longer, so a crowded tier cannot stall allocation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ShortenerConfig;
use crate::errors::{LinkRelayError, Result};
use crate::utils::{MAX_CODE_LENGTH, generate_random_code};

/// Shortest code the allocator hands out
pub const MIN_CODE_LENGTH: usize = 6;

/// Existence check the allocator runs before returning a code
#[async_trait]
pub trait CodeRegistry: Send + Sync {
    /// True if the code was ever issued, deleted links included
    async fn code_exists(&self, code: &str) -> Result<bool>;
}

pub struct CodeAllocator {
    registry: Arc<dyn CodeRegistry>,
    max_attempts: u32,
}

impl CodeAllocator {
    pub fn new(registry: Arc<dyn CodeRegistry>, config: &ShortenerConfig) -> Self {
        Self {
            registry,
            max_attempts: config.max_attempts.max(1),
        }
    }

    /// Return a code of at least `desired_length` characters that the registry does not know
    pub async fn allocate(&self, desired_length: usize) -> Result<String> {
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&desired_length) {
            return Err(LinkRelayError::validation(format!(
                "code length must be within {}..={}, got {}",
                MIN_CODE_LENGTH, MAX_CODE_LENGTH, desired_length
            )));
        }

        let mut length = desired_length;
        loop {
            for attempt in 1..=self.max_attempts {
                let candidate = generate_random_code(length);
                if !self.registry.code_exists(&candidate).await? {
                    if attempt > 1 || length > desired_length {
                        debug!(
                            "Allocated code {} (length {}) after {} attempts at this length",
                            candidate, length, attempt
                        );
                    }
                    return Ok(candidate);
                }
            }

            if length >= MAX_CODE_LENGTH {
                return Err(LinkRelayError::validation("short code space exhausted"));
            }
            warn!(
                "{} collisions at code length {}, growing to {}",
                self.max_attempts,
                length,
                length + 1
            );
            length += 1;
        }
    }
}
