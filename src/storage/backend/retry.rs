//! 事务重试
//!
//! 重试的单位是一个完整的事务闭包（一次建链、一次点击、一次文件入库），
//! 闭包每次都从 `begin()` 重新开始，所以计数器不会被加两次。
//! 只有锁竞争和断线值得再来一次；唯一约束、owner 行缺失这类结果重跑也不会变。

use std::future::Future;
use std::time::Duration;

use sea_orm::DbErr;
use sea_orm::error::RuntimeErr;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// `adjust_counter` 找不到 owner 行时的错误前缀
const MISSING_OWNER: &str = "owner row missing";

/// SQLite BUSY/LOCKED/BUSY_SNAPSHOT, MySQL lock wait/deadlock, PostgreSQL serialization/deadlock
const CONTENDED_CODES: &[&str] = &["5", "6", "517", "1205", "1213", "40001", "40P01"];

/// Fallback when the driver gives no error code
const CONTENDED_MESSAGES: &[&str] = &[
    "database is locked",
    "database table is locked",
    "deadlock",
    "lock wait timeout",
    "could not serialize access",
];

/// How a failed storage unit should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Another writer holds the lock; the unit can run again
    Contended,
    /// The pool or the connection went away
    Disconnected,
    /// A counter update found no owner row and the transaction rolled back
    MissingOwner,
    /// Anything else, including constraint violations
    Permanent,
}

impl Failure {
    pub fn of(err: &DbErr) -> Self {
        match err {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Failure::Disconnected,
            DbErr::Exec(runtime) | DbErr::Query(runtime) if is_contended(runtime) => {
                Failure::Contended
            }
            DbErr::Custom(msg) if msg.starts_with(MISSING_OWNER) => Failure::MissingOwner,
            _ => Failure::Permanent,
        }
    }

    fn is_transient(self) -> bool {
        matches!(self, Failure::Contended | Failure::Disconnected)
    }
}

/// Error for a counter update that matched no owner row
pub(super) fn missing_owner(owner_id: i64) -> DbErr {
    DbErr::Custom(format!("{}: {}", MISSING_OWNER, owner_id))
}

fn is_contended(runtime: &RuntimeErr) -> bool {
    let message = match runtime {
        RuntimeErr::SqlxError(sqlx_err) => {
            if let Some(code) = sqlx_err.as_database_error().and_then(|db| db.code()) {
                let code: &str = &code;
                return CONTENDED_CODES.contains(&code);
            }
            sqlx_err.to_string()
        }
        RuntimeErr::Internal(msg) => msg.clone(),
        #[allow(unreachable_patterns)]
        _ => return false,
    };
    let message = message.to_lowercase();
    CONTENDED_MESSAGES.iter().any(|m| message.contains(m))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&DatabaseConfig::default())
    }
}

impl From<&DatabaseConfig> for RetryConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }
}

impl RetryConfig {
    /// Wait before retry `retry` (1-based): doubling from the base up to the cap, plus up to 25% jitter
    fn delay_for(&self, retry: u32) -> Duration {
        let doubled = self
            .base_delay_ms
            .saturating_mul(1u64 << retry.saturating_sub(1).min(32));
        let capped = doubled.min(self.max_delay_ms);
        Duration::from_millis(capped.saturating_add(rand::random_range(0..=capped / 4)))
    }
}

/// Run one storage unit, re-running it from scratch on transient failures
///
/// `label` names the unit in logs, e.g. `insert_file(<ref>)`.
pub async fn with_retry<T, F, Fut>(label: &str, config: RetryConfig, mut unit: F) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut retries = 0;
    loop {
        let err = match unit().await {
            Ok(value) => {
                if retries > 0 {
                    debug!("{}: committed after {} retries", label, retries);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        let failure = Failure::of(&err);
        if failure == Failure::MissingOwner {
            warn!("{}: rolled back, {}", label, err);
            return Err(err);
        }
        if !failure.is_transient() {
            return Err(err);
        }
        if retries >= config.max_retries {
            warn!("{}: still {:?} after {} retries: {}", label, failure, retries, err);
            return Err(err);
        }

        retries += 1;
        let delay = config.delay_for(retries);
        warn!(
            "{}: {:?} ({}/{}), retrying in {} ms: {}",
            label,
            failure,
            retries,
            config.max_retries,
            delay.as_millis(),
            err
        );
        sleep(delay).await;
    }
}
