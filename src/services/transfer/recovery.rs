//! Rate-limit recovery
//!
//! The wait carried by [`TransportError::RateLimited`] is authoritative: the
//! caller sleeps exactly that long and re-issues the whole call. There is no
//! retry cap. Every other error is handed back unchanged.

use std::future::Future;

use tracing::{debug, warn};

use crate::transport::TransportError;

/// Run `call` until it returns something other than `RateLimited`
///
/// `call` receives the 1-based attempt number.
pub async fn retry_rate_limited<T, F, Fut>(label: &str, mut call: F) -> Result<T, TransportError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt = 1u32;
    loop {
        match call(attempt).await {
            Err(TransportError::RateLimited { retry_after }) => {
                warn!(
                    "{}: rate limited on attempt {}, re-issuing in {:.1}s",
                    label,
                    attempt,
                    retry_after.as_secs_f64()
                );
                tokio::time::sleep(retry_after).await;
                attempt = attempt.saturating_add(1);
            }
            outcome => {
                if attempt > 1 {
                    debug!("{}: finished on attempt {}", label, attempt);
                }
                return outcome;
            }
        }
    }
}
