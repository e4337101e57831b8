//! Back-off retry for idempotent backend reads.
//!
//! Only lookups and draft loads go through [`retry_with_backoff`]. Field
//! updates and saves are sent once; a late retry could overwrite a newer edit.

use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;

const MAX_DELAY_MS: u64 = 10_000;

/// Timeouts, connection failures and 5xx answers. Everything else fails the
/// same way on a second try.
pub(crate) fn is_retriable(err: &ApiError) -> bool {
    match err {
        ApiError::Http(e) if e.is_timeout() || e.is_connect() => true,
        ApiError::Http(e) => e.status().is_some_and(|s| s.is_server_error()),
        ApiError::Rejected { status, .. } => (500..600).contains(status),
        ApiError::SaveNotAccepted(_)
        | ApiError::Deserialize { .. }
        | ApiError::InvalidBaseUrl { .. } => false,
    }
}

/// Delay before the `retry`-th retry (1-based).
///
/// Doubles from `base_ms` and stops growing at [`MAX_DELAY_MS`]. `jitter` is a
/// factor in `[0, 1)` that spreads the result over 75% to 125% of the nominal
/// delay.
fn backoff_delay(base_ms: u64, retry: u32, jitter: f64) -> Duration {
    let exponent = retry.saturating_sub(1).min(16);
    let nominal = base_ms.saturating_mul(1 << exponent).min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let millis = (nominal as f64 * (0.75 + jitter.clamp(0.0, 1.0) * 0.5)).round() as u64;
    Duration::from_millis(millis)
}

/// Runs `operation`, retrying retriable failures up to `max_retries` times.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut retry = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if retry == max_retries || !is_retriable(&err) {
            return Err(err);
        }
        retry += 1;

        let delay = backoff_delay(backoff_base_ms, retry, rand::random::<f64>());
        tracing::warn!(
            operation = operation_name,
            retry,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "backend read failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
