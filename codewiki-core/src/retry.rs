// Copyright 2025 Codewiki Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The single shared retry utility reused by the LLM adapter, the vector-store
//! adapter, and any other transient-remote call site: `retry(f, max_attempts,
//! is_retryable, delay_fn)`. Built on top of [`crate::resilience::RetryPolicy`]'s
//! exponential-with-jitter backoff, capped at 30 seconds.

use std::future::Future;
use std::time::Duration;

use crate::resilience::RetryPolicy;

/// Runs `f` up to `max_attempts` times. `is_retryable` decides whether a given error is
/// worth retrying at all; `delay_fn` computes the backoff before the next attempt
/// (0-indexed by attempt number already made).
pub async fn retry<F, Fut, T, E>(
    mut f: F,
    max_attempts: u32,
    is_retryable: impl Fn(&E) -> bool,
    delay_fn: impl Fn(u32) -> Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_err = None;
    for attempt in 0..max_attempts.max(1) {
        if attempt > 0 {
            tokio::time::sleep(delay_fn(attempt - 1)).await;
        }
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if !is_retryable(&e) {
                    return Err(e);
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.expect("max_attempts >= 1 guarantees at least one error"))
}

/// The default backoff used across the pipeline: exponential with jitter, capped at 30s,
/// matching [`RetryPolicy::exponential`] with a higher ceiling for network calls.
pub fn default_delay(attempt: u32) -> Duration {
    let policy = RetryPolicy {
        max_delay: Duration::from_secs(30),
        ..RetryPolicy::exponential()
    };
    policy.delay_for_attempt(attempt)
}

/// Default retry attempt count for transient remote calls (matches the catalogue
/// simplification step's retry count in the original source).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = retry(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err("transient") } else { Ok(42) } }
            },
            5,
            |_| true,
            |_| Duration::from_millis(0),
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_non_retryable_error() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move { Err("fatal") }
            },
            5,
            |_| false,
            |_| Duration::from_millis(0),
        )
        .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
