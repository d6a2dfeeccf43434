//! Timeout wrapper for per-task processing procedures.
//!
//! Wraps an async operation in `tokio::time::timeout` so a hung browser
//! action cancels at an explicit deadline rather than blocking its worker
//! forever.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;

/// Run `operation` with an explicit deadline, returning a timeout-flavored
/// error if it does not resolve in time. Dropping the future on timeout is
/// `tokio::time::timeout`'s standard cancellation — the in-flight browser
/// call is abandoned, not awaited to completion.
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout: Duration,
    operation_name: &str,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "{operation_name} timeout after {:.1}s",
            timeout.as_secs_f64()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_inner_result_when_it_finishes_in_time() {
        let result = with_page_timeout(
            async { Ok::<_, anyhow::Error>(42) },
            Duration::from_secs(1),
            "quick op",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn times_out_a_hanging_operation() {
        let result = with_page_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, anyhow::Error>(())
            },
            Duration::from_millis(10),
            "slow op",
        )
        .await;
        assert!(result.unwrap_err().to_string().contains("timeout"));
    }
}
