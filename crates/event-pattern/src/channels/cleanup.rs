//! Best-effort release of transport resources.
//!
//! Teardown is an ordered list of steps. Each step runs unconditionally,
//! is bounded by a timeout, and has its failure logged and dropped. Callers
//! escalate to a forced teardown when a graceful step reports failure.

use std::future::Future;
use std::time::Duration;

use crate::error::ChannelError;

/// Upper bound for a single graceful cleanup step.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run one cleanup step. Returns whether it completed successfully.
///
/// Never fails: errors and timeouts are logged and swallowed.
pub async fn attempt<F>(step: &'static str, limit: Duration, fut: F) -> bool
where
    F: Future<Output = Result<(), ChannelError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(())) => {
            tracing::debug!(step, "cleanup step completed");
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(step, error = %e, "cleanup step failed, ignoring");
            false
        }
        Err(_) => {
            tracing::warn!(step, timeout_ms = limit.as_millis() as u64, "cleanup step timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attempt_success() {
        assert!(attempt("ok", DEFAULT_CLOSE_TIMEOUT, async { Ok(()) }).await);
    }

    #[tokio::test]
    async fn test_attempt_swallows_error() {
        let ok = attempt("fail", DEFAULT_CLOSE_TIMEOUT, async {
            Err(ChannelError::transport("already closed"))
        })
        .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_attempt_times_out() {
        let ok = attempt("hang", Duration::from_millis(20), async {
            std::future::pending::<()>().await;
            Ok(())
        })
        .await;
        assert!(!ok);
    }
}
