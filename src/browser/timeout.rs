//! Timeout utilities for page operations
//!
//! Every browser wait in this crate goes through [`with_page_timeout`], so
//! no navigation, element wait or evaluation can hang a lookup.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;

use crate::error::LookupError;

/// Wrap an async page operation with an explicit timeout
///
/// # Arguments
/// * `operation` - The async Future to execute with a timeout
/// * `timeout` - Upper bound for the operation
/// * `operation_name` - Human-readable name for error messages
///
/// # Returns
/// * `Ok(T)` - Operation completed successfully
/// * `Err` - Either the operation failed or [`LookupError::Timeout`]
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
        Err(_) => Err(LookupError::Timeout {
            operation: operation_name.to_string(),
            timeout,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::find_lookup_error;

    #[tokio::test(start_paused = true)]
    async fn test_pending_operation_times_out() {
        let result: Result<()> = with_page_timeout(
            std::future::pending(),
            Duration::from_secs(20),
            "Navigation",
        )
        .await;

        let err = result.expect_err("pending future must time out");
        assert!(matches!(
            find_lookup_error(&err),
            Some(LookupError::Timeout { timeout, .. }) if *timeout == Duration::from_secs(20)
        ));
    }

    #[tokio::test]
    async fn test_inner_error_is_preserved() {
        let result: Result<()> = with_page_timeout(
            async { Err(anyhow::anyhow!("net::ERR_NAME_NOT_RESOLVED")) },
            Duration::from_secs(1),
            "Navigation",
        )
        .await;
        assert!(result.unwrap_err().to_string().contains("ERR_NAME_NOT_RESOLVED"));
    }
}
