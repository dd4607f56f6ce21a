//! Bounded retry for per-workload usage queries

use crate::error::{MonitorError, SourceError};
use crate::models::Usage;
use crate::sources::UsageSource;
use std::time::Duration;

/// How many times a usage query is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_secs(1),
        }
    }
}

/// Query usage, retrying after `policy.delay` until `policy.max_attempts` calls were made
///
/// `on_retry` is invoked with the attempt number that failed before each wait. The error
/// carries the reason of the last failed attempt.
pub async fn fetch_with_retry<F>(
    source: &dyn UsageSource,
    namespace: &str,
    name: &str,
    policy: RetryPolicy,
    mut on_retry: F,
) -> Result<Usage, MonitorError>
where
    F: FnMut(u32, &SourceError),
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match source.get_usage(namespace, name).await {
            Ok(usage) => return Ok(usage),
            Err(e) if attempt < attempts => {
                on_retry(attempt, &e);
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                return Err(MonitorError::TransientFetch {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
