//! Fixed-interval polling with an overall deadline.
//!
//! Used to wait for a broadcast transaction to land in a block. A probe returns
//! `Ok(None)` or an error while the result is not available yet.

use anyhow::anyhow;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between probes.
    pub interval: Duration,
    /// Give up once this much time has passed since the first probe.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Run `probe` until it yields a value or `config.timeout` elapses.
pub async fn poll_until<F, Fut, T>(
    config: PollConfig,
    operation_name: &str,
    probe: F,
) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<Option<T>>>,
{
    let started = Instant::now();
    let mut attempt = 1u32;

    loop {
        let pending = match probe().await {
            Ok(Some(value)) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Poll completed"
                    );
                }
                return Ok(value);
            }
            Ok(None) => "not ready".to_string(),
            Err(e) => format!("{e:#}"),
        };

        let elapsed = started.elapsed();
        if elapsed >= config.timeout {
            warn!(
                operation = operation_name,
                attempt = attempt,
                elapsed_secs = elapsed.as_secs(),
                last = %pending,
                "Polling timed out"
            );
            return Err(anyhow!(
                "{operation_name} timed out after {}s: {pending}",
                config.timeout.as_secs()
            ));
        }

        debug!(
            operation = operation_name,
            attempt = attempt,
            status = %pending,
            "Not ready, polling again"
        );
        tokio::time::sleep(config.interval).await;
        attempt += 1;
    }
}
